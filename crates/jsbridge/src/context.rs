//! The host-side owner of one engine instance.

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use tracing::{debug, trace, warn};

use crate::{
    engine::{BindFailure, Engine},
    error::{BindingError, Error, Result},
    exception::translate,
    guard::AccessGuard,
    interface::{InterfaceDescriptor, MethodTable},
    proxy::{JsInterface, Proxy, ProxyBinding},
    quickjs::QuickJs,
    resource::{EngineLimits, ResourceError},
    value::Value,
};

/// Source name used when the caller does not supply one.
pub const DEFAULT_SOURCE_NAME: &str = "?";

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// State shared by a context and every proxy bound from it.
///
/// Dropping the last reference while the engine is still open is the leak
/// condition: it is logged, then the engine is destroyed anyway.
pub(crate) struct Shared<E: Engine> {
    pub(crate) id: u64,
    pub(crate) guard: AccessGuard<E>,
}

impl<E: Engine> Drop for Shared<E> {
    fn drop(&mut self) {
        if let Some(engine) = self.guard.take_exclusive() {
            warn!(context = self.id, "script context leaked: dropped without close()");
            engine.destroy();
        }
    }
}

/// A script engine instance with a safe, serialized API.
///
/// Calls to [`Context::create`] must be matched with [`Context::close`].
/// Every operation after `close` fails with [`Error::Closed`].
///
/// Proxies bound from a context share its engine. If the engine is still open
/// when the last of them (the context or any proxy) is dropped, a leak warning
/// is logged and the engine is destroyed. Dropping the context alone while a
/// proxy is alive logs nothing and leaves the proxy usable.
///
/// `Context` is `Send + Sync`. Operations from different threads are
/// serialized; different contexts never block each other.
pub struct Context<E: Engine = QuickJs> {
    shared: Arc<Shared<E>>,
}

impl Context<QuickJs> {
    /// Creates a QuickJS context with the engine's default limits.
    ///
    /// Fails with [`Error::Resource`] if the engine cannot be allocated.
    pub fn create() -> Result<Self> {
        Self::open(EngineLimits::default())
    }

    /// Creates a QuickJS context with explicit limits.
    pub fn with_limits(limits: EngineLimits) -> Result<Self> {
        Self::open(limits)
    }
}

impl<E: Engine> Context<E> {
    /// Creates a context backed by engine `E`.
    pub fn open(limits: EngineLimits) -> Result<Self> {
        let engine = E::create(&limits)?;
        let id = NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed);
        debug!(context = id, ?limits, "script context created");
        Ok(Self {
            shared: Arc::new(Shared {
                id,
                guard: AccessGuard::new(engine),
            }),
        })
    }

    /// Process-unique identifier of this context, as used in log events.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// Evaluates `script` and returns the value of its last expression.
    ///
    /// `source_name` labels the script in stack frames. Objects, arrays and
    /// functions come back as [`Value::Null`]. A thrown exception becomes
    /// [`Error::Script`]; the context stays usable.
    pub fn evaluate(&self, script: &str, source_name: &str) -> Result<Value> {
        trace!(context = self.shared.id, source_name, "evaluate");
        self.shared.guard.with_engine(|engine| {
            engine
                .evaluate(script, source_name)
                .map_err(|failure| Error::Script(translate(failure, source_name)))
        })
    }

    /// Evaluates `script` under the source name [`DEFAULT_SOURCE_NAME`].
    pub fn evaluate_script(&self, script: &str) -> Result<Value> {
        self.evaluate(script, DEFAULT_SOURCE_NAME)
    }

    /// Binds the global object `name` to `descriptor` and returns a proxy for it.
    ///
    /// The descriptor must not extend other interfaces and must not declare
    /// the same method name twice; both are rejected with [`Error::Binding`]
    /// before the engine is touched. The engine then rejects a missing global
    /// or a missing method, also with [`Error::Binding`].
    pub fn bind(&self, name: &str, descriptor: &InterfaceDescriptor) -> Result<Proxy<E>> {
        let table = MethodTable::build(descriptor)?;
        let methods = table.to_vec();

        let handle = self.shared.guard.with_engine(|engine| {
            engine.bind_object(name, &methods).map_err(|failure| match failure {
                BindFailure::OutOfMemory => Error::Resource(ResourceError::BoundObject { name: name.to_owned() }),
                BindFailure::MissingObject => Error::Binding(BindingError::MissingObject { name: name.to_owned() }),
                BindFailure::MissingMethod(method) => Error::Binding(BindingError::MissingMethod {
                    name: name.to_owned(),
                    method,
                }),
            })
        })?;

        debug!(
            context = self.shared.id,
            name,
            interface = table.interface(),
            methods = table.len(),
            "bound script object"
        );
        Ok(Proxy::new(Arc::clone(&self.shared), ProxyBinding::new(name, handle, table)))
    }

    /// Binds the global object `name` to the typed adapter `T`.
    pub fn get<T: JsInterface<E>>(&self, name: &str) -> Result<T> {
        self.bind(name, &T::descriptor()).map(T::from_proxy)
    }

    /// Releases the engine and every bound object.
    ///
    /// Idempotent: only the first call destroys anything. Waits for an
    /// operation in flight on another thread to finish first.
    pub fn close(&self) {
        if self.shared.guard.close() {
            debug!(context = self.shared.id, "script context closed");
        }
    }

    /// Returns `true` once [`Context::close`] has run.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.shared.guard.is_closed()
    }
}

impl<E: Engine> fmt::Debug for Context<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("id", &self.shared.id)
            .field("closed", &self.is_closed())
            .finish()
    }
}
