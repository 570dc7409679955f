//! The primitives a script engine must provide.
//!
//! Everything above this module treats the engine as a black box reached only
//! through [`Engine`]. Implementations are single-threaded: the caller
//! guarantees that at most one method runs against an instance at a time and
//! that [`Engine::destroy`] is called exactly once, after which the instance is
//! gone. [`QuickJs`](crate::QuickJs) is the production implementation.

use crate::{
    interface::MethodSignature,
    resource::{EngineLimits, ResourceError},
    value::Value,
};

/// Opaque identifier of a bound object inside one engine instance.
///
/// Only meaningful to the engine that issued it. Its resources belong to that
/// engine and are released when the engine is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BoundHandle(u32);

impl BoundHandle {
    #[must_use]
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    #[must_use]
    pub fn id(self) -> u32 {
        self.0
    }
}

/// Position of a method in the ordered method list passed at bind time.
///
/// Engines route calls by this index instead of re-resolving the method by
/// name on every call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MethodId(pub usize);

/// An exception reported by the engine during evaluation or a bound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineFailure {
    /// Error class name of the thrown value, when it has one.
    pub name: Option<String>,
    /// Human-readable message.
    pub message: String,
    /// Textual backtrace recorded by the engine, when available.
    pub stack: Option<String>,
}

impl EngineFailure {
    /// A failure with only a message, e.g. for a thrown non-Error value.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            name: None,
            message: message.into(),
            stack: None,
        }
    }
}

/// Why the engine could not produce a bound object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindFailure {
    /// The engine ran out of memory building the bound object.
    OutOfMemory,
    /// No global with the requested name exists, or it is not an object.
    MissingObject,
    /// The object has no function property for this declared method.
    MissingMethod(String),
}

/// The engine primitives this crate relies on.
///
/// `create` and `destroy` bracket the lifetime of one native instance;
/// `evaluate`, `bind_object` and `call_bound_method` may only be called in
/// between. The [`Context`](crate::Context) wrapper enforces both rules.
pub trait Engine: Send + Sized + 'static {
    /// Allocates a new engine instance with the given limits applied.
    fn create(limits: &EngineLimits) -> Result<Self, ResourceError>;

    /// Releases the native instance and every bound object it issued.
    fn destroy(self) {
        drop(self);
    }

    /// Runs `source` as a script labelled `source_name` and returns the value
    /// of its last expression.
    fn evaluate(&mut self, source: &str, source_name: &str) -> Result<Value, EngineFailure>;

    /// Looks up the global object `name` and prepares it for calls to `methods`,
    /// in order. The position of each method becomes its [`MethodId`].
    fn bind_object(&mut self, name: &str, methods: &[MethodSignature]) -> Result<BoundHandle, BindFailure>;

    /// Calls method `method` of a bound object with already-marshaled arguments.
    fn call_bound_method(&mut self, object: BoundHandle, method: MethodId, args: &[Value]) -> Result<Value, EngineFailure>;
}
