//! Host-side proxies for bound script objects.
//!
//! A [`Proxy`] forwards method calls to a script object through the owning
//! context's access guard. Calls are routed by the method's position in the
//! dispatch table fixed at bind time. Equality, hashing and formatting of a proxy
//! are answered locally and never reach the engine.

use std::{
    fmt,
    hash::{Hash, Hasher},
    sync::Arc,
};

use tracing::trace;

use crate::{
    context::{DEFAULT_SOURCE_NAME, Shared},
    engine::{BoundHandle, Engine, MethodId},
    error::{DispatchError, Error, Result},
    exception::translate,
    interface::{InterfaceDescriptor, MethodSignature, MethodTable},
    quickjs::QuickJs,
    value::{JsType, Value},
};

/// The result of binding a name to an interface.
///
/// Owns the engine's bound-object handle and the ordered method table. The
/// handle's native resources are released when the parent context closes;
/// a binding has no close operation of its own.
#[derive(Debug)]
pub struct ProxyBinding {
    name: String,
    handle: BoundHandle,
    table: MethodTable,
}

impl ProxyBinding {
    pub(crate) fn new(name: &str, handle: BoundHandle, table: MethodTable) -> Self {
        Self {
            name: name.to_owned(),
            handle,
            table,
        }
    }

    /// Name of the bound global.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn handle(&self) -> BoundHandle {
        self.handle
    }

    #[must_use]
    pub fn table(&self) -> &MethodTable {
        &self.table
    }
}

/// A callable handle to a script object implementing a declared interface.
///
/// Cloning is cheap; clones share the binding and compare equal. Once the
/// parent context is closed every call fails with [`Error::Closed`].
pub struct Proxy<E: Engine = QuickJs> {
    shared: Arc<Shared<E>>,
    binding: Arc<ProxyBinding>,
}

impl<E: Engine> Proxy<E> {
    pub(crate) fn new(shared: Arc<Shared<E>>, binding: ProxyBinding) -> Self {
        Self {
            shared,
            binding: Arc::new(binding),
        }
    }

    /// Name of the bound global.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.binding.name
    }

    /// Name of the interface the proxy implements.
    #[must_use]
    pub fn interface_name(&self) -> &str {
        self.binding.table.interface()
    }

    /// Declared methods in dispatch order.
    pub fn methods(&self) -> impl ExactSizeIterator<Item = &MethodSignature> {
        self.binding.table.signatures()
    }

    #[must_use]
    pub fn binding(&self) -> &ProxyBinding {
        &self.binding
    }

    /// Calls `method` on the script object.
    ///
    /// Fails with [`Error::Dispatch`] for an undeclared method or a wrong
    /// argument count, without touching the engine.
    pub fn invoke(&self, method: &str, args: &[Value]) -> Result<Value> {
        let (id, signature) = self.binding.table.resolve(method)?;
        self.dispatch(id, signature, args)
    }

    /// Calls the method at position `id` of the dispatch table.
    pub fn invoke_at(&self, id: MethodId, args: &[Value]) -> Result<Value> {
        let signature = self.binding.table.get(id)?;
        self.dispatch(id, signature, args)
    }

    /// Calls `method` and converts the result to `R`.
    ///
    /// Used by adapters generated with [`js_interface!`](crate::js_interface).
    pub fn call_typed<R: JsType>(&self, method: &str, args: &[Value]) -> Result<R> {
        let value = self.invoke(method, args)?;
        R::from_value(value).map_err(|actual| {
            Error::Dispatch(DispatchError::ReturnType {
                method: method.to_owned(),
                expected: R::TYPE_NAME,
                actual: actual.type_name(),
            })
        })
    }

    fn dispatch(&self, id: MethodId, signature: &MethodSignature, args: &[Value]) -> Result<Value> {
        signature.check_arity(args.len())?;
        trace!(
            context = self.shared.id,
            name = self.binding.name.as_str(),
            method = signature.name(),
            args = args.len(),
            "proxy call"
        );
        self.shared.guard.with_engine(|engine| {
            engine
                .call_bound_method(self.binding.handle, id, args)
                .map_err(|failure| Error::Script(translate(failure, DEFAULT_SOURCE_NAME)))
        })
    }
}

impl<E: Engine> Clone for Proxy<E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
            binding: Arc::clone(&self.binding),
        }
    }
}

impl<E: Engine> PartialEq for Proxy<E> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.binding, &other.binding)
    }
}

impl<E: Engine> Eq for Proxy<E> {}

impl<E: Engine> Hash for Proxy<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.shared.id.hash(state);
        self.binding.handle.hash(state);
    }
}

impl<E: Engine> fmt::Display for Proxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JsProxy{{name={}, type={}}}", self.binding.name, self.interface_name())
    }
}

impl<E: Engine> fmt::Debug for Proxy<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Proxy")
            .field("context", &self.shared.id)
            .field("name", &self.binding.name)
            .field("interface", &self.interface_name())
            .field("handle", &self.binding.handle)
            .finish()
    }
}

/// A typed adapter over a [`Proxy`].
///
/// Usually generated by [`js_interface!`](crate::js_interface) and obtained
/// with [`Context::get`](crate::Context::get).
pub trait JsInterface<E: Engine = QuickJs>: Sized {
    /// The interface this adapter implements.
    fn descriptor() -> InterfaceDescriptor;

    /// Wraps a proxy bound with [`Self::descriptor`].
    fn from_proxy(proxy: Proxy<E>) -> Self;

    /// The underlying proxy.
    fn proxy(&self) -> &Proxy<E>;
}

/// Declares a script interface and generates its typed adapter.
///
/// Each declared method becomes a method on the adapter with the same name,
/// taking the declared Rust types (anything implementing [`JsType`]) and
/// returning [`Result`](crate::Result) of the declared return type, or `()`
/// when none is given. The interface name is the adapter's type name.
///
/// ```no_run
/// use jsbridge::{Context, js_interface};
///
/// js_interface! {
///     /// Arithmetic implemented in JavaScript.
///     pub interface Calculator {
///         fn add(a: i32, b: i32) -> i32;
///         fn describe(label: String) -> String;
///         fn reset();
///     }
/// }
///
/// let context = Context::create()?;
/// context.evaluate_script("var calc = { add(a, b) { return a + b; }, describe(l) { return l; }, reset() {} };")?;
/// let calc: Calculator = context.get("calc")?;
/// assert_eq!(calc.add(2, 3)?, 5);
/// context.close();
/// # Ok::<(), jsbridge::Error>(())
/// ```
#[macro_export]
macro_rules! js_interface {
    (
        $(#[$meta:meta])*
        $vis:vis interface $name:ident {
            $(
                $(#[$fn_meta:meta])*
                fn $method:ident ( $( $arg:ident : $arg_ty:ty ),* $(,)? ) $( -> $ret:ty )? ;
            )*
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<E: $crate::Engine = $crate::QuickJs> {
            proxy: $crate::Proxy<E>,
        }

        impl<E: $crate::Engine> $crate::JsInterface<E> for $name<E> {
            fn descriptor() -> $crate::InterfaceDescriptor {
                $crate::InterfaceDescriptor::new(stringify!($name))
                $(
                    .method(
                        $crate::MethodSignature::new(stringify!($method))
                            $( .param(<$arg_ty as $crate::JsType>::VALUE_TYPE) )*
                            .returns_opt(<$crate::__js_return_type!($($ret)?) as $crate::JsType>::RETURN_TYPE)
                    )
                )*
            }

            fn from_proxy(proxy: $crate::Proxy<E>) -> Self {
                Self { proxy }
            }

            fn proxy(&self) -> &$crate::Proxy<E> {
                &self.proxy
            }
        }

        impl<E: $crate::Engine> $name<E> {
            $(
                $(#[$fn_meta])*
                pub fn $method(&self, $( $arg: $arg_ty ),*) -> $crate::Result<$crate::__js_return_type!($($ret)?)> {
                    self.proxy.call_typed(stringify!($method), &[$( $crate::JsType::into_value($arg) ),*])
                }
            )*
        }

        impl<E: $crate::Engine> ::core::clone::Clone for $name<E> {
            fn clone(&self) -> Self {
                Self { proxy: self.proxy.clone() }
            }
        }

        impl<E: $crate::Engine> ::core::cmp::PartialEq for $name<E> {
            fn eq(&self, other: &Self) -> bool {
                self.proxy == other.proxy
            }
        }

        impl<E: $crate::Engine> ::core::fmt::Debug for $name<E> {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Debug::fmt(&self.proxy, f)
            }
        }

        impl<E: $crate::Engine> ::core::fmt::Display for $name<E> {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                ::core::fmt::Display::fmt(&self.proxy, f)
            }
        }
    };
}

/// Return type of a `js_interface!` method: the declared type, or `()`.
#[doc(hidden)]
#[macro_export]
macro_rules! __js_return_type {
    () => { () };
    ($ret:ty) => { $ret };
}
