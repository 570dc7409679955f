use std::fmt;

use crate::{exception::ScriptError, resource::ResourceError};

/// Result type used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error type for every operation on a [`Context`](crate::Context) or [`Proxy`](crate::Proxy).
///
/// Keeping the failure kinds distinct lets callers separate the expected,
/// recoverable conditions (`Script`, `Binding`, `Dispatch`) from environment
/// or programmer faults (`Resource`, `Closed`) without string matching.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// The engine could not allocate a context or a bound object.
    Resource(ResourceError),
    /// An interface descriptor was rejected at bind time.
    Binding(BindingError),
    /// The script raised an exception. The context remains usable.
    Script(ScriptError),
    /// A proxy call could not be routed to a declared method.
    Dispatch(DispatchError),
    /// The context was closed before this operation ran.
    Closed,
}

impl Error {
    /// Returns the script error if this is one.
    #[must_use]
    pub fn as_script(&self) -> Option<&ScriptError> {
        match self {
            Self::Script(error) => Some(error),
            _ => None,
        }
    }

    /// Returns `true` for [`Error::Closed`].
    #[must_use]
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Resource(error) => write!(f, "{error}"),
            Self::Binding(error) => write!(f, "{error}"),
            Self::Script(error) => write!(f, "{error}"),
            Self::Dispatch(error) => write!(f, "{error}"),
            Self::Closed => f.write_str("script context is closed"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Resource(error) => Some(error),
            Self::Binding(error) => Some(error),
            Self::Script(error) => Some(error),
            Self::Dispatch(error) => Some(error),
            Self::Closed => None,
        }
    }
}

impl From<ResourceError> for Error {
    fn from(error: ResourceError) -> Self {
        Self::Resource(error)
    }
}

impl From<BindingError> for Error {
    fn from(error: BindingError) -> Self {
        Self::Binding(error)
    }
}

impl From<ScriptError> for Error {
    fn from(error: ScriptError) -> Self {
        Self::Script(error)
    }
}

impl From<DispatchError> for Error {
    fn from(error: DispatchError) -> Self {
        Self::Dispatch(error)
    }
}

/// Reasons an interface cannot be bound to a script object.
///
/// The structural variants (`ExtendsInterface`, `OverloadedMethod`) are raised
/// before the engine is contacted. The lookup variants come back from the engine
/// when the named global or one of its methods does not exist.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingError {
    /// The interface declares parent interfaces.
    ExtendsInterface { interface: String, parents: Vec<String> },
    /// The interface declares two methods with the same name.
    OverloadedMethod { interface: String, method: String },
    /// No global with this name exists, or it is not an object.
    MissingObject { name: String },
    /// The global exists but does not have a function for a declared method.
    MissingMethod { name: String, method: String },
}

impl fmt::Display for BindingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExtendsInterface { interface, parents } => {
                write!(f, "{interface} must not extend other interfaces (extends {})", parents.join(", "))
            }
            Self::OverloadedMethod { interface, method } => write!(f, "{method} is overloaded in {interface}"),
            Self::MissingObject { name } => write!(f, "a global JavaScript object called {name} was not found"),
            Self::MissingMethod { name, method } => write!(f, "JavaScript global {name} has no method called {method}"),
        }
    }
}

impl std::error::Error for BindingError {}

/// Reasons a proxy call cannot be routed to a declared method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// The interface declares no method with this name.
    UnknownMethod { interface: String, method: String },
    /// The method identifier is outside the dispatch table.
    UnknownMethodId { interface: String, id: usize },
    /// The call passed the wrong number of arguments.
    Arity {
        method: String,
        expected: usize,
        variadic: bool,
        actual: usize,
    },
    /// A typed adapter received a value its return type cannot hold.
    ReturnType {
        method: String,
        expected: &'static str,
        actual: &'static str,
    },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMethod { interface, method } => write!(f, "{interface} has no method called {method}"),
            Self::UnknownMethodId { interface, id } => write!(f, "{interface} has no method with id {id}"),
            Self::Arity {
                method,
                expected,
                variadic,
                actual,
            } => {
                let at_least = if *variadic { "at least " } else { "" };
                write!(f, "{method} expects {at_least}{expected} argument(s), got {actual}")
            }
            Self::ReturnType {
                method,
                expected,
                actual,
            } => write!(f, "{method} returned {actual}, expected {expected}"),
        }
    }
}

impl std::error::Error for DispatchError {}
