use std::fmt;

/// Error returned when the engine cannot allocate a native resource.
///
/// This covers creating the engine instance itself and registering a bound
/// object. The operation that failed produces nothing usable; no half-built
/// context or proxy is ever handed back to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceError {
    /// The engine runtime or context could not be allocated.
    Context,
    /// A bound object for the named global could not be allocated.
    BoundObject { name: String },
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Context => f.write_str("cannot create script engine instance: out of memory"),
            Self::BoundObject { name } => write!(f, "cannot create proxy to '{name}': out of memory"),
        }
    }
}

impl std::error::Error for ResourceError {}

/// Limits applied to an engine instance when it is created.
///
/// Every limit is optional; `None` leaves the engine default in place.
/// Exceeding a limit at runtime surfaces as a script exception (for example
/// QuickJS raises `InternalError: out of memory`), and the context stays usable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineLimits {
    /// Maximum heap memory the engine may allocate, in bytes.
    pub memory_limit: Option<usize>,
    /// Maximum native stack the engine may use for script calls, in bytes.
    pub max_stack_size: Option<usize>,
    /// Allocation volume (bytes) after which the engine runs its garbage collector.
    pub gc_threshold: Option<usize>,
}

impl EngineLimits {
    /// Creates limits with everything left at the engine defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn memory_limit(mut self, bytes: usize) -> Self {
        self.memory_limit = Some(bytes);
        self
    }

    #[must_use]
    pub fn max_stack_size(mut self, bytes: usize) -> Self {
        self.max_stack_size = Some(bytes);
        self
    }

    #[must_use]
    pub fn gc_threshold(mut self, bytes: usize) -> Self {
        self.gc_threshold = Some(bytes);
        self
    }
}
