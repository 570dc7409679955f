//! A scripted engine that records every primitive call.
//!
//! Lets the tests check call ordering, at-most-once destruction and lock
//! serialization without depending on QuickJS timing.

use std::{
    cell::RefCell,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
    time::Duration,
};

use jsbridge::{
    BindFailure, BoundHandle, Context, Engine, EngineFailure, EngineLimits, MethodId, MethodSignature, ResourceError,
    Value,
};

#[derive(Debug, Default)]
pub struct Counters {
    pub creates: AtomicUsize,
    pub destroys: AtomicUsize,
    pub evaluates: AtomicUsize,
    pub binds: AtomicUsize,
    pub calls: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

impl Counters {
    pub fn get(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }
}

thread_local! {
    static NEXT_COUNTERS: RefCell<Option<Arc<Counters>>> = const { RefCell::new(None) };
    static FAIL_CREATE: RefCell<bool> = const { RefCell::new(false) };
}

#[derive(Debug)]
pub struct RecordingEngine {
    counters: Arc<Counters>,
    bound: Vec<(String, Vec<MethodSignature>)>,
    call_delay: Duration,
}

impl Engine for RecordingEngine {
    fn create(_limits: &EngineLimits) -> Result<Self, ResourceError> {
        if FAIL_CREATE.with(|fail| *fail.borrow()) {
            return Err(ResourceError::Context);
        }
        let counters = NEXT_COUNTERS.with(|next| next.borrow_mut().take()).unwrap_or_default();
        counters.creates.fetch_add(1, Ordering::SeqCst);
        Ok(Self {
            counters,
            bound: Vec::new(),
            call_delay: Duration::from_millis(2),
        })
    }

    fn destroy(self) {
        self.counters.destroys.fetch_add(1, Ordering::SeqCst);
    }

    fn evaluate(&mut self, source: &str, source_name: &str) -> Result<Value, EngineFailure> {
        self.counters.evaluates.fetch_add(1, Ordering::SeqCst);
        match source {
            "throw" => Err(EngineFailure {
                name: Some("Error".to_owned()),
                message: "thrown".to_owned(),
                stack: Some(format!("    at <eval> ({source_name}:1:1)")),
            }),
            _ => Ok(Value::String(source.to_owned())),
        }
    }

    fn bind_object(&mut self, name: &str, methods: &[MethodSignature]) -> Result<BoundHandle, BindFailure> {
        self.counters.binds.fetch_add(1, Ordering::SeqCst);
        match name {
            "missing" => Err(BindFailure::MissingObject),
            "oom" => Err(BindFailure::OutOfMemory),
            _ => {
                self.bound.push((name.to_owned(), methods.to_vec()));
                Ok(BoundHandle::new(u32::try_from(self.bound.len() - 1).unwrap()))
            }
        }
    }

    /// Returns `"<name>.<method>"` so tests can see how the call was routed.
    fn call_bound_method(&mut self, object: BoundHandle, method: MethodId, args: &[Value]) -> Result<Value, EngineFailure> {
        self.counters.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        thread::sleep(self.call_delay);
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);

        let (name, methods) = &self.bound[object.id() as usize];
        let method_name = methods[method.0].name();
        if method_name == "fail" {
            return Err(EngineFailure::message("failed on purpose"));
        }
        match args.first() {
            Some(first) => Ok(first.clone()),
            None => Ok(Value::String(format!("{name}.{method_name}"))),
        }
    }
}

/// Opens a context on the recording engine and returns its counters.
pub fn open_recorded() -> (Context<RecordingEngine>, Arc<Counters>) {
    let counters = Arc::new(Counters::default());
    NEXT_COUNTERS.with(|next| *next.borrow_mut() = Some(Arc::clone(&counters)));
    let context = Context::<RecordingEngine>::open(EngineLimits::default()).unwrap();
    (context, counters)
}

/// Makes the next engine creation on this thread fail.
pub fn fail_next_create(fail: bool) {
    FAIL_CREATE.with(|flag| *flag.borrow_mut() = fail);
}
