//! The QuickJS engine, reached through `rquickjs`.
//!
//! One [`QuickJs`] owns one runtime and one full context. Bound objects are
//! kept alive as persistent references inside the engine and released with it.

mod marshal;

use std::fmt;

use rquickjs::{
    Context as JsContext, Ctx, Function, Object, Persistent, Runtime, Value as JsValue,
    context::EvalOptions,
    function::{Rest, This},
};

use crate::{
    engine::{BindFailure, BoundHandle, Engine, EngineFailure, MethodId},
    interface::MethodSignature,
    resource::{EngineLimits, ResourceError},
    value::{Value, ValueType},
};

/// A QuickJS runtime and context.
///
/// Field order matters: the persistent references in `bound` must be released
/// before the context and runtime they point into.
pub struct QuickJs {
    bound: Vec<BoundObject>,
    context: JsContext,
    runtime: Runtime,
}

/// A global object prepared for calls, with its methods resolved in dispatch order.
struct BoundObject {
    name: String,
    this: Persistent<Object<'static>>,
    methods: Vec<BoundMethod>,
}

struct BoundMethod {
    function: Persistent<Function<'static>>,
    signature: MethodSignature,
}

// SAFETY: with the `parallel` feature the runtime and context are `Send`. The
// persistent references hold raw pointers into that runtime and are only
// touched through `&mut self`, which the owning context hands out under its
// access guard, so no two threads reach the runtime at once. `destroy` and the
// field order drop them before the runtime.
unsafe impl Send for QuickJs {}

impl fmt::Debug for QuickJs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("QuickJs")
            .field("bound", &self.bound.iter().map(|b| b.name.as_str()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

impl Engine for QuickJs {
    fn create(limits: &EngineLimits) -> Result<Self, ResourceError> {
        let runtime = Runtime::new().map_err(|_| ResourceError::Context)?;
        let context = JsContext::full(&runtime).map_err(|_| ResourceError::Context)?;

        // limits go on after the context exists so a tight memory limit cannot
        // prevent the intrinsics from being created
        if let Some(bytes) = limits.memory_limit {
            runtime.set_memory_limit(bytes);
        }
        if let Some(bytes) = limits.max_stack_size {
            runtime.set_max_stack_size(bytes);
        }
        if let Some(bytes) = limits.gc_threshold {
            runtime.set_gc_threshold(bytes);
        }

        Ok(Self {
            bound: Vec::new(),
            context,
            runtime,
        })
    }

    fn destroy(self) {
        let Self {
            bound,
            context,
            runtime,
        } = self;
        drop(bound);
        drop(context);
        runtime.run_gc();
        drop(runtime);
    }

    fn evaluate(&mut self, source: &str, source_name: &str) -> Result<Value, EngineFailure> {
        // the engine reads both as C strings
        if let Some(offset) = source.find('\0') {
            return Err(nul_rejected(format!("unexpected NUL byte at offset {offset} of {source_name}")));
        }
        if source_name.contains('\0') {
            return Err(nul_rejected(format!("source name {source_name:?} contains a NUL byte")));
        }

        self.context.with(|ctx| {
            let mut options = EvalOptions::default();
            options.global = true;
            options.strict = false;
            options.filename = Some(source_name.to_owned());

            match ctx.eval_with_options::<JsValue, _>(source, options) {
                Ok(value) => Ok(marshal::to_host(&value)),
                Err(error) => Err(failure(&ctx, error)),
            }
        })
    }

    fn bind_object(&mut self, name: &str, methods: &[MethodSignature]) -> Result<BoundHandle, BindFailure> {
        let id = u32::try_from(self.bound.len()).map_err(|_| BindFailure::OutOfMemory)?;
        let bound = self.context.with(|ctx| resolve_object(&ctx, name, methods))?;
        self.bound.push(bound);
        Ok(BoundHandle::new(id))
    }

    fn call_bound_method(&mut self, object: BoundHandle, method: MethodId, args: &[Value]) -> Result<Value, EngineFailure> {
        let bound = self
            .bound
            .get(object.id() as usize)
            .ok_or_else(|| EngineFailure::message(format!("unknown bound object {}", object.id())))?;
        let entry = bound
            .methods
            .get(method.0)
            .ok_or_else(|| EngineFailure::message(format!("{} has no method with id {}", bound.name, method.0)))?;

        // cloned persistents keep the closure free of borrows into `self.bound`
        let this = bound.this.clone();
        let function = entry.function.clone();
        let signature = &entry.signature;

        self.context.with(|ctx| match call_method(&ctx, this, function, signature, args) {
            Ok(value) => Ok(value),
            Err(error) => Err(failure(&ctx, error)),
        })
    }
}

fn resolve_object(ctx: &Ctx<'_>, name: &str, methods: &[MethodSignature]) -> Result<BoundObject, BindFailure> {
    let target: JsValue = ctx.globals().get(name).map_err(|error| bind_failure(ctx, error, BindFailure::MissingObject))?;
    let object = target.into_object().ok_or(BindFailure::MissingObject)?;

    let mut resolved = Vec::with_capacity(methods.len());
    for signature in methods {
        let missing = || BindFailure::MissingMethod(signature.name().to_owned());
        let member: JsValue = object
            .get(signature.name())
            .map_err(|error| bind_failure(ctx, error, missing()))?;
        let function = member.into_function().ok_or_else(missing)?;
        resolved.push(BoundMethod {
            function: Persistent::save(ctx, function),
            signature: signature.clone(),
        });
    }

    Ok(BoundObject {
        name: name.to_owned(),
        this: Persistent::save(ctx, object),
        methods: resolved,
    })
}

fn call_method(
    ctx: &Ctx<'_>,
    this: Persistent<Object<'static>>,
    function: Persistent<Function<'static>>,
    signature: &MethodSignature,
    args: &[Value],
) -> rquickjs::Result<Value> {
    let this = this.restore(ctx)?;
    let function = function.restore(ctx)?;

    let mut js_args = Vec::with_capacity(args.len());
    for (index, arg) in args.iter().enumerate() {
        let ty = signature.param_type(index).unwrap_or(ValueType::Any);
        let value = marshal::to_engine(ctx, arg)?;
        js_args.push(marshal::coerce(ctx, value, ty)?);
    }

    let result: JsValue = function.call((This(this), Rest(js_args)))?;
    match signature.return_type() {
        Some(ty) => Ok(marshal::to_host(&marshal::coerce(ctx, result, ty)?)),
        None => Ok(Value::Null),
    }
}

/// Maps a lookup error during binding, discarding any pending exception.
fn bind_failure(ctx: &Ctx<'_>, error: rquickjs::Error, lookup: BindFailure) -> BindFailure {
    match error {
        rquickjs::Error::Allocation => BindFailure::OutOfMemory,
        rquickjs::Error::Exception => {
            drop(ctx.catch());
            lookup
        }
        _ => lookup,
    }
}

fn nul_rejected(message: String) -> EngineFailure {
    EngineFailure {
        name: Some("SyntaxError".to_owned()),
        message,
        stack: None,
    }
}

/// Collects the pending exception after a failed engine call.
fn failure(ctx: &Ctx<'_>, error: rquickjs::Error) -> EngineFailure {
    if !error.is_exception() {
        return EngineFailure::message(error.to_string());
    }

    let thrown = ctx.catch();
    if let Some(object) = thrown.as_object() {
        let field = |key: &str| object.get::<_, Option<String>>(key).ok().flatten();
        let message = field("message").unwrap_or_else(|| coerce_to_string(&thrown));
        return EngineFailure {
            name: field("name"),
            message,
            stack: field("stack"),
        };
    }
    EngineFailure::message(coerce_to_string(&thrown))
}

fn coerce_to_string(value: &JsValue<'_>) -> String {
    value
        .get::<rquickjs::Coerced<String>>()
        .map_or_else(|_| String::from("<unprintable exception>"), |coerced| coerced.0)
}
