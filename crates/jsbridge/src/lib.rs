#![doc = include_str!("../../../README.md")]

mod context;
mod engine;
mod error;
mod exception;
mod guard;
mod interface;
mod proxy;
mod quickjs;
mod resource;
mod value;

pub use crate::{
    context::{Context, DEFAULT_SOURCE_NAME},
    engine::{BindFailure, BoundHandle, Engine, EngineFailure, MethodId},
    error::{BindingError, DispatchError, Error, Result},
    exception::{LANGUAGE, ScriptError, StackFrame, TOP_LEVEL_FUNCTION, translate},
    interface::{InterfaceDescriptor, MethodSignature, MethodTable},
    proxy::{JsInterface, Proxy, ProxyBinding},
    quickjs::QuickJs,
    resource::{EngineLimits, ResourceError},
    value::{JsType, Value, ValueType},
};
