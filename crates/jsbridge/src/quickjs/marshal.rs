//! Conversion between host [`Value`]s and QuickJS values.
//!
//! `to_engine` and `to_host` are the plain marshaler; `coerce` applies the
//! JavaScript conversion for a declared method type on top of it.

use rquickjs::{Coerced, Ctx, String as JsString, Value as JsValue};

use crate::value::{Value, ValueType};

/// Builds the engine representation of a host value.
///
/// Only fails if the engine cannot allocate a string.
pub(crate) fn to_engine<'js>(ctx: &Ctx<'js>, value: &Value) -> rquickjs::Result<JsValue<'js>> {
    Ok(match value {
        Value::Null => JsValue::new_null(ctx.clone()),
        Value::Bool(b) => JsValue::new_bool(ctx.clone(), *b),
        Value::Int(i) => JsValue::new_int(ctx.clone(), *i),
        Value::Double(d) => JsValue::new_float(ctx.clone(), *d),
        Value::String(s) => JsString::from_str(ctx.clone(), s)?.into_value(),
    })
}

/// Reads an engine value back as a host value.
///
/// `undefined` and every non-primitive (objects, arrays, functions, symbols,
/// bigints) come back as [`Value::Null`].
pub(crate) fn to_host(value: &JsValue<'_>) -> Value {
    if let Some(b) = value.as_bool() {
        Value::Bool(b)
    } else if let Some(i) = value.as_int() {
        Value::Int(i)
    } else if let Some(d) = value.as_float() {
        Value::Double(d)
    } else if let Some(s) = value.as_string() {
        s.to_string().map_or(Value::Null, Value::String)
    } else {
        Value::Null
    }
}

/// Converts `value` to the declared type with JavaScript semantics.
///
/// `null` and `undefined` stay as they are for `String`, matching a nullable
/// reference type; the numeric and boolean types coerce them like any other
/// value (`ToInt32(null)` is `0`).
pub(crate) fn coerce<'js>(ctx: &Ctx<'js>, value: JsValue<'js>, ty: ValueType) -> rquickjs::Result<JsValue<'js>> {
    Ok(match ty {
        ValueType::Any => value,
        ValueType::String if value.is_null() || value.is_undefined() => value,
        ValueType::Bool => {
            let Coerced(b) = value.get::<Coerced<bool>>()?;
            JsValue::new_bool(ctx.clone(), b)
        }
        ValueType::Int => {
            let Coerced(i) = value.get::<Coerced<i32>>()?;
            JsValue::new_int(ctx.clone(), i)
        }
        ValueType::Double => {
            let Coerced(d) = value.get::<Coerced<f64>>()?;
            JsValue::new_float(ctx.clone(), d)
        }
        ValueType::String => {
            let Coerced(s) = value.get::<Coerced<String>>()?;
            JsString::from_str(ctx.clone(), &s)?.into_value()
        }
    })
}
