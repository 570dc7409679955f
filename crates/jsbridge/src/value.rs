//! Values that cross the host/engine boundary.
//!
//! The boundary is deliberately narrow: only `null`, booleans, 32-bit integers,
//! doubles and strings are carried across. Anything else the engine produces
//! (objects, arrays, functions, symbols, `undefined`) arrives on the host side
//! as [`Value::Null`]. That lossy conversion is part of the contract, not an error.

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString, IntoStaticStr};

/// A script value as seen by the host.
///
/// # JSON Serialization
///
/// `Value` serializes with the natural JSON mapping (`null`, `true`/`false`,
/// numbers, strings). When deserializing, integral numbers that fit in an
/// `i32` become [`Value::Int`], every other number becomes [`Value::Double`].
///
/// # Equality
///
/// Numbers compare by numeric value across `Int` and `Double`, as JavaScript
/// numbers do: the engine is free to store `3.0` as an integer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// JavaScript `null` or `undefined`, and every unsupported engine value.
    #[default]
    Null,
    /// JavaScript boolean.
    Bool(bool),
    /// A number the engine holds as a 32-bit integer.
    Int(i32),
    /// A number the engine holds as an IEEE 754 double.
    Double(f64),
    /// JavaScript string (UTF-8 on the host side).
    String(String),
}

impl Value {
    /// Returns `true` for [`Value::Null`].
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the numeric value, widening integers to doubles.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(*i)),
            Self::Double(f) => Some(*f),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// The declared type this value satisfies without coercion, `None` for null.
    #[must_use]
    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ValueType::Bool),
            Self::Int(_) => Some(ValueType::Int),
            Self::Double(_) => Some(ValueType::Double),
            Self::String(_) => Some(ValueType::String),
        }
    }

    /// Short type name used in error messages.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.value_type().map_or("null", Into::into)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            (Self::String(a), Self::String(b)) => a == b,
            (Self::Int(_) | Self::Double(_), Self::Int(_) | Self::Double(_)) => self.as_f64() == other.as_f64(),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Double(d) => write!(f, "{d}"),
            Self::String(s) => f.write_str(s),
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_owned())
    }
}

impl From<()> for Value {
    fn from((): ()) -> Self {
        Self::Null
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Declared type of a method parameter or return value.
///
/// The QuickJS backend coerces arguments and results to the declared type
/// using JavaScript conversion rules (`ToBoolean`, `ToInt32`, `ToNumber`,
/// `ToString`). `Any` passes values through the plain marshaler untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[strum(to_string = "boolean")]
    #[serde(rename = "boolean")]
    Bool,
    Int,
    Double,
    String,
    Any,
}

impl ValueType {
    /// Returns `true` if `value` can be passed for this type without coercion.
    #[must_use]
    pub fn accepts(self, value: &Value) -> bool {
        match self {
            Self::Any => true,
            Self::Double => matches!(value, Value::Int(_) | Value::Double(_)),
            _ => value.value_type() == Some(self),
        }
    }
}

/// A Rust type with a fixed mapping onto [`Value`].
///
/// Implemented for the types typed interface adapters may use in their method
/// signatures. `Option<T>` declares [`ValueType::Any`] so that `null` survives
/// the trip instead of being coerced (e.g. to `0`), and `()` is the void return.
pub trait JsType: Sized {
    /// Type declared for a parameter of this Rust type.
    const VALUE_TYPE: ValueType;
    /// Type declared for a return value of this Rust type, `None` for void.
    const RETURN_TYPE: Option<ValueType> = Some(Self::VALUE_TYPE);
    /// Name used for this type in error messages.
    const TYPE_NAME: &'static str;

    /// Converts into a boundary value.
    fn into_value(self) -> Value;

    /// Converts from a boundary value, handing the value back on mismatch.
    fn from_value(value: Value) -> Result<Self, Value>;
}

impl JsType for bool {
    const VALUE_TYPE: ValueType = ValueType::Bool;
    const TYPE_NAME: &'static str = "boolean";

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(other),
        }
    }
}

impl JsType for i32 {
    const VALUE_TYPE: ValueType = ValueType::Int;
    const TYPE_NAME: &'static str = "int";

    fn into_value(self) -> Value {
        Value::Int(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(i),
            other => Err(other),
        }
    }
}

impl JsType for f64 {
    const VALUE_TYPE: ValueType = ValueType::Double;
    const TYPE_NAME: &'static str = "double";

    fn into_value(self) -> Value {
        Value::Double(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::Int(i) => Ok(f64::from(i)),
            Value::Double(d) => Ok(d),
            other => Err(other),
        }
    }
}

impl JsType for String {
    const VALUE_TYPE: ValueType = ValueType::String;
    const TYPE_NAME: &'static str = "string";

    fn into_value(self) -> Value {
        Value::String(self)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(other),
        }
    }
}

impl JsType for Value {
    const VALUE_TYPE: ValueType = ValueType::Any;
    const TYPE_NAME: &'static str = "any";

    fn into_value(self) -> Value {
        self
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        Ok(value)
    }
}

impl<T: JsType> JsType for Option<T> {
    const VALUE_TYPE: ValueType = ValueType::Any;
    const TYPE_NAME: &'static str = T::TYPE_NAME;

    fn into_value(self) -> Value {
        self.map_or(Value::Null, JsType::into_value)
    }

    fn from_value(value: Value) -> Result<Self, Value> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl JsType for () {
    const VALUE_TYPE: ValueType = ValueType::Any;
    const RETURN_TYPE: Option<ValueType> = None;
    const TYPE_NAME: &'static str = "void";

    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(_value: Value) -> Result<Self, Value> {
        Ok(())
    }
}
