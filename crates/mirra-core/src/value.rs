//! Boxed value representation and the primitive box/unbox utility
//!
//! `Value` is the type-erased currency of the generic call path: accessor
//! arguments, return values, and enum constant values all travel as `Value`.
//! Primitives are stored inline; strings and opaque objects are
//! reference-counted, so `Value` is cheap to clone and `Send + Sync`.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::types::TypeRef;

/// Discriminant for the kinds a [`Value`] can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    /// Absent value
    Null,
    /// Boolean
    Bool,
    /// 32-bit signed integer
    I32,
    /// 64-bit signed integer
    I64,
    /// 64-bit float
    F64,
    /// Immutable string
    Str,
    /// Opaque reference-counted object
    Object,
}

impl ValueKind {
    /// Human-readable kind name, used in mismatch errors
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Bool => "bool",
            ValueKind::I32 => "i32",
            ValueKind::I64 => "i64",
            ValueKind::F64 => "f64",
            ValueKind::Str => "str",
            ValueKind::Object => "object",
        }
    }
}

/// Type-erased boxed value
#[derive(Clone, Default)]
pub enum Value {
    /// Absent value
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 32-bit signed integer
    I32(i32),
    /// 64-bit signed integer
    I64(i64),
    /// 64-bit float
    F64(f64),
    /// Immutable string
    Str(Arc<str>),
    /// Opaque reference-counted object
    Object(Arc<dyn Any + Send + Sync>),
}

impl Value {
    /// Create a null value
    #[inline]
    pub const fn null() -> Self {
        Value::Null
    }

    /// Create a boolean value
    #[inline]
    pub const fn bool(b: bool) -> Self {
        Value::Bool(b)
    }

    /// Create an i32 value
    #[inline]
    pub const fn i32(i: i32) -> Self {
        Value::I32(i)
    }

    /// Create an i64 value
    #[inline]
    pub const fn i64(i: i64) -> Self {
        Value::I64(i)
    }

    /// Create an f64 value
    #[inline]
    pub const fn f64(f: f64) -> Self {
        Value::F64(f)
    }

    /// Create a string value
    pub fn str(s: impl Into<Arc<str>>) -> Self {
        Value::Str(s.into())
    }

    /// Box an arbitrary object payload
    pub fn object<T: Any + Send + Sync>(value: T) -> Self {
        Value::Object(Arc::new(value))
    }

    /// Kind of this value
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::I32(_) => ValueKind::I32,
            Value::I64(_) => ValueKind::I64,
            Value::F64(_) => ValueKind::F64,
            Value::Str(_) => ValueKind::Str,
            Value::Object(_) => ValueKind::Object,
        }
    }

    /// Check for null
    #[inline]
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Extract a boolean (exact)
    #[inline]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Extract an i32 (exact)
    #[inline]
    pub fn as_i32(&self) -> Option<i32> {
        match self {
            Value::I32(i) => Some(*i),
            _ => None,
        }
    }

    /// Extract an i64, widening from i32
    #[inline]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::I64(i) => Some(*i),
            Value::I32(i) => Some(*i as i64),
            _ => None,
        }
    }

    /// Extract an f64, widening from i32/i64
    #[inline]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::F64(f) => Some(*f),
            Value::I32(i) => Some(*i as f64),
            Value::I64(i) => Some(*i as f64),
            _ => None,
        }
    }

    /// Borrow the string payload
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Downcast the object payload
    pub fn as_object<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        match self {
            Value::Object(obj) => obj.clone().downcast::<T>().ok(),
            _ => None,
        }
    }

    /// Borrow the payload as `&dyn Any` (objects only)
    pub fn as_any(&self) -> Option<&dyn Any> {
        match self {
            Value::Object(obj) => Some(obj.as_ref() as &dyn Any),
            _ => None,
        }
    }

    /// Canonical string form, used by the enum value model's reverse lookup
    pub fn display_string(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(b) => b.to_string(),
            Value::I32(i) => i.to_string(),
            Value::I64(i) => i.to_string(),
            Value::F64(f) => f.to_string(),
            Value::Str(s) => s.to_string(),
            Value::Object(obj) => format!("<object {:p}>", Arc::as_ptr(obj)),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "Null"),
            Value::Bool(b) => write!(f, "Bool({b})"),
            Value::I32(i) => write!(f, "I32({i})"),
            Value::I64(i) => write!(f, "I64({i})"),
            Value::F64(v) => write!(f, "F64({v})"),
            Value::Str(s) => write!(f, "Str({s:?})"),
            Value::Object(obj) => write!(f, "Object({:p})", Arc::as_ptr(obj)),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::I32(a), Value::I32(b)) => a == b,
            (Value::I64(a), Value::I64(b)) => a == b,
            (Value::F64(a), Value::F64(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            // Object identity, not structural equality
            (Value::Object(a), Value::Object(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

/// Boxing/unboxing contract between concrete Rust types and [`Value`]
///
/// The typed accessor path relies on these conversions being branch-cheap:
/// unboxing performs the `i32 -> i64` and `i32/i64 -> f64` widenings inline
/// and nothing else.
pub trait ValueType: Any + Send + Sync + Sized {
    /// Kind produced by [`ValueType::into_value`]
    const KIND: ValueKind;

    /// Box into a [`Value`]
    fn into_value(self) -> Value;

    /// Unbox from a [`Value`]; `None` on kind mismatch
    fn from_value(value: &Value) -> Option<Self>;

    /// Concrete type handle for this Rust type
    fn type_ref() -> TypeRef {
        TypeRef::of::<Self>()
    }
}

impl ValueType for () {
    const KIND: ValueKind = ValueKind::Null;

    fn into_value(self) -> Value {
        Value::Null
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.is_null().then_some(())
    }
}

impl ValueType for bool {
    const KIND: ValueKind = ValueKind::Bool;

    fn into_value(self) -> Value {
        Value::Bool(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_bool()
    }
}

impl ValueType for i32 {
    const KIND: ValueKind = ValueKind::I32;

    fn into_value(self) -> Value {
        Value::I32(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i32()
    }
}

impl ValueType for i64 {
    const KIND: ValueKind = ValueKind::I64;

    fn into_value(self) -> Value {
        Value::I64(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_i64()
    }
}

impl ValueType for f64 {
    const KIND: ValueKind = ValueKind::F64;

    fn into_value(self) -> Value {
        Value::F64(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_f64()
    }
}

impl ValueType for String {
    const KIND: ValueKind = ValueKind::Str;

    fn into_value(self) -> Value {
        Value::Str(self.into())
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_str().map(str::to_string)
    }
}

impl ValueType for Arc<str> {
    const KIND: ValueKind = ValueKind::Str;

    fn into_value(self) -> Value {
        Value::Str(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl<T: ValueType> ValueType for Option<T> {
    const KIND: ValueKind = T::KIND;

    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        if value.is_null() {
            Some(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl<T: Any + Send + Sync> ValueType for Arc<T> {
    const KIND: ValueKind = ValueKind::Object;

    fn into_value(self) -> Value {
        Value::Object(self)
    }

    fn from_value(value: &Value) -> Option<Self> {
        value.as_object::<T>()
    }
}
