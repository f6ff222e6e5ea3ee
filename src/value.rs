//! Dynamic values flowing through the predictor.
//!
//! Call arguments are passed as [`Value`]s so that they can be fingerprinted
//! and, for primitive kinds, serialised into the byte stream the pattern
//! rules learn from. Results cross into the same representation through
//! [`Coerce`].
//!
//! [`Boxed`] is the container stored by a dynamically typed cache
//! (`Cache<Boxed>`). It holds exactly one [`Value`] and never another
//! `Boxed`, so there is no nested unwrapping to do.

use std::any::type_name;
use std::fmt::{Display, Formatter};

use crate::error::{CacheError, Result};
use crate::fingerprint::{Cacheable, FieldHasher};
use crate::utils::hash_str;

#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Unit,
    Bool(bool),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    Text(String),
    List(Vec<Value>),
}

impl Value {
    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::Unit => "unit",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Long(_) => "long",
            Value::Float(_) => "float",
            Value::Double(_) => "double",
            Value::Text(_) => "text",
            Value::List(_) => "list",
        }
    }

    /// Whether the value is a fixed-width numeric or a text, i.e. has a byte encoding.
    pub fn is_primitive(&self) -> bool {
        !matches!(self, Value::Unit | Value::List(_))
    }

    /// Integer view of the value, if it fits into `i32`.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int(x) => Some(x),
            Value::Long(x) => i32::try_from(x).ok(),
            Value::Bool(b) => Some(b as i32),
            _ => None,
        }
    }

    /// Append the little-endian byte encoding of the value to `out`.
    pub fn encode(&self, out: &mut Vec<u8>) -> Result<()> {
        match self {
            Value::Bool(b) => out.push(*b as u8),
            Value::Int(x) => out.extend_from_slice(&x.to_le_bytes()),
            Value::Long(x) => out.extend_from_slice(&x.to_le_bytes()),
            Value::Float(x) => out.extend_from_slice(&x.to_le_bytes()),
            Value::Double(x) => out.extend_from_slice(&x.to_le_bytes()),
            Value::Text(s) => out.extend_from_slice(s.as_bytes()),
            Value::Unit | Value::List(_) => {
                return Err(CacheError::UnsupportedArgumentType { kind: self.kind() });
            }
        }
        Ok(())
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Unit => write!(f, "()"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(x) => write!(f, "{}", x),
            Value::Long(x) => write!(f, "{}L", x),
            Value::Float(x) => write!(f, "{}f", x),
            Value::Double(x) => write!(f, "{}", x),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                write!(f, "]")
            }
        }
    }
}

impl Cacheable for Value {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        match self {
            Value::Unit => hasher.write_u64(0),
            Value::Bool(b) => hasher.write_u64(1).write_u64(*b as u64),
            Value::Int(x) => hasher.write_u64(2).write_u64(*x as u64),
            Value::Long(x) => hasher.write_u64(3).write_u64(*x as u64),
            Value::Float(x) => hasher.write_u64(4).write_u64(x.to_bits() as u64),
            Value::Double(x) => hasher.write_u64(5).write_u64(x.to_bits()),
            Value::Text(s) => hasher.write_u64(6).write_u64(hash_str(s)),
            Value::List(items) => hasher.write_u64(7).field(items.as_slice()),
        };
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Unit
    }
}
impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}
impl From<i32> for Value {
    fn from(x: i32) -> Self {
        Value::Int(x)
    }
}
impl From<i64> for Value {
    fn from(x: i64) -> Self {
        Value::Long(x)
    }
}
impl From<f32> for Value {
    fn from(x: f32) -> Self {
        Value::Float(x)
    }
}
impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Value::Double(x)
    }
}
impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_owned())
    }
}
impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Text(s)
    }
}
impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::List(items.into_iter().map(Into::into).collect())
    }
}

/// The container stored by a dynamically typed cache.
#[derive(Debug, Clone, PartialEq)]
pub struct Boxed(Value);

impl Boxed {
    pub fn new(value: impl Into<Value>) -> Self {
        Self(value.into())
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<Value> for Boxed {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl Display for Boxed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Cacheable for Boxed {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        self.0.fingerprint_fields(hasher);
    }
}

/// Conversion between a cached result type and [`Value`].
///
/// Types without a [`Value`] representation can rely on the defaults: they
/// are never taught to the predictor, and a predicted value can never be
/// turned into them.
pub trait Coerce: Sized {
    /// The [`Value`] the predictor learns for this result, if any.
    fn to_value(&self) -> Option<Value> {
        None
    }

    /// Turn a (possibly predicted) value back into the result type.
    fn from_value(value: Value) -> Result<Self> {
        Err(mismatch::<Self>(&value))
    }
}

fn mismatch<T>(value: &Value) -> CacheError {
    CacheError::TypeMismatch {
        expected: type_name::<T>(),
        found: value.kind(),
    }
}

impl Coerce for Value {
    fn to_value(&self) -> Option<Value> {
        Some(self.clone())
    }
    fn from_value(value: Value) -> Result<Self> {
        Ok(value)
    }
}

// Boxing adapter: any value can be put into the container.
impl Coerce for Boxed {
    fn to_value(&self) -> Option<Value> {
        Some(self.0.clone())
    }
    fn from_value(value: Value) -> Result<Self> {
        Ok(Boxed(value))
    }
}

impl Coerce for () {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Unit)
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Unit => Ok(()),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Coerce for String {
    fn to_value(&self) -> Option<Value> {
        Some(Value::Text(self.clone()))
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Text(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Implements [`Coerce`] for a primitive: `$variant` is its own variant,
/// `$wide` lists the variants it widens from losslessly.
macro_rules! coerce_primitive {
    ($ty:ty, $variant:ident $(, $wide:ident)*) => {
        impl Coerce for $ty {
            fn to_value(&self) -> Option<Value> {
                Some(Value::$variant(*self))
            }
            fn from_value(value: Value) -> Result<Self> {
                match value {
                    Value::$variant(x) => Ok(x),
                    $(Value::$wide(x) => Ok(x.into()),)*
                    other => Err(mismatch::<Self>(&other)),
                }
            }
        }
    };
}

coerce_primitive!(bool, Bool);
coerce_primitive!(i32, Int);
coerce_primitive!(i64, Long, Int);
coerce_primitive!(f32, Float);
coerce_primitive!(f64, Double, Float, Int);
