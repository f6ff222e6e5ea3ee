//! Structural fingerprints.
//!
//! A fingerprint is a stable `u64` identity derived from the *contents* of a
//! value, not from its address. Types opt in by implementing [`Cacheable`]
//! and feeding their identity-relevant fields, in order, to a
//! [`FieldHasher`]:
//!
//! ```
//! use memo_rs::fingerprint::{Cacheable, FieldHasher};
//!
//! struct Point {
//!     x: i32,
//!     y: i32,
//!     label: String,
//! }
//!
//! impl Cacheable for Point {
//!     fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
//!         hasher.field(&self.x).field(&self.y).field(&self.label);
//!     }
//! }
//!
//! let a = Point { x: 1, y: 2, label: "a".into() };
//! let b = Point { x: 1, y: 2, label: "a".into() };
//! assert_eq!(a.fingerprint(), b.fingerprint());
//! ```
//!
//! Calls are fingerprinted by [`call_fingerprint`] over the callable name
//! followed by the ordered arguments.

use std::any::type_name;

use crate::error::{CacheError, Result};
use crate::utils::{combine, hash_str, SEED};
use crate::value::Value;

/// Accumulates the ordered fields of a value into a fingerprint.
#[derive(Debug, Clone)]
pub struct FieldHasher {
    state: u64,
    fields: usize,
}

impl Default for FieldHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldHasher {
    pub fn new() -> Self {
        Self {
            state: SEED,
            fields: 0,
        }
    }

    /// Fold a nested cacheable field.
    pub fn field<F>(&mut self, field: &F) -> &mut Self
    where
        F: Cacheable + ?Sized,
    {
        self.write_u64(field.fingerprint())
    }

    /// Fold a raw component.
    pub fn write_u64(&mut self, h: u64) -> &mut Self {
        self.state = combine(self.state, h);
        self.fields += 1;
        self
    }

    /// Number of components folded so far.
    pub fn fields(&self) -> usize {
        self.fields
    }

    pub fn finish(&self) -> u64 {
        self.state
    }
}

/// Values with a structural identity.
pub trait Cacheable {
    /// Feed the identity-relevant fields, in a fixed order.
    fn fingerprint_fields(&self, hasher: &mut FieldHasher);

    fn fingerprint(&self) -> u64 {
        let mut hasher = FieldHasher::new();
        self.fingerprint_fields(&mut hasher);
        hasher.finish()
    }
}

/// Fingerprint of a value.
pub fn fingerprint<T>(value: &T) -> u64
where
    T: Cacheable + ?Sized,
{
    value.fingerprint()
}

/// Fingerprint of a value that must carry an identity.
///
/// A value that contributes no fields would collide with every other
/// instance of its type, so it is rejected with
/// [`CacheError::IdentityMismatch`].
pub fn identity<T>(value: &T) -> Result<u64>
where
    T: Cacheable + ?Sized,
{
    let mut hasher = FieldHasher::new();
    value.fingerprint_fields(&mut hasher);
    if hasher.fields() == 0 {
        return Err(CacheError::IdentityMismatch {
            type_name: type_name::<T>(),
        });
    }
    Ok(hasher.finish())
}

/// Fingerprint of a call: callable name, then every argument in order.
pub fn call_fingerprint(name: &str, args: &[Value]) -> u64 {
    let mut hasher = FieldHasher::new();
    hasher.field(name);
    for arg in args {
        hasher.field(arg);
    }
    hasher.finish()
}

macro_rules! cacheable_int {
    ($($ty:ty),*) => {
        $(
            impl Cacheable for $ty {
                fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
                    hasher.write_u64(*self as u64);
                }
            }
        )*
    };
}

cacheable_int!(u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl Cacheable for bool {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.write_u64(*self as u64);
    }
}

impl Cacheable for char {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.write_u64(*self as u64);
    }
}

impl Cacheable for f32 {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.write_u64(self.to_bits() as u64);
    }
}

impl Cacheable for f64 {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.write_u64(self.to_bits());
    }
}

impl Cacheable for str {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.write_u64(hash_str(self));
    }
}

impl Cacheable for String {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        self.as_str().fingerprint_fields(hasher);
    }
}

impl<T: Cacheable> Cacheable for [T] {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        // The length keeps `[]` distinct from an absent field.
        hasher.write_u64(self.len() as u64);
        for item in self {
            hasher.field(item);
        }
    }
}

impl<T: Cacheable> Cacheable for Vec<T> {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        self.as_slice().fingerprint_fields(hasher);
    }
}

impl<T: Cacheable> Cacheable for Option<T> {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        match self {
            None => hasher.write_u64(0),
            Some(value) => hasher.write_u64(1).field(value),
        };
    }
}

impl<T: Cacheable + ?Sized> Cacheable for &T {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        (**self).fingerprint_fields(hasher);
    }
}

impl<T: Cacheable + ?Sized> Cacheable for Box<T> {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        (**self).fingerprint_fields(hasher);
    }
}

impl<A: Cacheable, B: Cacheable> Cacheable for (A, B) {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.field(&self.0).field(&self.1);
    }
}

impl<A: Cacheable, B: Cacheable, C: Cacheable> Cacheable for (A, B, C) {
    fn fingerprint_fields(&self, hasher: &mut FieldHasher) {
        hasher.field(&self.0).field(&self.1).field(&self.2);
    }
}
