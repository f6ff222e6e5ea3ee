//! Errors surfaced by the cache.
//!
//! Every variant is fatal to the call that produced it. A prediction that
//! simply does not fire is *not* an error: it is reported as `Ok(None)` and
//! the engine falls through to executing the callable.

/// Result alias used throughout the crate.
pub type Result<T, E = CacheError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CacheError {
    /// The value contributes no fields to its fingerprint, so it has no identity.
    #[error("type `{type_name}` has no identity: its fingerprint covers no fields")]
    IdentityMismatch { type_name: &'static str },

    /// A result could not be coerced into the requested type.
    #[error("cannot coerce {found} into `{expected}`")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// Prediction was attempted with an argument that has no byte representation.
    #[error("argument of kind {kind} cannot be encoded for prediction")]
    UnsupportedArgumentType { kind: &'static str },

    /// The boxed container was requested as the result type of a boxed cache.
    #[error("`{type_name}` is already the boxed container and cannot be requested as a result type")]
    InvalidCapabilityCombination { type_name: &'static str },

    /// The handle outlived the slot it pointed to.
    #[error("stale handle: slot {index} no longer holds generation {generation}")]
    StaleHandle { index: usize, generation: u64 },
}
