//! Stable hashing primitives.
//!
//! Everything that ends up in a fingerprint goes through these functions.
//! They are deterministic across runs and processes, unlike the randomly
//! seeded [`std::collections::hash_map::DefaultHasher`].

/// Initial state of every fold.
pub const SEED: u64 = 17;

/// Multiplier applied to the running state before each new component.
pub const FACTOR: u64 = 31;

/// Fold one component into the running state.
///
/// ```text
/// (state, h) -> state * 31 + h
/// ```
#[inline]
pub fn combine(state: u64, h: u64) -> u64 {
    state.wrapping_mul(FACTOR).wrapping_add(h)
}

/// Fold a sequence of components, starting from [`SEED`].
pub fn combine_all<I>(items: I) -> u64
where
    I: IntoIterator<Item = u64>,
{
    items.into_iter().fold(SEED, combine)
}

/// [DJB2][djb2]-style string hash, `xor` variant, unrolled by four.
///
/// [djb2]: http://www.cse.yorku.ca/~oz/hash.html
pub fn hash_str(input: &str) -> u64 {
    let mut hash: u64 = 5381;
    let mut step = |c: u8| hash = ((hash << 5).wrapping_add(hash)) ^ c as u64;

    let mut chunks = input.as_bytes().chunks_exact(4);
    for chunk in &mut chunks {
        step(chunk[0]);
        step(chunk[1]);
        step(chunk[2]);
        step(chunk[3]);
    }
    for &c in chunks.remainder() {
        step(c);
    }

    hash
}

/// Hash of a raw byte stream.
pub fn hash_bytes(bytes: &[u8]) -> u64 {
    combine_all(bytes.iter().map(|&b| b as u64))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_combine() {
        assert_eq!(combine(SEED, 0), 17 * 31);
        assert_eq!(combine(SEED, 5), 17 * 31 + 5);
        assert_eq!(combine_all([0u64; 0]), SEED);
        assert_eq!(combine_all([1, 2]), (17 * 31 + 1) * 31 + 2);
    }

    #[test]
    fn test_combine_is_order_sensitive() {
        assert_ne!(combine_all([1, 2]), combine_all([2, 1]));
    }

    #[test]
    fn test_hash_str() {
        assert_eq!(hash_str(""), 5381);
        assert_eq!(hash_str("a"), (5381 * 33) ^ 97);
        assert_eq!(hash_str("hello"), hash_str("hello"));
        assert_ne!(hash_str("hello"), hash_str("hellp"));
        // Remainder handling: lengths not divisible by four.
        assert_ne!(hash_str("abcde"), hash_str("abcd"));
    }

    #[test]
    fn test_hash_bytes() {
        assert_eq!(hash_bytes(&[]), SEED);
        assert_eq!(hash_bytes(&[1]), 17 * 31 + 1);
        assert_ne!(hash_bytes(&[1, 0]), hash_bytes(&[0, 1]));
    }
}
