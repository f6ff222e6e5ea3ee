//! Learnable hypotheses over raw argument bytes.

use crate::value::Value;

/// One learnable input→output hypothesis.
///
/// Rules see the arguments of a call only as the byte stream produced by
/// [`encode_args`](super::encode_args), and are taught every observed
/// result, whether or not they currently match.
pub trait PatternRule {
    /// Predicted result for `bytes`, if the rule is confident enough.
    fn matches(&self, bytes: &[u8]) -> Option<Value>;

    /// Observe one executed call.
    fn learn(&mut self, bytes: &[u8], result: &Value);

    /// Current confidence in `0..=100`.
    fn confidence(&self) -> u32;
}
