//! Arithmetic pattern rule.
//!
//! The rule decodes the first two little-endian `i32`s of the argument bytes
//! and guesses that the result is their sum, their product, or a constant.
//!
//! # Confidence
//!
//! ```text
//! first observation  -> fit hypothesis, confidence = 10
//! confirmation       -> confidence += 20 (capped at 100)
//! mismatch           -> budget -= 1, confidence -= 10 (floored at 0)
//! budget exhausted   -> refit from this observation, confidence = 10, budget reset
//! ```
//!
//! Predictions are only made at confidence 80 or above.

use log::debug;

use super::rule::PatternRule;
use crate::value::Value;

pub const CONFIDENCE_THRESHOLD: u32 = 80;
pub const INITIAL_CONFIDENCE: u32 = 10;
pub const MAX_CONFIDENCE: u32 = 100;
pub const REINFORCEMENT: u32 = 20;
pub const DECAY: u32 = 10;
pub const DEFAULT_MISMATCH_BUDGET: u32 = 5;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Hypothesis {
    Sum,
    Product,
    Constant(i32),
}

impl Hypothesis {
    /// Pick the first hypothesis explaining `output`, falling back to a constant.
    pub fn fit(bytes: &[u8], output: i32) -> Self {
        match operands(bytes) {
            Some((a, b)) if a.wrapping_add(b) == output => Hypothesis::Sum,
            Some((a, b)) if a.wrapping_mul(b) == output => Hypothesis::Product,
            _ => Hypothesis::Constant(output),
        }
    }

    /// Evaluate the hypothesis. Sum and product need at least eight bytes.
    pub fn apply(self, bytes: &[u8]) -> Option<i32> {
        match self {
            Hypothesis::Sum => operands(bytes).map(|(a, b)| a.wrapping_add(b)),
            Hypothesis::Product => operands(bytes).map(|(a, b)| a.wrapping_mul(b)),
            Hypothesis::Constant(c) => Some(c),
        }
    }
}

fn operands(bytes: &[u8]) -> Option<(i32, i32)> {
    let a = bytes.get(0..4)?.try_into().ok()?;
    let b = bytes.get(4..8)?.try_into().ok()?;
    Some((i32::from_le_bytes(a), i32::from_le_bytes(b)))
}

#[derive(Debug, Clone)]
pub struct ArithmeticRule {
    hypothesis: Option<Hypothesis>,
    confidence: u32,
    budget: u32,
    initial_budget: u32,
}

impl Default for ArithmeticRule {
    fn default() -> Self {
        Self::with_budget(DEFAULT_MISMATCH_BUDGET)
    }
}

impl ArithmeticRule {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a rule that refits after `budget` mismatches.
    pub fn with_budget(budget: u32) -> Self {
        assert!(budget > 0, "Mismatch budget should be positive");
        Self {
            hypothesis: None,
            confidence: 0,
            budget,
            initial_budget: budget,
        }
    }

    pub fn hypothesis(&self) -> Option<Hypothesis> {
        self.hypothesis
    }

    /// Mismatches left before the hypothesis is refitted.
    pub fn budget(&self) -> u32 {
        self.budget
    }

    fn refit(&mut self, bytes: &[u8], output: i32) {
        let hypothesis = Hypothesis::fit(bytes, output);
        debug!("arithmetic rule: fitted {:?}", hypothesis);
        self.hypothesis = Some(hypothesis);
        self.confidence = INITIAL_CONFIDENCE;
        self.budget = self.initial_budget;
    }
}

impl PatternRule for ArithmeticRule {
    fn matches(&self, bytes: &[u8]) -> Option<Value> {
        if self.confidence < CONFIDENCE_THRESHOLD {
            return None;
        }
        self.hypothesis?.apply(bytes).map(Value::Int)
    }

    fn learn(&mut self, bytes: &[u8], result: &Value) {
        // Only integer results say anything about arithmetic.
        let Some(output) = result.as_i32() else {
            return;
        };

        let Some(hypothesis) = self.hypothesis else {
            self.refit(bytes, output);
            return;
        };

        if hypothesis.apply(bytes) == Some(output) {
            self.confidence = (self.confidence + REINFORCEMENT).min(MAX_CONFIDENCE);
            return;
        }

        self.budget -= 1;
        if self.budget == 0 {
            debug!("arithmetic rule: {:?} exhausted its budget", hypothesis);
            self.refit(bytes, output);
        } else {
            self.confidence = self.confidence.saturating_sub(DECAY);
        }
    }

    fn confidence(&self) -> u32 {
        self.confidence
    }
}
