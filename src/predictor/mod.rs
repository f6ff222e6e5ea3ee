//! Result prediction for memoized calls.
//!
//! The predictor answers "what would this call return" without executing it.
//! It consults two sources, in order:
//!
//! 1. a per-method [`ResultCache`] of results seen (or predicted) before, keyed
//!    by the hash of the encoded arguments;
//! 2. the registered [`PatternRule`]s, in registration order; the first rule
//!    that matches wins, and its answer is memoized into the result cache.
//!
//! Arguments are encoded into a flat little-endian byte stream by
//! [`encode_args`]. Only primitive [`Value`]s have an encoding; anything else
//! is [`CacheError::UnsupportedArgumentType`](crate::error::CacheError), so
//! callers check [`Value::is_primitive`] before asking.
//!
//! The result cache is bounded independently of the slot table of the
//! owning cache; the two are not kept consistent with each other.

pub mod arithmetic;
mod result_cache;
pub mod rule;

pub use arithmetic::{ArithmeticRule, Hypothesis, CONFIDENCE_THRESHOLD};
pub use result_cache::{ResultCache, DEFAULT_MAX_RESULTS_PER_METHOD};
pub use rule::PatternRule;

use log::{debug, trace};

use crate::error::Result;
use crate::utils::hash_bytes;
use crate::value::Value;

/// Predictive back-end of a cache.
pub trait PatternPredictor {
    /// Predicted result of `method(args)`, or `None` when nothing is known.
    fn try_predict(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>>;

    /// Observe the result of an executed call.
    fn learn(&mut self, method: &str, args: &[Value], result: Value) -> Result<()>;

    /// Append a rule; rules are evaluated in registration order.
    fn register_rule(&mut self, rule: Box<dyn PatternRule>);
}

#[derive(Debug, Clone)]
pub struct PredictorConfig {
    /// Bound of each method's result cache.
    pub max_results_per_method: usize,
}

impl Default for PredictorConfig {
    fn default() -> Self {
        Self {
            max_results_per_method: DEFAULT_MAX_RESULTS_PER_METHOD,
        }
    }
}

/// Encode call arguments into the byte stream seen by the rules.
pub fn encode_args(args: &[Value]) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    for arg in args {
        arg.encode(&mut bytes)?;
    }
    Ok(bytes)
}

/// Default predictor: result cache first, then rules.
pub struct Predictor {
    rules: Vec<Box<dyn PatternRule>>,
    results: ResultCache,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(PredictorConfig::default())
    }
}

impl Predictor {
    pub fn new(config: PredictorConfig) -> Self {
        Self {
            rules: Vec::new(),
            results: ResultCache::new(config.max_results_per_method),
        }
    }

    /// Predictor with an [`ArithmeticRule`] registered.
    pub fn with_default_rules(config: PredictorConfig) -> Self {
        let mut predictor = Self::new(config);
        predictor.register_rule(Box::new(ArithmeticRule::default()));
        predictor
    }

    pub fn rules(&self) -> &[Box<dyn PatternRule>] {
        &self.rules
    }

    pub fn result_cache(&self) -> &ResultCache {
        &self.results
    }
}

impl PatternPredictor for Predictor {
    fn try_predict(&mut self, method: &str, args: &[Value]) -> Result<Option<Value>> {
        let bytes = encode_args(args)?;
        let key = hash_bytes(&bytes);

        if let Some(result) = self.results.get(method, key) {
            trace!("try_predict({}): remembered {}", method, result);
            return Ok(Some(result.clone()));
        }

        let predicted = self.rules.iter().find_map(|rule| rule.matches(&bytes));
        match predicted {
            Some(result) => {
                debug!("try_predict({}): rule predicted {}", method, result);
                self.results.insert(method, key, result.clone());
                Ok(Some(result))
            }
            None => Ok(None),
        }
    }

    fn learn(&mut self, method: &str, args: &[Value], result: Value) -> Result<()> {
        let bytes = encode_args(args)?;
        let key = hash_bytes(&bytes);

        for rule in &mut self.rules {
            rule.learn(&bytes, &result);
        }
        self.results.insert(method, key, result);

        Ok(())
    }

    fn register_rule(&mut self, rule: Box<dyn PatternRule>) {
        self.rules.push(rule);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    use crate::error::CacheError;

    fn ints(a: i32, b: i32) -> [Value; 2] {
        [Value::Int(a), Value::Int(b)]
    }

    #[test]
    fn test_encode_args() {
        assert_eq!(
            encode_args(&ints(1, 2)).unwrap(),
            vec![1, 0, 0, 0, 2, 0, 0, 0]
        );
        assert_eq!(encode_args(&[]).unwrap(), Vec::<u8>::new());
        assert_eq!(
            encode_args(&[Value::Int(1), Value::List(vec![])]),
            Err(CacheError::UnsupportedArgumentType { kind: "list" })
        );
    }

    #[test]
    fn test_learn_remembers_result() {
        let mut predictor = Predictor::default();
        assert_eq!(predictor.try_predict("f", &ints(1, 2)).unwrap(), None);

        predictor
            .learn("f", &ints(1, 2), Value::from("three"))
            .unwrap();
        assert_eq!(
            predictor.try_predict("f", &ints(1, 2)).unwrap(),
            Some(Value::from("three"))
        );
        // Per-method: another method with the same args knows nothing.
        assert_eq!(predictor.try_predict("g", &ints(1, 2)).unwrap(), None);
    }

    #[test]
    fn test_sum_rule_scenario() {
        let mut predictor = Predictor::with_default_rules(PredictorConfig::default());

        predictor.learn("add", &ints(2, 3), Value::Int(5)).unwrap();
        predictor.learn("add", &ints(4, 5), Value::Int(9)).unwrap();
        predictor.learn("add", &ints(1, 1), Value::Int(2)).unwrap();
        assert_eq!(predictor.rules()[0].confidence(), 50);
        assert_eq!(predictor.try_predict("add", &ints(10, 20)).unwrap(), None);

        predictor.learn("add", &ints(6, 7), Value::Int(13)).unwrap();
        assert_eq!(predictor.rules()[0].confidence(), 70);
        assert_eq!(predictor.try_predict("add", &ints(10, 20)).unwrap(), None);

        predictor.learn("add", &ints(8, 9), Value::Int(17)).unwrap();
        assert!(predictor.rules()[0].confidence() >= CONFIDENCE_THRESHOLD);
        assert_eq!(
            predictor.try_predict("add", &ints(10, 20)).unwrap(),
            Some(Value::Int(30))
        );
        // The prediction is now remembered.
        assert_eq!(predictor.result_cache().len("add"), 6);
    }

    #[test]
    fn test_rules_in_registration_order() {
        struct Always(i32);

        impl PatternRule for Always {
            fn matches(&self, _bytes: &[u8]) -> Option<Value> {
                Some(Value::Int(self.0))
            }
            fn learn(&mut self, _bytes: &[u8], _result: &Value) {}
            fn confidence(&self) -> u32 {
                100
            }
        }

        let mut predictor = Predictor::default();
        predictor.register_rule(Box::new(Always(1)));
        predictor.register_rule(Box::new(Always(2)));
        assert_eq!(
            predictor.try_predict("f", &ints(0, 0)).unwrap(),
            Some(Value::Int(1))
        );
    }

    #[test]
    fn test_every_rule_learns() {
        let mut predictor = Predictor::default();
        predictor.register_rule(Box::new(ArithmeticRule::new()));
        predictor.register_rule(Box::new(ArithmeticRule::new()));

        predictor.learn("f", &ints(2, 3), Value::Int(5)).unwrap();
        assert_eq!(predictor.rules()[0].confidence(), 10);
        assert_eq!(predictor.rules()[1].confidence(), 10);
    }

    #[test]
    fn test_unsupported_arguments() {
        let mut predictor = Predictor::default();
        let args = [Value::Unit];
        assert!(matches!(
            predictor.try_predict("f", &args),
            Err(CacheError::UnsupportedArgumentType { kind: "unit" })
        ));
        assert!(predictor.learn("f", &args, Value::Int(1)).is_err());
    }

    #[test]
    fn test_colliding_argument_keys_share_a_result() {
        let key = |a, b| hash_bytes(&encode_args(&ints(a, b)).unwrap());
        assert_eq!(key(1, 0), key(7936, 0));

        let mut predictor = Predictor::new(PredictorConfig::default());
        predictor.learn("f", &ints(1, 0), Value::Int(111)).unwrap();
        assert_eq!(
            predictor.try_predict("f", &ints(7936, 0)).unwrap(),
            Some(Value::Int(111))
        );
    }
}
