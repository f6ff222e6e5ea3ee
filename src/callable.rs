//! Call descriptors.
//!
//! A [`Callable`] names the function being memoized and carries its two
//! capability flags. The name is the function's identity in call
//! fingerprints and in the predictor's per-method result cache, so two
//! different functions must not share a name within one cache.

use std::borrow::Cow;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Callable {
    name: Cow<'static, str>,
    skip_cache: bool,
    skip_predict: bool,
}

impl Callable {
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self {
            name: name.into(),
            skip_cache: false,
            skip_predict: false,
        }
    }

    /// Never cache this callable: execute it on every call, teach nothing.
    pub fn skip_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    /// Cache this callable's results, but never predict or learn them.
    pub fn skip_predict(mut self) -> Self {
        self.skip_predict = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }
    pub fn skips_cache(&self) -> bool {
        self.skip_cache
    }
    pub fn skips_prediction(&self) -> bool {
        self.skip_predict
    }
}

impl Display for Callable {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}
