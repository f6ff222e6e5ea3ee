use std::any::{type_name, TypeId};

use log::{debug, trace, warn};

use crate::callable::Callable;
use crate::error::{CacheError, Result};
use crate::fingerprint::{call_fingerprint, identity, Cacheable};
use crate::predictor::{
    ArithmeticRule, PatternPredictor, PatternRule, Predictor, PredictorConfig,
};
use crate::slot::{Handle, SlotTable};
use crate::value::{Boxed, Coerce, Value};

/// Configuration of a [`Cache`].
///
/// # Examples
///
/// ```
/// use memo_rs::cache::{Cache, CacheConfig};
///
/// let config = CacheConfig {
///     capacity: 64,
///     default_ttl: 100,
///     predictive_mode: false,
///     ..Default::default()
/// };
/// let cache = Cache::<i32>::with_config(config);
/// assert_eq!(cache.capacity(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Number of slots (default: 16)
    pub capacity: usize,
    /// Hits a fresh slot allows before expiring (default: 10)
    pub default_ttl: u32,
    /// Whether calls may be answered by the predictor (default: true)
    pub predictive_mode: bool,
    /// Whether the predictor starts with an [`ArithmeticRule`] (default: true)
    pub default_rules: bool,
    /// Predictor settings
    pub predictor: PredictorConfig,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 16,
            default_ttl: 10,
            predictive_mode: true,
            default_rules: true,
            predictor: PredictorConfig::default(),
        }
    }
}

/// Counters of a [`Cache`].
#[derive(Debug, Default, Copy, Clone, Eq, PartialEq)]
pub struct CacheStats {
    /// Slot lookups that found a live slot.
    pub hits: usize,
    /// Slot lookups that did not.
    pub misses: usize,
    /// Calls answered by the predictor.
    pub predictions: usize,
    /// Calls that ran the callable.
    pub executions: usize,
    /// Insertions that overwrote an occupied slot.
    pub evictions: usize,
}

/// Memoizing object pool over a fixed-capacity [`SlotTable`].
///
/// # Identity dedup
///
/// [`acquire`][Cache::acquire] and [`acquire_ref`][Cache::acquire_ref] take a
/// freshly constructed value and return the cached instance with the same
/// fingerprint if a live one exists, dropping the new value. Otherwise the
/// value is [pinned][Cache::pin] into a slot.
///
/// # Call memoization
///
/// [`invoke`][Cache::invoke] looks the call up by fingerprint. On a miss it
/// asks the predictor (in predictive mode), and only then runs the callable,
/// storing its result and teaching it to the predictor. Predicted results
/// are returned directly and are never stored in a slot.
///
/// ```
/// use memo_rs::cache::Cache;
/// use memo_rs::callable::Callable;
/// use memo_rs::value::Value;
///
/// let mut cache = Cache::<i32>::new(8, 10, false);
/// let add = Callable::new("add");
/// let mut calls = 0;
///
/// for _ in 0..3 {
///     let sum = cache
///         .invoke(&add, &[Value::Int(2), Value::Int(3)], |_| {
///             calls += 1;
///             5
///         })
///         .unwrap();
///     assert_eq!(sum, 5);
/// }
/// assert_eq!(calls, 1);
/// ```
pub struct Cache<T> {
    slots: SlotTable<T>,
    default_ttl: u32,
    predictor: Option<Box<dyn PatternPredictor>>,
    predictions: usize,
    executions: usize,
}

impl<T> Cache<T> {
    pub fn new(capacity: usize, default_ttl: u32, predictive_mode: bool) -> Self {
        Self::with_config(CacheConfig {
            capacity,
            default_ttl,
            predictive_mode,
            ..Default::default()
        })
    }

    pub fn with_config(config: CacheConfig) -> Self {
        let predictor = config.predictive_mode.then(|| {
            let mut predictor = Predictor::new(config.predictor.clone());
            if config.default_rules {
                predictor.register_rule(Box::new(ArithmeticRule::default()));
            }
            Box::new(predictor) as Box<dyn PatternPredictor>
        });
        Self::build(&config, predictor)
    }

    /// Create a predictive cache backed by a custom predictor.
    ///
    /// `config.predictive_mode` and `config.default_rules` are ignored.
    pub fn with_predictor(config: CacheConfig, predictor: Box<dyn PatternPredictor>) -> Self {
        Self::build(&config, Some(predictor))
    }

    fn build(config: &CacheConfig, predictor: Option<Box<dyn PatternPredictor>>) -> Self {
        assert!(config.capacity > 0, "Cache capacity should be positive");

        debug!(
            "new cache: capacity = {}, ttl = {}, predictive = {}",
            config.capacity,
            config.default_ttl,
            predictor.is_some()
        );

        Self {
            slots: SlotTable::new(config.capacity),
            default_ttl: config.default_ttl,
            predictor,
            predictions: 0,
            executions: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.capacity()
    }
    pub fn default_ttl(&self) -> u32 {
        self.default_ttl
    }
    pub fn is_predictive(&self) -> bool {
        self.predictor.is_some()
    }
    pub fn slots(&self) -> &SlotTable<T> {
        &self.slots
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.slots.hits(),
            misses: self.slots.misses(),
            predictions: self.predictions,
            executions: self.executions,
            evictions: self.slots.evictions(),
        }
    }

    /// Add a pattern rule to the predictor.
    ///
    /// Outside predictive mode there is no predictor and the rule is dropped.
    pub fn register_rule(&mut self, rule: impl PatternRule + 'static) {
        match self.predictor.as_mut() {
            Some(predictor) => predictor.register_rule(Box::new(rule)),
            None => warn!("register_rule: predictive mode is off, rule ignored"),
        }
    }

    /// Look a fingerprint up directly, consuming one use on a hit.
    pub fn try_get(&mut self, fingerprint: u64) -> Option<&T> {
        let handle = self.slots.lookup(fingerprint)?;
        self.slots.get(handle).ok()
    }

    /// Empty every expired slot. Returns the number of slots cleared.
    pub fn cleanup_expired(&mut self) -> usize {
        self.slots.cleanup_expired()
    }

    /// Dereference a handle returned by [`acquire_ref`][Cache::acquire_ref] or [`pin`][Cache::pin].
    pub fn get(&self, handle: Handle) -> Result<&T> {
        self.slots.get(handle)
    }
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.slots.get_mut(handle)
    }
}

impl<T: Cacheable> Cache<T> {
    /// Structural fingerprint of a value.
    pub fn fingerprint(&self, value: &T) -> u64 {
        value.fingerprint()
    }

    /// Store `value` in a new slot, evicting the slot with the fewest remaining uses.
    pub fn pin(&mut self, value: T) -> Result<Handle> {
        let fingerprint = identity(&value)?;
        Ok(self.slots.insert(fingerprint, value, self.default_ttl))
    }

    /// Deduplicate `value` against the cache and return a handle to the stored instance.
    pub fn acquire_ref(&mut self, value: T) -> Result<Handle> {
        let fingerprint = identity(&value)?;

        if let Some(handle) = self.slots.lookup(fingerprint) {
            trace!("acquire({:#x}): reusing {}", fingerprint, handle);
            // The cached instance is authoritative; `value` is dropped here.
            return Ok(handle);
        }

        let handle = self.slots.insert(fingerprint, value, self.default_ttl);
        trace!("acquire({:#x}): pinned as {}", fingerprint, handle);
        Ok(handle)
    }

    /// Deduplicate `value` against the cache and return a copy of the stored instance.
    pub fn acquire(&mut self, value: T) -> Result<T>
    where
        T: Clone,
    {
        let handle = self.acquire_ref(value)?;
        self.slots.get(handle).cloned()
    }
}

impl<T: Clone + Coerce> Cache<T> {
    /// Call `f(args)` through the cache.
    ///
    /// The callable is not executed when the call hits a live slot or, in
    /// predictive mode, when the predictor knows the answer. A predicted
    /// value that cannot be coerced into `T` is a
    /// [`TypeMismatch`][CacheError::TypeMismatch].
    pub fn invoke<F>(&mut self, callable: &Callable, args: &[Value], f: F) -> Result<T>
    where
        F: FnOnce(&[Value]) -> T,
    {
        let fingerprint = call_fingerprint(callable.name(), args);

        if callable.skips_cache() {
            trace!("invoke({}): caching disabled", callable);
            self.executions += 1;
            return Ok(f(args));
        }

        if let Some(handle) = self.slots.lookup(fingerprint) {
            debug!("invoke({}): slot hit at {}", callable, handle);
            return self.slots.get(handle).cloned();
        }

        if let Some(predicted) = self.predict(callable, args)? {
            return T::from_value(predicted);
        }

        debug!("invoke({}): executing", callable);
        let result = f(args);
        self.executions += 1;

        self.learn(callable, args, &result)?;
        self.slots.insert(fingerprint, result.clone(), self.default_ttl);

        Ok(result)
    }

    fn predict(&mut self, callable: &Callable, args: &[Value]) -> Result<Option<Value>> {
        let Some(predictor) = self.predictor.as_mut() else {
            return Ok(None);
        };
        if callable.skips_prediction() || !args.iter().all(Value::is_primitive) {
            return Ok(None);
        }

        let predicted = predictor.try_predict(callable.name(), args)?;
        if let Some(value) = &predicted {
            debug!("invoke({}): predicted {}", callable, value);
            self.predictions += 1;
        }
        Ok(predicted)
    }

    fn learn(&mut self, callable: &Callable, args: &[Value], result: &T) -> Result<()> {
        let Some(predictor) = self.predictor.as_mut() else {
            return Ok(());
        };
        if callable.skips_prediction() || !args.iter().all(Value::is_primitive) {
            return Ok(());
        }
        let Some(value) = result.to_value() else {
            trace!("invoke({}): result has no value form, not learned", callable);
            return Ok(());
        };

        predictor.learn(callable.name(), args, value)
    }
}

impl Cache<Boxed> {
    /// Call `f(args)` through a dynamically typed cache and coerce the result into `R`.
    ///
    /// Asking for [`Boxed`] itself is an
    /// [`InvalidCapabilityCombination`][CacheError::InvalidCapabilityCombination]:
    /// the cache already stores boxed values.
    pub fn invoke_as<R, V, F>(&mut self, callable: &Callable, args: &[Value], f: F) -> Result<R>
    where
        R: Coerce + 'static,
        V: Into<Value>,
        F: FnOnce(&[Value]) -> V,
    {
        if TypeId::of::<R>() == TypeId::of::<Boxed>() {
            return Err(CacheError::InvalidCapabilityCombination {
                type_name: type_name::<Boxed>(),
            });
        }

        let boxed = self.invoke(callable, args, |args| Boxed::new(f(args)))?;
        R::from_value(boxed.into_inner())
    }
}
