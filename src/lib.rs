//! # memo-rs: a memoizing slot cache with result prediction
//!
//! **`memo-rs`** wraps value construction and function calls so that a
//! structurally equivalent request returns a previously computed result
//! instead of recomputing it. In predictive mode it also learns simple
//! numeric relationships between arguments and results, and answers novel
//! calls without running the function once it is confident enough.
//!
//! ## Key Features
//!
//! - **Fixed capacity**: A [`Cache`][crate::cache::Cache] owns a fixed array of slots. Every slot carries a countdown of remaining hits, and insertion evicts the slot closest to expiry.
//! - **Structural identity**: Types describe which fields make up their identity through [`Cacheable`][crate::fingerprint::Cacheable]. No reflection, no addresses.
//! - **Checked handles**: [`acquire_ref`][crate::cache::Cache::acquire_ref] returns a generation-stamped [`Handle`][crate::slot::Handle] that refuses to dereference once its slot was reused.
//! - **Prediction**: A [`Predictor`][crate::predictor::Predictor] remembers per-method results and runs pluggable [`PatternRule`][crate::predictor::PatternRule]s over the raw argument bytes.
//!
//! ## Basic Usage
//!
//! ```rust
//! use memo_rs::cache::Cache;
//! use memo_rs::callable::Callable;
//! use memo_rs::value::Value;
//!
//! // 1. Create a cache: 32 slots, 10 hits per slot, predictive mode on
//! let mut cache = Cache::<i32>::new(32, 10, true);
//!
//! // 2. Describe the function being memoized
//! let add = Callable::new("add");
//!
//! // 3. Teach it a few sums
//! for (a, b) in [(2, 3), (4, 5), (1, 1), (6, 7), (8, 9)] {
//!     let sum = cache.invoke(&add, &[Value::Int(a), Value::Int(b)], |_| a + b).unwrap();
//!     assert_eq!(sum, a + b);
//! }
//!
//! // 4. Novel arguments are now answered without running the closure
//! let sum = cache
//!     .invoke(&add, &[Value::Int(10), Value::Int(20)], |_| unreachable!())
//!     .unwrap();
//! assert_eq!(sum, 30);
//! ```
//!
//! ## Core Components
//!
//! - **[`cache`]**: The engine: identity dedup and call memoization.
//! - **[`slot`]**: The slot table, its eviction policy and handles.
//! - **[`predictor`]**: The result cache and pattern rules.

pub mod cache;
pub mod callable;
pub mod error;
pub mod fingerprint;
pub mod predictor;
pub mod slot;
pub mod utils;
pub mod value;
