//! Composable filter predicates.
//!
//! # Invariants
//! - `Predicate::always()` is the identity for `and`.
//! - `Predicate::never()` is the identity for `or`.
//! - Chains evaluate left to right: `p.and(a).or(b)` is `(p && a) || b`.

use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Boolean filter over `T`, cheap to clone and safe to send across threads.
pub struct Predicate<T> {
    test: Arc<dyn Fn(&T) -> bool + Send + Sync>,
}

impl<T: 'static> Predicate<T> {
    pub fn new<F>(test: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        Self {
            test: Arc::new(test),
        }
    }

    /// Seed that accepts everything.
    pub fn always() -> Self {
        Self::new(|_| true)
    }

    /// Seed that accepts nothing.
    pub fn never() -> Self {
        Self::new(|_| false)
    }

    pub fn matches(&self, item: &T) -> bool {
        (self.test)(item)
    }

    #[must_use]
    pub fn and<F>(self, next: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.and_with(Self::new(next))
    }

    #[must_use]
    pub fn or<F>(self, next: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.or_with(Self::new(next))
    }

    #[must_use]
    pub fn and_with(self, other: Predicate<T>) -> Self {
        let (left, right) = (self.test, other.test);
        Self::new(move |item| left(item) && right(item))
    }

    #[must_use]
    pub fn or_with(self, other: Predicate<T>) -> Self {
        let (left, right) = (self.test, other.test);
        Self::new(move |item| left(item) || right(item))
    }

    #[must_use]
    pub fn not(self) -> Self {
        let inner = self.test;
        Self::new(move |item| !inner(item))
    }
}

impl<T> Clone for Predicate<T> {
    fn clone(&self) -> Self {
        Self {
            test: Arc::clone(&self.test),
        }
    }
}

impl<T> Debug for Predicate<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("Predicate(..)")
    }
}
