//! Ordering functions applied after filtering and before paging.

use std::cmp::Ordering;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

/// Stable comparator chain over `T`.
///
/// Items that compare equal keep the order the store returned them in.
pub struct OrderBy<T> {
    compare: Comparator<T>,
}

impl<T: 'static> OrderBy<T> {
    /// Orders with an arbitrary comparator.
    pub fn by<F>(compare: F) -> Self
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        Self {
            compare: Arc::new(compare),
        }
    }

    pub fn asc<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::by(move |left, right| key(left).cmp(&key(right)))
    }

    pub fn desc<K, F>(key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        Self::by(move |left, right| key(right).cmp(&key(left)))
    }

    /// Breaks ties of the current ordering with `next`.
    #[must_use]
    pub fn then(self, next: OrderBy<T>) -> Self {
        let (first, second) = (self.compare, next.compare);
        Self::by(move |left, right| first(left, right).then_with(|| second(left, right)))
    }

    #[must_use]
    pub fn then_asc<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.then(Self::asc(key))
    }

    #[must_use]
    pub fn then_desc<K, F>(self, key: F) -> Self
    where
        K: Ord,
        F: Fn(&T) -> K + Send + Sync + 'static,
    {
        self.then(Self::desc(key))
    }

    pub fn compare(&self, left: &T, right: &T) -> Ordering {
        (self.compare)(left, right)
    }

    pub fn sort(&self, items: &mut [T]) {
        items.sort_by(|left, right| self.compare(left, right));
    }
}

impl<T> Clone for OrderBy<T> {
    fn clone(&self) -> Self {
        Self {
            compare: Arc::clone(&self.compare),
        }
    }
}

impl<T> Debug for OrderBy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("OrderBy(..)")
    }
}
