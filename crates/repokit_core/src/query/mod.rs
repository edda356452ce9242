//! Query composition: filter, then order, then window.
//!
//! # Responsibility
//! - Combine optional predicate, ordering and paging window into one
//!   evaluation pipeline over entities read from the store.
//!
//! # Invariants
//! - Stages always apply in the order filter -> order -> window.
//! - A query without filter and ordering preserves natural store order and
//!   may push its window down to SQL.

pub mod order;
pub mod predicate;

pub use order::OrderBy;
pub use predicate::Predicate;

/// Skip/take window derived from a 1-based page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub skip: u64,
    pub take: u64,
}

impl Window {
    /// Window for page `index` (1-based) of `size` items.
    ///
    /// Returns a human-readable message when either argument is zero.
    pub fn page(index: u32, size: u32) -> Result<Self, String> {
        if index == 0 {
            return Err(format!("page index must be 1 or greater, got {index}"));
        }
        if size == 0 {
            return Err(format!("page size must be 1 or greater, got {size}"));
        }
        Ok(Self {
            skip: u64::from(index - 1) * u64::from(size),
            take: u64::from(size),
        })
    }
}

/// Composed read pipeline.
#[derive(Debug, Clone)]
pub struct Query<T> {
    pub filter: Option<Predicate<T>>,
    pub order: Option<OrderBy<T>>,
    pub window: Option<Window>,
}

impl<T: 'static> Query<T> {
    pub fn new(filter: Option<Predicate<T>>, order: Option<OrderBy<T>>) -> Self {
        Self {
            filter,
            order,
            window: None,
        }
    }

    #[must_use]
    pub fn with_window(mut self, window: Window) -> Self {
        self.window = Some(window);
        self
    }

    /// True when evaluation keeps natural store order and drops nothing.
    pub fn is_unrestricted(&self) -> bool {
        self.filter.is_none() && self.order.is_none()
    }

    pub fn evaluate(&self, items: Vec<T>) -> Vec<T> {
        let mut selected: Vec<T> = match &self.filter {
            Some(filter) => items.into_iter().filter(|item| filter.matches(item)).collect(),
            None => items,
        };
        if let Some(order) = &self.order {
            order.sort(&mut selected);
        }
        match self.window {
            Some(window) => selected
                .into_iter()
                .skip(usize::try_from(window.skip).unwrap_or(usize::MAX))
                .take(usize::try_from(window.take).unwrap_or(usize::MAX))
                .collect(),
            None => selected,
        }
    }
}
