//! Operation outcome envelopes.
//!
//! # Responsibility
//! - Report success/failure of repository and unit-of-work operations
//!   without returning `Err` across the public surface.
//! - Carry the payload of a data-returning operation next to its status.
//!
//! # Invariants
//! - `is_success == false` whenever `errors` is non-empty.
//! - A failed `DataResult` holds `T::default()`, never a partial value.
//! - A "not found" lookup is a success with default data.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// Success flag plus ordered error messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    is_success: bool,
    errors: Vec<String>,
}

impl StatusResult {
    /// Successful outcome with no errors.
    pub fn success() -> Self {
        Self {
            is_success: true,
            errors: Vec::new(),
        }
    }

    /// Failed outcome carrying one message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            errors: vec![message.into()],
        }
    }

    /// Builds a status from collected errors; success iff `errors` is empty.
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            is_success: errors.is_empty(),
            errors,
        }
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Converts into `Result` so callers can use `?`.
    pub fn into_result(self) -> Result<(), StatusResult> {
        if self.is_success {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Default for StatusResult {
    fn default() -> Self {
        Self::success()
    }
}

impl Display for StatusResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_success {
            return write!(f, "ok");
        }
        write!(f, "failed: {}", self.errors.join("; "))
    }
}

impl std::error::Error for StatusResult {}

/// Payload of an operation paired with its [`StatusResult`].
///
/// `data` is only meaningful when `status().is_success()`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResult<T> {
    data: T,
    status: StatusResult,
}

impl<T> DataResult<T> {
    /// Successful outcome with `data`.
    pub fn success(data: T) -> Self {
        Self {
            data,
            status: StatusResult::success(),
        }
    }

    pub fn data(&self) -> &T {
        &self.data
    }

    pub fn status(&self) -> &StatusResult {
        &self.status
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn into_data(self) -> T {
        self.data
    }

    pub fn into_parts(self) -> (T, StatusResult) {
        (self.data, self.status)
    }

    /// Converts into `Result`, dropping the defaulted payload on failure.
    pub fn into_result(self) -> Result<T, StatusResult> {
        if self.status.is_success() {
            Ok(self.data)
        } else {
            Err(self.status)
        }
    }
}

impl<T: Default> DataResult<T> {
    /// Failed outcome; the payload is `T::default()`.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            data: T::default(),
            status: StatusResult::failure(message),
        }
    }

    /// Wraps a fallible computation, using the error text as the message.
    pub fn from_result<E: Display>(result: Result<T, E>) -> Self {
        match result {
            Ok(data) => Self::success(data),
            Err(err) => Self::failure(err.to_string()),
        }
    }
}
