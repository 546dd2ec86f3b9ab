//! Time source abstraction.

use chrono::{DateTime, Utc};

/// Source of "now" for template helpers.
///
/// Implemented by `strata_adapters::SystemClock` in production; tests supply
/// their own to make time-based templates deterministic.
#[cfg_attr(test, mockall::automock)]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}
