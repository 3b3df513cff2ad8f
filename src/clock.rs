//! Injectable clock
//!
//! Validation compares incoming timestamps against "now". Aware timestamps
//! compare against UTC now, naive ones against local naive now, so the clock
//! exposes both. Swappable for fixed clocks in tests.

use chrono::{DateTime, Local, NaiveDateTime, Utc};

/// Source of the current time
pub trait Clock: Send + Sync {
    /// Current instant in UTC
    fn now_utc(&self) -> DateTime<Utc>;

    /// Current wall-clock time without timezone, in the local zone
    fn now_naive(&self) -> NaiveDateTime;
}

/// System clock used in production
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn now_naive(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
