//! Injectable wall-clock time.
//!
//! Sleep windows and playlist windows are evaluated against local wall-clock
//! time, so the clock hands out [`NaiveDateTime`] already shifted into the
//! configured timezone.

use chrono::{NaiveDateTime, Utc};
use chrono_tz::Tz;

/// Source of the current local time.
pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// Clock backed by the system time, interpreted in a timezone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    tz: Tz,
}

impl SystemClock {
    /// Create a system clock for the given timezone.
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// The timezone this clock reports in.
    pub fn timezone(&self) -> Tz {
        self.tz
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new(chrono_tz::UTC)
    }
}

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Utc::now().with_timezone(&self.tz).naive_local()
    }
}

/// Clock frozen at a fixed instant. Useful for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
