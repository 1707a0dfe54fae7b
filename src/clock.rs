use chrono::{Local, NaiveDateTime};

/// Source of the "current time" used when a transaction date cannot be parsed.
pub trait Clock {
    fn now(&self) -> NaiveDateTime;
}

/// Local wall clock. Matches the legacy fallback of stamping unparseable
/// dates with the moment of analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A frozen instant, for reproducible runs and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}
