//! Test clock: deterministic `Clock` implementation for tests.

use chrono::{DateTime, Duration, TimeZone, Utc};
use invigil_core::clock::Clock;

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl FixedClock {
    /// A clock pinned to the given UTC wall time.
    ///
    /// # Panics
    ///
    /// Panics if the components do not form a valid timestamp.
    #[must_use]
    pub fn at(year: i32, month: u32, day: u32, hour: u32, minute: u32) -> Self {
        Self(
            Utc.with_ymd_and_hms(year, month, day, hour, minute, 0)
                .single()
                .expect("valid fixed clock timestamp"),
        )
    }

    /// The same clock moved forward by `delta`.
    #[must_use]
    pub fn advanced_by(self, delta: Duration) -> Self {
        Self(self.0 + delta)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
