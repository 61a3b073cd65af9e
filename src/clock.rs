use chrono::{DateTime, Duration, Utc};
use std::sync::RwLock;

/// Source of "now" for month windows and cache ages.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    fn now_millis(&self) -> i64 {
        self.now().timestamp_millis()
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    current: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        ManualClock {
            current: RwLock::new(start),
        }
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = to;
    }

    pub fn advance_secs(&self, secs: i64) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = *current + Duration::seconds(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.read().unwrap_or_else(|e| e.into_inner())
    }
}
