use crate::domain::ports::Clock;
use chrono::{Datelike, Local, Utc};
use std::sync::Arc;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

/// Wall-clock time source used outside tests.
#[derive(Debug, Default, Clone)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }

    fn current_month(&self) -> u32 {
        Local::now().month()
    }
}

/// Manually driven clock so tests control session expiry and the calendar
/// month without real delays.
#[derive(Debug, Clone)]
pub struct MockClock {
    millis: Arc<AtomicI64>,
    month: Arc<AtomicU32>,
}

impl MockClock {
    pub fn new(month: u32) -> Self {
        Self {
            millis: Arc::new(AtomicI64::new(0)),
            month: Arc::new(AtomicU32::new(month)),
        }
    }

    pub fn advance(&self, ms: i64) {
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }

    pub fn set_month(&self, month: u32) {
        self.month.store(month, Ordering::SeqCst);
    }
}

impl Clock for MockClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }

    fn current_month(&self) -> u32 {
        self.month.load(Ordering::SeqCst)
    }
}
