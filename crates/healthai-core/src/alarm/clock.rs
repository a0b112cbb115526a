use chrono::NaiveTime;
use std::sync::{Arc, Mutex};

/// Source of local wall-clock time for the scheduler.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveTime;
}

/// Local time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveTime {
        chrono::Local::now().time()
    }
}

/// Settable clock for driving the scheduler deterministically.
#[derive(Debug, Clone)]
pub struct ManualClock {
    time: Arc<Mutex<NaiveTime>>,
}

impl ManualClock {
    pub fn new(time: NaiveTime) -> Self {
        Self {
            time: Arc::new(Mutex::new(time)),
        }
    }

    pub fn set(&self, time: NaiveTime) {
        match self.time.lock() {
            Ok(mut guard) => *guard = time,
            Err(poisoned) => *poisoned.into_inner() = time,
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> NaiveTime {
        match self.time.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::new(NaiveTime::from_hms_opt(8, 0, 0).unwrap());
        let handle = clock.clone();
        handle.set(NaiveTime::from_hms_opt(9, 30, 0).unwrap());
        assert_eq!(clock.now(), NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    }
}
