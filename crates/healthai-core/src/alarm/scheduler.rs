//! Reminder scanning with per-minute deduplication.
//!
//! The scheduler keeps a single piece of state: the last `HH:MM` stamp it
//! scanned. A minute is scanned at most once, whether or not anything was
//! due, so ticking several times per minute never duplicates an alarm. A
//! minute the scheduler did not observe (process suspended) is missed.
//!
//! Known edge case: a reminder toggled off and on again, or a medication
//! recreated with the same reminder time, within an already-scanned minute
//! does not fire until the next day.

use chrono::NaiveTime;
use log::{debug, info};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::Clock;
use crate::models::{Medication, Reminder};

pub const DEFAULT_ALARM_MESSAGE: &str = "Time to take your scheduled dose.";

/// A reminder whose minute has arrived.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmEvent {
    pub medication: Medication,
    pub reminder: Reminder,
    /// "HH:MM" the event was raised for
    pub minute: String,
}

impl AlarmEvent {
    pub fn message(&self) -> &str {
        self.reminder
            .message
            .as_deref()
            .filter(|m| !m.trim().is_empty())
            .unwrap_or(DEFAULT_ALARM_MESSAGE)
    }
}

/// Format `time` as the zero-padded 24h minute stamp reminders use.
pub fn minute_stamp(time: NaiveTime) -> String {
    time.format("%H:%M").to_string()
}

#[derive(Debug, Default)]
pub struct AlarmScheduler {
    last_handled_minute: Option<String>,
}

impl AlarmScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_handled_minute(&self) -> Option<&str> {
        self.last_handled_minute.as_deref()
    }

    /// Evaluate one tick against the current medication snapshot.
    ///
    /// Every enabled reminder whose time equals the current minute yields one
    /// event; reminders on different medications at the same minute each fire.
    pub fn tick(&mut self, now: NaiveTime, medications: &[Medication]) -> Vec<AlarmEvent> {
        let minute = minute_stamp(now);
        if self.last_handled_minute.as_deref() == Some(minute.as_str()) {
            return Vec::new();
        }

        let events: Vec<AlarmEvent> = medications
            .iter()
            .flat_map(|medication| {
                medication
                    .enabled_reminders()
                    .filter(|reminder| reminder.time == minute)
                    .map(|reminder| AlarmEvent {
                        medication: medication.clone(),
                        reminder: reminder.clone(),
                        minute: minute.clone(),
                    })
            })
            .collect();

        if !events.is_empty() {
            info!("{} reminder(s) due at {}", events.len(), minute);
        }
        self.last_handled_minute = Some(minute);
        events
    }

    /// Tick on a fixed interval until the event receiver or the snapshot
    /// sender goes away.
    ///
    /// `period` must be shorter than a minute or minutes can be skipped.
    pub async fn run<C: Clock>(
        mut self,
        clock: C,
        period: Duration,
        snapshot: watch::Receiver<Vec<Medication>>,
        events: mpsc::Sender<AlarmEvent>,
    ) {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!("Alarm scheduler started with {:?} period", period);

        loop {
            interval.tick().await;
            if events.is_closed() || snapshot.has_changed().is_err() {
                break;
            }

            let due = {
                let medications = snapshot.borrow();
                self.tick(clock.now(), &medications)
            };
            for event in due {
                if events.send(event).await.is_err() {
                    debug!("Alarm receiver dropped");
                    return;
                }
            }
        }
        debug!("Alarm scheduler stopped");
    }
}
