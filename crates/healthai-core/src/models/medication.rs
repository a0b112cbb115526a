//! Medication and reminder models.

use serde::{Deserialize, Serialize};

use super::{new_id, Identified};

/// A scheduled time-of-day trigger owned by a medication.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Reminder {
    pub id: String,
    /// Zero-padded 24h "HH:MM"
    pub time: String,
    pub enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 0 = Sunday .. 6 = Saturday
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub days: Option<Vec<u8>>,
}

impl Reminder {
    /// Create an enabled reminder for every day.
    pub fn new(time: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            time: time.into(),
            enabled: true,
            message: None,
            days: None,
        }
    }

    /// Check that `time` is a zero-padded 24h "HH:MM".
    pub fn has_valid_time(&self) -> bool {
        is_minute_stamp(&self.time)
    }
}

/// A medication on the user's schedule.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    pub id: String,
    pub profile_id: String,
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub time_of_day: Vec<String>,
    pub remaining: u32,
    pub total: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

/// Medication fields supplied by the UI or a prescription scan, before an id
/// and profile are assigned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct NewMedication {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub time_of_day: Vec<String>,
    pub remaining: u32,
    pub total: u32,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub reminders: Vec<Reminder>,
}

impl Medication {
    /// Assign a fresh id and owning profile.
    pub fn new(fields: NewMedication, profile_id: String) -> Self {
        Self {
            id: new_id(),
            profile_id,
            name: fields.name,
            dosage: fields.dosage,
            frequency: fields.frequency,
            time_of_day: fields.time_of_day,
            remaining: fields.remaining,
            total: fields.total,
            instructions: fields.instructions,
            reminders: fields.reminders,
        }
    }

    /// Consume one dose. `remaining` floors at zero.
    pub fn record_dose(&mut self) {
        self.remaining = self.remaining.saturating_sub(1);
    }

    /// Reminders that are switched on.
    pub fn enabled_reminders(&self) -> impl Iterator<Item = &Reminder> {
        self.reminders.iter().filter(|r| r.enabled)
    }
}

impl Identified for Medication {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Check a zero-padded 24h "HH:MM" stamp.
pub fn is_minute_stamp(value: &str) -> bool {
    chrono::NaiveTime::parse_from_str(value, "%H:%M").is_ok() && value.len() == 5
}

/// Every reminder time is a stamp the scheduler can match.
pub fn reminders_valid(reminders: &[Reminder]) -> bool {
    reminders.iter().all(Reminder::has_valid_time)
}
