//! Adherence (dose taken) records.

use serde::{Deserialize, Serialize};

/// One day's dose record for one medication.
///
/// There is no id; `(date, medication_id)` is the natural key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AdherenceRecord {
    /// "YYYY-MM-DD"
    pub date: String,
    #[serde(default)]
    pub profile_id: String,
    pub medication_id: String,
    pub taken: bool,
    /// "HH:MM"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<String>,
}

impl AdherenceRecord {
    /// Record a dose taken at `time` on `date`.
    pub fn taken(
        date: impl Into<String>,
        profile_id: impl Into<String>,
        medication_id: impl Into<String>,
        time: impl Into<String>,
    ) -> Self {
        Self {
            date: date.into(),
            profile_id: profile_id.into(),
            medication_id: medication_id.into(),
            taken: true,
            time_taken: Some(time.into()),
        }
    }

    /// Natural key used for merge and dedup.
    pub fn natural_key(&self) -> (&str, &str) {
        (&self.date, &self.medication_id)
    }
}
