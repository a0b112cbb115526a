//! Vitals log entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::{new_id, Identified};

/// Kind of vital being logged.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum HealthLogType {
    BloodPressure,
    Glucose,
    Weight,
    Mood,
}

impl HealthLogType {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthLogType::BloodPressure => "blood_pressure",
            HealthLogType::Glucose => "glucose",
            HealthLogType::Weight => "weight",
            HealthLogType::Mood => "mood",
        }
    }
}

impl fmt::Display for HealthLogType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HealthLogType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "blood_pressure" => Ok(HealthLogType::BloodPressure),
            "glucose" => Ok(HealthLogType::Glucose),
            "weight" => Ok(HealthLogType::Weight),
            "mood" => Ok(HealthLogType::Mood),
            other => Err(format!("unknown health log type: {}", other)),
        }
    }
}

/// An immutable vitals entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct HealthLog {
    pub id: String,
    #[serde(default)]
    pub profile_id: String,
    pub date: String,
    #[serde(rename = "type")]
    pub log_type: HealthLogType,
    pub value: String,
    pub unit: String,
}

/// Vitals entry fields before an id and profile are assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHealthLog {
    pub date: String,
    pub log_type: HealthLogType,
    pub value: String,
    pub unit: String,
}

impl HealthLog {
    pub fn new(fields: NewHealthLog, profile_id: String) -> Self {
        Self {
            id: new_id(),
            profile_id,
            date: fields.date,
            log_type: fields.log_type,
            value: fields.value,
            unit: fields.unit,
        }
    }
}

impl Identified for HealthLog {
    fn id(&self) -> &str {
        &self.id
    }
}
