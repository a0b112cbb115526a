//! Structured records returned by the image classifier.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Extraction errors.
#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid response format: {0}")]
    InvalidFormat(String),

    #[error("Classifier error: {0}")]
    Inference(String),
}

pub type ExtractionResult<T> = Result<T, ExtractionError>;

/// What an image is expected to show.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScanMode {
    Medication,
    Symptom,
}

/// A pill or package identified from a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedicationScan {
    pub name: String,
    pub dosage: String,
    pub usage: String,
    #[serde(default)]
    pub instructions: Option<String>,
}

/// A visible symptom assessed from a photo.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymptomScan {
    pub condition: String,
    /// Low / Medium / High
    pub severity: String,
    pub description: String,
    pub next_steps: String,
}

/// One line of a photographed prescription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionItem {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    #[serde(default)]
    pub instructions: Option<String>,
    /// "HH:MM" times derived from the frequency
    #[serde(default)]
    pub suggested_times: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanResult {
    Medication(MedicationScan),
    Symptom(SymptomScan),
}

impl ScanResult {
    pub fn mode(&self) -> ScanMode {
        match self {
            ScanResult::Medication(_) => ScanMode::Medication,
            ScanResult::Symptom(_) => ScanMode::Symptom,
        }
    }
}

/// Slice `text` from the first `open` to the last `close`, inclusive.
fn enclosed(text: &str, open: char, close: char) -> ExtractionResult<&str> {
    let start = text.find(open).ok_or_else(|| {
        ExtractionError::InvalidFormat(format!("No '{}' found in response", open))
    })?;
    let end = text.rfind(close).ok_or_else(|| {
        ExtractionError::InvalidFormat(format!("No '{}' found in response", close))
    })?;
    if end < start {
        return Err(ExtractionError::InvalidFormat(
            "Closing delimiter precedes opening delimiter".into(),
        ));
    }
    Ok(&text[start..=end])
}

/// Parse classifier output for `mode`, tolerating prose around the JSON object.
pub fn parse_scan_output(text: &str, mode: ScanMode) -> ExtractionResult<ScanResult> {
    let json = enclosed(text, '{', '}')?;
    let result = match mode {
        ScanMode::Medication => ScanResult::Medication(serde_json::from_str(json)?),
        ScanMode::Symptom => ScanResult::Symptom(serde_json::from_str(json)?),
    };
    Ok(result)
}

/// Parse a prescription listing, tolerating prose around the JSON array.
pub fn parse_prescription_output(text: &str) -> ExtractionResult<Vec<PrescriptionItem>> {
    let json = enclosed(text, '[', ']')?;
    Ok(serde_json::from_str(json)?)
}
