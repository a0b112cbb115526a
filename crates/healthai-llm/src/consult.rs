//! Consultant chat types and the classifier seam.
//!
//! The generative model is opaque: callers hand it an image or a question
//! and get back structured records or text. [`MockClassifier`] answers
//! deterministically for tests and offline demos.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use crate::scan::{
    parse_prescription_output, parse_scan_output, ExtractionError, ExtractionResult,
    PrescriptionItem, ScanMode, ScanResult,
};

pub const DEFAULT_HISTORY_LIMIT: usize = 20;

pub const AI_DISCLAIMER: &str =
    "I am an AI assistant, not a doctor. Seek professional medical help in an emergency.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

/// Conversation context sent with each query. Oldest turns drop first.
#[derive(Debug, Clone)]
pub struct ChatHistory {
    messages: VecDeque<ChatMessage>,
    limit: usize,
}

impl Default for ChatHistory {
    fn default() -> Self {
        Self::with_limit(DEFAULT_HISTORY_LIMIT)
    }
}

impl ChatHistory {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            messages: VecDeque::new(),
            limit: limit.max(1),
        }
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(ChatRole::User, text.into());
    }

    pub fn push_model(&mut self, text: impl Into<String>) {
        self.push(ChatRole::Model, text.into());
    }

    fn push(&mut self, role: ChatRole, content: String) {
        self.messages.push_back(ChatMessage { role, content });
        while self.messages.len() > self.limit {
            self.messages.pop_front();
        }
    }

    pub fn messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages.iter()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }
}

/// Image and text classification backed by a generative model.
#[async_trait]
pub trait Classifier: Send + Sync {
    /// Identify a medication or assess a symptom from a JPEG image.
    async fn classify_image(&self, image: &[u8], mode: ScanMode) -> ExtractionResult<ScanResult>;

    /// List every medication on a photographed prescription.
    async fn extract_prescription(&self, image: &[u8]) -> ExtractionResult<Vec<PrescriptionItem>>;

    /// Answer a health question in the context of `history`.
    async fn chat(
        &self,
        query: &str,
        history: &ChatHistory,
        image: Option<&[u8]>,
    ) -> ExtractionResult<String>;
}

/// Canned classifier for testing without a model.
#[derive(Debug, Default, Clone)]
pub struct MockClassifier;

const MOCK_MEDICATION: &str =
    r#"{"name":"Ibuprofen","dosage":"200mg","usage":"Pain and fever relief","instructions":"Take with food"}"#;

const MOCK_SYMPTOM: &str = r#"{"condition":"Mild skin irritation","severity":"Low","description":"Localized redness without swelling","nextSteps":"Keep the area clean and monitor for 48 hours"}"#;

const MOCK_PRESCRIPTION: &str = r#"[{"name":"Amoxicillin","dosage":"500mg","frequency":"Three times daily","instructions":"Finish the full course","suggestedTimes":["08:00","14:00","20:00"]}]"#;

#[async_trait]
impl Classifier for MockClassifier {
    async fn classify_image(&self, image: &[u8], mode: ScanMode) -> ExtractionResult<ScanResult> {
        if image.is_empty() {
            return Err(ExtractionError::Inference("empty image".into()));
        }
        let canned = match mode {
            ScanMode::Medication => MOCK_MEDICATION,
            ScanMode::Symptom => MOCK_SYMPTOM,
        };
        parse_scan_output(canned, mode)
    }

    async fn extract_prescription(&self, image: &[u8]) -> ExtractionResult<Vec<PrescriptionItem>> {
        if image.is_empty() {
            return Err(ExtractionError::Inference("empty image".into()));
        }
        parse_prescription_output(MOCK_PRESCRIPTION)
    }

    async fn chat(
        &self,
        query: &str,
        history: &ChatHistory,
        image: Option<&[u8]>,
    ) -> ExtractionResult<String> {
        let subject = if image.is_some() {
            "the attached image"
        } else {
            "your question"
        };
        Ok(format!(
            "Regarding {} ({} earlier messages): \"{}\".\n\n_{}_",
            subject,
            history.len(),
            query.trim(),
            AI_DISCLAIMER
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_bounded() {
        let mut history = ChatHistory::with_limit(3);
        history.push_user("a");
        history.push_model("b");
        history.push_user("c");
        history.push_model("d");

        let texts: Vec<&str> = history.messages().map(|m| m.content.as_str()).collect();
        assert_eq!(texts, vec!["b", "c", "d"]);
        assert_eq!(history.messages().next().map(|m| m.role), Some(ChatRole::Model));
    }

    #[test]
    fn test_chat_role_serialization() {
        let msg = ChatMessage {
            role: ChatRole::Model,
            content: "hi".into(),
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"role":"model","content":"hi"}"#
        );
    }

    #[tokio::test]
    async fn test_mock_classifier_modes() {
        let classifier = MockClassifier;

        let med = classifier
            .classify_image(b"jpeg", ScanMode::Medication)
            .await
            .unwrap();
        assert_eq!(med.mode(), ScanMode::Medication);

        let symptom = classifier
            .classify_image(b"jpeg", ScanMode::Symptom)
            .await
            .unwrap();
        assert_eq!(symptom.mode(), ScanMode::Symptom);

        assert!(matches!(
            classifier.classify_image(b"", ScanMode::Symptom).await,
            Err(ExtractionError::Inference(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_prescription() {
        let items = MockClassifier.extract_prescription(b"jpeg").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].suggested_times, vec!["08:00", "14:00", "20:00"]);
    }

    #[tokio::test]
    async fn test_mock_chat_includes_disclaimer() {
        let mut history = ChatHistory::default();
        history.push_user("What is ibuprofen?");
        history.push_model("A painkiller.");

        let reply = MockClassifier
            .chat("Can I take it with food?", &history, None)
            .await
            .unwrap();
        assert!(reply.contains("2 earlier messages"));
        assert!(reply.contains(AI_DISCLAIMER));
    }
}
