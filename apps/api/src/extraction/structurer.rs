//! The pluggable structuring capability.
//!
//! Anything that can turn normalized text plus a target field schema into a
//! profile with a self-reported confidence can sit behind [`Structurer`].
//! The production adapter goes through the LLM client; tests use a scripted
//! double with canned responses.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use crate::extraction::normalize::NormalizedText;
use crate::fusion::profile::{
    estimate_years_experience, normalize_string_set, CandidateProfile, EducationEntry, FieldValue,
    ProjectEntry, WorkEntry,
};
use crate::llm_client::{LlmClient, LlmError};
use crate::llm_client::prompts::{STRUCTURE_PROMPT_TEMPLATE, STRUCTURE_SYSTEM};

/// Failure modes of a structuring attempt.
#[derive(Debug, Error)]
pub enum StructuringError {
    #[error("structuring timed out after {0:?}")]
    Timeout(Duration),

    #[error("structuring capability unavailable")]
    Unavailable,

    #[error("structuring returned an invalid response: {0}")]
    InvalidResponse(String),

    #[error("transient structuring failure: {0}")]
    Transient(String),
}

impl StructuringError {
    /// Whether a retry has any chance of helping.
    pub fn is_transient(&self) -> bool {
        !matches!(self, StructuringError::Unavailable)
    }
}

/// Names and types of the fields the structurer is asked to fill. Rendered
/// into the prompt so the backend knows the exact target shape.
#[derive(Debug, Clone)]
pub struct FieldSchema {
    pub fields: Vec<(&'static str, &'static str)>,
}

impl FieldSchema {
    /// The candidate-profile schema used for resume structuring.
    pub fn candidate_profile() -> Self {
        Self {
            fields: vec![
                ("personal_info", "object {name, email, phone, location}"),
                ("current_role", "string"),
                ("company", "string"),
                ("years_experience", "number or null"),
                ("highest_degree", "string"),
                ("skills", "array of strings"),
                ("certifications", "array of strings"),
                ("languages", "array of strings"),
                (
                    "experience",
                    "array of {title, company, location, start_date, end_date, description, technologies}",
                ),
                (
                    "education",
                    "array of {degree, field, institution, graduation_date, location}",
                ),
                ("projects", "array of {name, description, technologies, url}"),
            ],
        }
    }

    pub fn render(&self) -> String {
        self.fields
            .iter()
            .map(|(name, kind)| format!("  \"{name}\": {kind}"))
            .collect::<Vec<_>>()
            .join(",\n")
    }
}

/// A structured profile plus the backend's self-reported confidence.
#[derive(Debug)]
pub struct StructuredExtraction {
    pub profile: CandidateProfile,
    pub confidence: f64,
}

#[async_trait]
pub trait Structurer: Send + Sync {
    async fn structure(
        &self,
        text: &NormalizedText,
        schema: &FieldSchema,
    ) -> Result<StructuredExtraction, StructuringError>;
}

// ── Wire shape returned by the LLM ──────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
struct StructuredResponse {
    #[serde(default)]
    confidence: f64,
    #[serde(default)]
    profile: StructuredResume,
}

#[derive(Debug, Default, Deserialize)]
pub struct StructuredResume {
    #[serde(default)]
    personal_info: PersonalInfo,
    #[serde(default)]
    current_role: String,
    #[serde(default)]
    company: String,
    #[serde(default)]
    years_experience: Option<f64>,
    #[serde(default)]
    highest_degree: String,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    certifications: Vec<String>,
    #[serde(default)]
    languages: Vec<String>,
    #[serde(default)]
    experience: Vec<WorkEntry>,
    #[serde(default)]
    education: Vec<EducationEntry>,
    #[serde(default)]
    projects: Vec<ProjectEntry>,
}

#[derive(Debug, Default, Deserialize)]
struct PersonalInfo {
    #[serde(default)]
    name: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    phone: String,
    #[serde(default)]
    location: String,
}

impl StructuredResume {
    /// Converts the wire shape into a provenance-tagged profile, applying the
    /// adapter confidence to every field.
    fn into_profile(self, confidence: f64) -> CandidateProfile {
        let mut profile = CandidateProfile {
            name: extracted_string(self.personal_info.name, confidence),
            email: extracted_string(self.personal_info.email, confidence),
            phone: extracted_string(self.personal_info.phone, confidence),
            location: extracted_string(self.personal_info.location, confidence),
            current_role: extracted_string(self.current_role, confidence),
            company: extracted_string(self.company, confidence),
            years_experience: self
                .years_experience
                .map(|y| FieldValue::extracted(y, confidence)),
            highest_degree: extracted_string(self.highest_degree, confidence),
            ..Default::default()
        };

        let skills = normalize_string_set(&self.skills);
        if !skills.is_empty() {
            profile.skills = Some(FieldValue::extracted(skills, confidence));
        }
        let certifications = normalize_string_set(&self.certifications);
        if !certifications.is_empty() {
            profile.certifications = Some(FieldValue::extracted(certifications, confidence));
        }
        let languages = normalize_string_set(&self.languages);
        if !languages.is_empty() {
            profile.languages = Some(FieldValue::extracted(languages, confidence));
        }

        if profile.current_role.is_none() {
            if let Some(first) = self.experience.first() {
                if !first.title.trim().is_empty() {
                    profile.current_role =
                        Some(FieldValue::extracted(first.title.trim().to_string(), confidence));
                }
            }
        }
        if profile.years_experience.is_none() {
            if let Some(years) = estimate_years_experience(&self.experience) {
                profile.years_experience = Some(FieldValue::extracted(years, confidence));
            }
        }
        if profile.highest_degree.is_none() {
            if let Some(first) = self.education.first() {
                if !first.degree.trim().is_empty() {
                    profile.highest_degree =
                        Some(FieldValue::extracted(first.degree.trim().to_string(), confidence));
                }
            }
        }

        if !self.experience.is_empty() {
            profile.work_history = Some(FieldValue::extracted(self.experience, confidence));
        }
        if !self.education.is_empty() {
            profile.education = Some(FieldValue::extracted(self.education, confidence));
        }
        if !self.projects.is_empty() {
            profile.projects = Some(FieldValue::extracted(self.projects, confidence));
        }

        profile
    }
}

fn extracted_string(value: String, confidence: f64) -> Option<FieldValue<String>> {
    let value = value.trim().to_string();
    if value.is_empty() {
        None
    } else {
        Some(FieldValue::extracted(value, confidence))
    }
}

// ── Production adapter ──────────────────────────────────────────────────────

/// Structures resumes through the LLM client. One attempt per call; the
/// extraction state machine owns retries and backoff.
pub struct LlmStructurer {
    llm: LlmClient,
}

impl LlmStructurer {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl Structurer for LlmStructurer {
    async fn structure(
        &self,
        text: &NormalizedText,
        schema: &FieldSchema,
    ) -> Result<StructuredExtraction, StructuringError> {
        let prompt = STRUCTURE_PROMPT_TEMPLATE
            .replace("{schema}", &schema.render())
            .replace("{resume_text}", text.as_str());

        let response: StructuredResponse = self
            .llm
            .call_json(&prompt, STRUCTURE_SYSTEM)
            .await
            .map_err(map_llm_error)?;

        let confidence = response.confidence.clamp(0.0, 1.0);
        Ok(StructuredExtraction {
            profile: response.profile.into_profile(confidence),
            confidence,
        })
    }
}

fn map_llm_error(err: LlmError) -> StructuringError {
    match err {
        LlmError::Http(e) => StructuringError::Transient(e.to_string()),
        LlmError::Api { status: 401 | 403, message } => {
            tracing::warn!("structuring backend rejected credentials: {message}");
            StructuringError::Unavailable
        }
        LlmError::Api { status, message } if status == 429 || status >= 500 => {
            StructuringError::Transient(format!("status {status}: {message}"))
        }
        LlmError::Api { status, message } => {
            StructuringError::InvalidResponse(format!("status {status}: {message}"))
        }
        LlmError::Parse(e) => StructuringError::InvalidResponse(e.to_string()),
        LlmError::EmptyContent => {
            StructuringError::InvalidResponse("empty response".to_string())
        }
    }
}

// ── Deterministic double for tests ──────────────────────────────────────────

#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;

    use super::*;

    /// Returns scripted responses in order and counts calls. Once the script
    /// is exhausted it reports the backend unavailable.
    pub struct ScriptedStructurer {
        script: Mutex<VecDeque<Result<StructuredExtraction, StructuringError>>>,
        pub calls: AtomicU32,
    }

    impl ScriptedStructurer {
        pub fn new(
            script: impl IntoIterator<Item = Result<StructuredExtraction, StructuringError>>,
        ) -> Self {
            Self {
                script: Mutex::new(script.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        pub fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Structurer for ScriptedStructurer {
        async fn structure(
            &self,
            _text: &NormalizedText,
            _schema: &FieldSchema,
        ) -> Result<StructuredExtraction, StructuringError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.script
                .lock()
                .expect("script lock")
                .pop_front()
                .unwrap_or(Err(StructuringError::Unavailable))
        }
    }
}
