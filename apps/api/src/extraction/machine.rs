//! The extraction state machine.
//!
//! `Received -> Normalized -> Structuring -> {Validated, Degraded, Failed}`.
//! Retry policy lives here, not in the adapter: each invocation gets its own
//! bounded attempt budget and backoff, and the only suspension point is the
//! adapter call, so dropping the future cancels the retry loop cleanly.

use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::extraction::heuristic::HeuristicExtractor;
use crate::extraction::normalize::{normalize, NormalizedText, RawDocument};
use crate::extraction::structurer::{
    FieldSchema, StructuredExtraction, Structurer, StructuringError,
};
use crate::extraction::ExtractionError;
use crate::fusion::CandidateProfile;

/// States the machine moves through. `Validated` and `Degraded` both carry a
/// usable profile; `Failed` is the only terminal error state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionState {
    Received,
    Normalized,
    Structuring,
    Validated,
    Degraded,
    Failed,
}

/// How the accepted profile was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    Structured,
    Heuristic,
}

/// A successful extraction: a profile, the overall confidence, and the state
/// trace for observability.
#[derive(Debug)]
pub struct ExtractionOutcome {
    pub profile: CandidateProfile,
    pub confidence: f64,
    pub mode: ExtractionMode,
    pub trace: Vec<ExtractionState>,
}

impl ExtractionOutcome {
    pub fn is_degraded(&self) -> bool {
        self.mode == ExtractionMode::Heuristic
    }
}

/// Knobs for one extraction invocation. Retry state is never shared across
/// invocations.
#[derive(Debug, Clone)]
pub struct ExtractionPolicy {
    /// Confidence at or above which a structured result is accepted.
    pub acceptance_threshold: f64,
    /// Ceiling applied to heuristic-derived field confidences.
    pub heuristic_ceiling: f64,
    /// Per-attempt timeout on the structuring call.
    pub attempt_timeout: Duration,
    /// Retries after the first attempt (2 means up to 3 attempts total).
    pub max_retries: u32,
    /// Base backoff; doubles per retry.
    pub backoff_base: Duration,
}

impl Default for ExtractionPolicy {
    fn default() -> Self {
        Self {
            acceptance_threshold: 0.6,
            heuristic_ceiling: 0.4,
            attempt_timeout: Duration::from_secs(30),
            max_retries: 2,
            backoff_base: Duration::from_millis(500),
        }
    }
}

/// Runs the full extraction pipeline over one document.
pub async fn run_extraction(
    doc: &RawDocument,
    structurer: Option<&dyn Structurer>,
    heuristic: &HeuristicExtractor,
    policy: &ExtractionPolicy,
) -> Result<ExtractionOutcome, ExtractionError> {
    let mut trace = vec![ExtractionState::Received];

    let text = match normalize(doc) {
        Ok(text) => text,
        Err(e) => {
            trace.push(ExtractionState::Failed);
            warn!("Extraction failed before normalization: {e}");
            return Err(e);
        }
    };
    trace.push(ExtractionState::Normalized);

    if let Some(structurer) = structurer {
        trace.push(ExtractionState::Structuring);
        let schema = FieldSchema::candidate_profile();

        match structure_with_retries(structurer, &text, &schema, policy).await {
            Ok(extraction) if extraction.confidence >= policy.acceptance_threshold => {
                trace.push(ExtractionState::Validated);
                info!(
                    confidence = extraction.confidence,
                    ?trace,
                    "Structured extraction accepted"
                );
                return Ok(ExtractionOutcome {
                    profile: extraction.profile,
                    confidence: extraction.confidence,
                    mode: ExtractionMode::Structured,
                    trace,
                });
            }
            Ok(extraction) => {
                info!(
                    confidence = extraction.confidence,
                    threshold = policy.acceptance_threshold,
                    "Structured extraction below acceptance threshold, falling back"
                );
            }
            Err(e) => {
                warn!("Structuring unavailable or exhausted: {e}");
            }
        }
    } else {
        debug!("No structuring capability configured");
    }

    // Degraded path: rule-based extraction with a hard confidence ceiling.
    let mut profile = match heuristic.extract(&text) {
        Ok(profile) => profile,
        Err(e) => {
            trace.push(ExtractionState::Failed);
            warn!("Heuristic extraction failed: {e}");
            return Err(e);
        }
    };
    profile.clamp_confidence(policy.heuristic_ceiling);
    trace.push(ExtractionState::Degraded);
    info!(ceiling = policy.heuristic_ceiling, ?trace, "Heuristic extraction accepted");

    Ok(ExtractionOutcome {
        profile,
        confidence: policy.heuristic_ceiling,
        mode: ExtractionMode::Heuristic,
        trace,
    })
}

/// Calls the structurer with a per-attempt timeout and exponential backoff.
/// A non-transient error aborts immediately; a low-confidence success is
/// returned as-is for the caller to judge.
async fn structure_with_retries(
    structurer: &dyn Structurer,
    text: &NormalizedText,
    schema: &FieldSchema,
    policy: &ExtractionPolicy,
) -> Result<StructuredExtraction, StructuringError> {
    let mut last_error: Option<StructuringError> = None;

    for attempt in 0..=policy.max_retries {
        if attempt > 0 {
            let delay = policy.backoff_base * (1 << (attempt - 1));
            debug!(
                "Structuring attempt {attempt} failed, retrying after {}ms",
                delay.as_millis()
            );
            tokio::time::sleep(delay).await;
        }

        let result = tokio::time::timeout(policy.attempt_timeout, structurer.structure(text, schema))
            .await
            .map_err(|_| StructuringError::Timeout(policy.attempt_timeout))
            .and_then(|r| r);

        match result {
            Ok(extraction) => return Ok(extraction),
            Err(e) if e.is_transient() => {
                last_error = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or(StructuringError::Unavailable))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    use bytes::Bytes;

    use crate::extraction::normalize::MediaType;
    use crate::extraction::structurer::testing::ScriptedStructurer;
    use crate::extraction::structurer::StructuredExtraction;
    use crate::fusion::FieldValue;
    use crate::taxonomy::Taxonomy;

    const RESUME_TEXT: &str = "\
Jane Doe
jane@example.com
Senior engineer, 8 years of Python and SQL.";

    fn doc(text: &str) -> RawDocument {
        RawDocument {
            bytes: Bytes::copy_from_slice(text.as_bytes()),
            media_type: MediaType::PlainText,
        }
    }

    fn heuristic() -> HeuristicExtractor {
        HeuristicExtractor::new(Arc::new(Taxonomy::default()))
    }

    fn fast_policy() -> ExtractionPolicy {
        ExtractionPolicy {
            backoff_base: Duration::from_millis(1),
            attempt_timeout: Duration::from_secs(5),
            ..Default::default()
        }
    }

    fn structured(confidence: f64) -> StructuredExtraction {
        StructuredExtraction {
            profile: CandidateProfile {
                email: Some(FieldValue::extracted("jane@example.com".into(), confidence)),
                skills: Some(FieldValue::extracted(
                    BTreeSet::from(["python".to_string()]),
                    confidence,
                )),
                ..Default::default()
            },
            confidence,
        }
    }

    #[tokio::test]
    async fn test_confident_structuring_is_validated() {
        let structurer = ScriptedStructurer::new([Ok(structured(0.9))]);
        let outcome = run_extraction(
            &doc(RESUME_TEXT),
            Some(&structurer),
            &heuristic(),
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.mode, ExtractionMode::Structured);
        assert!((outcome.confidence - 0.9).abs() < 1e-9);
        assert_eq!(
            outcome.trace,
            vec![
                ExtractionState::Received,
                ExtractionState::Normalized,
                ExtractionState::Structuring,
                ExtractionState::Validated,
            ]
        );
        assert_eq!(structurer.call_count(), 1);
    }

    #[tokio::test]
    async fn test_low_confidence_falls_back_without_retry() {
        let structurer = ScriptedStructurer::new([Ok(structured(0.3))]);
        let outcome = run_extraction(
            &doc(RESUME_TEXT),
            Some(&structurer),
            &heuristic(),
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.mode, ExtractionMode::Heuristic);
        // a low-confidence response is an answer, not a failure to retry
        assert_eq!(structurer.call_count(), 1);
        assert_eq!(*outcome.trace.last().unwrap(), ExtractionState::Degraded);
    }

    #[tokio::test]
    async fn test_transient_failures_retry_then_succeed() {
        let structurer = ScriptedStructurer::new([
            Err(StructuringError::Transient("503".into())),
            Err(StructuringError::Transient("503".into())),
            Ok(structured(0.8)),
        ]);
        let outcome = run_extraction(
            &doc(RESUME_TEXT),
            Some(&structurer),
            &heuristic(),
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.mode, ExtractionMode::Structured);
        assert_eq!(structurer.call_count(), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_degrade_to_heuristic() {
        let structurer = ScriptedStructurer::new([
            Err(StructuringError::Transient("a".into())),
            Err(StructuringError::Transient("b".into())),
            Err(StructuringError::Transient("c".into())),
        ]);
        let outcome = run_extraction(
            &doc(RESUME_TEXT),
            Some(&structurer),
            &heuristic(),
            &fast_policy(),
        )
        .await
        .unwrap();

        // initial attempt plus exactly two retries
        assert_eq!(structurer.call_count(), 3);
        assert_eq!(outcome.mode, ExtractionMode::Heuristic);
    }

    #[tokio::test]
    async fn test_unavailable_short_circuits_to_fallback() {
        let structurer = ScriptedStructurer::new([Err(StructuringError::Unavailable)]);
        let outcome = run_extraction(
            &doc(RESUME_TEXT),
            Some(&structurer),
            &heuristic(),
            &fast_policy(),
        )
        .await
        .unwrap();

        assert_eq!(structurer.call_count(), 1);
        assert_eq!(outcome.mode, ExtractionMode::Heuristic);
    }

    #[tokio::test]
    async fn test_no_structurer_goes_straight_to_heuristic() {
        let outcome = run_extraction(&doc(RESUME_TEXT), None, &heuristic(), &fast_policy())
            .await
            .unwrap();

        assert_eq!(outcome.mode, ExtractionMode::Heuristic);
        assert!(!outcome.trace.contains(&ExtractionState::Structuring));
    }

    #[tokio::test]
    async fn test_heuristic_confidence_never_exceeds_ceiling() {
        let outcome = run_extraction(&doc(RESUME_TEXT), None, &heuristic(), &fast_policy())
            .await
            .unwrap();

        let ceiling = fast_policy().heuristic_ceiling;
        assert!((outcome.confidence - ceiling).abs() < 1e-9);
        // rules carry higher internal confidences, all clamped on the way out
        let email = outcome.profile.email.as_ref().unwrap();
        assert!(email.confidence <= ceiling + 1e-9, "email {}", email.confidence);
        let name = outcome.profile.name.as_ref().unwrap();
        assert!(name.confidence <= ceiling + 1e-9, "name {}", name.confidence);
        let skills = outcome.profile.skills.as_ref().unwrap();
        assert!(skills.confidence <= ceiling + 1e-9, "skills {}", skills.confidence);
        let years = outcome.profile.years_experience.as_ref().unwrap();
        assert!(years.confidence <= ceiling + 1e-9, "years {}", years.confidence);
    }

    #[tokio::test]
    async fn test_empty_document_fails_without_structuring() {
        let structurer = ScriptedStructurer::new([Ok(structured(0.9))]);
        let err = run_extraction(&doc("   "), Some(&structurer), &heuristic(), &fast_policy())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::UnreadableDocument(_)));
        assert_eq!(structurer.call_count(), 0);
    }

    #[tokio::test]
    async fn test_unparseable_text_is_terminal_after_fallback() {
        let err = run_extraction(&doc("!!! ???"), None, &heuristic(), &fast_policy())
            .await
            .unwrap_err();

        assert!(matches!(err, ExtractionError::HeuristicFailure(_)));
    }

    #[tokio::test]
    async fn test_timeout_counts_as_transient_attempt() {
        struct Hanging;
        #[async_trait::async_trait]
        impl Structurer for Hanging {
            async fn structure(
                &self,
                _text: &NormalizedText,
                _schema: &FieldSchema,
            ) -> Result<StructuredExtraction, StructuringError> {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                unreachable!()
            }
        }

        let policy = ExtractionPolicy {
            attempt_timeout: Duration::from_millis(5),
            backoff_base: Duration::from_millis(1),
            ..Default::default()
        };
        let outcome = run_extraction(&doc(RESUME_TEXT), Some(&Hanging), &heuristic(), &policy)
            .await
            .unwrap();

        assert_eq!(outcome.mode, ExtractionMode::Heuristic);
    }
}
