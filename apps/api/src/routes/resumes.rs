//! Resume processing endpoints: the upload boundary in, the recommendation
//! boundary out.

use std::collections::BTreeSet;
use std::time::Duration;

use axum::extract::{Multipart, Query, State};
use axum::Json;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::errors::AppError;
use crate::extraction::{
    run_extraction, ExtractionError, ExtractionMode, ExtractionPolicy, ExtractionState, MediaType,
    RawDocument,
};
use crate::fusion::{merge, CandidateProfile, FormProfile, FusedProfile};
use crate::models::recommendation::MatchResult;
use crate::scoring::{aggregate_gaps, rank_courses, rank_jobs};
use crate::state::AppState;

const DEFAULT_TOP_JOBS: usize = 10;
const DEFAULT_TOP_COURSES: usize = 10;

#[derive(Debug, Deserialize)]
pub struct TopKQuery {
    pub top_jobs: Option<usize>,
    pub top_courses: Option<usize>,
}

/// How the extraction branch concluded, surfaced alongside the profile so
/// callers can tell degraded output from a clean run.
#[derive(Debug, Serialize)]
pub struct ExtractionSummary {
    /// `structured`, `heuristic`, or absent when extraction failed.
    pub mode: Option<ExtractionMode>,
    pub confidence: Option<f64>,
    pub degraded: bool,
    /// The states the extraction machine moved through.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub trace: Vec<ExtractionState>,
    /// Present only when the extraction branch failed and the profile was
    /// built from the form alone.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ProcessResumeResponse {
    pub profile: FusedProfile,
    pub extraction: ExtractionSummary,
    pub jobs: Vec<MatchResult>,
    pub courses: Vec<MatchResult>,
}

/// POST /api/v1/resumes/process
///
/// Multipart request: a `resume` file part (PDF or plain text) and an
/// optional `form` part with the user-supplied profile JSON. Runs the whole
/// pipeline and responds with the fused profile plus ranked recommendations.
pub async fn handle_process_resume(
    State(state): State<AppState>,
    Query(top_k): Query<TopKQuery>,
    multipart: Multipart,
) -> Result<Json<ProcessResumeResponse>, AppError> {
    let parts = read_multipart(multipart).await?;
    let doc = parts
        .document
        .ok_or_else(|| AppError::Validation("missing 'resume' file part".to_string()))?;
    let form = parts.form.unwrap_or_default().into_profile();

    let policy = extraction_policy(&state);
    let structurer = state.structurer.as_deref();

    let (extracted, summary) =
        match run_extraction(&doc, structurer, &state.heuristic, &policy).await {
            Ok(outcome) => {
                let summary = ExtractionSummary {
                    mode: Some(outcome.mode),
                    confidence: Some(outcome.confidence),
                    degraded: outcome.is_degraded(),
                    trace: outcome.trace,
                    error: None,
                };
                (Some(outcome.profile), summary)
            }
            Err(e @ ExtractionError::UnreadableDocument(_)) => return Err(e.into()),
            Err(ExtractionError::HeuristicFailure(msg)) => {
                // The extraction branch is gone; the form carries the request.
                warn!("Extraction branch failed, proceeding form-only: {msg}");
                let summary = ExtractionSummary {
                    mode: None,
                    confidence: None,
                    degraded: true,
                    trace: Vec::new(),
                    error: Some(msg),
                };
                (None, summary)
            }
        };

    let fused = merge(&form, extracted.as_ref(), &state.taxonomy);
    let response = recommend(&state, fused, summary, &top_k).await?;
    Ok(Json(response))
}

/// POST /api/v1/profiles/recommendations
///
/// JSON body: the form profile alone, no document. Scores the profile as-is
/// against the catalog.
pub async fn handle_recommendations(
    State(state): State<AppState>,
    Query(top_k): Query<TopKQuery>,
    Json(form): Json<FormProfile>,
) -> Result<Json<ProcessResumeResponse>, AppError> {
    let form = form.into_profile();
    if form == CandidateProfile::default() {
        return Err(AppError::Validation("profile is empty".to_string()));
    }

    let fused = merge(&form, None, &state.taxonomy);
    let summary = ExtractionSummary {
        mode: None,
        confidence: None,
        degraded: false,
        trace: Vec::new(),
        error: None,
    };
    let response = recommend(&state, fused, summary, &top_k).await?;
    Ok(Json(response))
}

async fn recommend(
    state: &AppState,
    fused: FusedProfile,
    summary: ExtractionSummary,
    top_k: &TopKQuery,
) -> Result<ProcessResumeResponse, AppError> {
    let jobs = state
        .catalog
        .jobs()
        .await
        .map_err(|e| AppError::Catalog(e.to_string()))?;
    let courses = state
        .catalog
        .courses()
        .await
        .map_err(|e| AppError::Catalog(e.to_string()))?;

    let mut job_results = rank_jobs(&fused, &jobs, &state.taxonomy);
    // Courses are scored against the gaps the job market surfaced.
    let gaps: BTreeSet<String> = aggregate_gaps(&job_results);
    let mut course_results = rank_courses(&fused, &courses, &gaps, &state.taxonomy);

    job_results.truncate(top_k.top_jobs.unwrap_or(DEFAULT_TOP_JOBS));
    course_results.truncate(top_k.top_courses.unwrap_or(DEFAULT_TOP_COURSES));

    info!(
        jobs = job_results.len(),
        courses = course_results.len(),
        "Recommendations computed"
    );

    Ok(ProcessResumeResponse {
        profile: fused,
        extraction: summary,
        jobs: job_results,
        courses: course_results,
    })
}

struct UploadParts {
    document: Option<RawDocument>,
    form: Option<FormProfile>,
}

async fn read_multipart(mut multipart: Multipart) -> Result<UploadParts, AppError> {
    let mut document = None;
    let mut form = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("malformed multipart body: {e}")))?
    {
        match field.name() {
            Some("resume") => {
                let media_type = resolve_media_type(
                    field.content_type().map(str::to_string),
                    field.file_name().map(str::to_string),
                )?;
                let bytes: Bytes = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read upload: {e}")))?;
                document = Some(RawDocument { bytes, media_type });
            }
            Some("form") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("failed to read form part: {e}")))?;
                let parsed: FormProfile = serde_json::from_str(&text)
                    .map_err(|e| AppError::Validation(format!("invalid form JSON: {e}")))?;
                form = Some(parsed);
            }
            _ => {} // unknown parts are ignored
        }
    }

    Ok(UploadParts { document, form })
}

fn resolve_media_type(
    content_type: Option<String>,
    file_name: Option<String>,
) -> Result<MediaType, AppError> {
    if let Some(ct) = &content_type {
        if let Some(media_type) = MediaType::from_mime(ct) {
            return Ok(media_type);
        }
    }
    if let Some(name) = &file_name {
        let name = name.to_lowercase();
        if name.ends_with(".pdf") {
            return Ok(MediaType::Pdf);
        }
        if name.ends_with(".txt") || name.ends_with(".md") {
            return Ok(MediaType::PlainText);
        }
    }
    Err(AppError::Validation(format!(
        "unsupported document type: {}",
        content_type.as_deref().unwrap_or("unknown")
    )))
}

fn extraction_policy(state: &AppState) -> ExtractionPolicy {
    ExtractionPolicy {
        acceptance_threshold: state.taxonomy.thresholds.acceptance,
        heuristic_ceiling: state.taxonomy.thresholds.heuristic_ceiling,
        attempt_timeout: Duration::from_secs(state.config.structuring_timeout_secs),
        max_retries: state.config.structuring_max_retries,
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_media_type_prefers_content_type() {
        let media = resolve_media_type(
            Some("application/pdf".to_string()),
            Some("resume.txt".to_string()),
        )
        .unwrap();
        assert_eq!(media, MediaType::Pdf);
    }

    #[test]
    fn test_resolve_media_type_falls_back_to_extension() {
        let media = resolve_media_type(None, Some("resume.PDF".to_string())).unwrap();
        assert_eq!(media, MediaType::Pdf);
        let media = resolve_media_type(None, Some("resume.txt".to_string())).unwrap();
        assert_eq!(media, MediaType::PlainText);
    }

    #[test]
    fn test_resolve_media_type_rejects_unknown() {
        assert!(resolve_media_type(Some("image/png".to_string()), None).is_err());
        assert!(resolve_media_type(None, None).is_err());
    }
}
