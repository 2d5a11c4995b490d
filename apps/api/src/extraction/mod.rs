// Document extraction pipeline: normalization, the structuring adapter
// boundary, the rule-based fallback, and the state machine tying them
// together.

pub mod heuristic;
pub mod machine;
pub mod normalize;
pub mod structurer;

use thiserror::Error;

pub use heuristic::HeuristicExtractor;
pub use machine::{run_extraction, ExtractionMode, ExtractionOutcome, ExtractionPolicy, ExtractionState};
pub use normalize::{normalize, MediaType, NormalizedText, RawDocument};
pub use structurer::{FieldSchema, StructuredExtraction, Structurer, StructuringError};

/// Terminal extraction failures. Everything else in the pipeline degrades
/// instead of failing.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// The uploaded document could not be turned into text. Fatal, no retry.
    #[error("document is empty or unreadable: {0}")]
    UnreadableDocument(String),

    /// The rule-based fallback could not make sense of the normalized text.
    /// Fatal for the extraction branch only; fusion proceeds form-only.
    #[error("heuristic extraction failed: {0}")]
    HeuristicFailure(String),
}
