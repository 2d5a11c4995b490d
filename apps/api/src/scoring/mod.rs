// Recommendation scoring: weighted multi-factor similarity between a fused
// profile and catalog entities, with explainable gap analysis.

pub mod career;
pub mod engine;

pub use engine::{aggregate_gaps, rank_courses, rank_jobs, score_course, score_job, ScoringError};
