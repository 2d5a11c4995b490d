//! Weighted multi-factor scoring of a fused profile against catalog
//! entities.
//!
//! Every factor is normalized to [0, 1] before weighting and the weights sum
//! to 1.0, so the final score needs no rescaling. Course scoring drops the
//! location factor and renormalizes the remaining weights. Each `score_*`
//! call is pure: identical inputs and configuration produce an identical
//! `MatchResult`.

use std::collections::BTreeSet;

use thiserror::Error;
use tracing::warn;
use uuid::Uuid;

use crate::fusion::FusedProfile;
use crate::models::catalog::{Course, JobPosting};
use crate::models::recommendation::{rank, MatchResult};
use crate::scoring::career::CareerLevel;
use crate::taxonomy::{normalize_skill, Taxonomy};

#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("catalog entity {id} is invalid: {reason}")]
    InvalidCatalogEntity { id: Uuid, reason: String },
}

/// One scored dimension, carried until explanations are assembled.
struct Factor {
    weight: f64,
    value: f64,
    reason: Option<String>,
}

impl Factor {
    fn contribution(&self) -> f64 {
        self.weight * self.value
    }
}

/// Scores a profile against a job posting.
pub fn score_job(
    profile: &FusedProfile,
    job: &JobPosting,
    taxonomy: &Taxonomy,
) -> Result<MatchResult, ScoringError> {
    let required = normalized_skill_set(&job.required_skills);
    if required.is_empty() {
        return Err(ScoringError::InvalidCatalogEntity {
            id: job.id,
            reason: "no required skills declared".to_string(),
        });
    }

    let weights = &taxonomy.weights;
    let skill = skill_factor(profile, &required, weights.skills, taxonomy);
    let experience = experience_factor(profile, &job.level, weights.experience);
    let industry = industry_factor(profile, &job.industry, weights.industry, taxonomy);
    let location = location_factor(profile, job, weights.location);

    let matching = skill.matching.clone();
    let gaps = skill.gaps.clone();
    let factors = vec![skill.factor, experience, industry, location];

    Ok(assemble(job.id, factors, matching, gaps, None, taxonomy))
}

/// Scores a profile against a course. `aggregate_gaps` is the gap set the
/// caller computed from prior job scoring; this function performs no job
/// lookups of its own.
pub fn score_course(
    profile: &FusedProfile,
    course: &Course,
    aggregate_gaps: &BTreeSet<String>,
    taxonomy: &Taxonomy,
) -> Result<MatchResult, ScoringError> {
    let taught = normalized_skill_set(&course.skills_taught);
    if taught.is_empty() {
        return Err(ScoringError::InvalidCatalogEntity {
            id: course.id,
            reason: "no skills taught declared".to_string(),
        });
    }

    // Renormalize over the factors that apply to courses.
    let weights = &taxonomy.weights;
    let applicable = weights.skills + weights.experience + weights.industry;
    let (w_skills, w_exp, w_ind) = if applicable > 0.0 {
        (
            weights.skills / applicable,
            weights.experience / applicable,
            weights.industry / applicable,
        )
    } else {
        (0.0, 0.0, 0.0)
    };

    let skill = skill_factor(profile, &taught, w_skills, taxonomy);
    let experience = experience_factor(profile, &course.level, w_exp);
    let industry = industry_factor(profile, &course.category, w_ind, taxonomy);

    let gaps_addressed: BTreeSet<String> =
        aggregate_gaps.intersection(&taught).cloned().collect();

    let matching = skill.matching.clone();
    let gaps = skill.gaps.clone();
    let factors = vec![skill.factor, experience, industry];

    let mut result = assemble(
        course.id,
        factors,
        matching,
        gaps,
        Some(gaps_addressed.clone()),
        taxonomy,
    );
    if !gaps_addressed.is_empty() {
        let named: Vec<&str> = gaps_addressed.iter().take(3).map(String::as_str).collect();
        result.explanation.push(format!(
            "Closes {} skill gap(s): {}",
            gaps_addressed.len(),
            named.join(", ")
        ));
    }
    if let Some(impact) = category_impact(&course.category) {
        result.explanation.push(impact.to_string());
    }
    Ok(result)
}

/// Career-impact blurb keyed off the course category.
fn category_impact(category: &str) -> Option<&'static str> {
    let category = category.to_lowercase();
    if category.contains("data") {
        Some("Develops data analysis and insight skills")
    } else if category.contains("cloud") || category.contains("devops") {
        Some("Builds modern cloud and infrastructure skills")
    } else if category.contains("security") {
        Some("Strengthens security expertise")
    } else if category.contains("leadership") || category.contains("management") {
        Some("Enhances leadership and management capabilities")
    } else if category.contains("software")
        || category.contains("programming")
        || category.contains("web")
    {
        Some("Strengthens core engineering expertise")
    } else {
        None
    }
}

/// Scores every job, skipping invalid entries with a warning, and returns
/// results ordered by `(score desc, id asc)`. Entries below the relevance
/// cutoff are dropped; top-K truncation is the caller's concern.
pub fn rank_jobs(
    profile: &FusedProfile,
    jobs: &[JobPosting],
    taxonomy: &Taxonomy,
) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = jobs
        .iter()
        .filter_map(|job| match score_job(profile, job, taxonomy) {
            Ok(result) => Some(result),
            Err(e) => {
                warn!("Skipping job during scoring: {e}");
                None
            }
        })
        .filter(|r| r.score >= taxonomy.thresholds.min_relevance)
        .collect();
    rank(&mut results);
    results
}

/// Course counterpart of [`rank_jobs`].
pub fn rank_courses(
    profile: &FusedProfile,
    courses: &[Course],
    aggregate_gaps: &BTreeSet<String>,
    taxonomy: &Taxonomy,
) -> Vec<MatchResult> {
    let mut results: Vec<MatchResult> = courses
        .iter()
        .filter_map(
            |course| match score_course(profile, course, aggregate_gaps, taxonomy) {
                Ok(result) => Some(result),
                Err(e) => {
                    warn!("Skipping course during scoring: {e}");
                    None
                }
            },
        )
        .filter(|r| r.score >= taxonomy.thresholds.min_relevance)
        .collect();
    rank(&mut results);
    results
}

/// Union of the skill gaps across a set of job results, used as the input
/// gap set for course scoring.
pub fn aggregate_gaps(results: &[MatchResult]) -> BTreeSet<String> {
    results
        .iter()
        .flat_map(|r| r.skill_gaps.iter().cloned())
        .collect()
}

struct SkillFactor {
    factor: Factor,
    matching: BTreeSet<String>,
    gaps: BTreeSet<String>,
}

fn normalized_skill_set(skills: &[String]) -> BTreeSet<String> {
    skills
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Skill overlap against the entity's skill set, with a capped bonus for
/// profile skills outside the set that share a category with it.
fn skill_factor(
    profile: &FusedProfile,
    required: &BTreeSet<String>,
    weight: f64,
    taxonomy: &Taxonomy,
) -> SkillFactor {
    let empty = BTreeSet::new();
    let profile_skills = profile
        .profile
        .skills
        .as_ref()
        .map(|f| &f.value)
        .unwrap_or(&empty);

    let matching: BTreeSet<String> = profile_skills.intersection(required).cloned().collect();
    let gaps: BTreeSet<String> = required.difference(profile_skills).cloned().collect();

    let base = matching.len() as f64 / required.len() as f64;

    let required_categories: BTreeSet<&str> = required
        .iter()
        .filter_map(|s| taxonomy.categorize(s))
        .collect();
    let adjacent = profile_skills
        .difference(required)
        .filter_map(|s| taxonomy.categorize(s))
        .filter(|c| required_categories.contains(c))
        .count();
    let bonus = (adjacent as f64 * taxonomy.thresholds.adjacent_bonus_step)
        .min(taxonomy.thresholds.adjacent_bonus_cap);

    let value = (base + bonus).min(1.0);

    let reason = if !matching.is_empty() {
        let adjective = if value > 0.7 {
            "Strong"
        } else if value > 0.4 {
            "Good"
        } else {
            "Partial"
        };
        Some(format!(
            "{adjective} skill match: {} matching skills",
            matching.len()
        ))
    } else if adjacent > 0 {
        Some("Adjacent expertise in related skill categories".to_string())
    } else {
        None
    };

    SkillFactor {
        factor: Factor {
            weight,
            value,
            reason,
        },
        matching,
        gaps,
    }
}

/// Ordinal distance between the profile's career level and the entity's
/// declared level: exact 1.0, one step 0.6, further 0.2.
fn experience_factor(profile: &FusedProfile, level_tag: &str, weight: f64) -> Factor {
    let entity_level = CareerLevel::from_tag(level_tag);
    let value = match entity_level {
        Some(entity_level) => {
            let distance = profile
                .career_level
                .value
                .ordinal()
                .abs_diff(entity_level.ordinal());
            match distance {
                0 => 1.0,
                1 => 0.6,
                _ => 0.2,
            }
        }
        // No declared level to compare against; score as one step off.
        None => 0.6,
    };

    let reason = if value >= 1.0 {
        Some("Experience level aligns well".to_string())
    } else if value >= 0.6 && entity_level.is_some() {
        Some("Experience level is one step from the target".to_string())
    } else {
        None
    };

    Factor {
        weight,
        value,
        reason,
    }
}

fn industry_factor(
    profile: &FusedProfile,
    entity_industry: &str,
    weight: f64,
    taxonomy: &Taxonomy,
) -> Factor {
    let entity_industry = entity_industry.trim();
    let inferred = taxonomy.infer_industry(&profile.profile.inference_text());

    let (value, reason) = match (&inferred, entity_industry.is_empty()) {
        (Some(profile_industry), false) => {
            if profile_industry.eq_ignore_ascii_case(entity_industry) {
                (1.0, Some(format!("Industry match: {entity_industry}")))
            } else if taxonomy.industries_related(profile_industry, entity_industry) {
                (
                    taxonomy.thresholds.industry_partial,
                    Some("Related industry background".to_string()),
                )
            } else {
                (0.0, None)
            }
        }
        _ => (0.0, None),
    };

    Factor {
        weight,
        value,
        reason,
    }
}

/// Jobs only. Remote roles are compatible with any profile location; on-site
/// roles need a location match. Jobs without location data contribute
/// nothing to the score.
fn location_factor(profile: &FusedProfile, job: &JobPosting, weight: f64) -> Factor {
    if job.remote {
        return Factor {
            weight,
            value: 1.0,
            reason: Some("Remote-friendly role".to_string()),
        };
    }

    let job_location = job.location.trim().to_lowercase();
    if job_location.is_empty() {
        return Factor {
            weight,
            value: 0.0,
            reason: None,
        };
    }

    let profile_location = profile
        .profile
        .location
        .as_ref()
        .map(|f| f.value.trim().to_lowercase());

    let matched = profile_location
        .as_ref()
        .map(|loc| loc.contains(&job_location) || job_location.contains(loc.as_str()))
        .unwrap_or(false);

    Factor {
        weight,
        value: if matched { 1.0 } else { 0.0 },
        reason: matched.then(|| "Location compatible".to_string()),
    }
}

fn assemble(
    entity_id: Uuid,
    mut factors: Vec<Factor>,
    matching_skills: BTreeSet<String>,
    skill_gaps: BTreeSet<String>,
    skill_gaps_addressed: Option<BTreeSet<String>>,
    taxonomy: &Taxonomy,
) -> MatchResult {
    let score = factors
        .iter()
        .map(Factor::contribution)
        .sum::<f64>()
        .clamp(0.0, 1.0);

    // Strongest contribution explains itself first.
    factors.sort_by(|a, b| {
        b.contribution()
            .partial_cmp(&a.contribution())
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    let explanation = factors
        .into_iter()
        .filter(|f| f.contribution() >= taxonomy.thresholds.explanation_min)
        .filter_map(|f| f.reason)
        .collect();

    MatchResult {
        entity_id,
        score,
        matching_skills,
        skill_gaps,
        explanation,
        skill_gaps_addressed,
    }
}
