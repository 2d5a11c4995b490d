//! Deterministic field-level fusion of the form and extracted profiles.
//!
//! The merge never recomputes provenance from argument position: the winning
//! `FieldValue` keeps the origin and confidence it arrived with. That makes
//! the merge a fixpoint — running it again over its own output (alone or
//! against itself) changes nothing.

use std::collections::BTreeSet;

use crate::fusion::profile::{
    estimate_years_experience, CandidateProfile, FieldValue, FusedProfile, Origin,
};
use crate::scoring::career::{derive_career_level, CareerLevel};
use crate::taxonomy::Taxonomy;

/// Merges the form profile with the extraction result (absent when the
/// extraction branch failed). Scalars: form wins when present. Sets: union.
/// Lists: concatenation deduplicated by composite key. Work history is
/// ordered most recent first after merging.
pub fn merge(
    form: &CandidateProfile,
    extracted: Option<&CandidateProfile>,
    taxonomy: &Taxonomy,
) -> FusedProfile {
    let empty = CandidateProfile::default();
    let extracted = extracted.unwrap_or(&empty);

    let mut profile = CandidateProfile {
        name: pick_scalar(&form.name, &extracted.name),
        email: pick_scalar(&form.email, &extracted.email),
        phone: pick_scalar(&form.phone, &extracted.phone),
        location: pick_scalar(&form.location, &extracted.location),
        current_role: pick_scalar(&form.current_role, &extracted.current_role),
        company: pick_scalar(&form.company, &extracted.company),
        years_experience: pick_scalar(&form.years_experience, &extracted.years_experience),
        highest_degree: pick_scalar(&form.highest_degree, &extracted.highest_degree),
        skills: merge_sets(&form.skills, &extracted.skills),
        certifications: merge_sets(&form.certifications, &extracted.certifications),
        languages: merge_sets(&form.languages, &extracted.languages),
        work_history: merge_entries(&form.work_history, &extracted.work_history, |e| {
            e.dedup_key()
        }),
        education: merge_entries(&form.education, &extracted.education, |e| e.dedup_key()),
        projects: merge_entries(&form.projects, &extracted.projects, |e| e.dedup_key()),
    };

    if let Some(history) = &mut profile.work_history {
        let mut entries = std::mem::take(&mut history.value);
        entries.sort_by(|a, b| b.recency_key().cmp(&a.recency_key()));
        history.value = entries;
    }

    let career_level = derive(&profile, taxonomy);

    FusedProfile {
        profile,
        career_level,
    }
}

fn derive(profile: &CandidateProfile, taxonomy: &Taxonomy) -> FieldValue<CareerLevel> {
    let years = profile
        .years_experience
        .as_ref()
        .map(|f| f.value)
        .or_else(|| {
            profile
                .work_history
                .as_ref()
                .and_then(|h| estimate_years_experience(&h.value))
        });

    let role_title = profile.current_role.as_ref().map(|f| f.value.as_str());
    let history_titles = profile
        .work_history
        .iter()
        .flat_map(|h| h.value.iter().map(|e| e.title.as_str()));
    let titles = role_title.into_iter().chain(history_titles);

    FieldValue::calculated(derive_career_level(years, titles, taxonomy))
}

/// Scalar precedence: the form side wins when it carries a value; the
/// winner's own provenance is preserved. Both absent -> omitted.
fn pick_scalar<T: Clone>(
    form: &Option<FieldValue<T>>,
    extracted: &Option<FieldValue<T>>,
) -> Option<FieldValue<T>> {
    form.clone().or_else(|| extracted.clone())
}

/// Origin of a value built from two contributing sources. Identical origins
/// stay as they are (merging a profile with itself is a no-op); differing
/// origins become `Combined`.
fn combined_origin(a: Origin, b: Origin) -> Origin {
    if a == b {
        a
    } else {
        Origin::Combined
    }
}

fn merge_sets(
    form: &Option<FieldValue<BTreeSet<String>>>,
    extracted: &Option<FieldValue<BTreeSet<String>>>,
) -> Option<FieldValue<BTreeSet<String>>> {
    match (form, extracted) {
        (Some(f), Some(e)) if !f.value.is_empty() && !e.value.is_empty() => {
            let value: BTreeSet<String> = f.value.union(&e.value).cloned().collect();
            Some(FieldValue {
                value,
                origin: combined_origin(f.origin, e.origin),
                confidence: f.confidence.max(e.confidence),
            })
        }
        (Some(f), Some(e)) => {
            let single = if f.value.is_empty() { e } else { f };
            non_empty_set(single)
        }
        (Some(f), None) => non_empty_set(f),
        (None, Some(e)) => non_empty_set(e),
        (None, None) => None,
    }
}

fn non_empty_set(field: &FieldValue<BTreeSet<String>>) -> Option<FieldValue<BTreeSet<String>>> {
    if field.value.is_empty() {
        None
    } else {
        Some(field.clone())
    }
}

fn merge_entries<T: Clone, K: Ord>(
    form: &Option<FieldValue<Vec<T>>>,
    extracted: &Option<FieldValue<Vec<T>>>,
    key: impl Fn(&T) -> K,
) -> Option<FieldValue<Vec<T>>> {
    match (form, extracted) {
        (Some(f), Some(e)) if !f.value.is_empty() && !e.value.is_empty() => {
            let mut seen = BTreeSet::new();
            let mut merged = Vec::new();
            for entry in f.value.iter().chain(e.value.iter()) {
                if seen.insert(key(entry)) {
                    merged.push(entry.clone());
                }
            }
            Some(FieldValue {
                value: merged,
                origin: combined_origin(f.origin, e.origin),
                confidence: f.confidence.max(e.confidence),
            })
        }
        (Some(f), Some(e)) => {
            let single = if f.value.is_empty() { e } else { f };
            non_empty_list(single)
        }
        (Some(f), None) => non_empty_list(f),
        (None, Some(e)) => non_empty_list(e),
        (None, None) => None,
    }
}

fn non_empty_list<T: Clone>(field: &FieldValue<Vec<T>>) -> Option<FieldValue<Vec<T>>> {
    if field.value.is_empty() {
        None
    } else {
        Some(field.clone())
    }
}
