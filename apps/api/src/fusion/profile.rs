use std::collections::BTreeSet;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::scoring::career::CareerLevel;
use crate::taxonomy::normalize_skill;

/// Where a field's value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Origin {
    Form,
    Extracted,
    Combined,
    Calculated,
}

/// A value tagged with its origin and a confidence in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldValue<T> {
    pub value: T,
    pub origin: Origin,
    pub confidence: f64,
}

impl<T> FieldValue<T> {
    pub fn form(value: T) -> Self {
        Self {
            value,
            origin: Origin::Form,
            confidence: 1.0,
        }
    }

    pub fn extracted(value: T, confidence: f64) -> Self {
        Self {
            value,
            origin: Origin::Extracted,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }

    pub fn calculated(value: T) -> Self {
        Self {
            value,
            origin: Origin::Calculated,
            confidence: 1.0,
        }
    }
}

/// One position in the work history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WorkEntry {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
    /// Dates as they appeared in the source, typically MM/YYYY or "Present".
    #[serde(default)]
    pub start_date: String,
    #[serde(default)]
    pub end_date: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
}

impl WorkEntry {
    /// Composite identity used for de-duplication across sources.
    pub fn dedup_key(&self) -> (String, String, String) {
        (
            self.company.trim().to_lowercase(),
            self.start_date.trim().to_string(),
            self.end_date.trim().to_string(),
        )
    }

    /// Sort key: (year, month) of the end date, "Present"/open-ended pinned
    /// to the far future so current positions rank first.
    pub fn recency_key(&self) -> (i32, u32) {
        let end = self.end_date.trim();
        if end.is_empty() || end.eq_ignore_ascii_case("present") {
            return (9999, 12);
        }
        parse_month_year(end).unwrap_or((0, 0))
    }
}

/// One education entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EducationEntry {
    #[serde(default)]
    pub degree: String,
    #[serde(default)]
    pub field: String,
    #[serde(default)]
    pub institution: String,
    #[serde(default)]
    pub graduation_date: String,
    #[serde(default)]
    pub location: String,
}

impl EducationEntry {
    pub fn dedup_key(&self) -> (String, String) {
        (
            self.institution.trim().to_lowercase(),
            self.degree.trim().to_lowercase(),
        )
    }
}

/// One project entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub technologies: Vec<String>,
    #[serde(default)]
    pub url: String,
}

impl ProjectEntry {
    pub fn dedup_key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

/// The profile shape shared by both sources of truth: the user-supplied form
/// and the document extraction. Structurally identical on both sides so the
/// merge can walk it field by field; `None` means the source did not supply
/// the field (distinct from supplying an empty value).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CandidateProfile {
    pub name: Option<FieldValue<String>>,
    pub email: Option<FieldValue<String>>,
    pub phone: Option<FieldValue<String>>,
    pub location: Option<FieldValue<String>>,
    pub current_role: Option<FieldValue<String>>,
    pub company: Option<FieldValue<String>>,
    pub years_experience: Option<FieldValue<f64>>,
    pub highest_degree: Option<FieldValue<String>>,
    pub skills: Option<FieldValue<BTreeSet<String>>>,
    pub certifications: Option<FieldValue<BTreeSet<String>>>,
    pub languages: Option<FieldValue<BTreeSet<String>>>,
    pub work_history: Option<FieldValue<Vec<WorkEntry>>>,
    pub education: Option<FieldValue<Vec<EducationEntry>>>,
    pub projects: Option<FieldValue<Vec<ProjectEntry>>>,
}

impl CandidateProfile {
    /// Clamps every field confidence to `ceiling`. Applied after heuristic
    /// fallback so no rule-derived field can claim more trust than the
    /// extraction mode warrants.
    pub fn clamp_confidence(&mut self, ceiling: f64) {
        fn clamp<T>(field: &mut Option<FieldValue<T>>, ceiling: f64) {
            if let Some(fv) = field {
                fv.confidence = fv.confidence.min(ceiling);
            }
        }
        clamp(&mut self.name, ceiling);
        clamp(&mut self.email, ceiling);
        clamp(&mut self.phone, ceiling);
        clamp(&mut self.location, ceiling);
        clamp(&mut self.current_role, ceiling);
        clamp(&mut self.company, ceiling);
        clamp(&mut self.years_experience, ceiling);
        clamp(&mut self.highest_degree, ceiling);
        clamp(&mut self.skills, ceiling);
        clamp(&mut self.certifications, ceiling);
        clamp(&mut self.languages, ceiling);
        clamp(&mut self.work_history, ceiling);
        clamp(&mut self.education, ceiling);
        clamp(&mut self.projects, ceiling);
    }

    /// Text assembled from titles, descriptions, and skills for industry
    /// inference.
    pub fn inference_text(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        if let Some(role) = &self.current_role {
            parts.push(role.value.clone());
        }
        if let Some(company) = &self.company {
            parts.push(company.value.clone());
        }
        if let Some(history) = &self.work_history {
            for entry in &history.value {
                parts.push(entry.title.clone());
                parts.push(entry.description.clone());
            }
        }
        if let Some(skills) = &self.skills {
            parts.extend(skills.value.iter().cloned());
        }
        parts.join(" ")
    }
}

/// The merged profile: the same fields as `CandidateProfile` plus the
/// derived career level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedProfile {
    #[serde(flatten)]
    pub profile: CandidateProfile,
    pub career_level: FieldValue<CareerLevel>,
}

/// The structured form as submitted by the user: plain values, no
/// provenance. Conversion tags everything origin=form at confidence 1.0 and
/// drops blank strings so emptiness is represented uniformly as `None`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FormProfile {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub current_role: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub years_experience: Option<f64>,
    #[serde(default)]
    pub highest_degree: Option<String>,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub certifications: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub work_history: Vec<WorkEntry>,
    #[serde(default)]
    pub education: Vec<EducationEntry>,
    #[serde(default)]
    pub projects: Vec<ProjectEntry>,
}

impl FormProfile {
    pub fn into_profile(self) -> CandidateProfile {
        CandidateProfile {
            name: form_string(self.name),
            email: form_string(self.email),
            phone: form_string(self.phone),
            location: form_string(self.location),
            current_role: form_string(self.current_role),
            company: form_string(self.company),
            years_experience: self.years_experience.map(FieldValue::form),
            highest_degree: form_string(self.highest_degree),
            skills: form_set(self.skills),
            certifications: form_set(self.certifications),
            languages: form_set(self.languages),
            work_history: form_list(self.work_history),
            education: form_list(self.education),
            projects: form_list(self.projects),
        }
    }
}

fn form_string(value: Option<String>) -> Option<FieldValue<String>> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .map(FieldValue::form)
}

fn form_set(values: Vec<String>) -> Option<FieldValue<BTreeSet<String>>> {
    let set = normalize_string_set(&values);
    if set.is_empty() {
        None
    } else {
        Some(FieldValue::form(set))
    }
}

fn form_list<T>(values: Vec<T>) -> Option<FieldValue<Vec<T>>> {
    if values.is_empty() {
        None
    } else {
        Some(FieldValue::form(values))
    }
}

/// Normalizes a list of free-form skill strings into the canonical set form.
pub fn normalize_string_set(values: &[String]) -> BTreeSet<String> {
    values
        .iter()
        .map(|s| normalize_skill(s))
        .filter(|s| !s.is_empty())
        .collect()
}

/// Longest single-position duration in years, derived from the work history
/// date strings. Open-ended positions run to the current year.
pub fn estimate_years_experience(history: &[WorkEntry]) -> Option<f64> {
    let current_year = chrono::Utc::now().year();
    let mut longest: Option<f64> = None;
    for entry in history {
        let start = extract_year(&entry.start_date);
        let end = if entry.end_date.trim().eq_ignore_ascii_case("present")
            || entry.end_date.trim().is_empty()
        {
            Some(current_year)
        } else {
            extract_year(&entry.end_date)
        };
        if let (Some(start), Some(end)) = (start, end) {
            if end >= start {
                let years = (end - start) as f64;
                longest = Some(longest.map_or(years, |l: f64| l.max(years)));
            }
        }
    }
    longest
}

fn extract_year(date: &str) -> Option<i32> {
    let digits: Vec<&str> = date
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| s.len() == 4)
        .collect();
    digits
        .into_iter()
        .filter_map(|s| s.parse::<i32>().ok())
        .find(|y| (1900..=2100).contains(y))
}

fn parse_month_year(date: &str) -> Option<(i32, u32)> {
    let year = extract_year(date)?;
    let month = date
        .split(|c: char| !c.is_ascii_digit())
        .filter(|s| !s.is_empty() && s.len() <= 2)
        .filter_map(|s| s.parse::<u32>().ok())
        .find(|m| (1..=12).contains(m))
        .unwrap_or(1);
    Some((year, month))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_conversion_skips_blank_values() {
        let form = FormProfile {
            email: Some("  ".to_string()),
            name: Some("Ada Lovelace".to_string()),
            ..Default::default()
        };
        let profile = form.into_profile();
        assert!(profile.email.is_none());
        let name = profile.name.unwrap();
        assert_eq!(name.value, "Ada Lovelace");
        assert_eq!(name.origin, Origin::Form);
        assert!((name.confidence - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_form_skills_are_normalized_and_deduplicated() {
        let form = FormProfile {
            skills: vec!["Python".into(), "python ".into(), "  SQL".into()],
            ..Default::default()
        };
        let profile = form.into_profile();
        let skills = profile.skills.unwrap().value;
        assert_eq!(skills.len(), 2);
        assert!(skills.contains("python"));
        assert!(skills.contains("sql"));
    }

    #[test]
    fn test_clamp_confidence_applies_ceiling() {
        let mut profile = CandidateProfile {
            email: Some(FieldValue::extracted("a@b.com".to_string(), 0.9)),
            skills: Some(FieldValue::extracted(BTreeSet::from(["rust".to_string()]), 0.8)),
            ..Default::default()
        };
        profile.clamp_confidence(0.4);
        assert!((profile.email.unwrap().confidence - 0.4).abs() < f64::EPSILON);
        assert!((profile.skills.unwrap().confidence - 0.4).abs() < f64::EPSILON);
    }

    #[test]
    fn test_estimate_years_experience_takes_longest_position() {
        let history = vec![
            WorkEntry {
                start_date: "06/2015".into(),
                end_date: "06/2019".into(),
                ..Default::default()
            },
            WorkEntry {
                start_date: "01/2020".into(),
                end_date: "01/2022".into(),
                ..Default::default()
            },
        ];
        assert_eq!(estimate_years_experience(&history), Some(4.0));
    }

    #[test]
    fn test_estimate_years_experience_present_runs_to_now() {
        let history = vec![WorkEntry {
            start_date: "2018".into(),
            end_date: "Present".into(),
            ..Default::default()
        }];
        let years = estimate_years_experience(&history).unwrap();
        assert!(years >= 7.0, "years was {years}");
    }

    #[test]
    fn test_recency_key_pins_present_first() {
        let current = WorkEntry {
            end_date: "Present".into(),
            ..Default::default()
        };
        let past = WorkEntry {
            end_date: "12/2021".into(),
            ..Default::default()
        };
        assert!(current.recency_key() > past.recency_key());
        assert_eq!(past.recency_key(), (2021, 12));
    }

    #[test]
    fn test_work_entry_dedup_key_ignores_case() {
        let a = WorkEntry {
            company: "Acme Corp".into(),
            start_date: "01/2020".into(),
            end_date: "Present".into(),
            ..Default::default()
        };
        let b = WorkEntry {
            company: "ACME CORP".into(),
            start_date: "01/2020".into(),
            end_date: "Present".into(),
            title: "different title".into(),
            ..Default::default()
        };
        assert_eq!(a.dedup_key(), b.dedup_key());
    }
}
