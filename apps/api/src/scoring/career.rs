//! Ordinal career level derived from experience and title keywords.

use serde::{Deserialize, Serialize};

use crate::taxonomy::{contains_keyword, Taxonomy};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CareerLevel {
    Junior,
    Mid,
    Senior,
    Executive,
}

impl CareerLevel {
    pub fn ordinal(self) -> u8 {
        match self {
            CareerLevel::Junior => 0,
            CareerLevel::Mid => 1,
            CareerLevel::Senior => 2,
            CareerLevel::Executive => 3,
        }
    }

    /// Parses a catalog entity's declared level tag. Accepts the course
    /// difficulty vocabulary as aliases.
    pub fn from_tag(tag: &str) -> Option<CareerLevel> {
        match tag.trim().to_lowercase().as_str() {
            "junior" | "entry" | "entry level" | "beginner" => Some(CareerLevel::Junior),
            "mid" | "mid level" | "intermediate" => Some(CareerLevel::Mid),
            "senior" | "advanced" => Some(CareerLevel::Senior),
            "executive" | "expert" | "principal" => Some(CareerLevel::Executive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CareerLevel::Junior => "junior",
            CareerLevel::Mid => "mid",
            CareerLevel::Senior => "senior",
            CareerLevel::Executive => "executive",
        }
    }
}

impl std::fmt::Display for CareerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derives the career level from years of experience and role titles.
/// Title keywords and the experience bands each vote; the higher ordinal
/// wins, so a "Senior Engineer" with two recorded years still ranks senior.
pub fn derive_career_level<'a>(
    years_experience: Option<f64>,
    titles: impl Iterator<Item = &'a str>,
    taxonomy: &Taxonomy,
) -> CareerLevel {
    let from_titles = titles
        .filter_map(|title| level_from_title(title, taxonomy))
        .max();

    let from_years = years_experience.map(level_from_years);

    match (from_titles, from_years) {
        (Some(a), Some(b)) => a.max(b),
        (Some(a), None) => a,
        (None, Some(b)) => b,
        (None, None) => CareerLevel::Junior,
    }
}

fn level_from_title(title: &str, taxonomy: &Taxonomy) -> Option<CareerLevel> {
    let mut best: Option<CareerLevel> = None;
    for (level_name, keywords) in &taxonomy.seniority_indicators {
        if keywords.iter().any(|kw| contains_keyword(title, kw)) {
            if let Some(level) = CareerLevel::from_tag(level_name) {
                best = Some(best.map_or(level, |b: CareerLevel| b.max(level)));
            }
        }
    }
    best
}

fn level_from_years(years: f64) -> CareerLevel {
    if years >= 10.0 {
        CareerLevel::Executive
    } else if years >= 5.0 {
        CareerLevel::Senior
    } else if years >= 2.0 {
        CareerLevel::Mid
    } else {
        CareerLevel::Junior
    }
}
