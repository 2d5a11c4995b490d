//! Skill/industry taxonomy and tunable scoring knobs.
//!
//! Loaded once at startup and shared read-only behind an `Arc`; nothing in
//! the pipeline mutates it afterwards. Every field has a built-in default so
//! an override file may specify only the tables it cares about.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Weights for the recommendation scoring factors. Must sum to 1.0.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ScoringWeights {
    pub skills: f64,
    pub experience: f64,
    pub industry: f64,
    pub location: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            skills: 0.5,
            experience: 0.2,
            industry: 0.2,
            location: 0.1,
        }
    }
}

impl ScoringWeights {
    pub fn sum(&self) -> f64 {
        self.skills + self.experience + self.industry + self.location
    }
}

/// Confidence and cutoff thresholds used across extraction and scoring.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Thresholds {
    /// Minimum structuring confidence for accepting the adapter's profile.
    pub acceptance: f64,
    /// Ceiling applied to every field confidence after heuristic fallback.
    pub heuristic_ceiling: f64,
    /// Minimum weighted contribution for a factor to earn an explanation line.
    pub explanation_min: f64,
    /// Bonus per adjacent-category skill, and the cap on the total bonus.
    pub adjacent_bonus_step: f64,
    pub adjacent_bonus_cap: f64,
    /// Industry factor value when categories only share a parent grouping.
    pub industry_partial: f64,
    /// Results scoring below this are dropped from ranked output.
    pub min_relevance: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            acceptance: 0.6,
            heuristic_ceiling: 0.4,
            explanation_min: 0.05,
            adjacent_bonus_step: 0.05,
            adjacent_bonus_cap: 0.15,
            industry_partial: 0.5,
            min_relevance: 0.1,
        }
    }
}

/// Immutable lookup tables: skill categories, seniority and industry
/// keywords, plus the scoring knobs above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Taxonomy {
    /// Category name -> lowercase skill aliases belonging to it.
    #[serde(default = "default_skill_categories")]
    pub skill_categories: BTreeMap<String, BTreeSet<String>>,
    /// Career level name ("junior".."executive") -> title keywords.
    #[serde(default = "default_seniority_indicators")]
    pub seniority_indicators: BTreeMap<String, Vec<String>>,
    /// Industry name -> keywords that signal it in free text.
    #[serde(default = "default_industry_keywords")]
    pub industry_keywords: BTreeMap<String, Vec<String>>,
    /// Parent grouping -> industries under it (for partial alignment).
    #[serde(default = "default_industry_groups")]
    pub industry_groups: BTreeMap<String, Vec<String>>,
    /// Spoken languages recognised by the heuristic extractor.
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default)]
    pub weights: ScoringWeights,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Default for Taxonomy {
    fn default() -> Self {
        Self {
            skill_categories: default_skill_categories(),
            seniority_indicators: default_seniority_indicators(),
            industry_keywords: default_industry_keywords(),
            industry_groups: default_industry_groups(),
            languages: default_languages(),
            weights: ScoringWeights::default(),
            thresholds: Thresholds::default(),
        }
    }
}

impl Taxonomy {
    /// Loads the taxonomy from a JSON file, falling back to defaults for any
    /// omitted section.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read taxonomy file {}", path.display()))?;
        let taxonomy: Taxonomy = serde_json::from_str(&raw)
            .with_context(|| format!("taxonomy file {} is not valid JSON", path.display()))?;
        Ok(taxonomy)
    }

    /// Category a normalized skill belongs to, if any.
    pub fn categorize(&self, skill: &str) -> Option<&str> {
        let skill = normalize_skill(skill);
        self.skill_categories
            .iter()
            .find(|(_, aliases)| aliases.contains(&skill))
            .map(|(name, _)| name.as_str())
    }

    /// All known skill aliases, lowercase.
    pub fn all_skill_aliases(&self) -> impl Iterator<Item = &str> {
        self.skill_categories
            .values()
            .flat_map(|aliases| aliases.iter().map(String::as_str))
    }

    /// Best-effort industry inference from free text (titles, descriptions,
    /// skill names). Picks the industry with the most keyword hits.
    pub fn infer_industry(&self, text: &str) -> Option<String> {
        let padded = pad_words(text);
        let mut best: Option<(&str, usize)> = None;
        for (industry, keywords) in &self.industry_keywords {
            let hits = keywords
                .iter()
                .filter(|kw| padded.contains(&pad_words(kw)))
                .count();
            if hits > 0 && best.map_or(true, |(_, b)| hits > b) {
                best = Some((industry, hits));
            }
        }
        best.map(|(name, _)| name.to_string())
    }

    /// Whether two industries sit under the same parent grouping.
    pub fn industries_related(&self, a: &str, b: &str) -> bool {
        let (a, b) = (a.to_lowercase(), b.to_lowercase());
        self.industry_groups.values().any(|members| {
            members.iter().any(|m| m.eq_ignore_ascii_case(&a))
                && members.iter().any(|m| m.eq_ignore_ascii_case(&b))
        })
    }
}

/// Canonical form used for every skill comparison: lowercase, trimmed,
/// inner whitespace collapsed.
pub fn normalize_skill(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Whole-word keyword test: "ai" must not fire inside "fastapi", and "vp"
/// must not fire inside "mvp".
pub fn contains_keyword(text: &str, keyword: &str) -> bool {
    pad_words(text).contains(&pad_words(keyword))
}

/// Lowercases, maps separators to single spaces, and pads both ends so
/// multi-word phrases can be matched with plain `contains`.
fn pad_words(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push(' ');
    let mut last_space = true;
    for c in s.chars() {
        if c.is_alphanumeric() || c == '+' || c == '#' || c == '.' {
            for lc in c.to_lowercase() {
                out.push(lc);
            }
            last_space = false;
        } else if !last_space {
            out.push(' ');
            last_space = true;
        }
    }
    if !last_space {
        out.push(' ');
    }
    out
}

fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn vec(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn default_skill_categories() -> BTreeMap<String, BTreeSet<String>> {
    BTreeMap::from([
        (
            "programming".to_string(),
            set(&[
                "python", "java", "javascript", "typescript", "c++", "c#", "go", "rust",
                "ruby", "php", "swift", "kotlin", "scala", "r", "matlab",
            ]),
        ),
        (
            "web_development".to_string(),
            set(&[
                "html", "css", "react", "angular", "vue", "svelte", "node.js", "express",
                "django", "flask", "fastapi", "spring", "rails", "laravel", "next.js",
            ]),
        ),
        (
            "databases".to_string(),
            set(&[
                "sql", "mysql", "postgresql", "mongodb", "redis", "sqlite", "oracle",
                "elasticsearch", "dynamodb", "cassandra",
            ]),
        ),
        (
            "cloud_devops".to_string(),
            set(&[
                "aws", "azure", "gcp", "docker", "kubernetes", "terraform", "ansible",
                "jenkins", "ci/cd", "linux", "bash", "helm",
            ]),
        ),
        (
            "data_science".to_string(),
            set(&[
                "machine learning", "deep learning", "pandas", "numpy", "tensorflow",
                "pytorch", "scikit-learn", "statistics", "data visualization", "nlp",
                "computer vision", "spark", "hadoop", "kafka",
            ]),
        ),
        (
            "mobile".to_string(),
            set(&[
                "android", "ios", "flutter", "react native", "xamarin", "swiftui",
            ]),
        ),
        (
            "security".to_string(),
            set(&[
                "network security", "penetration testing", "ethical hacking", "cissp",
                "incident response", "cryptography",
            ]),
        ),
        (
            "collaboration".to_string(),
            set(&["git", "agile", "scrum", "kanban", "jira", "rest", "graphql"]),
        ),
    ])
}

fn default_seniority_indicators() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "junior".to_string(),
            vec(&["junior", "entry level", "graduate", "intern", "trainee", "associate"]),
        ),
        (
            "mid".to_string(),
            vec(&["mid level", "intermediate", "experienced", "engineer ii"]),
        ),
        (
            "senior".to_string(),
            vec(&["senior", "lead", "principal", "staff", "expert", "specialist"]),
        ),
        (
            "executive".to_string(),
            vec(&["director", "vp", "cto", "ceo", "head of", "chief", "executive"]),
        ),
    ])
}

fn default_industry_keywords() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "software".to_string(),
            vec(&["software", "saas", "developer", "engineering", "programming", "platform"]),
        ),
        (
            "data".to_string(),
            vec(&["data science", "analytics", "machine learning", "big data", "ai"]),
        ),
        (
            "fintech".to_string(),
            vec(&["banking", "finance", "payment", "trading", "fintech"]),
        ),
        (
            "healthcare".to_string(),
            vec(&["medical", "hospital", "pharmaceutical", "healthcare", "clinical"]),
        ),
        (
            "ecommerce".to_string(),
            vec(&["retail", "marketplace", "shopping", "ecommerce", "e-commerce"]),
        ),
        (
            "education".to_string(),
            vec(&["education", "learning", "university", "edtech", "teaching"]),
        ),
    ])
}

fn default_industry_groups() -> BTreeMap<String, Vec<String>> {
    BTreeMap::from([
        (
            "technology".to_string(),
            vec(&["software", "data", "fintech", "ecommerce"]),
        ),
        (
            "services".to_string(),
            vec(&["healthcare", "education", "ecommerce"]),
        ),
    ])
}

fn default_languages() -> Vec<String> {
    vec(&[
        "English", "Spanish", "French", "German", "Chinese", "Mandarin", "Japanese",
        "Korean", "Hindi", "Arabic", "Portuguese", "Russian", "Italian", "Dutch",
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_weights_sum_to_one() {
        let w = ScoringWeights::default();
        assert!((w.sum() - 1.0).abs() < 1e-9, "sum was {}", w.sum());
    }

    #[test]
    fn test_categorize_known_alias() {
        let t = Taxonomy::default();
        assert_eq!(t.categorize("Python"), Some("programming"));
        assert_eq!(t.categorize("  FastAPI "), Some("web_development"));
        assert_eq!(t.categorize("underwater basket weaving"), None);
    }

    #[test]
    fn test_normalize_skill_collapses_case_and_whitespace() {
        assert_eq!(normalize_skill("  Machine   Learning "), "machine learning");
        assert_eq!(normalize_skill("SQL"), "sql");
    }

    #[test]
    fn test_contains_keyword_respects_word_boundaries() {
        assert!(contains_keyword("Senior VP of Engineering", "vp"));
        assert!(!contains_keyword("shipped the MVP quickly", "vp"));
        assert!(!contains_keyword("built with FastAPI", "ai"));
        assert!(contains_keyword("Head of Data", "head of"));
    }

    #[test]
    fn test_infer_industry_ignores_substring_hits() {
        let t = Taxonomy::default();
        // "fastapi" must not count as an "ai" hit
        assert_eq!(
            t.infer_industry("Software Engineer python fastapi sql"),
            Some("software".to_string())
        );
    }

    #[test]
    fn test_infer_industry_picks_most_hits() {
        let t = Taxonomy::default();
        let text = "built payment and trading systems for a banking client";
        assert_eq!(t.infer_industry(text), Some("fintech".to_string()));
        assert_eq!(t.infer_industry("nothing relevant here"), None);
    }

    #[test]
    fn test_industries_related_via_parent_group() {
        let t = Taxonomy::default();
        assert!(t.industries_related("software", "fintech"));
        assert!(t.industries_related("Software", "Data"));
        assert!(!t.industries_related("healthcare", "fintech"));
    }

    #[test]
    fn test_from_file_partial_override_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"weights": {{"skills": 0.6, "experience": 0.2, "industry": 0.1, "location": 0.1}}}}"#
        )
        .unwrap();

        let t = Taxonomy::from_file(file.path()).unwrap();
        assert!((t.weights.skills - 0.6).abs() < 1e-9);
        // untouched sections fall back to the built-in tables
        assert_eq!(t.categorize("python"), Some("programming"));
        assert!((t.thresholds.acceptance - 0.6).abs() < 1e-9);
    }

    #[test]
    fn test_from_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(Taxonomy::from_file(file.path()).is_err());
    }
}
