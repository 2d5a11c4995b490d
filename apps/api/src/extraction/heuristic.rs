//! Rule-based fallback extraction. No external calls: everything here is
//! derived from the normalized text with regexes and the taxonomy keyword
//! tables, so it stays available when the structuring capability is not.

use std::collections::BTreeSet;
use std::sync::Arc;

use regex::Regex;

use crate::extraction::normalize::NormalizedText;
use crate::extraction::ExtractionError;
use crate::fusion::{CandidateProfile, EducationEntry, FieldValue};
use crate::taxonomy::{contains_keyword, Taxonomy};

// Internal confidence per extraction rule. The state machine clamps all of
// these to the degraded-mode ceiling before the profile leaves extraction.
const CONF_EMAIL: f64 = 0.9;
const CONF_PHONE: f64 = 0.7;
const CONF_SKILLS: f64 = 0.7;
const CONF_CERTS: f64 = 0.6;
const CONF_LANGUAGES: f64 = 0.6;
const CONF_NAME: f64 = 0.5;
const CONF_YEARS: f64 = 0.5;
const CONF_EDUCATION: f64 = 0.5;

pub struct HeuristicExtractor {
    taxonomy: Arc<Taxonomy>,
    email_re: Regex,
    phone_re: Regex,
    years_re: Regex,
    degree_re: Regex,
    institution_re: Regex,
    year_re: Regex,
    cert_res: Vec<Regex>,
}

impl HeuristicExtractor {
    pub fn new(taxonomy: Arc<Taxonomy>) -> Self {
        let cert_patterns = [
            r"(?i)\b(?:AWS|Amazon)\s+Certified[\w (){}\-]*",
            r"(?i)\b(?:Microsoft|Azure)\s+Certified[\w (){}\-]*",
            r"(?i)\b(?:Google|GCP)\s+Certified[\w (){}\-]*",
            r"(?i)\bPMP\b",
            r"(?i)\b(?:CISSP|CISA|CEH|CISM)\b",
            r"(?i)\bScrum\s+Master\b",
            r"(?i)\bSix\s+Sigma\b",
        ];
        Self {
            taxonomy,
            email_re: Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}")
                .expect("valid email regex"),
            phone_re: Regex::new(r"\+?\d{1,2}?[-.\s]?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}")
                .expect("valid phone regex"),
            years_re: Regex::new(r"(?i)\b(\d{1,2})\s*\+?\s*years?\b").expect("valid years regex"),
            degree_re: Regex::new(
                r"(?i)\b(Bachelor(?:'s)?(?:\s+of\s+[A-Za-z][A-Za-z ]*)?|Master(?:'s)?(?:\s+of\s+[A-Za-z][A-Za-z ]*)?|Ph\.?D\.?|Doctorate|B\.?Tech|M\.?Tech|B\.?Sc|M\.?Sc|BCA|MCA|MBA)\b",
            )
            .expect("valid degree regex"),
            institution_re: Regex::new(
                r"(?:[A-Z][\w'&.-]*\s+){0,4}(?:University|College|Institute|School)(?:\s+of(?:\s+[A-Z][\w'&.-]*){1,3})?",
            )
            .expect("valid institution regex"),
            year_re: Regex::new(r"\b(?:19|20)\d{2}\b").expect("valid year regex"),
            cert_res: cert_patterns
                .iter()
                .map(|p| Regex::new(p).expect("valid certification regex"))
                .collect(),
        }
    }

    /// Derives a candidate profile from normalized text alone. Fails only
    /// when the text carries nothing recognizable as language.
    pub fn extract(&self, text: &NormalizedText) -> Result<CandidateProfile, ExtractionError> {
        let raw = text.as_str();
        if !raw.chars().any(|c| c.is_alphanumeric()) {
            return Err(ExtractionError::HeuristicFailure(
                "text contains no extractable content".to_string(),
            ));
        }

        let mut profile = CandidateProfile::default();

        if let Some(m) = self.email_re.find(raw) {
            profile.email = Some(FieldValue::extracted(m.as_str().to_string(), CONF_EMAIL));
        }
        if let Some(m) = self.phone_re.find(raw) {
            profile.phone = Some(FieldValue::extracted(m.as_str().trim().to_string(), CONF_PHONE));
        }
        if let Some(name) = self.extract_name(raw) {
            profile.name = Some(FieldValue::extracted(name, CONF_NAME));
        }

        let skills = self.extract_skills(raw);
        if !skills.is_empty() {
            profile.skills = Some(FieldValue::extracted(skills, CONF_SKILLS));
        }

        let certs = self.extract_certifications(raw);
        if !certs.is_empty() {
            profile.certifications = Some(FieldValue::extracted(certs, CONF_CERTS));
        }

        let languages = self.extract_languages(raw);
        if !languages.is_empty() {
            profile.languages = Some(FieldValue::extracted(languages, CONF_LANGUAGES));
        }

        if let Some(years) = self.extract_years(raw) {
            profile.years_experience = Some(FieldValue::extracted(years, CONF_YEARS));
        }

        if let Some(entry) = self.extract_education(raw) {
            if !entry.degree.is_empty() {
                profile.highest_degree =
                    Some(FieldValue::extracted(entry.degree.clone(), CONF_EDUCATION));
            }
            profile.education = Some(FieldValue::extracted(vec![entry], CONF_EDUCATION));
        }

        Ok(profile)
    }

    /// First plausible person name within the top lines: two to four purely
    /// alphabetic words and no email-looking content.
    fn extract_name(&self, text: &str) -> Option<String> {
        for line in text.lines().take(5) {
            let line = line.trim();
            if line.len() < 3 || line.len() > 50 || line.contains('@') {
                continue;
            }
            let words: Vec<&str> = line.split_whitespace().collect();
            if (2..=4).contains(&words.len())
                && words
                    .iter()
                    .all(|w| w.chars().all(|c| c.is_alphabetic() || c == '.'))
            {
                return Some(line.to_string());
            }
        }
        None
    }

    fn extract_skills(&self, text: &str) -> BTreeSet<String> {
        self.taxonomy
            .all_skill_aliases()
            .filter(|alias| contains_keyword(text, alias))
            .map(|alias| alias.to_string())
            .collect()
    }

    fn extract_certifications(&self, text: &str) -> BTreeSet<String> {
        self.cert_res
            .iter()
            .flat_map(|re| re.find_iter(text))
            .map(|m| m.as_str().trim().to_lowercase())
            .collect()
    }

    fn extract_languages(&self, text: &str) -> BTreeSet<String> {
        self.taxonomy
            .languages
            .iter()
            .filter(|lang| contains_keyword(text, lang))
            .map(|lang| lang.to_lowercase())
            .collect()
    }

    /// Largest "N years" mention, taken as total professional experience.
    fn extract_years(&self, text: &str) -> Option<f64> {
        self.years_re
            .captures_iter(text)
            .filter_map(|c| c.get(1))
            .filter_map(|m| m.as_str().parse::<u32>().ok())
            .filter(|y| *y <= 60)
            .max()
            .map(f64::from)
    }

    /// One education entry assembled from the education section when the
    /// document has one, otherwise from the whole text.
    fn extract_education(&self, text: &str) -> Option<EducationEntry> {
        let section = education_section(text).unwrap_or_else(|| text.to_string());

        let degree = self
            .degree_re
            .find(&section)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let institution = self
            .institution_re
            .find(&section)
            .map(|m| m.as_str().trim().to_string())
            .unwrap_or_default();
        let graduation_date = self
            .year_re
            .find(&section)
            .map(|m| m.as_str().to_string())
            .unwrap_or_default();

        if degree.is_empty() && institution.is_empty() {
            return None;
        }
        Some(EducationEntry {
            degree,
            institution,
            graduation_date,
            ..Default::default()
        })
    }
}

const SECTION_BREAKS: &[&str] = &["SKILLS", "EXPERIENCE", "PROJECTS", "CERTIFICATIONS"];

fn education_section(text: &str) -> Option<String> {
    let mut collected: Vec<&str> = Vec::new();
    let mut in_section = false;
    for line in text.lines() {
        let upper = line.trim().to_uppercase();
        if upper.contains("EDUCATION") {
            in_section = true;
            continue;
        }
        if in_section {
            if SECTION_BREAKS.iter().any(|s| upper.starts_with(s)) {
                break;
            }
            collected.push(line);
        }
    }
    if collected.is_empty() {
        None
    } else {
        Some(collected.join(" "))
    }
}
