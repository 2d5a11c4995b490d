//! Read-only catalog entities and the provider boundary that supplies them.

use std::path::Path;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// An open position to score candidate profiles against.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobPosting {
    pub id: Uuid,
    pub title: String,
    #[serde(default)]
    pub company: String,
    pub required_skills: Vec<String>,
    /// Declared seniority tag ("junior" | "mid" | "senior" | "executive").
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub industry: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub remote: bool,
}

/// A course whose curriculum can close skill gaps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub provider: String,
    pub skills_taught: Vec<String>,
    /// Difficulty tag ("beginner" | "intermediate" | "advanced" | "expert").
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub category: String,
}

/// Supplies the catalog slice to score against. The pipeline reads it per
/// scoring call and never caches beyond that call.
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn jobs(&self) -> Result<Vec<JobPosting>>;
    async fn courses(&self) -> Result<Vec<Course>>;
}

#[derive(Debug, Default, Deserialize)]
struct CatalogFile {
    #[serde(default)]
    jobs: Vec<JobPosting>,
    #[serde(default)]
    courses: Vec<Course>,
}

/// JSON-file-backed catalog, loaded once at startup. Stands in for whatever
/// listing store the deployment wires up behind the trait.
pub struct FileCatalog {
    jobs: Vec<JobPosting>,
    courses: Vec<Course>,
}

impl FileCatalog {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read catalog file {}", path.display()))?;
        let parsed: CatalogFile = serde_json::from_str(&raw)
            .with_context(|| format!("catalog file {} is not valid JSON", path.display()))?;
        info!(
            "Catalog loaded: {} jobs, {} courses",
            parsed.jobs.len(),
            parsed.courses.len()
        );
        Ok(Self {
            jobs: parsed.jobs,
            courses: parsed.courses,
        })
    }

    pub fn empty() -> Self {
        Self {
            jobs: Vec::new(),
            courses: Vec::new(),
        }
    }
}

#[async_trait]
impl CatalogProvider for FileCatalog {
    async fn jobs(&self) -> Result<Vec<JobPosting>> {
        Ok(self.jobs.clone())
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        Ok(self.courses.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_from_file_loads_jobs_and_courses() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "jobs": [{{
                    "id": "7f2c1e7a-9a68-4a3e-9d2f-0f6a6a4f1b01",
                    "title": "Backend Engineer",
                    "required_skills": ["python", "sql"],
                    "level": "mid",
                    "industry": "software"
                }}],
                "courses": [{{
                    "id": "7f2c1e7a-9a68-4a3e-9d2f-0f6a6a4f1b02",
                    "name": "Docker Fundamentals",
                    "skills_taught": ["docker"],
                    "level": "beginner",
                    "category": "cloud"
                }}]
            }}"#
        )
        .unwrap();

        let catalog = FileCatalog::from_file(file.path()).unwrap();
        assert_eq!(catalog.jobs().await.unwrap().len(), 1);
        assert_eq!(catalog.courses().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_sections_default_to_empty() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{}}").unwrap();
        let catalog = FileCatalog::from_file(file.path()).unwrap();
        assert!(catalog.jobs().await.unwrap().is_empty());
        assert!(catalog.courses().await.unwrap().is_empty());
    }
}
