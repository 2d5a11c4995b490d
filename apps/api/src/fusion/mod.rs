// Profile fusion: provenance-tagged fields, the candidate profile shape
// shared by the form and extraction sides, and the deterministic merge.

pub mod merge;
pub mod profile;

pub use merge::merge;
pub use profile::{
    CandidateProfile, EducationEntry, FieldValue, FormProfile, FusedProfile, Origin,
    ProjectEntry, WorkEntry,
};
