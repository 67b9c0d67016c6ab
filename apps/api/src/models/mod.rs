//! Domain entities of the profile graph.
//!
//! Row structs double as API payloads. Collections owned by an aggregate are
//! `#[sqlx(skip)]` and filled by the repository's eager loaders.

pub mod experience;
pub mod job_match;
pub mod letter;
pub mod profile;
pub mod skill;
pub mod user;

pub use experience::{CredibilityHighlight, Sentiment, WorkExperience};
pub use job_match::{JobMatch, MatchBand};
pub use letter::{LetterStatus, ReferenceLetter, TransitionError};
pub use profile::Profile;
pub use skill::{normalize_skill_names, Skill};
pub use user::User;

use thiserror::Error;

/// A stored enumeration column held a value outside its domain.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} value '{value}'")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}
