//! Transactional access to the profile graph.
//!
//! Every read and write goes through a [`UnitOfWork`] obtained from
//! [`Repository::begin`]. A unit of work that is dropped without `commit`
//! rolls back, so an early return or a cancelled future never leaves a
//! half-written graph behind.

#[cfg(test)]
pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    CredibilityHighlight, JobMatch, Profile, ReferenceLetter, Skill, User, WorkExperience,
};
use crate::validation::ValidationError;

pub use postgres::PgRepository;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("foreign key violated: {0}")]
    ForeignKeyViolation(String),

    #[error("constraint violated: {0}")]
    Constraint(String),

    #[error("invalid record: {0}")]
    Invalid(#[from] ValidationError),

    #[error("database error: {0}")]
    Database(sqlx::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db) = &err {
            let message = db.message().to_string();
            if db.is_unique_violation() {
                return RepoError::UniqueViolation(message);
            }
            if db.is_foreign_key_violation() {
                return RepoError::ForeignKeyViolation(message);
            }
            if db.is_check_violation() {
                return RepoError::Constraint(message);
            }
        }
        RepoError::Database(err)
    }
}

/// Hands out units of work. Implementations own their connection handle.
#[async_trait]
pub trait Repository: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError>;
}

/// One transaction spanning every store.
#[async_trait]
pub trait UnitOfWork:
    UserStore
    + ProfileStore
    + ReferenceLetterStore
    + WorkExperienceStore
    + CredibilityHighlightStore
    + SkillStore
    + JobMatchStore
    + Send
{
    async fn commit(self: Box<Self>) -> Result<(), RepoError>;
    async fn rollback(self: Box<Self>) -> Result<(), RepoError>;
}

#[async_trait]
pub trait UserStore {
    async fn create_user(&mut self, user: &User) -> Result<User, RepoError>;
    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, RepoError>;
}

/// Profile reads materialize the whole graph: experiences with their
/// highlights, linked skills, and job matches.
#[async_trait]
pub trait ProfileStore {
    async fn profile_by_user(&mut self, user_id: Uuid) -> Result<Option<Profile>, RepoError>;
    async fn profile_by_id(&mut self, id: Uuid) -> Result<Option<Profile>, RepoError>;
    /// Assigns an id when `profile.id` is nil.
    async fn create_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError>;
    /// Returns the user's profile, creating it if absent. Safe under concurrent
    /// callers for the same user. Collections are not loaded.
    async fn ensure_profile(&mut self, user_id: Uuid) -> Result<Profile, RepoError>;
    async fn update_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError>;
    async fn delete_profile(&mut self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait ReferenceLetterStore {
    async fn create_letter(&mut self, letter: &ReferenceLetter)
        -> Result<ReferenceLetter, RepoError>;
    async fn letter_by_id(&mut self, id: Uuid) -> Result<Option<ReferenceLetter>, RepoError>;
    /// Newest upload first.
    async fn letters_by_user(&mut self, user_id: Uuid) -> Result<Vec<ReferenceLetter>, RepoError>;
    async fn letter_by_content_sha(
        &mut self,
        user_id: Uuid,
        content_sha: &str,
    ) -> Result<Option<ReferenceLetter>, RepoError>;
    /// Rejects status changes that leave a terminal state.
    async fn update_letter(&mut self, letter: &ReferenceLetter)
        -> Result<ReferenceLetter, RepoError>;
    async fn delete_letter(&mut self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait WorkExperienceStore {
    async fn create_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError>;
    async fn work_experience_by_id(&mut self, id: Uuid)
        -> Result<Option<WorkExperience>, RepoError>;
    /// Newest start date first, highlights loaded.
    async fn work_experiences_by_profile(
        &mut self,
        profile_id: Uuid,
    ) -> Result<Vec<WorkExperience>, RepoError>;
    async fn update_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError>;
    async fn delete_work_experience(&mut self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait CredibilityHighlightStore {
    /// The work experience's profile and the source letter must share an owner.
    async fn create_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError>;
    async fn highlights_by_work_experience(
        &mut self,
        work_experience_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError>;
    async fn highlights_by_source_letter(
        &mut self,
        letter_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError>;
    async fn update_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError>;
    async fn delete_highlight(&mut self, id: Uuid) -> Result<(), RepoError>;
}

#[async_trait]
pub trait SkillStore {
    /// Returns the existing skill whose name matches case-insensitively, or inserts it.
    async fn upsert_skill(&mut self, name: &str) -> Result<Skill, RepoError>;
    /// Idempotent. A `None` proficiency keeps whatever the link already holds.
    async fn link_skill(
        &mut self,
        profile_id: Uuid,
        skill_id: Uuid,
        proficiency: Option<&str>,
    ) -> Result<(), RepoError>;
}

#[async_trait]
pub trait JobMatchStore {
    async fn create_job_match(&mut self, job_match: &JobMatch) -> Result<JobMatch, RepoError>;
    async fn job_match_by_id(&mut self, id: Uuid) -> Result<Option<JobMatch>, RepoError>;
    /// Newest first.
    async fn job_matches_by_profile(&mut self, profile_id: Uuid)
        -> Result<Vec<JobMatch>, RepoError>;
}

pub(crate) fn id_or_new(id: Uuid) -> Uuid {
    if id.is_nil() {
        Uuid::new_v4()
    } else {
        id
    }
}
