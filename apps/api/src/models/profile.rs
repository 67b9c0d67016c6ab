use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{JobMatch, Skill, WorkExperience};
use crate::validation::{validate_summary, ValidationError};

/// The aggregate professional record for one user.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Newest role first.
    #[sqlx(skip)]
    #[serde(default)]
    pub work_experiences: Vec<WorkExperience>,
    #[sqlx(skip)]
    #[serde(default)]
    pub skills: Vec<Skill>,
    /// Newest match first.
    #[sqlx(skip)]
    #[serde(default)]
    pub job_matches: Vec<JobMatch>,
}

impl Profile {
    pub fn new(user_id: Uuid) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            user_id,
            summary: None,
            created_at: now,
            updated_at: now,
            work_experiences: Vec::new(),
            skills: Vec::new(),
            job_matches: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        match &self.summary {
            Some(summary) => validate_summary(summary),
            None => Ok(()),
        }
    }
}
