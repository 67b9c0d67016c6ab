use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{require_non_empty, ValidationError};

/// Historical, immutable record of tailoring a profile against one job description.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct JobMatch {
    pub id: Uuid,
    pub base_profile_id: Uuid,
    pub job_description: String,
    pub match_score: f64,
    pub tailored_summary: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchBand {
    High,
    Medium,
    Low,
}

impl JobMatch {
    pub fn new(
        base_profile_id: Uuid,
        job_description: impl Into<String>,
        match_score: f64,
        tailored_summary: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::nil(),
            base_profile_id,
            job_description: job_description.into(),
            match_score,
            tailored_summary: tailored_summary.into(),
            created_at: Utc::now(),
        }
    }

    pub fn band(&self) -> MatchBand {
        if self.match_score >= 0.7 {
            MatchBand::High
        } else if self.match_score >= 0.4 {
            MatchBand::Medium
        } else {
            MatchBand::Low
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.job_description, "job_description")?;
        if !(0.0..=1.0).contains(&self.match_score) {
            return Err(ValidationError::new(
                "match_score",
                format!("match_score must be within [0, 1], got {}", self.match_score),
            ));
        }
        Ok(())
    }
}
