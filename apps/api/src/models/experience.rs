use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::UnknownVariant;
use crate::validation::{require_non_empty, ValidationError};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkExperience {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub company_name: String,
    pub role: String,
    pub start_date: NaiveDate,
    /// `None` for a current role.
    pub end_date: Option<NaiveDate>,
    pub description: String,
    pub reference_letter_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[sqlx(skip)]
    #[serde(default)]
    pub credibility_highlights: Vec<CredibilityHighlight>,
}

impl WorkExperience {
    pub fn new(
        profile_id: Uuid,
        company_name: impl Into<String>,
        role: impl Into<String>,
        start_date: NaiveDate,
        end_date: Option<NaiveDate>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            profile_id,
            company_name: company_name.into(),
            role: role.into(),
            start_date,
            end_date,
            description: String::new(),
            reference_letter_id: None,
            created_at: now,
            updated_at: now,
            credibility_highlights: Vec::new(),
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.company_name, "company_name")?;
        require_non_empty(&self.role, "role")?;
        if let Some(end) = self.end_date {
            if end <= self.start_date {
                return Err(ValidationError::new(
                    "end_date",
                    format!("end_date {end} must be after start_date {}", self.start_date),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Sentiment {
    Positive,
    Neutral,
}

impl Sentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Positive => "POSITIVE",
            Sentiment::Neutral => "NEUTRAL",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Sentiment {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "POSITIVE" => Ok(Sentiment::Positive),
            "NEUTRAL" => Ok(Sentiment::Neutral),
            _ => Err(UnknownVariant {
                kind: "sentiment",
                value,
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CredibilityHighlight {
    pub id: Uuid,
    pub work_experience_id: Uuid,
    pub quote: String,
    #[sqlx(try_from = "String")]
    pub sentiment: Sentiment,
    pub source_letter_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl CredibilityHighlight {
    pub fn new(
        work_experience_id: Uuid,
        quote: impl Into<String>,
        sentiment: Sentiment,
        source_letter_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::nil(),
            work_experience_id,
            quote: quote.into(),
            sentiment,
            source_letter_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.quote, "quote")
    }
}
