use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::validation::{require_non_empty, ValidationError};

/// Skills are shared across profiles; `proficiency` belongs to the link and is
/// only populated when the skill is loaded through a profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Skill {
    pub id: Uuid,
    pub name: String,
    #[sqlx(default)]
    pub proficiency: Option<String>,
}

impl Skill {
    pub fn validate(&self) -> Result<(), ValidationError> {
        require_non_empty(&self.name, "skill.name")
    }
}

/// Trims names, drops empties, and keeps the first spelling of each
/// case-insensitive duplicate.
///
/// The result is ordered by lowercase name. Concurrent ingestions upsert
/// skills in this order, so they take the unique-index locks in the same
/// order and cannot deadlock each other.
pub fn normalize_skill_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut names: Vec<String> = names
        .into_iter()
        .filter_map(|name| {
            let trimmed = name.as_ref().trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                return None;
            }
            Some(trimmed.to_string())
        })
        .collect();
    names.sort_by_cached_key(|name| name.to_lowercase());
    names
}
