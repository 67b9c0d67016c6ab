//! In-memory repository used by the pipeline and router tests.
//!
//! Transactions are serialized: `begin` holds the state lock until the unit
//! of work commits or is dropped, and writes land in a private copy that only
//! replaces the shared state on commit. Uniqueness, foreign keys and cascades
//! follow the Postgres schema.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{
    id_or_new, CredibilityHighlightStore, JobMatchStore, ProfileStore, ReferenceLetterStore,
    RepoError, Repository, SkillStore, UnitOfWork, UserStore, WorkExperienceStore,
};
use crate::models::{
    CredibilityHighlight, JobMatch, LetterStatus, Profile, ReferenceLetter, Skill, User,
    WorkExperience,
};

#[derive(Debug, Clone, Default)]
pub struct MemoryState {
    pub users: HashMap<Uuid, User>,
    /// Bare rows; collections are rebuilt on read.
    pub profiles: HashMap<Uuid, Profile>,
    pub letters: HashMap<Uuid, ReferenceLetter>,
    pub experiences: HashMap<Uuid, WorkExperience>,
    pub highlights: HashMap<Uuid, CredibilityHighlight>,
    pub skills: HashMap<Uuid, Skill>,
    pub profile_skills: HashMap<(Uuid, Uuid), Option<String>>,
    /// Insertion order.
    pub job_matches: Vec<JobMatch>,
}

impl MemoryState {
    fn profile_graph(&self, profile: &Profile) -> Profile {
        let mut profile = profile.clone();
        profile.work_experiences = self.experiences_of(profile.id);

        let mut skills: Vec<Skill> = self
            .profile_skills
            .iter()
            .filter(|((profile_id, _), _)| *profile_id == profile.id)
            .filter_map(|((_, skill_id), proficiency)| {
                self.skills.get(skill_id).map(|skill| Skill {
                    proficiency: proficiency.clone(),
                    ..skill.clone()
                })
            })
            .collect();
        skills.sort_by_key(|s| s.name.to_lowercase());
        profile.skills = skills;

        profile.job_matches = self.job_matches_of(profile.id);
        profile
    }

    fn experiences_of(&self, profile_id: Uuid) -> Vec<WorkExperience> {
        let mut experiences: Vec<WorkExperience> = self
            .experiences
            .values()
            .filter(|e| e.profile_id == profile_id)
            .map(|e| self.with_highlights(e))
            .collect();
        experiences.sort_by(|a, b| {
            b.start_date
                .cmp(&a.start_date)
                .then(b.created_at.cmp(&a.created_at))
        });
        experiences
    }

    fn with_highlights(&self, experience: &WorkExperience) -> WorkExperience {
        let mut experience = experience.clone();
        experience.credibility_highlights = self.highlights_where(|h| h.work_experience_id == experience.id);
        experience
    }

    fn highlights_where(
        &self,
        predicate: impl Fn(&CredibilityHighlight) -> bool,
    ) -> Vec<CredibilityHighlight> {
        let mut highlights: Vec<CredibilityHighlight> = self
            .highlights
            .values()
            .filter(|h| predicate(h))
            .cloned()
            .collect();
        highlights.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        highlights
    }

    fn job_matches_of(&self, profile_id: Uuid) -> Vec<JobMatch> {
        let mut matches: Vec<JobMatch> = self
            .job_matches
            .iter()
            .rev()
            .filter(|m| m.base_profile_id == profile_id)
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        matches
    }

    fn check_letter_sha_unique(&self, letter: &ReferenceLetter) -> Result<(), RepoError> {
        let Some(sha) = &letter.content_sha else {
            return Ok(());
        };
        let clash = self.letters.values().any(|other| {
            other.id != letter.id
                && other.user_id == letter.user_id
                && other.content_sha.as_deref() == Some(sha.as_str())
        });
        if clash {
            return Err(RepoError::UniqueViolation(format!(
                "reference_letters (user_id, content_sha) = ({}, {sha})",
                letter.user_id
            )));
        }
        Ok(())
    }

    fn check_letter_ref(&self, letter_id: Option<Uuid>) -> Result<(), RepoError> {
        match letter_id {
            Some(id) if !self.letters.contains_key(&id) => Err(RepoError::ForeignKeyViolation(
                format!("reference letter {id} does not exist"),
            )),
            _ => Ok(()),
        }
    }

    fn remove_experience(&mut self, id: Uuid) {
        self.experiences.remove(&id);
        self.highlights.retain(|_, h| h.work_experience_id != id);
    }
}

/// Shared across clones; every clone sees the same data.
#[derive(Clone, Default)]
pub struct MemoryRepository {
    state: Arc<Mutex<MemoryState>>,
    failing: Arc<StdMutex<HashSet<&'static str>>>,
    racing_letters: Arc<StdMutex<Vec<ReferenceLetter>>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed state as of now.
    pub async fn snapshot(&self) -> MemoryState {
        self.state.lock().await.clone()
    }

    pub async fn seed_user(&self, email: &str) -> User {
        let user = User::new(email, "Test User");
        self.state.lock().await.users.insert(user.id, user.clone());
        user
    }

    /// Makes every later call of the named operation fail with a database error.
    pub fn fail_on(&self, operation: &'static str) {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(operation);
    }

    /// The next `create_letter` call first sees `letter` committed by a
    /// concurrent transaction, as if another upload won the race.
    pub fn race_next_letter(&self, letter: ReferenceLetter) {
        self.racing_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(letter);
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        let guard = self.state.clone().lock_owned().await;
        let work = guard.clone();
        Ok(Box::new(MemoryUnitOfWork {
            guard,
            work,
            failing: self.failing.clone(),
            racing_letters: self.racing_letters.clone(),
        }))
    }
}

pub struct MemoryUnitOfWork {
    guard: OwnedMutexGuard<MemoryState>,
    work: MemoryState,
    failing: Arc<StdMutex<HashSet<&'static str>>>,
    racing_letters: Arc<StdMutex<Vec<ReferenceLetter>>>,
}

impl MemoryUnitOfWork {
    fn check(&self, operation: &'static str) -> Result<(), RepoError> {
        let failing = self.failing.lock().unwrap_or_else(PoisonError::into_inner);
        if failing.contains(operation) {
            return Err(RepoError::Database(sqlx::Error::Protocol(format!(
                "injected failure in {operation}"
            ))));
        }
        Ok(())
    }

    /// Lands queued racing letters in the committed state and in this
    /// transaction's view of it.
    fn land_racing_letters(&mut self) {
        let racing: Vec<ReferenceLetter> = self
            .racing_letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect();
        for mut letter in racing {
            letter.id = id_or_new(letter.id);
            self.guard.letters.insert(letter.id, letter.clone());
            self.work.letters.insert(letter.id, letter);
        }
    }
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.check("commit")?;
        let MemoryUnitOfWork {
            mut guard, work, ..
        } = *self;
        *guard = work;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        Ok(())
    }
}

#[async_trait]
impl UserStore for MemoryUnitOfWork {
    async fn create_user(&mut self, user: &User) -> Result<User, RepoError> {
        user.validate()?;
        if self.work.users.values().any(|u| u.email == user.email) {
            return Err(RepoError::UniqueViolation(format!("users.email = {}", user.email)));
        }
        let mut row = user.clone();
        row.id = id_or_new(user.id);
        self.work.users.insert(row.id, row.clone());
        Ok(row)
    }

    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, RepoError> {
        Ok(self.work.users.get(&id).cloned())
    }
}

#[async_trait]
impl ProfileStore for MemoryUnitOfWork {
    async fn profile_by_user(&mut self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        Ok(self
            .work
            .profiles
            .values()
            .find(|p| p.user_id == user_id)
            .map(|p| self.work.profile_graph(p)))
    }

    async fn profile_by_id(&mut self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        Ok(self.work.profiles.get(&id).map(|p| self.work.profile_graph(p)))
    }

    async fn create_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError> {
        self.check("create_profile")?;
        profile.validate()?;
        if !self.work.users.contains_key(&profile.user_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "user {} does not exist",
                profile.user_id
            )));
        }
        if self.work.profiles.values().any(|p| p.user_id == profile.user_id) {
            return Err(RepoError::UniqueViolation(format!(
                "profiles.user_id = {}",
                profile.user_id
            )));
        }
        let mut row = Profile {
            work_experiences: Vec::new(),
            skills: Vec::new(),
            job_matches: Vec::new(),
            ..profile.clone()
        };
        row.id = id_or_new(profile.id);
        self.work.profiles.insert(row.id, row.clone());
        Ok(row)
    }

    async fn ensure_profile(&mut self, user_id: Uuid) -> Result<Profile, RepoError> {
        if let Some(existing) = self.work.profiles.values().find(|p| p.user_id == user_id) {
            return Ok(existing.clone());
        }
        self.create_profile(&Profile::new(user_id)).await
    }

    async fn update_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError> {
        self.check("update_profile")?;
        profile.validate()?;
        let row = self
            .work
            .profiles
            .get_mut(&profile.id)
            .ok_or(RepoError::NotFound {
                entity: "profile",
                id: profile.id,
            })?;
        row.summary = profile.summary.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_profile(&mut self, id: Uuid) -> Result<(), RepoError> {
        if self.work.profiles.remove(&id).is_none() {
            return Err(RepoError::NotFound {
                entity: "profile",
                id,
            });
        }
        let experience_ids: Vec<Uuid> = self
            .work
            .experiences
            .values()
            .filter(|e| e.profile_id == id)
            .map(|e| e.id)
            .collect();
        for experience_id in experience_ids {
            self.work.remove_experience(experience_id);
        }
        self.work.job_matches.retain(|m| m.base_profile_id != id);
        self.work.profile_skills.retain(|(profile_id, _), _| *profile_id != id);
        Ok(())
    }
}

#[async_trait]
impl ReferenceLetterStore for MemoryUnitOfWork {
    async fn create_letter(
        &mut self,
        letter: &ReferenceLetter,
    ) -> Result<ReferenceLetter, RepoError> {
        self.check("create_letter")?;
        self.land_racing_letters();
        letter.validate()?;
        if !self.work.users.contains_key(&letter.user_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "user {} does not exist",
                letter.user_id
            )));
        }
        let mut row = letter.clone();
        row.id = id_or_new(letter.id);
        self.work.check_letter_sha_unique(&row)?;
        self.work.letters.insert(row.id, row.clone());
        Ok(row)
    }

    async fn letter_by_id(&mut self, id: Uuid) -> Result<Option<ReferenceLetter>, RepoError> {
        Ok(self.work.letters.get(&id).cloned())
    }

    async fn letters_by_user(&mut self, user_id: Uuid) -> Result<Vec<ReferenceLetter>, RepoError> {
        let mut letters: Vec<ReferenceLetter> = self
            .work
            .letters
            .values()
            .filter(|l| l.user_id == user_id)
            .cloned()
            .collect();
        letters.sort_by(|a, b| b.upload_date.cmp(&a.upload_date).then(a.id.cmp(&b.id)));
        Ok(letters)
    }

    async fn letter_by_content_sha(
        &mut self,
        user_id: Uuid,
        content_sha: &str,
    ) -> Result<Option<ReferenceLetter>, RepoError> {
        Ok(self
            .work
            .letters
            .values()
            .find(|l| l.user_id == user_id && l.content_sha.as_deref() == Some(content_sha))
            .cloned())
    }

    async fn update_letter(
        &mut self,
        letter: &ReferenceLetter,
    ) -> Result<ReferenceLetter, RepoError> {
        self.check("update_letter")?;
        letter.validate()?;
        self.work.check_letter_sha_unique(letter)?;
        let row = self
            .work
            .letters
            .get_mut(&letter.id)
            .ok_or(RepoError::NotFound {
                entity: "reference letter",
                id: letter.id,
            })?;
        if row.status != LetterStatus::Pending && row.status != letter.status {
            return Err(RepoError::Constraint(format!(
                "letter {} cannot move from {} to {}",
                letter.id, row.status, letter.status
            )));
        }
        row.file_name = letter.file_name.clone();
        row.storage_path = letter.storage_path.clone();
        row.status = letter.status;
        row.extracted_text = letter.extracted_text.clone();
        row.content_sha = letter.content_sha.clone();
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_letter(&mut self, id: Uuid) -> Result<(), RepoError> {
        if self.work.letters.remove(&id).is_none() {
            return Err(RepoError::NotFound {
                entity: "reference letter",
                id,
            });
        }
        self.work.highlights.retain(|_, h| h.source_letter_id != id);
        for experience in self.work.experiences.values_mut() {
            if experience.reference_letter_id == Some(id) {
                experience.reference_letter_id = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkExperienceStore for MemoryUnitOfWork {
    async fn create_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError> {
        self.check("create_work_experience")?;
        experience.validate()?;
        if !self.work.profiles.contains_key(&experience.profile_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "profile {} does not exist",
                experience.profile_id
            )));
        }
        self.work.check_letter_ref(experience.reference_letter_id)?;
        let mut row = WorkExperience {
            credibility_highlights: Vec::new(),
            ..experience.clone()
        };
        row.id = id_or_new(experience.id);
        self.work.experiences.insert(row.id, row.clone());
        Ok(row)
    }

    async fn work_experience_by_id(
        &mut self,
        id: Uuid,
    ) -> Result<Option<WorkExperience>, RepoError> {
        Ok(self
            .work
            .experiences
            .get(&id)
            .map(|e| self.work.with_highlights(e)))
    }

    async fn work_experiences_by_profile(
        &mut self,
        profile_id: Uuid,
    ) -> Result<Vec<WorkExperience>, RepoError> {
        Ok(self.work.experiences_of(profile_id))
    }

    async fn update_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError> {
        experience.validate()?;
        self.work.check_letter_ref(experience.reference_letter_id)?;
        let row = self
            .work
            .experiences
            .get_mut(&experience.id)
            .ok_or(RepoError::NotFound {
                entity: "work experience",
                id: experience.id,
            })?;
        row.company_name = experience.company_name.clone();
        row.role = experience.role.clone();
        row.start_date = experience.start_date;
        row.end_date = experience.end_date;
        row.description = experience.description.clone();
        row.reference_letter_id = experience.reference_letter_id;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_work_experience(&mut self, id: Uuid) -> Result<(), RepoError> {
        if !self.work.experiences.contains_key(&id) {
            return Err(RepoError::NotFound {
                entity: "work experience",
                id,
            });
        }
        self.work.remove_experience(id);
        Ok(())
    }
}

#[async_trait]
impl CredibilityHighlightStore for MemoryUnitOfWork {
    async fn create_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError> {
        self.check("create_highlight")?;
        highlight.validate()?;
        let experience_owner = self
            .work
            .experiences
            .get(&highlight.work_experience_id)
            .and_then(|e| self.work.profiles.get(&e.profile_id))
            .map(|p| p.user_id);
        let letter_owner = self
            .work
            .letters
            .get(&highlight.source_letter_id)
            .map(|l| l.user_id);
        match (experience_owner, letter_owner) {
            (Some(a), Some(b)) if a == b => {}
            _ => {
                return Err(RepoError::ForeignKeyViolation(format!(
                    "work experience {} and letter {} do not exist under the same owner",
                    highlight.work_experience_id, highlight.source_letter_id
                )))
            }
        }
        let mut row = highlight.clone();
        row.id = id_or_new(highlight.id);
        self.work.highlights.insert(row.id, row.clone());
        Ok(row)
    }

    async fn highlights_by_work_experience(
        &mut self,
        work_experience_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError> {
        Ok(self
            .work
            .highlights_where(|h| h.work_experience_id == work_experience_id))
    }

    async fn highlights_by_source_letter(
        &mut self,
        letter_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError> {
        Ok(self.work.highlights_where(|h| h.source_letter_id == letter_id))
    }

    async fn update_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError> {
        highlight.validate()?;
        let row = self
            .work
            .highlights
            .get_mut(&highlight.id)
            .ok_or(RepoError::NotFound {
                entity: "credibility highlight",
                id: highlight.id,
            })?;
        row.quote = highlight.quote.clone();
        row.sentiment = highlight.sentiment;
        row.updated_at = Utc::now();
        Ok(row.clone())
    }

    async fn delete_highlight(&mut self, id: Uuid) -> Result<(), RepoError> {
        self.work
            .highlights
            .remove(&id)
            .map(|_| ())
            .ok_or(RepoError::NotFound {
                entity: "credibility highlight",
                id,
            })
    }
}

#[async_trait]
impl SkillStore for MemoryUnitOfWork {
    async fn upsert_skill(&mut self, name: &str) -> Result<Skill, RepoError> {
        self.check("upsert_skill")?;
        let name = name.trim();
        let folded = name.to_lowercase();
        if let Some(existing) = self
            .work
            .skills
            .values()
            .find(|s| s.name.to_lowercase() == folded)
        {
            return Ok(existing.clone());
        }
        let skill = Skill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            proficiency: None,
        };
        skill.validate()?;
        self.work.skills.insert(skill.id, skill.clone());
        Ok(skill)
    }

    async fn link_skill(
        &mut self,
        profile_id: Uuid,
        skill_id: Uuid,
        proficiency: Option<&str>,
    ) -> Result<(), RepoError> {
        if !self.work.profiles.contains_key(&profile_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "profile {profile_id} does not exist"
            )));
        }
        if !self.work.skills.contains_key(&skill_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "skill {skill_id} does not exist"
            )));
        }
        let link = self
            .work
            .profile_skills
            .entry((profile_id, skill_id))
            .or_insert(None);
        if let Some(proficiency) = proficiency {
            *link = Some(proficiency.to_string());
        }
        Ok(())
    }
}

#[async_trait]
impl JobMatchStore for MemoryUnitOfWork {
    async fn create_job_match(&mut self, job_match: &JobMatch) -> Result<JobMatch, RepoError> {
        self.check("create_job_match")?;
        job_match.validate()?;
        if !self.work.profiles.contains_key(&job_match.base_profile_id) {
            return Err(RepoError::ForeignKeyViolation(format!(
                "profile {} does not exist",
                job_match.base_profile_id
            )));
        }
        let mut row = job_match.clone();
        row.id = id_or_new(job_match.id);
        self.work.job_matches.push(row.clone());
        Ok(row)
    }

    async fn job_match_by_id(&mut self, id: Uuid) -> Result<Option<JobMatch>, RepoError> {
        Ok(self.work.job_matches.iter().find(|m| m.id == id).cloned())
    }

    async fn job_matches_by_profile(
        &mut self,
        profile_id: Uuid,
    ) -> Result<Vec<JobMatch>, RepoError> {
        Ok(self.work.job_matches_of(profile_id))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::fingerprint::fingerprint;
    use crate::models::Sentiment;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn letter_for(user_id: Uuid, text: &str) -> ReferenceLetter {
        ReferenceLetter::pending(user_id, "letter.txt", "x-letter.txt", text, Some(fingerprint(text)))
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_rolls_back() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        {
            let mut uow = repo.begin().await.unwrap();
            uow.ensure_profile(user.id).await.unwrap();
        }
        assert!(repo.snapshot().await.profiles.is_empty());

        let mut uow = repo.begin().await.unwrap();
        uow.ensure_profile(user.id).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(repo.snapshot().await.profiles.len(), 1);
    }

    #[tokio::test]
    async fn test_ensure_profile_is_idempotent() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let first = uow.ensure_profile(user.id).await.unwrap();
        let second = uow.ensure_profile(user.id).await.unwrap();
        assert_eq!(first.id, second.id);
        let err = uow.create_profile(&Profile::new(user.id)).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation(_)));
    }

    #[tokio::test]
    async fn test_letter_sha_unique_per_user() {
        let repo = MemoryRepository::new();
        let jane = repo.seed_user("jane@example.com").await;
        let john = repo.seed_user("john@example.com").await;
        let mut uow = repo.begin().await.unwrap();

        uow.create_letter(&letter_for(jane.id, "same text")).await.unwrap();
        let err = uow.create_letter(&letter_for(jane.id, "same text")).await.unwrap_err();
        assert!(matches!(err, RepoError::UniqueViolation(_)));
        // another owner may hold the same content
        uow.create_letter(&letter_for(john.id, "same text")).await.unwrap();
        // letters without a fingerprint never collide
        let empty = ReferenceLetter::pending(jane.id, "a.txt", "p-a.txt", "", None);
        uow.create_letter(&empty).await.unwrap();
        uow.create_letter(&empty).await.unwrap();
    }

    #[tokio::test]
    async fn test_letter_status_is_monotone() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let mut letter = uow.create_letter(&letter_for(user.id, "text")).await.unwrap();

        letter.status = LetterStatus::Failed;
        uow.update_letter(&letter).await.unwrap();
        letter.status = LetterStatus::Processed;
        let err = uow.update_letter(&letter).await.unwrap_err();
        assert!(matches!(err, RepoError::Constraint(_)));
    }

    #[tokio::test]
    async fn test_skill_upsert_is_case_insensitive() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let profile = uow.ensure_profile(user.id).await.unwrap();

        let first = uow.upsert_skill("Rust").await.unwrap();
        let second = uow.upsert_skill("  rust ").await.unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Rust");
        assert!(uow.upsert_skill(" ").await.is_err());

        uow.link_skill(profile.id, first.id, Some("expert")).await.unwrap();
        uow.link_skill(profile.id, first.id, None).await.unwrap();
        let loaded = uow.profile_by_id(profile.id).await.unwrap().unwrap();
        assert_eq!(loaded.skills.len(), 1);
        assert_eq!(loaded.skills[0].proficiency.as_deref(), Some("expert"));
    }

    #[tokio::test]
    async fn test_highlight_requires_same_owner() {
        let repo = MemoryRepository::new();
        let jane = repo.seed_user("jane@example.com").await;
        let john = repo.seed_user("john@example.com").await;
        let mut uow = repo.begin().await.unwrap();

        let profile = uow.ensure_profile(jane.id).await.unwrap();
        let experience = uow
            .create_work_experience(&WorkExperience::new(
                profile.id,
                "Acme",
                "Lead",
                date(2021, 3, 1),
                None,
            ))
            .await
            .unwrap();
        let johns_letter = uow.create_letter(&letter_for(john.id, "john")).await.unwrap();

        let highlight = CredibilityHighlight::new(
            experience.id,
            "strong engineer",
            Sentiment::Positive,
            johns_letter.id,
        );
        let err = uow.create_highlight(&highlight).await.unwrap_err();
        assert!(matches!(err, RepoError::ForeignKeyViolation(_)));
    }

    #[tokio::test]
    async fn test_profile_delete_cascades() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let profile = uow.ensure_profile(user.id).await.unwrap();
        let letter = uow.create_letter(&letter_for(user.id, "text")).await.unwrap();
        let mut experience =
            WorkExperience::new(profile.id, "Acme", "Lead", date(2021, 3, 1), None);
        experience.reference_letter_id = Some(letter.id);
        let experience = uow.create_work_experience(&experience).await.unwrap();
        uow.create_highlight(&CredibilityHighlight::new(
            experience.id,
            "reliable",
            Sentiment::Neutral,
            letter.id,
        ))
        .await
        .unwrap();
        let skill = uow.upsert_skill("Go").await.unwrap();
        uow.link_skill(profile.id, skill.id, None).await.unwrap();
        uow.create_job_match(&JobMatch::new(profile.id, "A job description", 0.5, "fit"))
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let mut uow = repo.begin().await.unwrap();
        uow.delete_profile(profile.id).await.unwrap();
        uow.commit().await.unwrap();

        let state = repo.snapshot().await;
        assert!(state.experiences.is_empty());
        assert!(state.highlights.is_empty());
        assert!(state.job_matches.is_empty());
        assert!(state.profile_skills.is_empty());
        // shared rows survive
        assert_eq!(state.skills.len(), 1);
        assert_eq!(state.letters.len(), 1);
    }

    #[tokio::test]
    async fn test_letter_delete_detaches_experiences() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let profile = uow.ensure_profile(user.id).await.unwrap();
        let letter = uow.create_letter(&letter_for(user.id, "text")).await.unwrap();
        let mut experience =
            WorkExperience::new(profile.id, "Acme", "Lead", date(2021, 3, 1), None);
        experience.reference_letter_id = Some(letter.id);
        let experience = uow.create_work_experience(&experience).await.unwrap();
        uow.create_highlight(&CredibilityHighlight::new(
            experience.id,
            "reliable",
            Sentiment::Positive,
            letter.id,
        ))
        .await
        .unwrap();

        uow.delete_letter(letter.id).await.unwrap();
        let reloaded = uow.work_experience_by_id(experience.id).await.unwrap().unwrap();
        assert_eq!(reloaded.reference_letter_id, None);
        assert!(reloaded.credibility_highlights.is_empty());
    }

    #[tokio::test]
    async fn test_profile_graph_ordering() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        let mut uow = repo.begin().await.unwrap();
        let profile = uow.ensure_profile(user.id).await.unwrap();
        for (company, start) in [("Old", date(2015, 1, 1)), ("New", date(2022, 1, 1))] {
            uow.create_work_experience(&WorkExperience::new(profile.id, company, "Eng", start, None))
                .await
                .unwrap();
        }
        for name in ["rust", "Go", "ansible"] {
            let skill = uow.upsert_skill(name).await.unwrap();
            uow.link_skill(profile.id, skill.id, None).await.unwrap();
        }

        let loaded = uow.profile_by_user(user.id).await.unwrap().unwrap();
        let companies: Vec<&str> = loaded
            .work_experiences
            .iter()
            .map(|e| e.company_name.as_str())
            .collect();
        assert_eq!(companies, vec!["New", "Old"]);
        let skills: Vec<&str> = loaded.skills.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(skills, vec!["ansible", "Go", "rust"]);
    }

    #[tokio::test]
    async fn test_injected_failure() {
        let repo = MemoryRepository::new();
        let user = repo.seed_user("jane@example.com").await;
        repo.fail_on("create_letter");
        let mut uow = repo.begin().await.unwrap();
        let err = uow.create_letter(&letter_for(user.id, "x")).await.unwrap_err();
        assert!(matches!(err, RepoError::Database(_)));
    }
}
