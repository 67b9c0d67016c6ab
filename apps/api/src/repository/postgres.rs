use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{
    id_or_new, CredibilityHighlightStore, JobMatchStore, ProfileStore, ReferenceLetterStore,
    RepoError, Repository, SkillStore, UnitOfWork, UserStore, WorkExperienceStore,
};
use crate::models::{
    CredibilityHighlight, JobMatch, Profile, ReferenceLetter, Skill, User, WorkExperience,
};

/// Repository backed by the shared connection pool.
#[derive(Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Repository for PgRepository {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>, RepoError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// A database transaction. Dropping it without `commit` rolls back.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl PgUnitOfWork {
    async fn load_graph(&mut self, mut profile: Profile) -> Result<Profile, RepoError> {
        profile.work_experiences = self.work_experiences_by_profile(profile.id).await?;

        profile.skills = sqlx::query_as::<_, Skill>(
            r#"
            SELECT s.id, s.name, ps.proficiency
            FROM skills s
            JOIN profile_skills ps ON ps.skill_id = s.id
            WHERE ps.profile_id = $1
            ORDER BY LOWER(s.name)
            "#,
        )
        .bind(profile.id)
        .fetch_all(&mut *self.tx)
        .await?;

        profile.job_matches = self.job_matches_by_profile(profile.id).await?;
        Ok(profile)
    }

    async fn attach_highlights(
        &mut self,
        experiences: &mut [WorkExperience],
    ) -> Result<(), RepoError> {
        if experiences.is_empty() {
            return Ok(());
        }
        let ids: Vec<Uuid> = experiences.iter().map(|e| e.id).collect();
        let highlights = sqlx::query_as::<_, CredibilityHighlight>(
            "SELECT * FROM credibility_highlights WHERE work_experience_id = ANY($1) ORDER BY created_at, id",
        )
        .bind(&ids[..])
        .fetch_all(&mut *self.tx)
        .await?;

        let mut grouped: HashMap<Uuid, Vec<CredibilityHighlight>> = HashMap::new();
        for highlight in highlights {
            grouped
                .entry(highlight.work_experience_id)
                .or_default()
                .push(highlight);
        }
        for experience in experiences.iter_mut() {
            experience.credibility_highlights = grouped.remove(&experience.id).unwrap_or_default();
        }
        Ok(())
    }
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<(), RepoError> {
        self.tx.rollback().await?;
        Ok(())
    }
}

#[async_trait]
impl UserStore for PgUnitOfWork {
    async fn create_user(&mut self, user: &User) -> Result<User, RepoError> {
        user.validate()?;
        let row = sqlx::query_as::<_, User>(
            "INSERT INTO users (id, email, name, created_at) VALUES ($1, $2, $3, $4) RETURNING *",
        )
        .bind(id_or_new(user.id))
        .bind(&user.email)
        .bind(&user.name)
        .bind(user.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn user_by_id(&mut self, id: Uuid) -> Result<Option<User>, RepoError> {
        let row = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }
}

#[async_trait]
impl ProfileStore for PgUnitOfWork {
    async fn profile_by_user(&mut self, user_id: Uuid) -> Result<Option<Profile>, RepoError> {
        let row = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(profile) => Ok(Some(self.load_graph(profile).await?)),
            None => Ok(None),
        }
    }

    async fn profile_by_id(&mut self, id: Uuid) -> Result<Option<Profile>, RepoError> {
        let row = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        match row {
            Some(profile) => Ok(Some(self.load_graph(profile).await?)),
            None => Ok(None),
        }
    }

    async fn create_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError> {
        profile.validate()?;
        let row = sqlx::query_as::<_, Profile>(
            r#"
            INSERT INTO profiles (id, user_id, summary, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(id_or_new(profile.id))
        .bind(profile.user_id)
        .bind(&profile.summary)
        .bind(profile.created_at)
        .bind(profile.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn ensure_profile(&mut self, user_id: Uuid) -> Result<Profile, RepoError> {
        // A concurrent creator wins the insert; the re-read below sees its row
        // once that transaction commits.
        sqlx::query(
            r#"
            INSERT INTO profiles (id, user_id, created_at, updated_at)
            VALUES ($1, $2, now(), now())
            ON CONFLICT (user_id) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .execute(&mut *self.tx)
        .await?;

        let row = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn update_profile(&mut self, profile: &Profile) -> Result<Profile, RepoError> {
        profile.validate()?;
        let row = sqlx::query_as::<_, Profile>(
            "UPDATE profiles SET summary = $2, updated_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(profile.id)
        .bind(&profile.summary)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.ok_or(RepoError::NotFound {
            entity: "profile",
            id: profile.id,
        })
    }

    async fn delete_profile(&mut self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM profiles WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound {
                entity: "profile",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReferenceLetterStore for PgUnitOfWork {
    async fn create_letter(
        &mut self,
        letter: &ReferenceLetter,
    ) -> Result<ReferenceLetter, RepoError> {
        letter.validate()?;
        let row = sqlx::query_as::<_, ReferenceLetter>(
            r#"
            INSERT INTO reference_letters
                (id, user_id, file_name, storage_path, upload_date, status,
                 extracted_text, content_sha, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(id_or_new(letter.id))
        .bind(letter.user_id)
        .bind(&letter.file_name)
        .bind(&letter.storage_path)
        .bind(letter.upload_date)
        .bind(letter.status.as_str())
        .bind(&letter.extracted_text)
        .bind(&letter.content_sha)
        .bind(letter.created_at)
        .bind(letter.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn letter_by_id(&mut self, id: Uuid) -> Result<Option<ReferenceLetter>, RepoError> {
        let row = sqlx::query_as::<_, ReferenceLetter>(
            "SELECT * FROM reference_letters WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn letters_by_user(&mut self, user_id: Uuid) -> Result<Vec<ReferenceLetter>, RepoError> {
        let rows = sqlx::query_as::<_, ReferenceLetter>(
            "SELECT * FROM reference_letters WHERE user_id = $1 ORDER BY upload_date DESC, id",
        )
        .bind(user_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn letter_by_content_sha(
        &mut self,
        user_id: Uuid,
        content_sha: &str,
    ) -> Result<Option<ReferenceLetter>, RepoError> {
        let row = sqlx::query_as::<_, ReferenceLetter>(
            "SELECT * FROM reference_letters WHERE user_id = $1 AND content_sha = $2",
        )
        .bind(user_id)
        .bind(content_sha)
        .fetch_optional(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn update_letter(
        &mut self,
        letter: &ReferenceLetter,
    ) -> Result<ReferenceLetter, RepoError> {
        letter.validate()?;
        // A terminal row only accepts writes that keep its status.
        let row = sqlx::query_as::<_, ReferenceLetter>(
            r#"
            UPDATE reference_letters
            SET file_name = $2, storage_path = $3, status = $4,
                extracted_text = $5, content_sha = $6, updated_at = now()
            WHERE id = $1 AND (status = 'PENDING' OR status = $4)
            RETURNING *
            "#,
        )
        .bind(letter.id)
        .bind(&letter.file_name)
        .bind(&letter.storage_path)
        .bind(letter.status.as_str())
        .bind(&letter.extracted_text)
        .bind(&letter.content_sha)
        .fetch_optional(&mut *self.tx)
        .await?;

        match row {
            Some(row) => Ok(row),
            None => match self.letter_by_id(letter.id).await? {
                Some(current) => Err(RepoError::Constraint(format!(
                    "letter {} cannot move from {} to {}",
                    letter.id, current.status, letter.status
                ))),
                None => Err(RepoError::NotFound {
                    entity: "reference letter",
                    id: letter.id,
                }),
            },
        }
    }

    async fn delete_letter(&mut self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM reference_letters WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound {
                entity: "reference letter",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl WorkExperienceStore for PgUnitOfWork {
    async fn create_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError> {
        experience.validate()?;
        let row = sqlx::query_as::<_, WorkExperience>(
            r#"
            INSERT INTO work_experiences
                (id, profile_id, company_name, role, start_date, end_date,
                 description, reference_letter_id, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(id_or_new(experience.id))
        .bind(experience.profile_id)
        .bind(&experience.company_name)
        .bind(&experience.role)
        .bind(experience.start_date)
        .bind(experience.end_date)
        .bind(&experience.description)
        .bind(experience.reference_letter_id)
        .bind(experience.created_at)
        .bind(experience.updated_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn work_experience_by_id(
        &mut self,
        id: Uuid,
    ) -> Result<Option<WorkExperience>, RepoError> {
        let row = sqlx::query_as::<_, WorkExperience>(
            "SELECT * FROM work_experiences WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&mut *self.tx)
        .await?;
        match row {
            Some(experience) => {
                let mut experiences = [experience];
                self.attach_highlights(&mut experiences).await?;
                let [experience] = experiences;
                Ok(Some(experience))
            }
            None => Ok(None),
        }
    }

    async fn work_experiences_by_profile(
        &mut self,
        profile_id: Uuid,
    ) -> Result<Vec<WorkExperience>, RepoError> {
        let mut rows = sqlx::query_as::<_, WorkExperience>(
            r#"
            SELECT * FROM work_experiences
            WHERE profile_id = $1
            ORDER BY start_date DESC, created_at DESC
            "#,
        )
        .bind(profile_id)
        .fetch_all(&mut *self.tx)
        .await?;
        self.attach_highlights(&mut rows).await?;
        Ok(rows)
    }

    async fn update_work_experience(
        &mut self,
        experience: &WorkExperience,
    ) -> Result<WorkExperience, RepoError> {
        experience.validate()?;
        let row = sqlx::query_as::<_, WorkExperience>(
            r#"
            UPDATE work_experiences
            SET company_name = $2, role = $3, start_date = $4, end_date = $5,
                description = $6, reference_letter_id = $7, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(experience.id)
        .bind(&experience.company_name)
        .bind(&experience.role)
        .bind(experience.start_date)
        .bind(experience.end_date)
        .bind(&experience.description)
        .bind(experience.reference_letter_id)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.ok_or(RepoError::NotFound {
            entity: "work experience",
            id: experience.id,
        })
    }

    async fn delete_work_experience(&mut self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM work_experiences WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound {
                entity: "work experience",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl CredibilityHighlightStore for PgUnitOfWork {
    async fn create_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError> {
        highlight.validate()?;
        let row = sqlx::query_as::<_, CredibilityHighlight>(
            r#"
            INSERT INTO credibility_highlights
                (id, work_experience_id, quote, sentiment, source_letter_id, created_at, updated_at)
            SELECT $1, $2, $3, $4, $5, $6, $7
            WHERE EXISTS (
                SELECT 1
                FROM work_experiences we
                JOIN profiles p ON p.id = we.profile_id
                JOIN reference_letters rl ON rl.user_id = p.user_id
                WHERE we.id = $2 AND rl.id = $5
            )
            RETURNING *
            "#,
        )
        .bind(id_or_new(highlight.id))
        .bind(highlight.work_experience_id)
        .bind(&highlight.quote)
        .bind(highlight.sentiment.as_str())
        .bind(highlight.source_letter_id)
        .bind(highlight.created_at)
        .bind(highlight.updated_at)
        .fetch_optional(&mut *self.tx)
        .await?;
        row.ok_or_else(|| {
            RepoError::ForeignKeyViolation(format!(
                "work experience {} and letter {} do not exist under the same owner",
                highlight.work_experience_id, highlight.source_letter_id
            ))
        })
    }

    async fn highlights_by_work_experience(
        &mut self,
        work_experience_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError> {
        let rows = sqlx::query_as::<_, CredibilityHighlight>(
            "SELECT * FROM credibility_highlights WHERE work_experience_id = $1 ORDER BY created_at, id",
        )
        .bind(work_experience_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn highlights_by_source_letter(
        &mut self,
        letter_id: Uuid,
    ) -> Result<Vec<CredibilityHighlight>, RepoError> {
        let rows = sqlx::query_as::<_, CredibilityHighlight>(
            "SELECT * FROM credibility_highlights WHERE source_letter_id = $1 ORDER BY created_at, id",
        )
        .bind(letter_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }

    async fn update_highlight(
        &mut self,
        highlight: &CredibilityHighlight,
    ) -> Result<CredibilityHighlight, RepoError> {
        highlight.validate()?;
        let row = sqlx::query_as::<_, CredibilityHighlight>(
            r#"
            UPDATE credibility_highlights
            SET quote = $2, sentiment = $3, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(highlight.id)
        .bind(&highlight.quote)
        .bind(highlight.sentiment.as_str())
        .fetch_optional(&mut *self.tx)
        .await?;
        row.ok_or(RepoError::NotFound {
            entity: "credibility highlight",
            id: highlight.id,
        })
    }

    async fn delete_highlight(&mut self, id: Uuid) -> Result<(), RepoError> {
        let result = sqlx::query("DELETE FROM credibility_highlights WHERE id = $1")
            .bind(id)
            .execute(&mut *self.tx)
            .await?;
        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound {
                entity: "credibility highlight",
                id,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl SkillStore for PgUnitOfWork {
    async fn upsert_skill(&mut self, name: &str) -> Result<Skill, RepoError> {
        let name = name.trim();
        let candidate = Skill {
            id: Uuid::new_v4(),
            name: name.to_string(),
            proficiency: None,
        };
        candidate.validate()?;

        sqlx::query("INSERT INTO skills (id, name) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(candidate.id)
            .bind(name)
            .execute(&mut *self.tx)
            .await?;

        let row = sqlx::query_as::<_, Skill>(
            "SELECT id, name, NULL::text AS proficiency FROM skills WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn link_skill(
        &mut self,
        profile_id: Uuid,
        skill_id: Uuid,
        proficiency: Option<&str>,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"
            INSERT INTO profile_skills (profile_id, skill_id, proficiency)
            VALUES ($1, $2, $3)
            ON CONFLICT (profile_id, skill_id)
            DO UPDATE SET proficiency = COALESCE(EXCLUDED.proficiency, profile_skills.proficiency)
            "#,
        )
        .bind(profile_id)
        .bind(skill_id)
        .bind(proficiency)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl JobMatchStore for PgUnitOfWork {
    async fn create_job_match(&mut self, job_match: &JobMatch) -> Result<JobMatch, RepoError> {
        job_match.validate()?;
        let row = sqlx::query_as::<_, JobMatch>(
            r#"
            INSERT INTO job_matches
                (id, base_profile_id, job_description, match_score, tailored_summary, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING *
            "#,
        )
        .bind(id_or_new(job_match.id))
        .bind(job_match.base_profile_id)
        .bind(&job_match.job_description)
        .bind(job_match.match_score)
        .bind(&job_match.tailored_summary)
        .bind(job_match.created_at)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(row)
    }

    async fn job_match_by_id(&mut self, id: Uuid) -> Result<Option<JobMatch>, RepoError> {
        let row = sqlx::query_as::<_, JobMatch>("SELECT * FROM job_matches WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(row)
    }

    async fn job_matches_by_profile(
        &mut self,
        profile_id: Uuid,
    ) -> Result<Vec<JobMatch>, RepoError> {
        let rows = sqlx::query_as::<_, JobMatch>(
            "SELECT * FROM job_matches WHERE base_profile_id = $1 ORDER BY created_at DESC, id",
        )
        .bind(profile_id)
        .fetch_all(&mut *self.tx)
        .await?;
        Ok(rows)
    }
}
