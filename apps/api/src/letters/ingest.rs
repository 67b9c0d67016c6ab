use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

use crate::errors::AppError;
use crate::extract::extract_text;
use crate::fingerprint::fingerprint;
use crate::models::{
    normalize_skill_names, CredibilityHighlight, ReferenceLetter, TransitionError, WorkExperience,
};
use crate::provider::{ProfileFacts, ProviderError};
use crate::repository::{
    CredibilityHighlightStore, ProfileStore, ReferenceLetterStore, RepoError, SkillStore,
    UnitOfWork, UserStore, WorkExperienceStore,
};
use crate::state::AppState;
use crate::storage::blob_name;
use crate::validation::{
    classify_upload, parse_end_date, parse_start_date, sanitize_file_name, validate_file_size,
    EndDate, MAX_FILE_SIZE,
};

/// An uploaded document as it arrives from the caller.
pub struct Upload<'a, R> {
    pub file_name: &'a str,
    pub content_type: Option<&'a str>,
    pub reader: R,
}

/// Stores the upload, extracts its text and merges the facts it yields into
/// the caller's profile graph.
///
/// Re-uploading content the caller already sent returns the existing letter
/// untouched. A letter whose facts cannot be extracted or whose start date is
/// unusable is kept as `FAILED`. Storage errors, cancellation and timeouts
/// leave no letter row behind; the stored blob is tolerated as an orphan.
pub async fn ingest<R>(
    state: &AppState,
    user_id: Uuid,
    upload: Upload<'_, R>,
    cancel: &CancellationToken,
) -> Result<ReferenceLetter, AppError>
where
    R: AsyncRead + Unpin + Send,
{
    let file_name = sanitize_file_name(upload.file_name)?;
    let kind = classify_upload(&file_name, upload.content_type)?;
    let bytes = read_bounded(upload.reader).await?;
    validate_file_size(bytes.len() as u64)?;
    ensure_user_exists(state, user_id).await?;

    let storage_path = state.blobs.put(&blob_name(&file_name), bytes).await?;
    let text = extract_text(kind, state.blobs.open(&storage_path).await?).await?;

    if text.trim().is_empty() {
        info!(%user_id, file_name = %file_name, "Extracted text is empty; keeping letter as pending");
        let mut uow = state.repo.begin().await?;
        let letter = uow
            .create_letter(&ReferenceLetter::pending(
                user_id,
                &file_name,
                &storage_path,
                text,
                None,
            ))
            .await?;
        uow.commit().await?;
        return Ok(letter);
    }

    let content_sha = fingerprint(&text);
    let merge = merge_letter(
        state,
        user_id,
        ReferenceLetter::pending(user_id, &file_name, &storage_path, text, Some(content_sha)),
        cancel,
    );
    match tokio::time::timeout(state.config.transaction_timeout, merge).await {
        Ok(result) => result,
        Err(_) => Err(AppError::Cancelled(format!(
            "ingestion exceeded {}s",
            state.config.transaction_timeout.as_secs()
        ))),
    }
}

/// Reads at most one byte past the size limit so oversized uploads are caught
/// without buffering them whole.
async fn read_bounded<R>(reader: R) -> Result<Bytes, AppError>
where
    R: AsyncRead + Unpin + Send,
{
    let mut bytes = Vec::new();
    reader
        .take(MAX_FILE_SIZE + 1)
        .read_to_end(&mut bytes)
        .await
        .map_err(|e| AppError::InvalidInput(format!("could not read upload: {e}")))?;
    Ok(Bytes::from(bytes))
}

async fn ensure_user_exists(state: &AppState, user_id: Uuid) -> Result<(), AppError> {
    let mut uow = state.repo.begin().await?;
    let user = uow.user_by_id(user_id).await?;
    uow.rollback().await?;
    match user {
        Some(_) => Ok(()),
        None => Err(AppError::NotFound(format!("user {user_id} not found"))),
    }
}

/// Everything from the duplicate check to `PROCESSED` runs in one transaction.
async fn merge_letter(
    state: &AppState,
    user_id: Uuid,
    pending: ReferenceLetter,
    cancel: &CancellationToken,
) -> Result<ReferenceLetter, AppError> {
    let content_sha = pending.content_sha.clone().unwrap_or_default();
    let mut uow = state.repo.begin().await?;

    if let Some(existing) = uow.letter_by_content_sha(user_id, &content_sha).await? {
        info!(%user_id, letter_id = %existing.id, "Letter already ingested; returning existing");
        return Ok(existing);
    }

    state.limiter.check(user_id)?;

    let letter = match uow.create_letter(&pending).await {
        Ok(letter) => letter,
        Err(RepoError::UniqueViolation(_)) => {
            // a concurrent upload of the same content won; its transaction is the one to report
            drop(uow);
            return winning_letter(state, user_id, &content_sha).await;
        }
        Err(e) => return Err(e.into()),
    };
    let text = letter.extracted_text.clone();

    let facts = match state.llm.extract_profile_data(&text, cancel).await {
        Ok(facts) => facts,
        Err(e) if is_interruption(&e) => return Err(e.into()),
        Err(e) => return fail_letter(uow, letter, &format!("profile extraction failed: {e}")).await,
    };

    let credibility = match state.llm.extract_credibility(&text, cancel).await {
        Ok(credibility) => Some(credibility),
        Err(e) if is_interruption(&e) => return Err(e.into()),
        Err(e) => {
            warn!(letter_id = %letter.id, "Credibility extraction failed; continuing without highlights: {e}");
            None
        }
    };

    let mut experience = match experience_from_facts(&facts, letter.id) {
        Ok(experience) => experience,
        Err(reason) => return fail_letter(uow, letter, &reason).await,
    };

    let profile = uow.ensure_profile(user_id).await?;
    experience.profile_id = profile.id;
    let experience = uow.create_work_experience(&experience).await?;

    let mut highlight_count = 0;
    if let Some(credibility) = credibility {
        for quote in credibility.quotes.iter().map(|q| q.trim()).filter(|q| !q.is_empty()) {
            uow.create_highlight(&CredibilityHighlight::new(
                experience.id,
                quote,
                credibility.sentiment,
                letter.id,
            ))
            .await?;
            highlight_count += 1;
        }
    }

    let skills = normalize_skill_names(&facts.skills);
    for name in &skills {
        let skill = uow.upsert_skill(name).await?;
        uow.link_skill(profile.id, skill.id, None).await?;
    }

    let mut letter = letter;
    letter.mark_processed().map_err(transition_error)?;
    let letter = uow.update_letter(&letter).await?;
    if cancel.is_cancelled() {
        return Err(AppError::Cancelled("ingestion cancelled before commit".to_string()));
    }
    uow.commit().await?;

    info!(
        %user_id,
        letter_id = %letter.id,
        profile_id = %profile.id,
        highlights = highlight_count,
        skills = skills.len(),
        "Letter processed"
    );
    Ok(letter)
}

/// Builds the work experience a letter describes, unattached to any profile.
/// An error string means the letter cannot be merged.
fn experience_from_facts(facts: &ProfileFacts, letter_id: Uuid) -> Result<WorkExperience, String> {
    let start = parse_start_date(&facts.start_date).map_err(|e| e.to_string())?;
    let end = parse_end_date(&facts.end_date, start);
    if let EndDate::Discarded(reason) = &end {
        warn!(%letter_id, "Storing work experience without end date: {reason}");
    }

    let mut experience = WorkExperience::new(
        Uuid::nil(),
        facts.company_name.trim(),
        facts.role.trim(),
        start,
        end.as_option(),
    );
    experience.description = describe(facts);
    experience.reference_letter_id = Some(letter_id);
    experience.validate().map_err(|e| e.to_string())?;
    Ok(experience)
}

fn describe(facts: &ProfileFacts) -> String {
    let achievements: Vec<&str> = facts
        .achievements
        .iter()
        .map(|a| a.trim())
        .filter(|a| !a.is_empty())
        .collect();
    let mut description = facts.description.trim().to_string();
    if achievements.is_empty() {
        return description;
    }
    if !description.is_empty() {
        description.push_str("\n\n");
    }
    description.push_str("Key achievements:");
    for achievement in achievements {
        description.push_str("\n- ");
        description.push_str(achievement);
    }
    description
}

async fn fail_letter(
    mut uow: Box<dyn UnitOfWork>,
    mut letter: ReferenceLetter,
    reason: &str,
) -> Result<ReferenceLetter, AppError> {
    warn!(letter_id = %letter.id, "Marking letter failed: {reason}");
    letter.mark_failed().map_err(transition_error)?;
    let letter = uow.update_letter(&letter).await?;
    uow.commit().await?;
    Ok(letter)
}

async fn winning_letter(
    state: &AppState,
    user_id: Uuid,
    content_sha: &str,
) -> Result<ReferenceLetter, AppError> {
    let mut uow = state.repo.begin().await?;
    let existing = uow.letter_by_content_sha(user_id, content_sha).await?;
    uow.rollback().await?;
    existing.ok_or_else(|| {
        AppError::Conflict(format!("letter with content {content_sha} collided but is not visible"))
    })
}

fn is_interruption(err: &ProviderError) -> bool {
    matches!(err, ProviderError::Cancelled | ProviderError::Timeout(_))
}

fn transition_error(err: TransitionError) -> AppError {
    AppError::Internal(err.into())
}
