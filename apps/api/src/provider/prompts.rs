pub const PROFILE_DATA_PROMPT: &str = r#"
You are reading a reference letter written about a candidate by a former employer or colleague.
Extract the single role the letter describes.

Return a JSON object with EXACTLY these fields and no others:
{
  "company_name": string,          // employer named in the letter
  "role": string,                  // the candidate's job title
  "start_date": "YYYY-MM-DD",      // first day in the role; use the 1st of the month when only month and year are given
  "end_date": "YYYY-MM-DD" or "",  // last day in the role; "" when the candidate still holds it
  "skills": [string],              // short skill names, e.g. "leadership", "Kubernetes"
  "achievements": [string],        // concrete accomplishments, one sentence each
  "description": string            // two or three sentences describing the role
}

{no_invention}

Reference letter:
"""
{letter_text}
"""
"#;

pub const CREDIBILITY_PROMPT: &str = r#"
You are reading a reference letter written about a candidate.
Pull out short verbatim quotes that speak to the candidate's professional achievements,
personal qualities, collaboration, technical skill, or leadership.

Return a JSON object with EXACTLY these fields and no others:
{
  "quotes": [string],                  // copied word for word from the letter
  "sentiment": "POSITIVE" | "NEUTRAL"  // overall tone of the letter
}

{no_invention}

Reference letter:
"""
{letter_text}
"""
"#;

pub const TAILOR_PROMPT: &str = r#"
You are a career advisor tailoring a candidate's profile to a job description.
Write a professional summary of at most five sentences that emphasises the experience
most relevant to the job, and rate how well the profile matches the job.

Return a JSON object with EXACTLY these fields and no others:
{
  "summary": string,     // the tailored summary
  "matchScore": number   // between 0 and 1; 1 means an excellent match
}

Only mention experience that appears in the profile.

Profile:
"""
{profile_text}
"""

Job description:
"""
{job_description}
"""
"#;

/// Substitutes `{name}` placeholders in a single pass. Inserted values are
/// never rescanned, so text that happens to contain a placeholder stays as is.
pub(super) fn fill_prompt(template: &str, values: &[(&str, &str)]) -> String {
    let mut prompt = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        prompt.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let placeholder = values
            .iter()
            .find(|(name, _)| after.starts_with(name) && after[name.len()..].starts_with('}'));
        match placeholder {
            Some((name, value)) => {
                prompt.push_str(value);
                rest = &after[name.len() + 1..];
            }
            None => {
                prompt.push('{');
                rest = after;
            }
        }
    }
    prompt.push_str(rest);
    prompt
}
