use crate::models::Profile;

/// Upper bound on the text handed to the model, in code points.
pub const MAX_PROJECTION_CHARS: usize = 20_000;

/// Serializes a profile graph into the plain text the tailoring prompt expects.
///
/// Deterministic in the order the repository returns collections (newest role
/// first). Empty sections are left out entirely.
pub fn project_profile(profile: &Profile) -> String {
    let mut sections = Vec::new();

    if let Some(summary) = profile.summary.as_deref().map(str::trim) {
        if !summary.is_empty() {
            sections.push(format!("Summary: {summary}"));
        }
    }

    if !profile.work_experiences.is_empty() {
        let mut section = String::from("Work Experience:");
        for experience in &profile.work_experiences {
            section.push_str(&format!(
                "\n- {} at {}",
                experience.role, experience.company_name
            ));
            let description = experience.description.trim();
            if !description.is_empty() {
                section.push_str("\n  ");
                section.push_str(description);
            }
            if !experience.credibility_highlights.is_empty() {
                section.push_str("\n  Credibility Highlights:");
                for highlight in &experience.credibility_highlights {
                    section.push_str(&format!(
                        "\n    \"{}\" ({})",
                        highlight.quote, highlight.sentiment
                    ));
                }
            }
        }
        sections.push(section);
    }

    if !profile.skills.is_empty() {
        let names: Vec<&str> = profile.skills.iter().map(|s| s.name.as_str()).collect();
        sections.push(format!("Skills: {}", names.join(", ")));
    }

    truncate_chars(sections.join("\n\n"), MAX_PROJECTION_CHARS)
}

fn truncate_chars(text: String, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text,
    }
}
