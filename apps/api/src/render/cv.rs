use chrono::NaiveDate;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use thiserror::Error;

use super::metrics::{wrap_paragraph, Font};
use crate::models::{JobMatch, Profile, WorkExperience};

// A4 in points
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN: f32 = 56.0;
const TEXT_WIDTH: f32 = PAGE_WIDTH - 2.0 * MARGIN;
const LINE_SPACING: f32 = 1.35;

const HEADING_SIZE: f32 = 16.0;
const TITLE_SIZE: f32 = 12.0;
const BODY_SIZE: f32 = 10.0;
const SMALL_SIZE: f32 = 9.0;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("could not encode page content: {0}")]
    Encode(#[from] lopdf::Error),

    #[error("could not write PDF: {0}")]
    Write(#[from] std::io::Error),
}

/// Renders `profile` as an A4 CV.
///
/// With a job match, its tailored summary replaces the profile summary.
/// Sections with nothing to show are left out.
pub fn render_cv(profile: &Profile, job_match: Option<&JobMatch>) -> Result<Vec<u8>, RenderError> {
    let summary = job_match
        .map(|m| m.tailored_summary.as_str())
        .filter(|s| !s.trim().is_empty())
        .or(profile.summary.as_deref())
        .map(unescape_html)
        .unwrap_or_default();

    let mut pages = PageWriter::new();

    if !summary.trim().is_empty() {
        pages.heading("Professional Summary");
        pages.paragraph(&summary, Font::Regular, BODY_SIZE);
        pages.gap(10.0);
    }

    if !profile.work_experiences.is_empty() {
        pages.heading("Work Experience");
        for experience in &profile.work_experiences {
            write_experience(&mut pages, experience);
        }
        pages.gap(4.0);
    }

    if !profile.skills.is_empty() {
        let names: Vec<&str> = profile.skills.iter().map(|s| s.name.as_str()).collect();
        pages.heading("Skills");
        pages.paragraph(&names.join(", "), Font::Regular, BODY_SIZE);
    }

    pages.finish()
}

fn write_experience(pages: &mut PageWriter, experience: &WorkExperience) {
    pages.paragraph(
        &format!("{} | {}", experience.role, experience.company_name),
        Font::Bold,
        TITLE_SIZE,
    );
    pages.paragraph(
        &date_range(experience.start_date, experience.end_date),
        Font::Regular,
        SMALL_SIZE,
    );
    if !experience.description.trim().is_empty() {
        pages.paragraph(&experience.description, Font::Regular, BODY_SIZE);
    }
    if !experience.credibility_highlights.is_empty() {
        pages.paragraph("Employer Feedback:", Font::Bold, SMALL_SIZE);
        for highlight in &experience.credibility_highlights {
            pages.paragraph(&format!("\"{}\"", highlight.quote), Font::Regular, SMALL_SIZE);
        }
    }
    pages.gap(8.0);
}

fn date_range(start: NaiveDate, end: Option<NaiveDate>) -> String {
    let end = match end {
        Some(date) => date.format("%b %Y").to_string(),
        None => "Present".to_string(),
    };
    format!("{} - {end}", start.format("%b %Y"))
}

/// Stored free text is HTML-escaped; the PDF shows it literally.
fn unescape_html(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&#34;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&")
}

/// Maps text onto WinAnsiEncoding bytes. Unmappable characters become `?`.
fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            ' '..='~' => c as u8,
            '\u{A0}'..='\u{FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// Lays lines out top to bottom, starting a new page when the next line
/// would cross the bottom margin.
struct PageWriter {
    pages: Vec<Vec<Operation>>,
    y: f32,
}

impl PageWriter {
    fn new() -> Self {
        Self {
            pages: vec![Vec::new()],
            y: PAGE_HEIGHT - MARGIN,
        }
    }

    fn heading(&mut self, text: &str) {
        // keep a heading together with at least one body line
        self.reserve(HEADING_SIZE * LINE_SPACING + BODY_SIZE * LINE_SPACING);
        self.line(text, Font::Bold, HEADING_SIZE);
        self.gap(2.0);
    }

    fn paragraph(&mut self, text: &str, font: Font, size: f32) {
        for raw_line in text.lines() {
            for line in wrap_paragraph(raw_line, font, size, TEXT_WIDTH) {
                self.line(&line, font, size);
            }
        }
    }

    fn line(&mut self, text: &str, font: Font, size: f32) {
        let advance = size * LINE_SPACING;
        self.reserve(advance);
        self.y -= advance;
        let y = self.y;
        self.current_page().extend([
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec![font.resource().into(), size.into()]),
            Operation::new("Td", vec![MARGIN.into(), y.into()]),
            Operation::new(
                "Tj",
                vec![Object::String(encode_win_ansi(text), StringFormat::Literal)],
            ),
            Operation::new("ET", vec![]),
        ]);
    }

    fn gap(&mut self, points: f32) {
        self.y -= points;
    }

    fn reserve(&mut self, height: f32) {
        if self.y - height < MARGIN && !self.current_page_is_empty() {
            self.pages.push(Vec::new());
            self.y = PAGE_HEIGHT - MARGIN;
        }
    }

    fn current_page_is_empty(&self) -> bool {
        self.pages.last().map_or(true, Vec::is_empty)
    }

    fn current_page(&mut self) -> &mut Vec<Operation> {
        if self.pages.is_empty() {
            self.pages.push(Vec::new());
        }
        let last = self.pages.len() - 1;
        &mut self.pages[last]
    }

    fn finish(self) -> Result<Vec<u8>, RenderError> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let regular_id = add_font(&mut doc, Font::Regular);
        let bold_id = add_font(&mut doc, Font::Bold);
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                Font::Regular.resource() => regular_id,
                Font::Bold.resource() => bold_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for operations in self.pages {
            let content = Content { operations };
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
            let page_id = doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
                "Resources" => resources_id,
            });
            kids.push(page_id.into());
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
                "Resources" => resources_id,
                "MediaBox" => vec![0.into(), 0.into(), PAGE_WIDTH.into(), PAGE_HEIGHT.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut out = Vec::new();
        doc.save_to(&mut out)?;
        Ok(out)
    }
}

fn add_font(doc: &mut Document, font: Font) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => font.base_font(),
        "Encoding" => "WinAnsiEncoding",
    })
}
