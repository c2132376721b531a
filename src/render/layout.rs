//! Two-pass page layout.
//!
//! **Pass 1** walks the appeal text line by line, parses markup, word-wraps
//! to the usable width and assigns every wrapped line a baseline. When the
//! next baseline would fall below the bottom margin a new page starts.
//!
//! **Pass 2** knows the final page count and stamps each page with its header
//! (title block on page 1, running title afterwards) and its footer
//! (reference/date metadata plus the centered `"<generator> - page i of n"`).
//!
//! All y coordinates are baselines measured from the *top* of the page; the
//! PDF writer flips them.

use crate::model::AppealDocument;
use crate::render::markup::{parse_line, Segment};
use crate::render::metrics::{text_width, FontStyle};
use crate::render::LayoutConfig;
use tracing::debug;

/// A positioned piece of header or footer text.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub x: f32,
    pub y: f32,
    pub text: String,
    pub style: FontStyle,
    pub size: f32,
}

/// One styled run inside a body line.
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedSegment {
    /// Absolute x offset from the left page edge.
    pub x: f32,
    pub text: String,
    pub style: FontStyle,
}

/// A wrapped body line.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutLine {
    pub y: f32,
    pub segments: Vec<PlacedSegment>,
}

impl LaidOutLine {
    /// Text of the line without styling.
    pub fn plain_text(&self) -> String {
        self.segments.iter().map(|s| s.text.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageHeader {
    /// Title, reference and date, followed by a horizontal rule.
    TitleBlock { runs: Vec<TextRun>, divider_y: f32 },
    /// Small title repeated on continuation pages.
    RunningTitle(TextRun),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PageFooter {
    /// Reference number and date, left aligned.
    pub metadata: TextRun,
    /// `"<generator> - page i of n"`, centered.
    pub page_label: TextRun,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage {
    /// 1-based.
    pub number: usize,
    pub header: PageHeader,
    pub lines: Vec<LaidOutLine>,
    pub footer: PageFooter,
}

/// A fully laid out export document.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedDocument {
    pub page_width: f32,
    pub page_height: f32,
    pub margin: f32,
    pub font_size: f32,
    pub title: String,
    pub generator: String,
    pub pages: Vec<RenderedPage>,
}

impl RenderedDocument {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}

/// Lay out an appeal for export. Always yields at least one page.
pub fn layout_document(doc: &AppealDocument, config: &LayoutConfig) -> RenderedDocument {
    let drafts = paginate(&doc.appeal_text, config);
    let total = drafts.len();
    debug!("Laid out appeal on {} page(s)", total);

    let pages = drafts
        .into_iter()
        .enumerate()
        .map(|(i, lines)| {
            let number = i + 1;
            RenderedPage {
                number,
                header: if number == 1 {
                    title_block(doc, config)
                } else {
                    running_title(doc, config)
                },
                lines,
                footer: footer(doc, config, number, total),
            }
        })
        .collect();

    RenderedDocument {
        page_width: config.page_width,
        page_height: config.page_height,
        margin: config.margin,
        font_size: config.font_size,
        title: config.title.clone(),
        generator: config.generator.clone(),
        pages,
    }
}

// ── Pass 1: body ─────────────────────────────────────────────────────────

fn paginate(text: &str, config: &LayoutConfig) -> Vec<Vec<LaidOutLine>> {
    let bottom = config.page_height - config.margin;
    let mut pages = Vec::new();
    let mut current: Vec<LaidOutLine> = Vec::new();
    let mut cursor = first_body_top(config);

    for source in text.lines() {
        if source.trim().is_empty() {
            // Paragraph spacing only; a blank line never opens a page.
            if !current.is_empty() {
                cursor += config.line_height;
            }
            continue;
        }

        let segments = parse_line(source, config.markup_mode);
        for wrapped in wrap_line(&segments, config) {
            if cursor > bottom {
                pages.push(std::mem::take(&mut current));
                cursor = continuation_body_top(config);
            }
            current.push(LaidOutLine {
                y: cursor,
                segments: wrapped,
            });
            cursor += config.line_height;
        }
    }
    pages.push(current);
    pages
}

fn title_y(config: &LayoutConfig) -> f32 {
    config.margin + config.title_font_size
}

fn divider_y(config: &LayoutConfig) -> f32 {
    title_y(config) + config.line_height * 3.25
}

fn first_body_top(config: &LayoutConfig) -> f32 {
    divider_y(config) + config.line_height * 1.5
}

fn continuation_body_top(config: &LayoutConfig) -> f32 {
    config.margin + config.footer_font_size + config.line_height * 1.5
}

/// A word and the style of the whitespace in front of it.
struct Word {
    space_style: FontStyle,
    pieces: Vec<(String, FontStyle)>,
}

impl Word {
    fn width(&self, size: f32) -> f32 {
        self.pieces
            .iter()
            .map(|(text, style)| text_width(text, *style, size))
            .sum()
    }
}

/// Break styled segments into words. Runs of whitespace collapse to one.
fn split_words(segments: &[Segment]) -> Vec<Word> {
    let mut words = Vec::new();
    let mut space_style = FontStyle::Regular;
    let mut pieces: Vec<(String, FontStyle)> = Vec::new();

    for segment in segments {
        let style = segment.style();
        for c in segment.text.chars() {
            if c.is_whitespace() {
                if !pieces.is_empty() {
                    words.push(Word {
                        space_style,
                        pieces: std::mem::take(&mut pieces),
                    });
                }
                space_style = style;
                continue;
            }
            match pieces.last_mut() {
                Some((text, s)) if *s == style => text.push(c),
                _ => pieces.push((c.to_string(), style)),
            }
        }
    }
    if !pieces.is_empty() {
        words.push(Word {
            space_style,
            pieces,
        });
    }
    words
}

struct LineBuilder {
    segments: Vec<PlacedSegment>,
    x: f32,
    left: f32,
    size: f32,
}

impl LineBuilder {
    fn new(left: f32, size: f32) -> Self {
        Self {
            segments: Vec::new(),
            x: left,
            left,
            size,
        }
    }

    fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    fn used(&self) -> f32 {
        self.x - self.left
    }

    fn push(&mut self, text: &str, style: FontStyle) {
        let width = text_width(text, style, self.size);
        match self.segments.last_mut() {
            Some(last) if last.style == style => last.text.push_str(text),
            _ => self.segments.push(PlacedSegment {
                x: self.x,
                text: text.to_string(),
                style,
            }),
        }
        self.x += width;
    }

    fn finish(&mut self) -> Vec<PlacedSegment> {
        self.x = self.left;
        std::mem::take(&mut self.segments)
    }
}

/// Greedy word wrap of one source line.
fn wrap_line(segments: &[Segment], config: &LayoutConfig) -> Vec<Vec<PlacedSegment>> {
    let size = config.font_size;
    let max = config.usable_width();
    let space = text_width(" ", FontStyle::Regular, size);

    let mut lines = Vec::new();
    let mut line = LineBuilder::new(config.margin, size);

    for word in split_words(segments) {
        let width = word.width(size);

        if !line.is_empty() && line.used() + space + width > max {
            lines.push(line.finish());
        }
        if !line.is_empty() {
            line.push(" ", word.space_style);
        }

        if width <= max {
            for (text, style) in &word.pieces {
                line.push(text, *style);
            }
            continue;
        }

        // Longer than a whole line: hard break between characters.
        for (text, style) in &word.pieces {
            for c in text.chars() {
                let mut buf = [0u8; 4];
                let ch: &str = c.encode_utf8(&mut buf);
                if !line.is_empty() && line.used() + text_width(ch, *style, size) > max {
                    lines.push(line.finish());
                }
                line.push(ch, *style);
            }
        }
    }
    if !line.is_empty() {
        lines.push(line.finish());
    }
    lines
}

// ── Pass 2: headers and footers ──────────────────────────────────────────

fn title_block(doc: &AppealDocument, config: &LayoutConfig) -> PageHeader {
    let title_y = title_y(config);
    let mut runs = vec![TextRun {
        x: config.margin,
        y: title_y,
        text: config.title.clone(),
        style: FontStyle::Bold,
        size: config.title_font_size,
    }];

    let details = [
        ("Reference: ", doc.reference_number.trim(), 1.5),
        ("Date: ", doc.date.trim(), 2.5),
    ];
    for (label, value, offset) in details {
        if value.is_empty() {
            continue;
        }
        runs.push(TextRun {
            x: config.margin,
            y: title_y + config.line_height * offset,
            text: format!("{label}{value}"),
            style: FontStyle::Regular,
            size: config.font_size,
        });
    }

    PageHeader::TitleBlock {
        runs,
        divider_y: divider_y(config),
    }
}

fn running_title(doc: &AppealDocument, config: &LayoutConfig) -> PageHeader {
    let reference = doc.reference_number.trim();
    let text = if reference.is_empty() {
        config.title.clone()
    } else {
        format!("{} - {}", config.title, reference)
    };
    PageHeader::RunningTitle(TextRun {
        x: config.margin,
        y: config.margin + config.footer_font_size,
        text,
        style: FontStyle::Italic,
        size: config.footer_font_size,
    })
}

/// `"Reference: X  |  Date: Y"`, omitting empty parts.
fn footer_metadata(doc: &AppealDocument) -> String {
    let mut parts = Vec::new();
    if !doc.reference_number.trim().is_empty() {
        parts.push(format!("Reference: {}", doc.reference_number.trim()));
    }
    if !doc.date.trim().is_empty() {
        parts.push(format!("Date: {}", doc.date.trim()));
    }
    parts.join("  |  ")
}

fn footer(doc: &AppealDocument, config: &LayoutConfig, number: usize, total: usize) -> PageFooter {
    let size = config.footer_font_size;
    let metadata_y = config.page_height - config.margin + size * 2.5;
    let label = format!("{} - page {} of {}", config.generator, number, total);
    let label_width = text_width(&label, FontStyle::Regular, size);

    PageFooter {
        metadata: TextRun {
            x: config.margin,
            y: metadata_y,
            text: footer_metadata(doc),
            style: FontStyle::Regular,
            size,
        },
        page_label: TextRun {
            x: ((config.page_width - label_width) / 2.0).max(0.0),
            y: metadata_y + size * 1.75,
            text: label,
            style: FontStyle::Regular,
            size,
        },
    }
}
