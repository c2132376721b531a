//! Export rendering: appeal text with inline markup → paginated PDF.
//!
//! ```text
//! AppealDocument ──▶ markup ──▶ layout (2 passes) ──▶ pdf
//!                    (segments)  (pages, footers)     (bytes)
//! ```
//!
//! * [`markup`]  — per-line `**bold**` / `_italic_` parsing
//! * [`metrics`] — Helvetica advance widths for wrapping and x-offsets
//! * [`layout`]  — word wrap, pagination, header block, page footers
//! * [`pdf`]     — lopdf serialisation and file naming
//!
//! Layout is pure and deterministic; only [`pdf::save_pdf`] touches disk.

pub mod layout;
pub mod markup;
pub mod metrics;
pub mod pdf;

use crate::error::AppealError;
use crate::model::AppealDocument;

pub use layout::{layout_document, RenderedDocument, RenderedPage};
pub use markup::{parse_line, MarkupMode, Segment};
pub use pdf::{export_file_name, save_pdf, write_pdf};

/// A4 portrait in PDF points.
pub const A4_WIDTH: f32 = 595.28;
pub const A4_HEIGHT: f32 = 841.89;

/// Page geometry and typography for exported appeals.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutConfig {
    pub page_width: f32,
    pub page_height: f32,
    /// Same margin on all four sides. Footers sit inside the bottom margin.
    pub margin: f32,
    pub font_size: f32,
    /// Baseline-to-baseline distance for body text.
    pub line_height: f32,
    pub title_font_size: f32,
    pub footer_font_size: f32,
    /// Document title on page 1 and the running title on later pages.
    pub title: String,
    /// Name stamped in the `"<generator> - page i of n"` footer.
    pub generator: String,
    pub markup_mode: MarkupMode,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            page_width: A4_WIDTH,
            page_height: A4_HEIGHT,
            margin: 56.69,
            font_size: 11.0,
            line_height: 16.0,
            title_font_size: 18.0,
            footer_font_size: 8.0,
            title: "Traffic Fine Appeal".to_string(),
            generator: "fine-appeal".to_string(),
            markup_mode: MarkupMode::default(),
        }
    }
}

impl LayoutConfig {
    /// Horizontal space available to body text.
    pub fn usable_width(&self) -> f32 {
        (self.page_width - 2.0 * self.margin).max(self.font_size)
    }
}

/// Lay out `doc` and serialise it as PDF bytes.
pub fn export_pdf(doc: &AppealDocument, config: &LayoutConfig) -> Result<Vec<u8>, AppealError> {
    let rendered = layout_document(doc, config);
    write_pdf(&rendered)
}
