//! PDF serialisation of a [`RenderedDocument`] with lopdf.
//!
//! The three Helvetica faces are referenced as base-14 Type1 fonts with
//! `WinAnsiEncoding`; text is converted to that single-byte encoding and
//! written as hex strings. Characters outside WinAnsi become `?`.

use crate::error::AppealError;
use crate::render::layout::{PageHeader, RenderedDocument, RenderedPage, TextRun};
use crate::render::metrics::FontStyle;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;
use tracing::{debug, info};

const FONT_STYLES: [FontStyle; 3] = [FontStyle::Regular, FontStyle::Bold, FontStyle::Italic];

/// Serialise laid-out pages to PDF bytes.
pub fn write_pdf(rendered: &RenderedDocument) -> Result<Vec<u8>, AppealError> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut fonts = Dictionary::new();
    for style in FONT_STYLES {
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => style.base_font(),
            "Encoding" => "WinAnsiEncoding",
        });
        fonts.set(style.resource_name(), font_id);
    }
    let resources_id = doc.add_object(dictionary! { "Font" => fonts });

    let media_box: Vec<Object> = vec![
        0.into(),
        0.into(),
        rendered.page_width.into(),
        rendered.page_height.into(),
    ];

    let mut kids = Vec::with_capacity(rendered.pages.len());
    for page in &rendered.pages {
        let content = page_content(rendered, page)?;
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => resources_id,
            "MediaBox" => media_box.clone(),
        });
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = info_dictionary(&mut doc, rendered);
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)
        .map_err(|e| AppealError::ExportFailed(format!("PDF save failed: {e}")))?;

    debug!("Wrote {} page(s), {} bytes", count, buf.len());
    Ok(buf)
}

fn info_dictionary(doc: &mut Document, rendered: &RenderedDocument) -> ObjectId {
    doc.add_object(dictionary! {
        "Title" => Object::String(encode_win_ansi(&rendered.title), StringFormat::Literal),
        "Producer" => Object::String(encode_win_ansi(&rendered.generator), StringFormat::Literal),
    })
}

fn page_content(rendered: &RenderedDocument, page: &RenderedPage) -> Result<Vec<u8>, AppealError> {
    let height = rendered.page_height;
    let mut ops = Vec::new();

    match &page.header {
        PageHeader::TitleBlock { runs, divider_y } => {
            for run in runs {
                push_run(&mut ops, run, height);
            }
            let y = height - divider_y;
            ops.push(Operation::new("w", vec![0.75_f32.into()]));
            ops.push(Operation::new("m", vec![rendered.margin.into(), y.into()]));
            ops.push(Operation::new(
                "l",
                vec![(rendered.page_width - rendered.margin).into(), y.into()],
            ));
            ops.push(Operation::new("S", vec![]));
        }
        PageHeader::RunningTitle(run) => push_run(&mut ops, run, height),
    }

    for line in &page.lines {
        for segment in &line.segments {
            push_text(
                &mut ops,
                segment.x,
                height - line.y,
                &segment.text,
                segment.style,
                rendered.font_size,
            );
        }
    }

    if !page.footer.metadata.text.is_empty() {
        push_run(&mut ops, &page.footer.metadata, height);
    }
    push_run(&mut ops, &page.footer.page_label, height);

    Content { operations: ops }
        .encode()
        .map_err(|e| AppealError::ExportFailed(format!("content stream for page {}: {e}", page.number)))
}

fn push_run(ops: &mut Vec<Operation>, run: &TextRun, page_height: f32) {
    push_text(ops, run.x, page_height - run.y, &run.text, run.style, run.size);
}

fn push_text(ops: &mut Vec<Operation>, x: f32, y: f32, text: &str, style: FontStyle, size: f32) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new(
        "Tf",
        vec![Object::Name(style.resource_name().as_bytes().to_vec()), size.into()],
    ));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new(
        "Tj",
        vec![Object::String(encode_win_ansi(text), StringFormat::Hexadecimal)],
    ));
    ops.push(Operation::new("ET", vec![]));
}

/// Convert text to WinAnsi (Windows-1252) bytes.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| match c {
            '\t' => b' ',
            ' '..='~' => c as u8,
            '\u{00A0}'..='\u{00FF}' => c as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '\u{2018}' => 0x91,
            '\u{2019}' => 0x92,
            '\u{201C}' => 0x93,
            '\u{201D}' => 0x94,
            '•' => 0x95,
            '\u{2013}' => 0x96,
            '\u{2014}' => 0x97,
            _ => b'?',
        })
        .collect()
}

/// File name for an exported appeal: `appeal-<reference>.pdf`.
///
/// The reference is reduced to ASCII letters, digits, `-` and `_`; anything
/// else becomes a single `-`. An empty result gives `appeal.pdf`.
pub fn export_file_name(reference_number: &str) -> String {
    let mut slug = String::new();
    for c in reference_number.trim().chars() {
        if c.is_ascii_alphanumeric() || c == '_' {
            slug.push(c);
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    let slug = slug.trim_matches('-');
    if slug.is_empty() {
        "appeal.pdf".to_string()
    } else {
        format!("appeal-{slug}.pdf")
    }
}

/// Write PDF bytes to `path` atomically (temp file + rename).
pub async fn save_pdf(bytes: &[u8], path: &Path) -> Result<(), AppealError> {
    let write_err = |e| AppealError::OutputWriteFailed {
        path: path.to_path_buf(),
        source: e,
    };

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(write_err)?;
    }

    let tmp_path = path.with_extension("pdf.tmp");
    tokio::fs::write(&tmp_path, bytes).await.map_err(write_err)?;
    tokio::fs::rename(&tmp_path, path).await.map_err(write_err)?;

    info!("Wrote {} ({} bytes)", path.display(), bytes.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AppealDocument, AppealType};
    use crate::render::{layout_document, LayoutConfig};

    fn appeal(text: &str) -> AppealDocument {
        AppealDocument {
            appeal_text: text.to_string(),
            reference_number: "PCN-4471".into(),
            date: "2024-03-02".into(),
            appeal_type: AppealType::Procedural,
        }
    }

    #[test]
    fn pdf_has_one_page_per_rendered_page() {
        let body = vec!["A sentence that repeats to fill the page with body text."; 120]
            .join("\n");
        let rendered = layout_document(&appeal(&body), &LayoutConfig::default());
        assert!(rendered.page_count() > 1);

        let bytes = write_pdf(&rendered).unwrap();
        assert!(bytes.starts_with(b"%PDF-"));
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), rendered.page_count());
    }

    #[test]
    fn pdf_text_contains_body_and_footer() {
        let rendered = layout_document(
            &appeal("This is **bold** and _italic_ text"),
            &LayoutConfig::default(),
        );
        let bytes = write_pdf(&rendered).unwrap();
        let text = pdf_extract::extract_text_from_mem(&bytes).unwrap();
        assert!(text.contains("bold"), "got: {text}");
        assert!(text.contains("italic"), "got: {text}");
        assert!(text.contains("page 1 of 1"), "got: {text}");
        assert!(text.contains("PCN-4471"), "got: {text}");
    }

    #[test]
    fn fonts_are_registered() {
        let rendered = layout_document(&appeal("Hi"), &LayoutConfig::default());
        let bytes = write_pdf(&rendered).unwrap();
        let raw = String::from_utf8_lossy(&bytes);
        assert!(raw.contains("Helvetica-Bold"));
        assert!(raw.contains("Helvetica-Oblique"));
        assert!(raw.contains("WinAnsiEncoding"));
    }

    #[test]
    fn win_ansi_mapping() {
        assert_eq!(encode_win_ansi("A£"), vec![b'A', 0xA3]);
        assert_eq!(encode_win_ansi("\u{2019}€"), vec![0x92, 0x80]);
        assert_eq!(encode_win_ansi("日"), vec![b'?']);
        assert_eq!(encode_win_ansi("a\tb"), b"a b".to_vec());
    }

    #[test]
    fn file_names() {
        assert_eq!(export_file_name("PCN-4471"), "appeal-PCN-4471.pdf");
        assert_eq!(export_file_name(" AB 12/34 "), "appeal-AB-12-34.pdf");
        assert_eq!(export_file_name("../../etc"), "appeal-etc.pdf");
        assert_eq!(export_file_name(""), "appeal.pdf");
        assert_eq!(export_file_name("///"), "appeal.pdf");
    }

    #[tokio::test]
    async fn save_is_atomic_and_creates_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("appeal.pdf");
        save_pdf(b"%PDF-1.7 test", &path).await.unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), b"%PDF-1.7 test");
        assert!(!path.with_extension("pdf.tmp").exists());
    }
}
