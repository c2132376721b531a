//! # fine-appeal
//!
//! Turn a traffic or parking fine into a formal appeal letter.
//!
//! A user uploads the fine (a PDF notice or a photo of it). The library reads
//! the fine's details with an LLM, writes an appeal tailored to the chosen
//! strategy, and renders that appeal into a paginated PDF for printing or
//! e-mailing.
//!
//! ## Pipeline Overview
//!
//! ```text
//! upload (PDF / JPEG / PNG)
//!  │
//!  ├─ 1. Validate  MIME type, size, magic bytes
//!  ├─ 2. Extract   PDF text layer, or resized JPEG for the vision model
//!  ├─ 3. Infer     structured-extraction call → JSON
//!  ├─ 4. Parse     strict six-field FineRecord
//!  │
//!  ├─ 5. Generate  strategy prompt → appeal text with **bold** / _italic_
//!  └─ 6. Export    markup → word wrap → pages → PDF
//! ```
//!
//! Every step either succeeds or fails with an [`AppealError`] whose
//! [`ErrorKind`] tells the caller what went wrong. Nothing is retried and no
//! stage makes up data.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use fine_appeal::{AppealComposer, AppealConfig, AppealOptions, AppealType, UploadedFile};
//! use fine_appeal::render::{export_pdf, LayoutConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from OPENAI_API_KEY / ANTHROPIC_API_KEY / ...
//!     let composer = AppealComposer::from_config(AppealConfig::default())?;
//!
//!     let bytes = std::fs::read("notice.pdf")?;
//!     let fine = composer
//!         .analyze_fine(UploadedFile::new(bytes, "application/pdf"))
//!         .await?;
//!
//!     let options = AppealOptions {
//!         appeal_type: AppealType::Factual,
//!         ..Default::default()
//!     };
//!     let appeal = composer.generate_appeal(&fine, &options).await?;
//!
//!     let pdf = export_pdf(&appeal, &LayoutConfig::default())?;
//!     std::fs::write(fine_appeal::render::export_file_name(&fine.reference_number), pdf)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature  | Default | Description |
//! |----------|---------|-------------|
//! | `cli`    | on      | The `fine-appeal` binary (clap + anyhow + tracing-subscriber + indicatif) |
//! | `server` | off     | The `fine-appeal-server` HTTP service (axum + tower-http) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod compose;
pub mod config;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod progress;
pub mod prompts;
pub mod render;
#[cfg(feature = "server")]
pub mod server;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use compose::AppealComposer;
pub use config::{AppealConfig, AppealConfigBuilder};
pub use error::{AppealError, ErrorKind};
pub use model::{
    AppealDocument, AppealOptions, AppealType, ExtractedContent, FileKind, FineRecord,
    ImagePayload, UploadedFile,
};
pub use pipeline::extract::{ContentExtractor, FileContentExtractor};
pub use pipeline::llm::{InferenceGateway, LlmGateway};
pub use pipeline::validate::FileValidator;
pub use progress::{NoopProgressCallback, PipelineProgressCallback, ProgressCallback, Stage};
pub use prompts::PromptSpec;
pub use render::{LayoutConfig, MarkupMode};
