//! Pipeline stages for turning a fine document into an appeal.
//!
//! Each submodule implements exactly one step so each can be tested on its
//! own and swapped (the extractor and the gateway are traits).
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ validate ──▶ extract ──▶ (prompts) ──▶ llm ──▶ parse
//! (path/URL)  (type/size)  (text|image)            (AI)    (JSON|text)
//!                            │
//!                          encode
//!                     (resize, JPEG, base64)
//! ```
//!
//! 1. [`input`]    — read a local file or download a URL (CLI only)
//! 2. [`validate`] — reject unsupported or oversized uploads before any work
//! 3. [`extract`]  — PDF text layer or transcoded image
//! 4. [`encode`]   — bounded resize + JPEG re-encode + base64 for the VLM
//! 5. [`llm`]      — the inference gateway; the only stage with network I/O
//! 6. [`parse`]    — strict JSON parsing for fine data, cleanup for appeal text

pub mod encode;
pub mod extract;
pub mod input;
pub mod llm;
pub mod parse;
pub mod validate;
