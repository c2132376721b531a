//! Process-wide configuration for the appeal pipeline.
//!
//! One [`AppealConfig`] is built at startup and shared (read-only) by every
//! request through [`crate::compose::AppealComposer`]. It holds the inference
//! provider selection, upload limits, image transcoding parameters and the
//! per-call wall-clock timeout. Page layout for exports lives separately in
//! [`crate::render::LayoutConfig`] because it has nothing to do with inference.

use crate::error::AppealError;
use crate::progress::ProgressCallback;
use edgequake_llm::LLMProvider;
use std::fmt;
use std::sync::Arc;

/// Default upload ceiling: 10 MB.
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 10 * 1024 * 1024;

/// Configuration for the appeal pipeline.
///
/// Built via [`AppealConfig::builder()`] or using [`AppealConfig::default()`].
///
/// # Example
/// ```rust
/// use fine_appeal::AppealConfig;
///
/// let config = AppealConfig::builder()
///     .model("gpt-4.1-mini")
///     .timeout_secs(30)
///     .build()
///     .unwrap();
/// assert_eq!(config.timeout_secs, 30);
/// ```
#[derive(Clone)]
pub struct AppealConfig {
    /// LLM model identifier, e.g. "gpt-4.1-mini". If None, a default is used.
    pub model: Option<String>,

    /// LLM provider name (e.g. "openai", "anthropic", "ollama").
    /// If None along with `provider`, the provider is auto-detected.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature for structured extraction. Default: 0.0.
    ///
    /// Extraction is transcription; any creativity is a bug.
    pub extraction_temperature: f32,

    /// Sampling temperature for appeal generation. Default: 0.7.
    pub generation_temperature: f32,

    /// Maximum tokens for the structured extraction answer. Default: 1024.
    pub extraction_max_tokens: usize,

    /// Maximum tokens for the generated appeal. Default: 4096.
    pub generation_max_tokens: usize,

    /// Upload size ceiling in bytes. Default: 10 MB.
    pub max_upload_bytes: u64,

    /// Longest edge of a transcoded image in pixels. Default: 1200.
    pub max_image_dimension: u32,

    /// JPEG quality used when re-encoding images (1–100). Default: 80.
    pub jpeg_quality: u8,

    /// Character budget for document text sent to the model. Default: 20 000.
    pub max_text_chars: usize,

    /// Wall-clock limit for one `analyze_fine` / `generate_appeal` call in seconds. Default: 60.
    pub timeout_secs: u64,

    /// Download timeout for URL inputs in seconds. Default: 120.
    pub download_timeout_secs: u64,

    /// Stage progress observer.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for AppealConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            extraction_temperature: 0.0,
            generation_temperature: 0.7,
            extraction_max_tokens: 1024,
            generation_max_tokens: 4096,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            max_image_dimension: 1200,
            jpeg_quality: 80,
            max_text_chars: 20_000,
            timeout_secs: 60,
            download_timeout_secs: 120,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for AppealConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppealConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("extraction_temperature", &self.extraction_temperature)
            .field("generation_temperature", &self.generation_temperature)
            .field("extraction_max_tokens", &self.extraction_max_tokens)
            .field("generation_max_tokens", &self.generation_max_tokens)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("max_image_dimension", &self.max_image_dimension)
            .field("jpeg_quality", &self.jpeg_quality)
            .field("max_text_chars", &self.max_text_chars)
            .field("timeout_secs", &self.timeout_secs)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn PipelineProgressCallback>"),
            )
            .finish()
    }
}

impl AppealConfig {
    /// Create a new builder for `AppealConfig`.
    pub fn builder() -> AppealConfigBuilder {
        AppealConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`AppealConfig`].
#[derive(Debug)]
pub struct AppealConfigBuilder {
    config: AppealConfig,
}

impl AppealConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn extraction_temperature(mut self, t: f32) -> Self {
        self.config.extraction_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn generation_temperature(mut self, t: f32) -> Self {
        self.config.generation_temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn extraction_max_tokens(mut self, n: usize) -> Self {
        self.config.extraction_max_tokens = n;
        self
    }

    pub fn generation_max_tokens(mut self, n: usize) -> Self {
        self.config.generation_max_tokens = n;
        self
    }

    pub fn max_upload_bytes(mut self, n: u64) -> Self {
        self.config.max_upload_bytes = n;
        self
    }

    pub fn max_image_dimension(mut self, px: u32) -> Self {
        self.config.max_image_dimension = px.max(64);
        self
    }

    pub fn jpeg_quality(mut self, q: u8) -> Self {
        self.config.jpeg_quality = q.clamp(1, 100);
        self
    }

    pub fn max_text_chars(mut self, n: usize) -> Self {
        self.config.max_text_chars = n;
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.config.timeout_secs = secs;
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<AppealConfig, AppealError> {
        let c = &self.config;
        if c.max_upload_bytes == 0 {
            return Err(AppealError::InvalidConfig(
                "Upload limit must be greater than zero".into(),
            ));
        }
        if c.timeout_secs == 0 {
            return Err(AppealError::InvalidConfig(
                "Timeout must be at least 1 second".into(),
            ));
        }
        if c.extraction_max_tokens == 0 || c.generation_max_tokens == 0 {
            return Err(AppealError::InvalidConfig(
                "Max tokens must be greater than zero".into(),
            ));
        }
        if c.max_text_chars == 0 {
            return Err(AppealError::InvalidConfig(
                "Text budget must be greater than zero".into(),
            ));
        }
        Ok(self.config)
    }
}
