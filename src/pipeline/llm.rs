//! Inference gateway: the only stage that talks to an external AI service.
//!
//! [`InferenceGateway`] is the seam between the pipeline and any provider.
//! It has two operations, one per pipeline stage, both taking a finished
//! [`PromptSpec`] and returning the model's raw text. The production
//! implementation, [`LlmGateway`], drives an `edgequake_llm` provider; tests
//! plug in a deterministic stub.
//!
//! ## No retries
//!
//! Each call is a single attempt. A failed extraction or generation is
//! reported to the caller, who decides whether to ask the user to try again.

use crate::config::AppealConfig;
use crate::error::AppealError;
use crate::pipeline::encode::to_image_data;
use crate::prompts::PromptSpec;
use async_trait::async_trait;
use edgequake_llm::{ChatMessage, CompletionOptions, LLMProvider, ProviderFactory};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Default model when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";

/// Boundary to the external AI capability.
#[async_trait]
pub trait InferenceGateway: Send + Sync {
    /// Ask for a structured (JSON) answer. Used by fine extraction.
    async fn extract_structured(&self, prompt: &PromptSpec) -> Result<String, AppealError>;

    /// Ask for free text. Used by appeal generation.
    async fn generate_text(&self, prompt: &PromptSpec) -> Result<String, AppealError>;
}

/// [`InferenceGateway`] backed by an `edgequake_llm` provider.
pub struct LlmGateway {
    provider: Arc<dyn LLMProvider>,
    extraction_options: CompletionOptions,
    generation_options: CompletionOptions,
}

impl LlmGateway {
    /// Wrap an already constructed provider.
    pub fn new(provider: Arc<dyn LLMProvider>, config: &AppealConfig) -> Self {
        Self {
            provider,
            extraction_options: build_options(
                config.extraction_temperature,
                config.extraction_max_tokens,
            ),
            generation_options: build_options(
                config.generation_temperature,
                config.generation_max_tokens,
            ),
        }
    }

    /// Resolve the provider from configuration and environment.
    ///
    /// Fails with [`AppealError::ProviderNotConfigured`] when no credentials
    /// can be found.
    pub fn from_config(config: &AppealConfig) -> Result<Self, AppealError> {
        let provider = resolve_provider(config)?;
        Ok(Self::new(provider, config))
    }

    async fn infer(
        &self,
        prompt: &PromptSpec,
        options: &CompletionOptions,
    ) -> Result<String, AppealError> {
        let start = Instant::now();
        let messages = build_messages(prompt);

        let response = self
            .provider
            .chat(&messages, Some(options))
            .await
            .map_err(|e| {
                warn!("LLM call failed: {}", e);
                AppealError::LlmApiError {
                    message: e.to_string(),
                }
            })?;

        debug!(
            "{} input tokens, {} output tokens, {:?}",
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );

        if response.content.trim().is_empty() {
            return Err(AppealError::EmptyResponse);
        }
        Ok(response.content)
    }
}

#[async_trait]
impl InferenceGateway for LlmGateway {
    async fn extract_structured(&self, prompt: &PromptSpec) -> Result<String, AppealError> {
        self.infer(prompt, &self.extraction_options).await
    }

    async fn generate_text(&self, prompt: &PromptSpec) -> Result<String, AppealError> {
        self.infer(prompt, &self.generation_options).await
    }
}

/// Build the chat messages for a prompt.
///
/// System message first, then one user message carrying the text and, for
/// photos, the image attachment.
fn build_messages(prompt: &PromptSpec) -> Vec<ChatMessage> {
    let user = match &prompt.image {
        Some(image) => ChatMessage::user_with_images(prompt.user.clone(), vec![to_image_data(image)]),
        None => ChatMessage::user(prompt.user.clone()),
    };
    vec![ChatMessage::system(prompt.system.clone()), user]
}

fn build_options(temperature: f32, max_tokens: usize) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(temperature),
        max_tokens: Some(max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, AppealError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        AppealError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** (`EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`).
/// 4. **OpenAI key present** (`OPENAI_API_KEY`), preferred when several
///    provider keys are set.
/// 5. **Full auto-detection** (`ProviderFactory::from_env`).
pub fn resolve_provider(config: &AppealConfig) -> Result<Arc<dyn LLMProvider>, AppealError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        info!("Using provider '{}' with model '{}'", name, model);
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            info!("Using provider '{}' with model '{}' from environment", prov, env_model);
            return create_provider(&prov, &env_model);
        }
    }

    if let Ok(openai_key) = std::env::var("OPENAI_API_KEY") {
        if !openai_key.is_empty() {
            info!("Using provider 'openai' with model '{}'", model);
            return create_provider("openai", model);
        }
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| AppealError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set OPENAI_API_KEY, ANTHROPIC_API_KEY, or configure a provider.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
