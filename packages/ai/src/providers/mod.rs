//! Text-generation provider abstraction and implementations.
//!
//! Supports Google Gemini and `OpenAI`-compatible servers via a common
//! trait.

pub mod gemini;
pub mod openai;

use crate::AiError;

/// Trait for text-generation providers.
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Short provider name for logs and error messages.
    fn name(&self) -> &'static str;

    /// Generates free text for a fully composed prompt.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] if the request fails or the provider returns no
    /// text.
    async fn generate(&self, prompt: &str) -> Result<String, AiError>;
}

/// Provider settings, normally read from the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Explicit provider name (`AI_PROVIDER`).
    pub provider: Option<String>,
    /// Gemini key (`GEMINI_API_KEY`).
    pub gemini_api_key: Option<String>,
    /// `OpenAI` key (`OPENAI_API_KEY`).
    pub openai_api_key: Option<String>,
    /// Model override (`AI_MODEL`).
    pub model: Option<String>,
    /// API base URL override (`AI_BASE_URL`).
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// Reads provider settings from the environment. Empty values count as
    /// unset.
    #[must_use]
    pub fn from_env() -> Self {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());
        Self {
            provider: var("AI_PROVIDER"),
            gemini_api_key: var("GEMINI_API_KEY"),
            openai_api_key: var("OPENAI_API_KEY"),
            model: var("AI_MODEL"),
            base_url: var("AI_BASE_URL"),
        }
    }

    /// Picks a provider name: the explicit one, else the first provider
    /// whose key is present (Gemini, then `OpenAI`), else `openai` when only
    /// a base URL is set (a local server needs no key).
    fn detect_provider(&self) -> Option<String> {
        if let Some(provider) = &self.provider {
            return Some(provider.to_lowercase());
        }
        if self.gemini_api_key.is_some() {
            log::info!("Auto-detected AI provider: Gemini (GEMINI_API_KEY found)");
            return Some("gemini".to_string());
        }
        if self.openai_api_key.is_some() {
            log::info!("Auto-detected AI provider: OpenAI (OPENAI_API_KEY found)");
            return Some("openai".to_string());
        }
        if self.base_url.is_some() {
            log::info!("Auto-detected AI provider: OpenAI-compatible server (AI_BASE_URL found)");
            return Some("openai".to_string());
        }
        None
    }
}

/// Creates a provider from explicit settings.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no provider can be determined, the
/// requested provider is unknown, or its key is missing.
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn LlmProvider>, AiError> {
    let provider = config.detect_provider().ok_or_else(|| AiError::Config {
        message: "No AI credentials found. Set GEMINI_API_KEY, OPENAI_API_KEY, or AI_BASE_URL."
            .to_string(),
    })?;

    match provider.as_str() {
        "gemini" | "google" => {
            let api_key = config.gemini_api_key.clone().ok_or_else(|| AiError::Config {
                message: "GEMINI_API_KEY environment variable not set".to_string(),
            })?;
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_MODEL.to_string());
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| gemini::DEFAULT_BASE_URL.to_string());
            Ok(Box::new(gemini::GeminiProvider::new(api_key, model, base_url)))
        }
        "openai" | "gpt" => {
            let base_url = config
                .base_url
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string());
            let api_key = match (&config.openai_api_key, &config.base_url) {
                (Some(key), _) => Some(key.clone()),
                (None, Some(_)) => None,
                (None, None) => {
                    return Err(AiError::Config {
                        message: "OPENAI_API_KEY environment variable not set".to_string(),
                    });
                }
            };
            let model = config
                .model
                .clone()
                .unwrap_or_else(|| openai::DEFAULT_MODEL.to_string());
            Ok(Box::new(openai::OpenAiProvider::new(api_key, model, base_url)))
        }
        other => Err(AiError::Config {
            message: format!("Unknown AI provider: {other}. Use 'gemini' or 'openai'."),
        }),
    }
}

/// Creates a provider based on environment variables.
///
/// If `AI_PROVIDER` is set, uses that provider. Otherwise auto-detects from
/// available credentials: `GEMINI_API_KEY`, then `OPENAI_API_KEY`, then a
/// bare `AI_BASE_URL` for a self-hosted `OpenAI`-compatible server.
///
/// # Errors
///
/// Returns [`AiError::Config`] if no credentials are found or the
/// explicitly requested provider is not configured.
pub fn create_provider_from_env() -> Result<Box<dyn LlmProvider>, AiError> {
    create_provider(&ProviderConfig::from_env())
}
