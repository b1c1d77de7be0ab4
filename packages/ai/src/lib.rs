#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Text generation for groundwater answers.
//!
//! Supports Google Gemini and any `OpenAI`-compatible chat completion
//! server (including local ones via `AI_BASE_URL`) behind a common
//! [`providers::LlmProvider`] trait. Generated text is treated as
//! untrusted: [`insight::parse_insight`] pulls an optional JSON block out of
//! it and substitutes fixed placeholder stats and chart content for
//! anything missing or malformed.

pub mod insight;
pub mod prompt;
pub mod providers;

use thiserror::Error;

/// Errors that can occur during AI operations.
#[derive(Debug, Error)]
pub enum AiError {
    /// HTTP request to the provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The provider answered with an error.
    #[error("Provider error: {message}")]
    Provider {
        /// Description of what went wrong.
        message: String,
    },

    /// The provider answered successfully but with no text.
    #[error("Empty response from {provider}")]
    EmptyResponse {
        /// Provider name.
        provider: String,
    },

    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description.
        message: String,
    },
}
