use anyhow::{Context, Result};
use std::env;

pub const OPENAI_HOST: &str = "https://api.openai.com";
pub const OPENAI_DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const OPENAI_COMPLETIONS_PATH: &str = "v1/chat/completions";

pub const GEMINI_HOST: &str = "https://generativelanguage.googleapis.com/v1beta/openai";
pub const GEMINI_DEFAULT_MODEL: &str = "gemini-2.0-flash";
// Gemini's OpenAI-compatible surface carries the version in the host part,
// so completions hang directly off the base with no /v1 segment.
pub const GEMINI_COMPLETIONS_PATH: &str = "chat/completions";

/// Configuration for any OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiProviderConfig {
    pub host: String,
    pub completions_path: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<i32>,
}

impl OpenAiProviderConfig {
    pub fn new(host: String, api_key: String, model: String) -> Self {
        Self {
            host,
            completions_path: OPENAI_COMPLETIONS_PATH.to_string(),
            api_key,
            model,
            temperature: None,
            max_tokens: None,
        }
    }

    pub fn with_completions_path(mut self, path: &str) -> Self {
        self.completions_path = path.to_string();
        self
    }

    /// Primary provider from OPENAI_API_KEY (required), with optional
    /// OPENAI_HOST and PERSONA_MODEL overrides.
    pub fn from_env() -> Result<Self> {
        let api_key = env::var("OPENAI_API_KEY")
            .context("OPENAI_API_KEY environment variable must be set")?;
        let host = env::var("OPENAI_HOST").unwrap_or_else(|_| OPENAI_HOST.to_string());
        let model = env::var("PERSONA_MODEL").unwrap_or_else(|_| OPENAI_DEFAULT_MODEL.to_string());
        Ok(Self::new(host, api_key, model))
    }

    /// Judge provider: Gemini through its OpenAI-compatible endpoint when
    /// GOOGLE_API_KEY is set, otherwise falls back to the primary provider.
    pub fn judge_from_env() -> Result<Self> {
        match env::var("GOOGLE_API_KEY") {
            Ok(api_key) => {
                let host = env::var("GEMINI_HOST").unwrap_or_else(|_| GEMINI_HOST.to_string());
                let model = env::var("PERSONA_JUDGE_MODEL")
                    .unwrap_or_else(|_| GEMINI_DEFAULT_MODEL.to_string());
                Ok(Self::new(host, api_key, model)
                    .with_completions_path(GEMINI_COMPLETIONS_PATH))
            }
            Err(_) => Self::from_env(),
        }
    }
}
