use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::message::Message;
use crate::models::tool::Tool;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: Option<i32>,
    pub output_tokens: Option<i32>,
    pub total_tokens: Option<i32>,
}

impl Usage {
    pub fn new(
        input_tokens: Option<i32>,
        output_tokens: Option<i32>,
        total_tokens: Option<i32>,
    ) -> Self {
        Self {
            input_tokens,
            output_tokens,
            total_tokens,
        }
    }
}

/// Base trait for chat completion providers (OpenAI, Gemini via its
/// OpenAI-compatible endpoint, etc)
#[async_trait]
pub trait Provider: Send + Sync {
    /// Generate the next message from the conversation so far, advertising
    /// the given tools
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)>;

    /// Generate a response constrained to the given JSON schema. An
    /// unparseable body is an error, never silently coerced.
    async fn complete_structured(
        &self,
        system: &str,
        messages: &[Message],
        schema_name: &str,
        schema: &Value,
    ) -> Result<(Value, Usage)>;
}
