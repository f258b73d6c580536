use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use reqwest::StatusCode;
use serde_json::{json, Value};
use std::time::Duration;

use super::base::{Provider, Usage};
use super::configs::OpenAiProviderConfig;
use super::utils::{
    check_openai_context_length_error, messages_to_openai_spec, openai_response_to_message,
    openai_response_to_structured, tools_to_openai_spec,
};
use crate::models::message::Message;
use crate::models::tool::Tool;

pub struct OpenAiProvider {
    client: Client,
    config: OpenAiProviderConfig,
}

impl OpenAiProvider {
    pub fn new(config: OpenAiProviderConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn get_usage(data: &Value) -> Usage {
        let usage = match data.get("usage") {
            Some(usage) => usage,
            None => return Usage::default(),
        };

        let input_tokens = usage
            .get("prompt_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let output_tokens = usage
            .get("completion_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32);

        let total_tokens = usage
            .get("total_tokens")
            .and_then(|v| v.as_i64())
            .map(|v| v as i32)
            .or_else(|| match (input_tokens, output_tokens) {
                (Some(input), Some(output)) => Some(input + output),
                _ => None,
            });

        Usage::new(input_tokens, output_tokens, total_tokens)
    }

    /// POST the payload, retrying once on transport failure, rate limiting
    /// or a 5xx before surfacing a labeled error.
    async fn post(&self, payload: Value) -> Result<Value> {
        let url = format!(
            "{}/{}",
            self.config.host.trim_end_matches('/'),
            self.config.completions_path.trim_start_matches('/')
        );

        let mut last_error = None;
        for attempt in 0..2 {
            if attempt > 0 {
                tracing::warn!("retrying completion request after failure");
            }

            let response = match self
                .client
                .post(&url)
                .header("Authorization", format!("Bearer {}", self.config.api_key))
                .json(&payload)
                .send()
                .await
            {
                Ok(response) => response,
                Err(e) => {
                    last_error = Some(anyhow!("Transport error: {}", e));
                    continue;
                }
            };

            match response.status() {
                StatusCode::OK => return Ok(response.json().await?),
                status if status == StatusCode::TOO_MANY_REQUESTS || status.as_u16() >= 500 => {
                    last_error = Some(anyhow!("Server error: {}", status));
                }
                status => {
                    return Err(anyhow!("Request failed: {}", status));
                }
            }
        }

        Err(last_error.unwrap_or_else(|| anyhow!("Request failed")))
    }

    fn base_payload(&self, system: &str, messages: &[Message]) -> Value {
        let system_message = json!({
            "role": "system",
            "content": system
        });

        let mut messages_array = vec![system_message];
        messages_array.extend(messages_to_openai_spec(messages));

        let mut payload = json!({
            "model": self.config.model,
            "messages": messages_array
        });

        if let Some(temp) = self.config.temperature {
            payload
                .as_object_mut()
                .unwrap()
                .insert("temperature".to_string(), json!(temp));
        }
        if let Some(tokens) = self.config.max_tokens {
            payload
                .as_object_mut()
                .unwrap()
                .insert("max_tokens".to_string(), json!(tokens));
        }

        payload
    }

    fn check_error(response: &Value) -> Result<()> {
        if let Some(error) = response.get("error") {
            if let Some(err) = check_openai_context_length_error(error) {
                return Err(err.into());
            }
            return Err(anyhow!("OpenAI API error: {}", error));
        }
        Ok(())
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    async fn complete(
        &self,
        system: &str,
        messages: &[Message],
        tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        let mut payload = self.base_payload(system, messages);

        if !tools.is_empty() {
            let tools_spec = tools_to_openai_spec(tools)?;
            payload
                .as_object_mut()
                .unwrap()
                .insert("tools".to_string(), json!(tools_spec));
        }

        let response = self.post(payload).await?;
        Self::check_error(&response)?;

        let message = openai_response_to_message(&response)?;
        let usage = Self::get_usage(&response);

        Ok((message, usage))
    }

    async fn complete_structured(
        &self,
        system: &str,
        messages: &[Message],
        schema_name: &str,
        schema: &Value,
    ) -> Result<(Value, Usage)> {
        let mut payload = self.base_payload(system, messages);

        payload.as_object_mut().unwrap().insert(
            "response_format".to_string(),
            json!({
                "type": "json_schema",
                "json_schema": {
                    "name": schema_name,
                    "schema": schema,
                    "strict": true
                }
            }),
        );

        let response = self.post(payload).await?;
        Self::check_error(&response)?;

        let value = openai_response_to_structured(&response)?;
        let usage = Self::get_usage(&response);

        Ok((value, usage))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::message::MessageContent;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn setup_mock_server(response_body: Value) -> (MockServer, OpenAiProvider) {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(response_body))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new(
            mock_server.uri(),
            "test_api_key".to_string(),
            "gpt-4o-mini".to_string(),
        );

        let provider = OpenAiProvider::new(config).unwrap();
        (mock_server, provider)
    }

    #[tokio::test]
    async fn test_complete_basic() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-123",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": "Hello! How can I assist you today?",
                    "tool_calls": null
                },
                "finish_reason": "stop"
            }],
            "usage": {
                "prompt_tokens": 12,
                "completion_tokens": 15,
                "total_tokens": 27
            }
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::user().with_text("Hello?")];
        let (message, usage) = provider
            .complete("You are a helpful assistant.", &messages, &[])
            .await?;

        assert_eq!(message.text(), "Hello! How can I assist you today?");
        assert_eq!(usage.input_tokens, Some(12));
        assert_eq!(usage.output_tokens, Some(15));
        assert_eq!(usage.total_tokens, Some(27));

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_tool_request() -> Result<()> {
        let response_body = json!({
            "id": "chatcmpl-tool",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_123",
                        "type": "function",
                        "function": {
                            "name": "record_user_details",
                            "arguments": "{\"email\":\"a@b.com\"}"
                        }
                    }]
                },
                "finish_reason": "tool_calls"
            }],
            "usage": {
                "prompt_tokens": 20,
                "completion_tokens": 15,
                "total_tokens": 35
            }
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let messages = vec![Message::user().with_text("My email is a@b.com")];
        let tool = Tool::new(
            "record_user_details",
            "Record that a user wants to be in touch",
            json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "The email address of this user"
                    }
                },
                "required": ["email"]
            }),
        );

        let (message, _) = provider
            .complete("You are a helpful assistant.", &messages, &[tool])
            .await?;

        if let MessageContent::ToolRequest(request) = &message.content[0] {
            let tool_call = request.call.as_ref().unwrap();
            assert_eq!(tool_call.name, "record_user_details");
            assert_eq!(tool_call.arguments, json!({"email": "a@b.com"}));
        } else {
            panic!("Expected ToolRequest content");
        }

        Ok(())
    }

    #[tokio::test]
    async fn test_complete_structured() -> Result<()> {
        let response_body = json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": "{\"is_acceptable\": false, \"feedback\": \"too informal\"}"
                },
                "finish_reason": "stop"
            }]
        });

        let (_server, provider) = setup_mock_server(response_body).await;

        let schema = json!({
            "type": "object",
            "properties": {
                "is_acceptable": {"type": "boolean"},
                "feedback": {"type": "string"}
            },
            "required": ["is_acceptable", "feedback"],
            "additionalProperties": false
        });

        let messages = vec![Message::user().with_text("Evaluate this reply")];
        let (value, _) = provider
            .complete_structured("You are an evaluator.", &messages, "evaluation", &schema)
            .await?;

        assert_eq!(value["is_acceptable"], json!(false));
        assert_eq!(value["feedback"], json!("too informal"));

        Ok(())
    }

    #[tokio::test]
    async fn test_gemini_shaped_host_posts_to_unversioned_path() -> Result<()> {
        use crate::providers::configs::GEMINI_COMPLETIONS_PATH;

        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1beta/openai/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "{\"is_acceptable\": true, \"feedback\": \"fine\"}"
                    },
                    "finish_reason": "stop"
                }]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new(
            format!("{}/v1beta/openai", mock_server.uri()),
            "test_api_key".to_string(),
            "gemini-2.0-flash".to_string(),
        )
        .with_completions_path(GEMINI_COMPLETIONS_PATH);
        let provider = OpenAiProvider::new(config)?;

        let schema = json!({
            "type": "object",
            "properties": {
                "is_acceptable": {"type": "boolean"},
                "feedback": {"type": "string"}
            },
            "required": ["is_acceptable", "feedback"],
            "additionalProperties": false
        });

        let messages = vec![Message::user().with_text("Evaluate this reply")];
        let (value, _) = provider
            .complete_structured("You are an evaluator.", &messages, "evaluation", &schema)
            .await?;

        assert_eq!(value["is_acceptable"], json!(true));
        Ok(())
    }

    #[tokio::test]
    async fn test_retry_once_on_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": "Recovered"
                    },
                    "finish_reason": "stop"
                }]
            })))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new(
            mock_server.uri(),
            "test_api_key".to_string(),
            "gpt-4o-mini".to_string(),
        );
        let provider = OpenAiProvider::new(config)?;

        let messages = vec![Message::user().with_text("Hello?")];
        let (message, _) = provider.complete("system", &messages, &[]).await?;

        assert_eq!(message.text(), "Recovered");
        Ok(())
    }

    #[tokio::test]
    async fn test_fails_after_second_server_error() -> Result<()> {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let config = OpenAiProviderConfig::new(
            mock_server.uri(),
            "test_api_key".to_string(),
            "gpt-4o-mini".to_string(),
        );
        let provider = OpenAiProvider::new(config)?;

        let messages = vec![Message::user().with_text("Hello?")];
        let result = provider.complete("system", &messages, &[]).await;

        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("Server error"));
        Ok(())
    }
}
