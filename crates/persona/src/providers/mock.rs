use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::sync::Mutex;

use crate::models::message::Message;
use crate::models::tool::Tool;
use crate::providers::base::{Provider, Usage};

/// A mock provider that returns pre-configured responses for testing. It
/// records the system prompt of every call so tests can assert call budgets
/// and prompt contents.
#[derive(Default)]
pub struct MockProvider {
    responses: Arc<Mutex<Vec<Message>>>,
    structured_responses: Arc<Mutex<Vec<Value>>>,
    completion_systems: Arc<Mutex<Vec<String>>>,
    structured_systems: Arc<Mutex<Vec<String>>>,
}

impl MockProvider {
    /// Create a new mock provider with a sequence of completion responses
    pub fn new(responses: Vec<Message>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses)),
            ..Default::default()
        }
    }

    /// Create a new mock provider with a sequence of structured responses
    pub fn new_structured(values: Vec<Value>) -> Self {
        Self {
            structured_responses: Arc::new(Mutex::new(values)),
            ..Default::default()
        }
    }

    /// Number of completion calls made so far
    pub fn completion_calls(&self) -> usize {
        self.completion_systems.lock().unwrap().len()
    }

    /// Number of structured calls made so far
    pub fn structured_calls(&self) -> usize {
        self.structured_systems.lock().unwrap().len()
    }

    /// System prompts received by completion calls, in order
    pub fn completion_systems(&self) -> Vec<String> {
        self.completion_systems.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for MockProvider {
    async fn complete(
        &self,
        system: &str,
        _messages: &[Message],
        _tools: &[Tool],
    ) -> Result<(Message, Usage)> {
        self.completion_systems
            .lock()
            .unwrap()
            .push(system.to_string());

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            // Return empty response if no more pre-configured responses
            Ok((Message::assistant().with_text(""), Usage::default()))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }

    async fn complete_structured(
        &self,
        system: &str,
        _messages: &[Message],
        _schema_name: &str,
        _schema: &Value,
    ) -> Result<(Value, Usage)> {
        self.structured_systems
            .lock()
            .unwrap()
            .push(system.to_string());

        let mut responses = self.structured_responses.lock().unwrap();
        if responses.is_empty() {
            Err(anyhow!("No more structured responses configured"))
        } else {
            Ok((responses.remove(0), Usage::default()))
        }
    }
}
