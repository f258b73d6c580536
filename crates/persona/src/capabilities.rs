//! The built-in capabilities of the profile chatbot: recording visitor
//! contact details and recording questions the bot could not answer. Both
//! deliver a push notification and confirm with `{"recorded": "ok"}`.
use async_trait::async_trait;
use serde_json::{json, Value};
use std::sync::Arc;

use crate::errors::CapabilityResult;
use crate::models::tool::Tool;
use crate::notify::Notifier;
use crate::registry::{optional_str, required_str, Capability, CapabilityRegistry};

/// Build the registry the chatbot serves with.
pub fn default_registry(notifier: Arc<dyn Notifier>) -> CapabilityRegistry {
    let mut registry = CapabilityRegistry::new();
    registry.register(Box::new(RecordUserDetails::new(notifier.clone())));
    registry.register(Box::new(RecordUnknownQuestion::new(notifier)));
    registry
}

/// Records that a visitor is interested in being contacted.
pub struct RecordUserDetails {
    tool: Tool,
    notifier: Arc<dyn Notifier>,
}

impl RecordUserDetails {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let tool = Tool::new(
            "record_user_details",
            "Use this tool to record that a user is interested in being in touch and provided an email address",
            json!({
                "type": "object",
                "properties": {
                    "email": {
                        "type": "string",
                        "description": "The email address of this user"
                    },
                    "name": {
                        "type": "string",
                        "description": "The user's name, if they provided it"
                    },
                    "notes": {
                        "type": "string",
                        "description": "Any additional information about the conversation that's worth recording to give context"
                    }
                },
                "required": ["email"],
                "additionalProperties": false
            }),
        );
        Self { tool, notifier }
    }
}

#[async_trait]
impl Capability for RecordUserDetails {
    fn schema(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> CapabilityResult<Value> {
        let email = required_str(&arguments, "email")?;
        let name = optional_str(&arguments, "name", "Name not provided");
        let notes = optional_str(&arguments, "notes", "not provided");

        let note = format!(
            "Recording interest from {} with email {} and notes {}",
            name, email, notes
        );
        if let Err(e) = self.notifier.push(&note).await {
            tracing::warn!(error = %e, "push notification failed");
        }

        Ok(json!({"recorded": "ok"}))
    }
}

/// Records a question the bot could not answer.
pub struct RecordUnknownQuestion {
    tool: Tool,
    notifier: Arc<dyn Notifier>,
}

impl RecordUnknownQuestion {
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        let tool = Tool::new(
            "record_unknown_question",
            "Always use this tool to record any question that couldn't be answered as you didn't know the answer",
            json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The question that couldn't be answered"
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        );
        Self { tool, notifier }
    }
}

#[async_trait]
impl Capability for RecordUnknownQuestion {
    fn schema(&self) -> &Tool {
        &self.tool
    }

    async fn call(&self, arguments: Value) -> CapabilityResult<Value> {
        let question = required_str(&arguments, "question")?;

        let note = format!("Recording {} asked that I couldn't answer", question);
        if let Err(e) = self.notifier.push(&note).await {
            tracing::warn!(error = %e, "push notification failed");
        }

        Ok(json!({"recorded": "ok"}))
    }
}
