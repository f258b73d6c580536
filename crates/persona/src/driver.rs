use anyhow::Result;
use std::sync::Arc;
use thiserror::Error;

use crate::models::message::{Message, ToolRequest};
use crate::providers::base::Provider;
use crate::registry::CapabilityRegistry;

/// Tool rounds allowed within a single turn. Termination of the tool loop
/// is otherwise entirely the model's own stop signal, so a misbehaving
/// model or tool would loop forever without this cap.
pub const MAX_TOOL_ROUNDS: usize = 8;

#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Model was still requesting tools after {0} rounds, aborting the turn")]
    ToolRoundsExceeded(usize),
}

/// The messages appended during one turn, plus the final reply text. The
/// caller extends its own history with `messages` to stay in sync.
#[derive(Debug, Clone)]
pub struct ConversationTurn {
    pub reply: String,
    pub messages: Vec<Message>,
}

/// Owns one end-user conversation turn: sends the running message sequence
/// to the provider, and as long as the model requests tool invocations,
/// dispatches them through the registry and loops. Works on a local copy of
/// the history and only ever appends to it.
pub struct ConversationDriver {
    provider: Arc<dyn Provider>,
    registry: Arc<CapabilityRegistry>,
    system_prompt: String,
}

impl ConversationDriver {
    pub fn new(
        provider: Arc<dyn Provider>,
        registry: Arc<CapabilityRegistry>,
        system_prompt: String,
    ) -> Self {
        Self {
            provider,
            registry,
            system_prompt,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    /// Run one turn for the given utterance against the prior history.
    pub async fn reply(&self, history: &[Message], utterance: &str) -> Result<ConversationTurn> {
        let mut messages = history.to_vec();
        let turn_start = messages.len();
        messages.push(Message::user().with_text(utterance));

        let mut rounds = 0;
        loop {
            let (response, _usage) = self
                .provider
                .complete(&self.system_prompt, &messages, self.registry.tools())
                .await?;

            let requests: Vec<ToolRequest> =
                response.tool_requests().into_iter().cloned().collect();

            if requests.is_empty() {
                let reply = response.text();
                messages.push(response);
                return Ok(ConversationTurn {
                    reply,
                    messages: messages.split_off(turn_start),
                });
            }

            rounds += 1;
            if rounds > MAX_TOOL_ROUNDS {
                return Err(DriverError::ToolRoundsExceeded(MAX_TOOL_ROUNDS).into());
            }

            messages.push(response);

            // Answer every request of the round, in the order the model
            // issued them, before the next model call
            let mut tool_message = Message::user();
            for request in &requests {
                let result = self.registry.dispatch(&request.call).await;
                tool_message = tool_message.with_tool_response(request.id.clone(), result);
            }
            messages.push(tool_message);
        }
    }
}
