use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;

use crate::models::message::Message;
use crate::models::role::Role;
use crate::providers::base::Provider;

/// The judge's verdict on a candidate reply. Produced fresh per gated
/// reply and never persisted beyond the single gating decision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub is_acceptable: bool,
    pub feedback: String,
}

#[derive(Error, Debug)]
pub enum GateError {
    #[error("Judge response did not parse into an evaluation: {0}")]
    UnparseableVerdict(String),
}

/// The reply that passed the gate, with the verdict that produced it.
#[derive(Debug, Clone)]
pub struct GateOutcome {
    pub reply: String,
    pub evaluation: Evaluation,
    pub regenerated: bool,
}

fn evaluation_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "is_acceptable": {
                "type": "boolean",
                "description": "Whether the latest response is acceptable quality"
            },
            "feedback": {
                "type": "string",
                "description": "Feedback on the response"
            }
        },
        "required": ["is_acceptable", "feedback"],
        "additionalProperties": false
    })
}

/// Render the conversation for the judge.
fn transcript(history: &[Message]) -> String {
    history
        .iter()
        .filter_map(|message| {
            let text = message.text();
            if text.is_empty() {
                return None;
            }
            let speaker = match message.role {
                Role::User => "User",
                Role::Assistant => "Agent",
            };
            Some(format!("{}: {}", speaker, text))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn judge_user_prompt(history: &[Message], utterance: &str, candidate: &str) -> String {
    let mut prompt = format!(
        "Here's the conversation between the User and the Agent: \n\n{}\n\n",
        transcript(history)
    );
    prompt.push_str(&format!(
        "Here's the latest message from the User: \n\n{}\n\n",
        utterance
    ));
    prompt.push_str(&format!(
        "Here's the latest response from the Agent: \n\n{}\n\n",
        candidate
    ));
    prompt.push_str(
        "Please evaluate the response, replying with whether it is acceptable and your feedback.",
    );
    prompt
}

fn regeneration_prompt(system_prompt: &str, rejected: &str, feedback: &str) -> String {
    let mut prompt = format!(
        "{}\n\n## Previous answer rejected\nYou just tried to reply, but the quality control rejected your reply\n",
        system_prompt
    );
    prompt.push_str(&format!("## Your attempted answer:\n{}\n\n", rejected));
    prompt.push_str(&format!("## Reason for rejection:\n{}\n\n", feedback));
    prompt
}

/// Routes a candidate final reply through a judge that accepts or rejects
/// it. A rejection triggers exactly one regeneration with the rejection
/// feedback appended to context, and that regeneration is returned
/// unconditionally, so the gate adds at most two model calls per turn.
pub struct ResponseGate {
    judge: Arc<dyn Provider>,
    responder: Arc<dyn Provider>,
    judge_system: String,
}

impl ResponseGate {
    pub fn new(judge: Arc<dyn Provider>, responder: Arc<dyn Provider>, judge_system: String) -> Self {
        Self {
            judge,
            responder,
            judge_system,
        }
    }

    async fn evaluate(
        &self,
        history: &[Message],
        utterance: &str,
        candidate: &str,
    ) -> Result<Evaluation> {
        let messages = vec![Message::user().with_text(judge_user_prompt(
            history, utterance, candidate,
        ))];

        let (value, _usage) = self
            .judge
            .complete_structured(&self.judge_system, &messages, "evaluation", &evaluation_schema())
            .await?;

        serde_json::from_value(value)
            .map_err(|e| GateError::UnparseableVerdict(e.to_string()).into())
    }

    async fn regenerate(
        &self,
        system_prompt: &str,
        history: &[Message],
        utterance: &str,
        rejected: &str,
        feedback: &str,
    ) -> Result<String> {
        let augmented = regeneration_prompt(system_prompt, rejected, feedback);

        let mut messages = history.to_vec();
        messages.push(Message::user().with_text(utterance));

        let (response, _usage) = self.responder.complete(&augmented, &messages, &[]).await?;
        Ok(response.text())
    }

    /// Apply one quality check-and-correct cycle to the candidate reply.
    pub async fn screen(
        &self,
        system_prompt: &str,
        history: &[Message],
        utterance: &str,
        candidate: &str,
    ) -> Result<GateOutcome> {
        let evaluation = self.evaluate(history, utterance, candidate).await?;

        if evaluation.is_acceptable {
            tracing::debug!("reply passed evaluation");
            return Ok(GateOutcome {
                reply: candidate.to_string(),
                evaluation,
                regenerated: false,
            });
        }

        tracing::info!(feedback = %evaluation.feedback, "reply failed evaluation, regenerating");
        // The regenerated reply is returned without a second evaluation
        let reply = self
            .regenerate(system_prompt, history, utterance, candidate, &evaluation.feedback)
            .await?;

        Ok(GateOutcome {
            reply,
            evaluation,
            regenerated: true,
        })
    }
}
