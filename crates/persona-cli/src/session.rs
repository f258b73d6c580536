use anyhow::{anyhow, Result};
use bat::PrettyPrinter;
use cliclack::{input, spinner};
use console::style;
use std::path::Path;
use std::sync::Arc;

use persona::capabilities::default_registry;
use persona::driver::ConversationDriver;
use persona::gate::ResponseGate;
use persona::models::message::Message;
use persona::notify::{Notifier, PushoverNotifier};
use persona::profile::ProfileContext;
use persona::providers::base::Provider;
use persona::providers::configs::OpenAiProviderConfig;
use persona::providers::openai::OpenAiProvider;

const FAILURE_LINE: &str = "Something went wrong handling that message. Please try again.";

/// One assembled conversation: the driver, the optional gate, and the
/// running history.
pub struct Chat {
    driver: ConversationDriver,
    gate: Option<ResponseGate>,
    history: Vec<Message>,
}

impl Chat {
    pub fn new(driver: ConversationDriver, gate: Option<ResponseGate>) -> Self {
        Self {
            driver,
            gate,
            history: Vec::new(),
        }
    }

    /// Wire up the profile context, providers, notifier and registry.
    /// Missing profile files or a missing API key fail here, before any
    /// conversation starts.
    pub fn build(me: &Path, name: &str, gated: bool) -> Result<Self> {
        let profile = ProfileContext::load(name, me)?;

        let provider: Arc<dyn Provider> =
            Arc::new(OpenAiProvider::new(OpenAiProviderConfig::from_env()?)?);

        let notifier: Arc<dyn Notifier> = Arc::new(PushoverNotifier::from_env()?);
        let registry = Arc::new(default_registry(notifier));

        let driver = ConversationDriver::new(provider.clone(), registry, profile.system_prompt());

        let gate = if gated {
            let judge: Arc<dyn Provider> =
                Arc::new(OpenAiProvider::new(OpenAiProviderConfig::judge_from_env()?)?);
            Some(ResponseGate::new(
                judge,
                provider,
                profile.judge_system_prompt(),
            ))
        } else {
            None
        };

        Ok(Self::new(driver, gate))
    }

    /// Run one full turn: drive the conversation, gate the candidate reply
    /// when gating is enabled, and extend the history with what the user
    /// actually saw.
    pub async fn turn(&mut self, utterance: &str) -> Result<String> {
        let turn = self.driver.reply(&self.history, utterance).await?;

        let reply = match &self.gate {
            Some(gate) => {
                let outcome = gate
                    .screen(
                        self.driver.system_prompt(),
                        &self.history,
                        utterance,
                        &turn.reply,
                    )
                    .await?;
                outcome.reply
            }
            None => turn.reply.clone(),
        };

        let mut messages = turn.messages;
        if reply != turn.reply {
            // The rejected candidate stays out of history; the user only
            // ever saw the regeneration
            messages.pop();
            messages.push(Message::assistant().with_text(&reply));
        }
        self.history.extend(messages);

        Ok(reply)
    }
}

/// Interactive session loop.
pub async fn run(mut chat: Chat) -> Result<()> {
    println!(
        "persona {}",
        style("- type \"exit\" to end the session").dim()
    );
    println!();

    loop {
        let message_text: String = input("Message:").placeholder("").multiline().interact()?;

        if message_text.trim().eq_ignore_ascii_case("exit") {
            break;
        }

        let spin = spinner();
        spin.start("awaiting reply");

        match chat.turn(&message_text).await {
            Ok(reply) => {
                spin.stop("");
                render(&reply);
            }
            Err(e) => {
                spin.stop("");
                tracing::error!(error = %e, "conversation turn failed");
                println!("{}", style(FAILURE_LINE).red());
            }
        }

        println!("\n");
    }
    Ok(())
}

/// Single headless turn. A failed turn is logged and reported with the same
/// generic line as the interactive loop, never as the raw error chain.
pub async fn ask(mut chat: Chat, message: &str) -> Result<()> {
    match chat.turn(message).await {
        Ok(reply) => {
            render(&reply);
            Ok(())
        }
        Err(e) => {
            tracing::error!(error = %e, "conversation turn failed");
            println!("{}", style(FAILURE_LINE).red());
            Err(anyhow!("conversation turn failed"))
        }
    }
}

fn render(content: &str) {
    let printed = PrettyPrinter::new()
        .input_from_bytes(content.as_bytes())
        .language("markdown")
        .print();
    if printed.is_err() {
        println!("{}", content);
    }
}
