use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::env;
use std::time::Duration;

pub const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";

/// A push-style delivery sink. Capabilities treat delivery as
/// fire-and-forget: a failed push is logged and never aborts the
/// conversation turn.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn push(&self, message: &str) -> Result<()>;
}

/// Sends push notifications through the Pushover API. Missing credentials
/// put the notifier in a disabled state rather than failing startup.
pub struct PushoverNotifier {
    client: reqwest::Client,
    url: String,
    credentials: Option<(String, String)>,
}

impl PushoverNotifier {
    pub fn new(url: String, user: String, token: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url,
            credentials: Some((user, token)),
        })
    }

    /// Build from PUSHOVER_USER and PUSHOVER_TOKEN. When either is absent
    /// the notifier is disabled and every push becomes a logged no-op.
    pub fn from_env() -> Result<Self> {
        let credentials = match (env::var("PUSHOVER_USER"), env::var("PUSHOVER_TOKEN")) {
            (Ok(user), Ok(token)) => Some((user, token)),
            _ => {
                tracing::warn!("Pushover credentials not set, push notifications are disabled");
                None
            }
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            url: PUSHOVER_URL.to_string(),
            credentials,
        })
    }
}

#[async_trait]
impl Notifier for PushoverNotifier {
    async fn push(&self, message: &str) -> Result<()> {
        let (user, token) = match &self.credentials {
            Some(credentials) => credentials,
            None => {
                tracing::debug!(message, "push skipped, notifier disabled");
                return Ok(());
            }
        };

        let params = [
            ("user", user.as_str()),
            ("token", token.as_str()),
            ("message", message),
        ];

        let response = self.client.post(&self.url).form(&params).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!("Pushover request failed: {}", response.status()));
        }

        let body: serde_json::Value = response.json().await?;
        if body.get("status").and_then(|v| v.as_i64()) != Some(1) {
            return Err(anyhow!(
                "Pushover rejected the message: {}",
                body.get("errors").cloned().unwrap_or_default()
            ));
        }

        Ok(())
    }
}
