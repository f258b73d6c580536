use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;

use crate::errors::{CapabilityError, CapabilityResult};
use crate::models::tool::{Tool, ToolCall};

/// A named, schema-described function the model may request during a
/// conversation. Handlers may have externally visible side effects and must
/// tolerate being invoked repeatedly with identical arguments, since the
/// driver does not deduplicate calls across rounds.
#[async_trait]
pub trait Capability: Send + Sync {
    /// The schema advertised to the model
    fn schema(&self) -> &Tool;

    /// Execute with the model-provided arguments
    async fn call(&self, arguments: Value) -> CapabilityResult<Value>;
}

/// Mapping from tool name to handler and schema. Built once at startup and
/// read-only thereafter, so concurrent conversation turns can share one
/// instance. The names registered here are the only names the driver will
/// dispatch.
#[derive(Default)]
pub struct CapabilityRegistry {
    capabilities: HashMap<String, Box<dyn Capability>>,
    tools: Vec<Tool>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, capability: Box<dyn Capability>) {
        self.tools.push(capability.schema().clone());
        self.capabilities
            .insert(capability.schema().name.clone(), capability);
    }

    /// Schemas to advertise to the model
    pub fn tools(&self) -> &[Tool] {
        &self.tools
    }

    /// Dispatch one tool call. Never raises past this boundary: an unknown
    /// name yields an empty payload so the model can adapt, a handler
    /// failure (or a request that arrived malformed from the provider)
    /// yields a failure payload. Either way the conversation continues.
    pub async fn dispatch(&self, call: &CapabilityResult<ToolCall>) -> Value {
        let call = match call {
            Ok(call) => call,
            Err(e) => {
                tracing::warn!(error = %e, "malformed tool request");
                return json!({"error": e.to_string()});
            }
        };

        let capability = match self.capabilities.get(&call.name) {
            Some(capability) => capability,
            None => {
                tracing::warn!(name = %call.name, "unknown capability requested");
                return json!({});
            }
        };

        match capability.call(call.arguments.clone()).await {
            Ok(result) => result,
            Err(e) => {
                tracing::warn!(name = %call.name, error = %e, "capability failed");
                json!({"error": e.to_string()})
            }
        }
    }
}

/// Pull a required string argument out of an untrusted payload.
pub fn required_str<'a>(arguments: &'a Value, key: &str) -> CapabilityResult<&'a str> {
    arguments
        .get(key)
        .and_then(|v| v.as_str())
        .ok_or_else(|| CapabilityError::InvalidParameters(format!("'{}' must be provided", key)))
}

/// Pull an optional string argument, substituting a default.
pub fn optional_str<'a>(arguments: &'a Value, key: &str, default: &'a str) -> &'a str {
    arguments.get(key).and_then(|v| v.as_str()).unwrap_or(default)
}
