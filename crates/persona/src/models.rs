//! The objects passed between the driver, the gate, and the providers.
//!
//! The internal message format is provider-neutral: tool requests and tool
//! results are content items carrying the correlation id the provider gave
//! them. Conversion to the OpenAI wire shape lives in `providers::utils`.
pub mod message;
pub mod role;
pub mod tool;
