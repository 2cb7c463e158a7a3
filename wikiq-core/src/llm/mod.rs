//! Model client for the Anthropic Messages API
//!
//! Provides:
//! - [`ModelProvider`], the seam between the agent and a concrete backend
//! - [`ModelClient`], which wraps a provider with retry and exponential backoff
//! - [`AnthropicProvider`], the HTTP implementation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use wikiq_core::{AnthropicProvider, LlmConfig, Message, ModelClient, ModelRequest};
//!
//! # async fn example() -> Result<(), wikiq_core::LlmError> {
//! let config = LlmConfig::default();
//! let provider = AnthropicProvider::from_env(&config)?;
//! let client = ModelClient::new(Arc::new(provider), config);
//!
//! let request = ModelRequest::new(
//!     "claude-sonnet-4-20250514",
//!     1024,
//!     vec![Message::user("What is the capital of France?")],
//! );
//! let response = client.create(&request).await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

mod anthropic;
mod client;
mod request;

pub use anthropic::AnthropicProvider;
pub use client::ModelClient;
pub use request::{ModelRequest, ModelResponse, StopReason, Usage};

use crate::error::LlmError;
use async_trait::async_trait;

/// A backend that can answer a single [`ModelRequest`].
///
/// Implementations make exactly one attempt; retry lives in [`ModelClient`].
#[async_trait]
pub trait ModelProvider: Send + Sync {
    async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError>;
}
