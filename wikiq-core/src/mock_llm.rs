//! Scripted model provider for offline tests
//!
//! [`ScriptedProvider`] stands in for [`AnthropicProvider`](crate::AnthropicProvider)
//! so agents and judges can run without API calls:
//!
//! - **Queued mode**: returns pre-recorded results in order
//! - **Function mode**: computes each response from the request
//!
//! Every request is recorded for later assertions.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use wikiq_core::mock_llm::{text_response, ScriptedProvider};
//! use wikiq_core::{LlmConfig, Message, ModelClient, ModelRequest};
//!
//! # async fn example() -> Result<(), wikiq_core::LlmError> {
//! let provider = Arc::new(ScriptedProvider::new(vec![text_response("Paris.")]));
//! let client = ModelClient::new(provider.clone(), LlmConfig::default());
//!
//! let request = ModelRequest::new("test", 64, vec![Message::user("Capital of France?")]);
//! assert_eq!(client.create(&request).await?.text(), "Paris.");
//! assert_eq!(provider.call_count(), 1);
//! # Ok(())
//! # }
//! ```

use crate::error::LlmError;
use crate::llm::{ModelProvider, ModelRequest, ModelResponse, StopReason};
use crate::message::ContentBlock;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

type ResponseFn = dyn Fn(&ModelRequest) -> Result<ModelResponse, LlmError> + Send + Sync;
type DelayFn = dyn Fn(&ModelRequest) -> Duration + Send + Sync;

enum Script {
    Queue(Mutex<VecDeque<Result<ModelResponse, LlmError>>>),
    Function(Box<ResponseFn>),
}

/// A [`ModelProvider`] that replays scripted responses.
pub struct ScriptedProvider {
    script: Script,
    delay: Option<Box<DelayFn>>,
    requests: Mutex<Vec<ModelRequest>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl fmt::Debug for ScriptedProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptedProvider")
            .field("calls", &self.call_count())
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| {
        log::warn!("ScriptedProvider lock poisoned - recovering");
        poisoned.into_inner()
    })
}

impl ScriptedProvider {
    /// Replay `responses` in order. Calls past the end fail.
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::from_results(responses.into_iter().map(Ok).collect())
    }

    /// Replay successes and failures in order.
    pub fn from_results(results: Vec<Result<ModelResponse, LlmError>>) -> Self {
        Self::with_script(Script::Queue(Mutex::new(results.into())))
    }

    /// Compute every response from its request.
    pub fn from_fn<F>(f: F) -> Self
    where
        F: Fn(&ModelRequest) -> Result<ModelResponse, LlmError> + Send + Sync + 'static,
    {
        Self::with_script(Script::Function(Box::new(f)))
    }

    fn with_script(script: Script) -> Self {
        Self {
            script,
            delay: None,
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep for a per-request duration before answering.
    #[must_use]
    pub fn with_delay<F>(mut self, f: F) -> Self
    where
        F: Fn(&ModelRequest) -> Duration + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(f));
        self
    }

    /// Number of `create` calls so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Highest number of calls that were in progress at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Every request received, in arrival order.
    pub fn requests(&self) -> Vec<ModelRequest> {
        lock(&self.requests).clone()
    }

    fn next_result(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        match &self.script {
            Script::Queue(queue) => lock(queue).pop_front().unwrap_or_else(|| {
                Err(LlmError::Other(
                    "ScriptedProvider has no more responses".to_string(),
                ))
            }),
            Script::Function(f) => f(request),
        }
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn create(&self, request: &ModelRequest) -> Result<ModelResponse, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        lock(&self.requests).push(request.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        let result = self.next_result(request);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

/// A final answer: one text block, `end_turn`.
pub fn text_response(text: impl Into<String>) -> ModelResponse {
    ModelResponse::new(vec![ContentBlock::text(text)], Some(StopReason::EndTurn))
}

/// A single tool call: one tool-use block, `tool_use`.
pub fn tool_use_response(id: impl Into<String>, name: impl Into<String>, input: Value) -> ModelResponse {
    ModelResponse::new(
        vec![ContentBlock::tool_use(id, name, input)],
        Some(StopReason::ToolUse),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use serde_json::json;

    fn request(text: &str) -> ModelRequest {
        ModelRequest::new("test", 16, vec![Message::user(text)])
    }

    #[tokio::test]
    async fn test_queue_replays_in_order_then_fails() {
        let provider = ScriptedProvider::new(vec![text_response("one"), text_response("two")]);

        assert_eq!(provider.create(&request("a")).await.unwrap().text(), "one");
        assert_eq!(provider.create(&request("b")).await.unwrap().text(), "two");
        assert!(provider.create(&request("c")).await.is_err());
        assert_eq!(provider.call_count(), 3);
    }

    #[tokio::test]
    async fn test_from_fn_sees_request() {
        let provider = ScriptedProvider::from_fn(|req| {
            Ok(text_response(format!("echo: {}", req.messages[0].text())))
        });
        let response = provider.create(&request("Paris")).await.unwrap();
        assert_eq!(response.text(), "echo: Paris");
        assert_eq!(provider.requests()[0].messages[0].text(), "Paris");
    }

    #[test]
    fn test_tool_use_response_shape() {
        let response = tool_use_response("toolu_1", "search_wikipedia", json!({"query": "x"}));
        assert_eq!(response.stop_reason, Some(StopReason::ToolUse));
        assert_eq!(response.tool_uses().count(), 1);
    }
}
