//! Shared test utilities for integration tests
//!
//! This module provides common helper functions used across integration test files.

// Allow unused code - each test file includes this module separately,
// so not all functions are used in every compilation unit.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::env;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use wikiq_core::{
    AgentConfig, AgentProfile, LlmConfig, ModelClient, ModelProvider, Tool, ToolAgent, ToolError,
    ToolRegistry,
};

/// Helper to get the API key, or return None if not available.
pub fn get_api_key() -> Option<String> {
    env::var("ANTHROPIC_API_KEY").ok()
}

/// Client with millisecond backoff so retry paths stay fast.
pub fn fast_client(provider: Arc<dyn ModelProvider>) -> ModelClient {
    let config = LlmConfig::default()
        .with_timeout(Duration::from_secs(60))
        .with_retry_base_delay_ms(1);
    ModelClient::new(provider, config)
}

/// Tool that echoes its `query` input and counts invocations.
#[derive(Debug, Default)]
pub struct EchoSearch {
    pub calls: AtomicUsize,
}

#[async_trait]
impl Tool for EchoSearch {
    fn name(&self) -> &str {
        "search_wikipedia"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn execute(&self, input: Value) -> Result<String, ToolError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let query = input["query"].as_str().unwrap_or_default();
        Ok(format!("## {}\nResult for {}", query, query))
    }
}

/// Tool that always fails.
#[derive(Debug)]
pub struct BrokenTool;

#[async_trait]
impl Tool for BrokenTool {
    fn name(&self) -> &str {
        "broken"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}})
    }

    async fn execute(&self, _input: Value) -> Result<String, ToolError> {
        Err(ToolError::ExecutionFailed("upstream returned 503".into()))
    }
}

/// Agent over `tools` with the given turn budget and no prompt files.
pub fn agent_with(tools: Vec<Arc<dyn Tool>>, max_turns: u32) -> ToolAgent {
    let mut registry = ToolRegistry::new();
    for tool in tools {
        registry.register_arc(tool);
    }
    let config = AgentConfig::default().with_max_turns(max_turns);
    let profile = AgentProfile::new("test_agent", config, "You answer questions.", vec![]);
    ToolAgent::new(profile, Arc::new(registry))
}
