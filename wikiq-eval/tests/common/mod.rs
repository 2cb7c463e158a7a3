//! Shared test utilities for integration tests
//!
//! Builds throwaway project roots and a scripted model that plays both the
//! agent and the judge.

// Allow unused code - each test file includes this module separately,
// so not all functions are used in every compilation unit.
#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use wikiq_core::mock_llm::{text_response, tool_use_response, ScriptedProvider};
use wikiq_core::{
    ConfigLoader, LlmConfig, LlmError, ModelClient, ModelRequest, ModelResponse, Tool, ToolError,
    ToolRegistry,
};
use wikiq_eval::EvalRunner;

pub const AGENTS_YAML: &str = "\
agent_v1:
  max_turns: 4
agent_v2:
  max_turns: 6
  system_instruction: concise
";

pub const SYSTEM_INSTRUCTIONS_YAML: &str = "\
default: You answer questions using Wikipedia.
concise: Answer in one sentence.
";

pub const TOOL_DESCRIPTIONS_YAML: &str = "\
default:
  search_wikipedia: Search Wikipedia for factual information.
";

pub const JUDGE_PROMPTS_YAML: &str = r#"onesided: |
  Rate the response.

  {dimensions}

  Query: {query}
  Context: {context}
  Response: {response}

  Reply with {{"scores": {{{score_keys}}}, "reasoning": "..."}}
"#;

pub const TRAJECTORY_DATASET: &str = "\
- query: What is the capital of France?
  wiki_tool_call_expected: true
- query: Say hello
  wiki_tool_call_expected: false
";

pub const RUBRIC_DATASET: &str = "\
- query: What is the capital of Japan?
  ground_truth: Tokyo
- query: Who painted the Mona Lisa?
  ground_truth: Leonardo da Vinci
";

pub const TRAJECTORY_EVALS: &str = "\
tool_triggering:
  path: datasets/tool_triggering.yaml
  rater: trajectory
";

pub const MIXED_EVALS: &str = "\
tool_triggering:
  path: datasets/tool_triggering.yaml
  rater: trajectory
answer_quality:
  path: datasets/answer_quality.yaml
  rater: onesided
  dimensions:
    correctness: 3 = correct, 1 = wrong
    groundedness: 3 = cites the search result, 1 = does not
";

/// A temporary project root with agent configs, prompts and datasets.
pub struct Project {
    pub dir: TempDir,
}

impl Project {
    /// A project whose `configs/evals.yaml` is `evals`.
    pub fn new(evals: &str) -> Self {
        let dir = TempDir::new().expect("tempdir");
        let project = Self { dir };
        project.write("configs/agents.yaml", AGENTS_YAML);
        project.write("configs/evals.yaml", evals);
        project.write("prompts/system_instructions.yaml", SYSTEM_INSTRUCTIONS_YAML);
        project.write("prompts/tool_descriptions.yaml", TOOL_DESCRIPTIONS_YAML);
        project.write("prompts/evals.yaml", JUDGE_PROMPTS_YAML);
        project.write("datasets/tool_triggering.yaml", TRAJECTORY_DATASET);
        project.write("datasets/answer_quality.yaml", RUBRIC_DATASET);
        project
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.dir.path().join(relative);
        fs::create_dir_all(path.parent().expect("parent")).expect("create dirs");
        fs::write(path, contents).expect("write file");
    }

    pub fn runner(&self, provider: Arc<ScriptedProvider>) -> EvalRunner {
        EvalRunner::new(
            ConfigLoader::new(self.root()),
            Arc::new(fast_client(provider)),
            Arc::new(registry()),
        )
    }
}

/// Client with millisecond backoff so retry paths stay fast.
pub fn fast_client(provider: Arc<ScriptedProvider>) -> ModelClient {
    let config = LlmConfig::default()
        .with_timeout(Duration::from_secs(60))
        .with_retry_base_delay_ms(1);
    ModelClient::new(provider, config)
}

/// Offline stand-in for the Wikipedia search tool.
#[derive(Debug, Default)]
pub struct FakeSearch;

#[async_trait]
impl Tool for FakeSearch {
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
        let query = input["query"].as_str().unwrap_or_default();
        Ok(format!("## {}\nArticle about {}", query, query))
    }
}

pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry.register(FakeSearch);
    registry
}

/// Whether a request came from the judge (no tools attached).
pub fn is_judge_request(request: &ModelRequest) -> bool {
    request.tools.is_empty()
}

/// Scripted model behaviour:
///
/// - agent, first turn, query mentions "capital": call `search_wikipedia`
/// - agent otherwise: answer in text
/// - judge: full marks on every dimension named in the prompt
pub fn respond(request: &ModelRequest) -> Result<ModelResponse, LlmError> {
    let first = request
        .messages
        .first()
        .map(|m| m.text())
        .unwrap_or_default();

    if is_judge_request(request) {
        let mut scores = serde_json::Map::new();
        for dim in ["correctness", "groundedness"] {
            if first.contains(&format!("### {}", dim)) {
                scores.insert(dim.to_string(), json!(3));
            }
        }
        let reply = json!({"scores": scores, "reasoning": "Accurate and sourced."});
        return Ok(text_response(reply.to_string()));
    }

    if request.messages.len() == 1 && first.contains("capital") {
        return Ok(tool_use_response(
            "toolu_1",
            "search_wikipedia",
            json!({"query": first}),
        ));
    }
    Ok(text_response(format!("Answer to: {}", first)))
}

pub fn scripted() -> Arc<ScriptedProvider> {
    Arc::new(ScriptedProvider::from_fn(respond))
}
