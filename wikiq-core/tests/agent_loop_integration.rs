//! Agent loop behaviour against a scripted provider.

mod common;

use common::{agent_with, fast_client, BrokenTool, EchoSearch};
use serde_json::json;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tempfile::TempDir;
use wikiq_core::mock_llm::{text_response, tool_use_response, ScriptedProvider};
use wikiq_core::{
    AgentError, AgentProfile, ConfigLoader, ContentBlock, LlmError, MessageContent,
    ModelResponse, Role, StopReason, ToolAgent, ToolRegistry,
};

#[tokio::test]
async fn test_end_turn_on_first_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![text_response(
        "The capital of France is Paris.",
    )]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![Arc::new(EchoSearch::default())], 10);

    let result = agent.run("What is the capital of France?", &llm).await.unwrap();

    assert_eq!(provider.call_count(), 1);
    assert_eq!(result.turn_count, 1);
    assert!(result.tool_calls_made.is_empty());
    assert_eq!(result.final_text, "The capital of France is Paris.");
    assert_eq!(result.messages.len(), 2);
    assert_eq!(result.messages[0].role, Role::User);
    assert_eq!(
        result.messages[0].content,
        MessageContent::Text("What is the capital of France?".into())
    );
}

#[tokio::test]
async fn test_tool_round_trip() {
    let search = Arc::new(EchoSearch::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_use_response("toolu_1", "search_wikipedia", json!({"query": "Paris"})),
        text_response("Paris."),
    ]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![search.clone()], 10);

    let result = agent.run("Capital of France?", &llm).await.unwrap();

    assert_eq!(result.turn_count, 2);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert_eq!(result.tool_calls_made.len(), 1);
    assert_eq!(result.tool_calls_made[0].tool, "search_wikipedia");
    assert_eq!(result.tool_calls_made[0].input, json!({"query": "Paris"}));
    assert_eq!(result.final_text, "Paris.");

    // user, assistant(tool_use), user(tool_result), assistant(text)
    assert_eq!(result.messages.len(), 4);
    match &result.messages[2].content {
        MessageContent::Blocks(blocks) => {
            assert_eq!(
                blocks[0],
                ContentBlock::tool_result("toolu_1", "## Paris\nResult for Paris")
            );
        }
        other => panic!("expected tool result blocks, got {:?}", other),
    }

    // The second request carries the whole transcript so far
    assert_eq!(provider.requests()[1].messages.len(), 3);
}

#[tokio::test]
async fn test_unknown_tool_is_reported_not_fatal() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_use_response("toolu_1", "calculator", json!({"expression": "1+1"})),
        text_response("I cannot calculate."),
    ]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![Arc::new(EchoSearch::default())], 5);

    let result = agent.run("1+1?", &llm).await.unwrap();

    assert_eq!(result.tool_calls_made.len(), 1);
    let output = &result.tool_calls_made[0].output;
    assert!(output.starts_with("Error:"));
    assert!(output.contains("calculator"));
    assert_eq!(result.final_text, "I cannot calculate.");
}

#[tokio::test]
async fn test_tool_error_becomes_result_text() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        tool_use_response("toolu_1", "broken", json!({})),
        text_response("Sorry."),
    ]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![Arc::new(BrokenTool)], 5);

    let result = agent.run("anything", &llm).await.unwrap();

    let output = &result.tool_calls_made[0].output;
    assert!(output.contains("Error"));
    assert!(output.contains("broken"));
    assert!(output.contains("503"));
}

#[tokio::test]
async fn test_turn_budget_exhausted() {
    let provider = Arc::new(ScriptedProvider::from_fn(|req| {
        let id = format!("toolu_{}", req.messages.len());
        Ok(ModelResponse::new(
            vec![
                ContentBlock::text("Still searching."),
                ContentBlock::tool_use(id, "search_wikipedia", json!({"query": "loop"})),
            ],
            Some(StopReason::ToolUse),
        ))
    }));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![Arc::new(EchoSearch::default())], 3);

    let result = agent.run("never ends", &llm).await.unwrap();

    assert_eq!(provider.call_count(), 3);
    assert_eq!(result.turn_count, 3);
    assert_eq!(result.tool_calls_made.len(), 3);
    assert_eq!(result.final_text, "Still searching.");
}

#[tokio::test]
async fn test_multiple_tool_uses_in_one_turn() {
    let search = Arc::new(EchoSearch::default());
    let provider = Arc::new(ScriptedProvider::new(vec![
        ModelResponse::new(
            vec![
                ContentBlock::tool_use("a", "search_wikipedia", json!({"query": "Paris"})),
                ContentBlock::tool_use("b", "search_wikipedia", json!({"query": "Lyon"})),
            ],
            Some(StopReason::ToolUse),
        ),
        text_response("Both are in France."),
    ]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![search.clone()], 10);

    let result = agent.run("Paris vs Lyon", &llm).await.unwrap();

    assert_eq!(search.calls.load(Ordering::SeqCst), 2);
    assert_eq!(result.tool_calls_made.len(), 2);
    assert_eq!(result.tool_calls_made[1].input["query"], "Lyon");

    // Both results travel back in a single user message, keyed by id
    match &result.messages[2].content {
        MessageContent::Blocks(blocks) => {
            let ids: Vec<_> = blocks
                .iter()
                .filter_map(|b| match b {
                    ContentBlock::ToolResult { tool_use_id, .. } => Some(tool_use_id.as_str()),
                    _ => None,
                })
                .collect();
            assert_eq!(ids, vec!["a", "b"]);
        }
        other => panic!("expected blocks, got {:?}", other),
    }
}

#[tokio::test]
async fn test_other_stop_reason_is_terminal() {
    let provider = Arc::new(ScriptedProvider::new(vec![ModelResponse::new(
        vec![ContentBlock::text("Partial answer")],
        Some(StopReason::MaxTokens),
    )]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![], 10);

    let result = agent.run("long question", &llm).await.unwrap();
    assert_eq!(result.turn_count, 1);
    assert_eq!(result.final_text, "Partial answer");
}

#[tokio::test]
async fn test_tool_use_stop_without_tool_blocks_stops() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        ModelResponse::new(
            vec![ContentBlock::text("Let me search for that.")],
            Some(StopReason::ToolUse),
        ),
        text_response("never requested"),
    ]));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![Arc::new(EchoSearch::default())], 10);

    let result = agent.run("capital of Peru", &llm).await.unwrap();
    assert_eq!(provider.call_count(), 1);
    assert_eq!(result.turn_count, 1);
    assert!(result.tool_calls_made.is_empty());
    assert_eq!(result.final_text, "Let me search for that.");
    assert_eq!(result.messages.len(), 2);
}

#[tokio::test]
async fn test_model_error_after_retries_is_fatal() {
    let provider = Arc::new(ScriptedProvider::from_fn(|_| {
        Err(LlmError::Http {
            status: 529,
            body: "overloaded".into(),
        })
    }));
    let llm = fast_client(provider.clone());
    let agent = agent_with(vec![], 10);

    let err = agent.run("q", &llm).await.unwrap_err();
    assert!(matches!(err, AgentError::Llm(LlmError::Http { status: 529, .. })));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test]
async fn test_profile_load_from_project_root() {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    fs::create_dir_all(root.join("configs")).unwrap();
    fs::create_dir_all(root.join("prompts")).unwrap();
    fs::write(
        root.join("configs/agents.yaml"),
        "agent_v2:\n  max_turns: 2\n  system_instruction: concise\n  tool_description: v2\n",
    )
    .unwrap();
    fs::write(
        root.join("prompts/system_instructions.yaml"),
        "concise: Answer in one sentence.\n",
    )
    .unwrap();
    fs::write(
        root.join("prompts/tool_descriptions.yaml"),
        "v2:\n  search_wikipedia: Look up facts on Wikipedia.\n",
    )
    .unwrap();

    let mut registry = ToolRegistry::new();
    registry.register(EchoSearch::default());
    let registry = Arc::new(registry);

    let loader = ConfigLoader::new(root);
    let profile = AgentProfile::load(&loader, "agent_v2", &registry).unwrap();
    assert_eq!(profile.config.max_turns, 2);
    assert_eq!(profile.system_prompt, "Answer in one sentence.");
    assert_eq!(profile.tools.len(), 1);
    assert_eq!(profile.tools[0].description, "Look up facts on Wikipedia.");

    let provider = Arc::new(ScriptedProvider::new(vec![text_response("Paris.")]));
    let llm = fast_client(provider.clone());
    ToolAgent::new(profile, registry)
        .run("Capital of France?", &llm)
        .await
        .unwrap();

    let request = &provider.requests()[0];
    assert_eq!(request.tools[0].name, "search_wikipedia");
    assert_eq!(request.system.as_deref(), Some("Answer in one sentence."));
}
