//! Rubric judge behaviour under concurrency and failure.

mod common;

use common::fast_client;
use indexmap::IndexMap;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use wikiq_core::mock_llm::{text_response, ScriptedProvider};
use wikiq_core::{AgentResult, LlmError, MessageContent};
use wikiq_eval::{DatasetItem, EvalError, JudgeConfig, OnesidedJudge};

const TEMPLATE: &str = "{dimensions}\nQ: {query}\nC: {context}\nA: {response}\nKeys: {score_keys}";

fn dimensions() -> IndexMap<String, String> {
    IndexMap::from([("correctness".to_string(), "3 = right, 1 = wrong".to_string())])
}

fn pairs(n: usize) -> Vec<(DatasetItem, AgentResult)> {
    (0..n)
        .map(|i| {
            let item = DatasetItem::from_query(format!("question {}", i))
                .with_field("ground_truth", json!(format!("truth {}", i)));
            let result = AgentResult {
                final_text: format!("answer {}", i),
                messages: vec![],
                turn_count: 1,
                tool_calls_made: vec![],
            };
            (item, result)
        })
        .collect()
}

/// Index encoded in the prompt's "question N" line.
fn question_index(prompt: &str) -> u64 {
    prompt
        .lines()
        .find_map(|line| line.strip_prefix("Q: question "))
        .and_then(|n| n.trim().parse().ok())
        .unwrap_or(0)
}

fn prompt_of(request: &wikiq_core::ModelRequest) -> String {
    match &request.messages[0].content {
        MessageContent::Text(text) => text.clone(),
        MessageContent::Blocks(_) => String::new(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_order_preserved_and_concurrency_capped() {
    // Score 1, 2, 3 cycling by index; earlier items take longer
    let provider = Arc::new(
        ScriptedProvider::from_fn(|request| {
            let index = question_index(&prompt_of(request));
            let reply = json!({"scores": {"correctness": index % 3 + 1}, "reasoning": format!("item {}", index)});
            Ok(text_response(reply.to_string()))
        })
        .with_delay(|request| Duration::from_millis(100 - 10 * question_index(&prompt_of(request)))),
    );
    let judge = OnesidedJudge::new(
        Arc::new(fast_client(provider.clone())),
        JudgeConfig::default(),
    );

    let result = judge
        .evaluate("qa", &pairs(6), &dimensions(), TEMPLATE)
        .await
        .unwrap();

    assert_eq!(provider.call_count(), 6);
    assert!(provider.max_in_flight() <= 2);
    for (i, item) in result.items.iter().enumerate() {
        assert_eq!(item.query, format!("question {}", i));
        assert_eq!(item.response, format!("answer {}", i));
        assert_eq!(item.explanation, format!("item {}", i));
        assert_eq!(item.scores["correctness"], (i as i64) % 3 + 1);
    }
    assert!((result.mean_scores["correctness"] - 2.0).abs() < 1e-9);
    assert_eq!(result.dimensions, vec!["correctness".to_string()]);
}

#[tokio::test]
async fn test_one_plain_call_per_item() {
    let provider = Arc::new(ScriptedProvider::from_fn(|_| {
        Ok(text_response(r#"{"scores": {"correctness": 3}}"#))
    }));
    let judge = OnesidedJudge::new(
        Arc::new(fast_client(provider.clone())),
        JudgeConfig::default().with_model("judge-model").with_max_tokens(256),
    );

    judge
        .evaluate("qa", &pairs(2), &dimensions(), TEMPLATE)
        .await
        .unwrap();

    let requests = provider.requests();
    assert_eq!(requests.len(), 2);
    for request in &requests {
        assert_eq!(request.model, "judge-model");
        assert_eq!(request.max_tokens, 256);
        assert!(request.system.is_none());
        assert!(request.tools.is_empty());
        assert_eq!(request.messages.len(), 1);
    }

    let prompt = prompt_of(&requests[0]);
    assert!(prompt.contains("### correctness\n3 = right, 1 = wrong"));
    assert!(prompt.contains("C: Ground truth answer: truth"));
    assert!(prompt.contains("Keys: \"correctness\": N"));
}

#[tokio::test]
async fn test_unparseable_reply_is_recoverable() {
    let provider = Arc::new(ScriptedProvider::from_fn(|_| {
        Ok(text_response("I'd give it a three."))
    }));
    let judge = OnesidedJudge::new(Arc::new(fast_client(provider)), JudgeConfig::default());

    let result = judge
        .evaluate("qa", &pairs(1), &dimensions(), TEMPLATE)
        .await
        .unwrap();

    assert_eq!(result.items[0].scores["correctness"], 2);
    assert_eq!(
        result.items[0].explanation,
        "[PARSE ERROR] I'd give it a three."
    );
}

#[tokio::test]
async fn test_judge_model_failure_is_fatal() {
    let provider = Arc::new(ScriptedProvider::from_results(vec![Err(
        LlmError::InvalidResponse("not json".into()),
    )]));
    let judge = OnesidedJudge::new(
        Arc::new(fast_client(provider)),
        JudgeConfig::default().with_concurrency(1),
    );

    let err = judge
        .evaluate("qa", &pairs(1), &dimensions(), TEMPLATE)
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::Llm(LlmError::InvalidResponse(_))));
}

#[tokio::test]
async fn test_template_error_before_any_call() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let judge = OnesidedJudge::new(
        Arc::new(fast_client(provider.clone())),
        JudgeConfig::default(),
    );

    let err = judge
        .evaluate("qa", &pairs(3), &dimensions(), "{query} {rubric}")
        .await
        .unwrap_err();
    assert!(matches!(err, EvalError::Config(_)));
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test]
async fn test_empty_dataset() {
    let provider = Arc::new(ScriptedProvider::new(vec![]));
    let judge = OnesidedJudge::new(Arc::new(fast_client(provider)), JudgeConfig::default());

    let result = judge
        .evaluate("qa", &[], &dimensions(), TEMPLATE)
        .await
        .unwrap();
    assert!(result.items.is_empty());
    assert_eq!(result.mean_scores["correctness"], 0.0);
}
