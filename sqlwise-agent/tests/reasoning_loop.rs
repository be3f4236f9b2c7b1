mod support;

use std::sync::Arc;

use serde_json::{json, Map};
use sqlwise_agent::prompt::REFUSAL;
use sqlwise_agent::{
    exhausted_message, AgentState, ReasoningNode, Stage, LLM_FAILURE_PREFIX,
    MALFORMED_CALL_MESSAGE,
};
use sqlwise_core::{
    LlmResponse, Role, ToolCall, ToolCallPayload, ToolCallingLlm, MALFORMED_FUNCTION_CALL,
};
use sqlwise_graph::{GraphNode, GraphState};
use sqlwise_tools::SqlDatabase;
use support::{call, calls, customer_tools, list_tables_call, query_call, user_role, ScriptedLlm};

async fn node(llm: Arc<ScriptedLlm>) -> ReasoningNode {
    let (tools, _db) = customer_tools().await;
    let llm: Arc<dyn ToolCallingLlm> = llm;
    ReasoningNode::builder()
        .llm(llm)
        .tools(tools)
        .model("test-model")
        .build()
        .unwrap()
}

async fn run(node: &ReasoningNode, state: AgentState) -> AgentState {
    node.invoke(GraphState::new(state)).await.unwrap().data
}

fn question() -> AgentState {
    AgentState::new("How many customers are there?")
}

#[tokio::test]
async fn first_request_embeds_question_tables_and_tool_specs() {
    let llm = ScriptedLlm::new(vec![LlmResponse::text("59")]);
    let node = node(llm.clone()).await;
    run(&node, question()).await;

    let requests = llm.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].model, "test-model");
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[0].messages[0].role, Role::User);
    let prompt = &requests[0].messages[0].content;
    assert!(prompt.contains("Question: How many customers are there?"));
    assert!(prompt.contains("Tables: Customer, Invoice"));

    let names: Vec<&str> = requests[0].tools.iter().map(|t| t.name.as_str()).collect();
    assert_eq!(
        names,
        vec!["list_tables", "describe_table", "find_similar_table", "db_query_tool"]
    );
}

#[tokio::test]
async fn terminates_within_the_bound_when_tools_are_requested_forever() {
    let llm = ScriptedLlm::repeating(list_tables_call("loop"));
    let node = node(llm.clone()).await;
    let out = run(&node, question()).await;

    assert_eq!(llm.requests().len(), 5);
    assert_eq!(out.next, Some(Stage::End));
    assert_eq!(out.result.as_deref(), Some(exhausted_message(5).as_str()));
    assert_eq!(
        exhausted_message(5),
        "Error: AI reached maximum thinking steps (5) without a conclusion."
    );
    assert_eq!(out.reasoning_rounds, 0);
}

#[tokio::test]
async fn custom_bound_is_honoured() {
    let (tools, _db) = customer_tools().await;
    let llm = ScriptedLlm::repeating(list_tables_call("loop"));
    let shared: Arc<dyn ToolCallingLlm> = llm.clone();
    let node = ReasoningNode::builder()
        .llm(shared)
        .tools(tools)
        .max_iterations(2)
        .build()
        .unwrap();

    let out = run(&node, question()).await;
    assert_eq!(llm.requests().len(), 2);
    assert_eq!(out.result, Some(exhausted_message(2)));
}

#[tokio::test]
async fn malformed_call_aborts_without_salvaging_other_calls() {
    let malformed = calls(vec![call(
        "c9",
        "db_query_tool",
        json!({"query": "CREATE TABLE Sneaky (x INTEGER)"}),
    )])
    .finish_reason(MALFORMED_FUNCTION_CALL);
    let llm = ScriptedLlm::new(vec![
        list_tables_call("c1"),
        query_call("c2", "SELECT 1"),
        malformed,
    ]);
    let (tools, db) = customer_tools().await;
    let shared: Arc<dyn ToolCallingLlm> = llm.clone();
    let node = ReasoningNode::builder().llm(shared).tools(tools).build().unwrap();

    let out = run(&node, question()).await;

    assert_eq!(llm.requests().len(), 3);
    assert_eq!(out.next, Some(Stage::End));
    assert_eq!(out.result.as_deref(), Some(MALFORMED_CALL_MESSAGE));
    assert!(!db.table_names().await.unwrap().contains(&"Sneaky".to_string()));
}

#[tokio::test]
async fn malformed_call_on_the_first_round_aborts_too() {
    let llm = ScriptedLlm::new(vec![
        LlmResponse::text("partial").finish_reason(MALFORMED_FUNCTION_CALL)
    ]);
    let node = node(llm.clone()).await;
    let out = run(&node, question()).await;

    assert_eq!(out.next, Some(Stage::End));
    assert_eq!(out.result.as_deref(), Some(MALFORMED_CALL_MESSAGE));
}

#[tokio::test]
async fn refusal_sentence_ends_the_workflow() {
    for text in [REFUSAL.to_string(), format!("  {REFUSAL}\n")] {
        let llm = ScriptedLlm::new(vec![LlmResponse::text(text.clone())]);
        let out = run(&node(llm).await, AgentState::new("What is the weather?")).await;
        assert_eq!(out.next, Some(Stage::End));
        assert_eq!(out.result, Some(text));
    }
}

#[tokio::test]
async fn other_text_is_handed_off_for_approval() {
    let embedded = format!("{REFUSAL} But here is 59.");
    for text in ["59", "There are 59 customers.", embedded.as_str()] {
        let llm = ScriptedLlm::new(vec![LlmResponse::text(text)]);
        let out = run(&node(llm).await, question()).await;
        assert_eq!(out.next, Some(Stage::HumanApproval), "text: {text}");
        assert_eq!(out.result.as_deref(), Some(text));
    }
}

#[tokio::test]
async fn unexpected_response_re_enters_reasoning_and_keeps_result() {
    let llm = ScriptedLlm::new(vec![list_tables_call("c1"), user_role("???")]);
    let node = node(llm.clone()).await;
    let mut state = question();
    state.result = Some("previous".to_string());

    let out = run(&node, state).await;
    assert_eq!(out.next, Some(Stage::Reasoning));
    assert_eq!(out.result.as_deref(), Some("previous"));
    assert_eq!(out.reasoning_rounds, 2);
}

#[tokio::test]
async fn re_entry_shares_the_iteration_bound() {
    let llm = ScriptedLlm::repeating(list_tables_call("loop"));
    let node = node(llm.clone()).await;
    let mut state = question();
    state.reasoning_rounds = 4;

    let out = run(&node, state).await;
    assert_eq!(llm.requests().len(), 1);
    assert_eq!(out.result, Some(exhausted_message(5)));

    let mut spent = question();
    spent.reasoning_rounds = 5;
    let out = run(&node, spent).await;
    assert_eq!(llm.requests().len(), 1);
    assert_eq!(out.next, Some(Stage::End));
}

#[tokio::test]
async fn empty_answer_without_tool_calls_consumes_an_iteration() {
    let llm = ScriptedLlm::new(vec![LlmResponse::text(""), LlmResponse::text("59")]);
    let node = node(llm.clone()).await;
    let out = run(&node, question()).await;

    assert_eq!(out.result.as_deref(), Some("59"));
    let requests = llm.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(requests[1].messages.len(), 2);
    assert_eq!(requests[1].messages[1].role, Role::Assistant);
}

#[tokio::test]
async fn protocol_errors_become_tool_results_and_the_round_continues() {
    let mut nameless = Map::new();
    nameless.insert("args".to_string(), json!({}));
    let round = calls(vec![
        ToolCallPayload::Record(nameless),
        ToolCallPayload::Opaque(json!("just text")),
        ToolCallPayload::Call(ToolCall {
            id: "c3".to_string(),
            name: "db_query_tool".to_string(),
            args: json!(null),
            error: Some("invalid JSON arguments: eof".to_string()),
        }),
        call("c4", "drop_everything", json!({})),
        call("c5", "db_query_tool", json!({})),
        call("c6", "describe_table", json!({"table_name": "Nope"})),
        call("c7", "db_query_tool", json!({"query": "SELECT COUNT(*) FROM Customer"})),
    ]);
    let llm = ScriptedLlm::new(vec![round, LlmResponse::text("59")]);
    let node = node(llm.clone()).await;

    let out = run(&node, question()).await;
    assert_eq!(out.next, Some(Stage::HumanApproval));

    let history = &llm.requests()[1].messages;
    assert_eq!(history.len(), 2 + 7);

    let issued: Vec<&str> = history[1].tool_calls.iter().map(|c| c.id.as_str()).collect();
    assert_eq!(issued, vec!["c3", "c4", "c5", "c6", "c7"]);

    let results: Vec<(&str, &str)> = history[2..]
        .iter()
        .map(|m| {
            assert_eq!(m.role, Role::Tool);
            (m.tool_call_id.as_deref().unwrap(), m.content.as_str())
        })
        .collect();

    assert_eq!(results[0].0, "missing_id");
    assert!(results[0]
        .1
        .starts_with("⚠️ Error: Parsed tool call missing name or id:"));
    assert_eq!(results[1].0, "unknown_tool_id");
    assert!(results[1].1.starts_with("⚠️ Error: Unknown tool call structure:"));
    assert_eq!(
        results[2],
        ("c3", "⚠️ Error: Invalid tool call from LLM - invalid JSON arguments: eof")
    );
    assert_eq!(results[3], ("c4", "\"⚠️ Unknown tool: drop_everything\""));
    assert_eq!(results[4].0, "c5");
    assert!(results[4].1.starts_with("⚠️ Error: invalid arguments for 'db_query_tool'"));
    assert!(results[4].1.contains("query"));
    assert_eq!(results[5], ("c6", r#"[["⚠️ Error: no such table: Nope"]]"#));
    assert_eq!(results[6], ("c7", "[[59]]"));
}

#[tokio::test]
async fn failing_query_is_fed_back_as_data() {
    let llm = ScriptedLlm::new(vec![
        query_call("c1", "SELECT * FROM Customers"),
        LlmResponse::text("59"),
    ]);
    let node = node(llm.clone()).await;
    run(&node, question()).await;

    let history = &llm.requests()[1].messages;
    let content = &history.last().unwrap().content;
    let rows: Vec<Vec<String>> = serde_json::from_str(content).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].len(), 1);
    assert!(rows[0][0].starts_with("⚠️ Error: "));
}

#[tokio::test]
async fn completion_failure_becomes_a_terminal_result() {
    let llm = ScriptedLlm::failing("connection reset");
    let out = run(&node(llm).await, question()).await;

    assert_eq!(out.next, Some(Stage::End));
    let result = out.result.unwrap();
    assert!(result.starts_with(LLM_FAILURE_PREFIX));
    assert!(result.contains("connection reset"));
}
