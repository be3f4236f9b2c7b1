#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};
use sqlwise_core::{
    LlmRequest, LlmResponse, Role, SqlwiseError, ToolCall, ToolCallPayload, ToolCallingLlm,
};
use sqlwise_tools::{sql_toolset, SqlDatabase, SqliteDatabase, ToolSet};

pub const CUSTOMERS: &str = "
CREATE TABLE Customer (CustomerId INTEGER PRIMARY KEY, FirstName TEXT NOT NULL, Country TEXT);
CREATE TABLE Invoice (InvoiceId INTEGER PRIMARY KEY, CustomerId INTEGER, Total REAL);
WITH RECURSIVE seq(n) AS (SELECT 1 UNION ALL SELECT n + 1 FROM seq WHERE n < 59)
INSERT INTO Customer (CustomerId, FirstName, Country)
SELECT n, 'Customer ' || n, 'Country ' || (n % 5) FROM seq;
";

pub async fn customer_db() -> Arc<SqliteDatabase> {
    let db = SqliteDatabase::connect("sqlite::memory:").await.unwrap();
    db.execute_script(CUSTOMERS).await.unwrap();
    Arc::new(db)
}

pub async fn customer_tools() -> (ToolSet, Arc<SqliteDatabase>) {
    let db = customer_db().await;
    let shared: Arc<dyn SqlDatabase> = db.clone();
    (sql_toolset(shared).unwrap(), db)
}

pub fn call(id: &str, name: &str, args: Value) -> ToolCallPayload {
    ToolCallPayload::Call(ToolCall {
        id: id.to_string(),
        name: name.to_string(),
        args,
        error: None,
    })
}

pub fn calls(payloads: Vec<ToolCallPayload>) -> LlmResponse {
    LlmResponse::with_tool_calls(payloads)
}

pub fn list_tables_call(id: &str) -> LlmResponse {
    calls(vec![call(id, "list_tables", json!({}))])
}

pub fn query_call(id: &str, query: &str) -> LlmResponse {
    calls(vec![call(id, "db_query_tool", json!({ "query": query }))])
}

pub fn user_role(content: &str) -> LlmResponse {
    LlmResponse {
        role: Role::User,
        content: content.to_string(),
        ..LlmResponse::default()
    }
}

/// Completion service fake: replays responses in order, then repeats the
/// fallback (or fails when there is none). Every request is recorded.
#[derive(Default)]
pub struct ScriptedLlm {
    responses: Mutex<VecDeque<Result<LlmResponse, String>>>,
    fallback: Option<LlmResponse>,
    requests: Mutex<Vec<LlmRequest>>,
}

impl ScriptedLlm {
    pub fn new(responses: Vec<LlmResponse>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(responses.into_iter().map(Ok).collect()),
            ..Self::default()
        })
    }

    pub fn repeating(response: LlmResponse) -> Arc<Self> {
        Arc::new(Self {
            fallback: Some(response),
            ..Self::default()
        })
    }

    pub fn failing(message: &str) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from([Err(message.to_string())])),
            ..Self::default()
        })
    }

    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ToolCallingLlm for ScriptedLlm {
    async fn invoke(&self, request: LlmRequest) -> Result<LlmResponse, SqlwiseError> {
        self.requests.lock().unwrap().push(request);
        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(response)) => Ok(response),
            Some(Err(message)) => Err(SqlwiseError::LlmProvider(message)),
            None => self
                .fallback
                .clone()
                .ok_or_else(|| SqlwiseError::LlmProvider("script exhausted".to_string())),
        }
    }
}
