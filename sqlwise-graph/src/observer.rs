use serde_json::Value;

use crate::GraphError;

/// Receives node lifecycle events; states are passed in serialized form.
#[async_trait::async_trait]
pub trait Observer: Send + Sync {
    async fn on_node_start(&self, _node_id: &str, _input: &Value) {}
    async fn on_node_end(&self, _node_id: &str, _output: &Value, _duration_ms: u128) {}
    async fn on_error(&self, _node_id: &str, _error: &GraphError) {}
}
