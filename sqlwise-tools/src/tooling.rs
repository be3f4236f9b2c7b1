use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use sqlwise_core::{ToolInvocation, ToolSpec};

use crate::error::{ToolDispatchError, ToolSetBuildError};

#[derive(Clone, Debug)]
pub struct ToolContext {
    pub call_id: String,
}

/// A tool with a typed argument contract.
///
/// The JSON schema of `Args` is what gets declared to the completion
/// service, and dispatch fails with [`ToolDispatchError::InvalidArgs`] when a
/// required argument is missing. Once the arguments parse, a tool always
/// answers: store failures are reported inside `Output`.
#[async_trait::async_trait]
pub trait TypedTool: Send + Sync + 'static {
    type Args: DeserializeOwned + JsonSchema + Send;
    type Output: Serialize + Send;

    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    async fn run(&self, args: Self::Args, ctx: ToolContext) -> Self::Output;
}

#[derive(Clone)]
pub struct ToolSet {
    specs: Vec<ToolSpec>,
    dispatchers: BTreeMap<String, Arc<dyn ErasedToolRunner>>,
}

impl std::fmt::Debug for ToolSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolSet")
            .field("names", &self.names())
            .finish()
    }
}

impl ToolSet {
    #[allow(clippy::new_ret_no_self)]
    pub fn new() -> ToolSetBuilder {
        ToolSetBuilder::default()
    }

    pub fn names(&self) -> Vec<&str> {
        self.specs.iter().map(|spec| spec.name.as_str()).collect()
    }

    /// Declarations handed to the completion service, in registration order.
    pub fn specs(&self) -> &[ToolSpec] {
        &self.specs
    }

    pub async fn dispatch(
        &self,
        invocation: &ToolInvocation,
        ctx: ToolContext,
    ) -> Result<Value, ToolDispatchError> {
        let Some(dispatcher) = self.dispatchers.get(&invocation.name) else {
            return Err(ToolDispatchError::UnknownTool {
                name: invocation.name.clone(),
                call_id: invocation.call_id.clone(),
            });
        };

        dispatcher
            .dispatch(
                &invocation.name,
                Value::Object(invocation.arguments.clone()),
                invocation.call_id.clone(),
                ctx,
            )
            .await
    }
}

#[derive(Clone, Default)]
pub struct ToolSetBuilder {
    specs: Vec<ToolSpec>,
    dispatchers: Vec<(String, Arc<dyn ErasedToolRunner>)>,
}

impl ToolSetBuilder {
    pub fn register_with<T>(mut self, tool: T) -> Self
    where
        T: TypedTool,
    {
        self.specs.push(ToolSpec {
            name: T::NAME.to_string(),
            description: T::DESCRIPTION.to_string(),
            parameters: args_schema::<T::Args>(),
        });
        self.dispatchers
            .push((T::NAME.to_string(), Arc::new(TypedToolRunner { tool })));
        self
    }

    pub fn build(self) -> Result<ToolSet, ToolSetBuildError> {
        let mut seen = HashSet::new();
        for spec in &self.specs {
            if spec.name.trim().is_empty() {
                return Err(ToolSetBuildError::InvalidName {
                    name: spec.name.clone(),
                });
            }
            if !seen.insert(spec.name.clone()) {
                return Err(ToolSetBuildError::DuplicateName {
                    name: spec.name.clone(),
                });
            }
        }

        Ok(ToolSet {
            specs: self.specs,
            dispatchers: self.dispatchers.into_iter().collect(),
        })
    }
}

/// Object schema for a tool's arguments, without the draft and title
/// metadata that provider function declarations do not accept.
fn args_schema<A: JsonSchema>() -> Value {
    let schema = schemars::schema_for!(A);
    let mut value = serde_json::to_value(schema).unwrap_or_else(|_| serde_json::json!({}));
    if let Value::Object(map) = &mut value {
        map.remove("$schema");
        map.remove("title");
        map.entry("type")
            .or_insert_with(|| Value::String("object".to_string()));
        map.entry("properties")
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    value
}

#[async_trait::async_trait]
trait ErasedToolRunner: Send + Sync {
    async fn dispatch(
        &self,
        name: &str,
        args: Value,
        call_id: String,
        ctx: ToolContext,
    ) -> Result<Value, ToolDispatchError>;
}

struct TypedToolRunner<T> {
    tool: T,
}

#[async_trait::async_trait]
impl<T> ErasedToolRunner for TypedToolRunner<T>
where
    T: TypedTool,
{
    async fn dispatch(
        &self,
        name: &str,
        args: Value,
        call_id: String,
        ctx: ToolContext,
    ) -> Result<Value, ToolDispatchError> {
        let typed_args = serde_json::from_value::<T::Args>(args).map_err(|source| {
            ToolDispatchError::InvalidArgs {
                name: name.to_string(),
                call_id: call_id.clone(),
                source,
            }
        })?;

        let output = self.tool.run(typed_args, ctx).await;

        serde_json::to_value(output).map_err(|source| ToolDispatchError::Serialization {
            name: name.to_string(),
            call_id,
            source,
        })
    }
}
