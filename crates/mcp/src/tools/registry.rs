// MCP tool definitions and dispatch

use crate::error::{McpError, McpResult};
use crate::protocol::{CallToolResult, ToolSchema};
use deepsource_sdk::classifier::category_of;
use deepsource_sdk::ClassifiedError;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Checks on a tool's input beyond what its JSON schema expresses
pub trait ToolInput {
    fn validate(&self) -> Result<(), String> {
        Ok(())
    }
}

/// A named operation exposed to MCP clients.
///
/// Input and output schemas are derived from the associated types, and
/// arguments are deserialized and validated before `call` runs.
#[async_trait::async_trait]
pub trait Tool: Send + Sync + 'static {
    type Input: DeserializeOwned + JsonSchema + ToolInput + Send;
    type Output: Serialize + JsonSchema + Send;

    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    async fn call(&self, input: Self::Input) -> anyhow::Result<Self::Output>;
}

#[async_trait::async_trait]
trait ErasedTool: Send + Sync {
    fn schema(&self) -> &ToolSchema;

    async fn invoke(&self, arguments: serde_json::Value) -> McpResult<serde_json::Value>;
}

struct TypedTool<T: Tool> {
    tool: T,
    schema: ToolSchema,
}

#[async_trait::async_trait]
impl<T: Tool> ErasedTool for TypedTool<T> {
    fn schema(&self) -> &ToolSchema {
        &self.schema
    }

    async fn invoke(&self, arguments: serde_json::Value) -> McpResult<serde_json::Value> {
        let name = self.tool.name();
        let input: T::Input = serde_json::from_value(arguments).map_err(|e| McpError::Validation {
            tool: name.to_string(),
            message: e.to_string(),
        })?;
        input.validate().map_err(|message| McpError::Validation {
            tool: name.to_string(),
            message,
        })?;

        let output = self.tool.call(input).await.map_err(classify_handler_error)?;

        let value = serde_json::to_value(output)?;
        if !value.is_object() {
            return Err(McpError::OutputSchema(name.to_string()));
        }
        Ok(value)
    }
}

/// Handler failures become classified errors, whatever their origin
fn classify_handler_error(error: anyhow::Error) -> McpError {
    if let Some(classified) = error.downcast_ref::<ClassifiedError>() {
        return McpError::Tool(classified.clone());
    }
    let error = match error.downcast::<McpError>() {
        Ok(mcp) => return mcp,
        Err(error) => error,
    };

    let category = category_of(error.as_ref());
    let message = format!("{error:#}");
    let source: Box<dyn std::error::Error + Send + Sync> = error.into();
    McpError::Tool(ClassifiedError::new(category, message).with_shared_source(Arc::from(source)))
}

fn schema_for<S: JsonSchema>() -> McpResult<serde_json::Value> {
    let schema = schemars::SchemaGenerator::default().into_root_schema_for::<S>();
    Ok(serde_json::to_value(schema)?)
}

fn is_object_schema(schema: &serde_json::Value) -> bool {
    schema.get("type").and_then(|t| t.as_str()) == Some("object")
}

/// Tool registry for managing available tools
#[derive(Default)]
pub struct ToolRegistry {
    tools: BTreeMap<String, Arc<dyn ErasedTool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool; names must be unique
    pub fn register<T: Tool>(&mut self, tool: T) -> McpResult<()> {
        let name = tool.name();
        if self.tools.contains_key(name) {
            return Err(McpError::DuplicateTool(name.to_string()));
        }

        let input_schema = schema_for::<T::Input>()?;
        if !is_object_schema(&input_schema) {
            return Err(McpError::Config(format!(
                "input schema of '{name}' must describe an object"
            )));
        }
        let output_schema = schema_for::<T::Output>()?;

        let schema = ToolSchema {
            name: name.to_string(),
            description: tool.description().to_string(),
            input_schema,
            output_schema: is_object_schema(&output_schema).then_some(output_schema),
        };

        debug!(tool = name, "Registered tool");
        self.tools
            .insert(name.to_string(), Arc::new(TypedTool { tool, schema }));
        Ok(())
    }

    /// Get a tool's descriptor by name
    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.tools.get(name).map(|t| t.schema())
    }

    /// All tool descriptors, sorted by name
    pub fn list(&self) -> Vec<ToolSchema> {
        self.tools.values().map(|t| t.schema().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool, surfacing registry and handler failures as errors
    pub async fn try_dispatch(
        &self,
        name: &str,
        arguments: Option<serde_json::Value>,
    ) -> McpResult<CallToolResult> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| McpError::UnknownTool(name.to_string()))?;

        let arguments = match arguments {
            None | Some(serde_json::Value::Null) => serde_json::json!({}),
            Some(arguments) => arguments,
        };

        let value = tool.invoke(arguments).await?;
        Ok(CallToolResult::structured(value))
    }

    /// Invoke a tool; every failure becomes an `isError: true` result
    pub async fn dispatch(&self, name: &str, arguments: Option<serde_json::Value>) -> CallToolResult {
        let started = Instant::now();
        match self.try_dispatch(name, arguments).await {
            Ok(result) => {
                info!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Tool call succeeded"
                );
                result
            }
            Err(error) => {
                warn!(
                    tool = name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    error = %error,
                    "Tool call failed"
                );
                CallToolResult::error(error.to_tool_error_message(), Some(error.error_details()))
            }
        }
    }
}
