//! Error types for the MCP server

use deepsource_sdk::{ClassifiedError, ErrorCategory};
use thiserror::Error;

/// Result type alias for MCP operations
pub type McpResult<T> = std::result::Result<T, McpError>;

/// Errors that can occur in the MCP server
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Tool '{0}' is already registered")]
    DuplicateTool(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid input for '{tool}': {message}")]
    Validation { tool: String, message: String },

    #[error("{0}")]
    Tool(#[from] ClassifiedError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Output of '{0}' is not a JSON object")]
    OutputSchema(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("MCP transport error: {0}")]
    Transport(String),
}

impl McpError {
    /// Convert to MCP tool error format (isError: true response)
    pub fn to_tool_error_message(&self) -> String {
        match self {
            McpError::DuplicateTool(name) => format!("Tool '{name}' is registered twice"),
            McpError::UnknownTool(name) => {
                format!("Unknown tool: {name}\n\nHint: call tools/list to see the available tools.")
            }
            McpError::Validation { tool, message } => {
                format!("Invalid arguments for {tool}: {message}")
            }
            McpError::Tool(error) => tool_error_message(error),
            McpError::Serialization(e) => format!("Failed to format results: {e}"),
            McpError::OutputSchema(tool) => {
                format!("Tool {tool} produced a result that is not a JSON object")
            }
            McpError::Config(msg) => {
                format!("Configuration error: {msg}\n\nPlease check your deepsource-mcp configuration.")
            }
            McpError::Transport(msg) => format!("Transport error: {msg}"),
        }
    }

    /// Machine-readable details attached as `structuredContent` of an error result
    pub fn error_details(&self) -> serde_json::Value {
        match self {
            McpError::Tool(error) => serde_json::json!({
                "category": error.category(),
                "code": error.code(),
                "message": error.message(),
                "metadata": error.metadata(),
            }),
            McpError::Validation { tool, message } => serde_json::json!({
                "category": ErrorCategory::Client,
                "tool": tool,
                "message": message,
            }),
            McpError::UnknownTool(name) => serde_json::json!({
                "category": ErrorCategory::Client,
                "tool": name,
                "message": self.to_string(),
            }),
            other => serde_json::json!({
                "category": ErrorCategory::Other,
                "message": other.to_string(),
            }),
        }
    }
}

fn tool_error_message(error: &ClassifiedError) -> String {
    let hint = match error.category() {
        _ if error.is_cancelled() => "The request was cancelled before it completed.",
        ErrorCategory::Auth => {
            "Check that DEEPSOURCE_API_KEY is set to a valid personal access token."
        }
        ErrorCategory::RateLimit => "DeepSource is rate limiting requests; wait before retrying.",
        ErrorCategory::NotFound => {
            "Verify the identifier; deepsource_projects lists the valid project keys."
        }
        ErrorCategory::Network | ErrorCategory::Timeout | ErrorCategory::Server => {
            let attempts = error
                .metadata()
                .get("attempts")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(1);
            if attempts > 1 {
                "The DeepSource API could not be reached reliably; retries were exhausted."
            } else {
                "The DeepSource API could not be reached; the request was not retried."
            }
        }
        ErrorCategory::Schema | ErrorCategory::Format => {
            "The DeepSource API returned an unexpected response."
        }
        ErrorCategory::Client => "The request was rejected; check the arguments.",
        ErrorCategory::Other => "",
    };

    if hint.is_empty() {
        error.to_string()
    } else {
        format!("{error}\n\nHint: {hint}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_error_has_hint() {
        let error = McpError::Tool(ClassifiedError::new(ErrorCategory::Auth, "Unauthorized"));
        let message = error.to_tool_error_message();

        assert!(message.starts_with("[AUTH] Unauthorized"));
        assert!(message.contains("DEEPSOURCE_API_KEY"));
    }

    #[test]
    fn test_transient_hint_reflects_attempts() {
        let retried = McpError::Tool(
            ClassifiedError::new(ErrorCategory::Server, "HTTP 503").with_metadata("attempts", 3),
        );
        assert!(retried.to_tool_error_message().contains("retries were exhausted"));

        let single = McpError::Tool(
            ClassifiedError::new(ErrorCategory::Network, "connection refused")
                .with_metadata("attempts", 1),
        );
        let message = single.to_tool_error_message();
        assert!(message.contains("not retried"));
        assert!(!message.contains("exhausted"));
    }

    #[test]
    fn test_cancelled_error_hint() {
        let error = McpError::Tool(ClassifiedError::cancelled());
        assert!(error.to_tool_error_message().contains("cancelled"));
    }

    #[test]
    fn test_error_details_carry_category() {
        let error = McpError::Tool(
            ClassifiedError::not_found("Project 'x' was not found").with_metadata("project_key", "x"),
        );
        let details = error.error_details();

        assert_eq!(details["category"], "NOT_FOUND");
        assert_eq!(details["metadata"]["project_key"], "x");

        let validation = McpError::Validation {
            tool: "deepsource_run".to_string(),
            message: "missing field".to_string(),
        };
        assert_eq!(validation.error_details()["category"], "CLIENT");
    }
}
