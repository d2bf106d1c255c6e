// MCP (Model Context Protocol) server exposing DeepSource to agent clients

pub mod config;
pub mod error;
pub mod protocol;
pub mod server;
pub mod tools;

pub use config::ServerConfig;
pub use error::{McpError, McpResult};
pub use server::McpServer;
pub use tools::{register_all, Tool, ToolInput, ToolRegistry};
