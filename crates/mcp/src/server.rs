// MCP server implementation: JSON-RPC over newline-delimited stdio

use crate::error::{McpError, McpResult};
use crate::protocol::{
    negotiate_version, CallToolParams, CallToolResult, CancelledParams, Implementation,
    InitializeParams, InitializeResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ToolsCapability, JSONRPC_VERSION,
};
use crate::tools::ToolRegistry;
use futures::{FutureExt, SinkExt, StreamExt};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::codec::{FramedRead, FramedWrite, LinesCodec, LinesCodecError};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Longest accepted request line
const MAX_LINE_LENGTH: usize = 4 * 1024 * 1024;

/// Responses buffered ahead of the writer
const RESPONSE_BUFFER: usize = 64;

const INSTRUCTIONS: &str = "Tools for the DeepSource code quality platform. Start with \
    deepsource_projects to find project keys, then query issues, runs, metrics, \
    vulnerabilities or compliance reports for a project.";

pub struct McpServer {
    registry: Arc<ToolRegistry>,
    cancel: CancellationToken,
}

impl McpServer {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            registry: Arc::new(registry),
            cancel: CancellationToken::new(),
        }
    }

    /// Share a root token with the client so shutdown also aborts retries
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Serve on stdin/stdout until EOF or Ctrl-C
    pub async fn start(&self) -> McpResult<()> {
        let cancel = self.cancel.clone();
        let signal = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupt received, shutting down");
                cancel.cancel();
            }
        });

        info!(tools = self.registry.len(), "MCP server listening on stdio");
        let result = self.serve(tokio::io::stdin(), tokio::io::stdout()).await;
        signal.abort();
        info!("MCP server stopped");
        result
    }

    /// Serve one connection.
    ///
    /// Tool calls run as independent tasks; responses go through a single
    /// writer. Reading stops at EOF or cancellation, then in-flight calls
    /// are drained before returning.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> McpResult<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let mut lines = FramedRead::new(reader, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
        let (tx, rx) = mpsc::channel::<JsonRpcResponse>(RESPONSE_BUFFER);
        let writer = tokio::spawn(write_responses(writer, rx));
        let mut calls: JoinSet<()> = JoinSet::new();

        let read_result = loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => {
                    debug!("Cancellation requested, no longer reading requests");
                    break Ok(());
                }
                Some(joined) = calls.join_next(), if !calls.is_empty() => {
                    if let Err(e) = joined {
                        error!(error = %e, "Tool call task failed");
                    }
                }
                line = lines.next() => match line {
                    None => {
                        debug!("Input closed");
                        break Ok(());
                    }
                    Some(Ok(line)) => self.handle_line(&line, &tx, &mut calls).await,
                    Some(Err(LinesCodecError::MaxLineLengthExceeded)) => {
                        warn!(max = MAX_LINE_LENGTH, "Request line too long, discarded");
                        let response =
                            JsonRpcResponse::error(serde_json::Value::Null, JsonRpcError::invalid_request());
                        send(&tx, response).await;
                    }
                    Some(Err(LinesCodecError::Io(e))) => {
                        break Err(McpError::Transport(e.to_string()));
                    }
                },
            }
        };

        if !calls.is_empty() {
            info!(in_flight = calls.len(), "Waiting for in-flight tool calls");
        }
        while let Some(joined) = calls.join_next().await {
            if let Err(e) = joined {
                error!(error = %e, "Tool call task failed");
            }
        }

        drop(tx);
        match writer.await {
            Ok(write_result) => read_result.and(write_result),
            Err(e) => Err(McpError::Transport(format!("writer task failed: {e}"))),
        }
    }

    async fn handle_line(
        &self,
        line: &str,
        tx: &mpsc::Sender<JsonRpcResponse>,
        calls: &mut JoinSet<()>,
    ) {
        if line.trim().is_empty() {
            return;
        }

        let request = match parse_request(line) {
            Ok(request) => request,
            Err(response) => {
                send(tx, response).await;
                return;
            }
        };

        if request.method == "tools/call" && !request.is_notification() {
            let registry = self.registry.clone();
            let tx = tx.clone();
            calls.spawn(async move {
                if let Some(response) = call_tool(&registry, request).await {
                    send(&tx, response).await;
                }
            });
            return;
        }

        if let Some(response) = self.handle_request(request).await {
            send(tx, response).await;
        }
    }

    /// Answer one request; notifications yield `None`
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let Some(id) = request.id.clone() else {
            self.handle_notification(&request);
            return None;
        };
        debug!(method = %request.method, "Handling request");
        if request.method == "tools/call" {
            return call_tool(&self.registry, request).await;
        }

        let response = match request.method.as_str() {
            "initialize" => self.initialize(id, request.params),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => JsonRpcResponse::success(
                id,
                ListToolsResult {
                    tools: self.registry.list(),
                },
            ),
            method => {
                debug!(method, "Unknown method");
                JsonRpcResponse::error(id, JsonRpcError::method_not_found(method))
            }
        };
        Some(response)
    }

    fn initialize(&self, id: serde_json::Value, params: Option<serde_json::Value>) -> JsonRpcResponse {
        let params: InitializeParams = match serde_json::from_value(params.unwrap_or_default()) {
            Ok(params) => params,
            Err(e) => return JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string())),
        };

        let version = negotiate_version(&params.protocol_version);
        info!(
            client = %params.client_info.name,
            client_version = %params.client_info.version,
            requested = %params.protocol_version,
            negotiated = version,
            "Client initialized"
        );

        JsonRpcResponse::success(
            id,
            InitializeResult {
                protocol_version: version.to_string(),
                capabilities: ServerCapabilities {
                    tools: Some(ToolsCapability {
                        list_changed: false,
                    }),
                },
                server_info: Implementation {
                    name: "deepsource-mcp".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                },
                instructions: Some(INSTRUCTIONS.to_string()),
            },
        )
    }

    fn handle_notification(&self, request: &JsonRpcRequest) {
        match request.method.as_str() {
            "notifications/initialized" => debug!("Client finished initialization"),
            "notifications/cancelled" => {
                match request
                    .params
                    .clone()
                    .map(serde_json::from_value::<CancelledParams>)
                {
                    Some(Ok(params)) => debug!(
                        request_id = %params.request_id,
                        reason = params.reason.as_deref().unwrap_or(""),
                        "Client cancelled request"
                    ),
                    _ => debug!("Malformed cancellation notification"),
                }
            }
            method => debug!(method, "Ignoring notification"),
        }
    }
}

fn parse_request(line: &str) -> Result<JsonRpcRequest, JsonRpcResponse> {
    let value: serde_json::Value = serde_json::from_str(line).map_err(|e| {
        debug!(error = %e, "Malformed JSON");
        JsonRpcResponse::error(serde_json::Value::Null, JsonRpcError::parse_error())
    })?;

    let id = value.get("id").cloned().unwrap_or_default();
    let request: JsonRpcRequest = serde_json::from_value(value)
        .map_err(|_| JsonRpcResponse::error(id.clone(), JsonRpcError::invalid_request()))?;
    if request.jsonrpc != JSONRPC_VERSION {
        return Err(JsonRpcResponse::error(id, JsonRpcError::invalid_request()));
    }
    Ok(request)
}

async fn call_tool(registry: &ToolRegistry, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
    let id = request.id?;
    let params: CallToolParams = match serde_json::from_value(request.params.unwrap_or_default()) {
        Ok(params) => params,
        Err(e) => {
            return Some(JsonRpcResponse::error(id, JsonRpcError::invalid_params(e.to_string())))
        }
    };

    let name = params.name;
    let result = AssertUnwindSafe(registry.dispatch(&name, params.arguments))
        .catch_unwind()
        .await
        .unwrap_or_else(|_| {
            error!(tool = %name, "Tool handler panicked");
            CallToolResult::error(format!("Tool '{name}' failed unexpectedly"), None)
        });

    Some(JsonRpcResponse::success(id, result))
}

async fn send(tx: &mpsc::Sender<JsonRpcResponse>, response: JsonRpcResponse) {
    if tx.send(response).await.is_err() {
        warn!("Response dropped, writer has stopped");
    }
}

async fn write_responses<W>(writer: W, mut rx: mpsc::Receiver<JsonRpcResponse>) -> McpResult<()>
where
    W: AsyncWrite + Unpin,
{
    let mut sink = FramedWrite::new(writer, LinesCodec::new());
    while let Some(response) = rx.recv().await {
        let line = serde_json::to_string(&response)?;
        sink.send(line)
            .await
            .map_err(|e| McpError::Transport(e.to_string()))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::testing::{client, viewer, ScriptedExecutor};
    use crate::tools::ProjectsTool;
    use serde_json::{json, Value};
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    fn server() -> McpServer {
        let executor = ScriptedExecutor::new(vec![Ok(viewer())]);
        let mut registry = ToolRegistry::new();
        registry.register(ProjectsTool::new(client(&executor))).unwrap();
        McpServer::new(registry)
    }

    /// Feed `requests` as input lines, then close input and collect every response
    async fn exchange(server: McpServer, requests: &[&str]) -> Vec<Value> {
        let (mut client_side, server_side) = tokio::io::duplex(64 * 1024);
        let (server_read, server_write) = tokio::io::split(server_side);

        let serving = tokio::spawn(async move { server.serve(server_read, server_write).await });

        for request in requests {
            client_side.write_all(request.as_bytes()).await.unwrap();
            client_side.write_all(b"\n").await.unwrap();
        }
        client_side.shutdown().await.unwrap();

        let mut responses = Vec::new();
        let mut lines = BufReader::new(client_side).lines();
        while let Some(line) = lines.next_line().await.unwrap() {
            responses.push(serde_json::from_str(&line).unwrap());
        }
        serving.await.unwrap().unwrap();
        responses
    }

    #[tokio::test]
    async fn test_initialize_round_trip() {
        let responses = exchange(
            server(),
            &[r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1.0"}}}"#],
        )
        .await;

        assert_eq!(responses.len(), 1);
        let result = &responses[0]["result"];
        assert_eq!(responses[0]["id"], 1);
        assert_eq!(result["protocolVersion"], "2024-11-05");
        assert_eq!(result["serverInfo"]["name"], "deepsource-mcp");
        assert_eq!(result["capabilities"]["tools"]["listChanged"], false);
    }

    #[tokio::test]
    async fn test_tools_list_round_trip() {
        let responses = exchange(
            server(),
            &[
                r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
                r#"{"jsonrpc":"2.0","id":"a","method":"tools/list"}"#,
            ],
        )
        .await;

        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0]["id"], "a");
        let tools = responses[0]["result"]["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0]["name"], "deepsource_projects");
        assert_eq!(tools[0]["inputSchema"]["type"], "object");
    }

    #[tokio::test]
    async fn test_tools_call_round_trip() {
        let responses = exchange(
            server(),
            &[r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"deepsource_projects","arguments":{}}}"#],
        )
        .await;

        assert_eq!(responses.len(), 1);
        let result = &responses[0]["result"];
        assert_eq!(responses[0]["id"], 7);
        assert_eq!(result["isError"], false);
        assert_eq!(result["structuredContent"]["projects"][0]["key"], "dsn-demo");
        assert_eq!(result["content"][0]["type"], "text");
    }

    #[tokio::test]
    async fn test_unknown_tool_is_error_result() {
        let responses = exchange(
            server(),
            &[r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"nope"}}"#],
        )
        .await;

        assert_eq!(responses[0]["result"]["isError"], true);
        assert!(responses[0].get("error").is_none());
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let responses = exchange(
            server(),
            &[
                "{not json",
                r#"{"jsonrpc":"2.0","id":3,"method":"resources/list"}"#,
                r#"{"jsonrpc":"2.0","id":4,"method":"tools/call","params":{"arguments":{}}}"#,
                r#"{"jsonrpc":"1.0","id":5,"method":"ping"}"#,
            ],
        )
        .await;

        let code = |id: Value| {
            responses
                .iter()
                .find(|r| r["id"] == id)
                .map(|r| r["error"]["code"].clone())
                .unwrap()
        };
        assert_eq!(code(Value::Null), -32700);
        assert_eq!(code(json!(3)), -32601);
        assert_eq!(code(json!(4)), -32602);
        assert_eq!(code(json!(5)), -32600);
    }

    #[tokio::test]
    async fn test_ping_and_cancelled_notification() {
        let server = server();
        let cancelled = JsonRpcRequest::notification(
            "notifications/cancelled",
            json!({"requestId": 9, "reason": "user abort"}),
        );
        assert!(server.handle_request(cancelled).await.is_none());

        let pong = server
            .handle_request(JsonRpcRequest::new(1, "ping", json!({})))
            .await
            .unwrap();
        assert_eq!(pong.result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_cancellation_stops_serving() {
        let cancel = CancellationToken::new();
        let server = server().with_cancellation(cancel.clone());
        let (_client_side, server_side) = tokio::io::duplex(1024);
        let (server_read, server_write) = tokio::io::split(server_side);

        cancel.cancel();
        server.serve(server_read, server_write).await.unwrap();
    }
}
