//! GraphQL wire types.

use deepsource_core::{Page, PageInfo, Pagination};
use serde::{Deserialize, Serialize};

/// A GraphQL POST body.
#[derive(Debug, Clone, Serialize)]
pub struct GraphQlRequest {
    pub query: String,
    pub variables: serde_json::Value,
    #[serde(rename = "operationName", skip_serializing_if = "Option::is_none")]
    pub operation_name: Option<String>,
}

impl GraphQlRequest {
    pub fn new(query: impl Into<String>, variables: serde_json::Value) -> Self {
        Self {
            query: query.into(),
            variables,
            operation_name: None,
        }
    }

    pub fn operation(mut self, name: impl Into<String>) -> Self {
        self.operation_name = Some(name.into());
        self
    }

    /// Name used in logs.
    pub fn label(&self) -> &str {
        self.operation_name.as_deref().unwrap_or("anonymous")
    }
}

/// Envelope returned by the GraphQL endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlResponse {
    pub data: Option<serde_json::Value>,
    pub errors: Option<Vec<GraphQlError>>,
}

/// One entry of a GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<Vec<serde_json::Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extensions: Option<serde_json::Value>,
}

impl GraphQlError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            path: None,
            extensions: None,
        }
    }

    /// `extensions.code`, when the server sets one.
    pub fn code(&self) -> Option<&str> {
        self.extensions
            .as_ref()
            .and_then(|ext| ext.get("code"))
            .and_then(|code| code.as_str())
    }
}

/// Relay connection as returned by list fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct Connection<T> {
    #[serde(default)]
    pub total_count: Option<u64>,
    #[serde(default)]
    pub page_info: Option<PageInfoDto>,
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct Edge<T> {
    pub node: Option<T>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PageInfoDto {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

impl From<PageInfoDto> for PageInfo {
    fn from(dto: PageInfoDto) -> Self {
        Self {
            has_next_page: dto.has_next_page,
            has_previous_page: dto.has_previous_page,
            start_cursor: dto.start_cursor,
            end_cursor: dto.end_cursor,
        }
    }
}

impl<T> Connection<T> {
    pub fn nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().filter_map(|edge| edge.node)
    }

    /// Convert into a page, mapping every node.
    pub fn into_page<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        let page_info = self.page_info.clone().unwrap_or_default().into();
        let total_count = self.total_count;
        Page {
            items: self.nodes().collect(),
            page_info,
            total_count,
        }
        .map(f)
    }
}

/// GraphQL variables for a connection's cursor arguments.
pub(crate) fn pagination_variables(pagination: &Pagination) -> serde_json::Value {
    let pagination = pagination.normalized();
    serde_json::json!({
        "first": pagination.first,
        "after": pagination.after,
        "last": pagination.last,
        "before": pagination.before,
    })
}

/// Merge extra variables into an object of variables.
pub(crate) fn merge_variables(
    mut base: serde_json::Value,
    extra: serde_json::Value,
) -> serde_json::Value {
    if let (Some(base), serde_json::Value::Object(extra)) = (base.as_object_mut(), extra) {
        base.extend(extra);
    }
    base
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GraphQlRequest::new("query Q { viewer { email } }", serde_json::json!({}))
            .operation("Q");
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["operationName"], "Q");
        assert_eq!(json["variables"], serde_json::json!({}));
        assert_eq!(request.label(), "Q");
    }

    #[test]
    fn test_error_code_extension() {
        let error: GraphQlError = serde_json::from_value(serde_json::json!({
            "message": "Not authorized",
            "extensions": {"code": "UNAUTHENTICATED"}
        }))
        .unwrap();
        assert_eq!(error.code(), Some("UNAUTHENTICATED"));
        assert_eq!(GraphQlError::new("x").code(), None);
    }

    #[test]
    fn test_connection_into_page_skips_null_nodes() {
        let connection: Connection<u32> = serde_json::from_value(serde_json::json!({
            "totalCount": 3,
            "pageInfo": {"hasNextPage": true, "hasPreviousPage": false, "startCursor": "a", "endCursor": "b"},
            "edges": [{"node": 1}, {"node": null}, {"node": 3}]
        }))
        .unwrap();

        let page = connection.into_page(|n| n * 10);
        assert_eq!(page.items, vec![10, 30]);
        assert_eq!(page.total_count, Some(3));
        assert!(page.page_info.has_next_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("b"));
    }

    #[test]
    fn test_pagination_variables_default_page() {
        let vars = pagination_variables(&Pagination::default());
        assert_eq!(vars["first"], 20);
        assert!(vars["last"].is_null());
    }

    #[test]
    fn test_merge_variables() {
        let merged = merge_variables(
            serde_json::json!({"login": "acme"}),
            serde_json::json!({"first": 5}),
        );
        assert_eq!(merged, serde_json::json!({"login": "acme", "first": 5}));
    }
}
