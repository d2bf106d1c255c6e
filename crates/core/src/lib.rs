// Domain records for the DeepSource MCP server

pub mod compliance;
pub mod metrics;
pub mod pagination;
pub mod types;
pub mod vulnerability;

pub use compliance::*;
pub use metrics::*;
pub use pagination::{Page, PageInfo, Pagination, PaginationError, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use types::*;
pub use vulnerability::*;
