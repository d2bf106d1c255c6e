// Relay-style cursor pagination shared by every list operation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Largest page the API serves in one request
pub const MAX_PAGE_SIZE: u32 = 100;

/// Page size used when the caller does not ask for one
pub const DEFAULT_PAGE_SIZE: u32 = 20;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PaginationError {
    #[error("page size must be between 1 and {MAX_PAGE_SIZE}, got {0}")]
    PageSize(u32),

    #[error("'first' and 'last' cannot be used together")]
    ConflictingDirection,

    #[error("'after' can only be combined with forward paging ('first')")]
    AfterWithLast,

    #[error("'before' can only be combined with backward paging ('last')")]
    BeforeWithFirst,

    #[error("invalid cursor: {0}")]
    InvalidCursor(String),
}

/// Cursor arguments for a connection query
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Pagination {
    /// Page size when paging forward (1-100)
    pub first: Option<u32>,
    /// Cursor to continue after, from `end_cursor` of the previous page
    pub after: Option<String>,
    /// Page size when paging backward (1-100)
    pub last: Option<u32>,
    /// Cursor to continue before, from `start_cursor` of the previous page
    pub before: Option<String>,
}

impl Pagination {
    pub fn first(count: u32) -> Self {
        Self {
            first: Some(count),
            ..Default::default()
        }
    }

    pub fn after(mut self, cursor: impl Into<String>) -> Self {
        self.after = Some(cursor.into());
        self
    }

    pub fn validate(&self) -> Result<(), PaginationError> {
        if self.first.is_some() && self.last.is_some() {
            return Err(PaginationError::ConflictingDirection);
        }
        for size in [self.first, self.last].into_iter().flatten() {
            if size == 0 || size > MAX_PAGE_SIZE {
                return Err(PaginationError::PageSize(size));
            }
        }
        if self.after.is_some() && self.last.is_some() {
            return Err(PaginationError::AfterWithLast);
        }
        if self.before.is_some() && self.first.is_some() {
            return Err(PaginationError::BeforeWithFirst);
        }
        Ok(())
    }

    /// Fill in the default forward page size when no direction was given
    pub fn normalized(&self) -> Self {
        let mut normalized = self.clone();
        if normalized.first.is_none() && normalized.last.is_none() {
            if normalized.before.is_some() {
                normalized.last = Some(DEFAULT_PAGE_SIZE);
            } else {
                normalized.first = Some(DEFAULT_PAGE_SIZE);
            }
        }
        normalized
    }
}

/// Position information for a fetched page
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
}

/// One page of results from a connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page_info: PageInfo,
    pub total_count: Option<u64>,
}

impl<T> Page<T> {
    /// Convert every item, keeping the page info
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            items: self.items.into_iter().map(f).collect(),
            page_info: self.page_info,
            total_count: self.total_count,
        }
    }

    /// Slice an in-memory list the same way the API slices a connection.
    ///
    /// Cursors are the decimal index of an item within `items`.
    pub fn from_items(items: Vec<T>, pagination: &Pagination) -> Result<Self, PaginationError> {
        pagination.validate()?;
        let pagination = pagination.normalized();
        let total = items.len();

        let parse = |cursor: &str| -> Result<usize, PaginationError> {
            cursor
                .parse::<usize>()
                .map_err(|_| PaginationError::InvalidCursor(cursor.to_string()))
        };

        let mut start = match pagination.after.as_deref() {
            Some(cursor) => parse(cursor)?.saturating_add(1).min(total),
            None => 0,
        };
        let mut end = match pagination.before.as_deref() {
            Some(cursor) => parse(cursor)?.min(total),
            None => total,
        };
        if end < start {
            end = start;
        }

        if let Some(first) = pagination.first {
            end = end.min(start + first as usize);
        } else if let Some(last) = pagination.last {
            start = start.max(end.saturating_sub(last as usize));
        }

        let page_info = PageInfo {
            has_next_page: end < total,
            has_previous_page: start > 0,
            start_cursor: (start < end).then(|| start.to_string()),
            end_cursor: (start < end).then(|| (end - 1).to_string()),
        };

        let items = items.into_iter().skip(start).take(end - start).collect();

        Ok(Self {
            items,
            page_info,
            total_count: Some(total as u64),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_conflicting_direction() {
        let pagination = Pagination {
            first: Some(10),
            last: Some(10),
            ..Default::default()
        };
        assert_eq!(
            pagination.validate(),
            Err(PaginationError::ConflictingDirection)
        );
    }

    #[test]
    fn test_validate_page_size_bounds() {
        assert_eq!(
            Pagination::first(0).validate(),
            Err(PaginationError::PageSize(0))
        );
        assert_eq!(
            Pagination::first(101).validate(),
            Err(PaginationError::PageSize(101))
        );
        assert!(Pagination::first(100).validate().is_ok());
    }

    #[test]
    fn test_validate_cursor_direction() {
        let pagination = Pagination {
            last: Some(5),
            after: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(pagination.validate(), Err(PaginationError::AfterWithLast));

        let pagination = Pagination {
            first: Some(5),
            before: Some("abc".to_string()),
            ..Default::default()
        };
        assert_eq!(pagination.validate(), Err(PaginationError::BeforeWithFirst));
    }

    #[test]
    fn test_normalized_defaults() {
        assert_eq!(
            Pagination::default().normalized().first,
            Some(DEFAULT_PAGE_SIZE)
        );

        let backward = Pagination {
            before: Some("10".to_string()),
            ..Default::default()
        };
        assert_eq!(backward.normalized().last, Some(DEFAULT_PAGE_SIZE));
    }

    #[test]
    fn test_from_items_forward() {
        let items: Vec<u32> = (0..10).collect();

        let page = Page::from_items(items.clone(), &Pagination::first(4)).unwrap();
        assert_eq!(page.items, vec![0, 1, 2, 3]);
        assert!(page.page_info.has_next_page);
        assert!(!page.page_info.has_previous_page);
        assert_eq!(page.page_info.end_cursor.as_deref(), Some("3"));
        assert_eq!(page.total_count, Some(10));

        let next = Page::from_items(items, &Pagination::first(4).after("3")).unwrap();
        assert_eq!(next.items, vec![4, 5, 6, 7]);
        assert!(next.page_info.has_previous_page);
    }

    #[test]
    fn test_from_items_backward() {
        let items: Vec<u32> = (0..10).collect();
        let pagination = Pagination {
            last: Some(3),
            before: Some("5".to_string()),
            ..Default::default()
        };

        let page = Page::from_items(items, &pagination).unwrap();
        assert_eq!(page.items, vec![2, 3, 4]);
        assert!(page.page_info.has_next_page);
        assert!(page.page_info.has_previous_page);
    }

    #[test]
    fn test_from_items_invalid_cursor() {
        let result = Page::from_items(vec![1, 2, 3], &Pagination::first(2).after("zz"));
        assert_eq!(
            result.unwrap_err(),
            PaginationError::InvalidCursor("zz".to_string())
        );
    }
}
