//! Pagination window and list envelope types.
//!
//! A list response is a [`Page`]: the window that produced it, the total number of
//! documents matching the filter (not just the ones on this page), and the page items.
//! It serializes as `{"meta": {"limit", "offset", "total_count"}, "objects": [...]}`.

use serde::{Deserialize, Serialize};

use crate::query::{Query, RawFilter};

/// Default number of documents per page.
pub const DEFAULT_LIMIT: usize = 20;

/// Default number of documents skipped.
pub const DEFAULT_OFFSET: usize = 0;

/// The slice of a result set requested by a list call.
///
/// # Example
///
/// ```ignore
/// use kule_core::page::PaginationWindow;
///
/// let window = PaginationWindow::default();
/// assert_eq!((window.limit, window.offset), (20, 0));
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaginationWindow {
    /// Maximum number of documents on the page.
    pub limit: usize,
    /// Number of matching documents skipped before the page starts.
    pub offset: usize,
}

impl PaginationWindow {
    /// Creates a window.
    pub fn new(limit: usize, offset: usize) -> Self {
        Self { limit, offset }
    }

    /// Builds the store query for this window over `filter`.
    pub fn query(&self, filter: RawFilter) -> Query {
        Query::builder()
            .filter(filter)
            .limit(self.limit)
            .offset(self.offset)
            .build()
    }
}

impl Default for PaginationWindow {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            offset: DEFAULT_OFFSET,
        }
    }
}

/// Metadata describing a page.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageMeta {
    /// The requested limit.
    pub limit: usize,
    /// The requested offset.
    pub offset: usize,
    /// Total count of documents matching the filter across all pages.
    pub total_count: u64,
}

/// A single page of list results.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// Window and total count.
    pub meta: PageMeta,
    /// The documents on this page.
    pub objects: Vec<T>,
}

impl<T> Page<T> {
    /// Creates a page for `window` holding `objects` out of `total_count` matches.
    pub fn new(window: PaginationWindow, total_count: u64, objects: Vec<T>) -> Self {
        Self {
            meta: PageMeta {
                limit: window.limit,
                offset: window.offset,
                total_count,
            },
            objects,
        }
    }

    /// Transforms every item on the page, keeping the metadata.
    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            meta: self.meta,
            objects: self.objects.into_iter().map(f).collect(),
        }
    }
}
