//! Query parameters for list operations.
//!
//! Filters are opaque to the store decorators; only backends read them.
//! Pagination is cursor based: the cursor is the sort key of the last item
//! on the previous page.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Page size used when a filter leaves `per_page` unset.
pub const DEFAULT_PER_PAGE: usize = 30;
/// Upper bound on any requested page size.
pub const MAX_PER_PAGE: usize = 100;

fn page_size(per_page: Option<usize>) -> usize {
    match per_page {
        None | Some(0) => DEFAULT_PER_PAGE,
        Some(n) => n.min(MAX_PER_PAGE),
    }
}

/// Filter for listing apps, ordered by name.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
}

impl AppFilter {
    pub fn page_size(&self) -> usize {
        page_size(self.per_page)
    }
}

/// Filter for listing the routes of one app, ordered by path.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RouteFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
}

impl RouteFilter {
    pub fn page_size(&self) -> usize {
        page_size(self.per_page)
    }
}

/// Filter for listing calls, newest first.
///
/// The cursor is a call id; the next page holds calls older than it.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub app_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<usize>,
}

impl CallFilter {
    /// Filter scoped to one app.
    pub fn for_app(app_id: impl Into<String>) -> Self {
        Self {
            app_id: Some(app_id.into()),
            ..Default::default()
        }
    }

    pub fn page_size(&self) -> usize {
        page_size(self.per_page)
    }
}
