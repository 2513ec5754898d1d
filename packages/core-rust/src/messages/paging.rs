//! Optional page/size/sort fields shared by both request payloads.

use serde::{Deserialize, Serialize};

use crate::types::{PageRequest, SortDirection, DEFAULT_PAGE_SIZE, DEFAULT_SORT_FIELD};

/// Wire form of a page request. Every field is optional; responders fall back
/// to page 0, size 10, ordered by `id` ascending.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Paging {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub size: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub sort_direction: Option<SortDirection>,
}

impl Paging {
    /// Resolves absent fields to their defaults.
    #[must_use]
    pub fn to_page_request(&self) -> PageRequest {
        PageRequest {
            page: self.page.unwrap_or(0),
            size: self.size.unwrap_or(DEFAULT_PAGE_SIZE),
            sort_by: self
                .sort_by
                .clone()
                .unwrap_or_else(|| DEFAULT_SORT_FIELD.to_string()),
            sort_direction: self.sort_direction.unwrap_or_default(),
        }
    }
}

impl From<&PageRequest> for Paging {
    fn from(page: &PageRequest) -> Self {
        Self {
            page: Some(page.page),
            size: Some(page.size),
            sort_by: Some(page.sort_by.clone()),
            sort_direction: Some(page.sort_direction),
        }
    }
}
