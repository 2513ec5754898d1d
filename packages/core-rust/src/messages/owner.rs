//! Owner channel payloads.

use serde::{Deserialize, Serialize};

use super::envelope::{RequestEnvelope, ResponseEnvelope};
use super::paging::Paging;
use crate::types::{Owner, PageRequest};

/// Request envelope on the owner channel.
pub type OwnerRequest = RequestEnvelope<OwnerPayload>;

/// Response envelope on the owner channel.
pub type OwnerResponse = ResponseEnvelope<OwnerResult>;

/// Operation-specific fields of an owner request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerPayload {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub search_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner: Option<Owner>,
    #[serde(flatten)]
    pub paging: Paging,
}

impl OwnerPayload {
    #[must_use]
    pub fn by_id(owner_id: i64) -> Self {
        Self {
            owner_id: Some(owner_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn paged(page: &PageRequest) -> Self {
        Self {
            paging: Paging::from(page),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn search(name: impl Into<String>, page: &PageRequest) -> Self {
        Self {
            search_name: Some(name.into()),
            paging: Paging::from(page),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn entity(owner: Owner) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }
}

/// Result fields of an owner reply: a single owner or a page of owners.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerResult {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner: Option<Owner>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owners: Option<Vec<Owner>>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl OwnerResult {
    #[must_use]
    pub fn single(owner: Owner) -> Self {
        Self {
            owner: Some(owner),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(owners: Vec<Owner>, total_elements: u64, total_pages: u32) -> Self {
        Self {
            owners: Some(owners),
            total_elements,
            total_pages,
            ..Self::default()
        }
    }
}
