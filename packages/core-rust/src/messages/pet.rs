//! Pet channel payloads.

use serde::{Deserialize, Serialize};

use super::envelope::{RequestEnvelope, ResponseEnvelope};
use super::paging::Paging;
use crate::types::{PageRequest, Pet};

/// Request envelope on the pet channel.
pub type PetRequest = RequestEnvelope<PetPayload>;

/// Response envelope on the pet channel.
pub type PetResponse = ResponseEnvelope<PetResult>;

/// Operation-specific fields of a pet request.
///
/// `owner_id` is only read by `GET_BY_OWNER_ID`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetPayload {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pet_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub search_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pet: Option<Pet>,
    #[serde(flatten)]
    pub paging: Paging,
}

impl PetPayload {
    #[must_use]
    pub fn by_id(pet_id: i64) -> Self {
        Self {
            pet_id: Some(pet_id),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn by_owner(owner_id: i64) -> Self {
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
    pub fn entity(pet: Pet) -> Self {
        Self {
            pet: Some(pet),
            ..Self::default()
        }
    }
}

/// Result fields of a pet reply: a single pet or a list of pets.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetResult {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pet: Option<Pet>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub pets: Option<Vec<Pet>>,
    #[serde(default)]
    pub total_elements: u64,
    #[serde(default)]
    pub total_pages: u32,
}

impl PetResult {
    #[must_use]
    pub fn single(pet: Pet) -> Self {
        Self {
            pet: Some(pet),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn page(pets: Vec<Pet>, total_elements: u64, total_pages: u32) -> Self {
        Self {
            pets: Some(pets),
            total_elements,
            total_pages,
            ..Self::default()
        }
    }
}
