//! `/api` handlers. Each one forwards to a single [`GatewayService`] call.
//!
//! [`GatewayService`]: crate::aggregation::GatewayService

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use kennel_core::messages::Paging;
use kennel_core::{Owner, OwnerWithPets, Page, Pet, PetWithOwner, SortDirection};
use serde::Deserialize;

use super::error::ApiError;
use super::AppState;

type ApiResult<T> = Result<Json<T>, ApiError>;

/// Query string for `/api/pets/search`.
///
/// Spelled out rather than flattening [`Paging`]; urlencoded numbers do not
/// survive `#[serde(flatten)]`.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub size: Option<u32>,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub sort_direction: Option<SortDirection>,
}

impl SearchQuery {
    fn paging(&self) -> Paging {
        Paging {
            page: self.page,
            size: self.size,
            sort_by: self.sort_by.clone(),
            sort_direction: self.sort_direction,
        }
    }
}

// ---------------------------------------------------------------------------
// Owners
// ---------------------------------------------------------------------------

pub async fn list_owners(
    State(state): State<AppState>,
    Query(paging): Query<Paging>,
) -> ApiResult<Page<OwnerWithPets>> {
    let page = state
        .service
        .owners_with_pets(&paging.to_page_request())
        .await?;
    Ok(Json(page))
}

pub async fn get_owner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<OwnerWithPets> {
    Ok(Json(state.service.owner_with_pets(id).await?))
}

pub async fn create_owner(
    State(state): State<AppState>,
    Json(owner): Json<Owner>,
) -> ApiResult<OwnerWithPets> {
    Ok(Json(state.service.create_owner_with_pets(owner).await?))
}

pub async fn update_owner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(owner): Json<Owner>,
) -> ApiResult<Owner> {
    Ok(Json(state.service.update_owner(id, owner).await?))
}

pub async fn delete_owner(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_owner(id).await?;
    Ok(StatusCode::OK)
}

// ---------------------------------------------------------------------------
// Pets
// ---------------------------------------------------------------------------

pub async fn list_pets(
    State(state): State<AppState>,
    Query(paging): Query<Paging>,
) -> ApiResult<Page<PetWithOwner>> {
    let page = state
        .service
        .pets_with_owners(&paging.to_page_request())
        .await?;
    Ok(Json(page))
}

pub async fn get_pet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> ApiResult<PetWithOwner> {
    Ok(Json(state.service.pet_with_owner(id).await?))
}

/// A missing `name` is passed through as empty; the pet service rejects it.
pub async fn search_pets(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Page<PetWithOwner>> {
    let name = query.name.clone().unwrap_or_default();
    let page = state
        .service
        .search_pets_by_name(&name, &query.paging().to_page_request())
        .await?;
    Ok(Json(page))
}

pub async fn create_pet(
    State(state): State<AppState>,
    Json(pet): Json<Pet>,
) -> ApiResult<PetWithOwner> {
    Ok(Json(state.service.create_pet(pet).await?))
}

pub async fn update_pet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(pet): Json<Pet>,
) -> ApiResult<Pet> {
    Ok(Json(state.service.update_pet(id, pet).await?))
}

pub async fn delete_pet(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<StatusCode, ApiError> {
    state.service.delete_pet(id).await?;
    Ok(StatusCode::OK)
}
