//! Typed async clients for the owner and pet services.
//!
//! Each facade method maps to one bus action. Callers see plain entities and
//! pages; envelopes and correlation never leak through.

pub mod owner;
pub mod pet;

use async_trait::async_trait;
use kennel_core::{Owner, Page, PageRequest, Pet};

pub use owner::OwnerClient;
pub use pet::PetClient;

use crate::error::RemoteError;

/// Operations offered by owner-service.
#[async_trait]
pub trait OwnerApi: Send + Sync {
    async fn get_all(&self, page: &PageRequest) -> Result<Page<Owner>, RemoteError>;

    /// # Errors
    ///
    /// `RemoteError::NotFound` if no owner has `id`.
    async fn get_by_id(&self, id: i64) -> Result<Owner, RemoteError>;

    async fn search_by_name(&self, name: &str, page: &PageRequest)
        -> Result<Page<Owner>, RemoteError>;

    async fn create(&self, owner: Owner) -> Result<Owner, RemoteError>;

    async fn update(&self, owner: Owner) -> Result<Owner, RemoteError>;

    async fn delete(&self, id: i64) -> Result<(), RemoteError>;
}

/// Operations offered by pet-service.
#[async_trait]
pub trait PetApi: Send + Sync {
    async fn get_all(&self, page: &PageRequest) -> Result<Page<Pet>, RemoteError>;

    /// # Errors
    ///
    /// `RemoteError::NotFound` if no pet has `id`.
    async fn get_by_id(&self, id: i64) -> Result<Pet, RemoteError>;

    async fn get_by_owner_id(&self, owner_id: i64) -> Result<Vec<Pet>, RemoteError>;

    async fn search_by_name(&self, name: &str, page: &PageRequest)
        -> Result<Page<Pet>, RemoteError>;

    async fn create(&self, pet: Pet) -> Result<Pet, RemoteError>;

    async fn update(&self, pet: Pet) -> Result<Pet, RemoteError>;

    async fn delete(&self, id: i64) -> Result<(), RemoteError>;
}

/// Error for a successful reply that lacks the entity it should carry.
pub(crate) fn missing_entity(domain: &str, what: &str) -> RemoteError {
    RemoteError::internal(format!("{domain} reply carried no {what}"))
}
