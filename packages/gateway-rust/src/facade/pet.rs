use async_trait::async_trait;
use kennel_core::messages::{PetPayload, PetResult};
use kennel_core::{Action, Page, PageRequest, Pet};

use super::{missing_entity, PetApi};
use crate::error::RemoteError;
use crate::messaging::CommandDispatcher;

/// [`PetApi`] over the pet request channel.
pub struct PetClient {
    dispatcher: CommandDispatcher<PetPayload, PetResult>,
}

impl PetClient {
    #[must_use]
    pub fn new(dispatcher: CommandDispatcher<PetPayload, PetResult>) -> Self {
        Self { dispatcher }
    }

    async fn call(&self, action: Action, payload: PetPayload) -> Result<PetResult, RemoteError> {
        Ok(self.dispatcher.call(action, payload).await?.result)
    }
}

fn into_page(result: PetResult) -> Page<Pet> {
    Page {
        items: result.pets.unwrap_or_default(),
        total_elements: result.total_elements,
        total_pages: result.total_pages,
    }
}

#[async_trait]
impl PetApi for PetClient {
    async fn get_all(&self, page: &PageRequest) -> Result<Page<Pet>, RemoteError> {
        self.call(Action::GetAll, PetPayload::paged(page))
            .await
            .map(into_page)
    }

    async fn get_by_id(&self, id: i64) -> Result<Pet, RemoteError> {
        self.call(Action::GetById, PetPayload::by_id(id))
            .await?
            .pet
            .ok_or_else(|| RemoteError::not_found(format!("Pet with id {id} not found")))
    }

    async fn get_by_owner_id(&self, owner_id: i64) -> Result<Vec<Pet>, RemoteError> {
        Ok(self
            .call(Action::GetByOwnerId, PetPayload::by_owner(owner_id))
            .await?
            .pets
            .unwrap_or_default())
    }

    async fn search_by_name(&self, name: &str, page: &PageRequest) -> Result<Page<Pet>, RemoteError> {
        self.call(Action::SearchByName, PetPayload::search(name, page))
            .await
            .map(into_page)
    }

    async fn create(&self, pet: Pet) -> Result<Pet, RemoteError> {
        self.call(Action::Create, PetPayload::entity(pet))
            .await?
            .pet
            .ok_or_else(|| missing_entity("pet", "created pet"))
    }

    async fn update(&self, pet: Pet) -> Result<Pet, RemoteError> {
        self.call(Action::Update, PetPayload::entity(pet))
            .await?
            .pet
            .ok_or_else(|| missing_entity("pet", "updated pet"))
    }

    async fn delete(&self, id: i64) -> Result<(), RemoteError> {
        self.call(Action::Delete, PetPayload::by_id(id)).await.map(drop)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
