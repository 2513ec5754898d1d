use async_trait::async_trait;
use kennel_core::messages::{OwnerPayload, OwnerResult};
use kennel_core::{Action, Owner, Page, PageRequest};

use super::{missing_entity, OwnerApi};
use crate::error::RemoteError;
use crate::messaging::CommandDispatcher;

/// [`OwnerApi`] over the owner request channel.
pub struct OwnerClient {
    dispatcher: CommandDispatcher<OwnerPayload, OwnerResult>,
}

impl OwnerClient {
    #[must_use]
    pub fn new(dispatcher: CommandDispatcher<OwnerPayload, OwnerResult>) -> Self {
        Self { dispatcher }
    }

    async fn call(&self, action: Action, payload: OwnerPayload) -> Result<OwnerResult, RemoteError> {
        Ok(self.dispatcher.call(action, payload).await?.result)
    }
}

fn into_page(result: OwnerResult) -> Page<Owner> {
    Page {
        items: result.owners.unwrap_or_default(),
        total_elements: result.total_elements,
        total_pages: result.total_pages,
    }
}

#[async_trait]
impl OwnerApi for OwnerClient {
    async fn get_all(&self, page: &PageRequest) -> Result<Page<Owner>, RemoteError> {
        self.call(Action::GetAll, OwnerPayload::paged(page))
            .await
            .map(into_page)
    }

    async fn get_by_id(&self, id: i64) -> Result<Owner, RemoteError> {
        self.call(Action::GetById, OwnerPayload::by_id(id))
            .await?
            .owner
            .ok_or_else(|| RemoteError::not_found(format!("Owner with id {id} not found")))
    }

    async fn search_by_name(
        &self,
        name: &str,
        page: &PageRequest,
    ) -> Result<Page<Owner>, RemoteError> {
        self.call(Action::SearchByName, OwnerPayload::search(name, page))
            .await
            .map(into_page)
    }

    async fn create(&self, owner: Owner) -> Result<Owner, RemoteError> {
        self.call(Action::Create, OwnerPayload::entity(owner))
            .await?
            .owner
            .ok_or_else(|| missing_entity("owner", "created owner"))
    }

    async fn update(&self, owner: Owner) -> Result<Owner, RemoteError> {
        self.call(Action::Update, OwnerPayload::entity(owner))
            .await?
            .owner
            .ok_or_else(|| missing_entity("owner", "updated owner"))
    }

    async fn delete(&self, id: i64) -> Result<(), RemoteError> {
        self.call(Action::Delete, OwnerPayload::by_id(id)).await.map(drop)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
