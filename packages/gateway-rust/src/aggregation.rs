//! Composite owner/pet operations built from facade calls.
//!
//! Joins happen in memory on `pet.owner_id == owner.id`. The "fetch every
//! candidate" side of a join is capped at `join_page_size` entries; larger
//! datasets are silently truncated. Multi-step writes are not compensated:
//! a failure midway leaves earlier steps applied.

use std::sync::Arc;

use kennel_core::{Owner, OwnerWithPets, Page, PageRequest, Pet, PetWithOwner};
use tracing::{debug, instrument};

use crate::error::RemoteError;
use crate::facade::{OwnerApi, PetApi};

/// Stateless aggregation over the owner and pet facades.
pub struct GatewayService {
    owners: Arc<dyn OwnerApi>,
    pets: Arc<dyn PetApi>,
    join_page_size: u32,
}

impl GatewayService {
    #[must_use]
    pub fn new(owners: Arc<dyn OwnerApi>, pets: Arc<dyn PetApi>, join_page_size: u32) -> Self {
        Self {
            owners,
            pets,
            join_page_size,
        }
    }

    fn join_page(&self) -> PageRequest {
        PageRequest::unbounded(self.join_page_size)
    }

    // -----------------------------------------------------------------------
    // Owners
    // -----------------------------------------------------------------------

    /// One owner and all of its pets. The owner is fetched first so a
    /// missing owner costs no pet query.
    ///
    /// # Errors
    ///
    /// `RemoteError::NotFound` if the owner does not exist, or any failure
    /// of either fetch.
    #[instrument(target = "gateway", skip(self))]
    pub async fn owner_with_pets(&self, id: i64) -> Result<OwnerWithPets, RemoteError> {
        let owner = self.owners.get_by_id(id).await?;
        let pets = self.pets.get_all(&self.join_page()).await?;
        Ok(OwnerWithPets::join(owner, &pets.items))
    }

    /// A page of owners, each with its pets.
    ///
    /// # Errors
    ///
    /// Fails if either the owner page or the pet fetch fails.
    #[instrument(target = "gateway", skip(self))]
    pub async fn owners_with_pets(
        &self,
        page: &PageRequest,
    ) -> Result<Page<OwnerWithPets>, RemoteError> {
        let join_page = self.join_page();
        let (owners, pets) =
            tokio::try_join!(self.owners.get_all(page), self.pets.get_all(&join_page))?;
        Ok(Page {
            items: owners
                .items
                .into_iter()
                .map(|owner| OwnerWithPets::join(owner, &pets.items))
                .collect(),
            total_elements: owners.total_elements,
            total_pages: owners.total_pages,
        })
    }

    /// Creates an owner, then each embedded pet linked to the new owner id.
    ///
    /// Pets are created one at a time in input order. There is no rollback:
    /// if a pet create fails, the owner and earlier pets remain.
    ///
    /// # Errors
    ///
    /// The first failing create.
    #[instrument(target = "gateway", skip_all, fields(owner = %owner.name))]
    pub async fn create_owner_with_pets(&self, owner: Owner) -> Result<OwnerWithPets, RemoteError> {
        let (owner, pets) = owner.detach_pets();
        let created = self.owners.create(owner).await?;
        let owner_id = created
            .id
            .ok_or_else(|| RemoteError::internal("created owner has no id"))?;

        let mut created_pets = Vec::with_capacity(pets.len());
        for pet in pets {
            created_pets.push(self.pets.create(pet.owned_by(owner_id)).await?);
        }
        debug!(owner_id, pets = created_pets.len(), "owner created with pets");
        Ok(OwnerWithPets {
            owner: created,
            pets: created_pets,
        })
    }

    /// Replaces an owner; `id` wins over any id in the body.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Validation` from owner-service.
    #[instrument(target = "gateway", skip(self, owner))]
    pub async fn update_owner(&self, id: i64, owner: Owner) -> Result<Owner, RemoteError> {
        let (mut owner, _) = owner.detach_pets();
        owner.id = Some(id);
        self.owners.update(owner).await
    }

    /// Deletes an owner's pets one by one, then the owner.
    ///
    /// The first failing pet delete aborts the operation before the owner
    /// is touched.
    ///
    /// # Errors
    ///
    /// The first failing fetch or delete.
    #[instrument(target = "gateway", skip(self))]
    pub async fn delete_owner(&self, id: i64) -> Result<(), RemoteError> {
        let pets = self.pets.get_all(&self.join_page()).await?;
        for pet_id in pets
            .items
            .iter()
            .filter(|pet| pet.belongs_to(id))
            .filter_map(|pet| pet.id)
        {
            self.pets.delete(pet_id).await?;
        }
        self.owners.delete(id).await
    }

    // -----------------------------------------------------------------------
    // Pets
    // -----------------------------------------------------------------------

    /// One pet and its owner, if it has one.
    ///
    /// # Errors
    ///
    /// `NotFound` if the pet (or its referenced owner) does not exist.
    #[instrument(target = "gateway", skip(self))]
    pub async fn pet_with_owner(&self, id: i64) -> Result<PetWithOwner, RemoteError> {
        let pet = self.pets.get_by_id(id).await?;
        let owner = match pet.owner_id {
            Some(owner_id) => Some(self.owners.get_by_id(owner_id).await?),
            None => None,
        };
        Ok(PetWithOwner { pet, owner })
    }

    /// A page of pets, each with its owner.
    ///
    /// # Errors
    ///
    /// Fails if either the pet page or the owner fetch fails.
    #[instrument(target = "gateway", skip(self))]
    pub async fn pets_with_owners(
        &self,
        page: &PageRequest,
    ) -> Result<Page<PetWithOwner>, RemoteError> {
        let join_page = self.join_page();
        let (pets, owners) =
            tokio::try_join!(self.pets.get_all(page), self.owners.get_all(&join_page))?;
        Ok(with_owners(pets, &owners.items))
    }

    /// Pets whose name contains `name`, each with its owner. The owner
    /// fetch is skipped when nothing matched.
    ///
    /// # Errors
    ///
    /// Fails if the search or the owner fetch fails.
    #[instrument(target = "gateway", skip(self))]
    pub async fn search_pets_by_name(
        &self,
        name: &str,
        page: &PageRequest,
    ) -> Result<Page<PetWithOwner>, RemoteError> {
        let pets = self.pets.search_by_name(name, page).await?;
        if pets.items.is_empty() {
            return Ok(with_owners(pets, &[]));
        }
        let owners = self.owners.get_all(&self.join_page()).await?;
        Ok(with_owners(pets, &owners.items))
    }

    /// Creates a pet. A pet naming an owner is only created if that owner
    /// exists, and comes back with the owner attached.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown owner, or the pet create failure.
    #[instrument(target = "gateway", skip_all, fields(pet = %pet.name))]
    pub async fn create_pet(&self, pet: Pet) -> Result<PetWithOwner, RemoteError> {
        let owner = match pet.owner_id {
            Some(owner_id) => Some(self.owners.get_by_id(owner_id).await?),
            None => None,
        };
        let pet = self.pets.create(pet).await?;
        Ok(PetWithOwner { pet, owner })
    }

    /// Replaces a pet; `id` wins over any id in the body.
    ///
    /// # Errors
    ///
    /// `NotFound` or `Validation` from pet-service.
    #[instrument(target = "gateway", skip(self, pet))]
    pub async fn update_pet(&self, id: i64, mut pet: Pet) -> Result<Pet, RemoteError> {
        pet.id = Some(id);
        self.pets.update(pet).await
    }

    /// # Errors
    ///
    /// `NotFound` if the pet does not exist.
    #[instrument(target = "gateway", skip(self))]
    pub async fn delete_pet(&self, id: i64) -> Result<(), RemoteError> {
        self.pets.delete(id).await
    }
}

fn with_owners(pets: Page<Pet>, owners: &[Owner]) -> Page<PetWithOwner> {
    Page {
        items: pets
            .items
            .into_iter()
            .map(|pet| PetWithOwner::join(pet, owners))
            .collect(),
        total_elements: pets.total_elements,
        total_pages: pets.total_pages,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
