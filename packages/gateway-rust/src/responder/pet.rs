use chrono::{Local, NaiveDate};
use kennel_core::messages::{PetPayload, PetResult};
use kennel_core::{Action, Pet};
use tracing::debug;

use super::store::{name_contains, EntityStore};
use super::{Rejection, RequestProcessor};

/// Pet-service: validated CRUD, paging, name search, and lookup by owner.
///
/// The owner link is stored as given; pet-service never checks that the
/// owner exists.
#[derive(Debug, Default)]
pub struct PetBackend {
    store: EntityStore<Pet>,
}

impl PetBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore<Pet> {
        &self.store
    }

    fn not_found(id: i64) -> Rejection {
        Rejection::not_found(format!("Pet with id {id} not found"))
    }

    fn fetch(&self, id: Option<i64>) -> Result<Pet, Rejection> {
        let id = id.ok_or_else(|| Rejection::validation("petId is required"))?;
        self.store.get(id).ok_or_else(|| Self::not_found(id))
    }
}

fn validate(pet: Option<Pet>, today: NaiveDate) -> Result<Pet, Rejection> {
    let pet = pet.ok_or_else(|| Rejection::validation("Pet must not be empty"))?;
    if pet.name.trim().is_empty() {
        return Err(Rejection::validation("Pet name must not be empty"));
    }
    if pet.tail_length.is_some_and(|len| len < 0.0) {
        return Err(Rejection::validation("Tail length must not be negative"));
    }
    match pet.birth_date {
        None => Err(Rejection::validation("Pet birth date must not be empty")),
        Some(born) if born > today => {
            Err(Rejection::validation("Birth date cannot be in the future"))
        }
        Some(_) => Ok(pet),
    }
}

impl RequestProcessor for PetBackend {
    type Payload = PetPayload;
    type Output = PetResult;

    fn domain(&self) -> &'static str {
        "pet"
    }

    fn process(&self, action: Action, payload: PetPayload) -> Result<PetResult, Rejection> {
        let page = payload.paging.to_page_request();
        match action {
            Action::GetAll => {
                let found = self.store.query(|_| true, &page)?;
                Ok(PetResult::page(found.items, found.total_elements, found.total_pages))
            }
            Action::GetById => self.fetch(payload.pet_id).map(PetResult::single),
            Action::GetByOwnerId => {
                let owner_id = payload
                    .owner_id
                    .ok_or_else(|| Rejection::validation("ownerId is required"))?;
                let pets = self.store.filter(|pet| pet.belongs_to(owner_id));
                let total = pets.len() as u64;
                Ok(PetResult::page(pets, total, u32::from(total > 0)))
            }
            Action::SearchByName => {
                let name = payload
                    .search_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| Rejection::validation("searchName is required"))?;
                let found = self.store.query(name_contains(&name), &page)?;
                Ok(PetResult::page(found.items, found.total_elements, found.total_pages))
            }
            Action::Create => {
                let pet = validate(payload.pet, Local::now().date_naive())?;
                let created = self.store.insert(pet);
                debug!(pet_id = ?created.id, owner_id = ?created.owner_id, "pet created");
                Ok(PetResult::single(created))
            }
            Action::Update => {
                let pet = validate(payload.pet, Local::now().date_naive())?;
                let id = pet
                    .id
                    .ok_or_else(|| Rejection::validation("Pet id must not be empty on update"))?;
                if !self.store.replace(pet.clone()) {
                    return Err(Self::not_found(id));
                }
                Ok(PetResult::single(pet))
            }
            Action::Delete => {
                let pet = self.fetch(payload.pet_id)?;
                if let Some(id) = pet.id {
                    self.store.remove(id);
                }
                Ok(PetResult::default())
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
