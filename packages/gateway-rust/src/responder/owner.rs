use chrono::{Local, NaiveDate};
use kennel_core::messages::{OwnerPayload, OwnerResult};
use kennel_core::{Action, Owner};
use tracing::debug;

use super::store::{name_contains, EntityStore};
use super::{Rejection, RequestProcessor};

/// Owner-service: validated CRUD, paging, and name search over an in-memory
/// store.
#[derive(Debug, Default)]
pub struct OwnerBackend {
    store: EntityStore<Owner>,
}

impl OwnerBackend {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn store(&self) -> &EntityStore<Owner> {
        &self.store
    }

    fn not_found(id: i64) -> Rejection {
        Rejection::not_found(format!("Owner with id {id} not found"))
    }

    fn fetch(&self, id: Option<i64>) -> Result<Owner, Rejection> {
        let id = id.ok_or_else(|| Rejection::validation("ownerId is required"))?;
        self.store.get(id).ok_or_else(|| Self::not_found(id))
    }
}

fn validate(owner: Option<Owner>, today: NaiveDate) -> Result<Owner, Rejection> {
    let owner = owner.ok_or_else(|| Rejection::validation("Owner must not be empty"))?;
    if owner.name.trim().is_empty() {
        return Err(Rejection::validation("Owner name must not be empty"));
    }
    match owner.birth_date {
        None => Err(Rejection::validation("Owner birth date must not be empty")),
        Some(born) if born > today => {
            Err(Rejection::validation("Birth date cannot be in the future"))
        }
        Some(_) => Ok(owner.detach_pets().0),
    }
}

impl RequestProcessor for OwnerBackend {
    type Payload = OwnerPayload;
    type Output = OwnerResult;

    fn domain(&self) -> &'static str {
        "owner"
    }

    fn process(&self, action: Action, payload: OwnerPayload) -> Result<OwnerResult, Rejection> {
        let page = payload.paging.to_page_request();
        match action {
            Action::GetAll => {
                let found = self.store.query(|_| true, &page)?;
                Ok(OwnerResult::page(found.items, found.total_elements, found.total_pages))
            }
            Action::GetById => self.fetch(payload.owner_id).map(OwnerResult::single),
            Action::SearchByName => {
                let name = payload
                    .search_name
                    .filter(|name| !name.trim().is_empty())
                    .ok_or_else(|| Rejection::validation("searchName is required"))?;
                let found = self.store.query(name_contains(&name), &page)?;
                Ok(OwnerResult::page(found.items, found.total_elements, found.total_pages))
            }
            Action::Create => {
                let owner = validate(payload.owner, Local::now().date_naive())?;
                let created = self.store.insert(owner);
                debug!(owner_id = ?created.id, "owner created");
                Ok(OwnerResult::single(created))
            }
            Action::Update => {
                let owner = validate(payload.owner, Local::now().date_naive())?;
                let id = owner
                    .id
                    .ok_or_else(|| Rejection::validation("Owner id must not be empty on update"))?;
                if !self.store.replace(owner.clone()) {
                    return Err(Self::not_found(id));
                }
                Ok(OwnerResult::single(owner))
            }
            Action::Delete => {
                let owner = self.fetch(payload.owner_id)?;
                if let Some(id) = owner.id {
                    self.store.remove(id);
                }
                Ok(OwnerResult::default())
            }
            Action::GetByOwnerId => Err(Rejection::unknown_action(action)),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use kennel_core::messages::Paging;
    use kennel_core::{ErrorKind, PageRequest, Pet, SortDirection};

    use super::*;
    use crate::testing::date;

    fn create(backend: &OwnerBackend, name: &str, born: NaiveDate) -> Owner {
        backend
            .process(Action::Create, OwnerPayload::entity(Owner::new(name, born)))
            .unwrap()
            .owner
            .unwrap()
    }

    #[test]
    fn create_assigns_id_and_drops_embedded_pets() {
        let backend = OwnerBackend::new();
        let mut input = Owner::new("Ann", date(1990, 2, 2));
        input.pets = vec![Pet::new("Rex", date(2020, 1, 1))];
        let created = backend
            .process(Action::Create, OwnerPayload::entity(input))
            .unwrap()
            .owner
            .unwrap();
        assert_eq!(created.id, Some(1));
        assert!(created.pets.is_empty());
    }

    #[test]
    fn create_validates_fields() {
        let backend = OwnerBackend::new();
        let cases = [
            (OwnerPayload::default(), "Owner must not be empty"),
            (
                OwnerPayload::entity(Owner::new("  ", date(1990, 1, 1))),
                "Owner name must not be empty",
            ),
            (
                OwnerPayload::entity(Owner {
                    name: "Ann".into(),
                    ..Owner::default()
                }),
                "Owner birth date must not be empty",
            ),
            (
                OwnerPayload::entity(Owner::new("Ann", date(2999, 1, 1))),
                "Birth date cannot be in the future",
            ),
        ];
        for (payload, message) in cases {
            let err = backend.process(Action::Create, payload).unwrap_err();
            assert_eq!(err.kind, ErrorKind::Validation);
            assert_eq!(err.message, message);
        }
        assert!(backend.store().is_empty());
    }

    #[test]
    fn get_by_id_reports_missing_owner() {
        let backend = OwnerBackend::new();
        let err = backend.process(Action::GetById, OwnerPayload::by_id(3)).unwrap_err();
        assert_eq!(err, Rejection::not_found("Owner with id 3 not found"));
    }

    #[test]
    fn update_requires_id_and_existing_owner() {
        let backend = OwnerBackend::new();
        let ann = create(&backend, "Ann", date(1990, 1, 1));

        let err = backend
            .process(Action::Update, OwnerPayload::entity(Owner::new("X", date(1990, 1, 1))))
            .unwrap_err();
        assert_eq!(err.message, "Owner id must not be empty on update");

        let err = backend
            .process(
                Action::Update,
                OwnerPayload::entity(Owner::new("X", date(1990, 1, 1)).with_id(9)),
            )
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);

        let renamed = Owner::new("Annie", date(1990, 1, 1)).with_id(ann.id.unwrap());
        backend
            .process(Action::Update, OwnerPayload::entity(renamed))
            .unwrap();
        assert_eq!(backend.store().get(1).unwrap().name, "Annie");
    }

    #[test]
    fn delete_removes_or_reports_missing() {
        let backend = OwnerBackend::new();
        create(&backend, "Ann", date(1990, 1, 1));
        backend.process(Action::Delete, OwnerPayload::by_id(1)).unwrap();
        assert!(backend.store().is_empty());
        let err = backend.process(Action::Delete, OwnerPayload::by_id(1)).unwrap_err();
        assert_eq!(err.kind, ErrorKind::NotFound);
    }

    #[test]
    fn get_all_pages_and_sorts() {
        let backend = OwnerBackend::new();
        create(&backend, "Ann", date(1990, 1, 1));
        create(&backend, "Bob", date(1980, 1, 1));
        create(&backend, "Cid", date(1985, 1, 1));

        let req = PageRequest::new(0, 2).sorted_by("birthDate", SortDirection::Asc);
        let result = backend
            .process(Action::GetAll, OwnerPayload::paged(&req))
            .unwrap();
        let names: Vec<_> = result.owners.unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Bob", "Cid"]);
        assert_eq!(result.total_elements, 3);
        assert_eq!(result.total_pages, 2);
    }

    #[test]
    fn absent_paging_defaults_to_ten_by_id() {
        let backend = OwnerBackend::new();
        for i in 0..12 {
            create(&backend, &format!("O{i}"), date(1990, 1, 1));
        }
        let payload = OwnerPayload {
            paging: Paging::default(),
            ..OwnerPayload::default()
        };
        let result = backend.process(Action::GetAll, payload).unwrap();
        assert_eq!(result.owners.unwrap().len(), 10);
        assert_eq!(result.total_pages, 2);
    }

    #[test]
    fn search_is_case_insensitive() {
        let backend = OwnerBackend::new();
        create(&backend, "Annabel", date(1990, 1, 1));
        create(&backend, "Bob", date(1990, 1, 1));
        let result = backend
            .process(
                Action::SearchByName,
                OwnerPayload::search("ANN", &PageRequest::default()),
            )
            .unwrap();
        assert_eq!(result.owners.unwrap().len(), 1);
    }

    #[test]
    fn pets_by_owner_is_not_an_owner_action() {
        let err = OwnerBackend::new()
            .process(Action::GetByOwnerId, OwnerPayload::by_id(1))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownAction);
        assert_eq!(err.message, "Unknown action: GET_BY_OWNER_ID");
    }
}
