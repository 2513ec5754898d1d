//! In-memory entity storage with paging and sorting.

use std::cmp::Ordering;
use std::sync::atomic::{AtomicI64, Ordering as AtomicOrdering};

use chrono::NaiveDate;
use dashmap::DashMap;
use kennel_core::{Owner, Page, PageRequest, Pet, SortDirection};

use super::Rejection;

/// Value an entity is ordered by for one sortable property.
#[derive(Debug, Clone, PartialEq, PartialOrd)]
pub enum SortKey {
    Int(Option<i64>),
    Float(Option<f64>),
    Text(Option<String>),
    Date(Option<NaiveDate>),
}

/// An entity the store can hold.
pub trait Record: Clone + Send + Sync + 'static {
    /// Type name used in not-found and sort errors.
    const KIND: &'static str;

    /// Properties accepted as `sortBy`.
    const SORT_FIELDS: &'static [&'static str];

    fn id(&self) -> Option<i64>;

    fn set_id(&mut self, id: i64);

    fn name(&self) -> &str;

    /// Key for a property listed in `SORT_FIELDS`.
    fn sort_key(&self, field: &str) -> SortKey;
}

impl Record for Owner {
    const KIND: &'static str = "Owner";
    const SORT_FIELDS: &'static [&'static str] = &["id", "name", "birthDate"];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "name" => SortKey::Text(Some(self.name.clone())),
            "birthDate" => SortKey::Date(self.birth_date),
            _ => SortKey::Int(self.id),
        }
    }
}

impl Record for Pet {
    const KIND: &'static str = "Pet";
    const SORT_FIELDS: &'static [&'static str] = &[
        "id",
        "name",
        "birthDate",
        "breed",
        "color",
        "tailLength",
        "ownerId",
    ];

    fn id(&self) -> Option<i64> {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = Some(id);
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn sort_key(&self, field: &str) -> SortKey {
        match field {
            "name" => SortKey::Text(Some(self.name.clone())),
            "birthDate" => SortKey::Date(self.birth_date),
            "breed" => SortKey::Text(self.breed.clone()),
            "color" => SortKey::Text(self.color.map(|c| format!("{c:?}").to_uppercase())),
            "tailLength" => SortKey::Float(self.tail_length),
            "ownerId" => SortKey::Int(self.owner_id),
            _ => SortKey::Int(self.id),
        }
    }
}

/// Concurrent id-keyed store. Ids are assigned from 1 upward and never reused.
#[derive(Debug)]
pub struct EntityStore<T> {
    entries: DashMap<i64, T>,
    next_id: AtomicI64,
}

impl<T: Record> EntityStore<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
            next_id: AtomicI64::new(1),
        }
    }

    /// Stores `entity` under a freshly assigned id, ignoring any id it carries.
    pub fn insert(&self, mut entity: T) -> T {
        let id = self.next_id.fetch_add(1, AtomicOrdering::SeqCst);
        entity.set_id(id);
        self.entries.insert(id, entity.clone());
        entity
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<T> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    /// Replaces the stored entity with the same id. Returns `false` (and
    /// stores nothing) if there is none.
    pub fn replace(&self, entity: T) -> bool {
        let Some(id) = entity.id() else {
            return false;
        };
        match self.entries.get_mut(&id) {
            Some(mut slot) => {
                *slot = entity;
                true
            }
            None => false,
        }
    }

    pub fn remove(&self, id: i64) -> Option<T> {
        self.entries.remove(&id).map(|(_, entity)| entity)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Every entity matching `filter`, ordered by id.
    #[must_use]
    pub fn filter(&self, filter: impl Fn(&T) -> bool) -> Vec<T> {
        let mut hits: Vec<T> = self
            .entries
            .iter()
            .filter(|e| filter(e.value()))
            .map(|e| e.value().clone())
            .collect();
        hits.sort_by_key(|e| e.id());
        hits
    }

    /// One page of the entities matching `filter`.
    ///
    /// Ties on the sort property keep id order.
    ///
    /// # Errors
    ///
    /// `VALIDATION` for a zero page size or an unknown sort property.
    pub fn query(&self, filter: impl Fn(&T) -> bool, page: &PageRequest) -> Result<Page<T>, Rejection> {
        if page.size == 0 {
            return Err(Rejection::validation("Page size must not be less than one"));
        }
        if !T::SORT_FIELDS.contains(&page.sort_by.as_str()) {
            return Err(Rejection::validation(format!(
                "No property '{}' found for type '{}'",
                page.sort_by,
                T::KIND
            )));
        }

        let mut hits = self.filter(filter);
        hits.sort_by(|a, b| {
            let ord = a
                .sort_key(&page.sort_by)
                .partial_cmp(&b.sort_key(&page.sort_by))
                .unwrap_or(Ordering::Equal);
            match page.sort_direction {
                SortDirection::Asc => ord,
                SortDirection::Desc => ord.reverse(),
            }
        });

        let total = hits.len() as u64;
        let start = usize::try_from(u64::from(page.page) * u64::from(page.size)).unwrap_or(usize::MAX);
        let items = hits
            .into_iter()
            .skip(start)
            .take(page.size as usize)
            .collect();
        Ok(Page::new(items, total, page.size))
    }
}

impl<T: Record> Default for EntityStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Case-insensitive substring match on the entity name.
pub fn name_contains<T: Record>(needle: &str) -> impl Fn(&T) -> bool {
    let needle = needle.to_lowercase();
    move |entity: &T| entity.name().to_lowercase().contains(&needle)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::date;

    fn seeded() -> EntityStore<Owner> {
        let store = EntityStore::new();
        store.insert(Owner::new("Carol", date(1990, 1, 1)));
        store.insert(Owner::new("alice", date(1970, 1, 1)));
        store.insert(Owner::new("Bob", date(1980, 1, 1)));
        store
    }

    fn names(page: &Page<Owner>) -> Vec<&str> {
        page.items.iter().map(|o| o.name.as_str()).collect()
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let store = EntityStore::new();
        let a = store.insert(Owner::new("A", date(1990, 1, 1)).with_id(77));
        let b = store.insert(Owner::new("B", date(1990, 1, 1)));
        assert_eq!(a.id, Some(1));
        assert_eq!(b.id, Some(2));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn replace_requires_existing_id() {
        let store = seeded();
        assert!(store.replace(Owner::new("Caz", date(1990, 1, 1)).with_id(1)));
        assert_eq!(store.get(1).unwrap().name, "Caz");
        assert!(!store.replace(Owner::new("Nobody", date(1990, 1, 1)).with_id(99)));
        assert!(!store.replace(Owner::new("NoId", date(1990, 1, 1))));
        assert!(store.get(99).is_none());
    }

    #[test]
    fn default_query_orders_by_id() {
        let page = seeded().query(|_| true, &PageRequest::default()).unwrap();
        assert_eq!(names(&page), vec!["Carol", "alice", "Bob"]);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn sorts_by_birth_date_descending() {
        let req = PageRequest::default().sorted_by("birthDate", SortDirection::Desc);
        let page = seeded().query(|_| true, &req).unwrap();
        assert_eq!(names(&page), vec!["Carol", "Bob", "alice"]);
    }

    #[test]
    fn pages_slice_the_sorted_set() {
        let req = PageRequest::new(1, 2).sorted_by("name", SortDirection::Asc);
        let page = seeded().query(|_| true, &req).unwrap();
        // Byte order: upper case sorts before lower case.
        assert_eq!(names(&page), vec!["alice"]);
        assert_eq!(page.total_elements, 3);
        assert_eq!(page.total_pages, 2);
    }

    #[test]
    fn page_past_the_end_is_empty() {
        let page = seeded().query(|_| true, &PageRequest::new(5, 10)).unwrap();
        assert!(page.items.is_empty());
        assert_eq!(page.total_elements, 3);
    }

    #[test]
    fn unknown_sort_field_is_rejected() {
        let req = PageRequest::default().sorted_by("shoeSize", SortDirection::Asc);
        let err = seeded().query(|_| true, &req).unwrap_err();
        assert_eq!(err.message, "No property 'shoeSize' found for type 'Owner'");
    }

    #[test]
    fn zero_page_size_is_rejected() {
        assert!(seeded().query(|_| true, &PageRequest::new(0, 0)).is_err());
    }

    #[test]
    fn name_search_ignores_case() {
        let page = seeded()
            .query(name_contains("AL"), &PageRequest::default())
            .unwrap();
        assert_eq!(names(&page), vec!["alice"]);
    }

    #[test]
    fn pets_sort_by_tail_length() {
        let store = EntityStore::new();
        let mut long = Pet::new("Long", date(2020, 1, 1));
        long.tail_length = Some(30.5);
        let mut short = Pet::new("Short", date(2020, 1, 1));
        short.tail_length = Some(4.0);
        store.insert(long);
        store.insert(short);

        let req = PageRequest::default().sorted_by("tailLength", SortDirection::Asc);
        let page = store.query(|_| true, &req).unwrap();
        assert_eq!(page.items[0].name, "Short");
    }
}
