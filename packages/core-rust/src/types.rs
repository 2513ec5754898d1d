//! Owner/pet entities, pagination types, and the joined read views.
//!
//! Entities are plain records exchanged as envelope payloads. They carry no
//! behaviour beyond small constructors and are owned by their respective
//! remote services. All structs use `#[serde(rename_all = "camelCase")]` so
//! field names match the JSON produced by the owner and pet services.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Default page size applied when a request omits `size`.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Default sort field applied when a request omits `sortBy`.
pub const DEFAULT_SORT_FIELD: &str = "id";

// ---------------------------------------------------------------------------
// Entities
// ---------------------------------------------------------------------------

/// Coat colour of a pet.
///
/// Variant names serialize as `SCREAMING_CASE` to match the wire tags exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PetColor {
    Black,
    White,
    Gray,
    Brown,
    Orange,
}

/// A pet owner as stored by owner-service.
///
/// `pets` is only meaningful on the create-owner input, where an owner is
/// submitted together with the pets to create for it. Owner-service never
/// populates it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Owner {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub pets: Vec<Pet>,
}

impl Owner {
    /// Creates an unsaved owner (no id, no embedded pets).
    #[must_use]
    pub fn new(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            id: None,
            name: name.into(),
            birth_date: Some(birth_date),
            pets: Vec::new(),
        }
    }

    /// Returns the owner with `id` set.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Splits the embedded pet list off the owner.
    #[must_use]
    pub fn detach_pets(mut self) -> (Self, Vec<Pet>) {
        let pets = std::mem::take(&mut self.pets);
        (self, pets)
    }
}

/// A pet as stored by pet-service. `owner_id` is the only link to its owner.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pet {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub birth_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub breed: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub color: Option<PetColor>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub tail_length: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner_id: Option<i64>,
}

impl Pet {
    /// Creates an unsaved, unowned pet with only the required fields set.
    #[must_use]
    pub fn new(name: impl Into<String>, birth_date: NaiveDate) -> Self {
        Self {
            name: name.into(),
            birth_date: Some(birth_date),
            ..Self::default()
        }
    }

    /// Returns the pet with `id` set.
    #[must_use]
    pub fn with_id(mut self, id: i64) -> Self {
        self.id = Some(id);
        self
    }

    /// Returns the pet linked to `owner_id`.
    #[must_use]
    pub fn owned_by(mut self, owner_id: i64) -> Self {
        self.owner_id = Some(owner_id);
        self
    }

    /// Returns `true` if this pet belongs to the owner with the given id.
    #[must_use]
    pub fn belongs_to(&self, owner_id: i64) -> bool {
        self.owner_id == Some(owner_id)
    }
}

// ---------------------------------------------------------------------------
// Pagination
// ---------------------------------------------------------------------------

/// Sort direction for paged queries.
///
/// Serializes lowercase; upper-case spellings are accepted on input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    #[serde(alias = "ASC")]
    Asc,
    #[serde(alias = "DESC")]
    Desc,
}

impl SortDirection {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl fmt::Display for SortDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortDirection {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("asc") {
            Ok(Self::Asc)
        } else if s.eq_ignore_ascii_case("desc") {
            Ok(Self::Desc)
        } else {
            Err(format!("invalid sort direction: {s}"))
        }
    }
}

/// Page, size, and ordering for a paged query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageRequest {
    #[serde(default)]
    pub page: u32,
    #[serde(default = "default_page_size")]
    pub size: u32,
    #[serde(default = "default_sort_field")]
    pub sort_by: String,
    #[serde(default)]
    pub sort_direction: SortDirection,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_sort_field() -> String {
    DEFAULT_SORT_FIELD.to_string()
}

impl PageRequest {
    #[must_use]
    pub fn new(page: u32, size: u32) -> Self {
        Self {
            page,
            size,
            ..Self::default()
        }
    }

    /// First page of `size` entries ordered by id ascending.
    ///
    /// Used for the "fetch everything" side of an in-memory join.
    #[must_use]
    pub fn unbounded(size: u32) -> Self {
        Self::new(0, size)
    }

    #[must_use]
    pub fn sorted_by(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_by = field.into();
        self.sort_direction = direction;
        self
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 0,
            size: DEFAULT_PAGE_SIZE,
            sort_by: DEFAULT_SORT_FIELD.to_string(),
            sort_direction: SortDirection::Asc,
        }
    }
}

/// One page of results plus totals across all pages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total_elements: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    /// Builds a page, deriving `total_pages` from `total_elements` and `size`.
    #[must_use]
    pub fn new(items: Vec<T>, total_elements: u64, size: u32) -> Self {
        let total_pages = if size == 0 {
            0
        } else {
            u32::try_from(total_elements.div_ceil(u64::from(size))).unwrap_or(u32::MAX)
        };
        Self {
            items,
            total_elements,
            total_pages,
        }
    }
}

// ---------------------------------------------------------------------------
// Joined views
// ---------------------------------------------------------------------------

/// An owner together with every pet whose `owner_id` points at it.
///
/// Built fresh per response; the pet list is never shared with other views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnerWithPets {
    #[serde(flatten)]
    pub owner: Owner,
    pub pets: Vec<Pet>,
}

impl OwnerWithPets {
    /// Joins `owner` with the subset of `candidates` that belong to it.
    ///
    /// Any pets embedded on `owner` are discarded. An owner without an id
    /// matches no pets.
    #[must_use]
    pub fn join<'a>(owner: Owner, candidates: impl IntoIterator<Item = &'a Pet>) -> Self {
        let (owner, _) = owner.detach_pets();
        let pets = match owner.id {
            Some(id) => candidates
                .into_iter()
                .filter(|pet| pet.belongs_to(id))
                .cloned()
                .collect(),
            None => Vec::new(),
        };
        Self { owner, pets }
    }
}

/// A pet together with its owner, if it has one and the owner still exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PetWithOwner {
    #[serde(flatten)]
    pub pet: Pet,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub owner: Option<Owner>,
}

impl PetWithOwner {
    /// Attaches the owner from `candidates` whose id equals `pet.owner_id`.
    #[must_use]
    pub fn join<'a>(pet: Pet, candidates: impl IntoIterator<Item = &'a Owner>) -> Self {
        let owner = pet.owner_id.and_then(|owner_id| {
            candidates
                .into_iter()
                .find(|owner| owner.id == Some(owner_id))
                .map(|owner| owner.clone().detach_pets().0)
        });
        Self { pet, owner }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn pet_color_uses_screaming_tags() {
        assert_eq!(serde_json::to_string(&PetColor::Orange).unwrap(), "\"ORANGE\"");
        let parsed: PetColor = serde_json::from_str("\"GRAY\"").unwrap();
        assert_eq!(parsed, PetColor::Gray);
    }

    #[test]
    fn owner_serializes_camel_case_and_skips_empty_fields() {
        let owner = Owner::new("Anna", date(1990, 5, 17)).with_id(3);
        let json = serde_json::to_value(&owner).unwrap();
        assert_eq!(json["id"], 3);
        assert_eq!(json["birthDate"], "1990-05-17");
        assert!(json.get("pets").is_none());
    }

    #[test]
    fn pet_deserializes_from_service_json() {
        let json = r#"{"id":7,"name":"Murka","birthDate":"2020-01-02","breed":"Siamese",
            "color":"WHITE","tailLength":12.5,"ownerId":3}"#;
        let pet: Pet = serde_json::from_str(json).unwrap();
        assert_eq!(pet.id, Some(7));
        assert_eq!(pet.color, Some(PetColor::White));
        assert_eq!(pet.tail_length, Some(12.5));
        assert!(pet.belongs_to(3));
    }

    #[test]
    fn detach_pets_moves_embedded_list() {
        let mut owner = Owner::new("Ivan", date(1980, 1, 1));
        owner.pets = vec![Pet::new("A", date(2019, 1, 1)), Pet::new("B", date(2019, 2, 1))];
        let (owner, pets) = owner.detach_pets();
        assert!(owner.pets.is_empty());
        assert_eq!(pets.len(), 2);
    }

    #[test]
    fn sort_direction_parses_case_insensitively() {
        assert_eq!("DESC".parse::<SortDirection>().unwrap(), SortDirection::Desc);
        assert_eq!("asc".parse::<SortDirection>().unwrap(), SortDirection::Asc);
        assert!("sideways".parse::<SortDirection>().is_err());
        let parsed: SortDirection = serde_json::from_str("\"DESC\"").unwrap();
        assert_eq!(parsed, SortDirection::Desc);
    }

    #[test]
    fn page_request_defaults_when_fields_absent() {
        let req: PageRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, PageRequest::default());
        assert_eq!(req.size, DEFAULT_PAGE_SIZE);
        assert_eq!(req.sort_by, "id");
    }

    #[test]
    fn page_derives_total_pages() {
        let page: Page<u8> = Page::new(vec![1, 2], 21, 10);
        assert_eq!(page.total_pages, 3);
        let empty: Page<u8> = Page::new(Vec::new(), 0, 10);
        assert_eq!(empty.total_pages, 0);
    }

    #[test]
    fn owner_with_pets_serializes_flat() {
        let owner = Owner::new("Anna", date(1990, 5, 17)).with_id(1);
        let pets = [Pet::new("Tom", date(2021, 3, 3)).with_id(10).owned_by(1)];
        let view = OwnerWithPets::join(owner, &pets);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], 1);
        assert_eq!(json["name"], "Anna");
        assert_eq!(json["pets"][0]["ownerId"], 1);
    }

    #[test]
    fn pet_with_owner_leaves_owner_empty_when_missing() {
        let pet = Pet::new("Tom", date(2021, 3, 3)).with_id(10).owned_by(99);
        let owners = [Owner::new("Anna", date(1990, 5, 17)).with_id(1)];
        let view = PetWithOwner::join(pet, &owners);
        assert!(view.owner.is_none());
    }

    #[test]
    fn owner_without_id_matches_no_pets() {
        let owner = Owner::new("Ghost", date(1990, 5, 17));
        let pets = [Pet::new("Tom", date(2021, 3, 3)).owned_by(1)];
        assert!(OwnerWithPets::join(owner, &pets).pets.is_empty());
    }

    proptest! {
        #[test]
        fn join_keeps_exactly_the_owners_pets(
            target in 1i64..5,
            owner_ids in proptest::collection::vec(proptest::option::of(1i64..5), 0..40),
        ) {
            let pets: Vec<Pet> = owner_ids
                .iter()
                .enumerate()
                .map(|(i, owner_id)| Pet {
                    id: Some(i64::try_from(i).unwrap()),
                    owner_id: *owner_id,
                    ..Pet::default()
                })
                .collect();

            let owner = Owner::new("Target", date(1990, 1, 1)).with_id(target);
            let view = OwnerWithPets::join(owner, &pets);

            let expected: Vec<&Pet> = pets.iter().filter(|p| p.owner_id == Some(target)).collect();
            prop_assert_eq!(view.pets.len(), expected.len());
            for pet in &view.pets {
                prop_assert_eq!(pet.owner_id, view.owner.id);
            }
        }
    }
}
