//! `Kennel` Core — owner/pet entities, bus envelopes, action tags, and the JSON codec.

pub mod codec;
pub mod messages;
pub mod types;

pub use codec::{decode, encode, CodecError};
pub use messages::{Action, CorrelationId, ErrorKind, RequestEnvelope, ResponseEnvelope};
pub use types::{
    Owner, OwnerWithPets, Page, PageRequest, Pet, PetColor, PetWithOwner, SortDirection,
};
