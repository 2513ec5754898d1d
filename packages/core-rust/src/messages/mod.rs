//! Wire envelopes for the owner and pet channels.
//!
//! Every message is a JSON object with camelCase field names. Requests carry
//! `correlationId` + `action` + a domain payload; replies echo the
//! `correlationId` and add `success`, `errorMessage`, `errorKind`, and a
//! domain result. Domain payloads are flattened into the envelope object so
//! the wire shape stays one flat map per message.

pub mod envelope;
pub mod owner;
pub mod paging;
pub mod pet;

pub use envelope::{
    Action, CorrelationId, EnvelopeHeader, ErrorKind, RequestEnvelope, ResponseEnvelope,
};
pub use owner::{OwnerPayload, OwnerRequest, OwnerResponse, OwnerResult};
pub use paging::Paging;
pub use pet::{PetPayload, PetRequest, PetResponse, PetResult};
