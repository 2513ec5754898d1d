//! JSON encoding of envelopes for transport over the bus.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// Failure to encode or decode a message body.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to encode message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("failed to decode message: {0}")]
    Decode(#[source] serde_json::Error),
}

/// Serializes a message to a JSON byte vector.
///
/// # Errors
///
/// Returns `CodecError::Encode` if the value cannot be represented as JSON.
pub fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, CodecError> {
    serde_json::to_vec(value).map_err(CodecError::Encode)
}

/// Deserializes a message from a JSON byte slice.
///
/// # Errors
///
/// Returns `CodecError::Decode` if the bytes are not valid JSON for `T`.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    serde_json::from_slice(bytes).map_err(CodecError::Decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::{Action, CorrelationId, PetPayload, PetRequest};

    #[test]
    fn encoded_request_decodes_back() {
        let req = PetRequest::new(CorrelationId::random(), Action::Delete, PetPayload::by_id(5));
        let bytes = encode(&req).unwrap();
        let back: PetRequest = decode(&bytes).unwrap();
        assert_eq!(back, req);
    }

    #[test]
    fn garbage_is_a_decode_error() {
        let err = decode::<PetRequest>(b"not json").unwrap_err();
        assert!(matches!(err, CodecError::Decode(_)));
        assert!(err.to_string().starts_with("failed to decode message"));
    }
}
