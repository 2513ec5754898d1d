//! Request and response envelopes exchanged over the bus.
//!
//! An envelope is a JSON object carrying a `correlationId`, an `action` tag,
//! and a domain payload flattened into the same object. Domain payloads live
//! in the sibling `owner` and `pet` modules.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// CorrelationId
// ---------------------------------------------------------------------------

/// Token linking a request to its eventual reply.
///
/// Generated by the sender as a random UUID v4 and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    /// Generates a fresh random id.
    #[must_use]
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CorrelationId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CorrelationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// Action
// ---------------------------------------------------------------------------

/// Operation tag carried by every request envelope.
///
/// The textual form (`GET_ALL`, `GET_BY_ID`, ...) is part of the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    GetAll,
    GetById,
    GetByOwnerId,
    SearchByName,
    Create,
    Update,
    Delete,
}

impl Action {
    pub const ALL: [Action; 7] = [
        Action::GetAll,
        Action::GetById,
        Action::GetByOwnerId,
        Action::SearchByName,
        Action::Create,
        Action::Update,
        Action::Delete,
    ];

    /// Returns the wire tag for this action.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::GetAll => "GET_ALL",
            Self::GetById => "GET_BY_ID",
            Self::GetByOwnerId => "GET_BY_OWNER_ID",
            Self::SearchByName => "SEARCH_BY_NAME",
            Self::Create => "CREATE",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str() == s)
            .ok_or_else(|| format!("Unknown action: {s}"))
    }
}

// ---------------------------------------------------------------------------
// ErrorKind
// ---------------------------------------------------------------------------

/// Machine-readable failure category attached to a failed reply.
///
/// Optional on the wire: replies without it are classified by message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Validation,
    UnknownAction,
    Internal,
}

impl ErrorKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Validation => "VALIDATION",
            Self::UnknownAction => "UNKNOWN_ACTION",
            Self::Internal => "INTERNAL",
        }
    }
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// Identifies one remote operation.
///
/// Only the payload fields relevant to `action` are meaningful; responders
/// ignore the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestEnvelope<P> {
    pub correlation_id: CorrelationId,
    pub action: Action,
    #[serde(flatten)]
    pub payload: P,
}

impl<P> RequestEnvelope<P> {
    #[must_use]
    pub fn new(correlation_id: CorrelationId, action: Action, payload: P) -> Self {
        Self {
            correlation_id,
            action,
            payload,
        }
    }
}

/// Reply to exactly one request envelope.
///
/// `error_message` is present iff `success` is false. `action` is echoed
/// from the request and is absent only when the request could not be parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope<R> {
    pub correlation_id: CorrelationId,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub action: Option<Action>,
    #[serde(default)]
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error_kind: Option<ErrorKind>,
    #[serde(flatten)]
    pub result: R,
}

impl<R> ResponseEnvelope<R> {
    /// Successful reply carrying `result`.
    #[must_use]
    pub fn success(correlation_id: CorrelationId, action: Action, result: R) -> Self {
        Self {
            correlation_id,
            action: Some(action),
            success: true,
            error_message: None,
            error_kind: None,
            result,
        }
    }
}

impl<R: Default> ResponseEnvelope<R> {
    /// Failed reply with an empty result.
    #[must_use]
    pub fn failure(
        correlation_id: CorrelationId,
        action: Option<Action>,
        kind: ErrorKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            correlation_id,
            action,
            success: false,
            error_message: Some(message.into()),
            error_kind: Some(kind),
            result: R::default(),
        }
    }
}

/// The fields every envelope shares, decoded without the payload.
///
/// Used to answer requests whose body cannot be decoded in full (an unknown
/// `action` tag, a malformed payload), so the sender still gets a reply.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnvelopeHeader {
    pub correlation_id: CorrelationId,
    #[serde(default)]
    pub action: Option<serde_json::Value>,
}

impl EnvelopeHeader {
    /// Parses the raw `action` field, if it holds a known tag.
    #[must_use]
    pub fn known_action(&self) -> Option<Action> {
        self.action
            .as_ref()
            .and_then(serde_json::Value::as_str)
            .and_then(|tag| tag.parse().ok())
    }

    /// Renders the raw `action` field for error messages.
    #[must_use]
    pub fn action_text(&self) -> String {
        match &self.action {
            Some(serde_json::Value::String(tag)) => tag.clone(),
            Some(other) => other.to_string(),
            None => "null".to_string(),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
