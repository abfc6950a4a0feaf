use serde_json::Value as Json;

/// Opaque tagged request handed to a transition function.
///
/// The engine never interprets `kind`; routing a request to handlers is the
/// caller's concern. The payload is an arbitrary plain value.
#[derive(Debug, Clone, PartialEq)]
pub struct Action {
    pub kind: String,
    pub payload: Json,
}

impl Action {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            payload: Json::Null,
        }
    }

    pub fn with_payload(kind: impl Into<String>, payload: Json) -> Self {
        Self {
            kind: kind.into(),
            payload,
        }
    }
}
