//! Status + JSON body pairs produced by the gateway's operations.
//!
//! Domain modules return a [`JsonReply`]; only `web` knows how to put one
//! on the wire.

use serde_json::{Value, json};

/// A status code plus JSON body, ready for the HTTP layer.
#[derive(Debug, Clone, PartialEq)]
pub struct JsonReply {
    pub status: u16,
    pub body: Value,
}

impl JsonReply {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    /// `{"error": message}` with the given status.
    pub fn error(status: u16, message: impl Into<String>) -> Self {
        Self::new(status, json!({ "error": message.into() }))
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
