//! Client-facing wire protocol: JSON text frames tagged by `type`.

use serde::{Deserialize, Serialize};

/// Frames a client sends. The first one must be `hello`.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "hello")]
    Hello { name: String },

    #[serde(rename = "chat")]
    Chat { message: String },
}

/// Frames the server sends back to clients.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "welcome")]
    Welcome { session_id: u8 },

    /// `session_id` is the sender's slot, or 255 for the server itself.
    #[serde(rename = "chat")]
    Chat { session_id: u8, message: String },

    #[serde(rename = "error")]
    Error { message: String },
}

impl ServerMessage {
    pub fn to_json(&self) -> String {
        // Plain string and integer fields; serialization cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}
