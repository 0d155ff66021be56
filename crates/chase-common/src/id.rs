use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Session id the host uses as the sender of server-originated chat.
pub const SERVER_SESSION_ID: u8 = 255;

/// Short hex id used to tag one connection's log lines.
pub fn new_correlation_id() -> String {
    let uuid = uuid::Uuid::new_v4();
    let bytes = uuid.as_bytes();
    format!(
        "{:02x}{:02x}{:02x}{:02x}",
        bytes[0], bytes[1], bytes[2], bytes[3]
    )
}

/// Slot-based identity of a connected participant.
///
/// Ids are assigned by the connection registry and are only meaningful while
/// the participant stays connected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(pub u8);

impl ParticipantId {
    pub fn as_u8(self) -> u8 {
        self.0
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ParticipantId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse::<u8>().map(ParticipantId)
    }
}
