//! Chat-channel wire protocol for chase battles.
//!
//! Battle messages are colon-delimited `CHASE_BATTLE:<OPCODE>:<payload>`
//! lines broadcast to every client. Forfeit-by-disconnect is the one
//! targeted message and uses its own `CHASE_END:<leaderId>` prefix.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use chase_common::ParticipantId;

use crate::outcome::Outcome;
use crate::registry::ChatSink;

pub const BATTLE_PREFIX: &str = "CHASE_BATTLE";
pub const END_PREFIX: &str = "CHASE_END";

pub mod opcodes {
    pub const SETUP: &str = "SETUP";
    pub const START: &str = "START";
    pub const RESULT: &str = "RESULT";
    pub const STATE: &str = "STATE";
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("not a chase protocol line")]
    NotProtocol,

    #[error("unknown opcode: {0}")]
    UnknownOpcode(String),

    #[error("malformed {opcode} payload: {payload:?}")]
    MalformedPayload { opcode: String, payload: String },
}

/// One protocol line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolMessage {
    Setup {
        leader: ParticipantId,
        chaser: ParticipantId,
    },
    Start,
    Result(Outcome),
    State(u8),
    ChaseEnd {
        leader: ParticipantId,
    },
}

impl ProtocolMessage {
    pub fn encode(&self) -> String {
        self.to_string()
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        line.parse()
    }
}

impl fmt::Display for ProtocolMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProtocolMessage::Setup { leader, chaser } => {
                write!(f, "{BATTLE_PREFIX}:{}:{leader},{chaser}", opcodes::SETUP)
            }
            ProtocolMessage::Start => write!(f, "{BATTLE_PREFIX}:{}:", opcodes::START),
            ProtocolMessage::Result(outcome) => {
                write!(f, "{BATTLE_PREFIX}:{}:{outcome}", opcodes::RESULT)
            }
            ProtocolMessage::State(code) => write!(f, "{BATTLE_PREFIX}:{}:{code}", opcodes::STATE),
            ProtocolMessage::ChaseEnd { leader } => write!(f, "{END_PREFIX}:{leader}"),
        }
    }
}

impl FromStr for ProtocolMessage {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let (prefix, rest) = line.split_once(':').ok_or(ProtocolError::NotProtocol)?;

        if prefix == END_PREFIX {
            // Accept the space some senders put after the colon.
            let leader = parse_id(END_PREFIX, rest)?;
            return Ok(ProtocolMessage::ChaseEnd { leader });
        }
        if prefix != BATTLE_PREFIX {
            return Err(ProtocolError::NotProtocol);
        }

        let (opcode, payload) = rest.split_once(':').unwrap_or((rest, ""));
        match opcode {
            opcodes::SETUP => {
                let (leader, chaser) = payload
                    .split_once(',')
                    .ok_or_else(|| malformed(opcode, payload))?;
                Ok(ProtocolMessage::Setup {
                    leader: parse_id(opcode, leader)?,
                    chaser: parse_id(opcode, chaser)?,
                })
            }
            opcodes::START => Ok(ProtocolMessage::Start),
            opcodes::RESULT if !payload.is_empty() => {
                Ok(ProtocolMessage::Result(Outcome::parse(payload)))
            }
            opcodes::RESULT => Err(malformed(opcode, payload)),
            opcodes::STATE => payload
                .trim()
                .parse()
                .map(ProtocolMessage::State)
                .map_err(|_| malformed(opcode, payload)),
            other => Err(ProtocolError::UnknownOpcode(other.to_string())),
        }
    }
}

fn parse_id(opcode: &str, raw: &str) -> Result<ParticipantId, ProtocolError> {
    raw.parse().map_err(|_| malformed(opcode, raw))
}

fn malformed(opcode: &str, payload: &str) -> ProtocolError {
    ProtocolError::MalformedPayload {
        opcode: opcode.to_string(),
        payload: payload.to_string(),
    }
}

/// Hands protocol lines and human-readable notices to the host's chat
/// primitive. Stateless; sends happen in call order.
#[derive(Clone)]
pub struct ProtocolBroadcaster {
    sink: Arc<dyn ChatSink>,
}

impl ProtocolBroadcaster {
    pub fn new(sink: Arc<dyn ChatSink>) -> Self {
        Self { sink }
    }

    /// Broadcast a protocol line to every client.
    pub fn protocol(&self, message: &ProtocolMessage) {
        let line = message.encode();
        tracing::debug!(line = %line, "Protocol broadcast");
        self.sink.broadcast(&line);
    }

    /// Send a protocol line to one client.
    pub fn direct(&self, to: ParticipantId, message: &ProtocolMessage) {
        let line = message.encode();
        tracing::debug!(to = %to, line = %line, "Protocol send");
        self.sink.send_to(to, &line);
    }

    /// Broadcast a spectator notice.
    pub fn notice(&self, text: &str) {
        self.sink.broadcast(text);
    }

    /// Send a notice to one client.
    pub fn reply(&self, to: ParticipantId, text: &str) {
        self.sink.send_to(to, text);
    }
}
