//! Chase battle coordination.
//!
//! Tracks which pairs of connected participants are in a pursuit, keeps a
//! participant in at most one battle, resolves battles on reported results
//! or disconnects, and announces every transition over the chat channel
//! using the `CHASE_BATTLE:` text protocol.
//!
//! The host server plugs in through two traits: [`ConnectionRegistry`]
//! (slot lookup and the disconnect event stream) and [`ChatSink`]
//! (broadcast and targeted chat sends).

pub mod battle;
pub mod commands;
pub mod coordinator;
pub mod outcome;
pub mod plugin;
pub mod protocol;
pub mod registry;

#[cfg(test)]
pub(crate) mod test_support;

pub use battle::Battle;
pub use commands::{AdminAction, Command, CommandContext, CommandHandler};
pub use coordinator::{CoordinatorSnapshot, Phase, SessionCoordinator};
pub use outcome::Outcome;
pub use plugin::{ChasePlugin, DisconnectSubscription};
pub use protocol::{ProtocolBroadcaster, ProtocolError, ProtocolMessage};
pub use registry::{ChatSink, ConnectionRegistry, Slot};
