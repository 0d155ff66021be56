pub mod errors;
pub mod events;
pub mod id;
pub mod types;

pub use errors::{ChaseError, CommandError, ConfigError};
pub use events::{Event, EventBus};
pub use id::{new_correlation_id, ParticipantId, SERVER_SESSION_ID};
pub use types::Participant;

pub type Result<T> = std::result::Result<T, ChaseError>;
