use std::path::PathBuf;

use crate::id::ParticipantId;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),

    #[error("config validation error: {0}")]
    ValidationError(String),
}

/// Rejections from the chat command layer.
///
/// The `Display` text is what the invoking participant sees as a notice.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CommandError {
    #[error("Chase battles are disabled.")]
    Disabled,

    #[error("Invalid target ID.")]
    InvalidTarget,

    #[error("Cannot chase AI cars.")]
    AiTarget,

    #[error("Target is not connected (ID: {0}).")]
    TargetNotConnected(ParticipantId),

    #[error("You cannot chase yourself.")]
    SelfTarget,

    #[error("Could not start chase (players busy?).")]
    Busy,

    #[error("You do not have permission to use this command.")]
    PermissionDenied,

    #[error("Could not find one or both drivers.")]
    UnknownDrivers,

    #[error("Malformed payload: {0}")]
    MalformedPayload(String),

    #[error("Usage: {0}")]
    MissingArgument(&'static str),

    #[error("Unknown command: {0}")]
    UnknownCommand(String),
}

#[derive(Debug, thiserror::Error)]
pub enum ChaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
