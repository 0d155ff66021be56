//! Chat commands that drive the coordinator.
//!
//! Lines starting with `/` are parsed into a [`Command`]; anything the
//! chase plugin does not own is left for the host to handle.

mod handler;

pub use handler::CommandHandler;

use chase_common::{CommandError, Participant};

/// Who issued a command.
#[derive(Debug, Clone)]
pub struct CommandContext {
    pub caller: Participant,
    pub privileged: bool,
}

impl CommandContext {
    pub fn player(caller: Participant) -> Self {
        Self {
            caller,
            privileged: false,
        }
    }

    pub fn admin(caller: Participant) -> Self {
        Self {
            caller,
            privileged: true,
        }
    }
}

/// Actions under `/chase_cmd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdminAction {
    /// `SET_ROLES <leaderId>,<chaserId>`; payload kept raw for error reporting.
    SetRoles(String),
    Start,
    Stop,
    Status,
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/chase <targetId>`: the caller chases the target.
    Chase { target: i64 },
    /// `/chasereport <result>`: sent by the in-client pursuit script.
    ChaseReport { result: String },
    /// `/chase_cmd <action> [payload]`: admin only.
    ChaseCmd(AdminAction),
    /// `/chase_reset`: admin only.
    ChaseReset,
}

impl Command {
    /// Parse one chat line.
    ///
    /// `Ok(None)` means the line is not a chase command.
    pub fn parse(line: &str) -> Result<Option<Command>, CommandError> {
        let Some(body) = line.trim().strip_prefix('/') else {
            return Ok(None);
        };
        let mut parts = body.split_whitespace();
        let Some(name) = parts.next() else {
            return Ok(None);
        };

        let command = match name {
            "chase" => {
                let raw = parts
                    .next()
                    .ok_or(CommandError::MissingArgument("/chase <id>"))?;
                let target = raw.parse().map_err(|_| CommandError::InvalidTarget)?;
                Command::Chase { target }
            }
            "chasereport" => {
                let result = parts
                    .next()
                    .ok_or(CommandError::MissingArgument("/chasereport <result>"))?;
                Command::ChaseReport {
                    result: result.to_string(),
                }
            }
            "chase_cmd" => {
                let action = parts.next().ok_or(CommandError::MissingArgument(
                    "/chase_cmd <SET_ROLES|START|STOP|STATUS> [payload]",
                ))?;
                let payload = parts.collect::<Vec<_>>().join("");
                Command::ChaseCmd(match action {
                    "SET_ROLES" => AdminAction::SetRoles(payload),
                    "START" => AdminAction::Start,
                    "STOP" => AdminAction::Stop,
                    "STATUS" => AdminAction::Status,
                    other => AdminAction::Unknown(other.to_string()),
                })
            }
            "chase_reset" => Command::ChaseReset,
            _ => return Ok(None),
        };
        Ok(Some(command))
    }

    pub fn requires_privilege(&self) -> bool {
        matches!(self, Command::ChaseCmd(_) | Command::ChaseReset)
    }
}
