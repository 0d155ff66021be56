use std::fmt;

/// Final outcome reported by the remote pursuit logic.
///
/// Matching is exact. Anything unrecognised is kept verbatim and resolved
/// like an escape, and echoed back unchanged on the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The chaser caught the leader.
    Win,
    /// The leader got away.
    Escape,
    /// Nobody won; roles swap and the battle restarts.
    Draw,
    /// The reporter forfeited.
    GiveUp,
    Other(String),
}

impl Outcome {
    pub fn parse(result: &str) -> Self {
        match result {
            "WIN" => Outcome::Win,
            "ESCAPE" => Outcome::Escape,
            "DRAW" => Outcome::Draw,
            "GIVEUP" => Outcome::GiveUp,
            other => Outcome::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Outcome::Win => "WIN",
            Outcome::Escape => "ESCAPE",
            Outcome::Draw => "DRAW",
            Outcome::GiveUp => "GIVEUP",
            Outcome::Other(raw) => raw,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
