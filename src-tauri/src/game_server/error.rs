//! Error - Configuration errors surfaced at construction time

/// Reasons a race configuration is rejected
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    MissingFinishTile,
    DuplicateFinishTile(usize),
    InvalidValue { field: &'static str, value: f32 },
    RacerCount(usize),
    UnknownRacer(String),
    DuplicateLane(usize),
    HeadingMismatch(String),
    Parse(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingFinishTile => write!(f, "tile sequence has no finish tile"),
            Self::DuplicateFinishTile(n) => {
                write!(f, "tile sequence has {n} finish tiles (expected exactly 1)")
            }
            Self::InvalidValue { field, value } => write!(f, "invalid {field}: {value}"),
            Self::RacerCount(n) => write!(f, "race needs 1 to 4 racers, got {n}"),
            Self::UnknownRacer(name) => write!(f, "no start position for racer '{name}'"),
            Self::DuplicateLane(lane) => write!(f, "lane {lane} assigned to more than one racer"),
            Self::HeadingMismatch(name) => {
                write!(f, "racer '{name}' does not head in the track's forward direction")
            }
            Self::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<serde_json::Error> for ConfigError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}
