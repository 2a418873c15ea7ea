use tilerun_core::InvalidActionError;

use crate::config::ConfigError;
use crate::tilemap::TileClass;

/// Failure to load or validate a level. Always fatal to the load attempt.
#[derive(Debug)]
pub enum LevelError {
    /// Non-integer token, ragged row or empty grid. `line` is 1-based.
    Malformed { line: usize, reason: String },
    MissingMarker(TileClass),
    DuplicateMarker {
        class: TileClass,
        first: (i32, i32),
        second: (i32, i32),
    },
    UnknownLevel(String),
    Io { path: String, source: std::io::Error },
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Malformed { line, reason } => {
                write!(f, "malformed level at line {line}: {reason}")
            },
            Self::MissingMarker(class) => write!(f, "level has no {class:?} marker"),
            Self::DuplicateMarker {
                class,
                first,
                second,
            } => write!(
                f,
                "level has more than one {class:?} marker: {first:?} and {second:?}"
            ),
            Self::UnknownLevel(id) => write!(f, "unknown level: {id}"),
            Self::Io { path, source } => write!(f, "failed to read {path}: {source}"),
        }
    }
}

impl std::error::Error for LevelError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Axis being resolved when a collision pass gave up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Horizontal,
    Vertical,
}

/// A resolution pass still overlapped solid tiles after the iteration bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionResolutionError {
    pub axis: Axis,
    pub iterations: u32,
}

impl std::fmt::Display for CollisionResolutionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:?} collision unresolved after {} iterations",
            self.axis, self.iterations
        )
    }
}

impl std::error::Error for CollisionResolutionError {}

/// Errors surfaced by the episode controller.
#[derive(Debug)]
pub enum EnvError {
    Level(LevelError),
    InvalidAction(InvalidActionError),
    Config(ConfigError),
    /// `step` was called before the first successful `reset`.
    NotReset,
    Snapshot(String),
}

impl std::fmt::Display for EnvError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Level(e) => write!(f, "{e}"),
            Self::InvalidAction(e) => write!(f, "{e}"),
            Self::Config(e) => write!(f, "{e}"),
            Self::NotReset => write!(f, "step called before reset"),
            Self::Snapshot(e) => write!(f, "snapshot error: {e}"),
        }
    }
}

impl std::error::Error for EnvError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Level(e) => Some(e),
            Self::InvalidAction(e) => Some(e),
            Self::Config(e) => Some(e),
            _ => None,
        }
    }
}

impl From<LevelError> for EnvError {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

impl From<InvalidActionError> for EnvError {
    fn from(e: InvalidActionError) -> Self {
        Self::InvalidAction(e)
    }
}

impl From<ConfigError> for EnvError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
