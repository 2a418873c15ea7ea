use serde::{Deserialize, Serialize};

use crate::action::{Action, InvalidActionError};
use crate::events::EnvEvent;
use crate::observation::{ObservationGrid, ObservationShape};

/// Identifier of a level known to a level source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LevelId(pub String);

impl LevelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for LevelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Core trait for a steppable episodic environment.
///
/// Drivers (interactive front-ends, rollout workers, training loops) depend
/// only on this trait. Step budgets and truncation belong to the driver.
pub trait Environment: Send {
    /// Error surfaced by `reset` and `step`.
    type Error: std::error::Error + Send + Sync + 'static;
    /// Diagnostic payload attached to every step.
    type Info: std::fmt::Debug + Clone;

    /// Static description of the environment.
    fn metadata(&self) -> EnvMetadata;

    /// Shape of every observation this environment produces.
    fn observation_shape(&self) -> ObservationShape;

    /// Number of discrete actions.
    fn action_space(&self) -> ActionSpace {
        ActionSpace {
            n: Action::ALL.len(),
        }
    }

    /// Start a new episode on `level` and return the first observation.
    fn reset(&mut self, level: &LevelId) -> Result<ObservationGrid, Self::Error>;

    /// Advance exactly one tick.
    fn step(&mut self, action: Action) -> Result<StepResult<Self::Info>, Self::Error>;

    /// Validate a raw action value, then step. Invalid values are rejected
    /// before any state is touched.
    fn step_index(&mut self, raw: u8) -> Result<StepResult<Self::Info>, Self::Error>
    where
        Self::Error: From<InvalidActionError>,
    {
        let action = Action::try_from(raw)?;
        self.step(action)
    }
}

/// Environment metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvMetadata {
    pub name: String,
    pub description: String,
    /// Nominal simulation rate for interactive play.
    pub ticks_per_second: u32,
}

/// Discrete action space of size `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionSpace {
    pub n: usize,
}

/// Result of one environment step.
#[derive(Debug, Clone)]
pub struct StepResult<I> {
    pub observation: ObservationGrid,
    pub reward: f32,
    pub terminated: bool,
    /// Always `false` when produced by an environment; set by the driver
    /// when its step budget runs out.
    pub truncated: bool,
    pub events: Vec<EnvEvent>,
    pub info: I,
}

impl<I> StepResult<I> {
    pub fn done(&self) -> bool {
        self.terminated || self.truncated
    }
}
