use serde::{Deserialize, Serialize};

/// Fire-and-forget presentation events emitted during a step.
///
/// Rendering and audio collaborators consume these; the simulation never
/// waits on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EnvEvent {
    /// A jump impulse was applied. Coordinates are the bottom-centre of the
    /// collision rectangle, where jump particles spawn.
    JumpTriggered { x: f32, y: f32 },
    /// The actor touched a hazard or fell past the hazard line.
    DamageTaken { amount: i32 },
    /// A coin tile at (col, row) was picked up.
    CoinCollected { col: i32, row: i32 },
    /// The actor crossed the goal line.
    GoalReached,
}

impl EnvEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, EnvEvent::DamageTaken { .. } | EnvEvent::GoalReached)
    }
}
