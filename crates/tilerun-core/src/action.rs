use serde::{Deserialize, Serialize};

/// Discrete action accepted by an environment step.
///
/// The discriminants are the wire values a policy emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Action {
    MoveLeft = 0,
    MoveRight = 1,
    Jump = 2,
    Noop = 3,
}

impl Action {
    /// Every action, ordered by wire value.
    pub const ALL: [Action; 4] = [
        Action::MoveLeft,
        Action::MoveRight,
        Action::Jump,
        Action::Noop,
    ];

    pub fn index(self) -> u8 {
        self as u8
    }
}

/// A raw action value outside the action space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidActionError(pub u8);

impl std::fmt::Display for InvalidActionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "invalid action value {} (expected 0..{})",
            self.0,
            Action::ALL.len()
        )
    }
}

impl std::error::Error for InvalidActionError {}

impl TryFrom<u8> for Action {
    type Error = InvalidActionError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Action::ALL
            .get(value as usize)
            .copied()
            .ok_or(InvalidActionError(value))
    }
}

/// Per-tick control state from a human device or a translated [`Action`].
///
/// `move_dir` is -1 (left), 0 or +1 (right); any other value is reduced
/// to its sign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ControlInput {
    pub move_dir: i8,
    pub jump: bool,
    /// When set, `move_dir` is ignored and the previous horizontal intent
    /// is kept (a bare jump press).
    pub keep_intent: bool,
}

impl ControlInput {
    pub fn direction(&self) -> i8 {
        self.move_dir.signum()
    }
}

impl From<Action> for ControlInput {
    fn from(action: Action) -> Self {
        match action {
            Action::MoveLeft => ControlInput {
                move_dir: -1,
                ..Default::default()
            },
            Action::MoveRight => ControlInput {
                move_dir: 1,
                ..Default::default()
            },
            Action::Jump => ControlInput {
                move_dir: 0,
                jump: true,
                keep_intent: true,
            },
            Action::Noop => ControlInput::default(),
        }
    }
}
