use serde::{Deserialize, Serialize};

use crate::tilemap::TileCodeTable;

/// Gravity acceleration (pixels/tick², downward).
pub const GRAVITY: f32 = 0.8;
/// Horizontal move speed (pixels/tick).
pub const MOVE_SPEED: f32 = 8.0;
/// Jump impulse (pixels/tick, negative is upward).
pub const JUMP_SPEED: f32 = -16.0;
/// Terminal fall velocity (pixels/tick).
pub const MAX_FALL_SPEED: f32 = 20.0;
/// Tile edge length in pixels.
pub const TILE_SIZE: f32 = 64.0;
/// Collision rectangle width.
pub const BODY_WIDTH: f32 = 50.0;
/// Collision rectangle height.
pub const BODY_HEIGHT: f32 = 56.0;

/// Player physics parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsConfig {
    pub gravity: f32,
    pub move_speed: f32,
    pub jump_speed: f32,
    pub max_fall_speed: f32,
    pub tile_size: f32,
    pub body_width: f32,
    pub body_height: f32,
    /// Offset of the collision rectangle from the body position.
    pub collision_offset_x: f32,
    pub collision_offset_y: f32,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: GRAVITY,
            move_speed: MOVE_SPEED,
            jump_speed: JUMP_SPEED,
            max_fall_speed: MAX_FALL_SPEED,
            tile_size: TILE_SIZE,
            body_width: BODY_WIDTH,
            body_height: BODY_HEIGHT,
            collision_offset_x: 0.0,
            collision_offset_y: 0.0,
        }
    }
}

impl PhysicsConfig {
    /// Reject parameters that would let a body skip a whole tile in one
    /// tick or that make the geometry degenerate.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let finite = [
            self.gravity,
            self.move_speed,
            self.jump_speed,
            self.max_fall_speed,
            self.tile_size,
            self.body_width,
            self.body_height,
            self.collision_offset_x,
            self.collision_offset_y,
        ];
        if finite.iter().any(|v| !v.is_finite()) {
            return Err(ConfigError::Invalid(
                "physics values must be finite".to_string(),
            ));
        }
        if self.tile_size <= 0.0 || self.body_width <= 0.0 || self.body_height <= 0.0 {
            return Err(ConfigError::Invalid(
                "tile_size, body_width and body_height must be positive".to_string(),
            ));
        }
        if self.move_speed.abs() >= self.tile_size {
            return Err(ConfigError::Invalid(format!(
                "move_speed {} must be below tile_size {}",
                self.move_speed, self.tile_size
            )));
        }
        if self.max_fall_speed <= 0.0 || self.max_fall_speed >= self.tile_size {
            return Err(ConfigError::Invalid(format!(
                "max_fall_speed {} must be in (0, tile_size {})",
                self.max_fall_speed, self.tile_size
            )));
        }
        if self.jump_speed.abs() >= self.tile_size {
            return Err(ConfigError::Invalid(format!(
                "jump_speed {} must be below tile_size {} in magnitude",
                self.jump_speed, self.tile_size
            )));
        }
        Ok(())
    }
}

/// Shaping reward coefficients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RewardConfig {
    /// Pixels of rightward progress worth 1.0 reward.
    pub progress_scale: f32,
    pub living_cost: f32,
    /// Added when Jump is issued while grounded.
    pub jump_bonus: f32,
    /// Subtracted when Jump is issued while airborne.
    pub jump_penalty: f32,
    /// Subtracted every airborne tick spent descending.
    pub fall_penalty: f32,
    pub hazard_penalty: f32,
    pub goal_bonus: f32,
    /// Damage reported with the hazard event.
    pub hazard_damage: i32,
}

impl Default for RewardConfig {
    fn default() -> Self {
        Self {
            progress_scale: 10.0,
            living_cost: 0.01,
            jump_bonus: 0.1,
            jump_penalty: 0.2,
            fall_penalty: 0.05,
            hazard_penalty: 20.0,
            goal_bonus: 100.0,
            hazard_damage: 10,
        }
    }
}

/// Observation window extents around the actor cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WindowSpec {
    pub rows_above: usize,
    pub rows_below: usize,
    pub cols_left: usize,
    pub cols_right: usize,
    /// Emit rows bottom-up instead of top-down.
    pub flip_vertical: bool,
}

impl Default for WindowSpec {
    fn default() -> Self {
        Self {
            rows_above: 5,
            rows_below: 9,
            cols_left: 1,
            cols_right: 9,
            flip_vertical: false,
        }
    }
}

impl WindowSpec {
    pub fn rows(&self) -> usize {
        self.rows_above + 1 + self.rows_below
    }

    pub fn cols(&self) -> usize {
        self.cols_left + 1 + self.cols_right
    }
}

/// Top-level environment configuration, loadable from TOML.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvConfig {
    pub physics: PhysicsConfig,
    pub reward: RewardConfig,
    pub window: WindowSpec,
    pub tile_codes: TileCodeTable,
    /// World y beyond which the actor counts as fallen. Defaults to the
    /// bottom edge of the map.
    pub hazard_y: Option<f32>,
    /// Nominal interactive tick rate.
    pub ticks_per_second: u32,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            physics: PhysicsConfig::default(),
            reward: RewardConfig::default(),
            window: WindowSpec::default(),
            tile_codes: TileCodeTable::default(),
            hazard_y: None,
            ticks_per_second: 60,
        }
    }
}

impl EnvConfig {
    /// Load config from a TOML file. Falls back to defaults if the file is
    /// missing, unparseable or invalid.
    pub fn load() -> Self {
        let path = std::env::var("TILERUN_CONFIG")
            .unwrap_or_else(|_| "config/tilerun.toml".to_string());
        match std::fs::read_to_string(&path) {
            Ok(content) => match Self::from_toml_str(&content) {
                Ok(cfg) => cfg,
                Err(e) => {
                    tracing::warn!("Failed to load {path}: {e}, using defaults");
                    EnvConfig::default()
                },
            },
            Err(_) => EnvConfig::default(),
        }
    }

    /// Strict parse: malformed TOML or invalid physics is an error.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let cfg: EnvConfig =
            toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.physics.validate()?;
        if self.reward.progress_scale == 0.0 || !self.reward.progress_scale.is_finite() {
            return Err(ConfigError::Invalid(
                "progress_scale must be finite and non-zero".to_string(),
            ));
        }
        if let Some(y) = self.hazard_y
            && !y.is_finite()
        {
            return Err(ConfigError::Invalid("hazard_y must be finite".to_string()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    Parse(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(e) => write!(f, "config parse error: {e}"),
            Self::Invalid(e) => write!(f, "invalid config: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}
