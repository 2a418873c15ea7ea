pub mod body;
pub mod collision;
pub mod config;
pub mod error;
pub mod level;
pub mod observation;
pub mod reward;
pub mod tilemap;

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tilerun_core::{
    ControlInput, EnvEvent, EnvMetadata, Environment, LevelId, ObservationGrid, ObservationShape,
    StepResult,
};

use body::{KinematicBody, Vec2};
use config::EnvConfig;
use error::EnvError;
use level::{Level, LevelSource};
use reward::{EpisodeRewardState, RewardBreakdown, Transition};
use tilemap::TileClass;

/// Lifecycle of the controller's current episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EpisodePhase {
    Initialized,
    Running,
    Terminated,
}

/// Diagnostics attached to every step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct StepInfo {
    pub breakdown: RewardBreakdown,
    /// The tick could not be resolved and was rolled back.
    pub skipped_tick: bool,
    pub position: Vec2,
    pub velocity: Vec2,
    pub on_ground: bool,
    pub cumulative_reward: f32,
    pub steps: u64,
}

/// Everything that changes during an episode. Serializable so a running
/// episode can be checkpointed and replayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeState {
    pub level: Level,
    pub body: KinematicBody,
    pub rewards: EpisodeRewardState,
    pub collected_coins: BTreeSet<(i32, i32)>,
    pub phase: EpisodePhase,
    pub hazard_y: f32,
}

/// Owns one body and level and advances them one tick per action.
pub struct EpisodeController {
    config: EnvConfig,
    levels: Box<dyn LevelSource>,
    episode: Option<EpisodeState>,
}

impl EpisodeController {
    pub fn new(config: EnvConfig, levels: impl LevelSource + 'static) -> Result<Self, EnvError> {
        config.validate()?;
        Ok(Self {
            config,
            levels: Box::new(levels),
            episode: None,
        })
    }

    pub fn config(&self) -> &EnvConfig {
        &self.config
    }

    pub fn phase(&self) -> EpisodePhase {
        self.episode
            .as_ref()
            .map_or(EpisodePhase::Initialized, |e| e.phase)
    }

    pub fn state(&self) -> Option<&EpisodeState> {
        self.episode.as_ref()
    }

    pub fn body(&self) -> Option<&KinematicBody> {
        self.episode.as_ref().map(|e| &e.body)
    }

    /// Observation for the current state without advancing.
    pub fn observe(&self) -> Result<ObservationGrid, EnvError> {
        let episode = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        Ok(self.observe_episode(episode))
    }

    fn observe_episode(&self, episode: &EpisodeState) -> ObservationGrid {
        let (col, row) =
            observation::center_cell(episode.body.position, self.config.physics.tile_size);
        observation::extract(&episode.level.map, col, row, &self.config.window)
    }

    /// Load `id` and place the body on its start marker.
    pub fn reset_level(&mut self, id: &LevelId) -> Result<ObservationGrid, EnvError> {
        let level = Level::load(self.levels.as_ref(), id, &self.config.tile_codes)?;
        let physics = &self.config.physics;
        let ts = physics.tile_size;

        // Feet on the bottom edge of the start cell.
        let (col, row) = level.start;
        let spawn = Vec2::new(
            col as f32 * ts - physics.collision_offset_x,
            (row + 1) as f32 * ts - physics.body_height - physics.collision_offset_y,
        );
        let mut body = KinematicBody::new(spawn, physics);
        collision::refresh_contacts(&mut body, &level.map, ts);
        let hazard_y = self
            .config
            .hazard_y
            .unwrap_or_else(|| level.map.pixel_height(ts));

        tracing::debug!(
            level = %id,
            width = level.map.width(),
            height = level.map.height(),
            start = ?level.start,
            goal = ?level.goal,
            "Episode reset"
        );

        let episode = EpisodeState {
            rewards: EpisodeRewardState::new(spawn.x),
            level,
            body,
            collected_coins: BTreeSet::new(),
            phase: EpisodePhase::Running,
            hazard_y,
        };
        let obs = self.observe_episode(&episode);
        self.episode = Some(episode);
        Ok(obs)
    }

    /// Advance one tick from raw control state. Human front-ends call this
    /// directly; [`Environment::step`] translates an [`tilerun_core::Action`]
    /// and lands here.
    pub fn step_input(&mut self, input: ControlInput) -> Result<StepResult<StepInfo>, EnvError> {
        let mut episode = self.episode.take().ok_or(EnvError::NotReset)?;
        let result = self.advance(&mut episode, input);
        self.episode = Some(episode);
        Ok(result)
    }

    fn advance(&self, episode: &mut EpisodeState, input: ControlInput) -> StepResult<StepInfo> {
        if episode.phase == EpisodePhase::Terminated {
            return StepResult {
                observation: self.observe_episode(episode),
                reward: 0.0,
                terminated: true,
                truncated: false,
                events: Vec::new(),
                info: step_info(episode, RewardBreakdown::default(), false),
            };
        }

        let ts = self.config.physics.tile_size;
        let snapshot = episode.body.clone();
        let mut events = Vec::new();

        let grounded_at_issue = episode.body.on_ground();
        if !input.keep_intent {
            episode.body.set_horizontal_intent(input.direction());
        }
        let jump_issued = if input.jump {
            events.extend(episode.body.jump());
            Some(grounded_at_issue)
        } else {
            None
        };

        episode.rewards.steps += 1;
        if let Err(e) = collision::tick_body(&mut episode.body, &episode.level.map, ts) {
            tracing::warn!(
                level = %episode.level.id,
                step = episode.rewards.steps,
                error = %e,
                "Skipping unresolvable tick"
            );
            episode.body = snapshot;
            let breakdown = RewardBreakdown {
                living_cost: -self.config.reward.living_cost,
                ..RewardBreakdown::default()
            };
            let reward = breakdown.total();
            episode.rewards.cumulative_reward += reward;
            return StepResult {
                observation: self.observe_episode(episode),
                reward,
                terminated: false,
                truncated: false,
                events: Vec::new(),
                info: step_info(episode, breakdown, true),
            };
        }

        let rect = episode.body.collision_rect();
        let mut touched_hazard = false;
        for (col, row) in collision::overlapping_cells(&rect, ts) {
            match episode.level.map.classify(col, row) {
                TileClass::Hazard => touched_hazard = true,
                TileClass::Coin => {
                    if episode.collected_coins.insert((col, row)) {
                        events.push(EnvEvent::CoinCollected { col, row });
                    }
                },
                _ => {},
            }
        }

        let position = episode.body.position;
        let hit_hazard = !episode.rewards.hazard_applied
            && (touched_hazard || position.y > episode.hazard_y);
        let reached_goal = position.x >= episode.level.goal.0 as f32 * ts;

        let breakdown = reward::compute(
            &self.config.reward,
            &Transition {
                previous_x: episode.rewards.previous_x,
                new_x: position.x,
                jump_issued,
                on_ground: episode.body.on_ground(),
                velocity_y: episode.body.velocity.y,
                hit_hazard,
                reached_goal,
            },
        );
        let reward = breakdown.total();

        if hit_hazard {
            episode.rewards.hazard_applied = true;
            events.push(EnvEvent::DamageTaken {
                amount: self.config.reward.hazard_damage,
            });
        }
        if reached_goal {
            events.push(EnvEvent::GoalReached);
        }

        let terminated = hit_hazard || reached_goal;
        episode.rewards.previous_x = position.x;
        episode.rewards.cumulative_reward += reward;
        if terminated {
            episode.rewards.terminated = true;
            episode.phase = EpisodePhase::Terminated;
            tracing::debug!(
                level = %episode.level.id,
                steps = episode.rewards.steps,
                reached_goal,
                hit_hazard,
                total_reward = episode.rewards.cumulative_reward,
                "Episode terminated"
            );
        }

        StepResult {
            observation: self.observe_episode(episode),
            reward,
            terminated,
            truncated: false,
            events,
            info: step_info(episode, breakdown, false),
        }
    }

    /// MessagePack checkpoint of the running episode.
    pub fn snapshot(&self) -> Result<Vec<u8>, EnvError> {
        let episode = self.episode.as_ref().ok_or(EnvError::NotReset)?;
        rmp_serde::to_vec(episode).map_err(|e| EnvError::Snapshot(e.to_string()))
    }

    /// Replace the current episode with a checkpoint from [`Self::snapshot`].
    pub fn restore(&mut self, bytes: &[u8]) -> Result<(), EnvError> {
        let episode: EpisodeState =
            rmp_serde::from_slice(bytes).map_err(|e| EnvError::Snapshot(e.to_string()))?;
        self.episode = Some(episode);
        Ok(())
    }
}

fn step_info(episode: &EpisodeState, breakdown: RewardBreakdown, skipped_tick: bool) -> StepInfo {
    StepInfo {
        breakdown,
        skipped_tick,
        position: episode.body.position,
        velocity: episode.body.velocity,
        on_ground: episode.body.on_ground(),
        cumulative_reward: episode.rewards.cumulative_reward,
        steps: episode.rewards.steps,
    }
}

impl Environment for EpisodeController {
    type Error = EnvError;
    type Info = StepInfo;

    fn metadata(&self) -> EnvMetadata {
        EnvMetadata {
            name: "Tilerun Platformer".to_string(),
            description: "Run right to the goal without falling in.".to_string(),
            ticks_per_second: self.config.ticks_per_second,
        }
    }

    fn observation_shape(&self) -> ObservationShape {
        observation::window_shape(&self.config.window)
    }

    fn reset(&mut self, level: &LevelId) -> Result<ObservationGrid, EnvError> {
        self.reset_level(level)
    }

    fn step(&mut self, action: tilerun_core::Action) -> Result<StepResult<StepInfo>, EnvError> {
        self.step_input(ControlInput::from(action))
    }
}
