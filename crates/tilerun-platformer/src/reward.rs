use serde::{Deserialize, Serialize};

use crate::config::RewardConfig;

/// Per-step reward terms, each stored as its signed contribution.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RewardBreakdown {
    pub progress: f32,
    pub living_cost: f32,
    pub jump_shaping: f32,
    pub fall_penalty: f32,
    pub hazard_penalty: f32,
    pub goal_bonus: f32,
}

impl RewardBreakdown {
    /// Sum in a fixed order so equal inputs give bit-identical rewards.
    pub fn total(&self) -> f32 {
        let mut reward = self.progress;
        reward += self.living_cost;
        reward += self.jump_shaping;
        reward += self.fall_penalty;
        reward += self.hazard_penalty;
        reward += self.goal_bonus;
        reward
    }
}

/// Facts about one state transition that the reward depends on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transition {
    pub previous_x: f32,
    pub new_x: f32,
    /// `Some(grounded_at_issue)` when the action was Jump.
    pub jump_issued: Option<bool>,
    pub on_ground: bool,
    pub velocity_y: f32,
    pub hit_hazard: bool,
    pub reached_goal: bool,
}

/// Accumulators owned by the episode controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRewardState {
    pub previous_x: f32,
    pub cumulative_reward: f32,
    pub terminated: bool,
    pub hazard_applied: bool,
    pub steps: u64,
}

impl EpisodeRewardState {
    pub fn new(start_x: f32) -> Self {
        Self {
            previous_x: start_x,
            ..Self::default()
        }
    }
}

/// Score a transition. y grows downward, so descending means `vy > 0`.
pub fn compute(config: &RewardConfig, t: &Transition) -> RewardBreakdown {
    RewardBreakdown {
        progress: (t.new_x - t.previous_x) / config.progress_scale,
        living_cost: -config.living_cost,
        jump_shaping: match t.jump_issued {
            Some(true) => config.jump_bonus,
            Some(false) => -config.jump_penalty,
            None => 0.0,
        },
        fall_penalty: if !t.on_ground && t.velocity_y > 0.0 {
            -config.fall_penalty
        } else {
            0.0
        },
        hazard_penalty: if t.hit_hazard {
            -config.hazard_penalty
        } else {
            0.0
        },
        goal_bonus: if t.reached_goal { config.goal_bonus } else { 0.0 },
    }
}
