//! Random-policy rollouts spread across worker threads.
//!
//! Episode `i` always draws its level and actions from an RNG seeded with
//! `seed + i`, so results do not depend on how many workers run them.

use std::sync::{Arc, mpsc};
use std::thread;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Serialize;

use tilerun_core::{Action, EnvEvent, Environment, LevelId};
use tilerun_platformer::EpisodeController;
use tilerun_platformer::config::{ConfigError, EnvConfig};
use tilerun_platformer::error::EnvError;
use tilerun_platformer::level::LevelSource;

use crate::config::RolloutConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Goal,
    Hazard,
    Truncated,
}

/// One finished episode, printed as a JSON line.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EpisodeSummary {
    pub episode: usize,
    pub worker: usize,
    pub level: String,
    pub outcome: Outcome,
    pub steps: u64,
    pub total_reward: f32,
    pub coins: usize,
    pub jumps: usize,
    pub skipped_ticks: usize,
    pub final_x: f32,
}

#[derive(Debug)]
pub enum RolloutError {
    Config(ConfigError),
    Env(EnvError),
    Spawn(std::io::Error),
    WorkerPanicked(usize),
}

impl std::fmt::Display for RolloutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(e) => write!(f, "{e}"),
            Self::Env(e) => write!(f, "environment error: {e}"),
            Self::Spawn(e) => write!(f, "failed to spawn worker: {e}"),
            Self::WorkerPanicked(id) => write!(f, "worker {id} panicked"),
        }
    }
}

impl std::error::Error for RolloutError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(e) => Some(e),
            Self::Env(e) => Some(e),
            Self::Spawn(e) => Some(e),
            Self::WorkerPanicked(_) => None,
        }
    }
}

impl From<EnvError> for RolloutError {
    fn from(e: EnvError) -> Self {
        Self::Env(e)
    }
}

/// Terminal outcome named by a step's events. A hazard outranks the goal
/// when both fire on the same step.
fn terminal_outcome(events: &[EnvEvent]) -> Option<Outcome> {
    if events
        .iter()
        .any(|e| matches!(e, EnvEvent::DamageTaken { .. }))
    {
        Some(Outcome::Hazard)
    } else if events.contains(&EnvEvent::GoalReached) {
        Some(Outcome::Goal)
    } else {
        None
    }
}

fn random_action(rng: &mut StdRng) -> Action {
    Action::ALL[rng.random_range(0..Action::ALL.len())]
}

/// Run a single episode on `level` under a uniform random policy.
pub fn run_episode(
    env: &mut EpisodeController,
    level: &LevelId,
    rng: &mut StdRng,
    max_steps: u64,
) -> Result<EpisodeSummary, EnvError> {
    env.reset(level)?;

    let mut summary = EpisodeSummary {
        episode: 0,
        worker: 0,
        level: level.to_string(),
        outcome: Outcome::Truncated,
        steps: 0,
        total_reward: 0.0,
        coins: 0,
        jumps: 0,
        skipped_ticks: 0,
        final_x: 0.0,
    };

    for _ in 0..max_steps {
        let result = env.step(random_action(rng))?;
        summary.steps += 1;
        summary.total_reward += result.reward;
        summary.final_x = result.info.position.x;
        if result.info.skipped_tick {
            summary.skipped_ticks += 1;
        }
        for event in &result.events {
            match event {
                EnvEvent::CoinCollected { .. } => summary.coins += 1,
                EnvEvent::JumpTriggered { .. } => summary.jumps += 1,
                EnvEvent::GoalReached | EnvEvent::DamageTaken { .. } => {},
            }
        }
        if let Some(outcome) = terminal_outcome(&result.events) {
            summary.outcome = outcome;
        }
        if result.terminated {
            return Ok(summary);
        }
    }

    summary.outcome = Outcome::Truncated;
    Ok(summary)
}

fn worker_loop<L: LevelSource + 'static>(
    id: usize,
    config: &RolloutConfig,
    env_config: EnvConfig,
    levels: L,
    tx: mpsc::Sender<EpisodeSummary>,
) -> Result<(), RolloutError> {
    let mut env = EpisodeController::new(env_config, levels)?;

    for episode in (id..config.episodes).step_by(config.workers) {
        let mut rng = StdRng::seed_from_u64(config.seed.wrapping_add(episode as u64));
        let level = LevelId::new(config.levels[rng.random_range(0..config.levels.len())].clone());

        let mut summary = run_episode(&mut env, &level, &mut rng, config.max_steps)?;
        summary.episode = episode;
        summary.worker = id;
        tracing::debug!(
            worker = id,
            episode,
            level = %level,
            outcome = ?summary.outcome,
            steps = summary.steps,
            "Episode finished"
        );
        if tx.send(summary).is_err() {
            break;
        }
    }
    Ok(())
}

/// Run `config.episodes` episodes over `config.workers` threads. Each
/// worker builds its own level source with `make_levels`. Summaries come
/// back ordered by episode index.
pub fn run_parallel<L, F>(
    config: &RolloutConfig,
    env_config: &EnvConfig,
    make_levels: F,
) -> Result<Vec<EpisodeSummary>, RolloutError>
where
    L: LevelSource + 'static,
    F: Fn() -> L + Send + Sync + 'static,
{
    config.validate().map_err(RolloutError::Config)?;
    let make_levels = Arc::new(make_levels);
    let (tx, rx) = mpsc::channel();
    let mut handles = Vec::with_capacity(config.workers);

    for id in 0..config.workers {
        let tx = tx.clone();
        let config = config.clone();
        let env_config = env_config.clone();
        let make_levels = Arc::clone(&make_levels);
        let handle = thread::Builder::new()
            .name(format!("rollout-{id}"))
            .spawn(move || worker_loop(id, &config, env_config, (*make_levels)(), tx))
            .map_err(RolloutError::Spawn)?;
        handles.push(handle);
    }
    drop(tx);

    let mut summaries: Vec<EpisodeSummary> = rx.iter().collect();

    for (id, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(result) => result?,
            Err(_) => return Err(RolloutError::WorkerPanicked(id)),
        }
    }

    summaries.sort_by_key(|s| s.episode);
    Ok(summaries)
}

/// Aggregate counts over a batch of episodes.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BatchStats {
    pub episodes: usize,
    pub goals: usize,
    pub hazards: usize,
    pub truncated: usize,
    pub mean_reward: f32,
    pub mean_steps: f32,
}

impl BatchStats {
    pub fn from_summaries(summaries: &[EpisodeSummary]) -> Self {
        if summaries.is_empty() {
            return Self::default();
        }
        let n = summaries.len();
        let count = |o: Outcome| summaries.iter().filter(|s| s.outcome == o).count();
        Self {
            episodes: n,
            goals: count(Outcome::Goal),
            hazards: count(Outcome::Hazard),
            truncated: count(Outcome::Truncated),
            mean_reward: summaries.iter().map(|s| s.total_reward).sum::<f32>() / n as f32,
            mean_steps: summaries.iter().map(|s| s.steps as f32).sum::<f32>() / n as f32,
        }
    }
}
