mod config;
mod runner;

use tilerun_platformer::config::EnvConfig;
use tilerun_platformer::level::{ChainedLevels, DirLevelSource, GeneratedLevels};
use tracing_subscriber::EnvFilter;

use config::RolloutConfig;
use runner::BatchStats;

fn main() {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if std::env::var("TILERUN_LOG_FORMAT").is_ok_and(|f| f == "json") {
        builder.json().init();
    } else {
        builder.init();
    }

    let config = RolloutConfig::load();

    if let Err(e) = config.validate() {
        tracing::error!("{e}");
        std::process::exit(1);
    }
    let env_config = EnvConfig::load();

    tracing::info!(
        episodes = config.episodes,
        workers = config.workers,
        seed = config.seed,
        levels = ?config.levels,
        "Tilerun rollout starting"
    );

    let levels_dir = config.levels_dir.clone();
    let summaries = match runner::run_parallel(&config, &env_config, move || {
        ChainedLevels::new()
            .with(DirLevelSource::new(levels_dir.clone()))
            .with(GeneratedLevels)
    }) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!("Rollout failed: {e}");
            std::process::exit(1);
        },
    };

    for summary in &summaries {
        match serde_json::to_string(summary) {
            Ok(line) => println!("{line}"),
            Err(e) => tracing::warn!("Failed to encode summary: {e}"),
        }
    }

    let stats = BatchStats::from_summaries(&summaries);
    tracing::info!(
        goals = stats.goals,
        hazards = stats.hazards,
        truncated = stats.truncated,
        mean_reward = stats.mean_reward,
        mean_steps = stats.mean_steps,
        "Rollout complete"
    );
}
