use serde::Deserialize;

use tilerun_platformer::config::ConfigError;

/// Rollout driver configuration, loaded from `config/rollout.toml`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RolloutConfig {
    pub episodes: usize,
    /// Step budget per episode; episodes that run out are truncated.
    pub max_steps: u64,
    pub workers: usize,
    pub seed: u64,
    /// Level ids to sample from. `gen-<seed>` ids are generated on demand.
    pub levels: Vec<String>,
    pub levels_dir: String,
}

impl Default for RolloutConfig {
    fn default() -> Self {
        Self {
            episodes: 32,
            max_steps: 2000,
            workers: 4,
            seed: 0,
            levels: vec![
                "0".to_string(),
                "1".to_string(),
                "gen-1".to_string(),
                "gen-2".to_string(),
            ],
            levels_dir: "levels".to_string(),
        }
    }
}

impl RolloutConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::Invalid("workers must be > 0".to_string()));
        }
        if self.max_steps == 0 {
            return Err(ConfigError::Invalid("max_steps must be > 0".to_string()));
        }
        if self.levels.is_empty() {
            return Err(ConfigError::Invalid(
                "levels must name at least one level".to_string(),
            ));
        }
        Ok(())
    }

    /// Load from `$TILERUN_ROLLOUT_CONFIG` (default `config/rollout.toml`),
    /// then apply env var overrides.
    pub fn load() -> Self {
        let path = std::env::var("TILERUN_ROLLOUT_CONFIG")
            .unwrap_or_else(|_| "config/rollout.toml".to_string());
        let mut config = match std::fs::read_to_string(&path) {
            Ok(content) => match toml::from_str::<RolloutConfig>(&content) {
                Ok(cfg) => {
                    tracing::info!("Loaded rollout configuration from {path}");
                    cfg
                },
                Err(e) => {
                    tracing::warn!("Failed to parse {path}: {e}, using defaults");
                    RolloutConfig::default()
                },
            },
            Err(_) => {
                tracing::info!("No {path} found, using defaults");
                RolloutConfig::default()
            },
        };

        if let Ok(val) = std::env::var("TILERUN_EPISODES")
            && let Ok(n) = val.parse::<usize>()
        {
            config.episodes = n;
        }
        if let Ok(val) = std::env::var("TILERUN_WORKERS")
            && let Ok(n) = val.parse::<usize>()
        {
            config.workers = n;
        }
        if let Ok(val) = std::env::var("TILERUN_SEED")
            && let Ok(n) = val.parse::<u64>()
        {
            config.seed = n;
        }
        if let Ok(dir) = std::env::var("TILERUN_LEVELS_DIR")
            && !dir.is_empty()
        {
            config.levels_dir = dir;
        }

        config
    }
}
