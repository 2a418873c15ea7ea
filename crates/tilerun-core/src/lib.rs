pub mod action;
pub mod env_trait;
pub mod events;
pub mod observation;

pub use action::{Action, ControlInput, InvalidActionError};
pub use env_trait::{ActionSpace, EnvMetadata, Environment, LevelId, StepResult};
pub use events::EnvEvent;
pub use observation::{ObservationGrid, ObservationShape};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::action::Action;
    use crate::env_trait::{Environment, LevelId, StepResult};

    /// Step `n` times with the same action, stopping early on termination.
    /// Returns every step result produced.
    pub fn run_steps<E: Environment>(
        env: &mut E,
        action: Action,
        n: usize,
    ) -> Result<Vec<StepResult<E::Info>>, E::Error> {
        let mut results = Vec::with_capacity(n);
        for _ in 0..n {
            let result = env.step(action)?;
            let done = result.terminated;
            results.push(result);
            if done {
                break;
            }
        }
        Ok(results)
    }

    // ================================================================
    // Environment Trait Contract Tests
    // ================================================================
    // Generic checks every Environment implementation must pass. Env crates
    // call them from their own tests with a concrete instance and level.

    /// reset() must return an observation matching observation_shape().
    pub fn contract_reset_matches_shape<E: Environment>(env: &mut E, level: &LevelId) {
        let shape = env.observation_shape();
        let obs = env
            .reset(level)
            .unwrap_or_else(|e| panic!("reset({level}) failed: {e}"));
        assert_eq!(obs.shape, shape, "reset observation has the wrong shape");
        assert_eq!(obs.data.len(), shape.len());
    }

    /// Every step observation must keep the advertised shape and hold only
    /// 0.0 / 1.0 values.
    pub fn contract_observations_binary<E: Environment>(
        env: &mut E,
        level: &LevelId,
        ticks: usize,
    ) {
        let shape = env.observation_shape();
        env.reset(level)
            .unwrap_or_else(|e| panic!("reset({level}) failed: {e}"));
        for i in 0..ticks {
            let action = Action::ALL[i % Action::ALL.len()];
            let result = env
                .step(action)
                .unwrap_or_else(|e| panic!("step {i} failed: {e}"));
            assert_eq!(result.observation.shape, shape);
            assert!(
                result
                    .observation
                    .data
                    .iter()
                    .all(|&v| v == 0.0 || v == 1.0),
                "observation values must be 0.0 or 1.0"
            );
            if result.terminated {
                break;
            }
        }
    }

    /// Environments never set `truncated`; that belongs to the driver.
    pub fn contract_never_truncates<E: Environment>(env: &mut E, level: &LevelId, ticks: usize) {
        env.reset(level)
            .unwrap_or_else(|e| panic!("reset({level}) failed: {e}"));
        for _ in 0..ticks {
            let result = env
                .step(Action::Noop)
                .unwrap_or_else(|e| panic!("step failed: {e}"));
            assert!(!result.truncated, "environment must not truncate");
            if result.terminated {
                break;
            }
        }
    }

    /// Two resets on the same level followed by the same action sequence
    /// must produce identical rewards and observations.
    pub fn contract_deterministic_replay<E: Environment>(
        env: &mut E,
        level: &LevelId,
        actions: &[Action],
    ) {
        let mut runs = Vec::with_capacity(2);
        for _ in 0..2 {
            env.reset(level)
                .unwrap_or_else(|e| panic!("reset({level}) failed: {e}"));
            let mut trace = Vec::with_capacity(actions.len());
            for &action in actions {
                let result = env
                    .step(action)
                    .unwrap_or_else(|e| panic!("step failed: {e}"));
                trace.push((result.reward.to_bits(), result.observation.data.clone()));
                if result.terminated {
                    break;
                }
            }
            runs.push(trace);
        }
        assert_eq!(runs[0], runs[1], "same level and actions must replay identically");
    }
}
