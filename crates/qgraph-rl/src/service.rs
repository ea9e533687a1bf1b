//! Learning service - shares one engine between async tasks
//!
//! Training holds the write lock for a whole run and executes on the blocking
//! pool. Structural changes also take the write lock, while policy queries
//! share the read lock and can run alongside each other.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tokio::sync::RwLock;
use tracing::{info, warn};

use qgraph_core::{QGraphError, Result};

use crate::engine::{CancelFlag, LearningEngine, TrainingReport};
use crate::policy::PolicyEntry;
use crate::state::{Action, State};

/// Async wrapper around a [`LearningEngine`]
pub struct LearningService {
    engine: Arc<RwLock<LearningEngine>>,
    cancel: CancelFlag,
    seed: Option<u64>,
    runs: AtomicU64,
}

impl LearningService {
    pub fn new(engine: LearningEngine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
            cancel: CancelFlag::new(),
            seed: None,
            runs: AtomicU64::new(0),
        }
    }

    /// Make training reproducible. Run `n` uses `seed + n`.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub async fn add_state(&self, state: State) -> Result<()> {
        self.engine.write().await.add_state(state)
    }

    pub async fn add_action(&self, state: &str, action: Action) -> Result<()> {
        self.engine.write().await.add_action(state, action)
    }

    pub async fn add_terminal_state(&self, name: impl Into<String>) {
        self.engine.write().await.add_terminal_state(name);
    }

    /// Run a full training pass on the blocking pool.
    pub async fn train(&self) -> Result<TrainingReport> {
        let run = self.runs.fetch_add(1, Ordering::SeqCst);
        let seed = match self.seed {
            Some(seed) => seed.wrapping_add(run),
            None => rand::thread_rng().gen(),
        };

        self.cancel.reset();
        let engine = Arc::clone(&self.engine);
        let cancel = self.cancel.clone();

        info!(run, seed, "Scheduling training run");

        let report = tokio::task::spawn_blocking(move || {
            let mut engine = engine.blocking_write();
            let mut rng = StdRng::seed_from_u64(seed);
            engine.run_training_with_cancel(&mut rng, &cancel)
        })
        .await
        .map_err(|e| QGraphError::Internal(format!("training task failed: {e}")))??;

        if report.cancelled {
            warn!(
                episodes = report.episodes,
                "Training run stopped before completing all episodes"
            );
        }

        Ok(report)
    }

    /// Ask the current run to stop at the next episode boundary.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub async fn policy(&self) -> Vec<PolicyEntry> {
        self.engine.read().await.extract_policy()
    }

    pub async fn policy_for(&self, state: &str) -> Result<PolicyEntry> {
        self.engine.read().await.policy_for(state)
    }

    pub async fn value_of(
        &self,
        state: &str,
        action_index: usize,
        outcome_index: usize,
    ) -> Option<f64> {
        self.engine
            .read()
            .await
            .value_of(state, action_index, outcome_index)
    }

    /// Run a read-only closure against the engine
    pub async fn read<T>(&self, f: impl FnOnce(&LearningEngine) -> T) -> T {
        let engine = self.engine.read().await;
        f(&engine)
    }

    /// Number of training runs started so far
    pub fn runs(&self) -> u64 {
        self.runs.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::ActionOutcome;
    use qgraph_core::TrainingParams;

    async fn chain_service() -> LearningService {
        let service = LearningService::new(LearningEngine::new()).with_seed(17);
        service
            .add_state(State::new("A").with_action(
                Action::from_to("A", "B").with_outcome(ActionOutcome::certain("B", 100.0)),
            ))
            .await
            .unwrap();
        service.add_state(State::new("B")).await.unwrap();
        service.add_terminal_state("B").await;
        service
    }

    #[tokio::test]
    async fn test_service_train_and_query() {
        let service = chain_service().await;

        let report = service.train().await.unwrap();
        assert_eq!(report.episodes, 1000);
        assert!(!report.cancelled);
        assert_eq!(service.runs(), 1);

        let entry = service.policy_for("A").await.unwrap();
        assert!(entry.estimated_value().unwrap() > 50.0);
        assert_eq!(service.policy().await.len(), 2);
    }

    #[tokio::test]
    async fn test_service_duplicate_state() {
        let service = chain_service().await;
        assert!(service.add_state(State::new("A")).await.is_err());
        assert_eq!(service.read(LearningEngine::len).await, 2);
    }

    #[tokio::test]
    async fn test_service_unknown_state_query() {
        let service = chain_service().await;
        assert!(matches!(
            service.policy_for("Z").await,
            Err(QGraphError::UnknownState(_))
        ));
        assert_eq!(service.value_of("Z", 0, 0).await, None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_cancel_mid_run_keeps_finished_episodes() {
        const EPISODES: u64 = 10_000_000;

        // A <-> B never reaches a terminal state, so every episode runs to the step cap
        let mut engine = LearningEngine::with_params(
            TrainingParams::default()
                .with_episodes(EPISODES)
                .with_max_steps(100)
                .with_warnings(false),
        );
        engine
            .add_state(State::new("A").with_action(
                Action::from_to("A", "B").with_outcome(ActionOutcome::certain("B", 1.0)),
            ))
            .unwrap();
        engine
            .add_state(State::new("B").with_action(
                Action::from_to("B", "A").with_outcome(ActionOutcome::certain("A", 1.0)),
            ))
            .unwrap();

        let service = Arc::new(LearningService::new(engine).with_seed(3));
        let training = {
            let service = Arc::clone(&service);
            tokio::spawn(async move { service.train().await })
        };

        // The run resets the flag when it starts, so keep asking until it stops
        while !training.is_finished() {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            service.cancel();
        }
        let report = training.await.unwrap().unwrap();

        assert!(report.cancelled);
        assert!(report.episodes > 0);
        assert!(report.episodes < EPISODES);
        assert_eq!(report.step_cap_hits, report.episodes);

        // Updates of the finished episodes stay in the table
        assert!(service.value_of("A", 0, 0).await.unwrap() > 0.0);
        assert!(service.value_of("B", 0, 0).await.unwrap() > 0.0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_policy_reads() {
        let service = Arc::new(chain_service().await);
        service.train().await.unwrap();

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.policy().await })
            })
            .collect();

        let mut policies = Vec::new();
        for handle in handles {
            policies.push(handle.await.unwrap());
        }

        assert!(policies.windows(2).all(|pair| pair[0] == pair[1]));
    }
}
