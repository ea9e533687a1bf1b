//! Training hyperparameters

use serde::{Deserialize, Serialize};

use crate::error::{QGraphError, Result};

/// Default tolerance for the outcome probability sum of an action.
pub const DEFAULT_PROBABILITY_EPSILON: f64 = 0.1;

/// Which value of an outcome is used as the baseline `Q(s,a)` in the backup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateRule {
    /// Baseline is `q_value * probability`.
    ///
    /// Deviates from textbook Q-learning by folding the outcome probability
    /// into the learned value; kept as the default so trained tables match
    /// the established behaviour.
    #[default]
    EstimatedValue,
    /// Baseline is the raw `q_value`.
    RawQValue,
}

impl UpdateRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateRule::EstimatedValue => "estimated_value",
            UpdateRule::RawQValue => "raw_q_value",
        }
    }

    /// Baseline `Q(s,a)` for an outcome with the given value and probability.
    pub fn baseline(&self, q_value: f64, probability: f64) -> f64 {
        match self {
            UpdateRule::EstimatedValue => q_value * probability,
            UpdateRule::RawQValue => q_value,
        }
    }

    /// Q(s,a) <- Q(s,a) + alpha * (R(s,a) + gamma * max Q(s',a') - Q(s,a))
    pub fn backup(
        &self,
        baseline: f64,
        reward: f64,
        max_q_next: f64,
        alpha: f64,
        gamma: f64,
    ) -> f64 {
        baseline + alpha * (reward + gamma * max_q_next - baseline)
    }
}

/// Hyperparameters of a training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainingParams {
    /// Learning rate
    pub alpha: f64,
    /// Discount factor
    pub gamma: f64,
    /// Number of episodes per call to `run_training`
    pub episodes: u64,
    /// Step cap that stops an episode which never reaches a terminal state
    pub max_steps_per_episode: u64,
    /// Emit warnings for step-cap hits and for `max_q` lookups that find no
    /// value (unregistered name or no outcomes) on a non-terminal state
    pub warn_on_missing_max_q: bool,
    /// Allowed deviation of an action's probability sum from 1
    pub probability_epsilon: f64,
    pub update_rule: UpdateRule,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            alpha: 0.1,
            gamma: 0.9,
            episodes: 1000,
            max_steps_per_episode: 1000,
            warn_on_missing_max_q: true,
            probability_epsilon: DEFAULT_PROBABILITY_EPSILON,
            update_rule: UpdateRule::EstimatedValue,
        }
    }
}

impl TrainingParams {
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    pub fn with_gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    pub fn with_episodes(mut self, episodes: u64) -> Self {
        self.episodes = episodes;
        self
    }

    pub fn with_max_steps(mut self, max_steps: u64) -> Self {
        self.max_steps_per_episode = max_steps;
        self
    }

    pub fn with_warnings(mut self, enabled: bool) -> Self {
        self.warn_on_missing_max_q = enabled;
        self
    }

    pub fn with_update_rule(mut self, rule: UpdateRule) -> Self {
        self.update_rule = rule;
        self
    }

    /// Check ranges that would make the backup meaningless.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.alpha) {
            return Err(QGraphError::InvalidParams(format!(
                "alpha must be in [0, 1], got {}",
                self.alpha
            )));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(QGraphError::InvalidParams(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if self.probability_epsilon < 0.0 {
            return Err(QGraphError::InvalidParams(format!(
                "probability_epsilon must be non-negative, got {}",
                self.probability_epsilon
            )));
        }
        Ok(())
    }

    /// Get parameters as JSON
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "alpha": self.alpha,
            "gamma": self.gamma,
            "episodes": self.episodes,
            "max_steps_per_episode": self.max_steps_per_episode,
            "warn_on_missing_max_q": self.warn_on_missing_max_q,
            "probability_epsilon": self.probability_epsilon,
            "update_rule": self.update_rule.as_str(),
        })
    }

    /// Apply the keys present in `params`, leaving the others untouched.
    ///
    /// Nothing is changed if the resulting parameters fail validation.
    pub fn apply_json(&mut self, params: &serde_json::Value) -> Result<()> {
        let mut next = self.clone();

        if let Some(alpha) = params["alpha"].as_f64() {
            next.alpha = alpha;
        }
        if let Some(gamma) = params["gamma"].as_f64() {
            next.gamma = gamma;
        }
        if let Some(episodes) = params["episodes"].as_u64() {
            next.episodes = episodes;
        }
        if let Some(steps) = params["max_steps_per_episode"].as_u64() {
            next.max_steps_per_episode = steps;
        }
        if let Some(warn) = params["warn_on_missing_max_q"].as_bool() {
            next.warn_on_missing_max_q = warn;
        }
        if let Some(eps) = params["probability_epsilon"].as_f64() {
            next.probability_epsilon = eps;
        }
        if !params["update_rule"].is_null() {
            next.update_rule = serde_json::from_value(params["update_rule"].clone())?;
        }

        next.validate()?;
        *self = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let params = TrainingParams::default();
        assert_eq!(params.alpha, 0.1);
        assert_eq!(params.gamma, 0.9);
        assert_eq!(params.episodes, 1000);
        assert_eq!(params.max_steps_per_episode, 1000);
        assert!(params.warn_on_missing_max_q);
        assert_eq!(params.probability_epsilon, 0.1);
        assert_eq!(params.update_rule, UpdateRule::EstimatedValue);
        assert!(params.validate().is_ok());
    }

    #[test]
    fn test_backup() {
        let rule = UpdateRule::EstimatedValue;
        // 0 + 0.1 * (100 + 0.9 * 0 - 0) = 10
        let value = rule.backup(0.0, 100.0, 0.0, 0.1, 0.9);
        assert!((value - 10.0).abs() < 1e-12);

        // 10 + 0.5 * (-1 + 0.5 * 20 - 10) = 9.5
        let value = rule.backup(10.0, -1.0, 20.0, 0.5, 0.5);
        assert!((value - 9.5).abs() < 1e-12);
    }

    #[test]
    fn test_baseline() {
        assert_eq!(UpdateRule::EstimatedValue.baseline(10.0, 0.5), 5.0);
        assert_eq!(UpdateRule::RawQValue.baseline(10.0, 0.5), 10.0);
    }

    #[test]
    fn test_apply_json_partial() {
        let mut params = TrainingParams::default();
        params
            .apply_json(&serde_json::json!({"alpha": 0.5, "update_rule": "raw_q_value"}))
            .unwrap();

        assert_eq!(params.alpha, 0.5);
        assert_eq!(params.gamma, 0.9);
        assert_eq!(params.update_rule, UpdateRule::RawQValue);
    }

    #[test]
    fn test_apply_json_rejects_out_of_range() {
        let mut params = TrainingParams::default();
        let result = params.apply_json(&serde_json::json!({"gamma": 1.5, "alpha": 0.2}));

        assert!(matches!(result, Err(QGraphError::InvalidParams(_))));
        assert_eq!(params.alpha, 0.1, "params must be untouched on error");
    }

    #[test]
    fn test_to_json() {
        let json = TrainingParams::default().to_json();
        assert_eq!(json["update_rule"], "estimated_value");
        assert_eq!(json["episodes"], 1000);
    }
}
