use serde::{Deserialize, Serialize};

use crate::error::{OptimErr, Result};

pub const DEFAULT_BETA1: f32 = 0.9;
pub const DEFAULT_BETA2: f32 = 0.99;
pub const DEFAULT_DECAY: f32 = 0.;
pub const DEFAULT_EPSILON: f32 = 1e-7;

/// The specification for the `RAdam` optimizer.
///
/// Only `learning_rate` is required when deserializing, every other field takes its default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct RAdamSpec {
    pub learning_rate: f32,
    #[serde(default = "default_beta1")]
    pub beta1: f32,
    #[serde(default = "default_beta2")]
    pub beta2: f32,
    #[serde(default)]
    pub decay: f32,
    #[serde(default = "default_epsilon")]
    pub epsilon: f32,
}

fn default_beta1() -> f32 {
    DEFAULT_BETA1
}

fn default_beta2() -> f32 {
    DEFAULT_BETA2
}

fn default_epsilon() -> f32 {
    DEFAULT_EPSILON
}

impl RAdamSpec {
    /// Creates a new `RAdamSpec` with the default hyperparameters.
    ///
    /// # Arguments
    /// * `learning_rate` - The initial step size.
    pub fn new(learning_rate: f32) -> Self {
        Self {
            learning_rate,
            beta1: DEFAULT_BETA1,
            beta2: DEFAULT_BETA2,
            decay: DEFAULT_DECAY,
            epsilon: DEFAULT_EPSILON,
        }
    }

    pub fn with_beta1(mut self, beta1: f32) -> Self {
        self.beta1 = beta1;
        self
    }

    pub fn with_beta2(mut self, beta2: f32) -> Self {
        self.beta2 = beta2;
        self
    }

    pub fn with_decay(mut self, decay: f32) -> Self {
        self.decay = decay;
        self
    }

    pub fn with_epsilon(mut self, epsilon: f32) -> Self {
        self.epsilon = epsilon;
        self
    }

    /// Checks every hyperparameter is inside its domain.
    ///
    /// # Returns
    /// An `InvalidHyperparameter` error naming the first offending field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |name, value| Err(OptimErr::InvalidHyperparameter { name, value });

        if !self.learning_rate.is_finite() {
            return invalid("learning_rate", self.learning_rate);
        }

        if !(self.beta1 > 0. && self.beta1 < 1.) {
            return invalid("beta1", self.beta1);
        }

        if !(self.beta2 > 0. && self.beta2 < 1.) {
            return invalid("beta2", self.beta2);
        }

        if !(self.decay >= 0. && self.decay.is_finite()) {
            return invalid("decay", self.decay);
        }

        if !(self.epsilon > 0. && self.epsilon.is_finite()) {
            return invalid("epsilon", self.epsilon);
        }

        Ok(())
    }
}
