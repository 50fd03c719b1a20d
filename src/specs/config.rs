use std::collections::BTreeMap;

use super::RAdamSpec;
use crate::error::{OptimErr, Result};

/// A flat hyperparameter snapshot, merged by the host into its own checkpoint format.
pub type ConfigMap = BTreeMap<String, f32>;

pub const LEARNING_RATE_KEY: &str = "learning_rate";
pub const BETA1_KEY: &str = "beta1";
pub const BETA2_KEY: &str = "beta2";

/// Merges an optimizer's own snapshot on top of the host's base configuration.
///
/// # Arguments
/// * `base` - The host's base optimizer configuration.
/// * `own` - The optimizer's snapshot, its keys take precedence.
///
/// # Returns
/// The merged configuration.
pub fn merge_configs(base: &ConfigMap, own: ConfigMap) -> ConfigMap {
    let mut merged = base.clone();
    merged.extend(own);
    merged
}

impl RAdamSpec {
    /// Takes the configuration snapshot of this spec.
    ///
    /// `decay` and `epsilon` are left out of the snapshot.
    pub fn to_config(&self) -> ConfigMap {
        ConfigMap::from([
            (LEARNING_RATE_KEY.to_string(), self.learning_rate),
            (BETA1_KEY.to_string(), self.beta1),
            (BETA2_KEY.to_string(), self.beta2),
        ])
    }

    /// Rebuilds a spec from a configuration snapshot.
    ///
    /// Keys other than the snapshot's are ignored, missing betas take their defaults and
    /// `decay` and `epsilon` always take theirs.
    ///
    /// # Arguments
    /// * `config` - A snapshot, possibly merged with a base configuration.
    ///
    /// # Returns
    /// A new validated spec, `MissingConfigKey` if there's no learning rate or
    /// `InvalidHyperparameter` if a value is out of its domain.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        let learning_rate = *config
            .get(LEARNING_RATE_KEY)
            .ok_or(OptimErr::MissingConfigKey(LEARNING_RATE_KEY))?;

        let mut spec = Self::new(learning_rate);

        if let Some(&beta1) = config.get(BETA1_KEY) {
            spec.beta1 = beta1;
        }

        if let Some(&beta2) = config.get(BETA2_KEY) {
            spec.beta2 = beta2;
        }

        spec.validate()?;
        Ok(spec)
    }
}
