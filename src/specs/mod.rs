mod config;
mod radam;

pub use config::{BETA1_KEY, BETA2_KEY, ConfigMap, LEARNING_RATE_KEY, merge_configs};
pub use radam::{DEFAULT_BETA1, DEFAULT_BETA2, DEFAULT_DECAY, DEFAULT_EPSILON, RAdamSpec};
