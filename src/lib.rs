pub mod error;
pub mod optimization;
pub mod parameters;
pub mod specs;

pub use error::{OptimErr, Result};
pub use optimization::{InverseTimeDecay, RAdam, StepScalars};
pub use parameters::{Gradient, Moments, ParamId, Parameter};
pub use specs::{ConfigMap, RAdamSpec};
