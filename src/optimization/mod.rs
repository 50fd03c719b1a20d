mod decay;
mod radam;
mod step;

pub use decay::InverseTimeDecay;
pub use radam::RAdam;
pub use step::{StepScalars, max_sma_length};
