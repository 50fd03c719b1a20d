/// Inverse-time learning rate decay applied to the live learning rate after every step,
/// `lr <- lr / (1 + decay * t)`.
///
/// The factors compound, so after `t` steps the rate is `lr_0 / Π_{k<=t} (1 + decay * k)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InverseTimeDecay {
    decay: f32,
}

impl InverseTimeDecay {
    /// Creates a new `InverseTimeDecay`.
    ///
    /// # Arguments
    /// * `decay` - The decay coefficient, `0` keeps the learning rate constant.
    pub fn new(decay: f32) -> Self {
        Self { decay }
    }

    pub fn is_constant(&self) -> bool {
        self.decay == 0.
    }

    /// Decays the learning rate once step `step` was applied.
    ///
    /// # Arguments
    /// * `learning_rate` - The learning rate used by step `step`.
    /// * `step` - The 1-based index of the step that was just applied.
    ///
    /// # Returns
    /// The learning rate for the next step.
    pub fn apply(&self, learning_rate: f32, step: u64) -> f32 {
        learning_rate / (1. + self.decay * step as f32)
    }
}
