use crate::error::{OptimErr, Result};

/// The SMA length under which the variance estimate is considered unreliable.
const RECTIFICATION_THRESHOLD: f32 = 5.;

/// Returns the asymptotic maximum length of the approximated simple moving average.
///
/// Computed as `2 / (1 - beta2)`, without the `- 1` some derivations subtract, every threshold
/// and rectification factor downstream depends on this exact value.
pub fn max_sma_length(beta2: f32) -> f32 {
    2. / (1. - beta2)
}

/// The scalars shared by every parameter during a single step.
///
/// They are computed once before any parameter is touched and only read afterwards.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StepScalars {
    step: u64,
    first_correction: f32,
    second_correction: f32,
    sma_length: f32,
    rectification: Option<f32>,
    epsilon: f32,
}

impl StepScalars {
    /// Computes the scalars of a step.
    ///
    /// # Arguments
    /// * `step` - The step being applied, starting at `1`.
    /// * `beta1_t`, `beta2_t` - `beta1` and `beta2` raised to `step`.
    /// * `max_sma_length` - The asymptotic SMA length for the configured `beta2`.
    /// * `epsilon` - The numerical floor.
    ///
    /// # Returns
    /// The step scalars or a `NumericInstability` error if a bias correction denominator
    /// vanished or the SMA length isn't finite.
    pub(crate) fn compute(
        step: u64,
        beta1_t: f32,
        beta2_t: f32,
        max_sma_length: f32,
        epsilon: f32,
    ) -> Result<Self> {
        let first_correction = 1. - beta1_t;
        let second_correction = 1. - beta2_t;

        let positive = |x: f32| x > 0. && x.is_finite();
        if !positive(first_correction) || !positive(second_correction) {
            return Err(OptimErr::NumericInstability { step });
        }

        let t = step as f32;
        let sma_length = max_sma_length - 2. * t * beta2_t / second_correction;
        if !sma_length.is_finite() {
            return Err(OptimErr::NumericInstability { step });
        }

        Ok(Self {
            step,
            first_correction,
            second_correction,
            sma_length,
            rectification: rectification(sma_length, max_sma_length, epsilon),
            epsilon,
        })
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    /// The current SMA length estimate, `rho_t`.
    pub fn sma_length(&self) -> f32 {
        self.sma_length
    }

    /// The variance rectification factor, present only when the SMA length exceeds the threshold.
    pub fn rectification(&self) -> Option<f32> {
        self.rectification
    }

    pub fn is_rectified(&self) -> bool {
        self.rectification.is_some()
    }

    /// The bias-corrected first moment.
    pub fn first_moment_estimate(&self, m: f32) -> f32 {
        m / self.first_correction
    }

    /// Computes the update direction of a single element.
    ///
    /// # Arguments
    /// * `m` - The element's updated first moment.
    /// * `v` - The element's updated second moment.
    ///
    /// # Returns
    /// The rectified adaptive direction, or the bias-corrected momentum while unrectified.
    pub fn delta(&self, m: f32, v: f32) -> f32 {
        let m_hat = self.first_moment_estimate(m);

        match self.rectification {
            Some(rect) => {
                let v_hat = v / self.second_correction;
                rect * m_hat / (v_hat + self.epsilon).sqrt()
            }
            None => m_hat,
        }
    }
}

fn rectification(sma_length: f32, max_sma_length: f32, epsilon: f32) -> Option<f32> {
    if !(sma_length > RECTIFICATION_THRESHOLD) {
        return None;
    }

    let num = max_sma_length * (sma_length - 4.) * (sma_length - 2.);
    let den = sma_length * (max_sma_length - 4.) * (max_sma_length - 2.) + epsilon;
    Some((num / den).sqrt())
}
