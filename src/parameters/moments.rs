/// The first and second moment estimates of a single parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Moments {
    pub(crate) first: Box<[f32]>,
    pub(crate) second: Box<[f32]>,
}

impl Moments {
    /// Creates a new zeroed `Moments` pair.
    ///
    /// # Arguments
    /// * `len` - The amount of elements of the parameter these moments belong to.
    pub fn zeros(len: usize) -> Self {
        Self {
            first: vec![0.; len].into_boxed_slice(),
            second: vec![0.; len].into_boxed_slice(),
        }
    }

    /// The exponential moving average of the gradients.
    pub fn first(&self) -> &[f32] {
        &self.first
    }

    /// The exponential moving average of the squared gradients.
    pub fn second(&self) -> &[f32] {
        &self.second
    }
}
