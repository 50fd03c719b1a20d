use super::numel;
use crate::error::{OptimErr, Result};

/// The gradient of the loss with respect to one `Parameter`, supplied fresh on every step.
#[derive(Debug, Clone, PartialEq)]
pub struct Gradient {
    shape: Box<[usize]>,
    values: Box<[f32]>,
}

impl Gradient {
    /// Creates a new `Gradient`.
    ///
    /// # Arguments
    /// * `shape` - The shape of the parameter this gradient belongs to.
    /// * `values` - The gradient values laid out contiguously.
    ///
    /// # Returns
    /// A new `Gradient` or a `ShapeMismatch` error if the amount of values doesn't match the shape.
    pub fn new(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        if numel(shape) != values.len() {
            return Err(OptimErr::ShapeMismatch {
                param: None,
                got: Box::new([values.len()]),
                expected: shape.into(),
            });
        }

        Ok(Self {
            shape: shape.into(),
            values: values.into_boxed_slice(),
        })
    }

    /// Creates the gradient of a scalar parameter.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: Box::new([]),
            values: Box::new([value]),
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }
}
