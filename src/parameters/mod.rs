mod gradient;
mod moments;
mod parameter;

pub use gradient::Gradient;
pub use moments::Moments;
pub use parameter::{ParamId, Parameter};

/// Returns the amount of elements a tensor of the given shape holds.
///
/// The empty shape denotes a scalar, so it holds a single element.
pub(crate) fn numel(shape: &[usize]) -> usize {
    shape.iter().product()
}
