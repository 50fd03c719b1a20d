use std::{
    error::Error,
    fmt::{self, Display},
};

use crate::parameters::ParamId;

/// The result type used across the whole crate.
pub type Result<T> = std::result::Result<T, OptimErr>;

/// The optimizer's error type.
///
/// None of these are retried internally, a failing call leaves the optimizer's state untouched.
#[derive(Debug, Clone, PartialEq)]
pub enum OptimErr {
    InvalidHyperparameter {
        name: &'static str,
        value: f32,
    },
    UnboundParameter,
    ShapeMismatch {
        param: Option<ParamId>,
        got: Box<[usize]>,
        expected: Box<[usize]>,
    },
    GradientCountMismatch {
        got: usize,
        expected: usize,
    },
    NumericInstability {
        step: u64,
    },
    AlreadyBound,
    DuplicateParameter(ParamId),
    MissingConfigKey(&'static str),
}

impl Display for OptimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptimErr::InvalidHyperparameter { name, value } => {
                write!(f, "invalid hyperparameter {name}: {value}")
            }
            OptimErr::UnboundParameter => {
                f.write_str("the optimizer is not bound to the given parameters, call bind first")
            }
            OptimErr::ShapeMismatch {
                param: Some(id),
                got,
                expected,
            } => write!(
                f,
                "shape mismatch for parameter {id}: got {got:?}, expected {expected:?}"
            ),
            OptimErr::ShapeMismatch {
                param: None,
                got,
                expected,
            } => write!(f, "shape mismatch: got {got:?}, expected {expected:?}"),
            OptimErr::GradientCountMismatch { got, expected } => write!(
                f,
                "there's a mismatch in the amount of gradients, got {got} and expected {expected}"
            ),
            OptimErr::NumericInstability { step } => write!(
                f,
                "bias correction denominator vanished at step {step}, the configuration is numerically unstable"
            ),
            OptimErr::AlreadyBound => f.write_str("the optimizer is already bound to a parameter set"),
            OptimErr::DuplicateParameter(id) => {
                write!(f, "parameter {id} was given more than once when binding")
            }
            OptimErr::MissingConfigKey(key) => write!(f, "missing configuration key {key}"),
        }
    }
}

impl Error for OptimErr {}
