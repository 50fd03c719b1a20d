use std::{
    fmt::{self, Display},
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

use parking_lot::{RwLock, RwLockWriteGuard};

use super::numel;
use crate::error::{OptimErr, Result};

static NEXT_PARAM_ID: AtomicU64 = AtomicU64::new(0);

/// The stable identity of a `Parameter`.
///
/// Every handle cloned from the same `Parameter` shares its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamId(u64);

impl ParamId {
    fn next() -> Self {
        Self(NEXT_PARAM_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A trainable tensor owned by the host and mutated in place by the optimizer.
///
/// Cloning a `Parameter` yields another handle to the same storage.
#[derive(Debug, Clone)]
pub struct Parameter {
    id: ParamId,
    shape: Arc<[usize]>,
    values: Arc<RwLock<Box<[f32]>>>,
}

impl Parameter {
    /// Creates a new `Parameter`.
    ///
    /// # Arguments
    /// * `shape` - The fixed shape of the tensor.
    /// * `values` - The initial values laid out contiguously.
    ///
    /// # Returns
    /// A new `Parameter` or a `ShapeMismatch` error if the amount of values doesn't match the shape.
    pub fn new(shape: &[usize], values: Vec<f32>) -> Result<Self> {
        if numel(shape) != values.len() {
            return Err(OptimErr::ShapeMismatch {
                param: None,
                got: Box::new([values.len()]),
                expected: shape.into(),
            });
        }

        Ok(Self {
            id: ParamId::next(),
            shape: Arc::from(shape),
            values: Arc::new(RwLock::new(values.into_boxed_slice())),
        })
    }

    /// Creates a new scalar `Parameter`.
    pub fn scalar(value: f32) -> Self {
        Self {
            id: ParamId::next(),
            shape: Arc::new([]),
            values: Arc::new(RwLock::new(Box::new([value]))),
        }
    }

    pub fn id(&self) -> ParamId {
        self.id
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Returns the amount of elements of this tensor.
    pub fn len(&self) -> usize {
        numel(&self.shape)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copies the current values into a new vector.
    pub fn to_vec(&self) -> Vec<f32> {
        self.values.read().to_vec()
    }

    /// Copies the current values into the provided destination buffer.
    ///
    /// # Arguments
    /// * `out` - A mutable slice where the values will be copied.
    ///
    /// # Returns
    /// A `ShapeMismatch` error if `out` isn't the same size as this parameter.
    pub fn pull(&self, out: &mut [f32]) -> Result<()> {
        let values = self.values.read();

        if values.len() != out.len() {
            return Err(OptimErr::ShapeMismatch {
                param: Some(self.id),
                got: Box::new([out.len()]),
                expected: Box::new([values.len()]),
            });
        }

        out.copy_from_slice(&values);
        Ok(())
    }

    /// Locks the values for writing, blocking every reader until the guard is dropped.
    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Box<[f32]>> {
        self.values.write()
    }
}
