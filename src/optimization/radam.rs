use std::collections::{HashMap, hash_map::Entry};

use log::{debug, info, trace, warn};
use rayon::prelude::*;

use super::{InverseTimeDecay, StepScalars, max_sma_length};
use crate::{
    error::{OptimErr, Result},
    parameters::{Gradient, Moments, ParamId, Parameter},
    specs::{ConfigMap, RAdamSpec, merge_configs},
};

/// The parameter set an optimizer is bound to, along with the moments of each parameter.
#[derive(Debug)]
struct Binding {
    params: Vec<Parameter>,
    moments: Vec<Moments>,
    index: HashMap<ParamId, usize>,
}

impl Binding {
    fn new(params: &[Parameter]) -> Result<Self> {
        let mut index = HashMap::with_capacity(params.len());

        for (i, param) in params.iter().enumerate() {
            match index.entry(param.id()) {
                Entry::Occupied(_) => return Err(OptimErr::DuplicateParameter(param.id())),
                Entry::Vacant(entry) => entry.insert(i),
            };
        }

        Ok(Self {
            params: params.to_vec(),
            moments: params.iter().map(|p| Moments::zeros(p.len())).collect(),
            index,
        })
    }

    /// Checks every gradient matches its parameter positionally.
    fn check(&self, grads: &[Gradient]) -> Result<()> {
        if grads.len() != self.params.len() {
            return Err(OptimErr::GradientCountMismatch {
                got: grads.len(),
                expected: self.params.len(),
            });
        }

        for (param, grad) in self.params.iter().zip(grads) {
            if param.shape() != grad.shape() {
                return Err(OptimErr::ShapeMismatch {
                    param: Some(param.id()),
                    got: grad.shape().into(),
                    expected: param.shape().into(),
                });
            }
        }

        Ok(())
    }
}

/// The rectified adaptive moment estimation optimizer.
///
/// Owns the moments of the parameters it's bound to and a global step counter, every call to
/// `step` either applies fully or leaves the optimizer and the parameters untouched.
#[derive(Debug)]
pub struct RAdam {
    spec: RAdamSpec,
    max_sma_length: f32,
    schedule: InverseTimeDecay,
    learning_rate: f32,
    iterations: u64,
    beta1_t: f32,
    beta2_t: f32,
    last_step: Option<StepScalars>,
    binding: Option<Binding>,
}

impl RAdam {
    /// Creates a new `RAdam` optimizer.
    ///
    /// # Arguments
    /// * `spec` - The hyperparameters of the optimizer.
    ///
    /// # Returns
    /// A new unbound `RAdam` instance or an `InvalidHyperparameter` error.
    pub fn new(spec: RAdamSpec) -> Result<Self> {
        spec.validate()?;

        Ok(Self {
            spec,
            max_sma_length: max_sma_length(spec.beta2),
            schedule: InverseTimeDecay::new(spec.decay),
            learning_rate: spec.learning_rate,
            iterations: 0,
            beta1_t: 1.,
            beta2_t: 1.,
            last_step: None,
            binding: None,
        })
    }

    /// Rebuilds an optimizer from a configuration snapshot taken with `get_config`.
    ///
    /// # Arguments
    /// * `config` - The snapshot, possibly merged with the host's base configuration.
    pub fn from_config(config: &ConfigMap) -> Result<Self> {
        Self::new(RAdamSpec::from_config(config)?)
    }

    /// Binds the optimizer to the parameters it'll update, allocating zeroed moments for each.
    ///
    /// # Arguments
    /// * `params` - The parameters, gradients given to `step` are matched to them by position.
    ///
    /// # Returns
    /// `AlreadyBound` if called twice or `DuplicateParameter` if a parameter is given more than once.
    pub fn bind(&mut self, params: &[Parameter]) -> Result<()> {
        if self.binding.is_some() {
            return Err(OptimErr::AlreadyBound);
        }

        let binding = Binding::new(params)?;
        let elements: usize = params.iter().map(Parameter::len).sum();
        info!(params = params.len(), elements = elements; "bound optimizer");

        self.binding = Some(binding);
        Ok(())
    }

    /// Applies a single update step.
    ///
    /// Every validation runs before anything is mutated. The parameters are then write-locked
    /// in bind order and updated in parallel, and the counter and learning rate are committed
    /// once every parameter was updated.
    ///
    /// # Arguments
    /// * `grads` - One gradient per bound parameter, in bind order.
    ///
    /// # Returns
    /// `UnboundParameter`, `GradientCountMismatch`, `ShapeMismatch` or `NumericInstability`
    /// if the step was rejected, in which case nothing was modified. `NumericInstability` is
    /// defensive only: betas validated to `(0, 1)` can't drive `1 - beta^t` to zero, so callers
    /// don't need to handle it.
    pub fn step(&mut self, grads: &[Gradient]) -> Result<()> {
        let res = self.try_step(grads);

        if let Err(e) = &res {
            warn!(step = self.iterations + 1; "rejected step: {e}");
        }

        res
    }

    fn try_step(&mut self, grads: &[Gradient]) -> Result<()> {
        let binding = self.binding.as_mut().ok_or(OptimErr::UnboundParameter)?;
        binding.check(grads)?;

        let RAdamSpec {
            beta1: b1,
            beta2: b2,
            epsilon: eps,
            ..
        } = self.spec;

        let step = self.iterations + 1;
        let beta1_t = self.beta1_t * b1;
        let beta2_t = self.beta2_t * b2;
        let scalars = StepScalars::compute(step, beta1_t, beta2_t, self.max_sma_length, eps)?;
        let lr = self.learning_rate;

        debug!(
            step = step,
            rho = scalars.sma_length(),
            rectified = scalars.is_rectified();
            "applying step"
        );

        let Binding {
            params, moments, ..
        } = binding;

        let mut guards: Vec<_> = params.iter().map(Parameter::write).collect();
        let values: Vec<&mut [f32]> = guards.iter_mut().map(|guard| &mut ***guard).collect();

        values
            .into_par_iter()
            .zip(moments.par_iter_mut())
            .zip(grads.par_iter())
            .for_each(|((values, moments), grad)| {
                values
                    .iter_mut()
                    .zip(grad.values())
                    .zip(moments.first.iter_mut())
                    .zip(moments.second.iter_mut())
                    .for_each(|(((p, g), m), v)| {
                        *m = b1 * *m + (1. - b1) * g;
                        *v = b2 * *v + (1. - b2) * g.powi(2);
                        *p -= lr * scalars.delta(*m, *v);
                    });
            });

        drop(guards);

        self.iterations = step;
        self.beta1_t = beta1_t;
        self.beta2_t = beta2_t;
        self.last_step = Some(scalars);

        if !self.schedule.is_constant() {
            self.learning_rate = self.schedule.apply(self.learning_rate, step);
            trace!(step = step, learning_rate = self.learning_rate; "decayed learning rate");
        }

        Ok(())
    }

    /// Takes the configuration snapshot of this optimizer: the current learning rate and both betas.
    pub fn get_config(&self) -> ConfigMap {
        let spec = RAdamSpec {
            learning_rate: self.learning_rate,
            ..self.spec
        };

        spec.to_config()
    }

    /// Merges this optimizer's snapshot on top of the host's base optimizer configuration.
    pub fn merged_config(&self, base: &ConfigMap) -> ConfigMap {
        merge_configs(base, self.get_config())
    }

    /// Returns the moments of a bound parameter.
    ///
    /// # Returns
    /// `UnboundParameter` if the parameter isn't bound to this optimizer.
    pub fn moments(&self, id: ParamId) -> Result<&Moments> {
        let binding = self.binding.as_ref().ok_or(OptimErr::UnboundParameter)?;
        let &i = binding.index.get(&id).ok_or(OptimErr::UnboundParameter)?;
        Ok(&binding.moments[i])
    }

    /// The amount of steps applied so far.
    pub fn iterations(&self) -> u64 {
        self.iterations
    }

    pub fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    /// The hyperparameters this optimizer was built with.
    pub fn spec(&self) -> &RAdamSpec {
        &self.spec
    }

    pub fn max_sma_length(&self) -> f32 {
        self.max_sma_length
    }

    /// The scalars of the last applied step, if any.
    pub fn last_step(&self) -> Option<&StepScalars> {
        self.last_step.as_ref()
    }

    pub fn is_bound(&self) -> bool {
        self.binding.is_some()
    }

    /// The amount of bound parameters.
    pub fn len(&self) -> usize {
        self.binding.as_ref().map_or(0, |binding| binding.params.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound(spec: RAdamSpec, params: &[Parameter]) -> RAdam {
        let mut radam = RAdam::new(spec).unwrap();
        radam.bind(params).unwrap();
        radam
    }

    #[test]
    fn test_new_rejects_invalid_betas() {
        let err = RAdam::new(RAdamSpec::new(0.1).with_beta1(1.)).unwrap_err();
        assert!(matches!(
            err,
            OptimErr::InvalidHyperparameter { name: "beta1", .. }
        ));
    }

    #[test]
    fn test_step_before_bind_fails() {
        let mut radam = RAdam::new(RAdamSpec::new(0.1)).unwrap();
        let err = radam.step(&[Gradient::scalar(1.)]).unwrap_err();

        assert_eq!(err, OptimErr::UnboundParameter);
        assert_eq!(radam.iterations(), 0);
    }

    #[test]
    fn test_bind_twice_fails() {
        let param = Parameter::scalar(0.);
        let mut radam = bound(RAdamSpec::new(0.1), &[param.clone()]);
        assert_eq!(radam.bind(&[param]).unwrap_err(), OptimErr::AlreadyBound);
    }

    #[test]
    fn test_bind_rejects_duplicates() {
        let param = Parameter::scalar(0.);
        let mut radam = RAdam::new(RAdamSpec::new(0.1)).unwrap();

        let err = radam.bind(&[param.clone(), param.clone()]).unwrap_err();
        assert_eq!(err, OptimErr::DuplicateParameter(param.id()));
        assert!(!radam.is_bound());
    }

    #[test]
    fn test_bind_allocates_zeroed_moments() {
        let a = Parameter::new(&[2, 2], vec![1.; 4]).unwrap();
        let b = Parameter::scalar(3.);
        let radam = bound(RAdamSpec::new(0.1), &[a.clone(), b.clone()]);

        assert_eq!(radam.len(), 2);
        assert_eq!(radam.moments(a.id()).unwrap().first(), [0.; 4]);
        assert_eq!(radam.moments(a.id()).unwrap().second(), [0.; 4]);
        assert_eq!(radam.moments(b.id()).unwrap().first(), [0.]);

        let stranger = Parameter::scalar(0.);
        assert_eq!(
            radam.moments(stranger.id()).unwrap_err(),
            OptimErr::UnboundParameter
        );
    }

    #[test]
    fn test_gradient_count_mismatch() {
        let mut radam = bound(RAdamSpec::new(0.1), &[Parameter::scalar(0.)]);
        let err = radam.step(&[]).unwrap_err();
        assert_eq!(
            err,
            OptimErr::GradientCountMismatch {
                got: 0,
                expected: 1
            }
        );
    }

    #[test]
    fn test_shape_mismatch_leaves_state_untouched() {
        let a = Parameter::new(&[2], vec![1., 2.]).unwrap();
        let b = Parameter::new(&[3], vec![1., 2., 3.]).unwrap();
        let mut radam = bound(RAdamSpec::new(0.1).with_decay(0.5), &[a.clone(), b.clone()]);

        let grads = [
            Gradient::new(&[2], vec![1., 1.]).unwrap(),
            Gradient::new(&[1, 3], vec![1., 1., 1.]).unwrap(),
        ];

        let err = radam.step(&grads).unwrap_err();
        assert!(matches!(err, OptimErr::ShapeMismatch { param: Some(id), .. } if id == b.id()));

        assert_eq!(a.to_vec(), [1., 2.]);
        assert_eq!(b.to_vec(), [1., 2., 3.]);
        assert_eq!(radam.moments(a.id()).unwrap().first(), [0.; 2]);
        assert_eq!(radam.iterations(), 0);
        assert_eq!(radam.learning_rate(), 0.1);
        assert!(radam.last_step().is_none());
    }

    #[test]
    fn test_first_step_moves_against_gradient() {
        let param = Parameter::new(&[3], vec![0.; 3]).unwrap();
        let mut radam = bound(RAdamSpec::new(0.1), &[param.clone()]);

        radam
            .step(&[Gradient::new(&[3], vec![1., -2., 0.]).unwrap()])
            .unwrap();

        let values = param.to_vec();
        assert!(values[0] < 0.);
        assert!(values[1] > 0.);
        assert_eq!(values[2], 0.);
        assert_eq!(radam.iterations(), 1);
    }

    #[test]
    fn test_second_moment_is_never_negative() {
        let param = Parameter::new(&[4], vec![0.; 4]).unwrap();
        let mut radam = bound(RAdamSpec::new(0.01), &[param.clone()]);

        for i in 0..20 {
            let sign = if i % 2 == 0 { 1. } else { -1. };
            let grad = Gradient::new(&[4], vec![sign * 3., -sign, 0., sign * 1e-3]).unwrap();
            radam.step(&[grad]).unwrap();

            let moments = radam.moments(param.id()).unwrap();
            assert!(moments.second().iter().all(|&v| v >= 0.));
        }
    }

    #[test]
    fn test_extreme_valid_betas_never_report_numeric_instability() {
        let below_one = 1. - f32::EPSILON / 2.;

        for (b1, b2) in [(below_one, below_one), (1e-30, 1e-30), (below_one, 1e-30)] {
            let param = Parameter::new(&[2], vec![1., -1.]).unwrap();
            let spec = RAdamSpec::new(0.01).with_beta1(b1).with_beta2(b2);
            let mut radam = bound(spec, &[param.clone()]);

            for _ in 0..1_000 {
                let grad = Gradient::new(&[2], vec![0.5, -2.]).unwrap();
                radam.step(&[grad]).unwrap();
            }

            assert_eq!(radam.iterations(), 1_000);
            assert!(param.to_vec().iter().all(|p| p.is_finite()));
        }
    }

    #[test]
    fn test_config_reports_decayed_learning_rate() {
        let param = Parameter::scalar(0.);
        let mut radam = bound(RAdamSpec::new(1.).with_decay(1.), &[param]);

        radam.step(&[Gradient::scalar(0.5)]).unwrap();

        let config = radam.get_config();
        assert_eq!(config[crate::specs::LEARNING_RATE_KEY], 0.5);
        assert_eq!(radam.spec().learning_rate, 1.);
    }

    #[test]
    fn test_merged_config_keeps_base_keys() {
        let radam = RAdam::new(RAdamSpec::new(0.1)).unwrap();
        let base = ConfigMap::from([("clipvalue".to_string(), 0.5)]);

        let merged = radam.merged_config(&base);
        assert_eq!(merged.len(), 4);
        assert_eq!(merged["clipvalue"], 0.5);
    }
}
