use crate::error::{NnError, Result};
use crate::layers::{DenseLayer, ParamBuffer};
use crate::optim::optimizer::Optimizer;

/// Per-layer optimizer accumulators. Each buffer is allocated on the first
/// update that needs it and always mirrors the layer shapes.
#[derive(Debug, Clone, Default)]
pub struct OptimizerState {
    velocity: Option<Vec<ParamBuffer>>,
    first_moment: Option<Vec<ParamBuffer>>,
    second_moment: Option<Vec<ParamBuffer>>,
    sq_grad_cache: Option<Vec<ParamBuffer>>,
    /// Global Adam step, incremented once per update.
    step: u64,
}

fn zeros_for(layers: &[DenseLayer]) -> Vec<ParamBuffer> {
    layers.iter().map(ParamBuffer::zeros_like).collect()
}

impl OptimizerState {
    pub fn new() -> OptimizerState {
        OptimizerState::default()
    }

    /// Number of Adam updates applied so far.
    pub fn step(&self) -> u64 {
        self.step
    }

    /// True once any accumulator has been allocated.
    pub fn is_allocated(&self) -> bool {
        self.velocity.is_some()
            || self.first_moment.is_some()
            || self.second_moment.is_some()
            || self.sq_grad_cache.is_some()
    }

    /// Applies one update to `layers` from `grads`.
    pub fn apply(
        &mut self,
        layers: &mut [DenseLayer],
        grads: &[ParamBuffer],
        learning_rate: f64,
        optimizer: Optimizer,
    ) -> Result<()> {
        if grads.len() != layers.len() {
            return Err(NnError::shape("gradient layers", grads.len(), layers.len()));
        }
        if let Some(i) = grads.iter().zip(layers.iter()).position(|(g, l)| !g.matches(l)) {
            let expected = layers[i].input_size() * layers[i].size() + layers[i].size();
            return Err(NnError::shape("gradient values", grads[i].values().count(), expected));
        }

        match optimizer {
            Optimizer::Sgd => {
                for (layer, g) in layers.iter_mut().zip(grads) {
                    for (p, g) in layer.params_mut().zip(g.values()) {
                        *p -= learning_rate * g;
                    }
                }
            }
            Optimizer::Momentum { momentum } => {
                let velocity = self.velocity.get_or_insert_with(|| zeros_for(layers));
                for ((layer, g), v) in layers.iter_mut().zip(grads).zip(velocity.iter_mut()) {
                    for ((p, g), v) in layer.params_mut().zip(g.values()).zip(v.values_mut()) {
                        *v = momentum * *v - learning_rate * g;
                        *p += *v;
                    }
                }
            }
            Optimizer::Adam { beta1, beta2, epsilon } => {
                let m = self.first_moment.get_or_insert_with(|| zeros_for(layers));
                let v = self.second_moment.get_or_insert_with(|| zeros_for(layers));
                self.step += 1;
                let t = i32::try_from(self.step).unwrap_or(i32::MAX);
                let bias_c1 = 1.0 - beta1.powi(t);
                let bias_c2 = 1.0 - beta2.powi(t);
                for (((layer, g), m), v) in layers
                    .iter_mut()
                    .zip(grads)
                    .zip(m.iter_mut())
                    .zip(v.iter_mut())
                {
                    let moments = m.values_mut().zip(v.values_mut());
                    for ((p, g), (m, v)) in layer.params_mut().zip(g.values()).zip(moments) {
                        *m = beta1 * *m + (1.0 - beta1) * g;
                        *v = beta2 * *v + (1.0 - beta2) * g * g;
                        let m_hat = *m / bias_c1;
                        let v_hat = *v / bias_c2;
                        *p -= learning_rate * m_hat / (v_hat.sqrt() + epsilon);
                    }
                }
            }
            Optimizer::RmsProp { decay, epsilon } => {
                let cache = self.sq_grad_cache.get_or_insert_with(|| zeros_for(layers));
                for ((layer, g), c) in layers.iter_mut().zip(grads).zip(cache.iter_mut()) {
                    for ((p, g), c) in layer.params_mut().zip(g.values()).zip(c.values_mut()) {
                        *c = decay * *c + (1.0 - decay) * g * g;
                        *p -= learning_rate * g / (c.sqrt() + epsilon);
                    }
                }
            }
        }
        Ok(())
    }
}
