use log::debug;
use rand::{rngs::StdRng, Rng, SeedableRng};
use serde::{Serialize, Deserialize};

use crate::error::{NnError, Result};
use crate::layers::{DenseLayer, ParamBuffer};
use crate::loss::LossType;
use crate::math::{argmax, Matrix};
use crate::network::architecture::Architecture;
use crate::network::cache::{ActivationCache, Gradients};
use crate::network::weights::WeightBundle;
use crate::optim::{Optimizer, OptimizerState};

/// Lifecycle of a `Network`. A value only exists once construction has
/// succeeded, so there is no uninitialised state.
///
/// `Initialized -> Trained` on the first successful training batch, then
/// `Trained -> Exported` on export and `Trained | Exported -> Reset` on
/// reset. Training an `Exported` or `Reset` engine again moves it back to
/// `Trained`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineState {
    Initialized,
    Trained,
    Exported,
    Reset,
}

/// Mean loss and accuracy over a dataset.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Evaluation {
    pub loss: f64,
    /// Fraction in [0, 1]. Single-output networks are thresholded at 0.5,
    /// wider outputs are compared by argmax against one-hot targets.
    pub accuracy: f64,
}

/// A feed-forward network that exclusively owns its parameters and
/// optimizer state.
#[derive(Debug, Clone)]
pub struct Network {
    architecture: Architecture,
    layers: Vec<DenseLayer>,
    optimizer_state: OptimizerState,
    state: EngineState,
}

fn build_layers<R: Rng + ?Sized>(architecture: &Architecture, rng: &mut R) -> Vec<DenseLayer> {
    let sizes = architecture.layer_sizes();
    let last = sizes.len() - 2;
    sizes
        .windows(2)
        .enumerate()
        .map(|(i, w)| {
            let activation = if i == last {
                architecture.output_activation
            } else {
                architecture.activation
            };
            DenseLayer::new(w[0], w[1], activation, architecture.weight_init, rng)
        })
        .collect()
}

impl Network {
    /// Builds a freshly initialised network using the thread-local RNG.
    pub fn new(architecture: Architecture) -> Result<Network> {
        Network::with_rng(architecture, &mut rand::thread_rng())
    }

    /// Builds a network whose initial weights are reproducible from `seed`.
    pub fn with_seed(architecture: Architecture, seed: u64) -> Result<Network> {
        Network::with_rng(architecture, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(architecture: Architecture, rng: &mut R) -> Result<Network> {
        architecture.validate()?;
        let layers = build_layers(&architecture, rng);
        debug!(
            "initialised network {:?} with {} parameters",
            architecture.layer_sizes(),
            architecture.parameter_count()
        );
        Ok(Network {
            architecture,
            layers,
            optimizer_state: OptimizerState::new(),
            state: EngineState::Initialized,
        })
    }

    /// Rebuilds a network from a saved bundle. The result counts as trained.
    pub fn from_bundle(bundle: &WeightBundle) -> Result<Network> {
        let mut network = Network::new(bundle.architecture.clone())?;
        network.load_weights(bundle)?;
        network.state = EngineState::Trained;
        Ok(network)
    }

    pub fn architecture(&self) -> &Architecture {
        &self.architecture
    }

    pub fn layers(&self) -> &[DenseLayer] {
        &self.layers
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn optimizer_state(&self) -> &OptimizerState {
        &self.optimizer_state
    }

    pub fn parameter_count(&self) -> usize {
        self.architecture.parameter_count()
    }

    fn check_input(&self, input: &[f64]) -> Result<()> {
        if input.len() != self.architecture.input_size {
            return Err(NnError::shape("input", input.len(), self.architecture.input_size));
        }
        Ok(())
    }

    /// Forward pass without recording anything.
    pub fn forward_for_inference(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.check_input(input)?;
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current).1;
        }
        Ok(current)
    }

    /// Forward pass that also returns every layer's `z` and activation for
    /// a following `backward` call.
    pub fn forward_for_training(&self, input: &[f64]) -> Result<(Vec<f64>, ActivationCache)> {
        self.check_input(input)?;
        let mut pre_activations = Vec::with_capacity(self.layers.len());
        let mut activations: Vec<Vec<f64>> = Vec::with_capacity(self.layers.len());
        for layer in &self.layers {
            let prev = activations.last().map(|a| a.as_slice()).unwrap_or(input);
            let (z, a) = layer.forward(prev);
            pre_activations.push(z);
            activations.push(a);
        }
        let output = activations.last().cloned().unwrap_or_default();
        let cache = ActivationCache { input: input.to_vec(), pre_activations, activations };
        Ok((output, cache))
    }

    pub fn predict(&self, input: &[f64]) -> Result<Vec<f64>> {
        self.forward_for_inference(input)
    }

    fn check_cache(&self, cache: &ActivationCache) -> Result<()> {
        if cache.len() != self.layers.len() || cache.pre_activations.len() != self.layers.len() {
            return Err(NnError::StaleCache(format!(
                "cache holds {} layers, network has {}",
                cache.len(),
                self.layers.len()
            )));
        }
        if cache.input.len() != self.architecture.input_size {
            return Err(NnError::StaleCache("cached input width differs from the network".into()));
        }
        let widths_match = self
            .layers
            .iter()
            .zip(cache.activations.iter().zip(cache.pre_activations.iter()))
            .all(|(l, (a, z))| a.len() == l.size() && z.len() == l.size());
        if !widths_match {
            return Err(NnError::StaleCache("cached layer widths differ from the network".into()));
        }
        Ok(())
    }

    /// Back-propagates the loss gradient through the cached forward pass.
    ///
    /// The output error is the loss gradient times the output activation
    /// derivative. Each layer's weight gradient is the outer product of its
    /// input activation and its error; the error handed to the previous
    /// layer is `(W · δ) ⊙ act'(z_prev)`.
    pub fn backward(&self, cache: &ActivationCache, target: &[f64], loss: LossType) -> Result<Gradients> {
        self.check_cache(cache)?;
        if target.len() != self.architecture.output_size {
            return Err(NnError::shape("target", target.len(), self.architecture.output_size));
        }

        let last = self.layers.len() - 1;
        let output_grad = loss.gradient(cache.output(), target);
        let output_slope = self.layers[last].activation.derivative_vec(&cache.pre_activations[last]);
        let mut delta: Vec<f64> = output_grad.iter().zip(output_slope.iter()).map(|(g, s)| g * s).collect();

        let mut grads: Vec<ParamBuffer> = Vec::with_capacity(self.layers.len());
        for i in (0..self.layers.len()).rev() {
            let layer_input = if i == 0 { &cache.input } else { &cache.activations[i - 1] };
            let weights = Matrix::outer(layer_input, &delta);

            let next_delta: Option<Vec<f64>> = if i > 0 {
                let back = self.layers[i].weights.mul_vec(&delta);
                let slope = self.layers[i - 1].activation.derivative_vec(&cache.pre_activations[i - 1]);
                Some(back.iter().zip(slope.iter()).map(|(b, s)| b * s).collect())
            } else {
                None
            };

            grads.push(ParamBuffer { weights, biases: delta });
            match next_delta {
                Some(d) => delta = d,
                None => break,
            }
        }
        grads.reverse();

        let grads = Gradients { layers: grads };
        if !grads.is_finite() {
            return Err(NnError::NumericalInstability("non-finite gradient".into()));
        }
        Ok(grads)
    }

    /// Applies one optimizer step using `grads`.
    pub fn update_weights(&mut self, grads: &Gradients, learning_rate: f64, optimizer: Optimizer) -> Result<()> {
        self.optimizer_state
            .apply(&mut self.layers, &grads.layers, learning_rate, optimizer)?;
        if let Some(i) = self.layers.iter().position(|l| !l.is_finite()) {
            return Err(NnError::NumericalInstability(format!(
                "layer {i} has non-finite parameters after update"
            )));
        }
        Ok(())
    }

    fn check_batch(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>]) -> Result<()> {
        if inputs.is_empty() {
            return Err(NnError::InsufficientData("empty batch".into()));
        }
        if inputs.len() != targets.len() {
            return Err(NnError::shape("batch targets", targets.len(), inputs.len()));
        }
        Ok(())
    }

    fn sample_loss(&self, output: &[f64], target: &[f64], loss: LossType) -> Result<f64> {
        if target.len() != output.len() {
            return Err(NnError::shape("target", target.len(), output.len()));
        }
        let value = loss.loss(output, target);
        if !value.is_finite() {
            return Err(NnError::NumericalInstability(format!("loss evaluated to {value}")));
        }
        Ok(value)
    }

    /// Online descent over a batch: forward, loss, backward and update for
    /// each sample in turn. Returns the mean sample loss.
    pub fn train_batch(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
        learning_rate: f64,
        optimizer: Optimizer,
        loss: LossType,
    ) -> Result<f64> {
        self.check_batch(inputs, targets)?;
        let mut total = 0.0;
        for (input, target) in inputs.iter().zip(targets.iter()) {
            let (output, cache) = self.forward_for_training(input)?;
            total += self.sample_loss(&output, target, loss)?;
            let grads = self.backward(&cache, target, loss)?;
            self.update_weights(&grads, learning_rate, optimizer)?;
        }
        self.state = EngineState::Trained;
        Ok(total / inputs.len() as f64)
    }

    /// Mini-batch descent: gradients of every sample are averaged and a
    /// single update is applied. Returns the mean sample loss.
    pub fn train_batch_averaged(
        &mut self,
        inputs: &[Vec<f64>],
        targets: &[Vec<f64>],
        learning_rate: f64,
        optimizer: Optimizer,
        loss: LossType,
    ) -> Result<f64> {
        self.check_batch(inputs, targets)?;
        let mut total = 0.0;
        let mut acc = Gradients::zeros_like(&self.layers);
        for (input, target) in inputs.iter().zip(targets.iter()) {
            let (output, cache) = self.forward_for_training(input)?;
            total += self.sample_loss(&output, target, loss)?;
            acc.accumulate(&self.backward(&cache, target, loss)?);
        }
        acc.scale(1.0 / inputs.len() as f64);
        self.update_weights(&acc, learning_rate, optimizer)?;
        self.state = EngineState::Trained;
        Ok(total / inputs.len() as f64)
    }

    /// Mean loss and accuracy over `inputs`/`targets`.
    pub fn evaluate(&self, inputs: &[Vec<f64>], targets: &[Vec<f64>], loss: LossType) -> Result<Evaluation> {
        self.check_batch(inputs, targets)?;
        let mut total = 0.0;
        let mut correct = 0usize;
        for (input, target) in inputs.iter().zip(targets.iter()) {
            let output = self.forward_for_inference(input)?;
            total += self.sample_loss(&output, target, loss)?;
            if is_correct(&output, target) {
                correct += 1;
            }
        }
        let n = inputs.len() as f64;
        Ok(Evaluation { loss: total / n, accuracy: correct as f64 / n })
    }

    /// Deep copy of the current parameters.
    pub fn save_weights(&self) -> WeightBundle {
        WeightBundle {
            architecture: self.architecture.clone(),
            weights: self.layers.iter().map(|l| l.weights.clone()).collect(),
            biases: self.layers.iter().map(|l| l.biases.clone()).collect(),
        }
    }

    /// Like `save_weights`, and moves a trained network to `Exported`.
    pub fn export_weights(&mut self) -> WeightBundle {
        if self.state == EngineState::Trained {
            self.state = EngineState::Exported;
        }
        self.save_weights()
    }

    /// Replaces the parameters with a deep copy of `bundle`. Nothing is
    /// modified unless every tensor has the expected shape.
    pub fn load_weights(&mut self, bundle: &WeightBundle) -> Result<()> {
        let sizes = self.architecture.layer_sizes();
        let theirs = bundle.architecture.layer_sizes();
        if theirs.len() != sizes.len() {
            return Err(NnError::shape("bundle layers", theirs.len() - 1, sizes.len() - 1));
        }
        if let Some(i) = sizes.iter().zip(theirs.iter()).position(|(a, b)| a != b) {
            return Err(NnError::shape("bundle layer width", theirs[i], sizes[i]));
        }
        if bundle.weights.len() != self.layers.len() {
            return Err(NnError::shape("bundle weight matrices", bundle.weights.len(), self.layers.len()));
        }
        if bundle.biases.len() != self.layers.len() {
            return Err(NnError::shape("bundle bias vectors", bundle.biases.len(), self.layers.len()));
        }
        for (layer, (w, b)) in self.layers.iter().zip(bundle.weights.iter().zip(bundle.biases.iter())) {
            if w.rows != layer.input_size() || w.data.len() != w.rows {
                return Err(NnError::shape("weight rows", w.data.len(), layer.input_size()));
            }
            if w.cols != layer.size() {
                return Err(NnError::shape("weight columns", w.cols, layer.size()));
            }
            if let Some(row) = w.data.iter().find(|r| r.len() != layer.size()) {
                return Err(NnError::shape("weight columns", row.len(), layer.size()));
            }
            if b.len() != layer.size() {
                return Err(NnError::shape("biases", b.len(), layer.size()));
            }
        }

        for (layer, (w, b)) in self.layers.iter_mut().zip(bundle.weights.iter().zip(bundle.biases.iter())) {
            layer.weights = w.clone();
            layer.biases = b.clone();
        }
        Ok(())
    }

    /// Re-initialises every layer and drops optimizer state.
    pub fn reset(&mut self) {
        self.reset_with_rng(&mut rand::thread_rng());
    }

    pub fn reset_with_rng<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.layers = build_layers(&self.architecture, rng);
        self.optimizer_state = OptimizerState::new();
        self.state = EngineState::Reset;
    }
}

fn is_correct(output: &[f64], target: &[f64]) -> bool {
    if output.len() == 1 {
        (output[0] >= 0.5) == (target[0] >= 0.5)
    } else {
        argmax(output) == argmax(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activation::Activation;

    fn xor_arch() -> Architecture {
        Architecture::new(2, vec![4], 1, Activation::Relu, Activation::Sigmoid)
    }

    #[test]
    fn saved_weights_follow_layer_boundaries() {
        let arch = Architecture::new(5, vec![7, 3, 4], 2, Activation::Tanh, Activation::Softmax);
        let net = Network::with_seed(arch, 3).unwrap();
        let bundle = net.save_weights();
        assert_eq!(bundle.weights.len(), 4);
        let dims: Vec<(usize, usize)> = bundle.weights.iter().map(|w| (w.rows, w.cols)).collect();
        assert_eq!(dims, vec![(5, 7), (7, 3), (3, 4), (4, 2)]);
        assert_eq!(net.state(), EngineState::Initialized);
    }

    #[test]
    fn construction_rejects_zero_width() {
        let arch = Architecture::new(2, vec![0], 1, Activation::Relu, Activation::Sigmoid);
        assert!(matches!(Network::new(arch), Err(NnError::Configuration(_))));
    }

    #[test]
    fn inference_is_deterministic_and_checks_width() {
        let net = Network::with_seed(xor_arch(), 11).unwrap();
        let a = net.predict(&[0.3, -0.7]).unwrap();
        let b = net.predict(&[0.3, -0.7]).unwrap();
        assert_eq!(a, b);
        assert!(matches!(
            net.predict(&[1.0, 2.0, 3.0]),
            Err(NnError::ShapeMismatch { what: "input", got: 3, expected: 2 })
        ));
    }

    #[test]
    fn training_forward_matches_inference() {
        let net = Network::with_seed(xor_arch(), 5).unwrap();
        let (out, cache) = net.forward_for_training(&[1.0, 0.0]).unwrap();
        assert_eq!(out, net.forward_for_inference(&[1.0, 0.0]).unwrap());
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.output(), out.as_slice());
    }

    #[test]
    fn softmax_output_sums_to_one() {
        let arch = Architecture::new(3, vec![6], 4, Activation::Relu, Activation::Softmax);
        let net = Network::with_seed(arch, 9).unwrap();
        let out = net.predict(&[0.2, 0.9, -1.1]).unwrap();
        assert!((out.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn backward_matches_numerical_gradient() {
        let arch = Architecture::new(3, vec![4], 2, Activation::Tanh, Activation::Sigmoid);
        let net = Network::with_seed(arch, 21).unwrap();
        let input = [0.4, -0.3, 0.8];
        let target = [1.0, 0.0];
        let (_, cache) = net.forward_for_training(&input).unwrap();
        let grads = net.backward(&cache, &target, LossType::Mse).unwrap();

        let h = 1e-6;
        for (l, (i, j)) in [(0usize, (1usize, 2usize)), (1, (3, 0)), (1, (0, 1))] {
            let mut plus = net.clone();
            plus.layers[l].weights.data[i][j] += h;
            let mut minus = net.clone();
            minus.layers[l].weights.data[i][j] -= h;
            let lp = LossType::Mse.loss(&plus.predict(&input).unwrap(), &target);
            let lm = LossType::Mse.loss(&minus.predict(&input).unwrap(), &target);
            // MseLoss averages over outputs while its gradient does not.
            let numeric = (lp - lm) / (2.0 * h) * target.len() as f64;
            let analytic = grads.layers[l].weights.data[i][j];
            assert!((numeric - analytic).abs() < 1e-5, "layer {l} [{i}][{j}]: {numeric} vs {analytic}");
        }
    }

    #[test]
    fn foreign_cache_is_stale() {
        let net = Network::with_seed(xor_arch(), 1).unwrap();
        let other = Network::with_seed(
            Architecture::new(2, vec![3, 3], 1, Activation::Relu, Activation::Sigmoid),
            1,
        )
        .unwrap();
        let (_, cache) = other.forward_for_training(&[0.0, 1.0]).unwrap();
        assert!(matches!(net.backward(&cache, &[1.0], LossType::Mse), Err(NnError::StaleCache(_))));
    }

    #[test]
    fn train_batch_marks_trained_and_allocates_adam_state() {
        let mut net = Network::with_seed(xor_arch(), 2).unwrap();
        let inputs = vec![vec![0.0, 1.0], vec![1.0, 1.0]];
        let targets = vec![vec![1.0], vec![0.0]];
        let loss = net
            .train_batch(&inputs, &targets, 0.01, Optimizer::adam(), LossType::BinaryCrossEntropy)
            .unwrap();
        assert!(loss.is_finite());
        assert_eq!(net.state(), EngineState::Trained);
        assert_eq!(net.optimizer_state().step(), 2);

        assert!(matches!(
            net.train_batch(&[], &[], 0.01, Optimizer::Sgd, LossType::Mse),
            Err(NnError::InsufficientData(_))
        ));
    }

    #[test]
    fn averaged_batch_applies_one_update() {
        let mut net = Network::with_seed(xor_arch(), 2).unwrap();
        let inputs = vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]];
        let targets = vec![vec![1.0], vec![1.0], vec![0.0]];
        net.train_batch_averaged(&inputs, &targets, 0.01, Optimizer::adam(), LossType::Mse)
            .unwrap();
        assert_eq!(net.optimizer_state().step(), 1);
    }

    #[test]
    fn exploding_learning_rate_is_reported() {
        let arch = Architecture::new(1, vec![], 1, Activation::Relu, Activation::Linear);
        let mut net = Network::with_seed(arch, 4).unwrap();
        let inputs = vec![vec![1e150]];
        let targets = vec![vec![-1e150]];
        let res = net.train_batch(&inputs, &targets, 1e200, Optimizer::Sgd, LossType::Mse);
        assert!(matches!(res, Err(NnError::NumericalInstability(_))));
    }

    #[test]
    fn load_weights_round_trips_and_rejects_bad_shapes() {
        let net = Network::with_seed(xor_arch(), 8).unwrap();
        let bundle = net.save_weights();
        let mut other = Network::with_seed(xor_arch(), 99).unwrap();
        other.load_weights(&bundle).unwrap();
        assert_eq!(other.predict(&[1.0, 0.0]).unwrap(), net.predict(&[1.0, 0.0]).unwrap());

        let mut wider = Network::new(Architecture::new(2, vec![5], 1, Activation::Relu, Activation::Sigmoid)).unwrap();
        assert!(matches!(wider.load_weights(&bundle), Err(NnError::ShapeMismatch { .. })));

        let mut truncated = bundle.clone();
        truncated.biases[0].pop();
        assert!(matches!(other.load_weights(&truncated), Err(NnError::ShapeMismatch { .. })));

        let mut narrow = bundle.clone();
        narrow.weights[1].cols = 0;
        assert!(matches!(
            other.load_weights(&narrow),
            Err(NnError::ShapeMismatch { what: "weight columns", .. })
        ));
        assert_eq!(other.predict(&[1.0, 0.0]).unwrap(), net.predict(&[1.0, 0.0]).unwrap());
    }

    #[test]
    fn export_and_reset_transitions() {
        let mut net = Network::with_seed(xor_arch(), 2).unwrap();
        net.export_weights();
        assert_eq!(net.state(), EngineState::Initialized);
        net.train_batch(&[vec![0.0, 0.0]], &[vec![0.0]], 0.1, Optimizer::momentum(), LossType::Mse)
            .unwrap();
        net.export_weights();
        assert_eq!(net.state(), EngineState::Exported);
        net.reset();
        assert_eq!(net.state(), EngineState::Reset);
        assert!(!net.optimizer_state().is_allocated());

        net.train_batch_averaged(&[vec![1.0, 0.0]], &[vec![1.0]], 0.1, Optimizer::Sgd, LossType::Mse)
            .unwrap();
        assert_eq!(net.state(), EngineState::Trained);
    }
}
