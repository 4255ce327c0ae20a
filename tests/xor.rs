use ferrox_ml::{
    train_loop, Activation, Architecture, Dataset, LossType, Network, Optimizer, TrainConfig,
};

fn xor_data() -> Dataset {
    Dataset::new(
        vec![vec![0.0, 0.0], vec![0.0, 1.0], vec![1.0, 0.0], vec![1.0, 1.0]],
        vec![vec![0.0], vec![1.0], vec![1.0], vec![0.0]],
    )
    .unwrap()
}

fn xor_arch() -> Architecture {
    Architecture::new(2, vec![4], 1, Activation::Relu, Activation::Sigmoid)
}

fn xor_config(seed: u64) -> TrainConfig {
    TrainConfig::new(200, 4, LossType::BinaryCrossEntropy)
        .with_learning_rate(0.1)
        .with_optimizer(Optimizer::adam())
        .with_seed(seed)
}

#[test]
fn training_reduces_loss_for_every_seed() {
    let data = xor_data();
    for seed in 0..5 {
        let mut net = Network::with_seed(xor_arch(), seed).unwrap();
        let before = net
            .evaluate(&data.inputs, &data.targets, LossType::BinaryCrossEntropy)
            .unwrap()
            .loss;
        let outcome = train_loop(&mut net, &data, &xor_config(seed)).unwrap();
        let after = net
            .evaluate(&data.inputs, &data.targets, LossType::BinaryCrossEntropy)
            .unwrap()
            .loss;
        assert!(outcome.is_success());
        assert!(after < before, "seed {seed}: {after} >= {before}");
    }
}

#[test]
fn xor_is_solved_for_most_seeds() {
    let data = xor_data();
    let solved = (0..10)
        .filter(|&seed| {
            let mut net = Network::with_seed(xor_arch(), seed).unwrap();
            train_loop(&mut net, &data, &xor_config(seed)).unwrap();
            let eval = net
                .evaluate(&data.inputs, &data.targets, LossType::BinaryCrossEntropy)
                .unwrap();
            eval.accuracy == 1.0
        })
        .count();
    assert!(solved >= 6, "only {solved}/10 seeds solved XOR");
}

#[test]
fn seeded_training_is_reproducible() {
    let data = xor_data();
    let mut a = Network::with_seed(xor_arch(), 42).unwrap();
    let mut b = Network::with_seed(xor_arch(), 42).unwrap();
    train_loop(&mut a, &data, &xor_config(42)).unwrap();
    train_loop(&mut b, &data, &xor_config(42)).unwrap();
    assert_eq!(a.save_weights(), b.save_weights());
}

#[test]
fn every_optimizer_makes_progress() {
    let data = xor_data();
    for optimizer in [Optimizer::Sgd, Optimizer::momentum(), Optimizer::adam(), Optimizer::rms_prop()] {
        let mut net = Network::with_seed(xor_arch(), 7).unwrap();
        let before = net.evaluate(&data.inputs, &data.targets, LossType::Mse).unwrap().loss;
        let config = TrainConfig::new(100, 4, LossType::Mse)
            .with_learning_rate(0.05)
            .with_optimizer(optimizer)
            .with_seed(7);
        let outcome = train_loop(&mut net, &data, &config).unwrap();
        let after = outcome.run().unwrap().train.loss;
        assert!(after < before, "{optimizer:?}: {after} >= {before}");
    }
}
