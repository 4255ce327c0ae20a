use ferrox_ml::{
    train_loop, Activation, Architecture, Dataset, LossType, Network, Optimizer, TrainConfig,
    TrainingOutcome,
};

fn noisy_line(n: usize) -> Dataset {
    let inputs: Vec<Vec<f64>> = (0..n).map(|i| vec![i as f64 / n as f64]).collect();
    let targets = inputs
        .iter()
        .enumerate()
        .map(|(i, x)| vec![0.7 * x[0] + 0.1 * ((i * 7919) as f64).sin()])
        .collect();
    Dataset::new(inputs, targets).unwrap()
}

fn arch() -> Architecture {
    Architecture::new(1, vec![6], 1, Activation::Tanh, Activation::Linear)
}

#[test]
fn stalled_validation_loss_stops_training_early() {
    let mut net = Network::with_seed(arch(), 1).unwrap();
    let initial = net.save_weights();
    let config = TrainConfig::new(50, 4, LossType::Mse)
        .with_learning_rate(0.0)
        .with_optimizer(Optimizer::Sgd)
        .with_validation(0.25, Some(3))
        .with_seed(1);

    let outcome = train_loop(&mut net, &noisy_line(20), &config).unwrap();
    let run = match outcome {
        TrainingOutcome::Completed(run) => run,
        TrainingOutcome::Failed { error, .. } => panic!("training failed: {error}"),
    };

    assert!(run.early_stopped);
    assert!(run.converged());
    assert_eq!(run.epochs_run(), 4);
    assert_eq!(run.best_epoch, Some(1));
    assert_eq!(net.save_weights(), initial);
}

#[test]
fn restored_weights_are_the_best_validation_snapshot() {
    let mut net = Network::with_seed(arch(), 3).unwrap();
    let config = TrainConfig::new(80, 2, LossType::Mse)
        .with_learning_rate(0.05)
        .with_optimizer(Optimizer::momentum())
        .with_validation(0.3, Some(5))
        .with_seed(3);

    let outcome = train_loop(&mut net, &noisy_line(30), &config).unwrap();
    let run = outcome.run().expect("training should complete");

    let val_losses: Vec<f64> = run.history.iter().map(|s| s.val_loss.unwrap()).collect();
    let min = val_losses.iter().copied().fold(f64::INFINITY, f64::min);
    let first_min_epoch = val_losses.iter().position(|&l| l == min).unwrap() + 1;

    assert_eq!(run.best_epoch, Some(first_min_epoch));
    assert_eq!(run.best_loss, Some(min));
    assert_eq!(run.validation.unwrap().loss, min);
    assert_eq!(Some(net.save_weights()), run.best_weights);
    if run.early_stopped {
        assert!(run.epochs_run() < 80);
        assert_eq!(run.epochs_run() - first_min_epoch, 5);
    }
}
