use ferrox_ml::{
    Activation, Architecture, Dataset, LossType, ModelConfig, ModelRegistry, Optimizer,
    Preprocessing, TaskType, TrainConfig, TrainingOutcome,
};

fn main() -> ferrox_ml::Result<()> {
    env_logger::init();

    let mut registry = ModelRegistry::new();
    let arch = Architecture::new(2, vec![4], 1, Activation::Relu, Activation::Sigmoid);
    registry.register_model(
        "xor",
        ModelConfig::new(TaskType::Regression, arch).with_preprocessing(Preprocessing::None),
    )?;

    let inputs = vec![
        vec![1.0, 0.0],
        vec![1.0, 1.0],
        vec![0.0, 1.0],
        vec![0.0, 0.0],
    ];
    let expected_outputs = vec![
        vec![1.0],
        vec![0.0],
        vec![1.0],
        vec![0.0],
    ];
    let data = Dataset::new(inputs.clone(), expected_outputs)?;

    let config = TrainConfig::new(200, 4, LossType::BinaryCrossEntropy)
        .with_learning_rate(0.1)
        .with_optimizer(Optimizer::adam());

    match registry.train_model("xor", &data, &config)? {
        TrainingOutcome::Completed(run) => {
            for stats in run.history.iter().step_by(20) {
                println!("Epoch {}: loss = {:.6}", stats.epoch, stats.loss);
            }
            println!("Final accuracy: {:.2}", run.train.accuracy);
        }
        TrainingOutcome::Failed { error, partial_history } => {
            println!("Training failed after {} epochs: {error}", partial_history.len());
            return Ok(());
        }
    }

    for input in &inputs {
        let prediction = registry.predict("xor", input)?;
        println!("Input: {:?} -> Output: {:.4}", input, prediction.raw[0]);
    }

    let bundle = registry.export_model("xor")?;
    println!("{}", bundle.to_json()?);
    Ok(())
}
