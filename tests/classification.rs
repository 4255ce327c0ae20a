use ferrox_ml::registry::PredictionValue;
use ferrox_ml::{Dataset, LossType, ModelConfig, ModelRegistry, TaskType, TrainConfig};

const CLASSES: usize = 10;

/// Ten one-hot digits, each input a noisy copy of the class code.
fn digits() -> Dataset {
    let mut inputs = Vec::new();
    let mut targets = Vec::new();
    for rep in 0..4 {
        for class in 0..CLASSES {
            let mut x = vec![0.0; CLASSES];
            x[class] = 1.0;
            x[(class + 1) % CLASSES] = 0.1 * rep as f64;
            let mut y = vec![0.0; CLASSES];
            y[class] = 1.0;
            inputs.push(x);
            targets.push(y);
        }
    }
    Dataset::new(inputs, targets).unwrap()
}

fn trained() -> ModelRegistry {
    let mut registry = ModelRegistry::new();
    let labels = (0..CLASSES).map(|i| format!("digit-{i}")).collect();
    registry
        .register_model(
            "digits",
            ModelConfig::for_task(TaskType::Classification, CLASSES, CLASSES).with_labels(labels),
        )
        .unwrap();
    let config = TrainConfig::new(60, 8, LossType::CrossEntropy)
        .with_learning_rate(0.01)
        .with_seed(21);
    assert!(registry.train_model("digits", &digits(), &config).unwrap().is_success());
    registry
}

#[test]
fn top_k_is_sorted_and_distribution_sums_to_one() {
    let registry = trained();
    let mut x = vec![0.0; CLASSES];
    x[7] = 1.0;
    let result = registry.classify("digits", &x, 3).unwrap();

    assert_eq!(result.top.len(), 3);
    assert!(result.top.windows(2).all(|w| w[0].probability >= w[1].probability));
    assert_eq!(result.top[0].index, result.index);
    assert_eq!(result.probability, result.top[0].probability);

    assert_eq!(result.distribution.len(), CLASSES);
    assert!((result.distribution.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    assert!(result.distribution.iter().all(|p| (0.0..=1.0).contains(p)));
}

#[test]
fn learns_the_identity_code() {
    let registry = trained();
    let data = digits();
    let correct = data
        .inputs
        .iter()
        .take(CLASSES)
        .enumerate()
        .filter(|(class, x)| registry.classify("digits", x, 1).unwrap().index == *class)
        .count();
    assert!(correct >= 8, "only {correct}/10 classes recognised");

    let pred = registry.predict("digits", &data.inputs[3]).unwrap();
    match pred.prediction {
        PredictionValue::Class { index, label } => {
            assert_eq!(label, Some(format!("digit-{index}")));
        }
        other => panic!("unexpected prediction {other:?}"),
    }
}

#[test]
fn top_k_larger_than_class_count_returns_every_class() {
    let registry = trained();
    let result = registry.classify("digits", &digits().inputs[0], 50).unwrap();
    assert_eq!(result.top.len(), CLASSES);
}
