//! Integration tests for the end-to-end sentiment pipeline.

use std::path::PathBuf;

use tempfile::TempDir;

use polarity::config::{DatasetConfig, PipelineConfig};
use polarity::dataset::{LabeledExample, load_examples, split};
use polarity::error::Result;
use polarity::inference::{SentimentClass, classify, predict_many, predict_one};
use polarity::ml::{
    FeaturizerOptions, SdcaLogisticTrainer, TrainedModel, Trainer, TrainerOptions, evaluate,
};
use polarity::pipeline::{EvaluationOutcome, ModelOrigin, Orchestrator, PipelineState};

fn sample_data() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("data")
        .join("sentiment.csv")
}

fn config_in(dir: &TempDir) -> PipelineConfig {
    PipelineConfig {
        data: DatasetConfig::with_path(sample_data()),
        model_path: dir.path().join("sentiment_model.bin"),
        ..PipelineConfig::default()
    }
}

#[test]
fn test_sample_corpus_loads() -> Result<()> {
    let examples = load_examples(sample_data(), ';', true)?;
    assert!(examples.len() >= 50);
    assert!(examples.iter().any(|e| e.label));
    assert!(examples.iter().any(|e| !e.label));
    assert!(examples.iter().any(|e| e.text.contains(';')));
    Ok(())
}

#[test]
fn test_end_to_end_bad_steak() -> Result<()> {
    let dir = TempDir::new()?;
    let ready = Orchestrator::new(config_in(&dir))?.run()?;

    assert_eq!(ready.origin(), ModelOrigin::Trained);
    let metrics = ready
        .evaluation()
        .metrics()
        .expect("evaluation should succeed on the sample corpus");
    assert!((0.0..=1.0).contains(&metrics.accuracy));
    assert!((0.0..=1.0).contains(&metrics.auc));

    let prediction = ready.predict_one("This was a very bad steak")?;
    assert!(!prediction.predicted_label);
    assert!(prediction.probability < 0.4, "{}", prediction.probability);
    assert_eq!(prediction.sentiment(), SentimentClass::Negative);

    Ok(())
}

#[test]
fn test_second_run_loads_persisted_model() -> Result<()> {
    let dir = TempDir::new()?;
    let config = config_in(&dir);

    let first = Orchestrator::new(config.clone())?;
    assert_eq!(first.state(), PipelineState::NoModel);
    let first = first.run()?;

    let second = Orchestrator::new(config)?;
    assert_eq!(second.state(), PipelineState::ModelExists);
    let second = second.run()?;

    assert_eq!(second.origin(), ModelOrigin::Loaded);
    assert_eq!(second.evaluation(), &EvaluationOutcome::Skipped);
    assert_eq!(
        first.model().metadata().model_id,
        second.model().metadata().model_id
    );

    let texts = ["I love this spaghetti.", "This was a horrible meal", ""];
    let before = first.predict_many(&texts);
    let after = second.predict_many(&texts);
    for (a, b) in before.iter().zip(&after) {
        assert_eq!(a.as_ref().unwrap(), b.as_ref().unwrap());
    }

    Ok(())
}

#[test]
fn test_probabilities_are_bounded() -> Result<()> {
    let examples = load_examples(sample_data(), ';', true)?;
    let model = TrainedModel::train(
        &examples,
        &FeaturizerOptions::default(),
        &SdcaLogisticTrainer::default(),
    )?;

    for example in &examples {
        let prediction = predict_one(&model, &example.text)?;
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.predicted_label, prediction.probability >= 0.5);
    }
    Ok(())
}

#[test]
fn test_separable_keywords_give_perfect_accuracy() -> Result<()> {
    let mut examples = Vec::new();
    for i in 0..20 {
        examples.push(LabeledExample::positive(format!("superb excellent visit {i}")));
        examples.push(LabeledExample::negative(format!("dreadful appalling visit {i}")));
    }
    let (train, test) = split(examples, 0.25, 7)?;
    let model = TrainedModel::train(
        &train,
        &FeaturizerOptions::default(),
        &SdcaLogisticTrainer::default(),
    )?;

    let metrics = evaluate(&model, &test)?;
    assert_eq!(metrics.accuracy, 1.0);
    assert_eq!(metrics.auc, 1.0);
    assert_eq!(metrics.f1, 1.0);
    Ok(())
}

#[test]
fn test_empty_test_set_is_an_error() -> Result<()> {
    let examples = load_examples(sample_data(), ';', true)?;
    let model = TrainedModel::train(
        &examples,
        &FeaturizerOptions::default(),
        &SdcaLogisticTrainer::default(),
    )?;
    assert!(matches!(
        evaluate(&model, &[]),
        Err(polarity::error::PolarityError::EmptyDataset(_))
    ));
    Ok(())
}

#[test]
fn test_batch_order_matches_input() -> Result<()> {
    let examples = load_examples(sample_data(), ';', true)?;
    let model = TrainedModel::train(
        &examples,
        &FeaturizerOptions::default(),
        &SdcaLogisticTrainer::default(),
    )?;

    let texts: Vec<String> = examples.iter().map(|e| e.text.clone()).collect();
    let predictions = predict_many(&model, &texts);
    assert_eq!(predictions.len(), texts.len());
    for (text, prediction) in texts.iter().zip(predictions) {
        assert_eq!(&prediction?.text, text);
    }
    Ok(())
}

#[test]
fn test_training_is_reproducible() -> Result<()> {
    let examples = load_examples(sample_data(), ';', true)?;
    let trainer = SdcaLogisticTrainer::new(TrainerOptions {
        seed: 11,
        ..TrainerOptions::default()
    });
    let a = TrainedModel::train(&examples, &FeaturizerOptions::default(), &trainer)?;
    let b = TrainedModel::train(&examples, &FeaturizerOptions::default(), &trainer)?;

    assert_eq!(a.classifier(), b.classifier());
    assert_eq!(a.featurizer().terms(), b.featurizer().terms());
    assert_eq!(trainer.name(), a.metadata().trainer);
    Ok(())
}

#[test]
fn test_display_buckets_are_separate_from_labels() {
    assert_eq!(classify(0.55), SentimentClass::Neutral);
    assert_eq!(classify(0.45), SentimentClass::Neutral);
    assert_eq!(classify(0.61), SentimentClass::Positive);
    assert_eq!(classify(0.39), SentimentClass::Negative);
}
