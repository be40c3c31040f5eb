//! Integration tests for persisting and restoring trained models.

use std::fs;

use tempfile::TempDir;

use polarity::analysis::{AnalyzerOptions, TokenizerKind};
use polarity::dataset::LabeledExample;
use polarity::error::{PolarityError, Result};
use polarity::inference::predict_one;
use polarity::ml::store::{FORMAT_VERSION, HEADER_LEN, MODEL_MAGIC};
use polarity::ml::{Featurizer, FeaturizerOptions, ModelStore, SdcaLogisticTrainer, TrainedModel};

fn reviews() -> Vec<LabeledExample> {
    vec![
        LabeledExample::positive("Das Essen war ausgezeichnet"),
        LabeledExample::positive("Très bon restaurant, service impeccable"),
        LabeledExample::positive("great ramen, friendly staff"),
        LabeledExample::negative("Das Essen war kalt"),
        LabeledExample::negative("Service lent et plats froids"),
        LabeledExample::negative("cold ramen, rude staff"),
    ]
}

fn train(options: &FeaturizerOptions) -> Result<TrainedModel> {
    TrainedModel::train(&reviews(), options, &SdcaLogisticTrainer::default())
}

#[test]
fn test_round_trip_is_bit_exact() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("models").join("model.bin");
    let model = train(&FeaturizerOptions::default())?;

    model.save(&path)?;
    let restored = TrainedModel::load(&path)?;

    for text in [
        "Das Essen war ausgezeichnet",
        "cold plats, friendly service",
        "",
        "completely unseen words",
    ] {
        let original = model.featurizer().transform(text)?;
        let decoded = restored.featurizer().transform(text)?;
        assert_eq!(original, decoded);
        assert_eq!(
            predict_one(&model, text)?.probability.to_bits(),
            predict_one(&restored, text)?.probability.to_bits()
        );
    }
    assert_eq!(model.metadata(), restored.metadata());
    Ok(())
}

#[test]
fn test_custom_analyzer_survives_round_trip() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.bin");
    let options = FeaturizerOptions {
        analyzer: AnalyzerOptions {
            tokenizer: TokenizerKind::Regex(r"[a-zA-Z]+".to_string()),
            lowercase: true,
            remove_stop_words: true,
        },
        char_ngrams: None,
        ..FeaturizerOptions::default()
    };
    let model = train(&options)?;
    ModelStore::save(&model, &path)?;

    let restored = ModelStore::load(&path)?;
    assert_eq!(restored.featurizer().options(), &options);
    assert_eq!(
        restored.featurizer().transform("rude staff")?,
        model.featurizer().transform("rude staff")?
    );
    Ok(())
}

#[test]
fn test_archive_header() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.bin");
    ModelStore::save(&train(&FeaturizerOptions::default())?, &path)?;

    let bytes = fs::read(&path)?;
    assert!(bytes.len() as u64 > HEADER_LEN);
    assert_eq!(bytes[..4], MODEL_MAGIC);
    assert_eq!(bytes[4..8], FORMAT_VERSION.to_le_bytes());
    Ok(())
}

#[test]
fn test_missing_model_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nothing-here.bin");
    assert!(!ModelStore::exists(&path));
    assert!(matches!(
        ModelStore::load(&path),
        Err(PolarityError::ModelNotFound { .. })
    ));
}

#[test]
fn test_garbage_file_is_corrupt() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.bin");
    fs::write(&path, b"this is definitely not a model archive")?;

    assert!(ModelStore::exists(&path));
    assert!(matches!(
        ModelStore::load(&path),
        Err(PolarityError::CorruptModel { .. })
    ));
    Ok(())
}

#[test]
fn test_flipped_payload_byte_is_corrupt() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("model.bin");
    ModelStore::save(&train(&FeaturizerOptions::default())?, &path)?;

    let mut bytes = fs::read(&path)?;
    let middle = HEADER_LEN as usize + (bytes.len() - HEADER_LEN as usize) / 2;
    bytes[middle] ^= 0x5A;
    fs::write(&path, &bytes)?;

    match ModelStore::load(&path) {
        Err(PolarityError::CorruptModel { reason, .. }) => assert!(reason.contains("checksum")),
        other => panic!("expected corrupt model, got {other:?}"),
    }
    Ok(())
}

#[test]
fn test_unwritable_path_is_io_error() -> Result<()> {
    let dir = TempDir::new()?;
    let blocker = dir.path().join("file");
    fs::write(&blocker, b"x")?;
    let model = train(&FeaturizerOptions::default())?;

    assert!(matches!(
        ModelStore::save(&model, blocker.join("model.bin")),
        Err(PolarityError::Io(_))
    ));
    Ok(())
}
