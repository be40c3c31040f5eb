//! Criterion benchmarks for Polarity.
//!
//! Covers the hot paths of the pipeline:
//! - Featurizer fitting and transformation
//! - SDCA training
//! - Single and batch inference

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use polarity::config::InferenceOptions;
use polarity::dataset::LabeledExample;
use polarity::inference::{InferenceEngine, predict_one};
use polarity::ml::{
    Featurizer, FeaturizerOptions, SdcaLogisticTrainer, TrainedModel, Trainer, TrainerOptions,
};

/// Generate labeled reviews for benchmarking.
fn generate_reviews(count: usize) -> Vec<LabeledExample> {
    let positive = [
        "great", "delicious", "friendly", "fresh", "amazing", "lovely", "tasty", "perfect",
    ];
    let negative = [
        "bad", "cold", "rude", "stale", "awful", "bland", "dirty", "slow",
    ];
    let neutral = [
        "the", "food", "service", "was", "steak", "pasta", "staff", "table", "dinner", "very",
    ];

    (0..count)
        .map(|i| {
            let label = i % 2 == 0;
            let pool: &[&str] = if label { &positive } else { &negative };
            let length = 6 + i % 12;
            let words: Vec<&str> = (0..length)
                .map(|j| {
                    if j % 3 == 0 {
                        pool[(i + j) % pool.len()]
                    } else {
                        neutral[(i * 7 + j) % neutral.len()]
                    }
                })
                .collect();
            LabeledExample::new(words.join(" "), label)
        })
        .collect()
}

fn bench_featurizer(c: &mut Criterion) {
    let reviews = generate_reviews(2_000);
    let texts: Vec<&str> = reviews.iter().map(|e| e.text.as_str()).collect();

    let mut group = c.benchmark_group("featurizer");
    group.throughput(Throughput::Elements(texts.len() as u64));

    group.bench_function("fit_2000", |b| {
        b.iter(|| FeaturizerOptions::default().fit(black_box(&texts)))
    });

    let featurizer = FeaturizerOptions::default()
        .fit(&texts)
        .expect("featurizer fit");
    group.bench_function("transform_all_2000", |b| {
        b.iter(|| featurizer.transform_all(black_box(&texts)))
    });

    group.finish();
}

fn bench_training(c: &mut Criterion) {
    let reviews = generate_reviews(2_000);
    let texts: Vec<&str> = reviews.iter().map(|e| e.text.as_str()).collect();
    let labels: Vec<bool> = reviews.iter().map(|e| e.label).collect();
    let featurizer = FeaturizerOptions::default()
        .fit(&texts)
        .expect("featurizer fit");
    let features = featurizer.transform_all(&texts).expect("transform");

    let trainer = SdcaLogisticTrainer::new(TrainerOptions {
        max_epochs: 20,
        ..TrainerOptions::default()
    });

    let mut group = c.benchmark_group("training");
    group.sample_size(10);
    group.bench_function("sdca_2000x20", |b| {
        b.iter(|| trainer.fit(black_box(&features), black_box(&labels)))
    });
    group.finish();
}

fn bench_inference(c: &mut Criterion) {
    let reviews = generate_reviews(1_000);
    let model = TrainedModel::train(
        &reviews,
        &FeaturizerOptions::default(),
        &SdcaLogisticTrainer::default(),
    )
    .expect("training");
    let texts: Vec<String> = generate_reviews(5_000).into_iter().map(|e| e.text).collect();

    let mut group = c.benchmark_group("inference");
    group.bench_function("predict_one", |b| {
        b.iter(|| predict_one(&model, black_box("This was a very bad steak")))
    });

    let engine = InferenceEngine::new(Arc::new(model), &InferenceOptions::default())
        .expect("inference engine");
    group.throughput(Throughput::Elements(texts.len() as u64));
    group.bench_function("predict_many_5000", |b| {
        b.iter(|| engine.predict_many(black_box(&texts)))
    });
    group.finish();
}

criterion_group!(benches, bench_featurizer, bench_training, bench_inference);
criterion_main!(benches);
