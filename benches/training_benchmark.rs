//! Benchmark of candidate fitting and ONNX graph construction
//!
//! Run with: cargo bench --bench training_benchmark

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::prelude::*;
use rand::SeedableRng;

use fraudtrain::export::{build_pipeline_graph, ModelMetadata};
use fraudtrain::models::CandidateKind;
use fraudtrain::pipeline::StandardScaler;

/// Generate scaled three-feature rows with a ~5% fraud rate
fn generate_training_rows(n_rows: usize, seed: u64) -> (Vec<Vec<f64>>, Vec<u8>) {
    let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
    let mut x = Vec::with_capacity(n_rows);
    let mut y = Vec::with_capacity(n_rows);

    for i in 0..n_rows {
        // Guarantee both classes even for tiny sizes
        let fraud = i % 20 == 0;
        let shift = if fraud { 0.35 } else { 0.0 };
        x.push(vec![
            rng.gen::<f64>() * 0.6 + shift,
            rng.gen::<f64>() * 0.7 + shift * 0.8,
            rng.gen::<f64>() * 0.5 + shift * 1.2,
        ]);
        y.push(u8::from(fraud));
    }

    let scaled = StandardScaler::fit_transform(&x)
        .expect("benchmark rows are rectangular")
        .1;
    (scaled, y)
}

/// Fit time per candidate for growing training sets
fn benchmark_candidate_fit(c: &mut Criterion) {
    let mut group = c.benchmark_group("candidate_fit");
    group.sample_size(10);

    for n_rows in [1_000, 5_000, 20_000] {
        let (x, y) = generate_training_rows(n_rows, 42);
        group.throughput(Throughput::Elements(n_rows as u64));

        for kind in CandidateKind::ALL {
            let spec = kind.build(100, 42);
            group.bench_with_input(
                BenchmarkId::new(kind.cli_name(), n_rows),
                &(x.clone(), y.clone()),
                |b, (x, y)| b.iter(|| spec.fit(black_box(x), black_box(y))),
            );
        }
    }

    group.finish();
}

/// Cost of composing and encoding the export graph for each family
fn benchmark_graph_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("onnx_graph_build");
    let (x, y) = generate_training_rows(5_000, 7);
    let scaler = StandardScaler {
        mean: vec![0.0; 3],
        scale: vec![1.0; 3],
    };
    let features: Vec<String> = ["velocity_score", "rule_score", "ml_score"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    for kind in CandidateKind::ALL {
        let model = kind.build(100, 42).fit(&x, &y).expect("fit succeeds");
        let metadata = ModelMetadata::now(kind, 0.9);
        group.bench_function(BenchmarkId::from_parameter(kind.cli_name()), |b| {
            b.iter(|| build_pipeline_graph(black_box(&model), &scaler, &features, &metadata))
        });
    }

    group.finish();
}

criterion_group!(benches, benchmark_candidate_fit, benchmark_graph_build);
criterion_main!(benches);
