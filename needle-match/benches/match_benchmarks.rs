use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use needle_core::Descriptor;
use needle_match::{is_found, BruteForceMatcher, RatioTest};

/// Deterministic pseudo-random descriptors
fn create_descriptors(n: usize, seed: u64) -> Vec<Descriptor> {
    let mut state = seed | 1;
    (0..n)
        .map(|_| {
            let mut d = [0u8; 32];
            for byte in d.iter_mut() {
                state ^= state << 13;
                state ^= state >> 7;
                state ^= state << 17;
                *byte = (state >> 24) as u8;
            }
            d
        })
        .collect()
}

fn bench_knn(c: &mut Criterion) {
    let mut group = c.benchmark_group("knn_match");
    let matcher = BruteForceMatcher::default();

    for &(n_query, n_train) in &[(50, 200), (500, 500), (500, 2000)] {
        let query = create_descriptors(n_query, 1);
        let train = create_descriptors(n_train, 2);
        group.bench_with_input(
            BenchmarkId::new("k2", format!("{}x{}", n_query, n_train)),
            &(query, train),
            |b, (query, train)| b.iter(|| black_box(matcher.knn_match(black_box(query), black_box(train)))),
        );
    }

    group.finish();
}

fn bench_ratio_and_decision(c: &mut Criterion) {
    let query = create_descriptors(500, 3);
    let train = create_descriptors(2000, 4);
    let knn = BruteForceMatcher::default().knn_match(&query, &train);
    let test = RatioTest::default();

    c.bench_function("ratio_test_500", |b| {
        b.iter(|| {
            let accepted = test.filter(black_box(&knn), train.len());
            black_box(is_found(accepted.len(), 30.0))
        })
    });
}

criterion_group!(benches, bench_knn, bench_ratio_and_decision);
criterion_main!(benches);
