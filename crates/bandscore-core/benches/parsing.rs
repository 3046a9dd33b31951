use criterion::{black_box, criterion_group, criterion_main, Criterion};

use bandscore_core::generator::{Blueprint, TestGenerator};
use bandscore_core::pool::{parse_pool_str, validate_pool};

fn bench_pool_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_parsing");

    let small = generate_pool_toml(5);
    let medium = generate_pool_toml(50);
    let large = generate_pool_toml(200);

    group.bench_function("5_per_kind", |b| {
        b.iter(|| parse_pool_str(black_box(&small), black_box("bench.toml".as_ref())))
    });

    group.bench_function("50_per_kind", |b| {
        b.iter(|| parse_pool_str(black_box(&medium), black_box("bench.toml".as_ref())))
    });

    group.bench_function("200_per_kind", |b| {
        b.iter(|| parse_pool_str(black_box(&large), black_box("bench.toml".as_ref())))
    });

    group.finish();
}

fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    let pool = parse_pool_str(&generate_pool_toml(50), "bench.toml".as_ref()).unwrap();

    group.bench_function("validate_150_items", |b| {
        b.iter(|| validate_pool(black_box(&pool)))
    });

    group.bench_function("generate_from_150_items", |b| {
        let blueprint = Blueprint::from_counts([
            ("multiple-choice-single".parse().unwrap(), 10),
            ("reading-fill-in-blanks".parse().unwrap(), 10),
            ("repeat-sentence".parse().unwrap(), 10),
        ]);
        let mut generator = TestGenerator::seeded(blueprint, 42);
        b.iter(|| generator.generate(black_box(&pool)))
    });

    group.finish();
}

fn generate_pool_toml(per_kind: usize) -> String {
    let mut s = String::new();
    s.push_str(
        r#"[pool]
id = "bench"
name = "Benchmark"
"#,
    );
    for i in 0..per_kind {
        s.push_str(&format!(
            r#"
[[items]]
id = "mcs-{i}"
kind = "multiple-choice-single"
prompt = "Which statement matches passage {i}?"
body = """
Passage number {i} describes the migration of birds across the northern coast.
"""
options = ["A", "B", "C", "D"]
answer = ["C"]

[[items]]
id = "rfib-{i}"
kind = "reading-fill-in-blanks"
prompt = "Complete passage {i}"
body = "The ___ rose over the ___ hills."
answer = ["sun", "distant"]

[[items]]
id = "rs-{i}"
kind = "repeat-sentence"
prompt = "Repeat the sentence"
audio_script = "Sentence number {i} is read aloud once."
"#
        ));
    }
    s
}

criterion_group!(benches, bench_pool_parsing, bench_generation);
criterion_main!(benches);
