use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use parenv::{filter_lines, retain_last_assignments};

fn bench_prepare(c: &mut Criterion) {
    let mut group = c.benchmark_group("filter_and_fold");
    for entries in [20usize, 2_000, 20_000] {
        let input = make_input(entries);
        group.bench_with_input(BenchmarkId::from_parameter(entries), &input, |b, input| {
            b.iter(|| retain_last_assignments(filter_lines(black_box(input))));
        });
    }
    group.finish();
}

// One key in eight repeats, one line in sixteen is a comment.
fn make_input(entries: usize) -> String {
    let mut content = String::with_capacity(entries * 24);
    for idx in 0..entries {
        if idx % 16 == 0 {
            content.push_str("# section\n");
        }
        let key = if idx % 8 == 0 { idx / 8 } else { idx };
        content.push_str(&format!("KEY_{key}=\"value_{idx}\"\n"));
    }
    content
}

criterion_group!(benches, bench_prepare);
criterion_main!(benches);
