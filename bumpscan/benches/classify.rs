use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use bumpscan::{classify, EfficiencyGrid, InjectionGrids, Thresholds};
use common::Grid;

const ROWS: usize = 336;
const COLS: usize = 432;

fn chip_grids() -> [EfficiencyGrid; 3] {
    let self_eff = Grid::from_fn(ROWS, COLS, |row, col| {
        if (row * COLS + col) % 97 == 0 {
            0.2
        } else {
            0.98
        }
    });
    let coupled = Grid::from_fn(ROWS, COLS, |row, col| if (row + 3 * col) % 53 == 0 { 0.1 } else { 0.85 });
    let uncoupled = Grid::from_fn(ROWS, COLS, |row, col| if (row + 3 * col) % 53 == 0 { 0.05 } else { 0.7 });
    [self_eff, coupled, uncoupled]
}

fn bench_classify(c: &mut Criterion) {
    let [self_eff, coupled, uncoupled] = chip_grids();
    let thresholds = Thresholds::default();

    c.bench_function("classify_336x432", |b| {
        b.iter(|| {
            let result = classify(
                black_box(&InjectionGrids::new(&self_eff, &coupled, &uncoupled)),
                &thresholds,
            )
            .expect("classification of a well-formed chip cannot fail");
            black_box(result);
        })
    });
}

criterion_group!(benches, bench_classify);
criterion_main!(benches);
