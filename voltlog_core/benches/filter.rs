use criterion::{Criterion, black_box, criterion_group, criterion_main};
use voltlog_core::filter::{Kalman, Savgol};

fn noisy_window(n: usize) -> Vec<f64> {
    (0..n)
        .map(|i| {
            let t = i as f64 / 32.0;
            1200.0 * (t * 2.0).sin() + ((i * 2654435761) % 1000) as f64 * 0.05
        })
        .collect()
}

fn bench_savgol(c: &mut Criterion) {
    let filter = Savgol::new(20, 2).unwrap();
    let window = noisy_window(500);
    c.bench_function("savgol_smooth_500", |b| {
        b.iter(|| filter.smooth(black_box(&window)))
    });

    let small = noisy_window(100);
    c.bench_function("savgol_smooth_100", |b| {
        b.iter(|| filter.smooth(black_box(&small)))
    });
}

fn bench_kalman(c: &mut Criterion) {
    let window = noisy_window(500);
    c.bench_function("kalman_update_500", |b| {
        b.iter(|| {
            let mut k = Kalman::new(1.0, 5.0, 500);
            for &z in &window {
                black_box(k.update(z));
            }
        })
    });
}

criterion_group!(benches, bench_savgol, bench_kalman);
criterion_main!(benches);
