//! Kernel throughput per target count and backend

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_complex::Complex64;
use qfuse_backend::{BackendKind, BackendRequest, BackendSelector};
use qfuse_fusion::DenseMatrix;
use qfuse_sim::KernelDispatcher;

const NUM_QUBITS: usize = 20;

fn dense_operator(num_targets: usize) -> DenseMatrix {
    // A real rotation in every 2x2 block keeps the operator unitary and dense enough.
    let dim = 1 << num_targets;
    let (s, c) = 0.3f64.sin_cos();
    let mut matrix = DenseMatrix::zeros(dim);
    for block in (0..dim).step_by(2) {
        matrix.set(block, block, Complex64::new(c, 0.0));
        matrix.set(block, block + 1, Complex64::new(-s, 0.0));
        matrix.set(block + 1, block, Complex64::new(s, 0.0));
        matrix.set(block + 1, block + 1, Complex64::new(c, 0.0));
    }
    matrix
}

fn bench_kernels(c: &mut Criterion) {
    let mut group = c.benchmark_group("Kernels");
    let selector = BackendSelector::detect();
    let amplitude = ((1u64 << NUM_QUBITS) as f64).sqrt().recip();
    let mut state = vec![Complex64::new(amplitude, 0.0); 1 << NUM_QUBITS];

    for kind in BackendKind::CPU {
        let Ok(backend) = selector.select(BackendRequest::Explicit(kind)) else {
            continue;
        };
        let Ok(dispatcher) = KernelDispatcher::new(&backend, 0) else {
            continue;
        };

        for k in 1..=5 {
            let matrix = dense_operator(k);
            let targets: Vec<usize> = (0..k).map(|l| l * 3 + 1).collect();
            group.bench_with_input(BenchmarkId::new(kind.to_string(), k), &k, |b, _| {
                b.iter(|| {
                    dispatcher
                        .apply(black_box(&mut state), &matrix, 0, &targets)
                        .ok()
                })
            });
        }

        let matrix = dense_operator(2);
        group.bench_function(BenchmarkId::new(format!("{}_controlled", kind), 2), |b| {
            b.iter(|| dispatcher.apply(black_box(&mut state), &matrix, 1 << 19, &[0, 5]).ok())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_kernels);
criterion_main!(benches);
