//! Shared helpers for the simulator integration tests

#![allow(dead_code)]

use num_complex::Complex64;
use qfuse_fusion::DenseMatrix;
use rand::rngs::StdRng;
use rand::Rng;

pub fn c(re: f64, im: f64) -> Complex64 {
    Complex64::new(re, im)
}

/// Random normalized state on `num_qubits` qubits
pub fn random_state(rng: &mut StdRng, num_qubits: usize) -> Vec<Complex64> {
    let mut state: Vec<Complex64> = (0..1usize << num_qubits)
        .map(|_| c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
        .collect();
    let norm = state.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
    for a in &mut state {
        *a /= norm;
    }
    state
}

/// Random unitary of dimension `dim`, by Gram-Schmidt on random columns
pub fn random_unitary(rng: &mut StdRng, dim: usize) -> DenseMatrix {
    let mut columns: Vec<Vec<Complex64>> = Vec::with_capacity(dim);
    while columns.len() < dim {
        let mut v: Vec<Complex64> = (0..dim)
            .map(|_| c(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0)))
            .collect();
        for u in &columns {
            let overlap: Complex64 = u.iter().zip(&v).map(|(a, b)| a.conj() * b).sum();
            for (x, y) in v.iter_mut().zip(u) {
                *x -= overlap * y;
            }
        }
        let norm = v.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if norm < 1e-6 {
            continue;
        }
        for x in &mut v {
            *x /= norm;
        }
        columns.push(v);
    }

    let mut matrix = DenseMatrix::zeros(dim);
    for (col, column) in columns.iter().enumerate() {
        for (row, &value) in column.iter().enumerate() {
            matrix.set(row, col, value);
        }
    }
    matrix
}

/// Straightforward application of `matrix` over `targets` where all `controls` are set
pub fn apply_reference(state: &mut [Complex64], matrix: &DenseMatrix, targets: &[usize], controls: &[usize]) {
    let target_mask = targets.iter().fold(0usize, |m, &q| m | (1 << q));
    let control_mask = controls.iter().fold(0usize, |m, &q| m | (1 << q));
    let dim = 1usize << targets.len();

    for base in 0..state.len() {
        if base & target_mask != 0 || base & control_mask != control_mask {
            continue;
        }
        let index = |j: usize| {
            targets
                .iter()
                .enumerate()
                .filter(|(l, _)| (j >> l) & 1 == 1)
                .fold(base, |acc, (_, &q)| acc | (1 << q))
        };
        let input: Vec<Complex64> = (0..dim).map(|j| state[index(j)]).collect();
        for row in 0..dim {
            state[index(row)] = (0..dim).map(|col| matrix.get(row, col) * input[col]).sum();
        }
    }
}

/// `count` distinct qubits out of `num_qubits`, in random order
pub fn pick_qubits(rng: &mut StdRng, num_qubits: usize, count: usize) -> Vec<usize> {
    let mut pool: Vec<usize> = (0..num_qubits).collect();
    let mut picked = Vec::with_capacity(count);
    for _ in 0..count {
        let i = rng.gen_range(0..pool.len());
        picked.push(pool.swap_remove(i));
    }
    picked
}

pub fn assert_states_close(actual: &[Complex64], expected: &[Complex64], epsilon: f64) {
    assert_eq!(actual.len(), expected.len());
    for (i, (a, e)) in actual.iter().zip(expected).enumerate() {
        assert!(
            (a - e).norm() < epsilon,
            "amplitude {} differs: {} vs {}",
            i,
            a,
            e
        );
    }
}
