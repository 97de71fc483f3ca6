//! End-to-end simulator behaviour: fusion, flushing, backends and errors

mod common;

use approx::assert_abs_diff_eq;
use common::{apply_reference, assert_states_close, c, pick_qubits, random_unitary};
use num_complex::Complex64;
use qfuse_backend::{
    BackendError, BackendKind, BackendRequest, CpuCapabilities, InstructionTier, OffloadDevice, Vendor,
};
use qfuse_fusion::{common as gates, DenseMatrix};
use qfuse_sim::{Simulator, SimulatorConfig, SimulatorError};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

#[test]
fn test_x_then_cnot_sets_two_low_bits() {
    let mut sim = Simulator::new(3, SimulatorConfig::serial()).unwrap();
    sim.apply_gate(gates::pauli_x(), &[0], &[]).unwrap();
    sim.apply_gate(gates::pauli_x(), &[1], &[0]).unwrap();

    let state = sim.state().unwrap();
    for (index, amplitude) in state.iter().enumerate() {
        let expected = if index == 0b011 { 1.0 } else { 0.0 };
        assert_abs_diff_eq!(amplitude.re, expected, epsilon = 1e-12);
        assert_abs_diff_eq!(amplitude.im, 0.0, epsilon = 1e-12);
    }
}

#[test]
fn test_fused_stream_matches_gate_by_gate_application() {
    let num_qubits = 8;
    let mut rng = StdRng::seed_from_u64(99);

    for config in [
        SimulatorConfig::serial(),
        SimulatorConfig::threaded().with_backend(BackendKind::ScalarThreaded).with_threads(3),
        SimulatorConfig::serial().with_fusion_range(2, 3),
        SimulatorConfig::serial().with_fusion_range(1, 1),
    ] {
        let mut sim = Simulator::new(num_qubits, config).unwrap();
        let mut expected = vec![c(0.0, 0.0); 1 << num_qubits];
        expected[0] = c(1.0, 0.0);

        for _ in 0..120 {
            let max_targets = sim.config().fusion_max_qubits.min(3);
            let num_targets = rng.gen_range(1..=max_targets);
            let num_controls = rng.gen_range(0..=2);
            let picked = pick_qubits(&mut rng, num_qubits, num_targets + num_controls);
            let (targets, controls) = picked.split_at(num_targets);
            let matrix = random_unitary(&mut rng, 1 << num_targets);

            apply_reference(&mut expected, &matrix, targets, controls);
            sim.apply_gate(matrix, targets, controls).unwrap();
        }

        assert_states_close(&sim.state().unwrap(), &expected, 1e-9);
    }
}

#[test]
fn test_vector_backend_matches_scalar_backend() {
    let Ok(mut vector) = Simulator::new(
        7,
        SimulatorConfig::threaded().with_backend(BackendKind::VectorThreaded),
    ) else {
        return;
    };
    let mut scalar = Simulator::new(7, SimulatorConfig::serial()).unwrap();

    let mut rng = StdRng::seed_from_u64(3);
    for _ in 0..60 {
        let num_targets = rng.gen_range(1..=2);
        let num_controls = rng.gen_range(0..=1);
        let picked = pick_qubits(&mut rng, 7, num_targets + num_controls);
        let (targets, controls) = picked.split_at(num_targets);
        let matrix = random_unitary(&mut rng, 1 << num_targets);

        vector.apply_gate(matrix.clone(), targets, controls).unwrap();
        scalar.apply_gate(matrix, targets, controls).unwrap();
    }

    assert_states_close(&vector.state().unwrap(), &scalar.state().unwrap(), 1e-10);
}

#[test]
fn test_six_target_gate_fails_without_touching_state() {
    let mut sim = Simulator::new(8, SimulatorConfig::serial()).unwrap();
    sim.apply_gate(gates::hadamard(), &[7], &[]).unwrap();
    let before = sim.state().unwrap();

    let err = sim
        .apply_gate(DenseMatrix::identity(64), &[0, 1, 2, 3, 4, 5], &[])
        .unwrap_err();
    assert!(matches!(
        err,
        SimulatorError::Capacity {
            requested: 6,
            limit: 5,
            ..
        }
    ));
    assert_eq!(sim.pending_gates(), 0);
    assert_eq!(sim.state().unwrap(), before);
}

#[test]
fn test_vector_request_on_scalar_cpu_is_configuration_error() {
    for kind in [BackendKind::VectorSerial, BackendKind::VectorThreaded] {
        let result = Simulator::with_capabilities(
            4,
            SimulatorConfig::new().with_backend(kind),
            CpuCapabilities::scalar_only(),
        );
        let err = result.err().unwrap();
        assert!(err.is_configuration(), "{}", err);
        assert!(matches!(
            err,
            SimulatorError::Configuration(BackendError::Unavailable { .. })
        ));
    }
}

#[test]
fn test_auto_on_scalar_cpu_uses_threaded_scalar() {
    let sim = Simulator::with_capabilities(4, SimulatorConfig::new(), CpuCapabilities::scalar_only()).unwrap();
    assert_eq!(sim.backend(), BackendKind::ScalarThreaded);
    assert_eq!(sim.instruction_tier(), InstructionTier::Scalar);
}

#[test]
fn test_backend_request_from_environment_value() {
    assert_eq!(BackendRequest::from_env_value(None).unwrap(), BackendRequest::Auto);
    assert_eq!(
        BackendRequest::from_env_value(Some("SCALAR_SERIAL")).unwrap(),
        BackendRequest::Explicit(BackendKind::ScalarSerial)
    );
    assert_eq!(
        BackendRequest::from_env_value(Some("OFFLOAD_NVIDIA")).unwrap(),
        BackendRequest::Explicit(BackendKind::Offload(Vendor::Nvidia))
    );
    assert!(BackendRequest::from_env_value(Some("QUANTUM_MAGIC")).is_err());

    let sim = Simulator::new(
        2,
        SimulatorConfig::new().with_backend(BackendRequest::from_env_value(Some("SCALAR_SERIAL")).unwrap()),
    )
    .unwrap();
    assert_eq!(sim.backend(), BackendKind::ScalarSerial);
}

#[test]
fn test_offload_without_device_is_configuration_error() {
    let result = Simulator::new(
        3,
        SimulatorConfig::new().with_backend(BackendKind::Offload(Vendor::Amd)),
    );
    assert!(result.err().unwrap().is_configuration());
}

/// Device that runs the operator on the host and counts calls
#[derive(Debug, Default)]
struct HostDevice {
    calls: AtomicUsize,
    fail: bool,
}

impl OffloadDevice for HostDevice {
    fn vendor(&self) -> Vendor {
        Vendor::Intel
    }

    fn name(&self) -> &str {
        "host-loopback"
    }

    fn apply(
        &self,
        state: &mut [Complex64],
        matrix: &[Complex64],
        control_mask: usize,
        qubits: &[usize],
    ) -> qfuse_backend::Result<()> {
        if self.fail {
            return Err(BackendError::OffloadFailed("device lost".to_string()));
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        let dim = 1 << qubits.len();
        let matrix = DenseMatrix::from_row_major(dim, matrix.to_vec())
            .map_err(|e| BackendError::OffloadFailed(e.to_string()))?;
        let controls: Vec<usize> = (0..usize::BITS as usize)
            .filter(|&q| (control_mask >> q) & 1 == 1)
            .collect();
        apply_reference(state, &matrix, qubits, &controls);
        Ok(())
    }
}

#[test]
fn test_offload_device_receives_fused_operators() {
    let device = Arc::new(HostDevice::default());
    let mut sim = Simulator::new(
        3,
        SimulatorConfig::new()
            .with_backend(BackendKind::Offload(Vendor::Intel))
            .with_offload_device(device.clone()),
    )
    .unwrap();
    assert_eq!(sim.backend(), BackendKind::Offload(Vendor::Intel));

    sim.apply_gate(gates::pauli_x(), &[0], &[]).unwrap();
    sim.apply_gate(gates::pauli_x(), &[1], &[0]).unwrap();
    assert_abs_diff_eq!(sim.amplitude(0b011).unwrap().re, 1.0, epsilon = 1e-12);
    assert_eq!(device.calls.load(Ordering::SeqCst), 1);

    let auto = Simulator::new(2, SimulatorConfig::new().with_offload_device(device)).unwrap();
    assert_eq!(auto.backend(), BackendKind::Offload(Vendor::Intel));
}

#[test]
fn test_offload_failure_surfaces_as_error() {
    let device = Arc::new(HostDevice {
        fail: true,
        ..Default::default()
    });
    let mut sim = Simulator::new(
        2,
        SimulatorConfig::new()
            .with_backend(BackendKind::Offload(Vendor::Intel))
            .with_offload_device(device),
    )
    .unwrap();

    sim.apply_gate(gates::hadamard(), &[0], &[]).unwrap();
    let err = sim.run().unwrap_err();
    assert!(matches!(
        err,
        SimulatorError::Configuration(BackendError::OffloadFailed(_))
    ));
}

#[test]
fn test_measurement_statistics_follow_amplitudes() {
    let mut rng = StdRng::seed_from_u64(1);
    let mut ones = 0;
    let trials = 400;
    for _ in 0..trials {
        let mut sim = Simulator::new(1, SimulatorConfig::serial().with_seed(rng.gen())).unwrap();
        sim.apply_gate(gates::rotation_y(2.0 * (0.25f64).sqrt().asin()), &[0], &[])
            .unwrap();
        if sim.measure(&[0]).unwrap()[0] {
            ones += 1;
        }
        assert!(sim.is_classical(0, 1e-12).unwrap());
    }
    let fraction = ones as f64 / trials as f64;
    assert!((fraction - 0.25).abs() < 0.08, "fraction of ones {}", fraction);
}
