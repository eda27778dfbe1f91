//! Fused-operator evaluation
//!
//! The simulator never applies buffered gates directly: it feeds each
//! cluster into a [`FusedEvaluator`] and asks for one flush per cluster.
//! The shipped [`GateFuser`] composes the staged gates into a single
//! `2^k × 2^k` operator over the cluster's `k` qubits and applies it in
//! one gather/mat-vec/scatter sweep, so per-amplitude work is paid once
//! per cluster instead of once per gate.

use fuseq_core::Matrix2x2;
use fuseq_state::{make_mask, set_register, StateVector};
use num_complex::Complex64;
use smallvec::SmallVec;

/// Consumer of staged gates, flushed one cluster at a time
///
/// The simulator pairs each cluster traversal with exactly one `flush`
/// call and never inspects staged state. Implementations may flush
/// internally if staging a gate would exceed their own bounds.
pub trait FusedEvaluator {
    /// Maximum number of distinct qubits one fused block may touch
    fn max_span(&self) -> usize;

    /// Maximum number of gates one fused block may hold
    fn max_depth(&self) -> usize;

    /// Advise whether the caller should flush before staging this gate
    fn should_flush(&self, state: &StateVector, controls: &[usize], target: usize) -> bool;

    /// Stage an uncontrolled one-qubit gate
    fn apply(&mut self, state: &mut StateVector, matrix: &Matrix2x2, target: usize);

    /// Stage a multiply controlled one-qubit gate
    fn apply_controlled(
        &mut self,
        state: &mut StateVector,
        matrix: &Matrix2x2,
        controls: &[usize],
        target: usize,
    );

    /// Materialize all staged gates onto the amplitude vector
    fn flush(&mut self, state: &mut StateVector);

    /// Discard staged state without applying it
    fn reset(&mut self);
}

#[derive(Clone, Debug)]
struct StagedGate {
    controls: SmallVec<[usize; 2]>,
    target: usize,
    matrix: Matrix2x2,
}

/// Default [`FusedEvaluator`]: composes staged gates into one operator
pub struct GateFuser {
    max_span: usize,
    max_depth: usize,
    staged: Vec<StagedGate>,
    /// Sorted qubits the staged gates touch
    touched: SmallVec<[usize; 4]>,
}

impl GateFuser {
    pub fn new(max_span: usize, max_depth: usize) -> Self {
        Self {
            max_span,
            max_depth,
            staged: Vec::new(),
            touched: SmallVec::new(),
        }
    }

    /// Whether staging a gate over these qubits would exceed the bounds
    fn would_exceed(&self, controls: &[usize], target: usize) -> bool {
        if self.staged.len() + 1 > self.max_depth {
            return true;
        }
        let mut span = self.touched.len();
        for q in controls.iter().chain(std::iter::once(&target)) {
            if self.touched.binary_search(q).is_err() {
                span += 1;
            }
        }
        span > self.max_span
    }

    fn stage(&mut self, controls: &[usize], target: usize, matrix: &Matrix2x2) {
        for q in controls.iter().chain(std::iter::once(&target)) {
            if let Err(pos) = self.touched.binary_search(q) {
                self.touched.insert(pos, *q);
            }
        }
        self.staged.push(StagedGate {
            controls: SmallVec::from_slice(controls),
            target,
            matrix: *matrix,
        });
    }
}

impl Default for GateFuser {
    fn default() -> Self {
        Self::new(4, 999)
    }
}

/// Controlled one-qubit gate on a small dense block
fn apply_block_gate(
    block: &mut [Complex64],
    matrix: &Matrix2x2,
    target_pos: usize,
    control_mask: usize,
) {
    let tbit = 1usize << target_pos;
    for i in 0..block.len() {
        if i & tbit == 0 && i & control_mask == control_mask {
            let j = i | tbit;
            let a0 = block[i];
            let a1 = block[j];
            block[i] = matrix[0][0] * a0 + matrix[0][1] * a1;
            block[j] = matrix[1][0] * a0 + matrix[1][1] * a1;
        }
    }
}

impl FusedEvaluator for GateFuser {
    fn max_span(&self) -> usize {
        self.max_span
    }

    fn max_depth(&self) -> usize {
        self.max_depth
    }

    fn should_flush(&self, _state: &StateVector, controls: &[usize], target: usize) -> bool {
        self.would_exceed(controls, target)
    }

    fn apply(&mut self, state: &mut StateVector, matrix: &Matrix2x2, target: usize) {
        if self.would_exceed(&[], target) {
            self.flush(state);
        }
        self.stage(&[], target, matrix);
    }

    fn apply_controlled(
        &mut self,
        state: &mut StateVector,
        matrix: &Matrix2x2,
        controls: &[usize],
        target: usize,
    ) {
        if self.would_exceed(controls, target) {
            self.flush(state);
        }
        self.stage(controls, target, matrix);
    }

    fn flush(&mut self, state: &mut StateVector) {
        if self.staged.is_empty() {
            return;
        }

        let qubits = self.touched.clone();
        let k = qubits.len();
        let dim = 1usize << k;

        // Compose the block operator column by column: staging order is
        // application order, so each gate left-multiplies the operator.
        let zero = Complex64::new(0.0, 0.0);
        let mut op = vec![zero; dim * dim];
        for c in 0..dim {
            op[c * dim + c] = Complex64::new(1.0, 0.0);
        }
        for gate in &self.staged {
            let target_pos = match qubits.binary_search(&gate.target) {
                Ok(pos) => pos,
                Err(_) => continue,
            };
            let mut control_mask = 0usize;
            for control in &gate.controls {
                if let Ok(pos) = qubits.binary_search(control) {
                    control_mask |= 1 << pos;
                }
            }
            for col in op.chunks_exact_mut(dim) {
                apply_block_gate(col, &gate.matrix, target_pos, control_mask);
            }
        }

        // One gather/mat-vec/scatter sweep over the amplitude vector.
        let qmask = make_mask(&qubits);
        let spread: Vec<usize> = (0..dim)
            .map(|r| set_register(&qubits, qmask, r, 0))
            .collect();
        let mut gathered = vec![zero; dim];
        let amps = state.amplitudes_mut();
        for base in 0..amps.len() {
            if base & qmask != 0 {
                continue;
            }
            for (r, slot) in gathered.iter_mut().enumerate() {
                *slot = amps[base | spread[r]];
            }
            for r in 0..dim {
                let mut acc = zero;
                for c in 0..dim {
                    acc += op[c * dim + r] * gathered[c];
                }
                amps[base | spread[r]] = acc;
            }
        }

        self.staged.clear();
        self.touched.clear();
    }

    fn reset(&mut self) {
        self.staged.clear();
        self.touched.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use fuseq_core::matrices;

    const H: f64 = std::f64::consts::FRAC_1_SQRT_2;

    #[test]
    fn test_flush_without_staged_gates_is_noop() {
        let mut state = StateVector::new(1).unwrap();
        let mut fuser = GateFuser::default();
        fuser.flush(&mut state);
        assert_relative_eq!(state.amplitudes()[0].re, 1.0);
    }

    #[test]
    fn test_single_gate_flush() {
        let mut state = StateVector::new(1).unwrap();
        let mut fuser = GateFuser::default();

        fuser.apply(&mut state, &matrices::hadamard(), 0);
        // Nothing applied until the flush.
        assert_relative_eq!(state.amplitudes()[0].re, 1.0);

        fuser.flush(&mut state);
        assert_relative_eq!(state.amplitudes()[0].re, H, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[1].re, H, epsilon = 1e-12);
    }

    #[test]
    fn test_fused_bell_preparation() {
        let mut state = StateVector::new(2).unwrap();
        let mut fuser = GateFuser::default();

        fuser.apply(&mut state, &matrices::hadamard(), 0);
        fuser.apply_controlled(&mut state, &matrices::pauli_x(), &[0], 1);
        fuser.flush(&mut state);

        assert_relative_eq!(state.amplitudes()[0].re, H, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[1].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[2].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[3].re, H, epsilon = 1e-12);
    }

    #[test]
    fn test_staging_order_is_application_order() {
        // H then Z on the same qubit: Z·H|0⟩ = (|0⟩ - |1⟩)/√2.
        let mut state = StateVector::new(1).unwrap();
        let mut fuser = GateFuser::default();

        fuser.apply(&mut state, &matrices::hadamard(), 0);
        fuser.apply(&mut state, &matrices::pauli_z(), 0);
        fuser.flush(&mut state);

        assert_relative_eq!(state.amplitudes()[0].re, H, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[1].re, -H, epsilon = 1e-12);
    }

    #[test]
    fn test_control_above_target() {
        // CX with control on the high qubit: |10⟩ → |11⟩.
        let mut state = StateVector::new(2).unwrap();
        state.amplitudes_mut()[0] = Complex64::new(0.0, 0.0);
        state.amplitudes_mut()[2] = Complex64::new(1.0, 0.0);

        let mut fuser = GateFuser::default();
        fuser.apply_controlled(&mut state, &matrices::pauli_x(), &[1], 0);
        fuser.flush(&mut state);

        assert_relative_eq!(state.amplitudes()[2].norm(), 0.0, epsilon = 1e-12);
        assert_relative_eq!(state.amplitudes()[3].re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_internal_flush_on_span_overflow() {
        // Span 1: staging the H on qubit 1 must flush the H on qubit 0
        // first; the end state is H⊗H|00⟩ either way.
        let mut state = StateVector::new(2).unwrap();
        let mut fuser = GateFuser::new(1, 999);

        fuser.apply(&mut state, &matrices::hadamard(), 0);
        fuser.apply(&mut state, &matrices::hadamard(), 1);
        // The qubit-0 block was already applied.
        assert_relative_eq!(state.amplitudes()[0].re, H, epsilon = 1e-12);
        fuser.flush(&mut state);

        for amp in state.amplitudes() {
            assert_relative_eq!(amp.re, 0.5, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_should_flush_advises_on_overflow() {
        let mut state = StateVector::new(2).unwrap();
        let mut fuser = GateFuser::new(1, 999);

        fuser.apply(&mut state, &matrices::hadamard(), 0);
        assert!(fuser.should_flush(&state, &[], 1));
        assert!(!fuser.should_flush(&state, &[], 0));
    }

    #[test]
    fn test_reset_discards_staged_gates() {
        let mut state = StateVector::new(1).unwrap();
        let mut fuser = GateFuser::default();

        fuser.apply(&mut state, &matrices::pauli_x(), 0);
        fuser.reset();
        fuser.flush(&mut state);

        assert_relative_eq!(state.amplitudes()[0].re, 1.0);
    }

    #[test]
    fn test_fused_matches_sequential() {
        // A mixed block over 3 qubits, fused vs gate-at-a-time.
        let gates: Vec<(Vec<usize>, usize, Matrix2x2)> = vec![
            (vec![], 0, matrices::hadamard()),
            (vec![], 1, matrices::ry(0.3)),
            (vec![0], 2, matrices::pauli_x()),
            (vec![2], 1, matrices::rz(0.7)),
            (vec![], 2, matrices::phase(0.2)),
        ];

        let mut fused_state = StateVector::new(3).unwrap();
        let mut fuser = GateFuser::default();
        for (controls, target, matrix) in &gates {
            fuser.apply_controlled(&mut fused_state, matrix, controls, *target);
        }
        fuser.flush(&mut fused_state);

        let mut serial_state = StateVector::new(3).unwrap();
        let mut serial = GateFuser::default();
        for (controls, target, matrix) in &gates {
            serial.apply_controlled(&mut serial_state, matrix, controls, *target);
            serial.flush(&mut serial_state);
        }

        for (a, b) in fused_state.amplitudes().iter().zip(serial_state.amplitudes()) {
            assert_relative_eq!(a.re, b.re, epsilon = 1e-12);
            assert_relative_eq!(a.im, b.im, epsilon = 1e-12);
        }
    }
}
