//! Measurement and collapse kernels over the amplitude vector
//!
//! Kernels are pure sweeps over the amplitudes: they never buffer gates
//! and never consult the logical qubit map. All qubit arguments here are
//! physical bit positions. Large sweeps parallelize with rayon; below
//! the threshold the serial path avoids fork/join overhead.

use crate::error::Result;
use crate::state_vector::StateVector;
use fuseq_core::{Matrix2x2, Pauli};
use num_complex::Complex64;
use rayon::prelude::*;

/// Minimum amplitude count before sweeps are parallelized
const PARALLEL_THRESHOLD: usize = 1 << 14;

/// Tolerance for deciding a qubit is classical in the computational basis
const CLASSICAL_TOLERANCE: f64 = 1e-10;

/// Outcome of the classical-value probe on a single qubit
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum ClassicalValue {
    /// The qubit is |0⟩ within tolerance
    Zero,
    /// The qubit is |1⟩ within tolerance
    One,
    /// The qubit carries weight on both basis values
    Mixed,
}

/// Bit mask with a 1 at every position in `qs`
#[inline]
pub fn make_mask(qs: &[usize]) -> usize {
    qs.iter().fold(0usize, |mask, &q| mask | (1usize << q))
}

/// Pack the bits of `basis_state` at positions `qs` into the low bits
#[inline]
pub fn get_register(qs: &[usize], basis_state: usize) -> usize {
    let mut result = 0usize;
    for (i, &q) in qs.iter().enumerate() {
        result |= ((basis_state >> q) & 1) << i;
    }
    result
}

/// Scatter the low bits of `register` back to positions `qs` of `original`
///
/// `qmask` must be `make_mask(qs)`; all other bits of `original` are
/// preserved.
#[inline]
pub fn set_register(qs: &[usize], qmask: usize, register: usize, original: usize) -> usize {
    let mut result = original & !qmask;
    for (i, &q) in qs.iter().enumerate() {
        result |= ((register >> i) & 1) << q;
    }
    result
}

/// Pure numerical operations the simulator delegates amplitude work to
///
/// The shipped implementation is [`CpuKernels`]; the trait seam exists so
/// an accelerated backend can replace the sweeps without touching the
/// scheduling layer.
pub trait Kernels {
    /// Probability of measuring `q` as 1
    fn probability(&self, state: &StateVector, q: usize) -> f64;

    /// Probability of an odd-parity joint Z measurement over `qs`
    fn joint_probability(&self, state: &StateVector, qs: &[usize]) -> f64;

    /// Probability of an odd-parity joint measurement with per-qubit bases
    ///
    /// Qubits with basis [`Pauli::I`] are spectators. `bases` and `qs`
    /// must have equal length.
    fn joint_probability_in_basis(&self, state: &StateVector, bases: &[Pauli], qs: &[usize])
        -> f64;

    /// Collapse qubit `q` onto `value`
    ///
    /// Without `compact` the non-matching amplitudes are zeroed and the
    /// vector keeps its size (the caller renormalizes). With `compact`
    /// the measured bit position is deleted from the index space, which
    /// halves the vector; this is the truncation `release` relies on.
    fn collapse(&self, state: &mut StateVector, q: usize, value: bool, compact: bool)
        -> Result<()>;

    /// Collapse a joint Z measurement over `qs` onto the given parity
    fn joint_collapse(&self, state: &mut StateVector, qs: &[usize], value: bool);

    /// Rescale the amplitudes to unit norm
    fn normalize(&self, state: &mut StateVector);

    /// Whether qubit `q` is classical in the computational basis
    fn is_classical(&self, state: &StateVector, q: usize) -> bool;

    /// Classical value of qubit `q`, or [`ClassicalValue::Mixed`]
    fn get_value(&self, state: &StateVector, q: usize) -> ClassicalValue;

    /// Extract the subsystem wavefunction over `qs` if the state factorizes
    ///
    /// Returns true and fills `out` (normalized, length `2^|qs|`, up to a
    /// global phase) when the state is a product of the `qs` subsystem
    /// and its complement within `tolerance`; returns false otherwise.
    fn subsystem_wavefunction(
        &self,
        state: &StateVector,
        qs: &[usize],
        out: &mut Vec<Complex64>,
        tolerance: f64,
    ) -> bool;

    /// Apply exp(i·phi·P) for the Pauli string P over `targets`,
    /// restricted to basis states where every bit in `controls` is set
    ///
    /// `bases` and `targets` must have equal length; controls must be
    /// disjoint from targets.
    fn apply_controlled_exp(
        &self,
        state: &mut StateVector,
        bases: &[Pauli],
        phi: f64,
        controls: &[usize],
        targets: &[usize],
    );

    /// Bit mask with a 1 at every position in `qs`
    fn make_mask(&self, qs: &[usize]) -> usize {
        make_mask(qs)
    }
}

/// Portable CPU implementation of [`Kernels`]
#[derive(Copy, Clone, Debug, Default)]
pub struct CpuKernels;

impl CpuKernels {
    pub fn new() -> Self {
        Self
    }
}

/// Sum of |amplitude|² over indices selected by `pred`
fn masked_norm_sqr<P>(amps: &[Complex64], pred: P) -> f64
where
    P: Fn(usize) -> bool + Sync,
{
    if amps.len() >= PARALLEL_THRESHOLD {
        amps.par_iter()
            .enumerate()
            .filter(|(i, _)| pred(*i))
            .map(|(_, a)| a.norm_sqr())
            .sum()
    } else {
        amps.iter()
            .enumerate()
            .filter(|(i, _)| pred(*i))
            .map(|(_, a)| a.norm_sqr())
            .sum()
    }
}

/// In-place single-qubit gate on a raw amplitude slice
pub(crate) fn apply_single(amps: &mut [Complex64], matrix: &Matrix2x2, q: usize) {
    let tbit = 1usize << q;
    for i in 0..amps.len() {
        if i & tbit == 0 {
            let j = i | tbit;
            let a0 = amps[i];
            let a1 = amps[j];
            amps[i] = matrix[0][0] * a0 + matrix[0][1] * a1;
            amps[j] = matrix[1][0] * a0 + matrix[1][1] * a1;
        }
    }
}

/// Basis-change matrix that maps the given Pauli eigenbasis onto Z
fn basis_change(basis: Pauli) -> Option<Matrix2x2> {
    let h = std::f64::consts::FRAC_1_SQRT_2;
    match basis {
        Pauli::I | Pauli::Z => None,
        // H maps the X eigenbasis onto the computational basis
        Pauli::X => Some([
            [Complex64::new(h, 0.0), Complex64::new(h, 0.0)],
            [Complex64::new(h, 0.0), Complex64::new(-h, 0.0)],
        ]),
        // H·S† maps the Y eigenbasis onto the computational basis
        Pauli::Y => Some([
            [Complex64::new(h, 0.0), Complex64::new(0.0, -h)],
            [Complex64::new(h, 0.0), Complex64::new(0.0, h)],
        ]),
    }
}

#[inline]
fn odd_parity(bits: usize) -> bool {
    bits.count_ones() & 1 == 1
}

impl Kernels for CpuKernels {
    fn probability(&self, state: &StateVector, q: usize) -> f64 {
        let mask = 1usize << q;
        masked_norm_sqr(state.amplitudes(), move |i| i & mask != 0)
    }

    fn joint_probability(&self, state: &StateVector, qs: &[usize]) -> f64 {
        let mask = make_mask(qs);
        masked_norm_sqr(state.amplitudes(), move |i| odd_parity(i & mask))
    }

    fn joint_probability_in_basis(
        &self,
        state: &StateVector,
        bases: &[Pauli],
        qs: &[usize],
    ) -> f64 {
        debug_assert_eq!(bases.len(), qs.len());

        let active: Vec<usize> = bases
            .iter()
            .zip(qs)
            .filter(|(b, _)| **b != Pauli::I)
            .map(|(_, &q)| q)
            .collect();
        if active.is_empty() {
            return 0.0;
        }

        // Rotate X/Y qubits into the computational basis on a scratch
        // copy, then the joint outcome is a plain parity.
        let mut scratch: Vec<Complex64> = state.amplitudes().to_vec();
        for (&basis, &q) in bases.iter().zip(qs) {
            if let Some(rotation) = basis_change(basis) {
                apply_single(&mut scratch, &rotation, q);
            }
        }

        let mask = make_mask(&active);
        masked_norm_sqr(&scratch, move |i| odd_parity(i & mask))
    }

    fn collapse(
        &self,
        state: &mut StateVector,
        q: usize,
        value: bool,
        compact: bool,
    ) -> Result<()> {
        if !compact {
            let mask = 1usize << q;
            let keep = if value { mask } else { 0 };
            for (i, amp) in state.amplitudes_mut().iter_mut().enumerate() {
                if i & mask != keep {
                    *amp = Complex64::new(0.0, 0.0);
                }
            }
            return Ok(());
        }

        // Delete bit position q from the index space, keeping only the
        // amplitudes where q already holds `value`.
        let mut halved = StateVector::zeroed(state.num_qubits() - 1)?;
        let low_mask = (1usize << q) - 1;
        let value_bit = (value as usize) << q;
        {
            let src = state.amplitudes();
            let dst = halved.amplitudes_mut();
            for (j, amp) in dst.iter_mut().enumerate() {
                let i = ((j & !low_mask) << 1) | value_bit | (j & low_mask);
                *amp = src[i];
            }
        }
        *state = halved;
        Ok(())
    }

    fn joint_collapse(&self, state: &mut StateVector, qs: &[usize], value: bool) {
        let mask = make_mask(qs);
        for (i, amp) in state.amplitudes_mut().iter_mut().enumerate() {
            if odd_parity(i & mask) != value {
                *amp = Complex64::new(0.0, 0.0);
            }
        }
    }

    fn normalize(&self, state: &mut StateVector) {
        state.normalize();
    }

    fn is_classical(&self, state: &StateVector, q: usize) -> bool {
        self.get_value(state, q) != ClassicalValue::Mixed
    }

    fn get_value(&self, state: &StateVector, q: usize) -> ClassicalValue {
        let p = self.probability(state, q);
        if p < CLASSICAL_TOLERANCE {
            ClassicalValue::Zero
        } else if p > 1.0 - CLASSICAL_TOLERANCE {
            ClassicalValue::One
        } else {
            ClassicalValue::Mixed
        }
    }

    fn subsystem_wavefunction(
        &self,
        state: &StateVector,
        qs: &[usize],
        out: &mut Vec<Complex64>,
        tolerance: f64,
    ) -> bool {
        let amps = state.amplitudes();
        let qmask = make_mask(qs);

        // Anchor on the largest amplitude so products below stay well
        // away from the noise floor.
        let mut anchor = 0usize;
        let mut best = 0.0f64;
        for (i, amp) in amps.iter().enumerate() {
            let p = amp.norm_sqr();
            if p > best {
                best = p;
                anchor = i;
            }
        }
        let a0 = amps[anchor];

        // ψ factorizes over (qs, rest) iff the reshaped amplitude matrix
        // has rank one: ψ[i]·ψ[anchor] = ψ[row(i)]·ψ[col(i)] for all i.
        for (i, amp) in amps.iter().enumerate() {
            let row = amps[(i & !qmask) | (anchor & qmask)];
            let col = amps[(anchor & !qmask) | (i & qmask)];
            if (amp * a0 - row * col).norm() > tolerance {
                return false;
            }
        }

        let sub_dim = 1usize << qs.len();
        out.clear();
        out.reserve(sub_dim);
        for r in 0..sub_dim {
            out.push(amps[set_register(qs, qmask, r, anchor)]);
        }
        let norm = out.iter().map(|a| a.norm_sqr()).sum::<f64>().sqrt();
        if norm < 1e-10 {
            return false;
        }
        let inv = 1.0 / norm;
        for amp in out.iter_mut() {
            *amp *= inv;
        }
        true
    }

    fn apply_controlled_exp(
        &self,
        state: &mut StateVector,
        bases: &[Pauli],
        phi: f64,
        controls: &[usize],
        targets: &[usize],
    ) {
        debug_assert_eq!(bases.len(), targets.len());

        let cmask = make_mask(controls);
        let mut flip = 0usize;
        let mut y_mask = 0usize;
        let mut z_mask = 0usize;
        for (&basis, &q) in bases.iter().zip(targets) {
            match basis {
                Pauli::I => {}
                Pauli::X => flip |= 1 << q,
                Pauli::Y => {
                    flip |= 1 << q;
                    y_mask |= 1 << q;
                }
                Pauli::Z => z_mask |= 1 << q,
            }
        }

        // P|y⟩ = ph(y)·|y ^ flip⟩ with ph(y) = i^{#Y}·(-1)^{|y ∧ (Y∪Z)|},
        // so exp(i·phi·P) = cos(phi)·1 + i·sin(phi)·P pairs y with y^flip.
        let i_pow = match y_mask.count_ones() % 4 {
            0 => Complex64::new(1.0, 0.0),
            1 => Complex64::new(0.0, 1.0),
            2 => Complex64::new(-1.0, 0.0),
            _ => Complex64::new(0.0, -1.0),
        };
        let phase_mask = y_mask | z_mask;
        let ph = |y: usize| -> Complex64 {
            if odd_parity(y & phase_mask) {
                -i_pow
            } else {
                i_pow
            }
        };

        let (cos_phi, sin_phi) = (phi.cos(), phi.sin());
        let amps = state.amplitudes_mut();

        if flip == 0 {
            // Diagonal string: a pure per-state phase.
            for (i, amp) in amps.iter_mut().enumerate() {
                if i & cmask == cmask {
                    let sign = if odd_parity(i & phase_mask) { -1.0 } else { 1.0 };
                    *amp *= Complex64::new(cos_phi, sign * sin_phi);
                }
            }
            return;
        }

        let pivot = flip & flip.wrapping_neg();
        let i_sin = Complex64::new(0.0, sin_phi);
        for i in 0..amps.len() {
            if i & pivot != 0 || i & cmask != cmask {
                continue;
            }
            let j = i ^ flip;
            let a_i = amps[i];
            let a_j = amps[j];
            amps[i] = a_i * cos_phi + a_j * (i_sin * ph(j));
            amps[j] = a_j * cos_phi + a_i * (i_sin * ph(i));
        }
    }
}
