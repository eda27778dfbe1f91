//! Gate descriptors and common 2×2 matrices
//!
//! Every operation the scheduler buffers is a (possibly multiply
//! controlled) one-qubit gate: a 2×2 unitary, a target, and a control
//! set. Unitarity is a caller contract and is not validated here.

use crate::qubit::QubitId;
use num_complex::Complex64;
use smallvec::SmallVec;
use std::fmt;

/// 2×2 complex gate matrix in row-major order
pub type Matrix2x2 = [[Complex64; 2]; 2];

/// A buffered gate descriptor
///
/// Controls are kept in submission order but are treated as a set; the
/// target must not appear among them (the simulator rejects such gates
/// at submission). Descriptors are immutable once enqueued.
///
/// # Example
/// ```
/// use fuseq_core::{matrices, Gate, QubitId};
///
/// let h = Gate::new(QubitId::new(0), matrices::hadamard());
/// assert!(h.controls().is_empty());
///
/// let cx = Gate::controlled(&[QubitId::new(0)], QubitId::new(1), matrices::pauli_x());
/// assert_eq!(cx.controls().len(), 1);
/// ```
#[derive(Clone)]
pub struct Gate {
    controls: SmallVec<[QubitId; 2]>,
    target: QubitId,
    matrix: Matrix2x2,
}

impl Gate {
    /// Create an uncontrolled one-qubit gate
    pub fn new(target: QubitId, matrix: Matrix2x2) -> Self {
        Self {
            controls: SmallVec::new(),
            target,
            matrix,
        }
    }

    /// Create a multiply controlled one-qubit gate
    pub fn controlled(controls: &[QubitId], target: QubitId, matrix: Matrix2x2) -> Self {
        Self {
            controls: SmallVec::from_slice(controls),
            target,
            matrix,
        }
    }

    /// The control set, in submission order
    #[inline]
    pub fn controls(&self) -> &[QubitId] {
        &self.controls
    }

    /// The target qubit
    #[inline]
    pub fn target(&self) -> QubitId {
        self.target
    }

    /// The 2×2 gate matrix
    #[inline]
    pub fn matrix(&self) -> &Matrix2x2 {
        &self.matrix
    }
}

impl fmt::Debug for Gate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Gate")
            .field("controls", &self.controls)
            .field("target", &self.target)
            .finish()
    }
}

/// Common gate matrices
pub mod matrices {
    use super::Matrix2x2;
    use num_complex::Complex64;

    pub fn identity() -> Matrix2x2 {
        [
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
        ]
    }

    pub fn pauli_x() -> Matrix2x2 {
        [
            [Complex64::new(0.0, 0.0), Complex64::new(1.0, 0.0)],
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
        ]
    }

    pub fn pauli_y() -> Matrix2x2 {
        [
            [Complex64::new(0.0, 0.0), Complex64::new(0.0, -1.0)],
            [Complex64::new(0.0, 1.0), Complex64::new(0.0, 0.0)],
        ]
    }

    pub fn pauli_z() -> Matrix2x2 {
        [
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(-1.0, 0.0)],
        ]
    }

    pub fn hadamard() -> Matrix2x2 {
        let h = std::f64::consts::FRAC_1_SQRT_2;
        [
            [Complex64::new(h, 0.0), Complex64::new(h, 0.0)],
            [Complex64::new(h, 0.0), Complex64::new(-h, 0.0)],
        ]
    }

    /// Phase gate diag(1, e^{iθ})
    pub fn phase(theta: f64) -> Matrix2x2 {
        [
            [Complex64::new(1.0, 0.0), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(theta.cos(), theta.sin())],
        ]
    }

    /// Rotation about the X axis by θ
    pub fn rx(theta: f64) -> Matrix2x2 {
        let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
        [
            [Complex64::new(c, 0.0), Complex64::new(0.0, -s)],
            [Complex64::new(0.0, -s), Complex64::new(c, 0.0)],
        ]
    }

    /// Rotation about the Y axis by θ
    pub fn ry(theta: f64) -> Matrix2x2 {
        let (c, s) = ((theta / 2.0).cos(), (theta / 2.0).sin());
        [
            [Complex64::new(c, 0.0), Complex64::new(-s, 0.0)],
            [Complex64::new(s, 0.0), Complex64::new(c, 0.0)],
        ]
    }

    /// Rotation about the Z axis by θ
    pub fn rz(theta: f64) -> Matrix2x2 {
        let half = theta / 2.0;
        [
            [Complex64::new(half.cos(), -half.sin()), Complex64::new(0.0, 0.0)],
            [Complex64::new(0.0, 0.0), Complex64::new(half.cos(), half.sin())],
        ]
    }
}
