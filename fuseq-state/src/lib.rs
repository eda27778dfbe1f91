//! Amplitude-vector storage and measurement kernels
//!
//! This crate owns the dense amplitude vector and the pure numerical
//! sweeps over it: probabilities, collapse (with and without bit
//! compaction), normalization, classical-state probes, subsystem
//! extraction, and controlled Pauli exponentials. It knows nothing about
//! gate buffering or logical qubit ids; those live in `fuseq-sim`.
//!
//! # Example
//!
//! ```
//! use fuseq_state::{CpuKernels, Kernels, StateVector};
//!
//! let state = StateVector::new(2).unwrap();
//! assert_eq!(CpuKernels.probability(&state, 0), 0.0);
//! ```

pub mod error;
pub mod kernels;
pub mod state_vector;

pub use error::{Result, StateError};
pub use kernels::{
    get_register, make_mask, set_register, ClassicalValue, CpuKernels, Kernels,
};
pub use state_vector::{StateVector, MAX_QUBITS};
