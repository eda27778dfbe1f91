//! Core types shared across the fuseq simulator workspace
//!
//! This crate defines the vocabulary the rest of the workspace speaks:
//! logical qubit identifiers, Pauli bases, 2×2 gate matrices, and the
//! gate descriptor that the simulator buffers between flushes. It has no
//! simulation logic of its own.

pub mod gate;
pub mod pauli;
pub mod qubit;

pub use gate::{matrices, Gate, Matrix2x2};
pub use pauli::Pauli;
pub use qubit::QubitId;
