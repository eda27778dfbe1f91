//! Error types for amplitude-vector operations

use thiserror::Error;

/// Errors that can occur during amplitude-vector operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StateError {
    /// Invalid physical qubit index
    #[error("Invalid qubit index {index} for {num_qubits}-qubit state")]
    InvalidQubitIndex { index: usize, num_qubits: usize },

    /// Register too large for a dense amplitude vector
    #[error("Register of {requested} qubits exceeds the dense-state maximum of {max}")]
    TooManyQubits { requested: usize, max: usize },

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Memory allocation error
    #[error("Failed to allocate {size} bytes for amplitude vector")]
    AllocationError { size: usize },
}

/// Result type for amplitude-vector operations
pub type Result<T> = std::result::Result<T, StateError>;
