//! Error types for the simulator

use fuseq_core::QubitId;
use fuseq_state::StateError;
use thiserror::Error;

/// Errors that can occur during simulation
///
/// All of these are precondition violations or numerical anomalies; the
/// simulator never retries, and the offending operation leaves the state
/// untouched except where the variant documents otherwise.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SimulatorError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Operation referenced a logical id with no allocated qubit
    #[error("Logical qubit {id} is not allocated")]
    QubitNotAllocated { id: QubitId },

    /// Explicit allocation of an id that is already live
    #[error("Logical qubit {id} is already allocated")]
    QubitInUse { id: QubitId },

    /// Explicit allocation of an id beyond the next fresh slot
    #[error("Allocation id {id} is out of order, next fresh slot is {expected}")]
    AllocationOutOfOrder { id: QubitId, expected: usize },

    /// Automatic and caller-supplied allocation cannot be mixed
    #[error("Cannot mix automatic and caller-supplied qubit allocation")]
    MixedAllocationMode,

    /// The target qubit also appears in the control set
    #[error("Target qubit {target} also appears in the control set")]
    TargetInControls { target: QubitId },

    /// Release requires the qubit to be classical in the computational basis
    #[error("Cannot release qubit {id}: it is not classical in the computational basis")]
    ReleaseNonClassical { id: QubitId },

    /// The classical-value probe returned an ambiguous result
    #[error("Classical-value probe for qubit {id} was ambiguous")]
    AmbiguousClassicalValue { id: QubitId },

    /// Permutation table does not cover the sub-register
    #[error("Permutation table has {actual} entries, expected {expected}")]
    PermutationTableSize { expected: usize, actual: usize },

    /// Basis list and qubit list lengths differ
    #[error("Basis list has {bases} entries for {qubits} qubits")]
    BasisLengthMismatch { bases: usize, qubits: usize },

    /// Error from the amplitude-vector layer
    #[error(transparent)]
    State(#[from] StateError),
}

/// Result type for simulator operations
pub type Result<T> = std::result::Result<T, SimulatorError>;
