//! Gate-fusion scheduler and dense state-vector simulator
//!
//! `fuseq-sim` is the orchestration layer of the workspace: it buffers
//! incoming gates, groups them into bounded clusters, and applies each
//! cluster to the amplitude vector as one fused operator. Observational
//! operations (measurement, probabilities, data extraction, allocation,
//! release, basis permutation, Pauli exponentials) force a flush first,
//! so buffering is observationally equivalent to applying gates one by
//! one. That equivalence is the correctness contract of the cluster
//! builder.
//!
//! # Example
//!
//! ```
//! use fuseq_core::matrices;
//! use fuseq_sim::{Simulator, SimulatorConfig};
//!
//! // Prepare a Bell pair and check its correlations.
//! let mut sim = Simulator::new(SimulatorConfig::default().with_seed(7)).unwrap();
//! let q0 = sim.allocate().unwrap();
//! let q1 = sim.allocate().unwrap();
//! sim.apply(q0, matrices::hadamard()).unwrap();
//! sim.apply_controlled(&[q0], q1, matrices::pauli_x()).unwrap();
//!
//! let (a, b) = (sim.measure(q0).unwrap(), sim.measure(q1).unwrap());
//! assert_eq!(a, b);
//! ```

pub mod cluster;
pub mod config;
pub mod error;
pub mod fused;
pub mod gate_buffer;
pub mod logical_map;
pub mod permute;
pub mod rng;
pub mod simulator;

pub use cluster::{build_clusters, Cluster, ResolvedGate};
pub use config::SimulatorConfig;
pub use error::{Result, SimulatorError};
pub use fused::{FusedEvaluator, GateFuser};
pub use gate_buffer::GateBuffer;
pub use logical_map::LogicalMap;
pub use rng::MeasureRng;
pub use simulator::Simulator;
