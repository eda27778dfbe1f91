//! The fused state-vector simulator
//!
//! The simulator owns the amplitude vector and orchestrates everything
//! around it: gates are buffered, not applied; any operation that
//! observes the state (measurement, probabilities, data extraction,
//! allocation, release, permutation, exponentials) forces a flush first,
//! so buffering is never observable. A flush groups the pending gates
//! into clusters and feeds each cluster through the fused evaluator as
//! one operator.

use crate::cluster::{build_clusters, ResolvedGate};
use crate::config::SimulatorConfig;
use crate::error::{Result, SimulatorError};
use crate::fused::{FusedEvaluator, GateFuser};
use crate::gate_buffer::GateBuffer;
use crate::logical_map::LogicalMap;
use crate::permute;
use crate::rng::MeasureRng;
use fuseq_core::{Gate, Matrix2x2, Pauli, QubitId};
use fuseq_state::{ClassicalValue, CpuKernels, Kernels, StateVector};
use num_complex::Complex64;
use smallvec::SmallVec;
use tracing::{debug, error};

/// Dense state-vector simulator with gate fusion
///
/// Generic over the numerical collaborators so an accelerated kernel
/// set or a different fusion strategy can be dropped in; the shipped
/// defaults are [`CpuKernels`] and [`GateFuser`].
///
/// # Example
///
/// ```
/// use fuseq_core::matrices;
/// use fuseq_sim::{Simulator, SimulatorConfig};
///
/// let mut sim = Simulator::new(SimulatorConfig::default().with_seed(42)).unwrap();
/// let q = sim.allocate().unwrap();
/// sim.apply(q, matrices::hadamard()).unwrap();
/// sim.measure(q).unwrap();
/// assert!(sim.is_classical(q).unwrap());
/// ```
pub struct Simulator<K: Kernels = CpuKernels, F: FusedEvaluator = GateFuser> {
    config: SimulatorConfig,
    state: StateVector,
    map: LogicalMap,
    buffer: GateBuffer,
    fused: F,
    kernels: K,
    rng: MeasureRng,
}

impl Simulator {
    /// Create a simulator with the default collaborators
    pub fn new(config: SimulatorConfig) -> Result<Self> {
        let fused = GateFuser::new(config.fuse_span, config.fuse_depth);
        Self::with_collaborators(config, CpuKernels::new(), fused)
    }
}

impl<K: Kernels, F: FusedEvaluator> Simulator<K, F> {
    /// Create a simulator with caller-supplied collaborators
    pub fn with_collaborators(config: SimulatorConfig, kernels: K, fused: F) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => MeasureRng::seeded(seed),
            None => MeasureRng::from_entropy(),
        };
        Ok(Self {
            config,
            state: StateVector::new(0)?,
            map: LogicalMap::new(),
            buffer: GateBuffer::new(),
            fused,
            kernels,
            rng,
        })
    }

    /// The simulator configuration
    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Number of allocated qubits
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.map.num_qubits()
    }

    /// Logical ids currently allocated, in id order
    pub fn logical_qubits(&self) -> Vec<QubitId> {
        self.map.logical_qubits()
    }

    /// Number of gates buffered but not yet applied
    #[inline]
    pub fn pending_gates(&self) -> usize {
        self.buffer.len()
    }

    /// Allocate a qubit, handing out the lowest free logical id
    ///
    /// The amplitude vector doubles with a zeroed high half, so the new
    /// qubit starts in |0⟩. Cannot be mixed with
    /// [`allocate_with_id`](Self::allocate_with_id) on one instance.
    pub fn allocate(&mut self) -> Result<QubitId> {
        self.flush()?;
        let id = self.map.allocate()?;
        if let Err(e) = self.state.grow_one() {
            self.map.release(id)?;
            return Err(e.into());
        }
        debug!(%id, num_qubits = self.map.num_qubits(), "allocated qubit");
        Ok(id)
    }

    /// Allocate a qubit under a caller-supplied logical id
    ///
    /// The id must be a released slot or exactly the next fresh slot.
    /// Cannot be mixed with [`allocate`](Self::allocate) on one
    /// instance.
    pub fn allocate_with_id(&mut self, id: QubitId) -> Result<()> {
        self.flush()?;
        self.map.allocate_with_id(id)?;
        if let Err(e) = self.state.grow_one() {
            self.map.release(id)?;
            return Err(e.into());
        }
        debug!(%id, num_qubits = self.map.num_qubits(), "allocated qubit");
        Ok(())
    }

    /// Release a qubit that is classical in the computational basis
    ///
    /// The deterministic branch is collapsed away and the qubit's bit
    /// position is deleted from the index space, halving the amplitude
    /// vector. The logical slot becomes reusable.
    pub fn release(&mut self, q: QubitId) -> Result<()> {
        self.flush()?;
        let physical = self.map.physical(q)?;
        let value = match self.kernels.get_value(&self.state, physical) {
            ClassicalValue::Zero => false,
            ClassicalValue::One => true,
            ClassicalValue::Mixed => {
                return Err(SimulatorError::ReleaseNonClassical { id: q })
            }
        };
        self.kernels.collapse(&mut self.state, physical, value, true)?;
        self.map.release(q)?;
        debug!(%q, num_qubits = self.map.num_qubits(), "released qubit");
        Ok(())
    }

    /// Queue an uncontrolled one-qubit gate
    pub fn apply(&mut self, target: QubitId, matrix: Matrix2x2) -> Result<()> {
        self.enqueue(Gate::new(target, matrix))
    }

    /// Queue a multiply controlled one-qubit gate
    pub fn apply_controlled(
        &mut self,
        controls: &[QubitId],
        target: QubitId,
        matrix: Matrix2x2,
    ) -> Result<()> {
        self.enqueue(Gate::controlled(controls, target, matrix))
    }

    fn enqueue(&mut self, gate: Gate) -> Result<()> {
        // Validate at submission so a flush never sees a bad descriptor.
        let target = self.map.physical(gate.target())?;
        let mut controls: SmallVec<[usize; 2]> = SmallVec::new();
        for &c in gate.controls() {
            if c == gate.target() {
                return Err(SimulatorError::TargetInControls {
                    target: gate.target(),
                });
            }
            controls.push(self.map.physical(c)?);
        }

        self.buffer.push(gate);
        if self.buffer.len() > self.config.flush_threshold {
            debug!(pending = self.buffer.len(), "buffer threshold exceeded, flushing");
            self.flush()?;
        } else if self.fused.should_flush(&self.state, &controls, target) {
            self.flush()?;
        }
        Ok(())
    }

    /// Apply exp(i·phi·P) for the Pauli string P over `targets`, under
    /// the given controls
    ///
    /// This is not a one-qubit gate, so it bypasses the fusion queue:
    /// pending gates are flushed and the kernel runs directly.
    pub fn apply_controlled_exp(
        &mut self,
        bases: &[Pauli],
        phi: f64,
        controls: &[QubitId],
        targets: &[QubitId],
    ) -> Result<()> {
        if bases.len() != targets.len() {
            return Err(SimulatorError::BasisLengthMismatch {
                bases: bases.len(),
                qubits: targets.len(),
            });
        }
        self.flush()?;
        let cs = self.physical_all(controls)?;
        let ts = self.physical_all(targets)?;
        self.kernels
            .apply_controlled_exp(&mut self.state, bases, phi, &cs, &ts);
        Ok(())
    }

    /// Measure one qubit in the computational basis and collapse
    pub fn measure(&mut self, q: QubitId) -> Result<bool> {
        self.flush()?;
        let physical = self.map.physical(q)?;
        let outcome = self.rng.sample() < self.kernels.probability(&self.state, physical);
        self.kernels
            .collapse(&mut self.state, physical, outcome, false)?;
        self.kernels.normalize(&mut self.state);
        Ok(outcome)
    }

    /// Jointly measure the Z-parity of a set of qubits and collapse
    pub fn joint_measure(&mut self, qs: &[QubitId]) -> Result<bool> {
        self.flush()?;
        let ps = self.physical_all(qs)?;
        let outcome = self.rng.sample() < self.kernels.joint_probability(&self.state, &ps);
        self.kernels.joint_collapse(&mut self.state, &ps, outcome);
        self.kernels.normalize(&mut self.state);
        Ok(outcome)
    }

    /// Probability of measuring `q` as 1
    pub fn probability(&mut self, q: QubitId) -> Result<f64> {
        self.flush()?;
        let physical = self.map.physical(q)?;
        Ok(self.kernels.probability(&self.state, physical))
    }

    /// Probability of an odd-parity joint Z measurement
    pub fn joint_probability(&mut self, qs: &[QubitId]) -> Result<f64> {
        self.flush()?;
        let ps = self.physical_all(qs)?;
        Ok(self.kernels.joint_probability(&self.state, &ps))
    }

    /// Probability of an odd-parity joint measurement in per-qubit bases
    pub fn joint_probability_in_basis(
        &mut self,
        bases: &[Pauli],
        qs: &[QubitId],
    ) -> Result<f64> {
        if bases.len() != qs.len() {
            return Err(SimulatorError::BasisLengthMismatch {
                bases: bases.len(),
                qubits: qs.len(),
            });
        }
        self.flush()?;
        let ps = self.physical_all(qs)?;
        Ok(self
            .kernels
            .joint_probability_in_basis(&self.state, bases, &ps))
    }

    /// Whether `q` is classical in the computational basis
    pub fn is_classical(&mut self, q: QubitId) -> Result<bool> {
        self.flush()?;
        let physical = self.map.physical(q)?;
        Ok(self.kernels.is_classical(&self.state, physical))
    }

    /// Classical value of `q`
    ///
    /// The qubit must be classical in the computational basis. An
    /// ambiguous probe dumps the state for diagnostics and fails.
    pub fn get_value(&mut self, q: QubitId) -> Result<bool> {
        self.flush()?;
        let physical = self.map.physical(q)?;
        match self.kernels.get_value(&self.state, physical) {
            ClassicalValue::Zero => Ok(false),
            ClassicalValue::One => Ok(true),
            ClassicalValue::Mixed => {
                self.dump_state(q);
                Err(SimulatorError::AmbiguousClassicalValue { id: q })
            }
        }
    }

    /// Extract the subsystem wavefunction over `qs` if the state
    /// factorizes within `tolerance`
    pub fn subsystem_wavefunction(
        &mut self,
        qs: &[QubitId],
        out: &mut Vec<Complex64>,
        tolerance: f64,
    ) -> Result<bool> {
        self.flush()?;
        let ps = self.physical_all(qs)?;
        Ok(self
            .kernels
            .subsystem_wavefunction(&self.state, &ps, out, tolerance))
    }

    /// Permute computational basis states on a sub-register
    ///
    /// `table` maps sub-register values to sub-register values and must
    /// have `2^|qs|` entries; other basis bits are preserved. With
    /// `adjoint` the inverse relabeling is applied.
    pub fn permute_basis(
        &mut self,
        qs: &[QubitId],
        table: &[usize],
        adjoint: bool,
    ) -> Result<()> {
        self.flush()?;
        let ps = self.physical_all(qs)?;
        permute::permute_basis(&mut self.state, &ps, table, adjoint)
    }

    /// Borrow the amplitude vector after flushing pending gates
    ///
    /// The borrow must not be held across subsequent mutating calls.
    pub fn data(&mut self) -> Result<&[Complex64]> {
        self.flush()?;
        Ok(self.state.amplitudes())
    }

    /// Re-seed measurement sampling
    pub fn seed(&mut self, seed: u64) {
        self.rng.seed(seed);
    }

    /// Drop all qubits and pending gates, returning to the empty register
    pub fn reset(&mut self) -> Result<()> {
        self.fused.reset();
        self.buffer.clear();
        self.map.reset();
        self.state.reset()?;
        self.rng = match self.config.seed {
            Some(seed) => MeasureRng::seeded(seed),
            None => MeasureRng::from_entropy(),
        };
        Ok(())
    }

    /// Apply every pending gate to the amplitude vector
    ///
    /// Pending gates are grouped into clusters bounded by the
    /// evaluator's span and depth; each cluster is staged into the
    /// evaluator and materialized with one fused flush. On an empty
    /// buffer this short-circuits to a bare evaluator flush.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            self.fused.flush(&mut self.state);
            return Ok(());
        }

        let pending = self.buffer.drain();
        let count = pending.len();
        let resolved = pending
            .iter()
            .map(|g| self.resolve(g))
            .collect::<Result<Vec<_>>>()?;
        let clusters = build_clusters(resolved, self.fused.max_span(), self.fused.max_depth());
        debug!(gates = count, clusters = clusters.len(), "flushing gate buffer");

        for cluster in clusters {
            for gate in cluster.into_gates() {
                if gate.controls.is_empty() {
                    self.fused.apply(&mut self.state, &gate.matrix, gate.target);
                } else {
                    self.fused.apply_controlled(
                        &mut self.state,
                        &gate.matrix,
                        &gate.controls,
                        gate.target,
                    );
                }
            }
            self.fused.flush(&mut self.state);
        }
        Ok(())
    }

    fn resolve(&self, gate: &Gate) -> Result<ResolvedGate> {
        let mut controls: SmallVec<[usize; 2]> = SmallVec::with_capacity(gate.controls().len());
        for &c in gate.controls() {
            controls.push(self.map.physical(c)?);
        }
        Ok(ResolvedGate {
            controls,
            target: self.map.physical(gate.target())?,
            matrix: *gate.matrix(),
        })
    }

    fn physical_all(&self, qs: &[QubitId]) -> Result<Vec<usize>> {
        qs.iter().map(|&q| self.map.physical(q)).collect()
    }

    fn dump_state(&self, q: QubitId) {
        error!(%q, num_qubits = self.map.num_qubits(), "classical-value probe was ambiguous");
        if self.map.num_qubits() <= 6 {
            let width = self.map.num_qubits().max(1);
            for (i, amp) in self.state.amplitudes().iter().enumerate() {
                let line = format!(
                    "  |{:0width$b}⟩ = {:+.6}{:+.6}i",
                    i,
                    amp.re,
                    amp.im,
                    width = width
                );
                error!("{}", line);
            }
        }
    }
}
