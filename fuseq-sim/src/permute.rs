//! Basis-state permutation
//!
//! Relabels computational basis states on a sub-register: the bits at
//! the given physical positions are read as a little-endian register
//! value, mapped through a permutation table, and written back. All
//! other bits are preserved. The caller must have flushed pending gates
//! first; the simulator guarantees that.

use crate::error::{Result, SimulatorError};
use fuseq_state::{get_register, make_mask, set_register, StateVector};

/// Apply a sub-register permutation to the amplitude vector
///
/// `table` must have exactly `2^|qs|` entries. In the forward direction
/// amplitude `ψ[i]` moves to the permuted index; with `adjoint` the
/// inverse relabeling is applied, so a forward/adjoint pair is the
/// identity whenever `table` is a permutation.
pub fn permute_basis(
    state: &mut StateVector,
    qs: &[usize],
    table: &[usize],
    adjoint: bool,
) -> Result<()> {
    let expected = 1usize << qs.len();
    if table.len() != expected {
        return Err(SimulatorError::PermutationTableSize {
            expected,
            actual: table.len(),
        });
    }

    let qmask = make_mask(qs);
    let permute = |i: usize| set_register(qs, qmask, table[get_register(qs, i)], i);

    let mut permuted = StateVector::zeroed(state.num_qubits())?;
    {
        let src = state.amplitudes();
        let dst = permuted.amplitudes_mut();
        if !adjoint {
            for (i, amp) in src.iter().enumerate() {
                dst[permute(i)] = *amp;
            }
        } else {
            for (i, slot) in dst.iter_mut().enumerate() {
                *slot = src[permute(i)];
            }
        }
    }
    *state = permuted;
    Ok(())
}
