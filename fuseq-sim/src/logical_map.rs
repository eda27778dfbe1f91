//! Logical-to-physical qubit mapping
//!
//! Callers hold stable logical ids; the amplitude vector indexes qubits
//! by dense physical bit position. This map owns the translation and the
//! allocation discipline: released slots are reusable, automatic
//! allocation always picks the lowest free slot, and releasing a qubit
//! renumbers every physical index above the freed one so the physical
//! space stays dense.

use crate::error::{Result, SimulatorError};
use fuseq_core::QubitId;

/// How qubits have been allocated so far
///
/// The two allocation styles hand out ids under different contracts and
/// cannot be mixed on one simulator instance.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum AllocationMode {
    Unset,
    Automatic,
    Explicit,
}

/// Bidirectional map between logical ids and dense physical indices
///
/// Invariants: every live entry holds a unique physical index in
/// `[0, num_qubits)`, and `num_qubits` equals the number of live
/// entries.
#[derive(Debug, Clone)]
pub struct LogicalMap {
    /// Slot per logical id; `None` marks a released (reusable) slot
    slots: Vec<Option<usize>>,
    /// Count of live entries
    live: usize,
    mode: AllocationMode,
}

impl LogicalMap {
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            live: 0,
            mode: AllocationMode::Unset,
        }
    }

    /// Number of allocated qubits
    #[inline]
    pub fn num_qubits(&self) -> usize {
        self.live
    }

    /// Total slot count, including released slots
    #[inline]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Physical index behind a logical id
    pub fn physical(&self, q: QubitId) -> Result<usize> {
        self.slots
            .get(q.index())
            .copied()
            .flatten()
            .ok_or(SimulatorError::QubitNotAllocated { id: q })
    }

    /// Allocate the lowest free logical id
    ///
    /// Released slots are reused before the map grows. Fails if a qubit
    /// was ever allocated with a caller-supplied id.
    pub fn allocate(&mut self) -> Result<QubitId> {
        if self.mode == AllocationMode::Explicit {
            return Err(SimulatorError::MixedAllocationMode);
        }
        self.mode = AllocationMode::Automatic;

        let physical = self.live;
        self.live += 1;
        if let Some(slot) = self.slots.iter().position(Option::is_none) {
            self.slots[slot] = Some(physical);
            Ok(QubitId::new(slot))
        } else {
            self.slots.push(Some(physical));
            Ok(QubitId::new(self.slots.len() - 1))
        }
    }

    /// Allocate a caller-supplied logical id
    ///
    /// The id must be a released slot or exactly the next fresh slot.
    /// Fails if a qubit was ever allocated automatically.
    pub fn allocate_with_id(&mut self, q: QubitId) -> Result<()> {
        if self.mode == AllocationMode::Automatic {
            return Err(SimulatorError::MixedAllocationMode);
        }

        let id = q.index();
        if id < self.slots.len() {
            if self.slots[id].is_some() {
                return Err(SimulatorError::QubitInUse { id: q });
            }
        } else if id != self.slots.len() {
            return Err(SimulatorError::AllocationOutOfOrder {
                id: q,
                expected: self.slots.len(),
            });
        }

        self.mode = AllocationMode::Explicit;
        let physical = self.live;
        self.live += 1;
        if id < self.slots.len() {
            self.slots[id] = Some(physical);
        } else {
            self.slots.push(Some(physical));
        }
        Ok(())
    }

    /// Release a logical id, renumbering the physical space
    ///
    /// Returns the physical index the qubit occupied. Every live entry
    /// above it shifts down by one so physical indices stay dense; the
    /// slot becomes reusable.
    pub fn release(&mut self, q: QubitId) -> Result<usize> {
        let freed = self.physical(q)?;
        for slot in self.slots.iter_mut().flatten() {
            if *slot > freed {
                *slot -= 1;
            }
        }
        self.slots[q.index()] = None;
        self.live -= 1;
        Ok(freed)
    }

    /// Logical ids currently allocated, in id order
    pub fn logical_qubits(&self) -> Vec<QubitId> {
        self.slots
            .iter()
            .enumerate()
            .filter(|(_, slot)| slot.is_some())
            .map(|(id, _)| QubitId::new(id))
            .collect()
    }

    /// Forget all allocations and the allocation mode
    pub fn reset(&mut self) {
        self.slots.clear();
        self.live = 0;
        self.mode = AllocationMode::Unset;
    }
}

impl Default for LogicalMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allocate_sequential() {
        let mut map = LogicalMap::new();
        assert_eq!(map.allocate().unwrap(), QubitId::new(0));
        assert_eq!(map.allocate().unwrap(), QubitId::new(1));
        assert_eq!(map.num_qubits(), 2);
        assert_eq!(map.physical(QubitId::new(1)).unwrap(), 1);
    }

    #[test]
    fn test_release_renumbers() {
        let mut map = LogicalMap::new();
        let q0 = map.allocate().unwrap();
        let q1 = map.allocate().unwrap();
        let q2 = map.allocate().unwrap();

        assert_eq!(map.release(q1).unwrap(), 1);
        assert_eq!(map.num_qubits(), 2);
        assert_eq!(map.physical(q0).unwrap(), 0);
        // q2 shifted down into the freed physical position.
        assert_eq!(map.physical(q2).unwrap(), 1);
        assert!(map.physical(q1).is_err());
    }

    #[test]
    fn test_allocate_reuses_lowest_released_slot() {
        let mut map = LogicalMap::new();
        for _ in 0..3 {
            map.allocate().unwrap();
        }
        map.release(QubitId::new(1)).unwrap();
        map.release(QubitId::new(0)).unwrap();

        assert_eq!(map.allocate().unwrap(), QubitId::new(0));
        assert_eq!(map.allocate().unwrap(), QubitId::new(1));
        assert_eq!(map.num_qubits(), 3);
    }

    #[test]
    fn test_mode_exclusivity() {
        let mut map = LogicalMap::new();
        map.allocate().unwrap();
        assert_eq!(
            map.allocate_with_id(QubitId::new(5)),
            Err(SimulatorError::MixedAllocationMode)
        );

        let mut map = LogicalMap::new();
        map.allocate_with_id(QubitId::new(0)).unwrap();
        assert_eq!(map.allocate(), Err(SimulatorError::MixedAllocationMode));
    }

    #[test]
    fn test_allocate_with_id_in_order() {
        let mut map = LogicalMap::new();
        map.allocate_with_id(QubitId::new(0)).unwrap();
        map.allocate_with_id(QubitId::new(1)).unwrap();

        // Skipping ahead is rejected.
        assert_eq!(
            map.allocate_with_id(QubitId::new(5)),
            Err(SimulatorError::AllocationOutOfOrder {
                id: QubitId::new(5),
                expected: 2
            })
        );

        // Double allocation is rejected.
        assert_eq!(
            map.allocate_with_id(QubitId::new(0)),
            Err(SimulatorError::QubitInUse { id: QubitId::new(0) })
        );

        // A released slot is acceptable again.
        map.release(QubitId::new(0)).unwrap();
        map.allocate_with_id(QubitId::new(0)).unwrap();
        assert_eq!(map.num_qubits(), 2);
    }

    #[test]
    fn test_logical_qubits_listing() {
        let mut map = LogicalMap::new();
        for _ in 0..3 {
            map.allocate().unwrap();
        }
        map.release(QubitId::new(1)).unwrap();
        assert_eq!(map.logical_qubits(), vec![QubitId::new(0), QubitId::new(2)]);
    }

    #[test]
    fn test_reset_clears_mode() {
        let mut map = LogicalMap::new();
        map.allocate().unwrap();
        map.reset();
        assert!(map.allocate_with_id(QubitId::new(0)).is_ok());
    }
}
