//! Gate clustering for fused application
//!
//! A flush does not walk the pending gates one by one: it first groups
//! them into clusters, each touching at most `fuse_span` distinct qubits
//! and holding at most `max_depth` gates, and then applies each cluster
//! as one fused operator. Grouping is allowed to pull a later gate past
//! intervening ones only when doing so provably commutes: every qubit
//! the pulled gate adds must be untouched by everything in between.
//!
//! The algorithm is a fixed number of greedy passes of ascending width.
//! Each pass walks the clusters earliest-first and grows the current
//! cluster by the nearest compatible successor until none remains, so
//! the output is a deterministic function of the input sequence and the
//! span/depth bounds.

use ahash::AHashSet;
use fuseq_core::Matrix2x2;
use smallvec::SmallVec;

/// A gate resolved to physical qubit indices, ready to flush
#[derive(Clone, Debug)]
pub struct ResolvedGate {
    /// Physical control indices
    pub controls: SmallVec<[usize; 2]>,
    /// Physical target index
    pub target: usize,
    /// The 2×2 gate matrix
    pub matrix: Matrix2x2,
}

/// A group of gates flushed as one fused operator
///
/// `qids` is the sorted union of every physical qubit the gates touch;
/// `gates` preserves submission order.
#[derive(Clone, Debug)]
pub struct Cluster {
    qids: SmallVec<[usize; 4]>,
    gates: Vec<ResolvedGate>,
}

impl Cluster {
    /// Singleton cluster holding one gate
    fn seed(gate: ResolvedGate) -> Self {
        let mut qids: SmallVec<[usize; 4]> = gate.controls.iter().copied().collect();
        qids.push(gate.target);
        qids.sort_unstable();
        qids.dedup();
        Self {
            qids,
            gates: vec![gate],
        }
    }

    /// The sorted physical qubits this cluster touches
    #[inline]
    pub fn qids(&self) -> &[usize] {
        &self.qids
    }

    /// The gates, in submission order
    #[inline]
    pub fn gates(&self) -> &[ResolvedGate] {
        &self.gates
    }

    /// Consume the cluster, yielding its gates in submission order
    pub fn into_gates(self) -> Vec<ResolvedGate> {
        self.gates
    }

    /// Absorb a later cluster: widen the qubit set, append its gates
    fn absorb(&mut self, other: Cluster) {
        self.qids = sorted_union(&self.qids, &other.qids);
        self.gates.extend(other.gates);
    }
}

/// Size of the union of two sorted slices, without allocating
fn union_len(a: &[usize], b: &[usize]) -> usize {
    let mut count = 0;
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => {
                i += 1;
                j += 1;
            }
        }
        count += 1;
    }
    count + (a.len() - i) + (b.len() - j)
}

/// Merge two sorted slices into a sorted deduplicated union
fn sorted_union(a: &[usize], b: &[usize]) -> SmallVec<[usize; 4]> {
    let mut out = SmallVec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => {
                out.push(a[i]);
                i += 1;
            }
            std::cmp::Ordering::Greater => {
                out.push(b[j]);
                j += 1;
            }
            std::cmp::Ordering::Equal => {
                out.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Whether two sorted slices share an element
fn intersects(a: &[usize], b: &[usize]) -> bool {
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            std::cmp::Ordering::Less => i += 1,
            std::cmp::Ordering::Greater => j += 1,
            std::cmp::Ordering::Equal => return true,
        }
    }
    false
}

/// Find the nearest later cluster that `cur` may absorb at this width
///
/// The stack holds the remaining clusters with the earliest on top (at
/// the end). Scanning walks from the top outward, accumulating the
/// qubits every skipped cluster touches:
///
/// - a candidate whose union with `cur` fits in `width` is absorbable if
///   every qubit it adds beyond `cur`'s own is untouched by the skipped
///   clusters (those then commute trivially past the pulled gates);
/// - a skipped cluster sharing a qubit with `cur` is a hard barrier:
///   nothing may commute past it.
fn find_compatible(cur: &Cluster, stack: &mut Vec<Cluster>, width: usize) -> Option<Cluster> {
    let mut all_touched: AHashSet<usize> = cur.qids.iter().copied().collect();

    for idx in (0..stack.len()).rev() {
        let nxt = &stack[idx];
        if union_len(&cur.qids, &nxt.qids) <= width {
            let fresh_ok = nxt
                .qids
                .iter()
                .copied()
                .filter(|q| !cur.qids.contains(q))
                .all(|q| !all_touched.contains(&q));
            if fresh_ok {
                return Some(stack.remove(idx));
            }
        }
        if intersects(&nxt.qids, &cur.qids) {
            return None;
        }
        all_touched.extend(nxt.qids.iter().copied());
    }
    None
}

/// Group pending gates into fused clusters
///
/// Flushing the output clusters in order applies exactly the input gate
/// sequence. Every produced cluster touches at most `fuse_span` qubits
/// and holds at most `max_depth` gates.
pub fn build_clusters(
    gates: Vec<ResolvedGate>,
    fuse_span: usize,
    max_depth: usize,
) -> Vec<Cluster> {
    if gates.is_empty() {
        return Vec::new();
    }

    let mut clusters: Vec<Cluster> = gates.into_iter().map(Cluster::seed).collect();

    for width in 1..=fuse_span {
        // Reverse so the earliest remaining cluster sits on top of the
        // stack; emission order is then submission order.
        clusters.reverse();
        let mut stack = clusters;
        let mut emitted = Vec::with_capacity(stack.len());

        while let Some(mut cur) = stack.pop() {
            while cur.gates.len() < max_depth {
                match find_compatible(&cur, &mut stack, width) {
                    Some(nxt) => cur.absorb(nxt),
                    None => break,
                }
            }
            emitted.push(cur);
        }
        clusters = emitted;
    }

    clusters
}
