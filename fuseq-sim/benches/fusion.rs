//! Benchmarks for cluster construction and fused flushing

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use fuseq_core::{matrices, QubitId};
use fuseq_sim::{build_clusters, ResolvedGate, Simulator, SimulatorConfig};
use smallvec::SmallVec;

/// Alternating layer circuit: H on every qubit, then a CX ladder
fn layered_gates(num_qubits: usize, layers: usize) -> Vec<ResolvedGate> {
    let mut gates = Vec::new();
    for _ in 0..layers {
        for q in 0..num_qubits {
            gates.push(ResolvedGate {
                controls: SmallVec::new(),
                target: q,
                matrix: matrices::hadamard(),
            });
        }
        for q in 0..num_qubits - 1 {
            let mut controls = SmallVec::new();
            controls.push(q);
            gates.push(ResolvedGate {
                controls,
                target: q + 1,
                matrix: matrices::pauli_x(),
            });
        }
    }
    gates
}

fn bench_cluster_builder(c: &mut Criterion) {
    let mut group = c.benchmark_group("cluster_builder");
    for span in [2usize, 4] {
        group.bench_function(format!("span_{}_500_gates", span), |b| {
            let gates = layered_gates(10, 27);
            b.iter(|| black_box(build_clusters(black_box(gates.clone()), span, 999)))
        });
    }
    group.finish();
}

fn bench_fused_vs_serial(c: &mut Criterion) {
    let num_qubits = 12;
    let layers = 8;

    let run = |flush_each: bool| {
        let mut sim = Simulator::new(SimulatorConfig::default().with_seed(1)).unwrap();
        let qs: Vec<QubitId> = (0..num_qubits).map(|_| sim.allocate().unwrap()).collect();
        for _ in 0..layers {
            for q in &qs {
                sim.apply(*q, matrices::hadamard()).unwrap();
                if flush_each {
                    sim.flush().unwrap();
                }
            }
            for w in qs.windows(2) {
                sim.apply_controlled(&[w[0]], w[1], matrices::pauli_x())
                    .unwrap();
                if flush_each {
                    sim.flush().unwrap();
                }
            }
        }
        sim.flush().unwrap();
        sim
    };

    let mut group = c.benchmark_group("flush");
    group.sample_size(20);
    group.bench_function("fused", |b| b.iter(|| black_box(run(false))));
    group.bench_function("gate_at_a_time", |b| b.iter(|| black_box(run(true))));
    group.finish();
}

criterion_group!(benches, bench_cluster_builder, bench_fused_vs_serial);
criterion_main!(benches);
