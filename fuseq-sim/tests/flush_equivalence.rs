//! Flush-equivalence: buffered execution must be observationally
//! identical to flushing after every gate, for any fusion bounds.

use approx::assert_relative_eq;
use fuseq_core::{matrices, Matrix2x2, QubitId};
use fuseq_sim::{Simulator, SimulatorConfig};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

enum Step {
    One(usize, Matrix2x2),
    Controlled(Vec<usize>, usize, Matrix2x2),
}

/// Deterministic pseudo-random circuit over `n` qubits
fn random_circuit(n: usize, gates: usize, seed: u64) -> Vec<Step> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut steps = Vec::with_capacity(gates);
    for _ in 0..gates {
        let target = rng.gen_range(0..n);
        match rng.gen_range(0..6) {
            0 => steps.push(Step::One(target, matrices::hadamard())),
            1 => steps.push(Step::One(target, matrices::rx(rng.gen_range(0.0..1.5)))),
            2 => steps.push(Step::One(target, matrices::ry(rng.gen_range(0.0..1.5)))),
            3 => steps.push(Step::One(target, matrices::rz(rng.gen_range(0.0..1.5)))),
            4 => {
                let control = (target + 1 + rng.gen_range(0..n - 1)) % n;
                steps.push(Step::Controlled(vec![control], target, matrices::pauli_x()));
            }
            _ => {
                let c1 = (target + 1 + rng.gen_range(0..n - 1)) % n;
                let mut c2 = (target + 1 + rng.gen_range(0..n - 1)) % n;
                if c2 == c1 {
                    c2 = (c1 + 1) % n;
                    if c2 == target {
                        c2 = (c2 + 1) % n;
                    }
                }
                steps.push(Step::Controlled(vec![c1, c2], target, matrices::pauli_z()));
            }
        }
    }
    steps
}

fn run(steps: &[Step], config: SimulatorConfig, n: usize, flush_each: bool) -> Vec<(f64, f64)> {
    let mut sim = Simulator::new(config).unwrap();
    let qs: Vec<QubitId> = (0..n).map(|_| sim.allocate().unwrap()).collect();

    for step in steps {
        match step {
            Step::One(target, matrix) => sim.apply(qs[*target], *matrix).unwrap(),
            Step::Controlled(controls, target, matrix) => {
                let cs: Vec<QubitId> = controls.iter().map(|&c| qs[c]).collect();
                sim.apply_controlled(&cs, qs[*target], *matrix).unwrap()
            }
        }
        if flush_each {
            sim.flush().unwrap();
        }
    }

    sim.data()
        .unwrap()
        .iter()
        .map(|a| (a.re, a.im))
        .collect()
}

#[test]
fn buffered_execution_matches_reference() {
    let n = 5;
    let steps = random_circuit(n, 200, 0xfeed);
    let reference = run(&steps, SimulatorConfig::default(), n, true);

    for span in [1usize, 2, 3, 4] {
        for depth in [2usize, 7, 999] {
            let config = SimulatorConfig::default()
                .with_fuse_span(span)
                .with_fuse_depth(depth);
            let buffered = run(&steps, config, n, false);

            assert_eq!(buffered.len(), 1 << n);
            for (&(ar, ai), &(br, bi)) in buffered.iter().zip(&reference) {
                assert_relative_eq!(ar, br, epsilon = 1e-9);
                assert_relative_eq!(ai, bi, epsilon = 1e-9);
            }
        }
    }
}

#[test]
fn normalization_holds_throughout() {
    let n = 4;
    let steps = random_circuit(n, 120, 0xbeef);
    let mut sim = Simulator::new(SimulatorConfig::default().with_seed(2)).unwrap();
    let qs: Vec<QubitId> = (0..n).map(|_| sim.allocate().unwrap()).collect();

    for (i, step) in steps.iter().enumerate() {
        match step {
            Step::One(target, matrix) => sim.apply(qs[*target], *matrix).unwrap(),
            Step::Controlled(controls, target, matrix) => {
                let cs: Vec<QubitId> = controls.iter().map(|&c| qs[c]).collect();
                sim.apply_controlled(&cs, qs[*target], *matrix).unwrap()
            }
        }
        // Observe at a few points mid-circuit; each observation flushes.
        if i % 37 == 0 {
            let norm: f64 = sim.data().unwrap().iter().map(|a| a.norm_sqr()).sum();
            assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
            assert_eq!(sim.data().unwrap().len(), 1 << n);
        }
    }

    let norm: f64 = sim.data().unwrap().iter().map(|a| a.norm_sqr()).sum();
    assert_relative_eq!(norm, 1.0, epsilon = 1e-9);
}

#[test]
fn measurement_sequence_independent_of_fusion_bounds() {
    // With a fixed seed the full measurement record must not depend on
    // how gates were clustered.
    let n = 4;
    let steps = random_circuit(n, 60, 0xcafe);

    let record = |span: usize| -> Vec<bool> {
        let config = SimulatorConfig::default().with_seed(77).with_fuse_span(span);
        let mut sim = Simulator::new(config).unwrap();
        let qs: Vec<QubitId> = (0..n).map(|_| sim.allocate().unwrap()).collect();
        let mut outcomes = Vec::new();
        for (i, step) in steps.iter().enumerate() {
            match step {
                Step::One(target, matrix) => sim.apply(qs[*target], *matrix).unwrap(),
                Step::Controlled(controls, target, matrix) => {
                    let cs: Vec<QubitId> = controls.iter().map(|&c| qs[c]).collect();
                    sim.apply_controlled(&cs, qs[*target], *matrix).unwrap()
                }
            }
            if i % 15 == 14 {
                outcomes.push(sim.measure(qs[i % n]).unwrap());
            }
        }
        outcomes
    };

    let reference = record(4);
    assert_eq!(record(1), reference);
    assert_eq!(record(2), reference);
}
