use crate::messages::{MulticastParams, NodeId, PickStrategy};
use crate::tracker::{ExpectedCrash, Experiment, ExperimentSettings};
use itertools::Itertools;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// The dimensions the experiment matrix is enumerated over.
#[derive(Clone, Debug)]
pub struct ExperimentMatrix {
  pub duration: u64,
  pub number_of_experiments: u64,
  pub repetitions: u32,
  pub initial_seed: u64,
  pub gossip_delta: u64,
  pub min_failure_rounds: u32,
  pub max_failure_rounds: u32,
  pub miss_delta_rounds: u64,
}

/// Enumerates the full Cartesian product of the matrix over the given node
/// set, in a fixed order: seed, repetition, catastrophe, failure rounds
/// (descending by 2), push-pull, pick strategy, multicast and its
/// parameters. The per-experiment crash schedule is drawn by
/// [`crash_schedule`], so the whole list is a pure function of the matrix
/// and the node ids.
pub fn generate_experiments(
  matrix: &ExperimentMatrix,
  nodes: &[NodeId],
) -> Vec<Experiment> {
  let miss_delta = matrix.gossip_delta * matrix.miss_delta_rounds;
  let mut experiments = Vec::new();
  for seed in matrix.initial_seed..matrix.initial_seed + matrix.number_of_experiments {
    for repetition in 0..matrix.repetitions {
      for &catastrophe in &[false, true] {
        for round in (matrix.min_failure_rounds..=matrix.max_failure_rounds)
          .rev()
          .step_by(2)
        {
          for &push_pull in &[false, true] {
            for &pick in PickStrategy::ALL.iter() {
              for &multicast in &[false, true] {
                let settings = ExperimentSettings {
                  number_of_nodes: nodes.len(),
                  duration: matrix.duration,
                  simulate_catastrophe: catastrophe,
                  gossip_delta: matrix.gossip_delta,
                  failure_delta: matrix.gossip_delta * round as u64,
                  miss_delta: miss_delta,
                  push_pull: push_pull,
                  pick_strategy: pick,
                  multicast: None,
                };
                if multicast {
                  for &param in &[1u32, 2] {
                    for &max_wait in &[1u32, 2] {
                      let mut settings = settings.clone();
                      settings.multicast = Some(MulticastParams {
                        param: param,
                        max_wait: max_wait,
                      });
                      push_experiment(
                        &mut experiments,
                        matrix,
                        nodes,
                        seed,
                        repetition,
                        settings,
                      );
                    }
                  }
                } else {
                  push_experiment(
                    &mut experiments,
                    matrix,
                    nodes,
                    seed,
                    repetition,
                    settings,
                  );
                }
              }
            }
          }
        }
      }
    }
  }
  experiments
}

fn push_experiment(
  experiments: &mut Vec<Experiment>,
  matrix: &ExperimentMatrix,
  nodes: &[NodeId],
  seed: u64,
  repetition: u32,
  settings: ExperimentSettings,
) {
  let crashes = crash_schedule(
    seed,
    nodes,
    settings.simulate_catastrophe,
    matrix.duration,
  );
  let id = format!("{:05}", experiments.len());
  experiments.push(Experiment::new(id, seed, repetition, settings, crashes));
}

/// Fixes which nodes crash and when, reproducibly from `seed`. The PRNG call
/// order is part of the contract: one shuffle of the lexicographically
/// sorted ids, then one draw in `[0, duration/2)` applied to every crashing
/// node, so catastrophic scenarios crash simultaneously.
pub fn crash_schedule(
  seed: u64,
  nodes: &[NodeId],
  catastrophe: bool,
  duration: u64,
) -> Vec<ExpectedCrash> {
  let mut rng = ChaCha8Rng::seed_from_u64(seed);
  let mut permutation = nodes.iter().cloned().sorted().collect::<Vec<_>>();
  permutation.shuffle(&mut rng);
  let crashes = if catastrophe {
    (2 * nodes.len() + 2) / 3
  } else {
    1
  };
  let crash_time = rng.gen_range(0..duration / 2);
  permutation
    .into_iter()
    .take(crashes)
    .map(|node| ExpectedCrash {
      delta: crash_time,
      node: node,
    })
    .collect()
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashSet;

  fn ids(n: usize) -> Vec<NodeId> {
    (0..n).map(|i| NodeId::new(&format!("n{}", i))).collect()
  }

  fn matrix() -> ExperimentMatrix {
    ExperimentMatrix {
      duration: 10_000,
      number_of_experiments: 1,
      repetitions: 1,
      initial_seed: 42,
      gossip_delta: 200,
      min_failure_rounds: 2,
      max_failure_rounds: 6,
      miss_delta_rounds: 4,
    }
  }

  #[test]
  fn schedule_is_reproducible_from_the_seed() {
    let nodes = ids(5);
    let a = crash_schedule(7, &nodes, false, 10_000);
    let b = crash_schedule(7, &nodes, false, 10_000);
    assert_eq!(a, b);
    let a = crash_schedule(7, &nodes, true, 10_000);
    let b = crash_schedule(7, &nodes, true, 10_000);
    assert_eq!(a, b);
    // and so is the whole matrix
    let left = generate_experiments(&matrix(), &nodes);
    let right = generate_experiments(&matrix(), &nodes);
    assert_eq!(left.len(), right.len());
    for (l, r) in left.iter().zip(right.iter()) {
      assert_eq!(l.id(), r.id());
      assert_eq!(l.expected_crashes(), r.expected_crashes());
    }
  }

  #[test]
  fn schedule_order_is_insensitive_to_input_order() {
    let mut nodes = ids(5);
    let a = crash_schedule(7, &nodes, true, 10_000);
    nodes.reverse();
    let b = crash_schedule(7, &nodes, true, 10_000);
    assert_eq!(a, b);
  }

  #[test]
  fn catastrophe_crashes_two_thirds_simultaneously() {
    let nodes = ids(7);
    let crashes = crash_schedule(3, &nodes, true, 10_000);
    // ⌈2·7/3⌉
    assert_eq!(5, crashes.len());
    let distinct = crashes.iter().map(|c| c.node.clone()).collect::<HashSet<_>>();
    assert_eq!(5, distinct.len());
    assert!(crashes.iter().all(|c| c.delta == crashes[0].delta));
    assert!(crashes[0].delta < 5_000);
  }

  #[test]
  fn normal_runs_crash_one_node() {
    let crashes = crash_schedule(3, &ids(7), false, 10_000);
    assert_eq!(1, crashes.len());
  }

  #[test]
  fn matrix_has_the_full_cartesian_product() {
    let experiments = generate_experiments(&matrix(), &ids(3));
    // 1 seed · 1 repetition · 2 catastrophe · 3 rounds · 2 push-pull
    // · 3 strategies · (1 plain + 2·2 multicast)
    assert_eq!(180, experiments.len());
    // ids are the zero-padded position in the enumeration
    assert_eq!("00000", experiments[0].id());
    assert_eq!("00179", experiments[179].id());
  }

  #[test]
  fn failure_rounds_step_down_by_two_gossip_periods() {
    let experiments = generate_experiments(&matrix(), &ids(3));
    let deltas = experiments
      .iter()
      .map(|e| e.settings().failure_delta)
      .collect::<HashSet<_>>();
    assert_eq!(
      vec![400, 800, 1200].into_iter().collect::<HashSet<_>>(),
      deltas
    );
    assert!(experiments
      .iter()
      .all(|e| e.settings().miss_delta == 800));
  }
}
