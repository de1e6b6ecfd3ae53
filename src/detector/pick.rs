use crate::messages::{NodeId, PickStrategy};
use rand::seq::SliceRandom;
use rand::Rng;

/// Draws a gossip target from the correct peers. `None` when no peer is left
/// to gossip to. O(candidates); ties fall to the PRNG, no cross-process
/// determinism is promised.
pub fn pick_peer<R: Rng>(
  strategy: PickStrategy,
  candidates: &[(NodeId, u32)],
  rng: &mut R,
) -> Option<NodeId> {
  match strategy {
    PickStrategy::Uniform => candidates.choose(rng).map(|(id, _)| id.clone()),
    PickStrategy::Linear => candidates
      .choose_weighted(rng, |(_, q)| *q as u64 + 1)
      .ok()
      .map(|(id, _)| id.clone()),
    PickStrategy::Quadratic => candidates
      .choose_weighted(rng, |(_, q)| (*q as u64) * (*q as u64) + 1)
      .ok()
      .map(|(id, _)| id.clone()),
  }
}
