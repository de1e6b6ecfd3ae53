use crate::messages::{Beats, NodeId};
use std::collections::HashMap;
use tokio::task::JoinHandle;

/// Local opinion on one peer. The three states partition every peer still
/// present in the view.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PeerStatus {
  Correct,
  Missing,
  Failed,
}

/// Per-peer record: the highest heartbeat counter seen, a staleness score,
/// the suspicion state and the token of the single outstanding timer.
pub struct PeerInfo {
  beat_count: u64,
  quiescence: u32,
  status: PeerStatus,
  timeout_token: u64,
  timeout_handle: Option<JoinHandle<()>>,
}
impl PeerInfo {
  fn new() -> PeerInfo {
    PeerInfo {
      beat_count: 0,
      quiescence: 0,
      status: PeerStatus::Correct,
      timeout_token: 0,
      timeout_handle: None,
    }
  }

  pub fn beat_count(&self) -> u64 {
    self.beat_count
  }

  pub fn quiescence(&self) -> u32 {
    self.quiescence
  }

  pub fn status(&self) -> PeerStatus {
    self.status
  }

  pub fn timeout_token(&self) -> u64 {
    self.timeout_token
  }
}

/// The heartbeat view one node keeps of the whole experiment, itself
/// included. Owned exclusively by the node's actor; callers outside see only
/// the snapshot returned by [`current_beats`](NodeMap::current_beats).
pub struct NodeMap {
  own: NodeId,
  peers: HashMap<NodeId, PeerInfo>,
}
impl NodeMap {
  /// Fresh view over `nodes` with every counter at 0, everyone correct and
  /// no timers armed.
  pub fn new(own: NodeId, nodes: impl IntoIterator<Item = NodeId>) -> NodeMap {
    let mut peers = nodes
      .into_iter()
      .map(|id| (id, PeerInfo::new()))
      .collect::<HashMap<_, _>>();
    peers.entry(own.clone()).or_insert_with(PeerInfo::new);
    NodeMap {
      own: own,
      peers: peers,
    }
  }

  pub fn own_id(&self) -> &NodeId {
    &self.own
  }

  pub fn get(&self, p: &NodeId) -> Option<&PeerInfo> {
    self.peers.get(p)
  }

  pub fn contains(&self, p: &NodeId) -> bool {
    self.peers.contains_key(p)
  }

  /// Increments the owner's own heartbeat counter.
  pub fn heartbeat(&mut self) {
    if let Some(info) = self.peers.get_mut(&self.own) {
      info.beat_count += 1;
    }
  }

  /// Overwrites a peer's counter and resets its staleness. Only called with
  /// strictly greater values; counters never go backwards.
  pub fn set_beat(&mut self, p: &NodeId, v: u64) {
    if let Some(info) = self.peers.get_mut(p) {
      info.beat_count = v;
      info.quiescence = 0;
    }
  }

  pub fn quiescent(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.get_mut(p) {
      info.quiescence += 1;
    }
  }

  pub fn reset_quiescence(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.get_mut(p) {
      info.quiescence = 0;
    }
  }

  pub fn set_missing(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.get_mut(p) {
      info.status = PeerStatus::Missing;
    }
  }

  pub fn unset_missing(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.get_mut(p) {
      info.status = PeerStatus::Correct;
    }
  }

  pub fn set_failed(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.get_mut(p) {
      info.status = PeerStatus::Failed;
    }
  }

  /// Forgets a peer entirely, cancelling its timer. Terminal.
  pub fn remove(&mut self, p: &NodeId) {
    if let Some(info) = self.peers.remove(p) {
      if let Some(handle) = info.timeout_handle {
        handle.abort();
      }
    }
  }

  pub fn cancel_all_timers(&mut self) {
    for info in self.peers.values_mut() {
      if let Some(handle) = info.timeout_handle.take() {
        handle.abort();
      }
    }
  }

  /// True when the timer identified by `token` is still the peer's current
  /// one. Firings carrying any other token are stale and must be dropped.
  pub fn timer_current(&self, p: &NodeId, token: u64) -> bool {
    match self.peers.get(p) {
      Some(info) => info.timeout_token == token,
      None => false,
    }
  }

  /// Invalidates the peer's outstanding timer and returns the token the next
  /// one must carry.
  pub fn bump_token(&mut self, p: &NodeId) -> u64 {
    match self.peers.get_mut(p) {
      Some(info) => {
        if let Some(handle) = info.timeout_handle.take() {
          handle.abort();
        }
        info.timeout_token += 1;
        info.timeout_token
      }
      None => 0,
    }
  }

  /// Stores the cancellation handle of the timer just scheduled for `p`.
  pub fn arm(&mut self, p: &NodeId, handle: JoinHandle<()>) {
    if let Some(info) = self.peers.get_mut(p) {
      if let Some(old) = info.timeout_handle.replace(handle) {
        old.abort();
      }
    }
  }

  /// The beat map gossiped to peers: every correct or missing peer plus the
  /// owner itself. Failed peers are excluded until cleanup forgets them.
  pub fn current_beats(&self) -> Beats {
    self
      .peers
      .iter()
      .filter(|(_, info)| info.status != PeerStatus::Failed)
      .map(|(id, info)| (id.clone(), info.beat_count))
      .collect()
  }

  /// Candidates for gossip targeting: correct peers other than the owner,
  /// with their staleness scores.
  pub fn correct_peers(&self) -> Vec<(NodeId, u32)> {
    self
      .peers
      .iter()
      .filter(|(id, info)| **id != self.own && info.status == PeerStatus::Correct)
      .map(|(id, info)| (id.clone(), info.quiescence))
      .collect()
  }

  /// Recipients of a catastrophe multicast: correct and missing peers other
  /// than the owner.
  pub fn active_peers(&self) -> Vec<NodeId> {
    self
      .peers
      .iter()
      .filter(|(id, info)| **id != self.own && info.status != PeerStatus::Failed)
      .map(|(id, _)| id.clone())
      .collect()
  }

  /// Merges an incoming beat map into the view and returns the peers whose
  /// counters advanced; the caller owes each of them a fresh failure timer.
  ///
  /// Only peers currently correct or missing are considered, and only where
  /// the incoming map has an entry. A strictly greater counter overwrites the
  /// local one, clears staleness and revives a missing peer; any other entry
  /// leaves the counter in place and raises the peer's staleness. The owner's
  /// own entry is ignored.
  pub fn apply_beats(&mut self, incoming: &Beats) -> Vec<NodeId> {
    let mut advanced = Vec::new();
    for (id, info) in self.peers.iter_mut() {
      if *id == self.own || info.status == PeerStatus::Failed {
        continue;
      }
      let gossiped = match incoming.get(id) {
        Some(v) => *v,
        None => continue,
      };
      if gossiped > info.beat_count {
        info.beat_count = gossiped;
        info.quiescence = 0;
        info.status = PeerStatus::Correct;
        advanced.push(id.clone());
      } else {
        info.quiescence += 1;
      }
    }
    advanced
  }
}
