//! Every message exchanged in the system: tracker control traffic, the gossip
//! protocol itself, and the timer self-messages the engines deliver to their
//! own inboxes.

use crate::core::Socket;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// The name every protocol engine registers under on its own
/// [`Node`](crate::core::Node).
pub const NODE_ACTOR: &str = "node";
/// The name the tracker registers under.
pub const TRACKER_ACTOR: &str = "tracker";

/// Stable opaque identifier of a protocol node. Equality is by identity; the
/// node set is fixed for the length of one experiment.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct NodeId(String);
impl NodeId {
  pub fn new(s: &str) -> NodeId {
    NodeId(s.to_string())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}
impl fmt::Display for NodeId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The probability distribution a gossip target is drawn from.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PickStrategy {
  /// Every correct peer is equally likely.
  Uniform,
  /// Each peer is weighted `quiescence + 1`.
  Linear,
  /// Each peer is weighted `quiescence² + 1`.
  Quadratic,
}
impl PickStrategy {
  pub const ALL: [PickStrategy; 3] = [
    PickStrategy::Uniform,
    PickStrategy::Linear,
    PickStrategy::Quadratic,
  ];
}

/// Tuning of the catastrophe-recovery multicast. Its absence in a
/// [`StartBundle`] means multicast is disabled for the run.
#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct MulticastParams {
  /// The exponent `a` of the send probability `(wait / max_wait)^a`.
  pub param: u32,
  /// The number of reminder periods after which a multicast is certain.
  pub max_wait: u32,
}

/// Everything a node needs to run one experiment. Broadcast by the tracker;
/// immutable once constructed.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct StartBundle {
  /// The full node set of the experiment, including the receiver.
  pub nodes: im::HashMap<NodeId, Socket>,
  /// `Some(delta)` tells the receiver to simulate a crash `delta`
  /// milliseconds after the start; absent for correct nodes.
  pub simulate_crash_at: Option<u64>,
  /// Gossip period Δg in milliseconds.
  pub gossip_delta: u64,
  /// Failure period Δf in milliseconds.
  pub failure_delta: u64,
  /// Miss period Δm in milliseconds.
  pub miss_delta: u64,
  /// Reply to every gossip with the receiver's own view.
  pub push_pull: bool,
  pub pick_strategy: PickStrategy,
  pub multicast: Option<MulticastParams>,
}

/// The beat map carried by gossip: the highest counter the sender has
/// observed for every peer it still believes correct or missing, plus itself.
pub type Beats = BTreeMap<NodeId, u64>;

/// Inbox of a protocol engine: tracker control, peer gossip, and the timer
/// self-messages the engine schedules for itself. Timer messages carry the
/// token snapshot taken when they were scheduled; stale tokens are dropped
/// on receipt.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum NodeMsg {
  Start(StartBundle),
  Stop,
  Shutdown,
  Gossip { from: NodeId, beats: Beats },
  GossipReply { beats: Beats },
  CatastropheMulticast { from: NodeId, beats: Beats },
  CatastropheReply { beats: Beats },
  GossipReminder,
  MulticastReminder,
  RegisterReminder,
  SelfCrash,
  Fail { peer: NodeId, token: u64 },
  Miss { peer: NodeId, token: u64 },
  Cleanup { peer: NodeId, token: u64 },
}

/// Inbox of the tracker: registrations and crash reports from the nodes,
/// plus its own experiment-sequencing timer messages.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub enum TrackerMsg {
  Registration { node: NodeId, socket: Socket },
  /// Informational only; the tracker scheduled this crash itself.
  Crash { node: NodeId },
  CrashReport { crashed: NodeId, reporter: NodeId },
  StartExperiment(usize),
  StopExperiment(usize),
}
