//! Failure injection for experiments and tests: a drop probability applied
//! to peer-to-peer sends, so message loss tolerance can be exercised on an
//! otherwise reliable loopback network.

use crate::core::{udp_msg, Destination, Socket};
use serde::Serialize;

/// How unreliable a node's peer-to-peer sends should be. The default drops
/// nothing.
#[derive(Clone, Copy, Debug, Default)]
pub struct FailureConfig {
  /// Probability in `[0, 1]` that any single protocol message is lost before
  /// it reaches the wire.
  pub drop_prob: f64,
}
impl FailureConfig {
  pub fn drop_prob(p: f64) -> FailureConfig {
    FailureConfig { drop_prob: p }
  }
}

/// Sends like [`udp_msg`], except the message may be dropped according to
/// `fail`. Lost messages are indistinguishable from network loss.
pub async fn send_fallible<I: Serialize>(
  fail: &FailureConfig,
  socket: &Socket,
  dest: &Destination<I>,
  msg: &I,
) {
  if rand::random::<f64>() >= fail.drop_prob {
    udp_msg(socket, dest, msg).await;
  }
}
