//! The node side of the system: the heartbeat view each node keeps of its
//! peers, the gossip target selector, and the protocol engine tying them
//! together.

mod detector;
mod pick;
mod view;

#[rustfmt::skip]
pub use {
  detector::Detector,
  detector::MULTICAST_REMINDER_PERIOD,
  pick::pick_peer,
  view::NodeMap,
  view::PeerInfo,
  view::PeerStatus,
};
