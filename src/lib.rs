//! Gossip-style failure detection with an experiment harness.
//!
//! Every node keeps a heartbeat counter for each of its peers and spreads its
//! view through randomized gossip. A peer whose counter stops advancing for a
//! failure period is suspected; in catastrophe mode suspicion first passes
//! through a missing state with a grace period and recovery is helped along
//! by an occasional multicast of the full view. Suspicions are reported to a
//! central tracker, which drives a whole matrix of parameterized experiments:
//! it registers the nodes, broadcasts the per-experiment tuning, injects
//! crashes, collects the crash reports and writes one JSON document per
//! experiment.
//!
//! # Modules
//! - [`core`]: a minimal distributed actor runtime. Typed actors on tokio,
//!   UDP remoting addressed by registered name, scheduled self-messages.
//! - [`messages`]: the full message vocabulary of the system.
//! - [`detector`]: the node side. The heartbeat view, the gossip target
//!   selector and the protocol engine.
//! - [`tracker`]: the coordinator side. Experiment records, matrix
//!   generation with seeded crash schedules, reports and the orchestrator.
//! - [`config`]: environment-variable configuration for the binaries.
//! - [`testkit`]: failure injection for lossy-network runs.
//!
//! The detector is probabilistic in latency but strongly eventual in
//! convergence among correct nodes: under a live network every correct node
//! eventually reports every crashed peer, and counters only ever advance, so
//! merges are idempotent under reordering and duplication.

pub mod config;
pub mod core;
pub mod detector;
pub mod messages;
pub mod testkit;
pub mod tracker;
