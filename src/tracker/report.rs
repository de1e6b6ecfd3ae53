use crate::messages::{NodeId, PickStrategy};
use crate::tracker::Experiment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
  #[error("could not write the report: {0}")]
  Io(#[from] std::io::Error),
  #[error("could not serialize the report: {0}")]
  Json(#[from] serde_json::Error),
}

/// The JSON document written for one experiment. Round-trips through serde
/// so the analysis side can read reports back.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Report {
  pub id: String,
  pub seed: u64,
  pub repetition: u32,
  pub settings: ReportSettings,
  pub result: ReportResult,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportSettings {
  pub number_of_nodes: usize,
  pub duration: u64,
  pub simulate_catastrophe: bool,
  pub gossip_delta: u64,
  pub failure_delta: u64,
  pub miss_delta: u64,
  pub push_pull: bool,
  pub pick_strategy: PickStrategy,
  pub enable_multicast: bool,
  pub multicast_parameter: Option<u32>,
  pub multicast_max_wait: Option<u32>,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportResult {
  /// Epoch milliseconds.
  pub start_time: i64,
  /// Epoch milliseconds.
  pub end_time: i64,
  pub expected_crashes: Vec<ExpectedCrashEntry>,
  pub reported_crashes: Vec<ReportedCrashEntry>,
}

/// Deltas are milliseconds since `start_time`.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ExpectedCrashEntry {
  pub delta: u64,
  pub node: NodeId,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ReportedCrashEntry {
  pub delta: u64,
  pub node: NodeId,
  pub reporter: NodeId,
}

impl Report {
  /// Writes this report as pretty-printed JSON under `dir` and returns the
  /// path. The filename is derived from the experiment id.
  pub fn write(&self, dir: &Path) -> Result<PathBuf, ReportError> {
    let path = dir.join(format!("experiment-{}.json", self.id));
    fs::write(&path, serde_json::to_vec_pretty(self)?)?;
    Ok(path)
  }
}

impl Experiment {
  /// Assembles the report document. Requires `start()` and `stop()` to have
  /// been called; anything else is a programming error in the tracker.
  pub fn report(&self) -> Report {
    let start = match self.start_time() {
      Some(start) => start,
      None => panic!("report() requires the experiment to have been started"),
    };
    let stop = match self.stop_time() {
      Some(stop) => stop,
      None => panic!("report() requires the experiment to have been stopped"),
    };
    let s = self.settings();
    Report {
      id: self.id().to_string(),
      seed: self.seed(),
      repetition: self.repetition(),
      settings: ReportSettings {
        number_of_nodes: s.number_of_nodes,
        duration: s.duration,
        simulate_catastrophe: s.simulate_catastrophe,
        gossip_delta: s.gossip_delta,
        failure_delta: s.failure_delta,
        miss_delta: s.miss_delta,
        push_pull: s.push_pull,
        pick_strategy: s.pick_strategy,
        enable_multicast: s.multicast.is_some(),
        multicast_parameter: s.multicast.map(|m| m.param),
        multicast_max_wait: s.multicast.map(|m| m.max_wait),
      },
      result: ReportResult {
        start_time: start,
        end_time: stop,
        expected_crashes: self
          .expected_crashes()
          .iter()
          .map(|c| ExpectedCrashEntry {
            delta: c.delta,
            node: c.node.clone(),
          })
          .collect(),
        reported_crashes: self
          .reported_crashes()
          .iter()
          .map(|c| ReportedCrashEntry {
            delta: c.delta,
            node: c.node.clone(),
            reporter: c.reporter.clone(),
          })
          .collect(),
      },
    }
  }

  /// Serializes the report for this experiment into `dir`. I/O trouble is an
  /// error for this experiment only; the caller decides whether to go on.
  pub fn generate_report(&self, dir: &Path) -> Result<PathBuf, ReportError> {
    self.report().write(dir)
  }
}
