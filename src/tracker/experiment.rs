use crate::messages::{MulticastParams, NodeId, PickStrategy};
use chrono::Utc;

pub(crate) fn now_ms() -> i64 {
  Utc::now().timestamp_millis()
}

/// A crash the tracker will inject: `node` is told to die `delta`
/// milliseconds after the experiment starts.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ExpectedCrash {
  pub delta: u64,
  pub node: NodeId,
}

/// A suspicion some node raised: `reporter` reported `node` crashed, `delta`
/// milliseconds after the experiment started.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ReportedCrash {
  pub delta: u64,
  pub node: NodeId,
  pub reporter: NodeId,
}

/// The tuning parameters of one experiment, fixed at generation.
#[derive(Clone, Debug)]
pub struct ExperimentSettings {
  pub number_of_nodes: usize,
  /// Total length of the run in milliseconds.
  pub duration: u64,
  pub simulate_catastrophe: bool,
  pub gossip_delta: u64,
  pub failure_delta: u64,
  pub miss_delta: u64,
  pub push_pull: bool,
  pub pick_strategy: PickStrategy,
  /// Absent when catastrophe recovery is disabled for the run.
  pub multicast: Option<MulticastParams>,
}

/// One parameterized run: its settings, the crashes scheduled for it and the
/// crash reports collected while it ran.
///
/// The lifecycle is `start()`, any number of `add_crash()`, `stop()`, then
/// reporting; each of the first three is legal exactly where that order says.
/// Violations are programming errors in the tracker and panic.
pub struct Experiment {
  id: String,
  seed: u64,
  repetition: u32,
  settings: ExperimentSettings,
  expected_crashes: Vec<ExpectedCrash>,
  reported_crashes: Vec<ReportedCrash>,
  start: Option<i64>,
  stop: Option<i64>,
}
impl Experiment {
  pub fn new(
    id: String,
    seed: u64,
    repetition: u32,
    settings: ExperimentSettings,
    expected_crashes: Vec<ExpectedCrash>,
  ) -> Experiment {
    Experiment {
      id: id,
      seed: seed,
      repetition: repetition,
      settings: settings,
      expected_crashes: expected_crashes,
      reported_crashes: Vec::new(),
      start: None,
      stop: None,
    }
  }

  pub fn id(&self) -> &str {
    &self.id
  }

  pub fn seed(&self) -> u64 {
    self.seed
  }

  pub fn repetition(&self) -> u32 {
    self.repetition
  }

  pub fn settings(&self) -> &ExperimentSettings {
    &self.settings
  }

  pub fn expected_crashes(&self) -> &[ExpectedCrash] {
    &self.expected_crashes
  }

  pub fn reported_crashes(&self) -> &[ReportedCrash] {
    &self.reported_crashes
  }

  pub(crate) fn start_time(&self) -> Option<i64> {
    self.start
  }

  pub(crate) fn stop_time(&self) -> Option<i64> {
    self.stop
  }

  /// Marks the experiment started. Must be called exactly once.
  pub fn start(&mut self) {
    if self.start.is_some() {
      panic!("start() must be called exactly once per experiment");
    }
    self.start = Some(now_ms());
  }

  /// Marks the experiment stopped. Must be called exactly once, after
  /// `start()`.
  pub fn stop(&mut self) {
    if self.start.is_none() {
      panic!("stop() requires the experiment to have been started");
    }
    if self.stop.is_some() {
      panic!("stop() must be called exactly once per experiment");
    }
    self.stop = Some(now_ms());
  }

  /// Records a crash report at an offset of now from the experiment start.
  pub fn add_crash(&mut self, node: NodeId, reporter: NodeId) {
    let start = match self.start {
      Some(start) => start,
      None => panic!("add_crash() requires the experiment to have been started"),
    };
    let delta = (now_ms() - start).max(0) as u64;
    self.reported_crashes.push(ReportedCrash {
      delta: delta,
      node: node,
      reporter: reporter,
    });
  }
}
