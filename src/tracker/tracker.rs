use crate::config::TrackerConfig;
use crate::core::{
  udp_msg, Actor, ActorContext, ActorSignal, Destination, Socket,
};
use crate::messages::{
  NodeId, NodeMsg, StartBundle, TrackerMsg, NODE_ACTOR,
};
use crate::tracker::{generate_experiments, Experiment, ExperimentMatrix};
use async_trait::async_trait;
use itertools::Itertools;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tracing::{debug, error, info};

/// The central coordinator: collects registrations, then drives the
/// experiment list strictly sequentially, injecting crashes through Start
/// bundles and recording every crash report into the current experiment.
pub struct Tracker {
  expected_nodes: usize,
  time_between: Duration,
  report_path: PathBuf,
  matrix: Option<ExperimentMatrix>,
  registered: im::HashMap<NodeId, Socket>,
  experiments: Vec<Experiment>,
  current: Option<usize>,
  notify: Sender<()>,
  node_dest: Destination<NodeMsg>,
}
impl Tracker {
  /// A tracker that enumerates its experiment matrix from configuration once
  /// all nodes have registered. Fails if the report directory cannot be
  /// created.
  pub fn new(cfg: &TrackerConfig, notify: Sender<()>) -> std::io::Result<Tracker> {
    fs::create_dir_all(&cfg.report_path)?;
    Ok(Tracker {
      expected_nodes: cfg.nodes,
      time_between: Duration::from_millis(cfg.time_between_experiments),
      report_path: cfg.report_path.clone(),
      matrix: Some(cfg.matrix()),
      registered: im::HashMap::new(),
      experiments: Vec::new(),
      current: None,
      notify: notify,
      node_dest: Destination::new(NODE_ACTOR),
    })
  }

  /// A tracker with a fixed experiment list, for runs whose crash schedule
  /// must be pinned rather than drawn from a seed.
  pub fn with_experiments(
    expected_nodes: usize,
    time_between: Duration,
    report_path: PathBuf,
    experiments: Vec<Experiment>,
    notify: Sender<()>,
  ) -> std::io::Result<Tracker> {
    fs::create_dir_all(&report_path)?;
    Ok(Tracker {
      expected_nodes: expected_nodes,
      time_between: time_between,
      report_path: report_path,
      matrix: None,
      registered: im::HashMap::new(),
      experiments: experiments,
      current: None,
      notify: notify,
      node_dest: Destination::new(NODE_ACTOR),
    })
  }

  async fn on_registration(
    &mut self,
    ctx: &ActorContext<TrackerMsg>,
    node: NodeId,
    socket: Socket,
  ) {
    if self.registered.contains_key(&node) {
      debug!("{} registered again, ignored", node);
      return;
    }
    if self.registered.len() >= self.expected_nodes {
      error!("too many nodes joined already, cannot accept {}", node);
      return;
    }
    debug!("registration of {}", node);
    self.registered.insert(node, socket);
    if self.registered.len() == self.expected_nodes {
      info!(
        "got all {} nodes, ready to start the experiments",
        self.expected_nodes
      );
      self.on_ready(ctx).await;
    }
  }

  async fn on_ready(&mut self, ctx: &ActorContext<TrackerMsg>) {
    if let Some(matrix) = &self.matrix {
      let ids = self.registered.keys().cloned().collect_vec();
      self.experiments = generate_experiments(matrix, &ids);
      info!("generated {} experiments", self.experiments.len());
    }
    if self.experiments.is_empty() {
      error!("no experiments to run, shutting down");
      self.shutdown(ctx).await;
      return;
    }
    self.start_experiment(ctx, 0).await;
  }

  async fn start_experiment(&mut self, ctx: &ActorContext<TrackerMsg>, index: usize) {
    let settings = self.experiments[index].settings().clone();
    let crashes_by_node = self.experiments[index]
      .expected_crashes()
      .iter()
      .map(|c| (c.node.clone(), c.delta))
      .collect::<HashMap<_, _>>();
    info!(
      "starting experiment {} of {}",
      index + 1,
      self.experiments.len()
    );
    self.experiments[index].start();
    self.current = Some(index);
    for (id, socket) in self.registered.iter() {
      let bundle = StartBundle {
        nodes: self.registered.clone(),
        simulate_crash_at: crashes_by_node.get(id).copied(),
        gossip_delta: settings.gossip_delta,
        failure_delta: settings.failure_delta,
        miss_delta: settings.miss_delta,
        push_pull: settings.push_pull,
        pick_strategy: settings.pick_strategy,
        multicast: settings.multicast,
      };
      udp_msg(socket, &self.node_dest, &NodeMsg::Start(bundle)).await;
    }
    let _ = ctx.node.schedule_local_msg(
      Duration::from_millis(settings.duration),
      ctx.local_interface(),
      TrackerMsg::StopExperiment(index),
    );
  }

  async fn stop_experiment(&mut self, ctx: &ActorContext<TrackerMsg>, index: usize) {
    info!(
      "stopping experiment {} of {}",
      index + 1,
      self.experiments.len()
    );
    for socket in self.registered.values() {
      udp_msg(socket, &self.node_dest, &NodeMsg::Stop).await;
    }
    self.experiments[index].stop();
    self.current = None;
    match self.experiments[index].generate_report(&self.report_path) {
      Ok(path) => debug!("wrote report {}", path.display()),
      Err(e) => error!("report for experiment {} failed: {}", index + 1, e),
    }
    if index + 1 == self.experiments.len() {
      info!("no more experiments to perform, shutting down the nodes");
      self.shutdown(ctx).await;
    } else {
      debug!(
        "waiting {:?} before starting the next experiment",
        self.time_between
      );
      let _ = ctx.node.schedule_local_msg(
        self.time_between,
        ctx.local_interface(),
        TrackerMsg::StartExperiment(index + 1),
      );
    }
  }

  async fn shutdown(&mut self, ctx: &ActorContext<TrackerMsg>) {
    for socket in self.registered.values() {
      udp_msg(socket, &self.node_dest, &NodeMsg::Shutdown).await;
    }
    let _ = self.notify.send(()).await;
    ctx.local_interface().signal(ActorSignal::Term);
  }

  fn on_crash_report(&mut self, crashed: NodeId, reporter: NodeId) {
    match self.current {
      Some(index) => {
        info!("{} reported the crash of {}", reporter, crashed);
        self.experiments[index].add_crash(crashed, reporter);
      }
      None => error!(
        "crash report of {} from {} outside an experiment",
        crashed, reporter
      ),
    }
  }
}
#[async_trait]
impl Actor<TrackerMsg> for Tracker {
  async fn pre_start(&mut self, _: &ActorContext<TrackerMsg>) {
    info!(
      "tracker started, expecting {} nodes to register",
      self.expected_nodes
    );
  }

  async fn recv(&mut self, ctx: &ActorContext<TrackerMsg>, msg: TrackerMsg) {
    match msg {
      TrackerMsg::Registration { node, socket } => {
        self.on_registration(ctx, node, socket).await;
      }
      TrackerMsg::Crash { node } => info!("{} simulated its crash", node),
      TrackerMsg::CrashReport { crashed, reporter } => {
        self.on_crash_report(crashed, reporter);
      }
      TrackerMsg::StartExperiment(index) => {
        if index < self.experiments.len() {
          self.start_experiment(ctx, index).await;
        } else {
          error!("no experiment {} to start", index);
        }
      }
      TrackerMsg::StopExperiment(index) => {
        if Some(index) == self.current {
          self.stop_experiment(ctx, index).await;
        } else {
          error!("stop for experiment {} which is not running", index);
        }
      }
    }
  }
}
