use crate::core::{
  forge, Actor, ActorContext, ActorRef, ActorSignal, Destination, Socket,
};
use crate::detector::{pick_peer, NodeMap};
use crate::messages::{
  Beats, MulticastParams, NodeId, NodeMsg, PickStrategy, StartBundle,
  TrackerMsg, NODE_ACTOR, TRACKER_ACTOR,
};
use crate::testkit::{send_fallible, FailureConfig};
use async_trait::async_trait;
use std::mem::replace;
use std::time::Duration;
use tokio::sync::mpsc::Sender;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};
use NodeMsg::*;

/// Cadence of the catastrophe-recovery multicast lottery.
pub const MULTICAST_REMINDER_PERIOD: Duration = Duration::from_secs(1);

/// How long an unacknowledged registration waits before it is re-sent.
const REGISTER_RETRY_PERIOD: Duration = Duration::from_secs(1);

struct Common {
  id: NodeId,
  tracker: ActorRef<TrackerMsg>,
  dest: Destination<NodeMsg>,
  fail: FailureConfig,
}
impl Common {
  async fn send_peer(&self, socket: &Socket, msg: &NodeMsg) {
    send_fallible(&self.fail, socket, &self.dest, msg).await;
  }
}

enum Phase {
  Idle,
  Running(Box<Running>),
}

/// The gossip-style failure detection engine of one node. A two-phase actor:
/// idle until the tracker's Start arrives, then gossiping, timing peers out
/// and reporting suspicions until Stop, Shutdown or its own simulated crash.
pub struct Detector {
  common: Common,
  notify: Sender<()>,
  registered: bool,
  register_reminder: Option<JoinHandle<()>>,
  phase: Phase,
}
impl Detector {
  /// A detector that will register itself with the tracker at
  /// `tracker_socket`. `notify` fires once after Shutdown is processed.
  pub fn new(id: NodeId, tracker_socket: Socket, notify: Sender<()>) -> Detector {
    Self::with_failure(id, tracker_socket, notify, FailureConfig::default())
  }

  /// Same, with every peer-to-peer send subjected to `fail`. Control traffic
  /// to the tracker is never dropped artificially.
  pub fn with_failure(
    id: NodeId,
    tracker_socket: Socket,
    notify: Sender<()>,
    fail: FailureConfig,
  ) -> Detector {
    Detector {
      common: Common {
        id: id,
        tracker: forge::<TrackerMsg>(TRACKER_ACTOR, tracker_socket),
        dest: Destination::new(NODE_ACTOR),
        fail: fail,
      },
      notify: notify,
      registered: false,
      register_reminder: None,
      phase: Phase::Idle,
    }
  }

  async fn register(&mut self, ctx: &ActorContext<NodeMsg>) {
    self
      .common
      .tracker
      .move_to(TrackerMsg::Registration {
        node: self.common.id.clone(),
        socket: ctx.node.socket().clone(),
      })
      .await;
    let handle = ctx.node.schedule_local_msg(
      REGISTER_RETRY_PERIOD,
      ctx.local_interface(),
      RegisterReminder,
    );
    if let Some(old) = self.register_reminder.replace(handle) {
      old.abort();
    }
  }

  async fn on_start(&mut self, ctx: &ActorContext<NodeMsg>, bundle: StartBundle) {
    self.registered = true;
    if let Some(handle) = self.register_reminder.take() {
      handle.abort();
    }
    if let Phase::Running(run) = replace(&mut self.phase, Phase::Idle) {
      debug!("{}: restarted while running", self.common.id);
      run.shutdown();
    }
    let faulty = bundle.simulate_crash_at;
    let mut run = Box::new(Running::new(self.common.id.clone(), bundle));
    for peer in run.peers.active_peers() {
      let handle = ctx.node.schedule_local_msg(
        run.failure_delta,
        ctx.local_interface(),
        Fail {
          peer: peer.clone(),
          token: 0,
        },
      );
      run.peers.arm(&peer, handle);
    }
    if let Some(delta) = faulty {
      run.crash_timer = Some(ctx.node.schedule_local_msg(
        Duration::from_millis(delta),
        ctx.local_interface(),
        SelfCrash,
      ));
    }
    run.gossip_reminder = Some(ctx.node.schedule_local_msg(
      run.gossip_delta,
      ctx.local_interface(),
      GossipReminder,
    ));
    if run.multicast.is_some() {
      run.multicast_wait = 0;
      run.multicast_reminder = Some(ctx.node.schedule_local_msg(
        MULTICAST_REMINDER_PERIOD,
        ctx.local_interface(),
        MulticastReminder,
      ));
    }
    self.phase = Phase::Running(run);
    match faulty {
      Some(delta) => info!("{}: started, crashing in {} ms", self.common.id, delta),
      None => info!("{}: started correct", self.common.id),
    }
  }

  fn on_stop(&mut self) {
    match replace(&mut self.phase, Phase::Idle) {
      Phase::Running(run) => {
        run.shutdown();
        info!("{}: stopped", self.common.id);
      }
      Phase::Idle => debug!("{}: stop while idle", self.common.id),
    }
  }

  async fn on_self_crash(&mut self, _: &ActorContext<NodeMsg>) {
    match replace(&mut self.phase, Phase::Idle) {
      Phase::Running(run) => {
        run.shutdown();
        self
          .common
          .tracker
          .move_to(TrackerMsg::Crash {
            node: self.common.id.clone(),
          })
          .await;
        info!("{}: simulating a crash", self.common.id);
      }
      Phase::Idle => trace!("{}: crash timer echo while idle", self.common.id),
    }
  }

  fn on_shutdown(&mut self, ctx: &ActorContext<NodeMsg>) {
    if let Phase::Running(run) = replace(&mut self.phase, Phase::Idle) {
      run.shutdown();
    }
    if let Some(handle) = self.register_reminder.take() {
      handle.abort();
    }
    info!("{}: shutting down", self.common.id);
    ctx.local_interface().signal(ActorSignal::Term);
  }
}
#[async_trait]
impl Actor<NodeMsg> for Detector {
  async fn pre_start(&mut self, ctx: &ActorContext<NodeMsg>) {
    info!("{}: registering with the tracker", self.common.id);
    self.register(ctx).await;
  }

  async fn recv(&mut self, ctx: &ActorContext<NodeMsg>, msg: NodeMsg) {
    match msg {
      Start(bundle) => self.on_start(ctx, bundle).await,
      Stop => self.on_stop(),
      Shutdown => self.on_shutdown(ctx),
      SelfCrash => self.on_self_crash(ctx).await,
      RegisterReminder => {
        if !self.registered {
          self.register(ctx).await;
        }
      }
      other => match &mut self.phase {
        Phase::Idle => debug!("{}: dropped a message while idle", self.common.id),
        Phase::Running(run) => run.process(&self.common, ctx, other).await,
      },
    }
  }

  async fn post_stop(&mut self, _: &ActorContext<NodeMsg>) {
    let _ = self.notify.send(()).await;
  }
}

/// Everything that only exists during an experiment.
struct Running {
  addrs: im::HashMap<NodeId, Socket>,
  peers: NodeMap,
  gossip_delta: Duration,
  failure_delta: Duration,
  miss_delta: Duration,
  cleanup_delta: Duration,
  push_pull: bool,
  pick: PickStrategy,
  multicast: Option<MulticastParams>,
  multicast_wait: u32,
  gossip_reminder: Option<JoinHandle<()>>,
  multicast_reminder: Option<JoinHandle<()>>,
  crash_timer: Option<JoinHandle<()>>,
}
impl Running {
  fn new(own: NodeId, bundle: StartBundle) -> Running {
    let peers = NodeMap::new(own, bundle.nodes.keys().cloned());
    Running {
      addrs: bundle.nodes,
      peers: peers,
      gossip_delta: Duration::from_millis(bundle.gossip_delta),
      failure_delta: Duration::from_millis(bundle.failure_delta),
      miss_delta: Duration::from_millis(bundle.miss_delta),
      cleanup_delta: Duration::from_millis(2 * bundle.failure_delta),
      push_pull: bundle.push_pull,
      pick: bundle.pick_strategy,
      multicast: bundle.multicast,
      multicast_wait: 0,
      gossip_reminder: None,
      multicast_reminder: None,
      crash_timer: None,
    }
  }

  fn shutdown(mut self: Box<Running>) {
    self.peers.cancel_all_timers();
    self
      .gossip_reminder
      .take()
      .into_iter()
      .chain(self.multicast_reminder.take())
      .chain(self.crash_timer.take())
      .for_each(|handle| handle.abort());
  }

  async fn process(
    &mut self,
    common: &Common,
    ctx: &ActorContext<NodeMsg>,
    msg: NodeMsg,
  ) {
    match msg {
      Gossip { from, beats } => {
        self.merge(ctx, &beats);
        if self.push_pull {
          let reply = GossipReply {
            beats: self.peers.current_beats(),
          };
          self.send_to(common, &from, reply).await;
        }
      }
      GossipReply { beats } => self.merge(ctx, &beats),
      CatastropheMulticast { from, beats } => {
        self.merge(ctx, &beats);
        self.multicast_wait = 0;
        // replied independently of the push-pull flag
        let reply = CatastropheReply {
          beats: self.peers.current_beats(),
        };
        self.send_to(common, &from, reply).await;
      }
      CatastropheReply { beats } => self.merge(ctx, &beats),
      GossipReminder => self.gossip_round(common, ctx).await,
      MulticastReminder => self.multicast_round(common, ctx).await,
      Fail { peer, token } => self.on_fail(common, ctx, peer, token).await,
      Miss { peer, token } => self.on_miss(common, ctx, peer, token).await,
      Cleanup { peer, token } => self.on_cleanup(common, peer, token),
      other => trace!("{}: ignored {:?} while running", common.id, other),
    }
  }

  /// Applies an incoming view and re-arms the failure timer of every peer
  /// whose counter advanced.
  fn merge(&mut self, ctx: &ActorContext<NodeMsg>, beats: &Beats) {
    for peer in self.peers.apply_beats(beats) {
      let token = self.peers.bump_token(&peer);
      let handle = ctx.node.schedule_local_msg(
        self.failure_delta,
        ctx.local_interface(),
        Fail {
          peer: peer.clone(),
          token: token,
        },
      );
      self.peers.arm(&peer, handle);
    }
  }

  async fn gossip_round(&mut self, common: &Common, ctx: &ActorContext<NodeMsg>) {
    self.peers.heartbeat();
    let candidates = self.peers.correct_peers();
    let picked = pick_peer(self.pick, &candidates, &mut rand::thread_rng());
    match picked {
      None => debug!("{}: gossip skipped, no correct peer", common.id),
      Some(target) => {
        let msg = Gossip {
          from: common.id.clone(),
          beats: self.peers.current_beats(),
        };
        self.send_to(common, &target, msg).await;
        self.peers.reset_quiescence(&target);
      }
    }
    self.gossip_reminder = Some(ctx.node.schedule_local_msg(
      self.gossip_delta,
      ctx.local_interface(),
      GossipReminder,
    ));
  }

  async fn multicast_round(&mut self, common: &Common, ctx: &ActorContext<NodeMsg>) {
    let params = match self.multicast {
      Some(params) => params,
      None => return,
    };
    let prob = if params.max_wait == 0 {
      1.0
    } else {
      (self.multicast_wait as f64 / params.max_wait as f64).powi(params.param as i32)
    };
    if rand::random::<f64>() < prob {
      self.peers.heartbeat();
      let beats = self.peers.current_beats();
      for peer in self.peers.active_peers() {
        let msg = CatastropheMulticast {
          from: common.id.clone(),
          beats: beats.clone(),
        };
        self.send_to(common, &peer, msg).await;
        self.peers.reset_quiescence(&peer);
      }
      self.multicast_wait = 0;
      debug!("{}: issued a catastrophe multicast", common.id);
    } else {
      self.multicast_wait = (self.multicast_wait + 1).min(params.max_wait);
    }
    self.multicast_reminder = Some(ctx.node.schedule_local_msg(
      MULTICAST_REMINDER_PERIOD,
      ctx.local_interface(),
      MulticastReminder,
    ));
  }

  async fn on_fail(
    &mut self,
    common: &Common,
    ctx: &ActorContext<NodeMsg>,
    peer: NodeId,
    token: u64,
  ) {
    if !self.peers.timer_current(&peer, token) {
      trace!("{}: stale fail timer for {}", common.id, peer);
      return;
    }
    if self.multicast.is_some() {
      // catastrophe mode grants a grace period before the verdict
      self.peers.set_missing(&peer);
      let token = self.peers.bump_token(&peer);
      let handle = ctx.node.schedule_local_msg(
        self.miss_delta,
        ctx.local_interface(),
        Miss {
          peer: peer.clone(),
          token: token,
        },
      );
      self.peers.arm(&peer, handle);
      info!("{}: {} went missing", common.id, peer);
    } else {
      self.fail_peer(common, ctx, peer).await;
    }
  }

  async fn on_miss(
    &mut self,
    common: &Common,
    ctx: &ActorContext<NodeMsg>,
    peer: NodeId,
    token: u64,
  ) {
    if !self.peers.timer_current(&peer, token) {
      trace!("{}: stale miss timer for {}", common.id, peer);
      return;
    }
    self.fail_peer(common, ctx, peer).await;
  }

  fn on_cleanup(&mut self, common: &Common, peer: NodeId, token: u64) {
    if !self.peers.timer_current(&peer, token) {
      trace!("{}: stale cleanup timer for {}", common.id, peer);
      return;
    }
    self.peers.remove(&peer);
    debug!("{}: forgot {}", common.id, peer);
  }

  async fn fail_peer(
    &mut self,
    common: &Common,
    ctx: &ActorContext<NodeMsg>,
    peer: NodeId,
  ) {
    self.peers.set_failed(&peer);
    common
      .tracker
      .move_to(TrackerMsg::CrashReport {
        crashed: peer.clone(),
        reporter: common.id.clone(),
      })
      .await;
    info!("{}: reported {} as failed", common.id, peer);
    let token = self.peers.bump_token(&peer);
    let handle = ctx.node.schedule_local_msg(
      self.cleanup_delta,
      ctx.local_interface(),
      Cleanup {
        peer: peer.clone(),
        token: token,
      },
    );
    self.peers.arm(&peer, handle);
  }

  async fn send_to(&self, common: &Common, peer: &NodeId, msg: NodeMsg) {
    match self.addrs.get(peer) {
      Some(socket) => common.send_peer(socket, &msg).await,
      None => warn!("{}: no address for {}", common.id, peer),
    }
  }
}
