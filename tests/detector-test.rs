use async_trait::async_trait;
use gossip_fd::core::{
  Actor, ActorContext, Host, Node, Socket,
};
use gossip_fd::detector::Detector;
use gossip_fd::messages::{
  MulticastParams, NodeId, NodeMsg, PickStrategy, StartBundle, TrackerMsg,
  NODE_ACTOR, TRACKER_ACTOR,
};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::mpsc::{channel, unbounded_channel, UnboundedReceiver};
use tokio::time::sleep;

const HOST: Host = Host::IP(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));

// stands in for the tracker and hands every message to the test
struct Capture {
  forward: tokio::sync::mpsc::UnboundedSender<TrackerMsg>,
}
#[async_trait]
impl Actor<TrackerMsg> for Capture {
  async fn recv(&mut self, _: &ActorContext<TrackerMsg>, msg: TrackerMsg) {
    let _ = self.forward.send(msg);
  }
}

fn bundle(
  own_port: u16,
  ghost: &NodeId,
  ghost_port: u16,
  multicast: Option<MulticastParams>,
) -> StartBundle {
  // deltas far beyond the test length, so only injected timer messages fire
  StartBundle {
    nodes: im::hashmap! {
      NodeId::new("n0") => Socket::new(HOST, own_port),
      ghost.clone() => Socket::new(HOST, ghost_port)
    },
    simulate_crash_at: None,
    gossip_delta: 60_000,
    failure_delta: 60_000,
    miss_delta: 60_000,
    push_pull: false,
    pick_strategy: PickStrategy::Uniform,
    multicast: multicast,
  }
}

fn assert_no_crash_report(rx: &mut UnboundedReceiver<TrackerMsg>) {
  while let Ok(msg) = rx.try_recv() {
    if let TrackerMsg::CrashReport { crashed, reporter } = msg {
      panic!("unexpected report of {} by {}", crashed, reporter);
    }
  }
}

async fn expect_crash_report(
  rx: &mut UnboundedReceiver<TrackerMsg>,
) -> (NodeId, NodeId) {
  loop {
    let msg = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .expect("no crash report arrived")
      .expect("capture channel closed");
    if let TrackerMsg::CrashReport { crashed, reporter } = msg {
      return (crashed, reporter);
    }
  }
}

// A firing whose token does not match the peer's current one must leave the
// engine untouched: no state change, no crash report. The current token is
// then honored, which proves the harness would have caught a report.
#[test]
fn stale_fail_timers_change_nothing() {
  let tracker_socket = Socket::new(HOST, 4590);
  let tracker_node = Node::new(tracker_socket.clone(), 1).unwrap();
  let (cap_tx, mut cap_rx) = unbounded_channel();
  tracker_node.spawn(Capture { forward: cap_tx }, TRACKER_ACTOR);

  let node = Node::new(Socket::new(HOST, 4591), 1).unwrap();
  let (tx, _notify) = channel(1);
  let ghost = NodeId::new("ghost");
  let detector = node.spawn(
    Detector::new(NodeId::new("n0"), tracker_socket, tx),
    NODE_ACTOR,
  );
  detector.send(NodeMsg::Start(bundle(4591, &ghost, 4599, None)));

  tracker_node.rt().block_on(async {
    detector.send(NodeMsg::Fail {
      peer: ghost.clone(),
      token: 7,
    });
    sleep(Duration::from_millis(400)).await;
    assert_no_crash_report(&mut cap_rx);

    detector.send(NodeMsg::Fail {
      peer: ghost.clone(),
      token: 0,
    });
    let (crashed, reporter) = expect_crash_report(&mut cap_rx).await;
    assert_eq!(ghost, crashed);
    assert_eq!(NodeId::new("n0"), reporter);
  });
}

// With catastrophe recovery on, a failure timeout only demotes the peer to
// missing; the report is owed to the miss timer, and a stale miss firing is
// dropped like any other.
#[test]
fn catastrophe_mode_defers_the_verdict_to_the_miss_timer() {
  let tracker_socket = Socket::new(HOST, 4592);
  let tracker_node = Node::new(tracker_socket.clone(), 1).unwrap();
  let (cap_tx, mut cap_rx) = unbounded_channel();
  tracker_node.spawn(Capture { forward: cap_tx }, TRACKER_ACTOR);

  let node = Node::new(Socket::new(HOST, 4593), 1).unwrap();
  let (tx, _notify) = channel(1);
  let ghost = NodeId::new("ghost");
  let detector = node.spawn(
    Detector::new(NodeId::new("n0"), tracker_socket, tx),
    NODE_ACTOR,
  );
  let multicast = Some(MulticastParams {
    param: 1,
    max_wait: 1000,
  });
  detector.send(NodeMsg::Start(bundle(4593, &ghost, 4598, multicast)));

  tracker_node.rt().block_on(async {
    // the failure timeout itself must not report
    detector.send(NodeMsg::Fail {
      peer: ghost.clone(),
      token: 0,
    });
    sleep(Duration::from_millis(400)).await;
    assert_no_crash_report(&mut cap_rx);

    // the fail handler bumped the token to 1; a stale miss echo is ignored
    detector.send(NodeMsg::Miss {
      peer: ghost.clone(),
      token: 0,
    });
    sleep(Duration::from_millis(200)).await;
    assert_no_crash_report(&mut cap_rx);

    detector.send(NodeMsg::Miss {
      peer: ghost.clone(),
      token: 1,
    });
    let (crashed, reporter) = expect_crash_report(&mut cap_rx).await;
    assert_eq!(ghost, crashed);
    assert_eq!(NodeId::new("n0"), reporter);

    // cleanup forgets the peer; timers for unknown peers are ignored
    detector.send(NodeMsg::Cleanup {
      peer: ghost.clone(),
      token: 2,
    });
    sleep(Duration::from_millis(200)).await;
    detector.send(NodeMsg::Fail {
      peer: ghost.clone(),
      token: 2,
    });
    sleep(Duration::from_millis(400)).await;
    assert_no_crash_report(&mut cap_rx);
  });
}
