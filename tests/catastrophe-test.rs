use gossip_fd::core::{Host, Node, Socket};
use gossip_fd::detector::Detector;
use gossip_fd::messages::{
  MulticastParams, NodeId, PickStrategy, NODE_ACTOR, TRACKER_ACTOR,
};
use gossip_fd::tracker::{
  ExpectedCrash, Experiment, ExperimentSettings, Report, Tracker,
};
use itertools::Itertools;
use std::collections::HashSet;
use std::fs;
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc::channel;

const HOST: Host = Host::IP(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));

fn scratch_dir(name: &str) -> PathBuf {
  let dir = std::env::temp_dir().join(format!("gfd-{}-{}", name, std::process::id()));
  let _ = fs::remove_dir_all(&dir);
  dir
}

fn read_reports(dir: &PathBuf) -> Vec<Report> {
  let mut reports = fs::read_dir(dir)
    .unwrap()
    .map(|entry| {
      let bytes = fs::read(entry.unwrap().path()).unwrap();
      serde_json::from_slice::<Report>(&bytes).unwrap()
    })
    .collect::<Vec<_>>();
  reports.sort_by(|a, b| a.id.cmp(&b.id));
  reports
}

fn run_experiments(
  tracker_port: u16,
  node_ports: &[u16],
  experiments: Vec<Experiment>,
  report_dir: PathBuf,
  timeout: Duration,
) -> Vec<Report> {
  let tracker_socket = Socket::new(HOST, tracker_port);
  let tracker_node = Node::new(tracker_socket.clone(), 1).unwrap();
  let (tx, mut rx) = channel(1);
  let tracker = Tracker::with_experiments(
    node_ports.len(),
    Duration::from_millis(1000),
    report_dir.clone(),
    experiments,
    tx,
  )
  .unwrap();
  tracker_node.spawn(tracker, TRACKER_ACTOR);
  let mut nodes = Vec::new();
  for (index, port) in node_ports.iter().enumerate() {
    let node = Node::new(Socket::new(HOST, *port), 1).unwrap();
    let (ntx, _nrx) = channel(1);
    let detector = Detector::new(
      NodeId::new(&format!("n{}", index)),
      tracker_socket.clone(),
      ntx,
    );
    node.spawn(detector, NODE_ACTOR);
    nodes.push(node);
  }
  tracker_node.rt().block_on(async {
    tokio::time::timeout(timeout, rx.recv())
      .await
      .unwrap()
      .unwrap()
  });
  read_reports(&report_dir)
}

// Seven nodes, five of them crashing together at 1500 ms, with catastrophe
// recovery on. The two survivors must each work through the missing state
// and eventually report all five crashed peers.
#[test]
fn catastrophe_is_fully_detected_by_the_survivors() {
  let crash_at = 1500u64;
  let failure_delta = 1800u64;
  let crashed = (1..=5)
    .map(|i| NodeId::new(&format!("n{}", i)))
    .collect::<Vec<_>>();
  let settings = ExperimentSettings {
    number_of_nodes: 7,
    duration: 10_000,
    simulate_catastrophe: true,
    gossip_delta: 300,
    failure_delta: failure_delta,
    miss_delta: failure_delta,
    push_pull: false,
    pick_strategy: PickStrategy::Uniform,
    multicast: Some(MulticastParams {
      param: 2,
      max_wait: 2,
    }),
  };
  let expected = crashed
    .iter()
    .map(|node| ExpectedCrash {
      delta: crash_at,
      node: node.clone(),
    })
    .collect::<Vec<_>>();
  let experiment = Experiment::new("00000".to_string(), 0, 0, settings, expected);
  let reports = run_experiments(
    4390,
    &[4300, 4301, 4302, 4303, 4304, 4305, 4306],
    vec![experiment],
    scratch_dir("catastrophe"),
    Duration::from_secs(50),
  );
  assert_eq!(1, reports.len());
  let reported = &reports[0].result.reported_crashes;
  let survivors = vec![NodeId::new("n0"), NodeId::new("n6")];
  let crashed_set = crashed.iter().cloned().collect::<HashSet<_>>();

  // dead nodes cannot report, and nothing but the crashed five is reported
  assert!(
    reported.iter().all(|r| survivors.contains(&r.reporter)),
    "report from a crashed node: {:?}",
    reported
  );
  assert!(
    reported.iter().all(|r| crashed_set.contains(&r.node)),
    "report of a live node: {:?}",
    reported
  );

  // each survivor eventually reports every crashed peer, once
  for survivor in &survivors {
    let seen = reported
      .iter()
      .filter(|r| r.reporter == *survivor)
      .map(|r| r.node.clone())
      .collect::<Vec<_>>();
    assert_eq!(
      crashed.iter().cloned().sorted().collect::<Vec<_>>(),
      seen.iter().cloned().sorted().collect::<Vec<_>>(),
      "{} did not report the full crash set exactly once",
      survivor
    );
  }

  // the missing state was actually traversed: detection takes longer than a
  // single failure period past the crash
  assert!(
    reported
      .iter()
      .any(|r| r.delta.saturating_sub(crash_at) > failure_delta),
    "no report went through the miss phase: {:?}",
    reported
  );
}
