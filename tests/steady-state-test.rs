use gossip_fd::core::{Host, Node, Socket};
use gossip_fd::detector::Detector;
use gossip_fd::messages::{NodeId, PickStrategy, NODE_ACTOR, TRACKER_ACTOR};
use gossip_fd::tracker::{
  Experiment, ExperimentSettings, Report, Tracker,
};
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

// Three correct nodes, push gossip, uniform targeting: five seconds of
// steady state must not produce a single suspicion.
#[test]
fn steady_state_stays_silent() {
  let settings = ExperimentSettings {
    number_of_nodes: 3,
    duration: 5000,
    simulate_catastrophe: false,
    gossip_delta: 200,
    failure_delta: 1200,
    miss_delta: 1200,
    push_pull: false,
    pick_strategy: PickStrategy::Uniform,
    multicast: None,
  };
  let experiment = Experiment::new("00000".to_string(), 0, 0, settings, Vec::new());
  let reports = run_experiments(
    4190,
    &[4100, 4101, 4102],
    vec![experiment],
    scratch_dir("steady-state"),
    Duration::from_secs(30),
  );
  assert_eq!(1, reports.len());
  let report = &reports[0];
  assert!(report.result.expected_crashes.is_empty());
  assert!(
    report.result.reported_crashes.is_empty(),
    "unexpected crash reports: {:?}",
    report.result.reported_crashes
  );
  assert!(report.result.end_time - report.result.start_time >= 4990);
}
