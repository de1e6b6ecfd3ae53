use gossip_fd::config::TrackerConfig;
use gossip_fd::core::Node;
use gossip_fd::messages::TRACKER_ACTOR;
use gossip_fd::tracker::Tracker;
use std::process::exit;
use tokio::sync::mpsc::channel;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "gossip_fd=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  let cfg = match TrackerConfig::from_env() {
    Ok(cfg) => cfg,
    Err(e) => {
      error!("configuration error: {}", e);
      exit(2);
    }
  };
  let node = match Node::new(cfg.socket(), 2) {
    Ok(node) => node,
    Err(e) => {
      error!("could not start the runtime on {}: {}", cfg.socket(), e);
      exit(1);
    }
  };
  let (tx, mut rx) = channel(1);
  let tracker = match Tracker::new(&cfg, tx) {
    Ok(tracker) => tracker,
    Err(e) => {
      error!(
        "could not create the report directory {}: {}",
        cfg.report_path.display(),
        e
      );
      exit(1);
    }
  };
  node.spawn(tracker, TRACKER_ACTOR);
  info!("tracker listening on {}", cfg.socket());
  node.rt().block_on(rx.recv());
  info!("all experiments done");
}
