use gossip_fd::config::NodeOpts;
use gossip_fd::core::Node;
use gossip_fd::detector::Detector;
use gossip_fd::messages::NODE_ACTOR;
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

  let opts = match NodeOpts::from_env() {
    Ok(opts) => opts,
    Err(e) => {
      error!("configuration error: {}", e);
      exit(2);
    }
  };
  let node = match Node::new(opts.socket(), 2) {
    Ok(node) => node,
    Err(e) => {
      error!("could not start the runtime on {}: {}", opts.socket(), e);
      exit(1);
    }
  };
  let (tx, mut rx) = channel(1);
  let detector = Detector::new(opts.id.clone(), opts.tracker_socket(), tx);
  node.spawn(detector, NODE_ACTOR);
  info!("{} listening on {}", opts.id, opts.socket());
  node.rt().block_on(rx.recv());
  info!("{} shut down", opts.id);
}
