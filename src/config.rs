//! Start-up configuration for both binaries, read from environment
//! variables. Anything missing or unparsable refuses to run.

use crate::core::{Host, Socket};
use crate::messages::NodeId;
use crate::tracker::ExperimentMatrix;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("missing environment variable {0}")]
  Missing(&'static str),
  #[error("invalid value for {0}: {1}")]
  Invalid(&'static str, String),
}

type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

fn var(lookup: Lookup, key: &'static str) -> Result<String, ConfigError> {
  lookup(key).ok_or(ConfigError::Missing(key))
}

fn parsed<T: FromStr>(lookup: Lookup, key: &'static str) -> Result<T, ConfigError> {
  let raw = var(lookup, key)?;
  raw
    .parse::<T>()
    .map_err(|_| ConfigError::Invalid(key, raw))
}

/// Everything the tracker needs: its own endpoint plus the experiment
/// matrix dimensions.
#[derive(Clone, Debug)]
pub struct TrackerConfig {
  pub host: Host,
  pub port: u16,
  pub nodes: usize,
  pub duration: u64,
  pub experiments: u64,
  pub repetitions: u32,
  pub initial_seed: u64,
  pub gossip_delta: u64,
  pub min_failure_rounds: u32,
  pub max_failure_rounds: u32,
  pub miss_delta_rounds: u64,
  pub time_between_experiments: u64,
  pub report_path: PathBuf,
}
impl TrackerConfig {
  pub fn from_env() -> Result<TrackerConfig, ConfigError> {
    Self::from_vars(&|key| env::var(key).ok())
  }

  fn from_vars(lookup: Lookup) -> Result<TrackerConfig, ConfigError> {
    let cfg = TrackerConfig {
      host: Host::from(var(lookup, "HOST")?),
      port: parsed(lookup, "PORT")?,
      nodes: parsed(lookup, "NODES")?,
      duration: parsed(lookup, "DURATION")?,
      experiments: parsed(lookup, "EXPERIMENTS")?,
      repetitions: parsed(lookup, "REPETITIONS")?,
      initial_seed: parsed(lookup, "INITIAL_SEED")?,
      gossip_delta: parsed(lookup, "GOSSIP_DELTA")?,
      min_failure_rounds: parsed(lookup, "MIN_FAILURE_ROUNDS")?,
      max_failure_rounds: parsed(lookup, "MAX_FAILURE_ROUNDS")?,
      miss_delta_rounds: parsed(lookup, "MISS_DELTA_ROUNDS")?,
      time_between_experiments: parsed(lookup, "TIME_BETWEEN_EXPERIMENTS")?,
      report_path: PathBuf::from(var(lookup, "REPORT_PATH")?),
    };
    if cfg.nodes == 0 {
      return Err(ConfigError::Invalid("NODES", "0".to_string()));
    }
    if cfg.duration < 2 {
      return Err(ConfigError::Invalid("DURATION", cfg.duration.to_string()));
    }
    if cfg.gossip_delta == 0 {
      return Err(ConfigError::Invalid("GOSSIP_DELTA", "0".to_string()));
    }
    if cfg.min_failure_rounds > cfg.max_failure_rounds {
      return Err(ConfigError::Invalid(
        "MIN_FAILURE_ROUNDS",
        format!(
          "{} exceeds MAX_FAILURE_ROUNDS {}",
          cfg.min_failure_rounds, cfg.max_failure_rounds
        ),
      ));
    }
    Ok(cfg)
  }

  pub fn socket(&self) -> Socket {
    Socket::new(self.host.clone(), self.port)
  }

  pub fn matrix(&self) -> ExperimentMatrix {
    ExperimentMatrix {
      duration: self.duration,
      number_of_experiments: self.experiments,
      repetitions: self.repetitions,
      initial_seed: self.initial_seed,
      gossip_delta: self.gossip_delta,
      min_failure_rounds: self.min_failure_rounds,
      max_failure_rounds: self.max_failure_rounds,
      miss_delta_rounds: self.miss_delta_rounds,
    }
  }
}

/// Everything a node needs: its own endpoint, its identity and where the
/// tracker listens.
#[derive(Clone, Debug)]
pub struct NodeOpts {
  pub host: Host,
  pub port: u16,
  pub id: NodeId,
  pub tracker_host: Host,
  pub tracker_port: u16,
}
impl NodeOpts {
  pub fn from_env() -> Result<NodeOpts, ConfigError> {
    Self::from_vars(&|key| env::var(key).ok())
  }

  fn from_vars(lookup: Lookup) -> Result<NodeOpts, ConfigError> {
    Ok(NodeOpts {
      host: Host::from(var(lookup, "HOST")?),
      port: parsed(lookup, "PORT")?,
      id: NodeId::new(&var(lookup, "ID")?),
      tracker_host: Host::from(var(lookup, "TRACKER_HOST")?),
      tracker_port: parsed(lookup, "TRACKER_PORT")?,
    })
  }

  pub fn socket(&self) -> Socket {
    Socket::new(self.host.clone(), self.port)
  }

  pub fn tracker_socket(&self) -> Socket {
    Socket::new(self.tracker_host.clone(), self.tracker_port)
  }
}
