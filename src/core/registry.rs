use crate::core::{Actor, ActorContext, ActorId, SerializedRecvr};
use async_trait::async_trait;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use tokio::sync::oneshot::Sender;
use tracing::{debug, error, trace, warn};

pub enum RegistryMsg {
  Forward(ActorId, Vec<u8>),
  Register(ActorId, SerializedRecvr, Sender<()>),
  Deregister(ActorId),
}

/// Routes inbound datagram payloads to the actors of one
/// [`Node`](crate::core::Node) by registered name.
pub struct Registry {
  pub register: HashMap<ActorId, SerializedRecvr>,
}
impl Registry {
  pub fn new() -> Registry {
    Registry {
      register: HashMap::new(),
    }
  }
}
#[async_trait]
impl Actor<RegistryMsg> for Registry {
  async fn recv(&mut self, _: &ActorContext<RegistryMsg>, msg: RegistryMsg) {
    match msg {
      RegistryMsg::Forward(name, payload) => {
        if let Some(recvr) = self.register.get(&name) {
          if !recvr(payload) {
            self.register.remove(&name);
            warn!("message forward failed, removing actor {}", name);
          } else {
            trace!("forwarded {} to its inbox", name);
          }
        } else {
          warn!("not in register: {}", name);
        }
      }
      RegistryMsg::Register(name, channel, confirmation) => {
        match self.register.entry(name) {
          Entry::Occupied(o) => {
            error!("already registered: {}", o.key());
          }
          Entry::Vacant(v) => {
            if confirmation.send(()).is_err() {
              error!("register confirmation failed: {}", v.key());
            } else {
              debug!("adding actor to registry: {}", v.key());
              v.insert(channel);
            }
          }
        }
      }
      RegistryMsg::Deregister(name) => {
        debug!("removing actor from registry: {}", name);
        self.register.remove(&name);
      }
    }
  }
}
