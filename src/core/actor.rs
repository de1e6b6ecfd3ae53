use crate::core::{deserialize, ActorId, LocalRef, Node};
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

/// The behavior of an actor receiving messages of type `M`. Handlers run to
/// completion before the next message is delivered.
#[async_trait]
pub trait Actor<M: Send + 'static> {
  async fn pre_start(&mut self, _: &ActorContext<M>) {}
  async fn recv(&mut self, ctx: &ActorContext<M>, msg: M);
  async fn post_stop(&mut self, _: &ActorContext<M>) {}
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum ActorSignal {
  Term,
}

pub enum LocalActorMsg<M> {
  Msg(M),
  Signal(ActorSignal),
}
impl<M: Debug> Debug for LocalActorMsg<M> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    match self {
      LocalActorMsg::Msg(m) => write!(f, "Msg({:?})", m),
      LocalActorMsg::Signal(s) => write!(f, "Signal({:?})", s),
    }
  }
}

/// Deserializes inbound datagram payloads into an actor's inbox. Returns
/// false once the inbox is gone.
pub type SerializedRecvr = Box<dyn Fn(Vec<u8>) -> bool + Send>;

pub struct ActorContext<M: Send + 'static> {
  pub(crate) tx: UnboundedSender<LocalActorMsg<M>>,
  pub id: ActorId,
  pub node: Node,
}
impl<M: Send + 'static> ActorContext<M> {
  pub(in crate::core) fn create_local(
    sender: UnboundedSender<LocalActorMsg<M>>,
  ) -> LocalRef<M> {
    LocalRef {
      func: Arc::new(move |x: LocalActorMsg<M>| sender.send(x).is_ok()),
    }
  }

  pub fn local_interface(&self) -> LocalRef<M> {
    Self::create_local(self.tx.clone())
  }

  pub(in crate::core) fn ser_recvr(&self) -> SerializedRecvr
  where
    M: DeserializeOwned,
  {
    let sender = self.tx.clone();
    let id = self.id.clone();
    Box::new(move |bytes: Vec<u8>| match deserialize::<M>(&bytes) {
      Some(msg) => sender.send(LocalActorMsg::Msg(msg)).is_ok(),
      None => {
        warn!("{}: dropped an undeserializable payload", id);
        true
      }
    })
  }
}
