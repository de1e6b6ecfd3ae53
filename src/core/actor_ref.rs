use crate::core::{udp_msg, ActorSignal, Destination, LocalActorMsg, Socket};
use serde::Serialize;
use std::fmt::Debug;
use std::sync::Arc;

/// A reference to an actor on this [`Node`](crate::core::Node). Sends are
/// non-blocking and return whether the actor's inbox was still open.
pub struct LocalRef<T> {
  pub(crate) func: Arc<dyn Fn(LocalActorMsg<T>) -> bool + Send + Sync>,
}
impl<T> Clone for LocalRef<T> {
  fn clone(&self) -> Self {
    LocalRef {
      func: self.func.clone(),
    }
  }
}
impl<T: Send + 'static> LocalRef<T> {
  pub fn send(&self, item: T) -> bool {
    (&self.func)(LocalActorMsg::Msg(item))
  }

  pub fn signal(&self, sig: ActorSignal) -> bool {
    (&self.func)(LocalActorMsg::Signal(sig))
  }

  pub fn void() -> LocalRef<T> {
    LocalRef {
      func: Arc::new(|_| false),
    }
  }
}

/// A forgeable reference to an actor that may live on a different
/// [`Node`](crate::core::Node). Forging does not require the actor to exist;
/// messages for unregistered names are dropped by the receiving registry.
pub struct ActorRef<I> {
  pub socket: Socket,
  pub dest: Destination<I>,
  pub(in crate::core) local: Option<LocalRef<I>>,
}
impl<I> Clone for ActorRef<I> {
  fn clone(&self) -> Self {
    Self {
      socket: self.socket.clone(),
      dest: self.dest.clone(),
      local: self.local.clone(),
    }
  }
}
impl<I: Send + Serialize + 'static> ActorRef<I> {
  pub async fn move_to(&self, item: I) -> Option<bool> {
    if let Some(r) = &self.local {
      Some(r.send(item))
    } else {
      udp_msg(&self.socket, &self.dest, &item).await;
      None
    }
  }

  pub async fn send(&self, item: &I) -> Option<bool>
  where
    I: Clone,
  {
    if let Some(r) = &self.local {
      Some(r.send(item.clone()))
    } else {
      udp_msg(&self.socket, &self.dest, item).await;
      None
    }
  }
}
impl<I> Debug for ActorRef<I> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("ActorRef")
      .field("Interface", &std::any::type_name::<I>())
      .field("socket", &self.socket)
      .field("dest", &self.dest)
      .field("has_local", &self.local.is_some())
      .finish()
  }
}

/// Forges an [`ActorRef`] to the actor registered under `name` on the
/// [`Node`](crate::core::Node) bound to `socket`.
pub fn forge<I>(name: &str, socket: Socket) -> ActorRef<I> {
  ActorRef {
    socket: socket,
    dest: Destination::new(name),
    local: None,
  }
}
