use crate::core::udp_receiver::udp_receiver;
use crate::core::{
  Actor, ActorContext, ActorId, ActorSignal, LocalActorMsg, LocalRef, Registry,
  RegistryMsg, SerializedRecvr, Socket,
};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::{Builder, Runtime};
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};
use tokio::sync::oneshot::channel;
use tokio::task::JoinHandle;

struct NodeImpl {
  socket: Socket,
  registry: LocalRef<RegistryMsg>,
  rt: Runtime,
}

/// One process-local runtime: a bound UDP socket, a registry of named actors
/// and the tokio runtime all of them run on. Cheap to clone.
#[derive(Clone)]
pub struct Node {
  node: Arc<NodeImpl>,
}
impl Node {
  pub fn new(socket: Socket, threads: usize) -> std::io::Result<Node> {
    let rt = Builder::new_multi_thread()
      .enable_all()
      .worker_threads(threads)
      .thread_name("gossip-fd")
      .build()?;
    let (tx, rx) = unbounded_channel::<LocalActorMsg<RegistryMsg>>();
    let registry = ActorContext::create_local(tx.clone());
    let node = Node {
      node: Arc::new(NodeImpl {
        socket: socket,
        registry: registry,
        rt: rt,
      }),
    };
    let ctx = ActorContext {
      tx: tx,
      id: ActorId::new("registry"),
      node: node.clone(),
    };
    let _ = node.rt().spawn(run_single(Registry::new(), ctx, rx, None));
    let _ = node.rt().spawn(udp_receiver(node.clone()));
    Ok(node)
  }

  pub fn socket(&self) -> &Socket {
    &self.node.socket
  }

  pub fn rt(&self) -> &Runtime {
    &self.node.rt
  }

  pub fn registry(&self, msg: RegistryMsg) {
    self.node.registry.send(msg);
  }

  /// Spawns an actor and registers it for remoting under `name`.
  pub fn spawn<M, A>(&self, actor: A, name: &str) -> LocalRef<M>
  where
    M: Send + DeserializeOwned + 'static,
    A: Actor<M> + Send + 'static,
  {
    let (tx, rx) = unbounded_channel::<LocalActorMsg<M>>();
    let ret = ActorContext::create_local(tx.clone());
    let ctx = ActorContext {
      tx: tx,
      id: ActorId::new(name),
      node: self.clone(),
    };
    let recvr = ctx.ser_recvr();
    let _ = self.rt().spawn(run_single(actor, ctx, rx, Some(recvr)));
    ret
  }

  /// Spawns an actor reachable only through its [`LocalRef`].
  pub fn spawn_local<M, A>(&self, actor: A, name: &str) -> LocalRef<M>
  where
    M: Send + 'static,
    A: Actor<M> + Send + 'static,
  {
    let (tx, rx) = unbounded_channel::<LocalActorMsg<M>>();
    let ret = ActorContext::create_local(tx.clone());
    let ctx = ActorContext {
      tx: tx,
      id: ActorId::new(name),
      node: self.clone(),
    };
    let _ = self.rt().spawn(run_single(actor, ctx, rx, None));
    ret
  }

  /// Delivers `msg` to `dest` after `delay`. The returned handle may be
  /// aborted to cancel delivery; correctness must never depend on the abort
  /// winning the race with the send.
  pub fn schedule_local_msg<T: Send + 'static>(
    &self,
    delay: Duration,
    dest: LocalRef<T>,
    msg: T,
  ) -> JoinHandle<()> {
    self.rt().spawn(async move {
      tokio::time::sleep(delay).await;
      dest.send(msg);
    })
  }
}

pub(crate) async fn run_single<M, A>(
  mut actor: A,
  ctx: ActorContext<M>,
  mut rx: UnboundedReceiver<LocalActorMsg<M>>,
  register: Option<SerializedRecvr>,
) where
  M: Send + 'static,
  A: Actor<M> + Send + 'static,
{
  let registered = register.is_some();
  if let Some(recvr) = register {
    let (tx, rx) = channel::<()>();
    ctx
      .node
      .registry(RegistryMsg::Register(ctx.id.clone(), recvr, tx));
    if rx.await.is_err() {
      panic!("Could not register {}", ctx.id);
    }
  }
  actor.pre_start(&ctx).await;
  loop {
    let msg = match rx.recv().await {
      Some(msg) => msg,
      None => break,
    };
    match msg {
      LocalActorMsg::Msg(m) => actor.recv(&ctx, m).await,
      LocalActorMsg::Signal(ActorSignal::Term) => break,
    };
  }
  actor.post_stop(&ctx).await;
  if registered {
    ctx.node.registry(RegistryMsg::Deregister(ctx.id));
  }
}
