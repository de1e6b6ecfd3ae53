//! A minimal distributed actor runtime: typed actors on a shared tokio
//! runtime, fire-and-forget UDP remoting addressed by registered name, and
//! scheduled self-messages for timers.

mod actor;
mod actor_ref;
mod node;
mod packets;
mod registry;
mod remoting;
mod udp_receiver;

pub(crate) use packets::MAX_PACKET_SIZE;

#[rustfmt::skip]
pub use {
  actor::Actor,
  actor::ActorContext,
  actor::ActorSignal,
  actor::LocalActorMsg,
  actor::SerializedRecvr,
  actor_ref::forge,
  actor_ref::ActorRef,
  actor_ref::LocalRef,
  node::Node,
  packets::DatagramHeader,
  registry::Registry,
  registry::RegistryMsg,
  remoting::deserialize,
  remoting::serialize,
  remoting::udp_msg,
  remoting::ActorId,
  remoting::Destination,
  remoting::Host,
  remoting::Socket,
};
