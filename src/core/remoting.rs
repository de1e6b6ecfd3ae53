use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fmt::Debug;
use std::hash::Hash;
use std::marker::PhantomData;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use tokio::net::{lookup_host, UdpSocket};
use tracing::warn;

use crate::core::{DatagramHeader, MAX_PACKET_SIZE};

/// The DNS name or IP address of the machine hosting a [`Node`](crate::core::Node).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub enum Host {
  DNS(String),
  IP(IpAddr),
}
impl From<String> for Host {
  fn from(s: String) -> Self {
    match IpAddr::from_str(s.as_str()) {
      Ok(ip) => Host::IP(ip),
      Err(_) => Host::DNS(s),
    }
  }
}

/// The remote address of a [`Node`](crate::core::Node), reachable by UDP remoting.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub struct Socket {
  /// The DNS name or IP address of the machine hosting the [`Node`](crate::core::Node).
  pub host: Host,
  /// The UDP port our [`Node`](crate::core::Node) receives on.
  pub udp: u16,
}
impl Socket {
  pub fn new(host: Host, udp: u16) -> Socket {
    Socket {
      host: host,
      udp: udp,
    }
  }

  /// Resolves this [`Socket`] to raw [`SocketAddr`]s. If the [`Host`] is a DNS
  /// name, this performs a DNS lookup and only fails if the lookup fails.
  pub async fn as_udp_addr(&self) -> std::io::Result<Vec<SocketAddr>> {
    match &self.host {
      Host::IP(ip) => Ok(vec![SocketAddr::new(*ip, self.udp)]),
      Host::DNS(s) => lookup_host((s.as_str(), self.udp))
        .await
        .map(|x| x.filter(|a| a.is_ipv4()).collect()),
    }
  }
}
impl fmt::Display for Socket {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.host {
      Host::DNS(s) => write!(f, "{}:{}", s, self.udp),
      Host::IP(ip) => write!(f, "{}:{}", ip, self.udp),
    }
  }
}
impl Default for Socket {
  fn default() -> Self {
    Self {
      host: Host::IP(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
      udp: 0,
    }
  }
}

/// The name an actor is registered under on its [`Node`](crate::core::Node).
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Ord, PartialOrd, Serialize)]
pub struct ActorId(String);
impl ActorId {
  pub fn new(s: &str) -> ActorId {
    ActorId(s.to_string())
  }
}
impl fmt::Display for ActorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// The local part of an actor's messaging address, typed by the messages the
/// destination actor receives. Forging a [`Destination`] for an actor that is
/// not registered under the name is possible; such messages are dropped by the
/// receiving registry.
#[derive(Eq)]
pub struct Destination<I> {
  name: ActorId,
  x: PhantomData<I>,
}
impl<I> Destination<I> {
  pub fn new(s: &str) -> Destination<I> {
    Destination {
      name: ActorId::new(s),
      x: PhantomData,
    }
  }

  pub fn name(&self) -> &ActorId {
    &self.name
  }
}
impl<I> Clone for Destination<I> {
  fn clone(&self) -> Self {
    Destination {
      name: self.name.clone(),
      x: PhantomData,
    }
  }
}
impl<I> PartialEq for Destination<I> {
  fn eq(&self, other: &Self) -> bool {
    self.name == other.name
  }
}
impl<I> Hash for Destination<I> {
  fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
    self.name.hash(state);
  }
}
impl<I> Debug for Destination<I> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Destination")
      .field("Interface", &std::any::type_name::<I>())
      .field("name", &self.name)
      .finish()
  }
}

pub fn serialize<T: Serialize>(item: &T) -> Option<Vec<u8>> {
  serde_cbor::to_vec(item).ok()
}

pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Option<T> {
  serde_cbor::from_slice(bytes).ok()
}

/// Sends a single message to the actor named by `dest` on the [`Node`] bound
/// to `socket`. Fire-and-forget: serialization, resolution and I/O failures
/// are logged and the message is lost.
///
/// [`Node`]: crate::core::Node
pub async fn udp_msg<I: Serialize>(socket: &Socket, dest: &Destination<I>, msg: &I) {
  let dest_bytes = match serialize(dest.name()) {
    Some(b) => b,
    None => {
      warn!("could not serialize destination {:?}", dest);
      return;
    }
  };
  let msg_bytes = match serialize(msg) {
    Some(b) => b,
    None => {
      warn!("could not serialize a message for {:?}", dest);
      return;
    }
  };
  let total = DatagramHeader::SIZE + dest_bytes.len() + msg_bytes.len();
  if total > MAX_PACKET_SIZE || dest_bytes.len() > u16::MAX as usize {
    warn!("message of {} bytes for {:?} exceeds a datagram", total, dest);
    return;
  }
  let header = DatagramHeader {
    dest_size: dest_bytes.len() as u16,
    msg_size: msg_bytes.len() as u32,
  };
  let mut buf = vec![0u8; total];
  header.put(&mut buf[..DatagramHeader::SIZE]);
  buf[DatagramHeader::SIZE..DatagramHeader::SIZE + dest_bytes.len()]
    .copy_from_slice(&dest_bytes);
  buf[DatagramHeader::SIZE + dest_bytes.len()..].copy_from_slice(&msg_bytes);
  let addrs = match socket.as_udp_addr().await {
    Ok(addrs) => addrs,
    Err(e) => {
      warn!("could not resolve {}: {}", socket, e);
      return;
    }
  };
  let addr = match addrs.first() {
    Some(a) => *a,
    None => {
      warn!("{} resolved to no ipv4 address", socket);
      return;
    }
  };
  let udp = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await {
    Ok(u) => u,
    Err(e) => {
      warn!("could not bind a sending socket: {}", e);
      return;
    }
  };
  if let Err(e) = udp.send_to(&buf, addr).await {
    warn!("send to {} failed: {}", socket, e);
  }
}
