use crate::core::{
  deserialize, ActorId, DatagramHeader, Node, RegistryMsg, MAX_PACKET_SIZE,
};
use std::convert::TryFrom;
use std::net::Ipv4Addr;
use tokio::net::UdpSocket;
use tracing::{error, trace, warn};

pub(crate) async fn udp_receiver(node: Node) {
  let udp = match UdpSocket::bind((Ipv4Addr::UNSPECIFIED, node.socket().udp)).await {
    Ok(udp) => udp,
    Err(e) => {
      error!("could not bind UDP port {}: {}", node.socket().udp, e);
      return;
    }
  };
  let mut buf = vec![0u8; MAX_PACKET_SIZE];
  loop {
    let len = match udp.recv_from(&mut buf[..]).await {
      Ok((len, _)) => len,
      Err(e) => {
        warn!("UDP recv failed: {}", e);
        continue;
      }
    };
    if len < DatagramHeader::SIZE {
      trace!("dropped a {} byte datagram runt", len);
      continue;
    }
    let header = match DatagramHeader::try_from(&buf[..DatagramHeader::SIZE]) {
      Ok(h) => h,
      Err(_) => {
        trace!("dropped a foreign datagram");
        continue;
      }
    };
    let dest_end = DatagramHeader::SIZE + header.dest_size as usize;
    let msg_end = dest_end + header.msg_size as usize;
    if msg_end != len {
      warn!("dropped a truncated datagram: {} of {} bytes", len, msg_end);
      continue;
    }
    let name = match deserialize::<ActorId>(&buf[DatagramHeader::SIZE..dest_end]) {
      Some(name) => name,
      None => {
        warn!("dropped a datagram with an undecodable destination");
        continue;
      }
    };
    node.registry(RegistryMsg::Forward(name, buf[dest_end..msg_end].to_vec()));
  }
}
