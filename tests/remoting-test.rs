use async_trait::async_trait;
use gossip_fd::core::{forge, Actor, ActorContext, Host, Node, Socket};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::time::sleep;

const HOST: Host = Host::IP(IpAddr::V4(Ipv4Addr::new(127, 0, 0, 1)));

struct Echo {
  forward: UnboundedSender<String>,
}
#[async_trait]
impl Actor<String> for Echo {
  async fn recv(&mut self, _: &ActorContext<String>, msg: String) {
    let _ = self.forward.send(msg);
  }
}

// A reference forged from nothing but a name and a socket reaches the actor
// registered under that name on another runtime.
#[test]
fn forged_refs_reach_registered_actors() {
  let receiver = Node::new(Socket::new(HOST, 4660), 1).unwrap();
  let (tx, mut rx) = unbounded_channel();
  receiver.spawn(Echo { forward: tx }, "echo");

  let sender = Node::new(Socket::new(HOST, 4661), 1).unwrap();
  let echo = forge::<String>("echo", Socket::new(HOST, 4660));
  sender.rt().block_on(async {
    echo.move_to("hello over the wire".to_string()).await;
    let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .expect("nothing arrived")
      .expect("echo channel closed");
    assert_eq!("hello over the wire", got);
  });
}

// Messages for names nobody registered are dropped by the receiving
// registry without disturbing the actors that do exist.
#[test]
fn unregistered_destinations_drop_messages() {
  let receiver = Node::new(Socket::new(HOST, 4662), 1).unwrap();
  let (tx, mut rx) = unbounded_channel();
  receiver.spawn(Echo { forward: tx }, "echo");

  let sender = Node::new(Socket::new(HOST, 4663), 1).unwrap();
  let nobody = forge::<String>("nobody", Socket::new(HOST, 4662));
  let echo = forge::<String>("echo", Socket::new(HOST, 4662));
  sender.rt().block_on(async {
    nobody.move_to("into the void".to_string()).await;
    sleep(Duration::from_millis(200)).await;
    echo.move_to("for the echo actor".to_string()).await;
    let got = tokio::time::timeout(Duration::from_secs(5), rx.recv())
      .await
      .expect("nothing arrived")
      .expect("echo channel closed");
    assert_eq!("for the echo actor", got);
    assert!(rx.try_recv().is_err());
  });
}
