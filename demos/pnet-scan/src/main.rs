//! Broadcasts one BRD and reports the working counter as a slave count.
//!
//! Same pnet_datalink channel setup as a non-blocking token-pair device
//! would use, generalized to `ecat_pdu::LinkLayer`'s direct blocking
//! `send`/`recv_timeout`.

use std::env;
use std::io;
use std::time::Duration;

use ecat_pdu::{LinkLayer, Port};
use pnet_datalink::{Channel::Ethernet, Config, DataLinkReceiver, DataLinkSender, NetworkInterface};

struct PnetLink {
    tx: Box<dyn DataLinkSender>,
    rx: Box<dyn DataLinkReceiver>,
}

impl PnetLink {
    fn open(interface_name: &str, poll_interval: Duration) -> Self {
        let interface_names_match = |iface: &NetworkInterface| iface.name == interface_name;
        let interface = pnet_datalink::interfaces()
            .into_iter()
            .find(interface_names_match)
            .expect("interface not found");
        let config = Config {
            read_timeout: Some(poll_interval),
            ..Config::default()
        };
        let (tx, rx) = match pnet_datalink::channel(&interface, config) {
            Ok(Ethernet(tx, rx)) => (tx, rx),
            Ok(_) => panic!("unhandled channel type"),
            Err(e) => panic!("unable to create channel: {e}"),
        };
        Self { tx, rx }
    }
}

impl LinkLayer for PnetLink {
    type Error = io::Error;

    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        match self.tx.send_to(frame, None) {
            Some(result) => result,
            None => Err(io::Error::new(io::ErrorKind::Other, "send_to returned no result")),
        }
    }

    /// `pnet_datalink`'s channel is polled at the `read_timeout` configured
    /// in `open`, not the `timeout` passed here; `Port` re-checks its own
    /// deadline between calls, so a shorter internal poll just means more
    /// loop iterations, never a missed deadline.
    fn recv_timeout(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<Option<usize>, Self::Error> {
        match self.rx.next() {
            Ok(packet) => {
                let len = packet.len().min(buf.len());
                buf[..len].copy_from_slice(&packet[..len]);
                Ok(Some(len))
            }
            Err(e) if matches!(e.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock) => {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

fn main() {
    env::set_var("RUST_LOG", "info");
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    let Some(name) = args.get(1) else {
        println!("Specify the name of a network interface as an argument from the following:");
        for (i, interface) in pnet_datalink::interfaces().iter().enumerate() {
            println!("{i}:");
            println!("    Description: {}", interface.description);
            println!("    Name: {}", interface.name);
        }
        return;
    };

    let link = PnetLink::open(name, Duration::from_millis(20));
    let port = Port::open(link, 0x0101_0101_0101);

    match ecat_pdu::primitives::brd(&port, 0x0000, 1, Duration::from_millis(100)) {
        Ok((_data, wkc)) => println!("{wkc} slave(s) responded on {name}"),
        Err(e) => eprintln!("scan failed: {e}"),
    }
}
