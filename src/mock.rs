//! An in-memory [`LinkLayer`] for tests: no real NIC, just a scriptable
//! responder standing in for one or more slaves.

use std::collections::VecDeque;
use std::convert::Infallible;
use std::time::Duration;

use crate::frame;
use crate::transport::LinkLayer;

/// A loopback link whose replies are computed by a user-supplied closure.
pub struct MockLinkLayer {
    responder: Box<dyn FnMut(&[u8]) -> Option<Vec<u8>> + Send>,
    pending: VecDeque<Vec<u8>>,
}

impl MockLinkLayer {
    pub fn new(responder: impl FnMut(&[u8]) -> Option<Vec<u8>> + Send + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            pending: VecDeque::new(),
        }
    }

    /// A single slave that answers every datagram it receives, incrementing
    /// each one's working counter by `increment` (1 for a slave that
    /// processed the command, 0 for one that didn't).
    pub fn echo_with_wkc(increment: u16) -> Self {
        Self::new(move |sent| {
            let mut reply = sent.to_vec();
            let total_len = reply.len();
            let views: Vec<_> = frame::datagrams(&reply, total_len).collect();
            for view in views {
                let current =
                    u16::from_le_bytes([reply[view.wkc_offset], reply[view.wkc_offset + 1]]);
                let updated = current.wrapping_add(increment).to_le_bytes();
                reply[view.wkc_offset..view.wkc_offset + 2].copy_from_slice(&updated);
            }
            Some(reply)
        })
    }

    /// Never answers; exercises the `send_receive_confirm` timeout path.
    pub fn silent() -> Self {
        Self::new(|_| None)
    }
}

impl LinkLayer for MockLinkLayer {
    type Error = Infallible;

    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        if let Some(reply) = (self.responder)(frame) {
            self.pending.push_back(reply);
        }
        Ok(())
    }

    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>, Self::Error> {
        if let Some(reply) = self.pending.pop_front() {
            let len = reply.len().min(buf.len());
            buf[..len].copy_from_slice(&reply[..len]);
            return Ok(Some(len));
        }
        std::thread::sleep(timeout);
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandType;
    use crate::port::Port;
    use std::time::Duration;

    #[test]
    fn echo_mock_increments_wkc() {
        let port = Port::open(MockLinkLayer::echo_with_wkc(1), 0x0101_0101_0101);
        let index = port.get_index().unwrap();
        port.setup_datagram(index, CommandType::Brd, 0, 0x0130, &[0u8; 2], 0)
            .unwrap();
        let wkc = port
            .send_receive_confirm(index, Duration::from_millis(50))
            .unwrap();
        assert_eq!(wkc, 1);
        port.release(index);
    }

    #[test]
    fn silent_mock_times_out() {
        let port = Port::open(MockLinkLayer::silent(), 0x0101_0101_0101);
        let index = port.get_index().unwrap();
        port.setup_datagram(index, CommandType::Brd, 0, 0x0130, &[0u8; 2], 0)
            .unwrap();
        let err = port
            .send_receive_confirm(index, Duration::from_millis(5))
            .unwrap_err();
        assert!(matches!(err, crate::error::DatagramError::Timeout));
        port.release(index);
    }
}
