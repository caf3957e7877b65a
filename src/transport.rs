//! The seam between this crate and a real network interface.
//!
//! `LinkLayer` is deliberately the only place a NIC driver, raw socket, or
//! `pnet_datalink` capture handle enters this crate. The actual
//! transmit/receive operation is treated as an external collaborator; this
//! trait is its boundary. A non-blocking token-pair device abstraction would
//! expose the same transmit/receive seam through separate Tx/Rx tokens —
//! `Port` here instead drives one blocking round trip per primitive, so the
//! seam is a direct `send`/`recv_timeout` call.

use std::time::Duration;

/// A full-duplex Ethernet link capable of sending and receiving raw frames.
///
/// Implementations are free to be real NICs, raw sockets, or (for tests) an
/// in-memory loopback. `Port` calls `send` once and then polls `recv_timeout`
/// until either a frame arrives or the deadline passes.
pub trait LinkLayer {
    /// The implementation's own failure type, e.g. an `io::Error` or a
    /// `pnet` capture error.
    type Error: std::fmt::Debug;

    /// Transmits one complete Ethernet frame, including its 14-byte header.
    fn send(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Waits up to `timeout` for a frame, writing it into `buf` and returning
    /// its length. Returns `Ok(None)` on a clean timeout with nothing
    /// received; non-EtherCAT frames the driver hands back are the caller's
    /// concern to filter, not an error here.
    fn recv_timeout(&mut self, buf: &mut [u8], timeout: Duration) -> Result<Option<usize>, Self::Error>;
}
