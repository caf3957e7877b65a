use core::fmt;

/// Errors produced by the datagram layer.
///
/// `E` is the transport's own error type (see [`crate::transport::LinkLayer`]).
/// A timed-out `send_receive_confirm` call is the sentinel condition callers
/// most need to handle; everything else here is a local precondition
/// violation rather than something the wire can report.
#[derive(Debug)]
pub enum DatagramError<E> {
    /// Payload longer than `MAX_PDU_DATA` (1486 bytes).
    PayloadTooLarge { length: usize, max: usize },
    /// The slot buffer is too small to hold the requested datagram.
    FrameTooSmall,
    /// No free transaction index in the pool.
    NoFreeSlot,
    /// `send_receive_confirm` did not see a matching frame before the deadline.
    Timeout,
    /// The link layer itself failed.
    Transport(E),
}

impl<E: fmt::Debug> fmt::Display for DatagramError<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PayloadTooLarge { length, max } => {
                write!(f, "datagram payload of {length} bytes exceeds the {max}-byte limit")
            }
            Self::FrameTooSmall => write!(f, "frame buffer too small for this datagram"),
            Self::NoFreeSlot => write!(f, "no free transaction index in the port's pool"),
            Self::Timeout => write!(f, "no matching frame received before the timeout"),
            Self::Transport(e) => write!(f, "link layer error: {e:?}"),
        }
    }
}

impl<E: fmt::Debug> std::error::Error for DatagramError<E> {}

pub type Result<T, E> = core::result::Result<T, DatagramError<E>>;
