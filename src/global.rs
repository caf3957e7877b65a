//! A process-wide `Port`, for callers that want the single-global-context
//! style common to C EtherCAT masters. `Port` itself has no such
//! requirement; everything here is a thin convenience layer on top of it.

use std::error::Error as StdError;
use std::sync::OnceLock;
use std::time::Duration;

use crate::port::Port;
use crate::primitives;
use crate::transport::LinkLayer;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Result of a global convenience call: the datagram layer's own errors with
/// the link's error type erased to [`BoxError`].
pub type GlobalResult<T> = crate::error::Result<T, BoxError>;

/// Object-safe counterpart of [`LinkLayer`] with its error type erased to
/// [`BoxError`], so one global `Port` can hold any concrete transport.
trait DynLinkLayer: Send {
    fn send(&mut self, frame: &[u8]) -> std::result::Result<(), BoxError>;
    fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<Option<usize>, BoxError>;
}

impl<L> DynLinkLayer for L
where
    L: LinkLayer + Send,
    L::Error: StdError + Send + Sync + 'static,
{
    fn send(&mut self, frame: &[u8]) -> std::result::Result<(), BoxError> {
        LinkLayer::send(self, frame).map_err(|e| Box::new(e) as BoxError)
    }

    fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<Option<usize>, BoxError> {
        LinkLayer::recv_timeout(self, buf, timeout).map_err(|e| Box::new(e) as BoxError)
    }
}

/// The concrete, type-erased link the global `Port` is parameterized over.
pub struct BoxedLink(Box<dyn DynLinkLayer>);

impl LinkLayer for BoxedLink {
    type Error = BoxError;

    fn send(&mut self, frame: &[u8]) -> std::result::Result<(), Self::Error> {
        self.0.send(frame)
    }

    fn recv_timeout(
        &mut self,
        buf: &mut [u8],
        timeout: Duration,
    ) -> std::result::Result<Option<usize>, Self::Error> {
        self.0.recv_timeout(buf, timeout)
    }
}

static GLOBAL_PORT: OnceLock<Port<BoxedLink>> = OnceLock::new();

/// Opens the global port once. Returns `false` if it was already open — a
/// second call does not replace the link, matching the single-master-context
/// convention this API is modeled on.
pub fn open_global<L>(link: L, source_mac: u64) -> bool
where
    L: LinkLayer + Send + 'static,
    L::Error: StdError + Send + Sync + 'static,
{
    GLOBAL_PORT
        .set(Port::open(BoxedLink(Box::new(link)), source_mac))
        .is_ok()
}

/// Borrows the global port, if [`open_global`] has been called.
pub fn global_port() -> Option<&'static Port<BoxedLink>> {
    GLOBAL_PORT.get()
}

macro_rules! global_fn {
    ($name:ident($($arg:ident : $ty:ty),*) -> $ret:ty, $inner:path) => {
        pub fn $name($($arg: $ty,)* timeout: Duration) -> GlobalResult<$ret> {
            let port = global_port().expect("ecat-pdu global port not opened; call open_global first");
            $inner(port, $($arg,)* timeout)
        }
    };
}

global_fn!(aprd(position: u16, ado: u16, len: usize) -> (Vec<u8>, u16), primitives::aprd);
global_fn!(aprdw(position: u16, ado: u16) -> (u16, u16), primitives::aprdw);
global_fn!(apwr(position: u16, ado: u16, data: &[u8]) -> u16, primitives::apwr);
global_fn!(apwrw(position: u16, ado: u16, value: u16) -> u16, primitives::apwrw);
global_fn!(fprd(station: u16, ado: u16, len: usize) -> (Vec<u8>, u16), primitives::fprd);
global_fn!(fprdw(station: u16, ado: u16) -> (u16, u16), primitives::fprdw);
global_fn!(fpwr(station: u16, ado: u16, data: &[u8]) -> u16, primitives::fpwr);
global_fn!(fpwrw(station: u16, ado: u16, value: u16) -> u16, primitives::fpwrw);
global_fn!(brd(ado: u16, len: usize) -> (Vec<u8>, u16), primitives::brd);
global_fn!(bwr(ado: u16, data: &[u8]) -> u16, primitives::bwr);
global_fn!(armw(position: u16, ado: u16, data: &[u8]) -> (Vec<u8>, u16), primitives::armw);
global_fn!(frmw(station: u16, ado: u16, data: &[u8]) -> (Vec<u8>, u16), primitives::frmw);
global_fn!(lrd(address: u32, len: usize) -> (Vec<u8>, u16), primitives::lrd);
global_fn!(lwr(address: u32, data: &[u8]) -> u16, primitives::lwr);
global_fn!(lrw(address: u32, data: &[u8]) -> (Vec<u8>, u16), primitives::lrw);
