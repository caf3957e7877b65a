//! The twelve addressing primitives built on top of [`Port`].
//!
//! Every primitive here is a thin, differently-addressed wrapper around one
//! get-index/setup/send-receive-confirm/read-back/release round trip. Word
//! variants exist for the common case of a single 16-bit register.

use std::time::Duration;

use crate::command::{auto_increment_adp, split_logical_address, CommandType};
use crate::error::Result;
use crate::port::Port;
use crate::transport::LinkLayer;

/// Runs one complete request/reply round trip for a single (non-chained)
/// datagram and returns its read-back payload together with the WKC.
fn transact<L: LinkLayer>(
    port: &Port<L>,
    command: CommandType,
    adp: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    let index = port.get_index()?;
    let result = (|| {
        port.setup_datagram(index, command, adp, ado, data, 0)?;
        let wkc = port.send_receive_confirm(index, timeout)?;
        port.read_response(index, 0, |payload| payload.to_vec()).map(|p| (p, wkc))
    })();
    port.release(index);
    result
}

/// Same as [`transact`] but only the WKC matters (write-only commands).
fn transact_write_only<L: LinkLayer>(
    port: &Port<L>,
    command: CommandType,
    adp: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<u16, L::Error> {
    transact(port, command, adp, ado, data, timeout).map(|(_, wkc)| wkc)
}

/// Logical addressing shares one slot with whatever else might be chained in
/// ahead of it, so these primitives only trust the read-back if the reply's
/// own command field still matches what was sent — guarding against a
/// misrouted or partially-corrupted frame. A mismatch (or a zero WKC) is not
/// an error: the WKC is still returned, just with an empty read-back.
fn transact_logical<L: LinkLayer>(
    port: &Port<L>,
    command: CommandType,
    adp: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    let index = port.get_index()?;
    let result = (|| {
        port.setup_datagram(index, command, adp, ado, data, 0)?;
        let wkc = port.send_receive_confirm(index, timeout)?;
        if wkc > 0 && port.reply_command(index, 0)? == command {
            let payload = port.read_response(index, 0, |p| p.to_vec())?;
            Ok((payload, wkc))
        } else {
            Ok((Vec::new(), wkc))
        }
    })();
    port.release(index);
    result
}

fn word_from(data: &[u8]) -> u16 {
    let lo = data.first().copied().unwrap_or(0);
    let hi = data.get(1).copied().unwrap_or(0);
    u16::from_le_bytes([lo, hi])
}

/// Auto-increment read at `position` slaves downstream of the master.
pub fn aprd<L: LinkLayer>(
    port: &Port<L>,
    position: u16,
    ado: u16,
    len: usize,
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    transact(port, CommandType::Aprd, auto_increment_adp(position), ado, &vec![0u8; len], timeout)
}

/// Word convenience over [`aprd`].
pub fn aprdw<L: LinkLayer>(
    port: &Port<L>,
    position: u16,
    ado: u16,
    timeout: Duration,
) -> Result<(u16, u16), L::Error> {
    let (data, wkc) = aprd(port, position, ado, 2, timeout)?;
    Ok((word_from(&data), wkc))
}

/// Auto-increment write at `position` slaves downstream of the master.
pub fn apwr<L: LinkLayer>(
    port: &Port<L>,
    position: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<u16, L::Error> {
    transact_write_only(port, CommandType::Apwr, auto_increment_adp(position), ado, data, timeout)
}

/// Word convenience over [`apwr`].
pub fn apwrw<L: LinkLayer>(
    port: &Port<L>,
    position: u16,
    ado: u16,
    value: u16,
    timeout: Duration,
) -> Result<u16, L::Error> {
    apwr(port, position, ado, &value.to_le_bytes(), timeout)
}

/// Configured-station-address read.
pub fn fprd<L: LinkLayer>(
    port: &Port<L>,
    station: u16,
    ado: u16,
    len: usize,
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    transact(port, CommandType::Fprd, station, ado, &vec![0u8; len], timeout)
}

/// Word convenience over [`fprd`].
pub fn fprdw<L: LinkLayer>(
    port: &Port<L>,
    station: u16,
    ado: u16,
    timeout: Duration,
) -> Result<(u16, u16), L::Error> {
    let (data, wkc) = fprd(port, station, ado, 2, timeout)?;
    Ok((word_from(&data), wkc))
}

/// Configured-station-address write.
pub fn fpwr<L: LinkLayer>(
    port: &Port<L>,
    station: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<u16, L::Error> {
    transact_write_only(port, CommandType::Fpwr, station, ado, data, timeout)
}

/// Word convenience over [`fpwr`].
pub fn fpwrw<L: LinkLayer>(
    port: &Port<L>,
    station: u16,
    ado: u16,
    value: u16,
    timeout: Duration,
) -> Result<u16, L::Error> {
    fpwr(port, station, ado, &value.to_le_bytes(), timeout)
}

/// Broadcast read; every slave adds its value into the WKC but the payload
/// returned is whichever slave answered last on the wire.
pub fn brd<L: LinkLayer>(
    port: &Port<L>,
    ado: u16,
    len: usize,
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    transact(port, CommandType::Brd, 0, ado, &vec![0u8; len], timeout)
}

/// Broadcast write.
pub fn bwr<L: LinkLayer>(
    port: &Port<L>,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<u16, L::Error> {
    transact_write_only(port, CommandType::Bwr, 0, ado, data, timeout)
}

/// Auto-increment read-multiple-write: every slave returns the value it held
/// before the first slave's write is broadcast onward.
pub fn armw<L: LinkLayer>(
    port: &Port<L>,
    position: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    transact(port, CommandType::Armw, auto_increment_adp(position), ado, data, timeout)
}

/// Configured-address read-multiple-write, most commonly used to distribute
/// the reference clock's system time.
pub fn frmw<L: LinkLayer>(
    port: &Port<L>,
    station: u16,
    ado: u16,
    data: &[u8],
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    transact(port, CommandType::Frmw, station, ado, data, timeout)
}

/// Logical memory read at a flat 32-bit process-image address.
pub fn lrd<L: LinkLayer>(
    port: &Port<L>,
    address: u32,
    len: usize,
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    let (adp, ado) = split_logical_address(address);
    transact_logical(port, CommandType::Lrd, adp, ado, &vec![0u8; len], timeout)
}

/// Logical memory write at a flat 32-bit process-image address.
pub fn lwr<L: LinkLayer>(
    port: &Port<L>,
    address: u32,
    data: &[u8],
    timeout: Duration,
) -> Result<u16, L::Error> {
    let (adp, ado) = split_logical_address(address);
    transact_write_only(port, CommandType::Lwr, adp, ado, data, timeout)
}

/// Logical memory read-write: the usual process-data exchange primitive.
pub fn lrw<L: LinkLayer>(
    port: &Port<L>,
    address: u32,
    data: &[u8],
    timeout: Duration,
) -> Result<(Vec<u8>, u16), L::Error> {
    let (adp, ado) = split_logical_address(address);
    transact_logical(port, CommandType::Lrw, adp, ado, data, timeout)
}
