//! Compound frames: more than one datagram chained into a single round trip.
//!
//! `lrwdc` chains the logical process-data exchange (`LRW`) with an `FRMW`
//! read of the reference clock's system time register, so a master doing
//! cyclic process data can piggyback distributed-clock sync onto the same
//! frame instead of sending it separately.

use std::time::Duration;

use crate::command::{split_logical_address, CommandType};
use crate::constants::ECT_REG_DCSYSTIME;
use crate::error::Result;
use crate::port::Port;
use crate::transport::LinkLayer;

/// Logical read-write chained with a distributed-clock system-time read.
///
/// Returns `(process_data, dc_system_time, lrw_wkc)`. `lrw_wkc` is the `LRW`
/// datagram's own working counter, not the sum across the whole compound
/// frame that `Port::send_receive_confirm` returns — that sum also counts
/// whatever the `FRMW` leg touched, which isn't what a caller checking
/// process-data delivery wants. As with plain `lrw`, the read-back (and the
/// DC time) is only trusted when the reply's own command field still reads
/// `LRW`; otherwise both come back empty and only the aggregate WKC is
/// reported.
pub fn lrwdc<L: LinkLayer>(
    port: &Port<L>,
    address: u32,
    data: &[u8],
    dc_reference_station: u16,
    timeout: Duration,
) -> Result<(Vec<u8>, u64, u16), L::Error> {
    let (adp, ado) = split_logical_address(address);
    let index = port.get_index()?;

    let result = (|| {
        port.setup_datagram(index, CommandType::Lrw, adp, ado, data, 0)?;
        let dc_position = port.add_datagram(
            index,
            CommandType::Frmw,
            dc_reference_station,
            ECT_REG_DCSYSTIME,
            &[0u8; 8],
            0,
        )?;

        let aggregate_wkc = port.send_receive_confirm(index, timeout)?;

        if aggregate_wkc == 0 || port.reply_command(index, 0)? != CommandType::Lrw {
            return Ok((Vec::new(), 0, aggregate_wkc));
        }

        let lrw_wkc = port.wkc_at(index, 0)?;
        let process_data = port.read_response(index, 0, |p| p.to_vec())?;
        let dc_system_time = port.read_response(index, dc_position, |p| {
            let mut bytes = [0u8; 8];
            let n = p.len().min(8);
            bytes[..n].copy_from_slice(&p[..n]);
            u64::from_le_bytes(bytes)
        })?;

        Ok((process_data, dc_system_time, lrw_wkc))
    })();

    port.release(index);
    result
}
