//! Frame assembly: laying datagrams into a transmit buffer and walking the
//! chain back out of a received one.
//!
//! These are pure functions over byte slices; `Port` owns the buffers and the
//! transaction bookkeeping. Keeping frame math free of any transport or
//! mutex concern makes the byte-layout properties directly testable without
//! a `LinkLayer` in the loop.

use crate::command::CommandType;
use crate::constants::{
    DATAGRAM_HEADER_LEN, ECAT_DATAGRAM_TYPE, ECAT_HEADER_LEN, ETH_HEADER_LEN,
    FIRST_PAYLOAD_OFFSET, MAX_PDU_DATA, WKC_LEN,
};
use crate::wire::{EtherCatSubHeader, EtherCatTypeHeader};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Payload longer than `MAX_PDU_DATA`.
    PayloadTooLarge { length: usize, max: usize },
    /// The destination buffer can't hold the datagram being added.
    BufferTooSmall { needed: usize, capacity: usize },
}

fn check_payload(data: &[u8]) -> Result<(), FrameError> {
    if data.len() > MAX_PDU_DATA {
        return Err(FrameError::PayloadTooLarge {
            length: data.len(),
            max: MAX_PDU_DATA,
        });
    }
    Ok(())
}

/// Writes the EtherCAT type/length word covering every datagram currently in
/// the chain (everything after the 14-byte Ethernet header).
fn set_ecat_length(buf: &mut [u8], total_len: usize) {
    let mut hdr = EtherCatTypeHeader(&mut buf[ETH_HEADER_LEN..ETH_HEADER_LEN + ECAT_HEADER_LEN]);
    hdr.set_ethercat_type(ECAT_DATAGRAM_TYPE);
    hdr.set_length((total_len - ETH_HEADER_LEN - ECAT_HEADER_LEN) as u16);
}

fn write_subheader(
    buf: &mut [u8],
    header_offset: usize,
    command: CommandType,
    index: u8,
    adp: u16,
    ado: u16,
    data_len: usize,
    irq: u16,
    has_next: bool,
) {
    let mut hdr =
        EtherCatSubHeader(&mut buf[header_offset..header_offset + DATAGRAM_HEADER_LEN]);
    hdr.set_command(command.code());
    hdr.set_index(index);
    hdr.set_adp(adp);
    hdr.set_ado(ado);
    hdr.set_length(data_len as u16);
    hdr.set_circulated(false);
    hdr.set_has_next(has_next);
    hdr.set_irq(irq);
}

fn write_payload(buf: &mut [u8], payload_offset: usize, command: CommandType, data: &[u8]) {
    let dst = &mut buf[payload_offset..payload_offset + data.len()];
    if command.is_pure_read() {
        dst.fill(0);
    } else {
        dst.copy_from_slice(data);
    }
    let wkc = &mut buf[payload_offset + data.len()..payload_offset + data.len() + WKC_LEN];
    wkc.fill(0);
}

/// Lays the first datagram of a frame into `buf`. Assumes the 14-byte
/// Ethernet header is already present (written once by `Port::open`).
///
/// Returns the new total frame length.
pub fn setup_datagram(
    buf: &mut [u8],
    command: CommandType,
    index: u8,
    adp: u16,
    ado: u16,
    data: &[u8],
    irq: u16,
) -> Result<usize, FrameError> {
    check_payload(data)?;
    let total_len = FIRST_PAYLOAD_OFFSET + data.len() + WKC_LEN;
    if buf.len() < total_len {
        return Err(FrameError::BufferTooSmall {
            needed: total_len,
            capacity: buf.len(),
        });
    }
    let header_offset = ETH_HEADER_LEN + ECAT_HEADER_LEN;
    write_subheader(buf, header_offset, command, index, adp, ado, data.len(), irq, false);
    write_payload(buf, header_offset + DATAGRAM_HEADER_LEN, command, data);
    set_ecat_length(buf, total_len);
    Ok(total_len)
}

/// Appends another datagram after the last one currently in `buf[..total_len]`,
/// flipping on the chain-continuation bit of the previous sub-header.
///
/// Returns `(new_total_len, payload_offset)`, where `payload_offset` is the
/// absolute offset of the new datagram's data within `buf`.
pub fn add_datagram(
    buf: &mut [u8],
    total_len: usize,
    command: CommandType,
    index: u8,
    adp: u16,
    ado: u16,
    data: &[u8],
    irq: u16,
) -> Result<(usize, usize), FrameError> {
    check_payload(data)?;
    let new_total_len = total_len + DATAGRAM_HEADER_LEN + data.len() + WKC_LEN;
    if buf.len() < new_total_len {
        return Err(FrameError::BufferTooSmall {
            needed: new_total_len,
            capacity: buf.len(),
        });
    }

    let prev_header_offset = find_last_header_offset(buf, total_len);
    {
        let mut prev_hdr = EtherCatSubHeader(
            &mut buf[prev_header_offset..prev_header_offset + DATAGRAM_HEADER_LEN],
        );
        prev_hdr.set_has_next(true);
    }

    let header_offset = total_len;
    write_subheader(buf, header_offset, command, index, adp, ado, data.len(), irq, false);
    let payload_offset = header_offset + DATAGRAM_HEADER_LEN;
    write_payload(buf, payload_offset, command, data);
    set_ecat_length(buf, new_total_len);
    Ok((new_total_len, payload_offset))
}

/// Walks the chain from the first sub-header (offset 16) to the one whose
/// data and working counter exactly reach `total_len` — that is the last
/// datagram currently in the frame.
fn find_last_header_offset(buf: &[u8], total_len: usize) -> usize {
    let mut offset = ETH_HEADER_LEN + ECAT_HEADER_LEN;
    loop {
        let hdr = EtherCatSubHeader(&buf[offset..offset + DATAGRAM_HEADER_LEN]);
        let data_len = hdr.length() as usize;
        let next = offset + DATAGRAM_HEADER_LEN + data_len + WKC_LEN;
        if next >= total_len {
            return offset;
        }
        offset = next;
    }
}

/// One datagram's position within a received frame, as produced by
/// [`datagrams`].
#[derive(Debug, Clone, Copy)]
pub struct DatagramView {
    pub header_offset: usize,
    pub command: CommandType,
    pub index: u8,
    pub data_offset: usize,
    pub data_len: usize,
    pub wkc_offset: usize,
}

/// Iterates the datagram chain of a frame, following each sub-header's
/// `length` field the same way `find_last_header_offset` does.
pub struct Datagrams<'a> {
    buf: &'a [u8],
    offset: usize,
    total_len: usize,
    done: bool,
}

pub fn datagrams(buf: &[u8], total_len: usize) -> Datagrams<'_> {
    Datagrams {
        buf,
        offset: ETH_HEADER_LEN + ECAT_HEADER_LEN,
        total_len,
        done: total_len <= ETH_HEADER_LEN + ECAT_HEADER_LEN,
    }
}

impl<'a> Iterator for Datagrams<'a> {
    type Item = DatagramView;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let hdr = EtherCatSubHeader(&self.buf[self.offset..self.offset + DATAGRAM_HEADER_LEN]);
        let data_len = hdr.length() as usize;
        let data_offset = self.offset + DATAGRAM_HEADER_LEN;
        let wkc_offset = data_offset + data_len;
        let view = DatagramView {
            header_offset: self.offset,
            command: CommandType::from(hdr.command()),
            index: hdr.index(),
            data_offset,
            data_len,
            wkc_offset,
        };
        let next_offset = wkc_offset + WKC_LEN;
        if !hdr.has_next() || next_offset >= self.total_len {
            self.done = true;
        } else {
            self.offset = next_offset;
        }
        Some(view)
    }
}

/// Sums the working counter across every datagram in the chain (the reply
/// WKC is the sum across the whole compound frame).
pub fn sum_wkc(buf: &[u8], total_len: usize) -> u16 {
    datagrams(buf, total_len).fold(0u16, |acc, d| {
        let wkc = u16::from_le_bytes([buf[d.wkc_offset], buf[d.wkc_offset + 1]]);
        acc.wrapping_add(wkc)
    })
}

/// Reads just the working counter of a single datagram, identified by its
/// index in the chain (0-based). Used for a compound frame's WKC override,
/// where only one leg's own WKC matters rather than the chain sum.
pub fn wkc_at(buf: &[u8], total_len: usize, chain_position: usize) -> Option<u16> {
    datagrams(buf, total_len).nth(chain_position).map(|d| {
        u16::from_le_bytes([buf[d.wkc_offset], buf[d.wkc_offset + 1]])
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn setup_datagram_lays_out_single_datagram_frame() {
        let mut buf = [0u8; 64];
        let data = [1, 2, 3, 4];
        let total = setup_datagram(&mut buf, CommandType::Fpwr, 5, 0x1001, 0x0006, &data, 0)
            .unwrap();
        assert_eq!(total, FIRST_PAYLOAD_OFFSET + data.len() + WKC_LEN);

        let hdr = EtherCatSubHeader(&buf[16..26]);
        assert_eq!(hdr.command(), CommandType::Fpwr.code());
        assert_eq!(hdr.index(), 5);
        assert_eq!(hdr.adp(), 0x1001);
        assert_eq!(hdr.ado(), 0x0006);
        assert_eq!(hdr.length(), 4);
        assert!(!hdr.has_next());

        assert_eq!(&buf[26..30], &data);
        assert_eq!(&buf[30..32], &[0, 0]);
    }

    #[test]
    fn pure_read_command_zero_fills_payload() {
        let mut buf = [0xAAu8; 64];
        let data = [0xFF, 0xFF];
        setup_datagram(&mut buf, CommandType::Aprd, 0, 0, 0, &data, 0).unwrap();
        assert_eq!(&buf[26..28], &[0, 0]);
    }

    #[test]
    fn add_datagram_chains_and_sets_has_next() {
        let mut buf = [0u8; 128];
        let total1 =
            setup_datagram(&mut buf, CommandType::Brd, 0, 0, 0x0130, &[0u8; 2], 0).unwrap();
        let (total2, payload_offset) =
            add_datagram(&mut buf, total1, CommandType::Fprd, 1, 0x1001, 0x0000, &[0u8; 4], 0)
                .unwrap();

        let first = EtherCatSubHeader(&buf[16..26]);
        assert!(first.has_next());

        assert_eq!(payload_offset, total1 + DATAGRAM_HEADER_LEN);
        let second = EtherCatSubHeader(&buf[total1..total1 + 10]);
        assert!(!second.has_next());
        assert_eq!(total2, total1 + DATAGRAM_HEADER_LEN + 4 + WKC_LEN);
    }

    #[test]
    fn datagrams_iterates_full_chain() {
        let mut buf = [0u8; 128];
        let total1 =
            setup_datagram(&mut buf, CommandType::Brd, 0, 0, 0x0130, &[0u8; 2], 0).unwrap();
        let (total2, _) =
            add_datagram(&mut buf, total1, CommandType::Fprd, 1, 0x1001, 0x0000, &[0u8; 4], 0)
                .unwrap();

        let views: Vec<_> = datagrams(&buf, total2).collect();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].index, 0);
        assert_eq!(views[0].data_len, 2);
        assert_eq!(views[1].index, 1);
        assert_eq!(views[1].data_len, 4);
    }

    #[test]
    fn sum_wkc_adds_every_datagram_in_chain() {
        let mut buf = [0u8; 128];
        let total1 =
            setup_datagram(&mut buf, CommandType::Brd, 0, 0, 0x0130, &[0u8; 2], 0).unwrap();
        let (total2, _) =
            add_datagram(&mut buf, total1, CommandType::Fprd, 1, 0x1001, 0x0000, &[0u8; 4], 0)
                .unwrap();

        buf[31..33].copy_from_slice(&3u16.to_le_bytes());
        let wkc_offset_second = total1 + 10 + 4;
        buf[wkc_offset_second..wkc_offset_second + 2].copy_from_slice(&5u16.to_le_bytes());

        assert_eq!(sum_wkc(&buf, total2), 8);
        assert_eq!(wkc_at(&buf, total2, 0), Some(3));
        assert_eq!(wkc_at(&buf, total2, 1), Some(5));
    }

    #[test]
    fn payload_too_large_is_rejected() {
        let mut buf = [0u8; 8];
        let data = [0u8; MAX_PDU_DATA + 1];
        let err = setup_datagram(&mut buf, CommandType::Bwr, 0, 0, 0, &data, 0).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }
}
