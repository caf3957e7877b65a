//! Transaction-slot pool: index allocation, frame assembly, and the blocking
//! send/receive/confirm round trip.
//!
//! A `Port` owns one [`LinkLayer`] and a fixed pool of `NUM_SLOTS` transaction
//! buffers. Concurrent callers each borrow a slot by index, fill it with one
//! or more chained datagrams, and hand it to `send_receive_confirm`, which
//! owns the link for the duration of that one round trip: datagrams in
//! flight at once are bounded by the pool, but only one frame is physically
//! on the wire at a time — see DESIGN.md for why this crate does not attempt
//! full pipelining. This mirrors a free-list slot pool swapped from
//! single-threaded cooperative polling to `std::sync::Mutex`-guarded
//! blocking calls.

use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use crate::command::CommandType;
use crate::constants::{ECAT_HEADER_LEN, ETH_HEADER_LEN, MAX_FRAME_LEN, NUM_SLOTS};
use crate::error::{DatagramError, Result};
use crate::frame::{self, FrameError};
use crate::transport::LinkLayer;
use crate::wire::EthernetHeader;

fn frame_err<E>(e: FrameError) -> DatagramError<E> {
    match e {
        FrameError::PayloadTooLarge { length, max } => DatagramError::PayloadTooLarge { length, max },
        FrameError::BufferTooSmall { .. } => DatagramError::FrameTooSmall,
    }
}

/// Lifecycle of one transaction slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BufState {
    /// On the free list, contents undefined.
    Empty,
    /// Holds one or more datagrams, not yet sent.
    Filled,
    /// Sent on the wire, awaiting a matching reply.
    Sent,
    /// A matching reply has overwritten the slot; WKC and payload are valid.
    Received,
}

struct Slot {
    buf: [u8; MAX_FRAME_LEN],
    total_len: usize,
    chain_len: usize,
    state: BufState,
}

impl Slot {
    fn new() -> Self {
        Self {
            buf: [0u8; MAX_FRAME_LEN],
            total_len: 0,
            chain_len: 0,
            state: BufState::Empty,
        }
    }

    fn reset_header(&mut self, source_mac: u64) {
        let mut eth = EthernetHeader(&mut self.buf[..ETH_HEADER_LEN]);
        eth.set_destination(0xFFFF_FFFF_FFFF);
        eth.set_source(source_mac);
        eth.set_ethercat_type();
    }
}

/// The datagram layer's single entry point: one pool of transaction slots
/// bound to one link.
pub struct Port<L: LinkLayer> {
    link: Mutex<L>,
    slots: [Mutex<Slot>; NUM_SLOTS],
    free: Mutex<Vec<u8>>,
    source_mac: u64,
}

impl<L: LinkLayer> Port<L> {
    /// Opens a port over `link`, presetting every slot's Ethernet header with
    /// `source_mac` as the source address and the broadcast destination
    /// (this layer never rewrites that header again).
    pub fn open(link: L, source_mac: u64) -> Self {
        let slots = std::array::from_fn(|_| {
            let mut slot = Slot::new();
            slot.reset_header(source_mac);
            Mutex::new(slot)
        });
        Self {
            link: Mutex::new(link),
            slots,
            free: Mutex::new((0..NUM_SLOTS as u8).collect()),
            source_mac,
        }
    }

    fn lock_slot(&self, index: u8) -> MutexGuard<'_, Slot> {
        self.slots[index as usize].lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Allocates a free transaction index from a mutex-guarded free list.
    pub fn get_index(&self) -> Result<u8, L::Error> {
        let mut free = self.free.lock().unwrap_or_else(|e| e.into_inner());
        let index = free.pop().ok_or_else(|| {
            log::warn!("get_index: slot pool exhausted");
            DatagramError::NoFreeSlot
        })?;
        drop(free);
        let mut slot = self.lock_slot(index);
        slot.total_len = 0;
        slot.chain_len = 0;
        slot.state = BufState::Empty;
        Ok(index)
    }

    /// Returns `index` to the free pool. Callers must not use `index` again
    /// after this.
    pub fn release(&self, index: u8) {
        let mut slot = self.lock_slot(index);
        slot.state = BufState::Empty;
        drop(slot);
        self.free.lock().unwrap_or_else(|e| e.into_inner()).push(index);
    }

    /// Lays the first datagram of `index`'s frame.
    pub fn setup_datagram(
        &self,
        index: u8,
        command: CommandType,
        adp: u16,
        ado: u16,
        data: &[u8],
        irq: u16,
    ) -> Result<(), L::Error> {
        let mut slot = self.lock_slot(index);
        let total_len = frame::setup_datagram(&mut slot.buf, command, index, adp, ado, data, irq)
            .map_err(frame_err)?;
        slot.total_len = total_len;
        slot.chain_len = 1;
        slot.state = BufState::Filled;
        Ok(())
    }

    /// Appends another datagram to `index`'s frame. Returns the new datagram's position in the chain, for later
    /// use with [`Port::wkc_at`] and [`Port::read_response`].
    pub fn add_datagram(
        &self,
        index: u8,
        command: CommandType,
        adp: u16,
        ado: u16,
        data: &[u8],
        irq: u16,
    ) -> Result<usize, L::Error> {
        let mut slot = self.lock_slot(index);
        if slot.state != BufState::Filled {
            return Err(DatagramError::FrameTooSmall);
        }
        let (new_total, _payload_offset) = frame::add_datagram(
            &mut slot.buf,
            slot.total_len,
            command,
            index,
            adp,
            ado,
            data,
            irq,
        )
        .map_err(frame_err)?;
        slot.total_len = new_total;
        let position = slot.chain_len;
        slot.chain_len += 1;
        Ok(position)
    }

    /// Sends `index`'s frame and blocks until a reply whose index byte
    /// matches comes back, or `timeout` elapses. The transport demultiplexes
    /// by that 1-byte index.
    ///
    /// Holds the link for the whole round trip, so only one frame from this
    /// `Port` is ever in flight at once; see DESIGN.md.
    pub fn send_receive_confirm(&self, index: u8, timeout: Duration) -> Result<u16, L::Error> {
        {
            let mut slot = self.lock_slot(index);
            if slot.state != BufState::Filled {
                return Err(DatagramError::FrameTooSmall);
            }
            slot.state = BufState::Sent;
        }

        let mut link = self.link.lock().unwrap_or_else(|e| e.into_inner());
        {
            let slot = self.lock_slot(index);
            link.send(&slot.buf[..slot.total_len]).map_err(DatagramError::Transport)?;
        }

        let deadline = Instant::now() + timeout;
        let mut scratch = [0u8; MAX_FRAME_LEN];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                log::warn!("send_receive_confirm: timed out waiting for index {index}");
                let mut slot = self.lock_slot(index);
                slot.state = BufState::Filled;
                return Err(DatagramError::Timeout);
            }
            let received = link
                .recv_timeout(&mut scratch, remaining)
                .map_err(DatagramError::Transport)?;
            let Some(len) = received else { continue };
            if len < ETH_HEADER_LEN + ECAT_HEADER_LEN {
                continue;
            }
            let reply_index = scratch[ETH_HEADER_LEN + ECAT_HEADER_LEN + 1];
            if reply_index != index {
                log::trace!("send_receive_confirm: discarding reply for index {reply_index}, waiting for {index}");
                continue;
            }

            let mut slot = self.lock_slot(index);
            if len > slot.buf.len() {
                continue;
            }
            slot.buf[..len].copy_from_slice(&scratch[..len]);
            slot.total_len = len;
            slot.state = BufState::Received;
            let wkc = frame::sum_wkc(&slot.buf, slot.total_len);
            log::debug!("send_receive_confirm: index {index} confirmed, wkc={wkc}");
            return Ok(wkc);
        }
    }

    /// Reads back the payload of the datagram at `chain_position` within
    /// `index`'s received frame.
    pub fn read_response<R>(
        &self,
        index: u8,
        chain_position: usize,
        f: impl FnOnce(&[u8]) -> R,
    ) -> Result<R, L::Error> {
        let slot = self.lock_slot(index);
        if slot.state != BufState::Received {
            return Err(DatagramError::Timeout);
        }
        let view = frame::datagrams(&slot.buf, slot.total_len)
            .nth(chain_position)
            .ok_or(DatagramError::FrameTooSmall)?;
        Ok(f(&slot.buf[view.data_offset..view.data_offset + view.data_len]))
    }

    /// The command code the slave actually answered with, for sanity
    /// checking a reply against what was sent.
    pub fn reply_command(&self, index: u8, chain_position: usize) -> Result<CommandType, L::Error> {
        let slot = self.lock_slot(index);
        if slot.state != BufState::Received {
            return Err(DatagramError::Timeout);
        }
        let view = frame::datagrams(&slot.buf, slot.total_len)
            .nth(chain_position)
            .ok_or(DatagramError::FrameTooSmall)?;
        Ok(view.command)
    }

    /// The working counter of a single datagram within a received compound
    /// frame (`LRWDC`'s own WKC, not the chain sum).
    pub fn wkc_at(&self, index: u8, chain_position: usize) -> Result<u16, L::Error> {
        let slot = self.lock_slot(index);
        if slot.state != BufState::Received {
            return Err(DatagramError::Timeout);
        }
        frame::wkc_at(&slot.buf, slot.total_len, chain_position).ok_or(DatagramError::FrameTooSmall)
    }

    pub fn source_mac(&self) -> u64 {
        self.source_mac
    }
}
