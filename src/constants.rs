//! Wire-format constants for the EtherCAT datagram layer.
//!
//! Byte offsets and bit widths here are normative and must not drift from
//! the EtherCAT frame specification.

/// Destination/source MAC + EtherType: the part of the frame this layer
/// never rewrites.
pub const ETH_HEADER_LEN: usize = 14;

/// The 2-byte EtherCAT type/length word immediately after the Ethernet header.
pub const ECAT_HEADER_LEN: usize = 2;

/// One datagram sub-header: command, index, ADP, ADO, dlength, IRQ.
pub const DATAGRAM_HEADER_LEN: usize = 10;

/// Trailing working-counter field, present once per datagram.
pub const WKC_LEN: usize = 2;

/// Offset of the first datagram's payload in a frame built by `setup_datagram`.
pub const FIRST_PAYLOAD_OFFSET: usize = ETH_HEADER_LEN + ECAT_HEADER_LEN + DATAGRAM_HEADER_LEN;

/// Conventional maximum Ethernet frame size used for tx/rx slot buffers.
pub const MAX_FRAME_LEN: usize = 1518;

/// Largest single-datagram payload.
pub const MAX_PDU_DATA: usize = 1486;

/// Number of transaction slots in a `Port`'s pool (8, the conventional
/// value derived from the 8-bit datagram index field).
pub const NUM_SLOTS: usize = 8;

/// Protocol-type nibble (bits 12-15 of the EtherCAT type/length header) that
/// marks a "datagram" frame, as opposed to mailbox or other EtherCAT types.
pub const ECAT_DATAGRAM_TYPE: u8 = 1;

/// EtherType carried by the Ethernet header for EtherCAT frames.
pub const ETHERCAT_ETHERTYPE: u16 = 0x88A4;

/// Distributed-clock system time register, read by `LRWDC`'s `FRMW` half.
pub const ECT_REG_DCSYSTIME: u16 = 0x0910;

/// `NEX_TIMEOUTRET`: recommended timeout for a single primitive round trip.
pub const DEFAULT_TIMEOUT_US: u32 = 2000;
