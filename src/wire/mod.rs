//! Bit-exact wire structures for the EtherCAT frame, built with the same
//! `bitfield!` macro.

mod headers;

pub use headers::{EtherCatSubHeader, EtherCatTypeHeader, EthernetHeader};
