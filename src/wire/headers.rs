use crate::constants::ETHERCAT_ETHERTYPE;
use bitfield::bitfield;

bitfield! {
    /// The 14-byte Ethernet II header. Written once at `Port::open` and never
    /// touched again by this layer.
    #[derive(Debug, Clone)]
    pub struct EthernetHeader(MSB0 [u8]);
    u64;
    pub destination, set_destination: 47, 0;
    pub source, set_source: 48 + 47, 48;
    u16;
    pub ether_type, set_ether_type: 48 + 47 + 1 + 15, 48 + 47 + 1;
}

impl EthernetHeader<[u8; 14]> {
    pub const SIZE: usize = 14;
}

impl<T: AsRef<[u8]> + AsMut<[u8]>> EthernetHeader<T> {
    pub fn set_ethercat_type(&mut self) {
        self.set_ether_type(ETHERCAT_ETHERTYPE);
    }
}

bitfield! {
    /// The 2-byte EtherCAT type/length word.
    #[derive(Debug, Clone)]
    pub struct EtherCatTypeHeader([u8]);
    u16;
    pub length, set_length: 10, 0;
    u8;
    pub ethercat_type, set_ethercat_type: 15, 12;
}

impl EtherCatTypeHeader<[u8; 2]> {
    pub const SIZE: usize = 2;
}

bitfield! {
    /// One 10-byte datagram sub-header.
    #[derive(Debug, Clone)]
    pub struct EtherCatSubHeader([u8]);
    u8;
    pub command, set_command: 7, 0;
    pub index, set_index: 15, 8;
    u16;
    pub adp, set_adp: 31, 16;
    pub ado, set_ado: 47, 32;
    pub length, set_length: 58, 48;
    u8;
    pub circulated, set_circulated: 62;
    pub has_next, set_has_next: 63;
    u16;
    pub irq, set_irq: 64 + 15, 64;
}

impl EtherCatSubHeader<[u8; 10]> {
    pub const SIZE: usize = 10;
}
