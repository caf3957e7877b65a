//! Concrete primitive-level scenarios, each driving a full `Port` round trip
//! against a scripted [`MockLinkLayer`].

use std::sync::{Arc, Mutex};
use std::time::Duration;

use ecat_pdu::command::CommandType;
use ecat_pdu::compound::lrwdc;
use ecat_pdu::constants::{DATAGRAM_HEADER_LEN, ETH_HEADER_LEN};
use ecat_pdu::frame;
use ecat_pdu::mock::MockLinkLayer;
use ecat_pdu::port::Port;
use ecat_pdu::primitives::{aprdw, brd};

const TIMEOUT: Duration = Duration::from_millis(200);

#[test]
fn broadcast_read_returns_wkc_and_payload_from_three_slaves() {
    let link = MockLinkLayer::new(|sent| {
        let mut reply = sent.to_vec();
        let total = reply.len();
        let view = frame::datagrams(&reply, total).next().unwrap();
        reply[view.data_offset..view.data_offset + view.data_len].copy_from_slice(&[0x08, 0x00]);
        reply[view.wkc_offset..view.wkc_offset + 2].copy_from_slice(&3u16.to_le_bytes());
        Some(reply)
    });
    let port = Port::open(link, 0x0101_0101_0101);

    let (data, wkc) = brd(&port, 0x0130, 2, TIMEOUT).unwrap();
    assert_eq!(wkc, 3);
    assert_eq!(data, vec![0x08, 0x00]);
}

#[test]
fn aprdw_decodes_little_endian_word_on_this_host() {
    let link = MockLinkLayer::new(|sent| {
        let mut reply = sent.to_vec();
        let total = reply.len();
        let view = frame::datagrams(&reply, total).next().unwrap();
        reply[view.data_offset..view.data_offset + 2].copy_from_slice(&[0x34, 0x12]);
        reply[view.wkc_offset..view.wkc_offset + 2].copy_from_slice(&1u16.to_le_bytes());
        Some(reply)
    });
    let port = Port::open(link, 0x0101_0101_0101);

    let (value, wkc) = aprdw(&port, 0, 0x0000, TIMEOUT).unwrap();
    assert_eq!(wkc, 1);
    assert_eq!(value, 0x1234);
}

#[test]
fn fpwr_lays_out_the_exact_sub_header_and_payload_bytes() {
    let sent_frame: Arc<Mutex<Option<Vec<u8>>>> = Arc::new(Mutex::new(None));
    let captured = sent_frame.clone();
    let link = MockLinkLayer::new(move |sent| {
        *captured.lock().unwrap() = Some(sent.to_vec());
        let mut reply = sent.to_vec();
        let total = reply.len();
        let view = frame::datagrams(&reply, total).next().unwrap();
        reply[view.wkc_offset..view.wkc_offset + 2].copy_from_slice(&1u16.to_le_bytes());
        Some(reply)
    });
    let port = Port::open(link, 0x0101_0101_0101);

    let index = port.get_index().unwrap();
    port.setup_datagram(index, CommandType::Fpwr, 0x1001, 0x0120, &[0x04, 0x00], 0)
        .unwrap();
    port.send_receive_confirm(index, TIMEOUT).unwrap();
    port.release(index);

    let frame = sent_frame.lock().unwrap().take().unwrap();
    let header_offset = ETH_HEADER_LEN + 2;
    let sub_header = &frame[header_offset..header_offset + DATAGRAM_HEADER_LEN];
    assert_eq!(
        sub_header,
        &[0x05, index, 0x01, 0x10, 0x20, 0x01, 0x02, 0x00, 0x00, 0x00]
    );
    let payload_offset = header_offset + DATAGRAM_HEADER_LEN;
    assert_eq!(&frame[payload_offset..payload_offset + 2], &[0x04, 0x00]);
    assert_eq!(&frame[payload_offset + 2..payload_offset + 4], &[0x00, 0x00]);
}

#[test]
fn lrwdc_chains_lrw_with_a_distributed_clock_read() {
    let link = MockLinkLayer::new(|sent| {
        let mut reply = sent.to_vec();
        let total = reply.len();
        let views: Vec<_> = frame::datagrams(&reply, total).collect();
        assert_eq!(views.len(), 2, "lrwdc must chain exactly two datagrams");

        let lrw = &views[0];
        reply[lrw.data_offset..lrw.data_offset + lrw.data_len].fill(0xAB);
        reply[lrw.wkc_offset..lrw.wkc_offset + 2].copy_from_slice(&2u16.to_le_bytes());

        let dc = &views[1];
        reply[dc.data_offset..dc.data_offset + 8].copy_from_slice(&0x0102030405060708u64.to_le_bytes());
        reply[dc.wkc_offset..dc.wkc_offset + 2].copy_from_slice(&1u16.to_le_bytes());

        Some(reply)
    });
    let port = Port::open(link, 0x0101_0101_0101);

    let (process_data, dc_time, lrw_wkc) =
        lrwdc(&port, 0x00010000, &[0u8; 8], 0x1000, TIMEOUT).unwrap();

    assert_eq!(lrw_wkc, 2);
    assert_eq!(process_data, vec![0xAB; 8]);
    assert_eq!(dc_time, 0x0102030405060708);
}

#[test]
fn timeout_releases_the_slot_for_reuse() {
    let port = Port::open(MockLinkLayer::silent(), 0x0101_0101_0101);

    let index = port.get_index().unwrap();
    port.setup_datagram(index, CommandType::Brd, 0, 0x0130, &[0u8; 2], 0)
        .unwrap();
    let err = port.send_receive_confirm(index, Duration::from_millis(5)).unwrap_err();
    assert!(matches!(err, ecat_pdu::DatagramError::Timeout));
    port.release(index);

    // The index must be back on the free list after release.
    let reused = port.get_index().unwrap();
    assert_eq!(reused, index);
    port.release(reused);
}
