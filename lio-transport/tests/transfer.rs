use std::io::{IoSlice, IoSliceMut};
use std::time::Duration;

use lio_transport::test_utils::{connected_tcp_pair, udp6_socket, udp_socket};
use lio_transport::{Address, Error, Socket, SocketOption, WaitCondition};

fn loopback_exchange(rx: &Socket, tx: &Socket) {
  let payload: Vec<u8> = (0..512).map(|_| fastrand::u8(..)).collect();
  let to = rx.local_address().unwrap();

  let sent = tx.send(Some(&to), &[IoSlice::new(&payload)]).unwrap();
  assert_eq!(sent, payload.len());

  let ready = rx
    .wait(WaitCondition::RECEIVE, Duration::from_secs(1))
    .unwrap();
  assert!(ready.contains(WaitCondition::RECEIVE));

  let mut buf = [0u8; 1500];
  let mut from = match to {
    Address::V4 { .. } => Address::ANY_V4,
    Address::V6 { .. } => Address::ANY_V6,
  };
  let n = rx.receive(Some(&mut from), &mut [IoSliceMut::new(&mut buf)]).unwrap();

  assert_eq!(&buf[..n], &payload[..]);
  assert_eq!(from, tx.local_address().unwrap());
}

#[test]
fn test_loopback_round_trip_v4() {
  let rx = udp_socket().unwrap();
  let tx = udp_socket().unwrap();
  loopback_exchange(&rx, &tx);
}

#[test]
fn test_loopback_round_trip_v6() {
  // Containers often run without an IPv6 loopback.
  let (Ok(rx), Ok(tx)) = (udp6_socket(), udp6_socket()) else {
    return;
  };
  loopback_exchange(&rx, &tx);
}

#[test]
fn test_gather_and_scatter_preserve_order() {
  let rx = udp_socket().unwrap();
  let tx = udp_socket().unwrap();

  let chunks: Vec<Vec<u8>> = (0..8)
    .map(|_| (0..fastrand::usize(1..64)).map(|_| fastrand::u8(..)).collect())
    .collect();
  let slices: Vec<IoSlice<'_>> = chunks.iter().map(|c| IoSlice::new(c)).collect();
  let expected: Vec<u8> = chunks.concat();

  tx.send(Some(&rx.local_address().unwrap()), &slices).unwrap();

  let mut parts = [[0u8; 100]; 6];
  let mut bufs: Vec<IoSliceMut<'_>> =
    parts.iter_mut().map(|p| IoSliceMut::new(p)).collect();
  let n = rx.receive(None, &mut bufs).unwrap();
  assert_eq!(n, expected.len());

  let flat: Vec<u8> = parts.concat();
  assert_eq!(&flat[..n], &expected[..]);
}

#[test]
fn test_receive_into_small_buffers_is_truncated() {
  let rx = udp_socket().unwrap();
  let tx = udp_socket().unwrap();
  tx.send(Some(&rx.local_address().unwrap()), &[IoSlice::new(&[1u8; 100])])
    .unwrap();

  let mut a = [0u8; 20];
  let mut b = [0u8; 30];
  let err = rx
    .receive(None, &mut [IoSliceMut::new(&mut a), IoSliceMut::new(&mut b)])
    .unwrap_err();
  assert!(matches!(err, Error::Truncated { capacity: 50 }), "got {err:?}");
}

#[test]
fn test_connected_datagram_needs_no_peer() {
  let rx = udp_socket().unwrap();
  let tx = udp_socket().unwrap();
  tx.connect(&rx.local_address().unwrap()).unwrap();

  tx.send(None, &[IoSlice::new(b"connected")]).unwrap();

  let mut buf = [0u8; 32];
  let n = rx.receive(None, &mut [IoSliceMut::new(&mut buf)]).unwrap();
  assert_eq!(&buf[..n], b"connected");
}

#[test]
fn test_zero_length_datagram_reads_as_zero() {
  let rx = udp_socket().unwrap();
  let tx = udp_socket().unwrap();
  tx.send(Some(&rx.local_address().unwrap()), &[]).unwrap();

  rx.wait(WaitCondition::RECEIVE, Duration::from_secs(1)).unwrap();
  let mut from = Address::ANY_V4;
  let mut buf = [0u8; 8];
  let n = rx.receive(Some(&mut from), &mut [IoSliceMut::new(&mut buf)]).unwrap();

  // Indistinguishable from would-block by the count alone; the sender is
  // what tells them apart.
  assert_eq!(n, 0);
  assert_eq!(from, tx.local_address().unwrap());
}

#[test]
fn test_full_send_buffer_returns_zero() {
  let (client, _server) = connected_tcp_pair().unwrap();
  client.set_option(SocketOption::NonBlock, 1).unwrap();
  client.set_option(SocketOption::SendBuffer, 4096).unwrap();

  let chunk = vec![0xAAu8; 64 * 1024];
  let mut saw_zero = false;
  for _ in 0..10_000 {
    if client.send(None, &[IoSlice::new(&chunk)]).unwrap() == 0 {
      saw_zero = true;
      break;
    }
  }
  assert!(saw_zero, "send never reported a full buffer");
}
