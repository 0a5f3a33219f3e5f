use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use lio_transport::{Address, Error, Family};
use proptest::prelude::*;

proptest! {
  #[test]
  fn test_v4_text_round_trip(host in any::<[u8; 4]>(), port in any::<u16>()) {
    let addr = Address::V4 { host, port };
    let text = addr.to_text();
    let parsed = Address::parse(&text, port).unwrap();

    prop_assert_eq!(parsed.family(), Family::V4);
    prop_assert_eq!(parsed.to_text(), text);
    prop_assert_eq!(parsed, addr);
  }

  #[test]
  fn test_v6_text_round_trip(host in any::<[u8; 16]>(), port in any::<u16>()) {
    let addr = Address::V6 { host, port, scope_id: 0 };
    let text = addr.to_text();
    let parsed = Address::parse(&text, port).unwrap();

    prop_assert_eq!(parsed.family(), Family::V6);
    prop_assert_eq!(parsed.to_text(), text);
  }

  #[test]
  fn test_wire_size_depends_on_family_only(
    v4 in any::<[u8; 4]>(),
    v6 in any::<[u8; 16]>(),
    port in any::<u16>(),
  ) {
    prop_assert_eq!(Address::V4 { host: v4, port }.wire_size(), 16);
    prop_assert_eq!(Address::V6 { host: v6, port, scope_id: 0 }.wire_size(), 28);
  }
}

#[test]
fn test_parse_rejects_hostnames() {
  match Address::parse("localhost", 80) {
    Err(Error::Resolution { code, .. }) => assert_eq!(code, libc::EAI_NONAME),
    other => panic!("expected a resolution error, got {other:?}"),
  }
}

#[test]
fn test_display_and_from_str() {
  let v4 = Address::new_v4(Ipv4Addr::new(192, 168, 1, 20), 7777);
  assert_eq!(v4.to_string(), "192.168.1.20:7777");
  assert_eq!("192.168.1.20:7777".parse::<Address>().unwrap(), v4);

  let v6 = Address::new_v6(Ipv6Addr::LOCALHOST, 443);
  assert_eq!(v6.to_string(), "[::1]:443");
  assert_eq!("[::1]:443".parse::<Address>().unwrap(), v6);

  assert!("not an address".parse::<Address>().is_err());
}

#[test]
fn test_std_conversions() {
  let std_addr: SocketAddr = "10.0.0.1:53".parse().unwrap();
  let addr = Address::from(std_addr);
  assert_eq!(addr.port(), 53);
  assert_eq!(addr.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)));
  assert_eq!(SocketAddr::from(addr), std_addr);
}

#[test]
fn test_port_accessors() {
  let mut addr = Address::ANY_V4;
  addr.set_port(9000);
  assert_eq!(addr.port(), 9000);
  assert_eq!(addr.with_port(1).port(), 1);
  assert_eq!(Address::BROADCAST_V4.to_text(), "255.255.255.255");
  assert_eq!(Address::ANY_V6.to_text(), "::");
}

#[test]
fn test_write_host_ip() {
  let addr = Address::parse("10.20.30.40", 0).unwrap();

  let mut buf = [0xFFu8; 16];
  let len = addr.write_host_ip(&mut buf).unwrap();
  assert_eq!(&buf[..len], b"10.20.30.40");
  assert_eq!(buf[len], 0);

  let mut short = [0u8; 11];
  match addr.write_host_ip(&mut short) {
    Err(Error::BufferTooSmall { needed, available }) => {
      assert_eq!(needed, 12);
      assert_eq!(available, 11);
    }
    other => panic!("expected BufferTooSmall, got {other:?}"),
  }
}

#[test]
fn test_resolve_literal_and_localhost() {
  let addr = Address::resolve("127.0.0.1", Some(8080)).unwrap();
  assert_eq!(addr, Address::new_v4(Ipv4Addr::LOCALHOST, 8080));

  let local = Address::resolve("localhost", None).unwrap();
  assert!(local.ip().is_loopback(), "localhost resolved to {local}");
  assert_eq!(local.port(), 0);
}

#[test]
fn test_reverse_lookup_never_returns_empty() {
  // Whether a name is registered for loopback depends on the host; either a
  // name or the numeric fallback is acceptable, a resolver status is too.
  let addr = Address::new_v4(Ipv4Addr::LOCALHOST, 0);
  match addr.reverse_lookup() {
    Ok(name) => assert!(!name.is_empty()),
    Err(Error::Resolution { .. }) => {}
    Err(other) => panic!("unexpected error: {other:?}"),
  }
}
