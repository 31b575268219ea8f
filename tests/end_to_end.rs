//! Full-loop tests driving the dispatcher over real loopback UDP sockets,
//! covering the scenarios in the component design's testable-properties
//! section: fresh lease, NAK, other-server selection, release/reuse.

use std::net::UdpSocket;
use std::time::Duration;

use dhcpd::arp::NoopArpTable;
use dhcpd::dispatch::Dispatcher;
use dhcpd::message::{Message, MessageType};
use dhcpd::options;
use dhcpd::pool::{Pool, PoolIndexes};

fn ip(s: &str) -> u32 {
    u32::from(s.parse::<std::net::Ipv4Addr>().unwrap())
}

fn spawn_server(pool: Pool) -> std::net::SocketAddr {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    let addr = socket.local_addr().unwrap();
    // The real dispatcher unicasts OFFER/ACK to the address it just handed
    // out (§4.4), relying on the proxy-ARP entry it installs to make that
    // address reachable on the link. This harness has no such link, so it
    // asks the dispatcher to reply to the request's source instead.
    let mut dispatcher = Dispatcher::new(socket, pool, NoopArpTable).deliver_replies_to_request_source();
    std::thread::spawn(move || dispatcher.run());
    addr
}

fn client_socket() -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
    socket.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    socket
}

fn discover(xid: u32, mac: [u8; 6]) -> Message {
    let mut opts = options::Options::new();
    opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Discover.into()]);
    let mut chaddr = [0u8; 16];
    chaddr[..6].copy_from_slice(&mac);
    Message {
        op: dhcpd::message::BOOTREQUEST,
        htype: 1,
        hlen: 6,
        hops: 0,
        xid,
        secs: 0,
        flags: 0,
        ciaddr: 0,
        yiaddr: 0,
        siaddr: 0,
        giaddr: 0,
        chaddr,
        options: opts,
    }
}

fn request(xid: u32, mac: [u8; 6], server_id: u32, requested_ip: u32) -> Message {
    let mut opts = options::Options::new();
    opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Request.into()]);
    if server_id != 0 {
        opts.push(options::SERVER_IDENTIFIER, server_id.to_be_bytes().to_vec());
    }
    if requested_ip != 0 {
        opts.push(options::REQUESTED_IP_ADDRESS, requested_ip.to_be_bytes().to_vec());
    }
    let mut chaddr = [0u8; 16];
    chaddr[..6].copy_from_slice(&mac);
    Message {
        op: dhcpd::message::BOOTREQUEST,
        htype: 1,
        hlen: 6,
        hops: 0,
        xid,
        secs: 0,
        flags: 0,
        ciaddr: 0,
        yiaddr: 0,
        siaddr: 0,
        giaddr: 0,
        chaddr,
        options: opts,
    }
}

fn release(xid: u32, mac: [u8; 6]) -> Message {
    let mut opts = options::Options::new();
    opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Release.into()]);
    let mut chaddr = [0u8; 16];
    chaddr[..6].copy_from_slice(&mac);
    Message {
        op: dhcpd::message::BOOTREQUEST,
        htype: 1,
        hlen: 6,
        hops: 0,
        xid,
        secs: 0,
        flags: 0,
        ciaddr: 0,
        yiaddr: 0,
        siaddr: 0,
        giaddr: 0,
        chaddr,
        options: opts,
    }
}

fn send_recv(client: &UdpSocket, server: std::net::SocketAddr, msg: &Message) -> Option<Message> {
    let mut buf = [0u8; 600];
    let n = msg.encode(&mut buf).unwrap();
    client.send_to(&buf[..n], server).unwrap();

    let mut reply_buf = [0u8; 600];
    match client.recv(&mut reply_buf) {
        Ok(n) => Some(Message::decode(&reply_buf[..n]).unwrap()),
        Err(_) => None,
    }
}

fn scenario_pool() -> Pool {
    Pool::new(
        ip("10.0.0.1"),
        ip("255.255.255.0"),
        ip("10.0.0.1"),
        "eth0".into(),
        PoolIndexes::new(ip("10.0.0.10"), ip("10.0.0.12")),
        Duration::from_secs(3600),
        Duration::from_secs(30),
    )
}

#[test]
fn fresh_lease_over_the_wire() {
    let server = spawn_server(scenario_pool());
    let client = client_socket();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01];

    let offer = send_recv(&client, server, &discover(0x1234, mac)).unwrap();
    assert_eq!(offer.yiaddr, ip("10.0.0.10"));
    assert_eq!(offer.xid, 0x1234);
    assert_eq!(offer.message_type(), Some(MessageType::Offer));
    assert_eq!(offer.options.get_ip(options::SERVER_IDENTIFIER), Some(ip("10.0.0.1")));

    let ack = send_recv(&client, server, &request(0x1234, mac, ip("10.0.0.1"), ip("10.0.0.10"))).unwrap();
    assert_eq!(ack.yiaddr, ip("10.0.0.10"));
    assert_eq!(ack.message_type(), Some(MessageType::Ack));
}

#[test]
fn nak_when_no_pending_binding_exists() {
    let server = spawn_server(scenario_pool());
    let client = client_socket();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x02];

    let nak = send_recv(&client, server, &request(0x2222, mac, ip("10.0.0.1"), 0)).unwrap();
    assert_eq!(nak.message_type(), Some(MessageType::Nak));
    assert_eq!(nak.yiaddr, 0);
}

#[test]
fn other_server_selection_yields_no_reply() {
    let server = spawn_server(scenario_pool());
    let client = client_socket();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x03];

    send_recv(&client, server, &discover(0x3333, mac)).unwrap();
    let reply = send_recv(&client, server, &request(0x3333, mac, ip("192.168.1.1"), 0));
    assert!(reply.is_none());
}

#[test]
fn release_then_rediscover_reuses_the_address() {
    let server = spawn_server(scenario_pool());
    let client = client_socket();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x04];

    send_recv(&client, server, &discover(0x4444, mac)).unwrap();
    send_recv(&client, server, &request(0x4444, mac, ip("10.0.0.1"), ip("10.0.0.10"))).unwrap();

    let ignored = send_recv(&client, server, &release(0x4444, mac));
    assert!(ignored.is_none());

    let offer = send_recv(&client, server, &discover(0x5555, mac)).unwrap();
    assert_eq!(offer.yiaddr, ip("10.0.0.10"));
}

#[test]
fn static_binding_wins_over_the_dynamic_pool() {
    let mut pool = scenario_pool();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff];
    pool.bindings
        .add_binding(ip("10.0.0.99"), mac.to_vec(), true, dhcpd::binding::Status::Empty);

    let server = spawn_server(pool);
    let client = client_socket();

    let offer = send_recv(&client, server, &discover(0x6666, mac)).unwrap();
    assert_eq!(offer.yiaddr, ip("10.0.0.99"));
}

#[test]
fn inform_returns_an_ack_without_assigning_an_address() {
    let server = spawn_server(scenario_pool());
    let client = client_socket();
    let mac = [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x07];

    let mut opts = options::Options::new();
    opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Inform.into()]);
    let mut chaddr = [0u8; 16];
    chaddr[..6].copy_from_slice(&mac);
    let inform = Message {
        op: dhcpd::message::BOOTREQUEST,
        htype: 1,
        hlen: 6,
        hops: 0,
        xid: 0x7777,
        secs: 0,
        flags: 0,
        ciaddr: 0,
        yiaddr: 0,
        siaddr: 0,
        giaddr: 0,
        chaddr,
        options: opts,
    };

    let ack = send_recv(&client, server, &inform).unwrap();
    assert_eq!(ack.message_type(), Some(MessageType::Ack));
    assert_eq!(ack.yiaddr, 0);
}
