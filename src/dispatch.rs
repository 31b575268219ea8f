//! The single-threaded dispatcher loop: receive, validate framing, route to
//! a handler by message type, install a proxy-ARP entry for any address the
//! handler hands out, transmit the reply.

use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4, UdpSocket};
use std::time::SystemTime;

use crate::arp::ArpTable;
use crate::binding::{Kind, Status};
use crate::handlers;
use crate::message::{self, Message, MessageType};
use crate::pool::Pool;
use crate::{Error, Result, MIN_DATAGRAM_SIZE};

/// Maximum datagram size the dispatcher will attempt to parse or emit;
/// comfortably larger than the 576-byte minimum the RFC recommends
/// supporting.
const BUFFER_SIZE: usize = 1500;

/// Governs the destination address a reply is unicast to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ReplyTarget {
    /// Unicast OFFER/ACK to the address just handed out (`reply.yiaddr`),
    /// per §4.4; the proxy-ARP entry installed in [`Dispatcher::transmit`]
    /// is what makes that address reachable on the link.
    Assigned,
    /// Always reply to the request's source address. A loopback test
    /// harness plays both client and server on `127.0.0.1` and has no
    /// route to the addresses this server hands out, so it needs replies
    /// delivered back to the socket it's actually listening on.
    RequestSource,
}

/// Owns the listening socket, the process-wide [`Pool`], and the ARP
/// bridge; runs the receive/handle/reply loop.
pub struct Dispatcher<A: ArpTable> {
    socket: UdpSocket,
    pool: Pool,
    arp: A,
    reply_target: ReplyTarget,
}

impl<A: ArpTable> Dispatcher<A> {
    pub fn new(socket: UdpSocket, pool: Pool, arp: A) -> Self {
        Self { socket, pool, arp, reply_target: ReplyTarget::Assigned }
    }

    /// Reply to the request's source address rather than `yiaddr`. For test
    /// harnesses driving the dispatcher over loopback, where the assigned
    /// address isn't locally reachable; production callers should not need
    /// this.
    pub fn deliver_replies_to_request_source(mut self) -> Self {
        self.reply_target = ReplyTarget::RequestSource;
        self
    }

    /// Run forever. Only the receive and send calls block; every other step
    /// runs inline on this one thread (§5).
    pub fn run(&mut self) -> ! {
        let mut buf = [0u8; BUFFER_SIZE];
        loop {
            let (len, src) = match self.socket.recv_from(&mut buf) {
                Ok(v) => v,
                Err(e) => {
                    log::warn!("datagram receive failed: {e}");
                    continue;
                }
            };

            if let Err(e) = self.handle_datagram(&buf[..len], src) {
                log::warn!("{src}: {e}");
            }
        }
    }

    fn handle_datagram(&mut self, data: &[u8], src: SocketAddr) -> Result<()> {
        if data.len() < MIN_DATAGRAM_SIZE {
            return Err(Error::DataUnderflow);
        }

        let request = Message::decode(data)?;

        if request.op != message::BOOTREQUEST {
            return Err(Error::MalformedMessage("op is not BOOTREQUEST"));
        }

        let msg_type = request
            .message_type()
            .ok_or(Error::MalformedMessage("missing or unrecognized DHCP_MESSAGE_TYPE"))?;

        let now = SystemTime::now();
        self.pool.bindings.update_statuses(now);

        let reply = match msg_type {
            MessageType::Discover => handlers::serve_discover(&request, &mut self.pool, now),
            MessageType::Request => handlers::serve_request(&request, &mut self.pool, now),
            MessageType::Decline => {
                let reply = handlers::serve_decline(&request, &mut self.pool, now);
                self.withdraw_arp_entry(&request, Status::Empty);
                reply
            }
            MessageType::Release => {
                let reply = handlers::serve_release(&request, &mut self.pool, now);
                self.withdraw_arp_entry(&request, Status::Released);
                reply
            }
            MessageType::Inform => handlers::serve_inform(&request, &mut self.pool, now),
            MessageType::Offer | MessageType::Ack | MessageType::Nak => {
                return Err(Error::UnknownMessageType);
            }
        };

        let Some(reply) = reply else {
            return Ok(());
        };

        self.transmit(&reply, src)
    }

    /// DECLINE and RELEASE invalidate a binding the client previously held;
    /// remove its now-stale proxy-ARP entry rather than leaving the kernel
    /// table pointing at an address no longer assigned to this `chaddr`.
    fn withdraw_arp_entry(&self, request: &Message, freed_status: Status) {
        let cid = request.client_id();
        let Some(r) = self
            .pool
            .bindings
            .search_binding(&cid, Kind::StaticOrDynamic, Some(freed_status))
        else {
            return;
        };
        let address = self.pool.bindings.get(r).address;
        let mac: [u8; 6] = request.chaddr[..6].try_into().unwrap_or([0; 6]);
        if let Err(e) = self.arp.delete(mac, address) {
            log::warn!(
                "failed to remove proxy-arp entry for {}: {}",
                Ipv4Addr::from(address),
                Error::ArpFailure(e)
            );
        }
    }

    fn transmit(&self, reply: &Message, src: SocketAddr) -> Result<()> {
        let mac: [u8; 6] = reply.chaddr[..6].try_into().unwrap_or([0; 6]);

        if reply.yiaddr != 0 {
            if let Err(e) = self.arp.add(mac, reply.yiaddr) {
                log::warn!("failed to install proxy-arp entry: {}", Error::ArpFailure(e));
            }
        }

        let SocketAddr::V4(src) = src else {
            return Err(Error::MalformedMessage("DHCP over IPv6 is not supported"));
        };

        let dest_ip = match self.reply_target {
            ReplyTarget::Assigned if reply.yiaddr != 0 => Ipv4Addr::from(reply.yiaddr),
            _ => *src.ip(),
        };
        let dest = SocketAddrV4::new(dest_ip, src.port());

        let mut buf = [0u8; BUFFER_SIZE];
        let n = reply.encode(&mut buf)?;
        self.socket.send_to(&buf[..n], dest)?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arp::NoopArpTable;
    use crate::options;
    use crate::pool::PoolIndexes;
    use std::net::Ipv4Addr as V4;
    use std::time::Duration;

    fn ip(s: &str) -> u32 {
        u32::from(s.parse::<V4>().unwrap())
    }

    fn test_pool() -> Pool {
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

    fn dispatcher() -> Dispatcher<NoopArpTable> {
        let socket = UdpSocket::bind("127.0.0.1:0").unwrap();
        Dispatcher::new(socket, test_pool(), NoopArpTable)
    }

    fn discover_bytes(xid: u32, mac: [u8; 6]) -> Vec<u8> {
        let mut opts = options::Options::new();
        opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Discover.into()]);
        let mut chaddr = [0u8; 16];
        chaddr[..6].copy_from_slice(&mac);
        let msg = Message {
            op: message::BOOTREQUEST,
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
        };
        let mut buf = [0u8; 600];
        let n = msg.encode(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn rejects_datagrams_shorter_than_the_minimum() {
        let mut d = dispatcher();
        let bytes = discover_bytes(1, [0xaa; 6]);
        let short = &bytes[..crate::DHCP_HEADER_SIZE + 4];
        let src = "127.0.0.1:68".parse().unwrap();
        assert!(d.handle_datagram(short, src).is_err());
    }

    #[test]
    fn rejects_non_bootrequest_op() {
        let mut d = dispatcher();
        let mut bytes = discover_bytes(1, [0xaa; 6]);
        bytes[0] = message::BOOTREPLY;
        let src = "127.0.0.1:68".parse().unwrap();
        assert!(matches!(
            d.handle_datagram(&bytes, src),
            Err(Error::MalformedMessage(_))
        ));
    }

    #[test]
    fn handles_a_discover_and_creates_a_pending_binding() {
        let mut d = dispatcher();
        let bytes = discover_bytes(0x42, [0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
        let src = "127.0.0.1:68".parse().unwrap();
        d.handle_datagram(&bytes, src).unwrap();

        let r = d
            .pool
            .bindings
            .search_binding(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01], Kind::Dynamic, Some(Status::Pending));
        assert!(r.is_some());
    }
}
