//! The fixed 236-byte DHCP header plus the options area that follows it.

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::bytes::{BytesIn, BytesOut};
use crate::options::{self, Options};
use crate::{Error, Result, DHCP_HEADER_SIZE};

pub const BOOTREQUEST: u8 = 1;
pub const BOOTREPLY: u8 = 2;

/// The DHCP_MESSAGE_TYPE option value (RFC 2131 §3, table on page 10).
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum MessageType {
    Discover = 1,
    Offer = 2,
    Request = 3,
    Decline = 4,
    Ack = 5,
    Nak = 6,
    Release = 7,
    Inform = 8,
}

/// A parsed (or about-to-be-serialized) DHCP message: header fields plus
/// the option collection from its options area.
#[derive(Debug, Clone)]
pub struct Message {
    pub op: u8,
    pub htype: u8,
    pub hlen: u8,
    pub hops: u8,
    pub xid: u32,
    pub secs: u16,
    pub flags: u16,
    pub ciaddr: u32,
    pub yiaddr: u32,
    pub siaddr: u32,
    pub giaddr: u32,
    pub chaddr: [u8; 16],
    pub options: Options,
}

impl Message {
    /// Parse a datagram: fixed header, then the options area via
    /// [`Options::decode`]. Validates `hlen ∈ 1..=16` (RFC 2131 §2).
    pub fn decode(data: &[u8]) -> Result<Self> {
        if data.len() < DHCP_HEADER_SIZE {
            return Err(Error::DataUnderflow);
        }

        let mut r = BytesIn::new(&data[..DHCP_HEADER_SIZE]);

        let op = r.byte()?;
        let htype = r.byte()?;
        let hlen = r.byte()?;
        if !(1..=16).contains(&hlen) {
            return Err(Error::InvalidHlen(hlen));
        }
        let hops = r.byte()?;
        let xid = u32::from_be_bytes(r.arr()?);
        let secs = u16::from_be_bytes(r.arr()?);
        let flags = u16::from_be_bytes(r.arr()?);
        let ciaddr = u32::from_be_bytes(r.arr()?);
        let yiaddr = u32::from_be_bytes(r.arr()?);
        let siaddr = u32::from_be_bytes(r.arr()?);
        let giaddr = u32::from_be_bytes(r.arr()?);
        let chaddr = r.arr()?;
        let _sname: [u8; 64] = r.arr()?;
        let _file: [u8; 128] = r.arr()?;

        let options = Options::decode(&data[DHCP_HEADER_SIZE..])?;

        Ok(Self {
            op,
            htype,
            hlen,
            hops,
            xid,
            secs,
            flags,
            ciaddr,
            yiaddr,
            siaddr,
            giaddr,
            chaddr,
            options,
        })
    }

    /// Serialize header then options area into `buf`. Returns total bytes
    /// written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        if buf.len() < DHCP_HEADER_SIZE {
            return Err(Error::BufferOverflow);
        }

        {
            let mut w = BytesOut::new(&mut buf[..DHCP_HEADER_SIZE]);
            w.byte(self.op)?;
            w.byte(self.htype)?;
            w.byte(self.hlen)?;
            w.byte(self.hops)?;
            w.push(&self.xid.to_be_bytes())?;
            w.push(&self.secs.to_be_bytes())?;
            w.push(&self.flags.to_be_bytes())?;
            w.push(&self.ciaddr.to_be_bytes())?;
            w.push(&self.yiaddr.to_be_bytes())?;
            w.push(&self.siaddr.to_be_bytes())?;
            w.push(&self.giaddr.to_be_bytes())?;
            w.push(&self.chaddr)?;
            w.push(&[0u8; 64])?; // sname
            w.push(&[0u8; 128])?; // file
        }

        let n = self.options.encode(&mut buf[DHCP_HEADER_SIZE..])?;
        Ok(DHCP_HEADER_SIZE + n)
    }

    /// A zeroed reply header seeded from this request, per RFC 2131 §4.1:
    /// `op=BOOTREPLY`, `htype`/`hlen`/`xid`/`flags`/`giaddr`/`chaddr` copied,
    /// everything else left for the handler to fill in.
    pub fn init_reply(&self) -> Self {
        Self {
            op: BOOTREPLY,
            htype: self.htype,
            hlen: self.hlen,
            hops: 0,
            xid: self.xid,
            secs: 0,
            flags: self.flags,
            ciaddr: 0,
            yiaddr: 0,
            siaddr: 0,
            giaddr: self.giaddr,
            chaddr: self.chaddr,
            options: Options::new(),
        }
    }

    /// The DHCP_MESSAGE_TYPE option value, if present and recognized.
    pub fn message_type(&self) -> Option<MessageType> {
        self.options
            .get_byte(options::DHCP_MESSAGE_TYPE)
            .and_then(|b| MessageType::try_from(b).ok())
    }

    /// The client identifier the binding store keys on: the Client
    /// Identifier option (61) if present, else `chaddr[0..hlen]`.
    pub fn client_id(&self) -> Vec<u8> {
        if let Some(data) = self.options.get_bytes(options::CLIENT_IDENTIFIER) {
            data.to_vec()
        } else {
            self.chaddr[..self.hlen as usize].to_vec()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bytes() -> Vec<u8> {
        let mut opts = Options::new();
        opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Discover.into()]);

        let msg = Message {
            op: BOOTREQUEST,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 0x1234_5678,
            secs: 0,
            flags: 0,
            ciaddr: 0,
            yiaddr: 0,
            siaddr: 0,
            giaddr: 0,
            chaddr: {
                let mut c = [0u8; 16];
                c[..6].copy_from_slice(&[0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
                c
            },
            options: opts,
        };

        let mut buf = [0u8; 600];
        let n = msg.encode(&mut buf).unwrap();
        buf[..n].to_vec()
    }

    #[test]
    fn round_trips_header_and_options() {
        let bytes = sample_bytes();
        let msg = Message::decode(&bytes).unwrap();
        assert_eq!(msg.op, BOOTREQUEST);
        assert_eq!(msg.xid, 0x1234_5678);
        assert_eq!(msg.hlen, 6);
        assert_eq!(msg.message_type(), Some(MessageType::Discover));
        assert_eq!(msg.client_id(), vec![0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01]);
    }

    #[test]
    fn rejects_short_datagram() {
        let bytes = sample_bytes();
        assert!(Message::decode(&bytes[..DHCP_HEADER_SIZE + 4]).is_err());
    }

    #[test]
    fn rejects_invalid_hlen() {
        let mut bytes = sample_bytes();
        bytes[2] = 17;
        assert!(matches!(Message::decode(&bytes), Err(Error::InvalidHlen(17))));
        bytes[2] = 0;
        assert!(matches!(Message::decode(&bytes), Err(Error::InvalidHlen(0))));
    }

    #[test]
    fn init_reply_copies_framing_fields() {
        let bytes = sample_bytes();
        let req = Message::decode(&bytes).unwrap();
        let reply = req.init_reply();
        assert_eq!(reply.op, BOOTREPLY);
        assert_eq!(reply.xid, req.xid);
        assert_eq!(reply.hlen, req.hlen);
        assert_eq!(reply.chaddr, req.chaddr);
        assert_eq!(reply.yiaddr, 0);
    }

    #[test]
    fn prefers_client_identifier_over_chaddr() {
        let mut opts = Options::new();
        opts.push(options::DHCP_MESSAGE_TYPE, vec![MessageType::Discover.into()]);
        opts.push(options::CLIENT_IDENTIFIER, vec![1, 2, 3, 4]);

        let msg = Message {
            op: BOOTREQUEST,
            htype: 1,
            hlen: 6,
            hops: 0,
            xid: 1,
            secs: 0,
            flags: 0,
            ciaddr: 0,
            yiaddr: 0,
            siaddr: 0,
            giaddr: 0,
            chaddr: [0xaa; 16],
            options: opts,
        };

        assert_eq!(msg.client_id(), vec![1, 2, 3, 4]);
    }
}
