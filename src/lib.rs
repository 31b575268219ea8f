//! A standalone DHCPv4 server.
//!
//! This crate implements the wire format and lease-negotiation semantics of
//! RFC 2131, and the option catalog of RFC 2132: a message codec
//! ([`message`]), an option TLV codec and catalog ([`options`]), an in-memory
//! binding database ([`binding`]), the pool/configuration record
//! ([`pool`]), the per-message-type handlers ([`handlers`]) and the
//! single-threaded dispatcher loop that ties them together ([`dispatch`]).
//!
//! The server is single-interface, single-subnet, single-threaded and
//! in-memory: there is no persistence across restarts, no relay-agent
//! support and no failover between cooperating servers.

mod bytes;

pub mod arp;
pub mod binding;
pub mod cli;
pub mod dispatch;
pub mod handlers;
pub mod message;
pub mod options;
pub mod pool;

/// Size in bytes of the fixed DHCP header, before the options area.
pub const DHCP_HEADER_SIZE: usize = 236;

/// The 4-byte magic cookie that opens the options area of every DHCP packet.
pub const OPTIONS_COOKIE: [u8; 4] = [0x63, 0x82, 0x53, 0x63];

/// Minimum acceptable datagram size: a full header plus the magic cookie plus
/// at least one options byte (the END marker).
pub const MIN_DATAGRAM_SIZE: usize = DHCP_HEADER_SIZE + OPTIONS_COOKIE.len() + 1;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("datagram too short to be a DHCP message")]
    DataUnderflow,
    #[error("missing or invalid options magic cookie")]
    MissingCookie,
    #[error("hlen must be in 1..=16, got {0}")]
    InvalidHlen(u8),
    #[error("destination buffer too small to hold the encoded message")]
    BufferOverflow,
    #[error("malformed DHCP message: {0}")]
    MalformedMessage(&'static str),
    #[error("dynamic address pool exhausted")]
    PoolExhausted,
    #[error("no handler for this DHCP message type")]
    UnknownMessageType,
    #[error("failed to update the proxy-ARP table: {0}")]
    ArpFailure(#[source] std::io::Error),
    #[error("transport error: {0}")]
    TransportFailure(#[from] std::io::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = core::result::Result<T, Error>;
