//! TLV option codec and the RFC 2132 option catalog.
//!
//! An [`Options`] collection preserves wire insertion order and tolerates
//! duplicate codes (first match wins on lookup, per RFC 2131 §4.1). The
//! catalog ([`catalog_entry`]) is a static table from code to a human name
//! and, where one exists, a CLI value parser; codes the catalog has no
//! parser for are still accepted on the wire, just rejected on `-o`.

use crate::bytes::{BytesIn, BytesOut};
use crate::{Error, OPTIONS_COOKIE, Result};

pub const PAD: u8 = 0;
pub const END: u8 = 255;

pub const SUBNET_MASK: u8 = 1;
pub const TIME_OFFSET: u8 = 2;
pub const ROUTER: u8 = 3;
pub const TIME_SERVER: u8 = 4;
pub const NAME_SERVER: u8 = 5;
pub const DOMAIN_NAME_SERVER: u8 = 6;
pub const LOG_SERVER: u8 = 7;
pub const COOKIE_SERVER: u8 = 8;
pub const LPR_SERVER: u8 = 9;
pub const IMPRESS_SERVER: u8 = 10;
pub const RESOURCE_LOCATION_SERVER: u8 = 11;
pub const HOST_NAME: u8 = 12;
pub const BOOT_FILE_SIZE: u8 = 13;
pub const MERIT_DUMP_FILE: u8 = 14;
pub const DOMAIN_NAME: u8 = 15;
pub const SWAP_SERVER: u8 = 16;
pub const ROOT_PATH: u8 = 17;
pub const EXTENSIONS_PATH: u8 = 18;
pub const IP_FORWARDING: u8 = 19;
pub const NON_LOCAL_SOURCE_ROUTING: u8 = 20;
pub const POLICY_FILTER: u8 = 21;
pub const MAXIMUM_DATAGRAM_REASSEMBLY_SIZE: u8 = 22;
pub const DEFAULT_IP_TIME_TO_LIVE: u8 = 23;
pub const PATH_MTU_AGING_TIMEOUT: u8 = 24;
pub const PATH_MTU_PLATEAU_TABLE: u8 = 25;
pub const INTERFACE_MTU: u8 = 26;
pub const ALL_SUBNETS_ARE_LOCAL: u8 = 27;
pub const BROADCAST_ADDRESS: u8 = 28;
pub const PERFORM_MASK_DISCOVERY: u8 = 29;
pub const MASK_SUPPLIER: u8 = 30;
pub const PERFORM_ROUTER_DISCOVERY: u8 = 31;
pub const ROUTER_SOLICITATION_ADDRESS: u8 = 32;
pub const STATIC_ROUTE: u8 = 33;
pub const TRAILER_ENCAPSULATION: u8 = 34;
pub const ARP_CACHE_TIMEOUT: u8 = 35;
pub const ETHERNET_ENCAPSULATION: u8 = 36;
pub const TCP_DEFAULT_TTL: u8 = 37;
pub const TCP_KEEPALIVE_INTERVAL: u8 = 38;
pub const TCP_KEEPALIVE_GARBAGE: u8 = 39;
pub const NETWORK_INFORMATION_SERVICE_DOMAIN: u8 = 40;
pub const NETWORK_INFORMATION_SERVERS: u8 = 41;
pub const NETWORK_TIME_PROTOCOL_SERVERS: u8 = 42;
pub const VENDOR_SPECIFIC_INFORMATION: u8 = 43;
pub const NETBIOS_OVER_TCP_IP_NAME_SERVER: u8 = 44;
// RFC 2132 assigns this code 45; the C source this server was modeled on
// mistakenly reused 4 (TIME_SERVER). Corrected here.
pub const NETBIOS_OVER_TCP_IP_DATAGRAM_DISTRIBUTION_SERVER: u8 = 45;
pub const NETBIOS_OVER_TCP_IP_NODE_TYPE: u8 = 46;
pub const NETBIOS_OVER_TCP_IP_SCOPE: u8 = 47;
pub const X_WINDOW_SYSTEM_FONT_SERVER: u8 = 48;
pub const X_WINDOW_SYSTEM_DISPLAY_MANAGER: u8 = 49;
pub const REQUESTED_IP_ADDRESS: u8 = 50;
pub const IP_ADDRESS_LEASE_TIME: u8 = 51;
pub const OPTION_OVERLOAD: u8 = 52;
pub const DHCP_MESSAGE_TYPE: u8 = 53;
pub const SERVER_IDENTIFIER: u8 = 54;
pub const PARAMETER_REQUEST_LIST: u8 = 55;
pub const MESSAGE: u8 = 56;
pub const MAXIMUM_DHCP_MESSAGE_SIZE: u8 = 57;
pub const RENEWAL_T1_TIME_VALUE: u8 = 58;
pub const REBINDING_T2_TIME_VALUE: u8 = 59;
pub const VENDOR_CLASS_IDENTIFIER: u8 = 60;
pub const CLIENT_IDENTIFIER: u8 = 61;
pub const NETWORK_INFORMATION_SERVICE_PLUS_DOMAIN: u8 = 64;
pub const NETWORK_INFORMATION_SERVICE_PLUS_SERVERS: u8 = 65;
pub const TFTP_SERVER_NAME: u8 = 66;
pub const BOOTFILE_NAME: u8 = 67;
pub const MOBILE_IP_HOME_AGENT: u8 = 68;
pub const SMTP_SERVER: u8 = 69;
pub const POP3_SERVER: u8 = 70;
pub const NNTP_SERVER: u8 = 71;
pub const DEFAULT_WWW_SERVER: u8 = 72;
pub const DEFAULT_FINGER_SERVER: u8 = 73;
pub const DEFAULT_IRC_SERVER: u8 = 74;
pub const STREETTALK_SERVER: u8 = 75;
pub const STREETTALK_DIRECTORY_ASSISTANCE_SERVER: u8 = 76;

/// Shape of an option's value, used to dispatch CLI text parsing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Byte,
    ByteList,
    Short,
    ShortList,
    Long,
    Str,
    Ip,
    IpList,
}

/// One entry of the option catalog: a human name plus, if the catalog
/// defines one, the CLI value parser for this code.
pub struct CatalogEntry {
    pub name: &'static str,
    pub parser: Option<ValueKind>,
}

macro_rules! catalog {
    ($($code:expr => ($name:expr, $parser:expr)),* $(,)?) => {
        /// Look up a code's catalog entry. Returns `None` for codes RFC 2132
        /// does not define (still legal on the wire, just unnamed).
        pub fn catalog_entry(code: u8) -> Option<CatalogEntry> {
            match code {
                $($code => Some(CatalogEntry { name: $name, parser: $parser }),)*
                _ => None,
            }
        }
    };
}

catalog! {
    SUBNET_MASK => ("SUBNET_MASK", Some(ValueKind::Ip)),
    TIME_OFFSET => ("TIME_OFFSET", Some(ValueKind::Long)),
    ROUTER => ("ROUTER", Some(ValueKind::IpList)),
    TIME_SERVER => ("TIME_SERVER", Some(ValueKind::IpList)),
    NAME_SERVER => ("NAME_SERVER", Some(ValueKind::IpList)),
    DOMAIN_NAME_SERVER => ("DOMAIN_NAME_SERVER", Some(ValueKind::IpList)),
    LOG_SERVER => ("LOG_SERVER", Some(ValueKind::IpList)),
    COOKIE_SERVER => ("COOKIE_SERVER", Some(ValueKind::IpList)),
    LPR_SERVER => ("LPR_SERVER", Some(ValueKind::IpList)),
    IMPRESS_SERVER => ("IMPRESS_SERVER", Some(ValueKind::IpList)),
    RESOURCE_LOCATION_SERVER => ("RESOURCE_LOCATION_SERVER", Some(ValueKind::IpList)),
    HOST_NAME => ("HOST_NAME", Some(ValueKind::Str)),
    BOOT_FILE_SIZE => ("BOOT_FILE_SIZE", Some(ValueKind::Short)),
    MERIT_DUMP_FILE => ("MERIT_DUMP_FILE", Some(ValueKind::Str)),
    DOMAIN_NAME => ("DOMAIN_NAME", Some(ValueKind::Str)),
    SWAP_SERVER => ("SWAP_SERVER", Some(ValueKind::Ip)),
    ROOT_PATH => ("ROOT_PATH", Some(ValueKind::Str)),
    EXTENSIONS_PATH => ("EXTENSIONS_PATH", Some(ValueKind::Str)),
    IP_FORWARDING => ("IP_FORWARDING", Some(ValueKind::Byte)),
    NON_LOCAL_SOURCE_ROUTING => ("NON_LOCAL_SOURCE_ROUTING", Some(ValueKind::Byte)),
    POLICY_FILTER => ("POLICY_FILTER", Some(ValueKind::IpList)),
    MAXIMUM_DATAGRAM_REASSEMBLY_SIZE => ("MAXIMUM_DATAGRAM_REASSEMBLY_SIZE", Some(ValueKind::Short)),
    DEFAULT_IP_TIME_TO_LIVE => ("DEFAULT_IP_TIME_TO_LIVE", Some(ValueKind::Byte)),
    PATH_MTU_AGING_TIMEOUT => ("PATH_MTU_AGING_TIMEOUT", Some(ValueKind::Long)),
    PATH_MTU_PLATEAU_TABLE => ("PATH_MTU_PLATEAU_TABLE", Some(ValueKind::ShortList)),
    INTERFACE_MTU => ("INTERFACE_MTU", Some(ValueKind::Short)),
    ALL_SUBNETS_ARE_LOCAL => ("ALL_SUBNETS_ARE_LOCAL", Some(ValueKind::Byte)),
    BROADCAST_ADDRESS => ("BROADCAST_ADDRESS", Some(ValueKind::Ip)),
    PERFORM_MASK_DISCOVERY => ("PERFORM_MASK_DISCOVERY", Some(ValueKind::Byte)),
    MASK_SUPPLIER => ("MASK_SUPPLIER", Some(ValueKind::Byte)),
    PERFORM_ROUTER_DISCOVERY => ("PERFORM_ROUTER_DISCOVERY", Some(ValueKind::Byte)),
    ROUTER_SOLICITATION_ADDRESS => ("ROUTER_SOLICITATION_ADDRESS", Some(ValueKind::Ip)),
    STATIC_ROUTE => ("STATIC_ROUTE", Some(ValueKind::IpList)),
    TRAILER_ENCAPSULATION => ("TRAILER_ENCAPSULATION", Some(ValueKind::Byte)),
    ARP_CACHE_TIMEOUT => ("ARP_CACHE_TIMEOUT", Some(ValueKind::Long)),
    ETHERNET_ENCAPSULATION => ("ETHERNET_ENCAPSULATION", Some(ValueKind::Byte)),
    TCP_DEFAULT_TTL => ("TCP_DEFAULT_TTL", Some(ValueKind::Byte)),
    TCP_KEEPALIVE_INTERVAL => ("TCP_KEEPALIVE_INTERVAL", Some(ValueKind::Long)),
    TCP_KEEPALIVE_GARBAGE => ("TCP_KEEPALIVE_GARBAGE", Some(ValueKind::Byte)),
    NETWORK_INFORMATION_SERVICE_DOMAIN => ("NETWORK_INFORMATION_SERVICE_DOMAIN", Some(ValueKind::Str)),
    NETWORK_INFORMATION_SERVERS => ("NETWORK_INFORMATION_SERVERS", Some(ValueKind::IpList)),
    NETWORK_TIME_PROTOCOL_SERVERS => ("NETWORK_TIME_PROTOCOL_SERVERS", Some(ValueKind::IpList)),
    VENDOR_SPECIFIC_INFORMATION => ("VENDOR_SPECIFIC_INFORMATION", Some(ValueKind::ByteList)),
    NETBIOS_OVER_TCP_IP_NAME_SERVER => ("NETBIOS_OVER_TCP_IP_NAME_SERVER", Some(ValueKind::IpList)),
    NETBIOS_OVER_TCP_IP_DATAGRAM_DISTRIBUTION_SERVER => ("NETBIOS_OVER_TCP_IP_DATAGRAM_DISTRIBUTION_SERVER", Some(ValueKind::IpList)),
    NETBIOS_OVER_TCP_IP_NODE_TYPE => ("NETBIOS_OVER_TCP_IP_NODE_TYPE", Some(ValueKind::Byte)),
    NETBIOS_OVER_TCP_IP_SCOPE => ("NETBIOS_OVER_TCP_IP_SCOPE", Some(ValueKind::Str)),
    X_WINDOW_SYSTEM_FONT_SERVER => ("X_WINDOW_SYSTEM_FONT_SERVER", Some(ValueKind::IpList)),
    X_WINDOW_SYSTEM_DISPLAY_MANAGER => ("X_WINDOW_SYSTEM_DISPLAY_MANAGER", Some(ValueKind::IpList)),
    NETWORK_INFORMATION_SERVICE_PLUS_DOMAIN => ("NETWORK_INFORMATION_SERVICE_PLUS_DOMAIN", Some(ValueKind::Str)),
    NETWORK_INFORMATION_SERVICE_PLUS_SERVERS => ("NETWORK_INFORMATION_SERVICE_PLUS_SERVERS", Some(ValueKind::IpList)),
    MOBILE_IP_HOME_AGENT => ("MOBILE_IP_HOME_AGENT", Some(ValueKind::IpList)),
    SMTP_SERVER => ("SMTP_SERVER", Some(ValueKind::IpList)),
    POP3_SERVER => ("POP3_SERVER", Some(ValueKind::IpList)),
    NNTP_SERVER => ("NNTP_SERVER", Some(ValueKind::IpList)),
    DEFAULT_WWW_SERVER => ("DEFAULT_WWW_SERVER", Some(ValueKind::IpList)),
    DEFAULT_FINGER_SERVER => ("DEFAULT_FINGER_SERVER", Some(ValueKind::IpList)),
    DEFAULT_IRC_SERVER => ("DEFAULT_IRC_SERVER", Some(ValueKind::IpList)),
    STREETTALK_SERVER => ("STREETTALK_SERVER", Some(ValueKind::IpList)),
    STREETTALK_DIRECTORY_ASSISTANCE_SERVER => ("STREETTALK_DIRECTORY_ASSISTANCE_SERVER", Some(ValueKind::IpList)),
    REQUESTED_IP_ADDRESS => ("REQUESTED_IP_ADDRESS", None),
    IP_ADDRESS_LEASE_TIME => ("IP_ADDRESS_LEASE_TIME", Some(ValueKind::Long)),
    OPTION_OVERLOAD => ("OPTION_OVERLOAD", Some(ValueKind::Byte)),
    TFTP_SERVER_NAME => ("TFTP_SERVER_NAME", Some(ValueKind::Str)),
    BOOTFILE_NAME => ("BOOTFILE_NAME", Some(ValueKind::Str)),
    DHCP_MESSAGE_TYPE => ("DHCP_MESSAGE_TYPE", None),
    SERVER_IDENTIFIER => ("SERVER_IDENTIFIER", Some(ValueKind::Ip)),
    PARAMETER_REQUEST_LIST => ("PARAMETER_REQUEST_LIST", None),
    MESSAGE => ("MESSAGE", None),
    MAXIMUM_DHCP_MESSAGE_SIZE => ("MAXIMUM_DHCP_MESSAGE_SIZE", None),
    RENEWAL_T1_TIME_VALUE => ("RENEWAL_T1_TIME_VALUE", Some(ValueKind::Long)),
    REBINDING_T2_TIME_VALUE => ("REBINDING_T2_TIME_VALUE", Some(ValueKind::Long)),
    VENDOR_CLASS_IDENTIFIER => ("VENDOR_CLASS_IDENTIFIER", None),
    CLIENT_IDENTIFIER => ("CLIENT_IDENTIFIER", None),
}

/// A single parsed option: its code and raw value bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawOption {
    pub code: u8,
    pub data: Vec<u8>,
}

impl RawOption {
    pub fn new(code: u8, data: Vec<u8>) -> Self {
        Self { code, data }
    }
}

/// An ordered option collection, preserving wire order and duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Options(Vec<RawOption>);

impl Options {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn iter(&self) -> impl Iterator<Item = &RawOption> {
        self.0.iter()
    }

    pub fn push(&mut self, code: u8, data: Vec<u8>) -> &mut Self {
        self.0.push(RawOption::new(code, data));
        self
    }

    /// First option matching `code`, if any.
    pub fn get(&self, code: u8) -> Option<&RawOption> {
        self.0.iter().find(|o| o.code == code)
    }

    pub fn get_byte(&self, code: u8) -> Option<u8> {
        self.get(code).and_then(|o| o.data.first().copied())
    }

    pub fn get_ip(&self, code: u8) -> Option<u32> {
        self.get(code).and_then(|o| {
            let arr: [u8; 4] = o.data.clone().try_into().ok()?;
            Some(u32::from_be_bytes(arr))
        })
    }

    pub fn get_bytes(&self, code: u8) -> Option<&[u8]> {
        self.get(code).map(|o| o.data.as_slice())
    }

    /// Parse the options area of a DHCP datagram: magic cookie, then a TLV
    /// stream terminated by END. PAD bytes between options are skipped.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let mut r = BytesIn::new(data);

        let cookie: [u8; 4] = r.arr()?;
        if cookie != OPTIONS_COOKIE {
            return Err(Error::MissingCookie);
        }

        let mut options = Options::new();

        loop {
            if r.is_empty() {
                return Err(Error::MalformedMessage("options area missing END marker"));
            }

            let code = r.byte()?;

            if code == END {
                break;
            }
            if code == PAD {
                continue;
            }

            let len = r.byte()? as usize;
            let data = r.slice(len)?.to_vec();

            options.push(code, data);
        }

        Ok(options)
    }

    /// Serialize into `buf`: magic cookie, TLV-encoded options, END marker.
    /// Returns the number of bytes written.
    pub fn encode(&self, buf: &mut [u8]) -> Result<usize> {
        let mut w = BytesOut::new(buf);

        w.push(&OPTIONS_COOKIE)?;

        for option in &self.0 {
            if option.data.len() > u8::MAX as usize {
                return Err(Error::BufferOverflow);
            }
            w.byte(option.code)?;
            w.byte(option.data.len() as u8)?;
            w.push(&option.data)?;
        }

        w.byte(END)?;

        Ok(w.len())
    }
}

/// Parse a CLI textual value for `code` into its wire-format byte string,
/// per the catalog's declared [`ValueKind`].
pub fn parse_value(code: u8, text: &str) -> Result<Vec<u8>> {
    let entry = catalog_entry(code).ok_or_else(|| {
        Error::Configuration(format!("option code {code} is not a recognized DHCP option"))
    })?;
    let kind = entry.parser.ok_or_else(|| {
        Error::Configuration(format!(
            "option {} (code {code}) has no configurable value parser",
            entry.name
        ))
    })?;

    let bad = || Error::Configuration(format!("invalid value {text:?} for option {}", entry.name));

    let value = match kind {
        ValueKind::Byte => {
            let n: u8 = parse_num(text).map_err(|_| bad())?;
            Ok(vec![n])
        }
        ValueKind::ByteList => text
            .split([',', ' '])
            .filter(|s| !s.is_empty())
            .map(|s| parse_num::<u8>(s).map_err(|_| bad()))
            .collect(),
        ValueKind::Short => {
            let n: u16 = parse_num(text).map_err(|_| bad())?;
            Ok(n.to_be_bytes().to_vec())
        }
        ValueKind::ShortList => {
            let mut out = Vec::new();
            for s in text.split([',', ' ']).filter(|s| !s.is_empty()) {
                let n: u16 = parse_num(s).map_err(|_| bad())?;
                out.extend_from_slice(&n.to_be_bytes());
            }
            Ok(out)
        }
        ValueKind::Long => {
            let n: u32 = parse_num(text).map_err(|_| bad())?;
            Ok(n.to_be_bytes().to_vec())
        }
        ValueKind::Str => Ok(text.as_bytes().to_vec()),
        ValueKind::Ip => {
            let addr: std::net::Ipv4Addr = text.parse().map_err(|_| bad())?;
            Ok(addr.octets().to_vec())
        }
        ValueKind::IpList => {
            let mut out = Vec::new();
            for s in text.split([',', ' ']).filter(|s| !s.is_empty()) {
                let addr: std::net::Ipv4Addr = s.parse().map_err(|_| bad())?;
                out.extend_from_slice(&addr.octets());
            }
            Ok(out)
        }
    }?;

    if value.len() > u8::MAX as usize {
        return Err(Error::Configuration(format!(
            "value for option {} (code {code}) is {} bytes, longer than the 255-byte TLV length field allows",
            entry.name,
            value.len()
        )));
    }

    Ok(value)
}

fn parse_num<T: std::str::FromStr>(text: &str) -> std::result::Result<T, ()> {
    text.trim().parse().map_err(|_| ())
}
