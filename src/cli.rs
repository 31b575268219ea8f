//! Command-line argument parsing: populates a [`Pool`] before the
//! dispatcher starts. An external collaborator per the component design —
//! narrow surface, no protocol logic.

use std::net::Ipv4Addr;
use std::time::Duration;

use clap::Parser;

use crate::options;
use crate::pool::{Pool, PoolIndexes};
use crate::{Error, Result};

/// A standalone DHCPv4 server.
#[derive(Debug, Parser)]
#[command(name = "dhcpd", version, about)]
pub struct Args {
    /// Dynamic pool range, "first,last".
    #[arg(short = 'a', long = "addresses", value_name = "FIRST,LAST")]
    pub addresses: String,

    /// Interface the server listens and installs proxy-ARP entries on.
    #[arg(short = 'd', long = "device")]
    pub device: String,

    /// Default lease duration in seconds.
    #[arg(short = 'l', long = "lease-time", default_value_t = 3600)]
    pub lease_time: u64,

    /// Maximum lease duration in seconds a client may request. Accepted
    /// for configuration completeness; not yet enforced by any handler.
    #[arg(short = 'm', long = "max-lease-time", default_value_t = 86400)]
    pub max_lease_time: u64,

    /// A default option offered to clients, "NAME,VALUE". Repeatable.
    #[arg(short = 'o', long = "option", value_name = "NAME,VALUE")]
    pub options: Vec<String>,

    /// How long an OFFER stays PENDING before lazily expiring.
    #[arg(short = 'p', long = "pending-time", default_value_t = 30)]
    pub pending_time: u64,

    /// A static binding, "MAC,IP". Repeatable.
    #[arg(short = 's', long = "static", value_name = "MAC,IP")]
    pub statics: Vec<String>,

    /// Increase log verbosity; repeatable.
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// The server's own identifying address (also the gateway, absent
    /// relay-agent support).
    pub server: String,
}

/// Parses `-a`, `-s`, and `-o` payloads and assembles a [`Pool`]. Errors
/// here are startup configuration errors (§7): print usage, exit 1.
pub fn build_pool(args: &Args) -> Result<Pool> {
    let server_id = parse_ip(&args.server)?;

    let (first, last) = args
        .addresses
        .split_once(',')
        .ok_or_else(|| Error::Configuration("-a expects FIRST,LAST".into()))?;
    let first = parse_ip(first)?;
    let last = parse_ip(last)?;
    if first > last {
        return Err(Error::Configuration("-a range has first > last".into()));
    }

    let mut pool = Pool::new(
        server_id,
        0,
        server_id,
        args.device.clone(),
        PoolIndexes::new(first, last),
        Duration::from_secs(args.lease_time),
        Duration::from_secs(args.pending_time),
    );

    for spec in &args.options {
        let (name, value) = spec
            .split_once(',')
            .ok_or_else(|| Error::Configuration(format!("-o {spec:?} expects NAME,VALUE")))?;
        let code = code_for_name(name)?;
        let data = options::parse_value(code, value)?;
        pool.default_options.push(code, data);
    }

    for spec in &args.statics {
        let (mac, ip) = spec
            .split_once(',')
            .ok_or_else(|| Error::Configuration(format!("-s {spec:?} expects MAC,IP")))?;
        let mac = parse_mac(mac)?;
        let ip = parse_ip(ip)?;
        pool.bindings
            .add_binding(ip, mac.to_vec(), true, crate::binding::Status::Empty);
    }

    Ok(pool)
}

fn parse_ip(text: &str) -> Result<u32> {
    text.trim()
        .parse::<Ipv4Addr>()
        .map(u32::from)
        .map_err(|_| Error::Configuration(format!("{text:?} is not a valid IPv4 address")))
}

fn parse_mac(text: &str) -> Result<[u8; 6]> {
    let mut mac = [0u8; 6];
    let mut parts = text.trim().split(':');
    for slot in &mut mac {
        let part = parts
            .next()
            .ok_or_else(|| Error::Configuration(format!("{text:?} is not a valid MAC address")))?;
        *slot = u8::from_str_radix(part, 16)
            .map_err(|_| Error::Configuration(format!("{text:?} is not a valid MAC address")))?;
    }
    if parts.next().is_some() {
        return Err(Error::Configuration(format!("{text:?} is not a valid MAC address")));
    }
    Ok(mac)
}

fn code_for_name(name: &str) -> Result<u8> {
    (0..=254)
        .find(|&code| {
            options::catalog_entry(code)
                .map(|e| e.name.eq_ignore_ascii_case(name))
                .unwrap_or(false)
        })
        .ok_or_else(|| Error::Configuration(format!("unrecognized option name {name:?}")))
}
