//! One function per inbound DHCP message type. Each handler mutates the
//! binding store and returns either a reply to transmit or `None` ("do not
//! transmit" — the sentinel return value the source used, reshaped as an
//! `Option` here).

use std::time::SystemTime;

use crate::binding::{Kind, Status};
use crate::message::{Message, MessageType};
use crate::options;
use crate::pool::Pool;

fn hex_mac(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect::<Vec<_>>()
        .join(":")
}

/// Common reply construction shared by every handler but `serve_decline`/
/// `serve_release`, which never reply.
///
/// The lease-time option always reflects the pool's configured lease
/// duration, never a binding's own (possibly much shorter) pending timer —
/// a client in PENDING still advertises the lease length it would get at
/// ACK.
fn fill_reply(
    request: &Message,
    pool: &Pool,
    binding: Option<&crate::binding::Binding>,
    msg_type: MessageType,
) -> Message {
    let mut reply = request.init_reply();

    reply
        .options
        .push(options::DHCP_MESSAGE_TYPE, vec![msg_type.into()]);
    reply
        .options
        .push(options::SERVER_IDENTIFIER, pool.server_id.to_be_bytes().to_vec());

    if let Some(binding) = binding {
        reply.yiaddr = binding.address;
    }

    if msg_type != MessageType::Nak {
        reply.options.push(
            options::IP_ADDRESS_LEASE_TIME,
            (pool.lease_time.as_secs() as u32).to_be_bytes().to_vec(),
        );

        if let Some(requested) = request.options.get_bytes(options::PARAMETER_REQUEST_LIST) {
            for &code in requested {
                if let Some(opt) = pool.default_options.get(code) {
                    reply.options.push(opt.code, opt.data.clone());
                }
            }
        }
    }

    reply
}

/// §4.3 `serve_discover`: static binding for this client, else a prior
/// dynamic lease, else a fresh allocation. Always transitions the chosen
/// binding to PENDING and offers it.
pub fn serve_discover(request: &Message, pool: &mut Pool, now: SystemTime) -> Option<Message> {
    let cid = request.client_id();

    let chosen = if let Some(r) = pool
        .bindings
        .search_binding(&cid, Kind::Static, Some(Status::Empty))
    {
        Some(r)
    } else if let Some(r) = pool
        .bindings
        .search_binding(&cid, Kind::Dynamic, Some(Status::Empty))
    {
        Some(r)
    } else {
        let requested = request.options.get_ip(options::REQUESTED_IP_ADDRESS).unwrap_or(0);
        pool.bindings
            .new_dynamic_binding(&mut pool.indexes, requested, &cid)
    };

    let r = match chosen {
        Some(r) => r,
        None => {
            log::warn!(
                "{}: {}",
                hex_mac(&cid),
                crate::Error::PoolExhausted
            );
            return None;
        }
    };
    let pending_time = pool.pending_time;
    let b = pool.bindings.get_mut(r);
    b.status = Status::Pending;
    b.binding_time = now;
    b.lease_time = pending_time;

    let binding = pool.bindings.get(r).clone();
    Some(fill_reply(request, pool, Some(&binding), MessageType::Offer))
}

/// §4.3 `serve_request`. Acks a binding PENDING under our server id, NAKs
/// an unmatched request for us, frees a binding the client chose another
/// server for, and leaves renewal (no server identifier at all) as a
/// documented no-reply gap.
pub fn serve_request(request: &Message, pool: &mut Pool, _now: SystemTime) -> Option<Message> {
    let cid = request.client_id();

    let b = pool
        .bindings
        .search_binding(&cid, Kind::StaticOrDynamic, Some(Status::Pending));

    let server_id = request.options.get_ip(options::SERVER_IDENTIFIER).unwrap_or(0);

    if server_id == pool.server_id {
        if let Some(r) = b {
            let lease_time = pool.lease_time;
            let binding = pool.bindings.get_mut(r);
            binding.status = Status::Associated;
            binding.lease_time = lease_time;
            let binding = pool.bindings.get(r).clone();
            return Some(fill_reply(request, pool, Some(&binding), MessageType::Ack));
        }
        return Some(fill_reply(request, pool, None, MessageType::Nak));
    }

    if server_id != 0 {
        if let Some(r) = b {
            let binding = pool.bindings.get_mut(r);
            binding.status = Status::Empty;
            binding.lease_time = std::time::Duration::ZERO;
        }
        return None;
    }

    // Renewal/rebind (no server identifier at all): unimplemented, no reply.
    None
}

/// §4.3 `serve_decline`: any PENDING binding for this client reverts to
/// EMPTY. Never replies.
pub fn serve_decline(request: &Message, pool: &mut Pool, _now: SystemTime) -> Option<Message> {
    let cid = request.client_id();
    if let Some(r) = pool
        .bindings
        .search_binding(&cid, Kind::StaticOrDynamic, Some(Status::Pending))
    {
        pool.bindings.get_mut(r).status = Status::Empty;
    }
    None
}

/// §4.3 `serve_release`: any ASSOCIATED binding for this client moves to
/// RELEASED, freeing its address for reuse. Never replies.
pub fn serve_release(request: &Message, pool: &mut Pool, _now: SystemTime) -> Option<Message> {
    let cid = request.client_id();
    if let Some(r) = pool
        .bindings
        .search_binding(&cid, Kind::StaticOrDynamic, Some(Status::Associated))
    {
        pool.bindings.get_mut(r).status = Status::Released;
    }
    None
}

/// §4.3 `serve_inform`: an ACK carrying only the pool's configured
/// options; no address is assigned.
pub fn serve_inform(request: &Message, pool: &mut Pool, _now: SystemTime) -> Option<Message> {
    Some(fill_reply(request, pool, None, MessageType::Ack))
}
