//! MP_JOIN: subflow handshakes and their HMAC authentication.
//!
//! Four atomic events per direction pair: SYN (create the subflow),
//! SYN/ACK (exchange random numbers, truncated HMAC), ACK (full 160-bit
//! HMAC). The 16-byte HMAC key concatenates the two session keys and the
//! 8-byte message the two random numbers; the sending side's material
//! goes in front, so the orderings mirror between directions.

use tracing::debug;

use crate::crypto::{hmac_key, hmac_msg, hmac_sha1, hmac_sha1_trunc_64, sha1_least_32};
use crate::error::{EngineError, Result};
use crate::hints::{JoinScript, TokenSpec};
use crate::options::{MpJoin, MptcpOption};
use crate::packet::{Direction, Packet, PacketMeta};
use crate::session::Session;

pub(crate) fn process(
    session: &mut Session,
    option: &mut MpJoin,
    meta: &PacketMeta,
    live: Option<&Packet>,
    direction: Direction,
) -> Result<()> {
    // Every scripted MP_JOIN mention reserved one hint slot.
    let script = session.hints.pop_join()?;
    match (option, direction, meta.syn, meta.ack) {
        (
            MpJoin::Syn {
                address_id,
                receiver_token,
                sender_rand,
                ..
            },
            Direction::Inbound,
            true,
            false,
        ) => syn_inbound(
            session,
            &script,
            meta,
            address_id,
            receiver_token,
            sender_rand,
        ),
        (
            MpJoin::Syn {
                address_id,
                receiver_token,
                sender_rand,
                ..
            },
            Direction::Outbound,
            true,
            false,
        ) => syn_outbound(
            session,
            &script,
            meta,
            live,
            address_id,
            receiver_token,
            sender_rand,
        ),
        (
            MpJoin::SynAck {
                address_id,
                sender_hmac,
                sender_rand,
                ..
            },
            Direction::Inbound,
            true,
            true,
        ) => syn_ack_inbound(
            session,
            &script,
            meta,
            address_id,
            sender_hmac,
            sender_rand,
        ),
        (
            MpJoin::SynAck {
                address_id,
                sender_hmac,
                sender_rand,
                ..
            },
            Direction::Outbound,
            true,
            true,
        ) => syn_ack_outbound(session, meta, live, address_id, sender_hmac, sender_rand),
        (MpJoin::Ack { sender_hmac }, _, false, true) => {
            ack(session, meta, direction, sender_hmac)
        }
        _ => Err(EngineError::ScriptProtocolViolation(
            "MP_JOIN option does not match the packet's SYN/ACK flags",
        )),
    }
}

/// Receiver token for a SYN, derived from the key of the side being
/// addressed unless the script pinned it.
fn syn_token(session: &Session, script: &JoinScript, direction: Direction) -> Result<u32> {
    match &script.token {
        TokenSpec::Literal(token) => Ok(*token),
        TokenSpec::Keys { first, .. } => Ok(sha1_least_32(session.var_key(first)?)),
        TokenSpec::Auto => match direction {
            Direction::Inbound => Ok(sha1_least_32(session.require_kernel_key()?)),
            Direction::Outbound => Ok(sha1_least_32(session.require_harness_key()?)),
        },
    }
}

fn syn_inbound(
    session: &mut Session,
    script: &JoinScript,
    meta: &PacketMeta,
    address_id: &mut u8,
    receiver_token: &mut u32,
    sender_rand: &mut u32,
) -> Result<()> {
    let token = syn_token(session, script, Direction::Inbound)?;
    let id = session.new_subflow_inbound(meta)?;
    {
        let flow = session.subflows.get_mut(id);
        if let Some(rand) = script.rand {
            flow.harness_rand = rand;
        }
        if let Some(addr) = script.address_id {
            flow.harness_addr_id = addr;
        }
    }
    let flow = session.subflows.get(id);
    *receiver_token = token;
    *sender_rand = flow.harness_rand;
    *address_id = flow.harness_addr_id;
    debug!(
        token,
        address_id = flow.harness_addr_id,
        "MP_JOIN SYN prepared"
    );
    Ok(())
}

fn syn_outbound(
    session: &mut Session,
    script: &JoinScript,
    meta: &PacketMeta,
    live: Option<&Packet>,
    address_id: &mut u8,
    receiver_token: &mut u32,
    sender_rand: &mut u32,
) -> Result<()> {
    let live = live.ok_or(EngineError::ScriptProtocolViolation(
        "captured packet required for outbound MP_JOIN",
    ))?;
    let (live_addr_id, live_rand) = match live.mptcp_option() {
        Some(MptcpOption::Join(MpJoin::Syn {
            address_id,
            sender_rand,
            ..
        })) => (*address_id, *sender_rand),
        _ => {
            return Err(EngineError::ScriptProtocolViolation(
                "captured packet has no MP_JOIN SYN option",
            ))
        }
    };
    let token = syn_token(session, script, Direction::Outbound)?;
    let id = session.new_subflow_outbound(meta, live_addr_id, live_rand)?;
    {
        let flow = session.subflows.get_mut(id);
        if let Some(rand) = script.rand {
            flow.kernel_rand = rand;
        }
        if let Some(addr) = script.address_id {
            flow.kernel_addr_id = addr;
        }
    }
    let flow = session.subflows.get(id);
    *receiver_token = token;
    *sender_rand = flow.kernel_rand;
    *address_id = flow.kernel_addr_id;
    Ok(())
}

fn syn_ack_inbound(
    session: &mut Session,
    script: &JoinScript,
    meta: &PacketMeta,
    address_id: &mut u8,
    sender_hmac: &mut u64,
    sender_rand: &mut u32,
) -> Result<()> {
    let id = session.subflows.find(Direction::Inbound, meta)?;
    let fresh = session.nonces.rand32();
    {
        let flow = session.subflows.get_mut(id);
        flow.harness_rand = script.rand.unwrap_or(fresh);
        if let Some(addr) = script.address_id {
            flow.harness_addr_id = addr;
        }
    }
    session.bump_addr_id();

    // HMAC keys come from the script's variable pair when given, from the
    // session otherwise.
    let (first_key, second_key) = match &script.token {
        TokenSpec::Keys {
            first,
            second: Some(second),
        } => (session.var_key(first)?, session.var_key(second)?),
        _ => (
            session.require_harness_key()?,
            session.require_kernel_key()?,
        ),
    };
    let flow = session.subflows.get(id);
    let tag = hmac_sha1_trunc_64(
        &hmac_key(first_key, second_key),
        &hmac_msg(flow.harness_rand, flow.kernel_rand),
    );
    *address_id = flow.harness_addr_id;
    *sender_rand = flow.harness_rand;
    *sender_hmac = tag;
    Ok(())
}

fn syn_ack_outbound(
    session: &mut Session,
    meta: &PacketMeta,
    live: Option<&Packet>,
    address_id: &mut u8,
    sender_hmac: &mut u64,
    sender_rand: &mut u32,
) -> Result<()> {
    let live = live.ok_or(EngineError::ScriptProtocolViolation(
        "captured packet required for outbound MP_JOIN",
    ))?;
    let (live_addr_id, live_rand) = match live.mptcp_option() {
        Some(MptcpOption::Join(MpJoin::SynAck {
            address_id,
            sender_rand,
            ..
        })) => (*address_id, *sender_rand),
        _ => {
            return Err(EngineError::ScriptProtocolViolation(
                "captured packet has no MP_JOIN SYN/ACK option",
            ))
        }
    };
    let id = session.subflows.find(Direction::Outbound, meta)?;
    {
        let flow = session.subflows.get_mut(id);
        flow.kernel_addr_id = live_addr_id;
        flow.kernel_rand = live_rand;
    }
    let kernel_key = session.require_kernel_key()?;
    let harness_key = session.require_harness_key()?;
    let flow = session.subflows.get(id);
    let tag = hmac_sha1_trunc_64(
        &hmac_key(kernel_key, harness_key),
        &hmac_msg(flow.kernel_rand, flow.harness_rand),
    );
    *address_id = live_addr_id;
    *sender_rand = live_rand;
    *sender_hmac = tag;
    debug!(address_id = live_addr_id, "kernel MP_JOIN SYN/ACK absorbed");
    Ok(())
}

fn ack(
    session: &mut Session,
    meta: &PacketMeta,
    direction: Direction,
    sender_hmac: &mut [u8; 20],
) -> Result<()> {
    let id = session.subflows.find(direction, meta)?;
    let harness_key = session.require_harness_key()?;
    let kernel_key = session.require_kernel_key()?;
    let flow = session.subflows.get(id);
    let tag = match direction {
        Direction::Inbound => hmac_sha1(
            &hmac_key(harness_key, kernel_key),
            &hmac_msg(flow.harness_rand, flow.kernel_rand),
        ),
        Direction::Outbound => hmac_sha1(
            &hmac_key(kernel_key, harness_key),
            &hmac_msg(flow.kernel_rand, flow.harness_rand),
        ),
    };
    *sender_hmac = tag;
    Ok(())
}
