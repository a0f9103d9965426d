//! MP_CAPABLE: the session key exchange.
//!
//! The first two handshake steps carry one key each (length 12); the third
//! carries both (length 20). Keys the script left open are generated
//! (harness side) or lifted from the capture (kernel side) and registered
//! under the hinted variable name so later options can reference them.

use tracing::debug;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::hints::ScriptHint;
use crate::options::{MpCapable, MptcpOption};
use crate::packet::{Direction, Packet, PacketMeta};
use crate::session::Session;
use crate::vars::{KeySlot, VarPayload};

pub(crate) fn process(
    session: &mut Session,
    config: &EngineConfig,
    option: &mut MpCapable,
    meta: &PacketMeta,
    live: Option<&Packet>,
    direction: Direction,
) -> Result<()> {
    match (direction, option) {
        // SYN or SYN/ACK injected by the harness; the ACK bit does not
        // change the action.
        (
            Direction::Inbound,
            MpCapable::Syn {
                version,
                flags,
                key,
            },
        ) => {
            ensure_harness_key(session)?;
            *key = next_key(session)?;
            *version = config.version;
            *flags = config.capable_flags();
        }
        // SYN or SYN/ACK captured from the kernel: lift its key.
        (Direction::Outbound, MpCapable::Syn { key, .. }) => {
            extract_and_set_kernel_key(session, live)?;
            *key = next_key(session)?;
            session.remote_ssn += 1;
        }
        // Third handshake step, either direction: both keys on the wire.
        (
            _,
            MpCapable::Ack {
                version,
                flags,
                sender_key,
                receiver_key,
            },
        ) => {
            let first = next_key(session)?;
            let second = next_key(session)?;
            *sender_key = first;
            *receiver_key = second;
            if direction == Direction::Inbound {
                *version = config.version;
                *flags = config.capable_flags();
            }
            // The sender of the third step owns the first key.
            match direction {
                Direction::Inbound => {
                    session.set_harness_key(first)?;
                    session.set_kernel_key(second)?;
                }
                Direction::Outbound => {
                    session.set_kernel_key(first)?;
                    session.set_harness_key(second)?;
                }
            }
            session.derive_idsns()?;
            match direction {
                Direction::Inbound => session.new_subflow_inbound(meta)?,
                Direction::Outbound => session.new_subflow_outbound(meta, 0, 0)?,
            };
        }
    }
    Ok(())
}

/// Name carried by the front hint, which must be a key hint.
fn peek_key_name(session: &Session) -> Result<String> {
    match session.hints.peek() {
        Some(ScriptHint::Key(name)) => Ok(name.clone()),
        Some(ScriptHint::Join(_)) => Err(EngineError::HintShape {
            expected: "key",
            found: "mp_join",
        }),
        None => Err(EngineError::HintMissing),
    }
}

/// Make sure the harness key is bound before its field is emitted.
///
/// The front hint is only peeked here; it is popped when the key field
/// itself is written.
fn ensure_harness_key(session: &mut Session) -> Result<()> {
    let name = peek_key_name(session)?;
    match session.vars.lookup(&name).map(|rec| rec.payload.clone()) {
        // The script assigned this variable a value: adopt it.
        Some(VarPayload::ScriptKey(key)) => session.set_harness_key(key),
        // Already registered by an earlier packet.
        Some(VarPayload::SessionKey(_)) => Ok(()),
        Some(VarPayload::JoinMeta(_)) => Err(EngineError::ScriptProtocolViolation(
            "variable does not hold a key",
        )),
        // A fresh name while the key is already bound would silently draw
        // a second session key.
        None if session.harness_key().is_some() => Err(EngineError::KeyConflict),
        None => {
            let key = session.nonces.key();
            session.set_harness_key(key)?;
            session.vars.bind(&name, VarPayload::SessionKey(KeySlot::Harness));
            debug!(name = %name, "harness key generated");
            Ok(())
        }
    }
}

/// Bind the kernel key from the captured MP_CAPABLE, unless the script
/// pinned it first.
fn extract_and_set_kernel_key(session: &mut Session, live: Option<&Packet>) -> Result<()> {
    let name = peek_key_name(session)?;
    if let Some(VarPayload::ScriptKey(key)) = session.vars.lookup(&name).map(|rec| rec.payload.clone())
    {
        session.set_kernel_key(key)?;
    }
    if session.kernel_key().is_none() {
        let live = live.ok_or(EngineError::ScriptProtocolViolation(
            "captured packet required for outbound MP_CAPABLE",
        ))?;
        let key = match live.mptcp_option() {
            Some(MptcpOption::Capable(MpCapable::Syn { key, .. })) => *key,
            _ => {
                return Err(EngineError::ScriptProtocolViolation(
                    "captured packet has no MP_CAPABLE option",
                ))
            }
        };
        session.set_kernel_key(key)?;
        session.vars.bind(&name, VarPayload::SessionKey(KeySlot::Kernel));
        debug!(name = %name, key, "kernel key lifted from capture");
    }
    Ok(())
}

/// Pop the next key hint and resolve it to a value for the wire.
fn next_key(session: &mut Session) -> Result<u64> {
    let name = session.hints.pop_key()?;
    session.var_key(&name)
}
