//! DSS: data sequence numbers, data-level ACKs and the optional checksum.
//!
//! Inbound packets get open fields filled from session state so the
//! injected stream stays consistent; outbound packets mirror the captured
//! values into the scripted option and advance the observation counters.
//! 4-byte wire forms carry the wrapping low 32 bits of the 64-bit
//! data-level values.

use tracing::debug;

use crate::crypto::{sha1_least_32, sha1_least_64};
use crate::error::{EngineError, Result};
use crate::options::{Dss, DssField, MptcpOption};
use crate::packet::{Direction, Packet, PacketMeta};
use crate::session::Session;

pub(crate) fn process(
    session: &mut Session,
    option: &mut Dss,
    meta: &PacketMeta,
    live: Option<&Packet>,
    direction: Direction,
) -> Result<()> {
    match direction {
        Direction::Inbound => inbound(session, option, meta),
        Direction::Outbound => outbound(session, option, meta, live),
    }
}

fn truncate(eight: bool, value: u64) -> u64 {
    if eight {
        value
    } else {
        u64::from(value as u32)
    }
}

/// Resolve a `VarRef` field: the script mention reserved a key-hint slot,
/// and the value resolves through the variable table.
fn scripted_key(session: &mut Session, name: &str) -> Result<u64> {
    session.hints.pop_key()?;
    session.var_key(name)
}

/// Data-level base derived from a key, at the field's wire width. A
/// DATA_FIN occupies one unit of data-level space, so the base plus
/// counters stays aligned with RFC 6824 accounting.
fn key_base(eight: bool, key: u64) -> u64 {
    if eight {
        sha1_least_64(key)
    } else {
        u64::from(sha1_least_32(key))
    }
}

fn inbound(session: &mut Session, option: &mut Dss, meta: &PacketMeta) -> Result<()> {
    let fin = option.fin;
    let data_len = u64::from(meta.payload_len) + u64::from(fin);

    if let Some(dsn) = &mut option.dsn {
        let value = match &dsn.value {
            DssField::Unspecified => session
                .require_harness_idsn()?
                .wrapping_add(1)
                .wrapping_add(session.local_sent),
            // Scripted DSNs are relative to the IDSN; the first data byte
            // sits at IDSN + 1.
            DssField::Literal(offset) => session
                .require_harness_idsn()?
                .wrapping_add(*offset)
                .wrapping_add(1),
            DssField::VarRef(name) => {
                let key = scripted_key(session, name)?;
                key_base(dsn.eight, key)
                    .wrapping_add(1)
                    .wrapping_add(session.local_sent)
            }
        };
        dsn.value = DssField::Literal(truncate(dsn.eight, value));
        dsn.dll = meta.payload_len + u16::from(fin);

        let id = session.subflows.find(Direction::Inbound, meta)?;
        let flow = session.subflows.get_mut(id);
        dsn.ssn = flow.ssn;
        flow.ssn = flow.ssn.wrapping_add(u32::from(meta.payload_len));

        if dsn.checksum.is_some() {
            dsn.checksum = Some(dss_checksum(value, dsn.ssn, dsn.dll, meta.payload_csum));
        }
        session.local_sent += data_len;
        debug!(dsn = value, ssn = dsn.ssn, dll = dsn.dll, "DSN mapping filled");
    }

    if let Some(dack) = &mut option.dack {
        match &dack.value {
            DssField::Unspecified => {
                dack.value = DssField::Literal(truncate(dack.eight, session.last_dsn_rcvd));
            }
            // Pinned by the script; the kernel sees exactly this value.
            DssField::Literal(_) => {}
            // A key variable re-anchors the kernel-side data-level base.
            DssField::VarRef(name) => {
                let key = scripted_key(session, name)?;
                let base = key_base(dack.eight, key);
                session.set_kernel_idsn(base);
                dack.value = DssField::Literal(truncate(
                    dack.eight,
                    base.wrapping_add(session.remote_ssn),
                ));
            }
        }
    }
    Ok(())
}

fn outbound(
    session: &mut Session,
    option: &mut Dss,
    meta: &PacketMeta,
    live: Option<&Packet>,
) -> Result<()> {
    let live = live.ok_or(EngineError::ScriptProtocolViolation(
        "captured packet required for outbound DSS",
    ))?;
    let live_dss = match live.mptcp_option() {
        Some(MptcpOption::Dss(dss)) => dss,
        _ => {
            return Err(EngineError::ScriptProtocolViolation(
                "captured packet has no DSS option",
            ))
        }
    };
    let fin = option.fin;
    let data_len = u64::from(meta.payload_len) + u64::from(fin);

    if let Some(dsn) = &mut option.dsn {
        let live_dsn = live_dss
            .dsn
            .as_ref()
            .ok_or(EngineError::ScriptProtocolViolation(
                "captured DSS carries no DSN mapping",
            ))?;
        let live_value = live_dsn.value.literal().unwrap_or(0);
        let value = match &dsn.value {
            DssField::Unspecified => live_value,
            DssField::Literal(value) => *value,
            DssField::VarRef(name) => {
                let key = scripted_key(session, name)?;
                key_base(dsn.eight, key).wrapping_add(session.remote_ssn)
            }
        };
        dsn.value = DssField::Literal(truncate(dsn.eight, value));
        dsn.ssn = live_dsn.ssn;
        dsn.dll = live_dsn.dll;
        if dsn.checksum.is_some() {
            dsn.checksum = Some(live_dsn.checksum.unwrap_or(0));
        }
        // The observed mapping moves the acknowledgment point.
        session.last_dsn_rcvd = live_value.wrapping_add(data_len);
        session.remote_ssn += u64::from(meta.payload_len);
        debug!(
            dsn = live_value,
            last_dsn_rcvd = session.last_dsn_rcvd,
            "kernel DSN mapping observed"
        );
    }

    if let Some(dack) = &mut option.dack {
        let live_dack = live_dss
            .dack
            .as_ref()
            .ok_or(EngineError::ScriptProtocolViolation(
                "captured DSS carries no data-level ACK",
            ))?;
        match &dack.value {
            DssField::Unspecified => {
                dack.value =
                    DssField::Literal(truncate(dack.eight, live_dack.value.literal().unwrap_or(0)));
            }
            DssField::Literal(_) => {}
            // Expected ACK derived from a scripted key: everything the
            // harness has mapped so far is acknowledged.
            DssField::VarRef(name) => {
                let key = scripted_key(session, name)?;
                let base = key_base(dack.eight, key);
                dack.value = DssField::Literal(truncate(
                    dack.eight,
                    base.wrapping_add(1).wrapping_add(session.local_sent),
                ));
            }
        }
    }
    Ok(())
}

fn ones_complement_add(a: u16, b: u16) -> u16 {
    let sum = u32::from(a) + u32::from(b);
    ((sum & 0xFFFF) + (sum >> 16)) as u16
}

/// Checksum over the DSS pseudo-header `{dsn64, ssn, dll, 0}` plus the
/// caller-supplied payload partial sum, one's-complement like TCP. The
/// 4-byte wire form is widened to the full 64-bit DSN before summing.
fn dss_checksum(dsn: u64, ssn: u32, dll: u16, payload_csum: u16) -> u16 {
    let mut sum = 0u16;
    for chunk in dsn.to_be_bytes().chunks(2) {
        sum = ones_complement_add(sum, u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    for chunk in ssn.to_be_bytes().chunks(2) {
        sum = ones_complement_add(sum, u16::from_be_bytes([chunk[0], chunk[1]]));
    }
    sum = ones_complement_add(sum, dll);
    // The trailing zero half-word contributes nothing.
    sum = ones_complement_add(sum, payload_csum);
    !sum
}
