//! Typed MPTCP option values and their wire layouts.
//!
//! The harness's TCP option iterator yields one [`TcpOption`] per option on
//! the wire; the engine rewrites the MPTCP ones in place. Scripted DSS
//! fields carry a tri-state [`DssField`] so an unspecified or
//! variable-bound value survives parsing until the engine resolves it.

pub mod wire;

use std::net::IpAddr;

pub use wire::{decode, encode};

/// TCP option kind assigned to MPTCP.
pub const TCPOPT_MPTCP: u8 = 30;

/// Protocol version advertised in MP_CAPABLE.
pub const MPTCP_VERSION: u8 = 0;

// Option subtypes.
pub const MP_CAPABLE_SUBTYPE: u8 = 0;
pub const MP_JOIN_SUBTYPE: u8 = 1;
pub const DSS_SUBTYPE: u8 = 2;
pub const ADD_ADDR_SUBTYPE: u8 = 3;
pub const REMOVE_ADDR_SUBTYPE: u8 = 4;
pub const MP_PRIO_SUBTYPE: u8 = 5;

// MP_CAPABLE lengths: first two handshake steps carry one key, the third
// both.
pub const TCPOLEN_MP_CAPABLE_SYN: u8 = 12;
pub const TCPOLEN_MP_CAPABLE: u8 = 20;

// MP_JOIN lengths.
pub const TCPOLEN_MP_JOIN_SYN: u8 = 12;
pub const TCPOLEN_MP_JOIN_SYN_ACK: u8 = 16;
pub const TCPOLEN_MP_JOIN_ACK: u8 = 24;

// MP_CAPABLE flags byte.
pub const MP_CAPABLE_FLAGS: u8 = 0x01;
pub const MP_CAPABLE_FLAGS_CS: u8 = 0x81;

// DSS flags byte bits.
pub const DSS_FLAG_A: u8 = 0x01;
pub const DSS_FLAG_A8: u8 = 0x02;
pub const DSS_FLAG_M: u8 = 0x04;
pub const DSS_FLAG_M8: u8 = 0x08;
pub const DSS_FLAG_F: u8 = 0x10;

/// One TCP option as the harness iterator yields it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TcpOption {
    Mptcp(MptcpOption),
    /// Any non-MPTCP option, passed through untouched.
    Raw { kind: u8, data: Vec<u8> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MptcpOption {
    Capable(MpCapable),
    Join(MpJoin),
    Dss(Dss),
    AddAddr(AddAddr),
    RemoveAddr(RemoveAddr),
    Prio(MpPrio),
}

impl MptcpOption {
    pub fn subtype(&self) -> u8 {
        match self {
            MptcpOption::Capable(_) => MP_CAPABLE_SUBTYPE,
            MptcpOption::Join(_) => MP_JOIN_SUBTYPE,
            MptcpOption::Dss(_) => DSS_SUBTYPE,
            MptcpOption::AddAddr(_) => ADD_ADDR_SUBTYPE,
            MptcpOption::RemoveAddr(_) => REMOVE_ADDR_SUBTYPE,
            MptcpOption::Prio(_) => MP_PRIO_SUBTYPE,
        }
    }
}

/// MP_CAPABLE: length 12 on the SYN and SYN/ACK (one key), length 20 on
/// the third handshake step (both keys).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpCapable {
    Syn { version: u8, flags: u8, key: u64 },
    Ack {
        version: u8,
        flags: u8,
        sender_key: u64,
        receiver_key: u64,
    },
}

/// MP_JOIN: one variant per handshake step, the wire length selects the
/// variant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MpJoin {
    /// Length 12: token + sender random number.
    Syn {
        backup: bool,
        address_id: u8,
        receiver_token: u32,
        sender_rand: u32,
    },
    /// Length 16: truncated HMAC + sender random number.
    SynAck {
        backup: bool,
        address_id: u8,
        sender_hmac: u64,
        sender_rand: u32,
    },
    /// Length 24: full 160-bit HMAC tag.
    Ack { sender_hmac: [u8; 20] },
}

/// Resolution state of a scripted DSS sequence field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DssField {
    /// The script left the field open; the engine fills it from state.
    Unspecified,
    /// Pinned in the script (or resolved by the engine).
    Literal(u64),
    /// The script bound the field to a key variable; resolving it consumes
    /// the next key hint.
    VarRef(String),
}

impl DssField {
    /// Resolved value, if this field has one.
    pub fn literal(&self) -> Option<u64> {
        match self {
            DssField::Literal(value) => Some(*value),
            _ => None,
        }
    }
}

/// Data-level ACK block of a DSS option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DackBlock {
    pub value: DssField,
    /// 8-byte wire form (`a` flag); otherwise 4-byte.
    pub eight: bool,
}

/// DSN mapping block of a DSS option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsnBlock {
    pub value: DssField,
    /// 8-byte wire form (`m` flag); otherwise 4-byte.
    pub eight: bool,
    pub ssn: u32,
    pub dll: u16,
    /// Present when the scripted option length selects a checksummed
    /// layout.
    pub checksum: Option<u16>,
}

/// DSS option: any combination of DACK block and DSN mapping, plus the
/// DATA_FIN flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dss {
    pub fin: bool,
    pub dack: Option<DackBlock>,
    pub dsn: Option<DsnBlock>,
}

impl Dss {
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if let Some(dack) = &self.dack {
            flags |= DSS_FLAG_A;
            if dack.eight {
                flags |= DSS_FLAG_A8;
            }
        }
        if let Some(dsn) = &self.dsn {
            flags |= DSS_FLAG_M;
            if dsn.eight {
                flags |= DSS_FLAG_M8;
            }
        }
        if self.fin {
            flags |= DSS_FLAG_F;
        }
        flags
    }

    /// Wire length implied by the blocks present.
    pub fn wire_len(&self) -> u8 {
        let mut len = 4u8;
        if let Some(dack) = &self.dack {
            len += if dack.eight { 8 } else { 4 };
        }
        if let Some(dsn) = &self.dsn {
            len += if dsn.eight { 8 } else { 4 };
            len += 6; // ssn + dll
            if dsn.checksum.is_some() {
                len += 2;
            }
        }
        len
    }
}

/// ADD_ADDR: advertised address, with an optional port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddAddr {
    pub address_id: u8,
    pub addr: IpAddr,
    pub port: Option<u16>,
}

/// REMOVE_ADDR: list of withdrawn address identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveAddr {
    pub address_ids: Vec<u8>,
}

/// MP_PRIO: subflow priority change, optionally for another address id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MpPrio {
    pub backup: bool,
    pub address_id: Option<u8>,
}
