//! Byte-level codec for kind-30 TCP options.
//!
//! `decode` turns a captured option (kind, length, payload) into a typed
//! [`MptcpOption`]; `encode` produces injection-ready bytes. The length
//! byte is authoritative for layout selection: a length that matches no
//! known sub-layout for the subtype is `OptionMalformed`. All multi-byte
//! fields are big-endian; HMAC tags are raw digest bytes.
//!
//! Encoding expects resolved options: an unresolved [`DssField`] encodes
//! as zero.

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{EngineError, Result};
use crate::options::{
    AddAddr, DackBlock, Dss, DsnBlock, DssField, MpCapable, MpJoin, MpPrio, MptcpOption,
    RemoveAddr, ADD_ADDR_SUBTYPE, DSS_FLAG_A, DSS_FLAG_A8, DSS_FLAG_F, DSS_FLAG_M, DSS_FLAG_M8,
    DSS_SUBTYPE, MP_CAPABLE_SUBTYPE, MP_JOIN_SUBTYPE, MP_PRIO_SUBTYPE, REMOVE_ADDR_SUBTYPE,
    TCPOLEN_MP_CAPABLE, TCPOLEN_MP_CAPABLE_SYN, TCPOLEN_MP_JOIN_ACK, TCPOLEN_MP_JOIN_SYN,
    TCPOLEN_MP_JOIN_SYN_ACK, TCPOPT_MPTCP,
};

fn read_u16(bytes: &[u8]) -> u16 {
    u16::from_be_bytes([bytes[0], bytes[1]])
}

fn read_u32(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn read_u64(bytes: &[u8]) -> u64 {
    u64::from_be_bytes([
        bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
    ])
}

/// Decode a full MPTCP option (kind and length bytes included).
pub fn decode(bytes: &[u8]) -> Result<MptcpOption> {
    if bytes.len() < 3 || bytes[0] != TCPOPT_MPTCP {
        return Err(EngineError::ScriptProtocolViolation(
            "not an MPTCP option",
        ));
    }
    let length = bytes[1];
    if length as usize != bytes.len() {
        return Err(EngineError::OptionMalformed {
            subtype: "mptcp",
            length,
        });
    }
    let subtype = bytes[2] >> 4;
    match subtype {
        MP_CAPABLE_SUBTYPE => decode_capable(bytes, length),
        MP_JOIN_SUBTYPE => decode_join(bytes, length),
        DSS_SUBTYPE => decode_dss(bytes, length),
        ADD_ADDR_SUBTYPE => decode_add_addr(bytes, length),
        REMOVE_ADDR_SUBTYPE if length >= 4 => Ok(MptcpOption::RemoveAddr(RemoveAddr {
            address_ids: bytes[3..].to_vec(),
        })),
        REMOVE_ADDR_SUBTYPE => Err(EngineError::OptionMalformed {
            subtype: "remove_addr",
            length,
        }),
        MP_PRIO_SUBTYPE => decode_prio(bytes, length),
        _ => Err(EngineError::ScriptProtocolViolation(
            "unknown MPTCP option subtype",
        )),
    }
}

fn decode_capable(bytes: &[u8], length: u8) -> Result<MptcpOption> {
    let version = bytes[2] & 0x0F;
    match length {
        TCPOLEN_MP_CAPABLE_SYN => Ok(MptcpOption::Capable(MpCapable::Syn {
            version,
            flags: bytes[3],
            key: read_u64(&bytes[4..12]),
        })),
        TCPOLEN_MP_CAPABLE => Ok(MptcpOption::Capable(MpCapable::Ack {
            version,
            flags: bytes[3],
            sender_key: read_u64(&bytes[4..12]),
            receiver_key: read_u64(&bytes[12..20]),
        })),
        _ => Err(EngineError::OptionMalformed {
            subtype: "mp_capable",
            length,
        }),
    }
}

fn decode_join(bytes: &[u8], length: u8) -> Result<MptcpOption> {
    let backup = bytes[2] & 0x01 != 0;
    match length {
        TCPOLEN_MP_JOIN_SYN => Ok(MptcpOption::Join(MpJoin::Syn {
            backup,
            address_id: bytes[3],
            receiver_token: read_u32(&bytes[4..8]),
            sender_rand: read_u32(&bytes[8..12]),
        })),
        TCPOLEN_MP_JOIN_SYN_ACK => Ok(MptcpOption::Join(MpJoin::SynAck {
            backup,
            address_id: bytes[3],
            sender_hmac: read_u64(&bytes[4..12]),
            sender_rand: read_u32(&bytes[12..16]),
        })),
        TCPOLEN_MP_JOIN_ACK => {
            let mut sender_hmac = [0u8; 20];
            sender_hmac.copy_from_slice(&bytes[4..24]);
            Ok(MptcpOption::Join(MpJoin::Ack { sender_hmac }))
        }
        _ => Err(EngineError::OptionMalformed {
            subtype: "mp_join",
            length,
        }),
    }
}

fn decode_dss(bytes: &[u8], length: u8) -> Result<MptcpOption> {
    if length < 4 {
        return Err(EngineError::OptionMalformed {
            subtype: "dss",
            length,
        });
    }
    let flags = bytes[3];
    let has_dack = flags & DSS_FLAG_A != 0;
    let dack8 = flags & DSS_FLAG_A8 != 0;
    let has_dsn = flags & DSS_FLAG_M != 0;
    let dsn8 = flags & DSS_FLAG_M8 != 0;
    let fin = flags & DSS_FLAG_F != 0;

    let mut expected = 4usize;
    if has_dack {
        expected += if dack8 { 8 } else { 4 };
    }
    if has_dsn {
        expected += if dsn8 { 8 } else { 4 };
        expected += 6;
    }
    let with_checksum = has_dsn && length as usize == expected + 2;
    if length as usize != expected && !with_checksum {
        return Err(EngineError::OptionMalformed {
            subtype: "dss",
            length,
        });
    }

    let mut at = 4usize;
    let dack = if has_dack {
        let value = if dack8 {
            let v = read_u64(&bytes[at..at + 8]);
            at += 8;
            v
        } else {
            let v = u64::from(read_u32(&bytes[at..at + 4]));
            at += 4;
            v
        };
        Some(DackBlock {
            value: DssField::Literal(value),
            eight: dack8,
        })
    } else {
        None
    };

    let dsn = if has_dsn {
        let value = if dsn8 {
            let v = read_u64(&bytes[at..at + 8]);
            at += 8;
            v
        } else {
            let v = u64::from(read_u32(&bytes[at..at + 4]));
            at += 4;
            v
        };
        let ssn = read_u32(&bytes[at..at + 4]);
        let dll = read_u16(&bytes[at + 4..at + 6]);
        let checksum = if with_checksum {
            Some(read_u16(&bytes[at + 6..at + 8]))
        } else {
            None
        };
        Some(DsnBlock {
            value: DssField::Literal(value),
            eight: dsn8,
            ssn,
            dll,
            checksum,
        })
    } else {
        None
    };

    Ok(MptcpOption::Dss(Dss { fin, dack, dsn }))
}

fn decode_add_addr(bytes: &[u8], length: u8) -> Result<MptcpOption> {
    if length < 8 {
        return Err(EngineError::OptionMalformed {
            subtype: "add_addr",
            length,
        });
    }
    let ipver = bytes[2] & 0x0F;
    let address_id = bytes[3];
    match (ipver, length) {
        (4, 8) | (4, 10) => {
            let mut octets = [0u8; 4];
            octets.copy_from_slice(&bytes[4..8]);
            let port = (length == 10).then(|| read_u16(&bytes[8..10]));
            Ok(MptcpOption::AddAddr(AddAddr {
                address_id,
                addr: IpAddr::V4(Ipv4Addr::from(octets)),
                port,
            }))
        }
        (6, 20) | (6, 22) => {
            let mut octets = [0u8; 16];
            octets.copy_from_slice(&bytes[4..20]);
            let port = (length == 22).then(|| read_u16(&bytes[20..22]));
            Ok(MptcpOption::AddAddr(AddAddr {
                address_id,
                addr: IpAddr::V6(Ipv6Addr::from(octets)),
                port,
            }))
        }
        _ => Err(EngineError::OptionMalformed {
            subtype: "add_addr",
            length,
        }),
    }
}

fn decode_prio(bytes: &[u8], length: u8) -> Result<MptcpOption> {
    let backup = bytes[2] & 0x01 != 0;
    match length {
        3 => Ok(MptcpOption::Prio(MpPrio {
            backup,
            address_id: None,
        })),
        4 => Ok(MptcpOption::Prio(MpPrio {
            backup,
            address_id: Some(bytes[3]),
        })),
        _ => Err(EngineError::OptionMalformed {
            subtype: "mp_prio",
            length,
        }),
    }
}

/// Encode a typed option into injection-ready bytes.
pub fn encode(option: &MptcpOption) -> Vec<u8> {
    match option {
        MptcpOption::Capable(capable) => encode_capable(capable),
        MptcpOption::Join(join) => encode_join(join),
        MptcpOption::Dss(dss) => encode_dss(dss),
        MptcpOption::AddAddr(add) => encode_add_addr(add),
        MptcpOption::RemoveAddr(remove) => {
            let mut out = vec![
                TCPOPT_MPTCP,
                3 + remove.address_ids.len() as u8,
                REMOVE_ADDR_SUBTYPE << 4,
            ];
            out.extend_from_slice(&remove.address_ids);
            out
        }
        MptcpOption::Prio(prio) => {
            let subtype_byte = (MP_PRIO_SUBTYPE << 4) | u8::from(prio.backup);
            match prio.address_id {
                Some(id) => vec![TCPOPT_MPTCP, 4, subtype_byte, id],
                None => vec![TCPOPT_MPTCP, 3, subtype_byte],
            }
        }
    }
}

fn encode_capable(capable: &MpCapable) -> Vec<u8> {
    match capable {
        MpCapable::Syn {
            version,
            flags,
            key,
        } => {
            let mut out = vec![
                TCPOPT_MPTCP,
                TCPOLEN_MP_CAPABLE_SYN,
                (MP_CAPABLE_SUBTYPE << 4) | (version & 0x0F),
                *flags,
            ];
            out.extend_from_slice(&key.to_be_bytes());
            out
        }
        MpCapable::Ack {
            version,
            flags,
            sender_key,
            receiver_key,
        } => {
            let mut out = vec![
                TCPOPT_MPTCP,
                TCPOLEN_MP_CAPABLE,
                (MP_CAPABLE_SUBTYPE << 4) | (version & 0x0F),
                *flags,
            ];
            out.extend_from_slice(&sender_key.to_be_bytes());
            out.extend_from_slice(&receiver_key.to_be_bytes());
            out
        }
    }
}

fn encode_join(join: &MpJoin) -> Vec<u8> {
    match join {
        MpJoin::Syn {
            backup,
            address_id,
            receiver_token,
            sender_rand,
        } => {
            let mut out = vec![
                TCPOPT_MPTCP,
                TCPOLEN_MP_JOIN_SYN,
                (MP_JOIN_SUBTYPE << 4) | u8::from(*backup),
                *address_id,
            ];
            out.extend_from_slice(&receiver_token.to_be_bytes());
            out.extend_from_slice(&sender_rand.to_be_bytes());
            out
        }
        MpJoin::SynAck {
            backup,
            address_id,
            sender_hmac,
            sender_rand,
        } => {
            let mut out = vec![
                TCPOPT_MPTCP,
                TCPOLEN_MP_JOIN_SYN_ACK,
                (MP_JOIN_SUBTYPE << 4) | u8::from(*backup),
                *address_id,
            ];
            out.extend_from_slice(&sender_hmac.to_be_bytes());
            out.extend_from_slice(&sender_rand.to_be_bytes());
            out
        }
        MpJoin::Ack { sender_hmac } => {
            let mut out = vec![TCPOPT_MPTCP, TCPOLEN_MP_JOIN_ACK, MP_JOIN_SUBTYPE << 4, 0];
            out.extend_from_slice(sender_hmac);
            out
        }
    }
}

fn encode_dss(dss: &Dss) -> Vec<u8> {
    let mut out = vec![TCPOPT_MPTCP, dss.wire_len(), DSS_SUBTYPE << 4, dss.flags()];
    if let Some(dack) = &dss.dack {
        let value = dack.value.literal().unwrap_or(0);
        if dack.eight {
            out.extend_from_slice(&value.to_be_bytes());
        } else {
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
    }
    if let Some(dsn) = &dss.dsn {
        let value = dsn.value.literal().unwrap_or(0);
        if dsn.eight {
            out.extend_from_slice(&value.to_be_bytes());
        } else {
            out.extend_from_slice(&(value as u32).to_be_bytes());
        }
        out.extend_from_slice(&dsn.ssn.to_be_bytes());
        out.extend_from_slice(&dsn.dll.to_be_bytes());
        if let Some(checksum) = dsn.checksum {
            out.extend_from_slice(&checksum.to_be_bytes());
        }
    }
    out
}

fn encode_add_addr(add: &AddAddr) -> Vec<u8> {
    let ipver: u8 = match add.addr {
        IpAddr::V4(_) => 4,
        IpAddr::V6(_) => 6,
    };
    let base: u8 = match add.addr {
        IpAddr::V4(_) => 8,
        IpAddr::V6(_) => 20,
    };
    let length = base + if add.port.is_some() { 2 } else { 0 };
    let mut out = vec![
        TCPOPT_MPTCP,
        length,
        (ADD_ADDR_SUBTYPE << 4) | ipver,
        add.address_id,
    ];
    match add.addr {
        IpAddr::V4(v4) => out.extend_from_slice(&v4.octets()),
        IpAddr::V6(v6) => out.extend_from_slice(&v6.octets()),
    }
    if let Some(port) = add.port {
        out.extend_from_slice(&port.to_be_bytes());
    }
    out
}
