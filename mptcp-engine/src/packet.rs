//! Harness-facing packet view.
//!
//! This is a transport type: the harness's packet layer populates it from
//! its own IP/TCP header structs, hands it to the engine for option
//! rewriting, and applies the mutated options back to the real buffers.

use std::net::IpAddr;

use crate::error::{EngineError, Result};
use crate::options::{MptcpOption, TcpOption};

/// Which way a scripted packet travels relative to the kernel under test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Injected by the harness toward the kernel.
    Inbound,
    /// Captured from the kernel.
    Outbound,
}

/// Network-layer endpoints of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpPair {
    pub src: IpAddr,
    pub dst: IpAddr,
}

/// The slice of a scripted or captured packet the engine needs.
#[derive(Debug, Clone)]
pub struct Packet {
    /// `None` when the capture path could not parse a network layer.
    pub ip: Option<IpPair>,
    pub src_port: u16,
    pub dst_port: u16,
    pub syn: bool,
    pub ack: bool,
    /// TCP payload length in bytes.
    pub payload_len: u16,
    /// One's-complement partial sum over the TCP payload bytes, used for
    /// checksummed DSS layouts. Zero when there is no payload.
    pub payload_csum: u16,
    pub options: Vec<TcpOption>,
}

/// Scalar packet fields, copied out so option rewriting can borrow the
/// option list mutably while handlers still read the header bits.
#[derive(Debug, Clone, Copy)]
pub struct PacketMeta {
    pub ip: Option<IpPair>,
    pub src_port: u16,
    pub dst_port: u16,
    pub syn: bool,
    pub ack: bool,
    pub payload_len: u16,
    pub payload_csum: u16,
}

impl PacketMeta {
    /// Network-layer endpoints, required for subflow bookkeeping.
    pub fn flow(&self) -> Result<IpPair> {
        self.ip.ok_or(EngineError::AddressFamilyUnsupported)
    }
}

impl Packet {
    pub fn meta(&self) -> PacketMeta {
        PacketMeta {
            ip: self.ip,
            src_port: self.src_port,
            dst_port: self.dst_port,
            syn: self.syn,
            ack: self.ack,
            payload_len: self.payload_len,
            payload_csum: self.payload_csum,
        }
    }

    /// First MPTCP option of the packet, if any.
    pub fn mptcp_option(&self) -> Option<&MptcpOption> {
        self.options.iter().find_map(|opt| match opt {
            TcpOption::Mptcp(mptcp) => Some(mptcp),
            TcpOption::Raw { .. } => None,
        })
    }
}
