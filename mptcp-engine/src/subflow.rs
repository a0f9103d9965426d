//! Per-subflow state and the registry that tracks every subflow of the
//! session.
//!
//! Lookup matches on the port pair only; the IP endpoints are stored for
//! diagnostics and address-id correlation. Subflows are created by the
//! first packet of each subflow's handshake and live until session
//! teardown.

use std::net::IpAddr;

use crate::error::{EngineError, Result};
use crate::packet::{Direction, PacketMeta};

/// State of one TCP connection carrying a slice of the MPTCP data stream.
///
/// Ports and addresses are oriented from the harness's perspective:
/// `src_*` is the harness side, `dst_*` the kernel side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subflow {
    pub src_ip: IpAddr,
    pub dst_ip: IpAddr,
    pub src_port: u16,
    pub dst_port: u16,
    pub harness_addr_id: u8,
    pub kernel_addr_id: u8,
    pub harness_rand: u32,
    pub kernel_rand: u32,
    /// Subflow sequence number, advanced per mapped payload byte.
    pub ssn: u32,
}

/// Stable handle into the registry, valid until [`SubflowRegistry::clear`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubflowId(usize);

#[derive(Debug, Default)]
pub struct SubflowRegistry {
    flows: Vec<Subflow>,
}

impl SubflowRegistry {
    pub fn insert(&mut self, subflow: Subflow) -> SubflowId {
        self.flows.push(subflow);
        SubflowId(self.flows.len() - 1)
    }

    pub fn get(&self, id: SubflowId) -> &Subflow {
        &self.flows[id.0]
    }

    pub fn get_mut(&mut self, id: SubflowId) -> &mut Subflow {
        &mut self.flows[id.0]
    }

    /// Find the subflow a packet belongs to. Inbound packets travel in the
    /// subflow's stored orientation; outbound packets are reversed.
    pub fn find(&self, direction: Direction, meta: &PacketMeta) -> Result<SubflowId> {
        let (src, dst) = match direction {
            Direction::Inbound => (meta.src_port, meta.dst_port),
            Direction::Outbound => (meta.dst_port, meta.src_port),
        };
        self.flows
            .iter()
            .position(|flow| flow.src_port == src && flow.dst_port == dst)
            .map(SubflowId)
            .ok_or(EngineError::NoSubflow {
                src_port: meta.src_port,
                dst_port: meta.dst_port,
            })
    }

    /// Socket-oriented lookup used by the harness when correlating state
    /// outside packet processing.
    pub fn find_by_socket(&self, local_port: u16, remote_port: u16) -> Option<&Subflow> {
        self.flows
            .iter()
            .find(|flow| flow.src_port == local_port && flow.dst_port == remote_port)
    }

    pub fn len(&self) -> usize {
        self.flows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subflow> {
        self.flows.iter()
    }

    pub fn clear(&mut self) {
        self.flows.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packet::IpPair;

    fn meta(src_port: u16, dst_port: u16) -> PacketMeta {
        PacketMeta {
            ip: Some(IpPair {
                src: "10.0.0.1".parse().unwrap(),
                dst: "10.0.0.2".parse().unwrap(),
            }),
            src_port,
            dst_port,
            syn: false,
            ack: true,
            payload_len: 0,
            payload_csum: 0,
        }
    }

    fn subflow(src_port: u16, dst_port: u16) -> Subflow {
        Subflow {
            src_ip: "10.0.0.1".parse().unwrap(),
            dst_ip: "10.0.0.2".parse().unwrap(),
            src_port,
            dst_port,
            harness_addr_id: 0,
            kernel_addr_id: 0,
            harness_rand: 0,
            kernel_rand: 0,
            ssn: 0,
        }
    }

    #[test]
    fn test_find_is_direction_aware() {
        let mut reg = SubflowRegistry::default();
        let id = reg.insert(subflow(4000, 8000));

        // Inbound: same orientation as stored.
        assert_eq!(reg.find(Direction::Inbound, &meta(4000, 8000)).unwrap(), id);
        // Outbound: the kernel's reply has the tuple reversed.
        assert_eq!(
            reg.find(Direction::Outbound, &meta(8000, 4000)).unwrap(),
            id
        );
        assert!(matches!(
            reg.find(Direction::Inbound, &meta(8000, 4000)),
            Err(EngineError::NoSubflow { .. })
        ));
    }

    #[test]
    fn test_find_by_socket_uses_local_remote_ports() {
        let mut reg = SubflowRegistry::default();
        reg.insert(subflow(4000, 8000));
        assert!(reg.find_by_socket(4000, 8000).is_some());
        assert!(reg.find_by_socket(8000, 4000).is_none());
    }
}
