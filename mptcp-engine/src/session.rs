//! Session-global MPTCP state.
//!
//! One [`Session`] covers one MPTCP connection across all its subflows:
//! the key pair, the derived IDSNs, the data-level counters, the
//! address-id allocator, and the owned hint/variable/subflow collections.
//! The harness threads the session through the engine; there is no global
//! state.

use tracing::debug;

use crate::crypto::sha1_least_64;
use crate::error::{EngineError, Result};
use crate::hints::HintQueue;
use crate::packet::PacketMeta;
use crate::rng::Nonces;
use crate::subflow::{Subflow, SubflowId, SubflowRegistry};
use crate::vars::{KeySlot, VarPayload, VarTable};

#[derive(Debug)]
pub struct Session {
    harness_key: Option<u64>,
    kernel_key: Option<u64>,
    harness_idsn: Option<u64>,
    kernel_idsn: Option<u64>,
    /// Highest data-level sequence value seen from the kernel, kept as the
    /// next expected DSN so an unspecified DACK can be filled directly.
    pub(crate) last_dsn_rcvd: u64,
    /// Data-level units observed from the kernel side.
    pub(crate) remote_ssn: u64,
    /// Data-level units the harness has mapped toward the kernel.
    pub(crate) local_sent: u64,
    next_addr_id: u8,
    pub(crate) hints: HintQueue,
    pub(crate) vars: VarTable,
    pub(crate) subflows: SubflowRegistry,
    pub(crate) nonces: Nonces,
}

impl Session {
    pub fn new(seed: u64) -> Self {
        Self {
            harness_key: None,
            kernel_key: None,
            harness_idsn: None,
            kernel_idsn: None,
            last_dsn_rcvd: 0,
            remote_ssn: 0,
            local_sent: 0,
            next_addr_id: 0,
            hints: HintQueue::default(),
            vars: VarTable::default(),
            subflows: SubflowRegistry::default(),
            nonces: Nonces::from_seed(seed),
        }
    }

    pub fn harness_key(&self) -> Option<u64> {
        self.harness_key
    }

    pub fn kernel_key(&self) -> Option<u64> {
        self.kernel_key
    }

    pub fn harness_idsn(&self) -> Option<u64> {
        self.harness_idsn
    }

    pub fn kernel_idsn(&self) -> Option<u64> {
        self.kernel_idsn
    }

    pub fn next_addr_id(&self) -> u8 {
        self.next_addr_id
    }

    /// Next expected kernel-side DSN, as tracked from captures.
    pub fn last_dsn_rcvd(&self) -> u64 {
        self.last_dsn_rcvd
    }

    /// Script hints not yet consumed; non-zero at session end means the
    /// script mentioned more options than were processed.
    pub fn pending_hints(&self) -> usize {
        self.hints.len()
    }

    pub fn subflow_count(&self) -> usize {
        self.subflows.len()
    }

    pub fn subflows(&self) -> impl Iterator<Item = &Subflow> {
        self.subflows.iter()
    }

    pub fn find_by_socket(&self, local_port: u16, remote_port: u16) -> Option<&Subflow> {
        self.subflows.find_by_socket(local_port, remote_port)
    }

    /// Bind the harness-side key. Rebinding to the same value is a no-op;
    /// a different value is a protocol violation.
    pub fn set_harness_key(&mut self, key: u64) -> Result<()> {
        match self.harness_key {
            Some(bound) if bound != key => Err(EngineError::KeyConflict),
            Some(_) => Ok(()),
            None => {
                debug!(key, "harness key bound");
                self.harness_key = Some(key);
                Ok(())
            }
        }
    }

    /// Bind the kernel-side key, with the same rebind rules.
    pub fn set_kernel_key(&mut self, key: u64) -> Result<()> {
        match self.kernel_key {
            Some(bound) if bound != key => Err(EngineError::KeyConflict),
            Some(_) => Ok(()),
            None => {
                debug!(key, "kernel key bound");
                self.kernel_key = Some(key);
                Ok(())
            }
        }
    }

    pub(crate) fn require_harness_key(&self) -> Result<u64> {
        self.harness_key.ok_or(EngineError::ScriptProtocolViolation(
            "harness key referenced before key exchange",
        ))
    }

    pub(crate) fn require_kernel_key(&self) -> Result<u64> {
        self.kernel_key.ok_or(EngineError::ScriptProtocolViolation(
            "kernel key referenced before key exchange",
        ))
    }

    pub(crate) fn require_harness_idsn(&self) -> Result<u64> {
        self.harness_idsn
            .ok_or(EngineError::ScriptProtocolViolation(
                "IDSN referenced before the MP_CAPABLE handshake completed",
            ))
    }

    /// Derive both IDSNs from the bound keys. Runs once, at the third
    /// MP_CAPABLE packet; later calls keep the derived values.
    pub(crate) fn derive_idsns(&mut self) -> Result<()> {
        if self.harness_idsn.is_some() {
            return Ok(());
        }
        let harness_idsn = sha1_least_64(self.require_harness_key()?);
        let kernel_idsn = sha1_least_64(self.require_kernel_key()?);
        self.harness_idsn = Some(harness_idsn);
        self.kernel_idsn = Some(kernel_idsn);
        self.last_dsn_rcvd = kernel_idsn.wrapping_add(self.remote_ssn);
        debug!(harness_idsn, kernel_idsn, "IDSNs derived");
        Ok(())
    }

    /// DSS rebind: a scripted key variable re-anchors the kernel-side
    /// data-level base.
    pub(crate) fn set_kernel_idsn(&mut self, idsn: u64) {
        self.kernel_idsn = Some(idsn);
    }

    /// Allocate the next harness-side address identifier.
    pub(crate) fn alloc_addr_id(&mut self) -> u8 {
        let id = self.next_addr_id;
        self.next_addr_id = self.next_addr_id.wrapping_add(1);
        id
    }

    /// Advance the allocator without reading, for handshake steps that
    /// reserve an id for an already-created subflow.
    pub(crate) fn bump_addr_id(&mut self) {
        self.next_addr_id = self.next_addr_id.wrapping_add(1);
    }

    /// Resolve a variable name to a 64-bit key value.
    pub(crate) fn var_key(&self, name: &str) -> Result<u64> {
        let record = self
            .vars
            .lookup(name)
            .ok_or_else(|| EngineError::UnknownVar(name.to_owned()))?;
        match &record.payload {
            VarPayload::ScriptKey(key) => Ok(*key),
            VarPayload::SessionKey(KeySlot::Harness) => self.require_harness_key(),
            VarPayload::SessionKey(KeySlot::Kernel) => self.require_kernel_key(),
            VarPayload::JoinMeta(_) => Err(EngineError::ScriptProtocolViolation(
                "variable does not hold a key",
            )),
        }
    }

    /// Create a subflow from a packet the harness injects: the packet's
    /// source is the harness side. Allocates the harness random number and
    /// address id.
    pub(crate) fn new_subflow_inbound(&mut self, meta: &PacketMeta) -> Result<SubflowId> {
        let flow = meta.flow()?;
        let harness_rand = self.nonces.rand32();
        let harness_addr_id = self.alloc_addr_id();
        let subflow = Subflow {
            src_ip: flow.src,
            dst_ip: flow.dst,
            src_port: meta.src_port,
            dst_port: meta.dst_port,
            harness_addr_id,
            kernel_addr_id: 0,
            harness_rand,
            kernel_rand: 0,
            ssn: 0,
        };
        debug!(
            src_port = subflow.src_port,
            dst_port = subflow.dst_port,
            harness_addr_id,
            "subflow created (inbound)"
        );
        Ok(self.subflows.insert(subflow))
    }

    /// Create a subflow from a packet captured from the kernel: the tuple
    /// is reversed so the stored orientation stays harness-first. The
    /// kernel-side identifiers come from the captured option.
    pub(crate) fn new_subflow_outbound(
        &mut self,
        meta: &PacketMeta,
        kernel_addr_id: u8,
        kernel_rand: u32,
    ) -> Result<SubflowId> {
        let flow = meta.flow()?;
        let subflow = Subflow {
            src_ip: flow.dst,
            dst_ip: flow.src,
            src_port: meta.dst_port,
            dst_port: meta.src_port,
            harness_addr_id: 0,
            kernel_addr_id,
            harness_rand: 0,
            kernel_rand,
            ssn: 0,
        };
        debug!(
            src_port = subflow.src_port,
            dst_port = subflow.dst_port,
            kernel_addr_id,
            "subflow created (outbound)"
        );
        Ok(self.subflows.insert(subflow))
    }

    /// Session teardown: drop every binding and counter, reseed the nonce
    /// source.
    pub fn reset(&mut self, seed: u64) {
        *self = Session::new(seed);
    }
}
