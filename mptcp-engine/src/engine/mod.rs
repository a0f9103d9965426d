//! Engine entry point and per-option dispatcher.
//!
//! `process` is the single public entry the harness calls per scripted
//! packet: it walks the packet's TCP options and rewrites each MPTCP one
//! according to session state, in wire order, single pass. Any error
//! aborts the packet; state mutated before the failure is kept and the
//! harness reports the failing script line.

pub(crate) mod dss;
pub(crate) mod mp_capable;
pub(crate) mod mp_join;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::hints::{JoinScript, ScriptHint};
use crate::options::{MptcpOption, TcpOption};
use crate::packet::{Direction, Packet};
use crate::session::Session;
use crate::vars::VarPayload;

pub struct Engine {
    config: EngineConfig,
    session: Session,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let session = Session::new(config.seed);
        Self { config, session }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Parser interface: queue a variable name for the next key field.
    pub fn push_key_hint(&mut self, name: impl Into<String>) {
        self.session.hints.push(ScriptHint::Key(name.into()));
    }

    /// Parser interface: queue the fields of the next MP_JOIN option.
    pub fn push_join_hint(&mut self, script: JoinScript) {
        self.session.hints.push(ScriptHint::Join(script));
    }

    /// Bind a script-defined key variable before any packet is processed.
    pub fn define_key_var(&mut self, name: &str, key: u64) {
        self.session.vars.bind(name, VarPayload::ScriptKey(key));
    }

    /// Bind script-defined MP_JOIN metadata under a name.
    pub fn define_join_var(&mut self, name: &str, script: JoinScript) {
        self.session.vars.bind(name, VarPayload::JoinMeta(script));
    }

    /// Session teardown: drop all state and reseed.
    pub fn reset(&mut self) {
        self.session.reset(self.config.seed);
    }

    /// Rewrite every MPTCP option of `packet`.
    ///
    /// `live` is the captured packet for outbound processing (it may carry
    /// fields the script left open); inbound packets pass `None`.
    pub fn process(
        &mut self,
        packet: &mut Packet,
        live: Option<&Packet>,
        direction: Direction,
    ) -> Result<()> {
        let meta = packet.meta();
        for option in packet.options.iter_mut() {
            let TcpOption::Mptcp(mptcp) = option else {
                continue;
            };
            match mptcp {
                MptcpOption::Capable(capable) => mp_capable::process(
                    &mut self.session,
                    &self.config,
                    capable,
                    &meta,
                    live,
                    direction,
                )?,
                MptcpOption::Join(join) => {
                    mp_join::process(&mut self.session, join, &meta, live, direction)?
                }
                MptcpOption::Dss(dss) => {
                    dss::process(&mut self.session, dss, &meta, live, direction)?
                }
                MptcpOption::AddAddr(_) | MptcpOption::RemoveAddr(_) | MptcpOption::Prio(_) => {
                    return Err(EngineError::ScriptProtocolViolation(
                        "unhandled MPTCP option subtype",
                    ))
                }
            }
        }
        Ok(())
    }
}
