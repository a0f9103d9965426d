//! Script variable table: name to bound value.
//!
//! A variable is either script-defined (the script assigned it a value and
//! the table owns that value) or engine-generated (the value lives in
//! session state and the record only names the slot). The distinction
//! matters for key conflict detection: adopting a script-defined key twice
//! must compare values, while an engine slot is already canonical.

use ahash::AHashMap;

use crate::hints::JoinScript;

/// Session-state slot an engine-generated variable refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySlot {
    Harness,
    Kernel,
}

/// Payload of a bound variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VarPayload {
    /// Engine-generated key; the value lives in session state.
    SessionKey(KeySlot),
    /// Script-defined 64-bit key, owned by the table.
    ScriptKey(u64),
    /// Script-defined MP_JOIN metadata, owned by the table.
    JoinMeta(JoinScript),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VarRecord {
    pub payload: VarPayload,
}

impl VarRecord {
    pub fn script_defined(&self) -> bool {
        !matches!(self.payload, VarPayload::SessionKey(_))
    }
}

/// Unordered name-to-record map. Names are copied in on bind.
#[derive(Debug, Default)]
pub struct VarTable {
    map: AHashMap<String, VarRecord>,
}

impl VarTable {
    pub fn bind(&mut self, name: &str, payload: VarPayload) {
        self.map.insert(name.to_owned(), VarRecord { payload });
    }

    pub fn lookup(&self, name: &str) -> Option<&VarRecord> {
        self.map.get(name)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn clear(&mut self) {
        self.map.clear();
    }
}
