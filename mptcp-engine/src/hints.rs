//! Script hints: parser-emitted notes about forthcoming option fields.
//!
//! The script parser walks the test script once and enqueues one hint per
//! MPTCP option mention. Packets are processed in script order, so the
//! engine drains the queue front-to-back while rewriting options. A hint
//! missing or of the wrong shape is a scripting error surfaced to the
//! harness, never recovered locally.

use std::collections::VecDeque;

use crate::error::{EngineError, Result};

/// How a scripted MP_JOIN names the receiver token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TokenSpec {
    /// No script value: derive the token from the session key owned by the
    /// addressed side.
    Auto,
    /// Literal 32-bit token pinned in the script.
    Literal(u32),
    /// One or two key variables. The first names the key the token is
    /// derived from; the second, when present, supplies the peer key for
    /// the SYN/ACK HMAC.
    Keys {
        first: String,
        second: Option<String>,
    },
}

/// Per-direction fields of a scripted MP_JOIN option.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinScript {
    /// Address identifier pinned in the script, if any.
    pub address_id: Option<u8>,
    pub token: TokenSpec,
    /// Sender random number pinned in the script, if any.
    pub rand: Option<u32>,
}

impl JoinScript {
    /// A join mention with every field left to the engine.
    pub fn auto() -> Self {
        Self {
            address_id: None,
            token: TokenSpec::Auto,
            rand: None,
        }
    }
}

/// One queued note from the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptHint {
    /// Variable name to associate with the next key field encountered.
    Key(String),
    /// Structured fields for the next MP_JOIN option.
    Join(JoinScript),
}

impl ScriptHint {
    fn shape(&self) -> &'static str {
        match self {
            ScriptHint::Key(_) => "key",
            ScriptHint::Join(_) => "mp_join",
        }
    }
}

/// Strict FIFO of script hints.
#[derive(Debug, Default)]
pub struct HintQueue {
    queue: VecDeque<ScriptHint>,
}

impl HintQueue {
    pub fn push(&mut self, hint: ScriptHint) {
        self.queue.push_back(hint);
    }

    /// Non-destructive look at the front hint.
    pub fn peek(&self) -> Option<&ScriptHint> {
        self.queue.front()
    }

    pub fn pop(&mut self) -> Result<ScriptHint> {
        self.queue.pop_front().ok_or(EngineError::HintMissing)
    }

    /// Pop the front hint, requiring a key-variable name.
    pub fn pop_key(&mut self) -> Result<String> {
        match self.pop()? {
            ScriptHint::Key(name) => Ok(name),
            other => Err(EngineError::HintShape {
                expected: "key",
                found: other.shape(),
            }),
        }
    }

    /// Pop the front hint, requiring MP_JOIN fields.
    pub fn pop_join(&mut self) -> Result<JoinScript> {
        match self.pop()? {
            ScriptHint::Join(script) => Ok(script),
            other => Err(EngineError::HintShape {
                expected: "mp_join",
                found: other.shape(),
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    pub fn clear(&mut self) {
        self.queue.clear();
    }
}
