use thiserror::Error;

/// Errors that can occur while resolving MPTCP option fields
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("script hint queue is empty")]
    HintMissing,

    #[error("script hint has the wrong shape: expected {expected}, found {found}")]
    HintShape {
        expected: &'static str,
        found: &'static str,
    },

    #[error("unknown script variable: {0}")]
    UnknownVar(String),

    #[error("session key already bound to a different value")]
    KeyConflict,

    #[error("option length {length} does not match any {subtype} layout")]
    OptionMalformed { subtype: &'static str, length: u8 },

    #[error("no subflow matches port pair {src_port} -> {dst_port}")]
    NoSubflow { src_port: u16, dst_port: u16 },

    #[error("packet has neither an IPv4 nor an IPv6 header")]
    AddressFamilyUnsupported,

    #[error("script protocol violation: {0}")]
    ScriptProtocolViolation(&'static str),
}

pub type Result<T> = std::result::Result<T, EngineError>;
