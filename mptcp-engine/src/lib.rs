#![forbid(unsafe_code)]

pub mod config;
pub mod crypto;
pub mod engine;
pub mod error;
pub mod hints;
pub mod options;
pub mod packet;
pub mod rng;
pub mod session;
pub mod subflow;
pub mod telemetry;
pub mod vars;

pub use config::{load_from_path, EngineConfig};
pub use engine::Engine;
pub use error::{EngineError, Result};
pub use hints::{JoinScript, ScriptHint, TokenSpec};
pub use options::{Dss, DssField, MpCapable, MpJoin, MptcpOption, TcpOption};
pub use packet::{Direction, IpPair, Packet};
pub use session::Session;
pub use subflow::Subflow;
