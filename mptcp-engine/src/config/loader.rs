use std::fs;
use std::path::Path;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::options::MPTCP_VERSION;

pub fn load_from_path<P: AsRef<Path>>(p: P) -> Result<EngineConfig> {
    let txt = fs::read_to_string(p)
        .map_err(|e| EngineError::Config(format!("Failed to read config file: {e}")))?;
    let cfg: EngineConfig = toml::from_str(&txt)
        .map_err(|e| EngineError::Config(format!("Failed to parse config: {e}")))?;

    validate_config(&cfg)?;

    Ok(cfg)
}

pub(crate) fn validate_config(cfg: &EngineConfig) -> Result<()> {
    if cfg.version != MPTCP_VERSION {
        return Err(EngineError::Config(format!(
            "Unsupported MPTCP version: {}",
            cfg.version
        )));
    }
    Ok(())
}
