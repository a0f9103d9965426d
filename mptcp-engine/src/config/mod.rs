pub mod loader;
pub mod types;

pub use loader::load_from_path;
pub use types::EngineConfig;
