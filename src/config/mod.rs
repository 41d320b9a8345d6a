//! Configuration Management
//!
//! Unified configuration system with hierarchical resolution:
//! 1. Built-in defaults
//! 2. Global config (~/.config/fdalens/config.toml)
//! 3. Project config (.fdalens/config.toml)
//! 4. Environment variables (FDALENS_*, OPENFDA_API_KEY, GEMINI_API_KEY)

mod loader;
mod types;

pub use loader::ConfigLoader;
pub use types::*;
