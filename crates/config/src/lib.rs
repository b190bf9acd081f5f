//! Configuration loading and env substitution.
//!
//! Config files: `portico.toml`, `portico.yaml`, `portico.yml` or `portico.json`.
//! Searched in `./` then `~/.config/portico/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw text.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{
        clear_config_dir, config_dir, discover_and_load, load_config, set_config_dir,
    },
    schema::{ChannelsConfig, LoggingConfig, PorticoConfig},
};
