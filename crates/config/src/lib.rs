//! Configuration loading, validation and environment overrides.
//!
//! Config files: `relaygram.toml`, `relaygram.yaml`, or `relaygram.json`
//! Searched in `./` then `~/.config/relaygram/`.
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-default}` substitution in the raw
//! file text. Well-known variables (`BOT_TOKEN`, `SOURCE_CHANNELS`, ...)
//! override file values afterwards.

pub mod env;
pub mod env_subst;
pub mod loader;
pub mod schema;
pub mod validate;

pub use {
    env::{apply_env_overrides, apply_env_overrides_with},
    loader::{config_dir, discover_and_load, find_config_file, load_config},
    schema::{
        ModerationConfig, ModerationProviderConfig, PipelineConfig, RelayConfig, RelaygramConfig,
        TelegramConfig,
    },
    validate::{Diagnostic, Severity, ValidationResult},
};
