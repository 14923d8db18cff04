use std::path::{Path, PathBuf};

use tracing::debug;

use crate::{env::apply_env_overrides, env_subst::substitute_env, schema::RelaygramConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "relaygram.toml",
    "relaygram.yaml",
    "relaygram.yml",
    "relaygram.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<RelaygramConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    let raw = substitute_env(&raw);
    parse_config(&raw, path)
}

/// Resolve the effective configuration.
///
/// Uses `explicit` when given, otherwise the first file found in the
/// standard locations:
/// 1. `./relaygram.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/relaygram/relaygram.{toml,yaml,yml,json}` (user-global)
///
/// Starts from defaults when no file exists. Environment overrides are
/// applied last. A file that exists but cannot be parsed is an error.
pub fn discover_and_load(explicit: Option<&Path>) -> anyhow::Result<RelaygramConfig> {
    let path = match explicit {
        Some(p) => Some(p.to_path_buf()),
        None => find_config_file(),
    };

    let mut config = match path {
        Some(path) => {
            debug!(path = %path.display(), "loading config");
            load_config(&path)?
        },
        None => {
            debug!("no config file found, using defaults and environment");
            RelaygramConfig::default()
        },
    };
    apply_env_overrides(&mut config);
    config.moderation.fill_defaults();
    Ok(config)
}

/// Find the first config file in standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    let config_dir = config_dir()?;
    CONFIG_FILENAMES
        .iter()
        .map(|name| config_dir.join(name))
        .find(|p| p.exists())
}

/// Returns the user-global config directory (`~/.config/relaygram/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "relaygram").map(|d| d.config_dir().to_path_buf())
}

pub(crate) fn parse_config(raw: &str, path: &Path) -> anyhow::Result<RelaygramConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    let mut config: RelaygramConfig = match ext {
        "toml" => toml::from_str(raw)?,
        "yaml" | "yml" => serde_yaml::from_str(raw)?,
        "json" => serde_json::from_str(raw)?,
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    };
    config.moderation.fill_defaults();
    Ok(config)
}
