//! Configuration loader for Memoria.
//!
//! Reads `config.toml` from the data directory (`~/.memoria/` by default)
//! and deserializes it into [`MemoriaConfig`]. Falls back to defaults when
//! the file is missing or malformed.

use std::path::{Path, PathBuf};

use memoria_types::config::MemoriaConfig;

/// Environment variable overriding the data directory.
pub const DATA_DIR_ENV: &str = "MEMORIA_DATA_DIR";

/// Resolve the data directory: `$MEMORIA_DATA_DIR`, else `~/.memoria`.
pub fn resolve_data_dir() -> PathBuf {
    data_dir_from(std::env::var_os(DATA_DIR_ENV).map(PathBuf::from))
}

fn data_dir_from(env_override: Option<PathBuf>) -> PathBuf {
    match env_override {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".memoria"),
    }
}

/// Where the LanceDB files live inside the data directory.
pub fn vector_store_path(data_dir: &Path) -> PathBuf {
    data_dir.join("vector_store")
}

/// Load configuration from `{data_dir}/config.toml`.
///
/// - Missing file: [`MemoriaConfig::default()`].
/// - Unreadable or unparseable file: logs a warning and returns the default.
pub async fn load_config(data_dir: &Path) -> MemoriaConfig {
    let config_path = data_dir.join("config.toml");

    let content = match tokio::fs::read_to_string(&config_path).await {
        Ok(content) => content,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!("No config.toml found at {}, using defaults", config_path.display());
            return MemoriaConfig::default();
        }
        Err(err) => {
            tracing::warn!("Failed to read {}: {err}, using defaults", config_path.display());
            return MemoriaConfig::default();
        }
    };

    match toml::from_str::<MemoriaConfig>(&content) {
        Ok(config) => config,
        Err(err) => {
            tracing::warn!(
                "Failed to parse {}: {err}, using defaults",
                config_path.display()
            );
            MemoriaConfig::default()
        }
    }
}
