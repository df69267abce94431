pub mod ask;
pub mod config_cmd;
pub mod history;
pub mod init_db;
pub mod serve;

use std::path::{Path, PathBuf};

use chatrelay_config::AppConfig;

/// `--config`/`CHATRELAY_CONFIG` when given, else the default path.
pub fn config_path(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf).unwrap_or_else(AppConfig::default_path)
}

pub fn load_config(path: &Path) -> Result<AppConfig, Box<dyn std::error::Error>> {
    AppConfig::load_with_env(path).map_err(|e| format!("Failed to load config: {e}").into())
}

/// Logged once tracing is up, since loading runs before the subscriber exists.
pub fn missing_config_notice(path: &Path) -> Option<String> {
    (!path.exists())
        .then(|| format!("No config file found at {}, using defaults", path.display()))
}
