//! Per-user locations for the config file, the store and the logs.
//!
//! Everything lives under a `CampusCompanion` directory inside the OS data
//! or config directory as reported by `dirs`.

use std::path::PathBuf;

use crate::constants::{APP_NAME, DB_FILE_NAME};
use crate::error::{CcError, CcResult};

fn under(base: Option<PathBuf>, what: &str) -> CcResult<PathBuf> {
    base.map(|dir| dir.join(APP_NAME))
        .ok_or_else(|| CcError::Config(format!("could not determine {what} directory")))
}

/// `~/.local/share/CampusCompanion` on Linux, `%APPDATA%` and
/// `Application Support` equivalents elsewhere.
pub fn data_dir() -> CcResult<PathBuf> {
    under(dirs::data_dir(), "data")
}

pub fn config_dir() -> CcResult<PathBuf> {
    under(dirs::config_dir(), "config")
}

pub fn default_config_file() -> CcResult<PathBuf> {
    Ok(config_dir()?.join("config.toml"))
}

pub fn default_db_file() -> CcResult<PathBuf> {
    Ok(data_dir()?.join(DB_FILE_NAME))
}

pub fn default_log_dir() -> CcResult<PathBuf> {
    Ok(data_dir()?.join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_live_under_app_dirs() {
        // Headless CI may have no home directory at all.
        if let (Ok(data), Ok(db), Ok(logs)) = (data_dir(), default_db_file(), default_log_dir()) {
            assert!(data.ends_with(APP_NAME));
            assert_eq!(db.parent(), Some(data.as_path()));
            assert!(logs.starts_with(&data));
        }
        if let Ok(file) = default_config_file() {
            assert!(file.ends_with(format!("{APP_NAME}/config.toml")));
        }
    }

    #[test]
    fn test_missing_base_is_config_error() {
        assert!(matches!(under(None, "data"), Err(CcError::Config(_))));
    }
}
