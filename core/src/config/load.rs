use std::path::{Path, PathBuf};

use super::types::{AppConfig, RepositoryProvider};

/// Get the default statekeep data directory: ~/.statekeep
pub fn get_statekeep_data_dir() -> anyhow::Result<PathBuf> {
    if let Ok(dir) = std::env::var("STATEKEEP_HOME") {
        if !dir.trim().is_empty() {
            return Ok(PathBuf::from(dir));
        }
    }
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map_err(|_| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(PathBuf::from(home).join(".statekeep"))
}

pub fn load_default() -> anyhow::Result<AppConfig> {
    // Priority 1: ~/.statekeep/config.toml (highest)
    let data_dir = get_statekeep_data_dir()?;
    let home_config = data_dir.join("config.toml");

    // Priority 2: ./config.toml (current directory)
    let local_config = Path::new("config.toml");

    let cfg = if home_config.exists() {
        load_from_path(&home_config)?
    } else if local_config.exists() {
        load_from_path(local_config)?
    } else {
        AppConfig::default()
    };

    finalize(cfg, &data_dir)
}

/// Load an explicit config file with the same defaults and env overrides
/// as [`load_default`].
pub fn load_file(path: &Path) -> anyhow::Result<AppConfig> {
    let data_dir = get_statekeep_data_dir()?;
    finalize(load_from_path(path)?, &data_dir)
}

pub fn load_from_path(path: &Path) -> anyhow::Result<AppConfig> {
    let s = std::fs::read_to_string(path)?;
    Ok(toml::from_str::<AppConfig>(&s)?)
}

fn finalize(mut cfg: AppConfig, data_dir: &Path) -> anyhow::Result<AppConfig> {
    // File repository defaults to the data directory
    if let RepositoryProvider::File(ref mut file_cfg) = cfg.repository.provider {
        if file_cfg.directory.trim().is_empty() {
            file_cfg.directory = data_dir.join("mementos").to_string_lossy().to_string();
        }
    }

    // Update logging directory to use data directory if not set
    if cfg
        .logging
        .directory
        .as_deref()
        .map(|s| s.trim().is_empty())
        .unwrap_or(true)
    {
        let logs_dir = data_dir.join("logs");
        if cfg.logging.file {
            std::fs::create_dir_all(&logs_dir)?;
        }
        cfg.logging.directory = Some(logs_dir.to_string_lossy().to_string());
    }

    // Environment variable overrides (Priority 0: highest)
    if let Ok(v) = std::env::var("STATEKEEP_REPOSITORY_DIR") {
        if !v.trim().is_empty() {
            if let RepositoryProvider::File(ref mut file_cfg) = cfg.repository.provider {
                file_cfg.directory = v;
            }
        }
    }
    if let Ok(v) = std::env::var("STATEKEEP_LOG_LEVEL") {
        if !v.trim().is_empty() {
            cfg.logging.level = v;
        }
    }

    Ok(cfg)
}
