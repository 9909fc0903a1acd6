//! Centralized path resolution for the copy-trading core.
//!
//! All file and directory paths are resolved through this module so that
//! terminal and service execution agree on the same layout across platforms.
//!
//! - **macOS**: `~/Library/Application Support/CopyTrader/`
//! - **Windows**: `%LOCALAPPDATA%\CopyTrader\`
//! - **Linux**: `$XDG_DATA_HOME/CopyTrader/` (fallback `~/.local/share/CopyTrader/`)
//!
//! ```text
//! ~/CopyTrader/
//! ├── data/
//! │ ├── config.toml
//! │ ├── hunter_store.json (+ .bak)
//! │ ├── trader_state.json (+ .bak)
//! │ ├── trading_history.jsonl
//! │ ├── token_blacklist.txt
//! │ ├── scanned_tokens.txt
//! │ └── .copytrader.lock
//! └── logs/
//!     └── copytrader_*.log
//! ```

use once_cell::sync::Lazy;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

static INITIALIZED: AtomicBool = AtomicBool::new(false);

static BASE_DIRECTORY: Lazy<PathBuf> = Lazy::new(|| {
    let base_dir = resolve_base_directory();
    INITIALIZED.store(true, Ordering::SeqCst);
    base_dir
});

fn resolve_base_directory() -> PathBuf {
    const APP_DIR: &str = "CopyTrader";

    if let Ok(dir) = std::env::var("COPYTRADER_DATA_DIR") {
        return PathBuf::from(dir);
    }

    if let Some(dir) = dirs::data_local_dir() {
        return dir.join(APP_DIR);
    }
    if let Some(dir) = dirs::data_dir() {
        return dir.join(APP_DIR);
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(APP_DIR);
    }

    PathBuf::from(APP_DIR)
}

pub fn get_base_directory() -> PathBuf {
    BASE_DIRECTORY.clone()
}

pub fn get_data_directory() -> PathBuf {
    BASE_DIRECTORY.join("data")
}

pub fn get_logs_directory() -> PathBuf {
    BASE_DIRECTORY.join("logs")
}

pub fn get_config_path() -> PathBuf {
    get_data_directory().join("config.toml")
}

pub fn get_hunter_store_path() -> PathBuf {
    get_data_directory().join("hunter_store.json")
}

pub fn get_trader_state_path() -> PathBuf {
    get_data_directory().join("trader_state.json")
}

pub fn get_trading_history_path() -> PathBuf {
    get_data_directory().join("trading_history.jsonl")
}

pub fn get_wallet_blacklist_path() -> PathBuf {
    get_data_directory().join("wallet_blacklist.txt")
}

pub fn get_wallet_trash_path() -> PathBuf {
    get_data_directory().join("wallet_trash.txt")
}

pub fn get_scanned_tokens_path() -> PathBuf {
    get_data_directory().join("scanned_tokens.txt")
}

pub fn get_mint_blacklist_path() -> PathBuf {
    get_data_directory().join("mint_blacklist.txt")
}

pub fn get_process_lock_path() -> PathBuf {
    get_data_directory().join(".copytrader.lock")
}

/// Returns `(primary_path, backup_path)` for a JSON store that must be
/// preceded by a backup copy before each save.
pub fn backup_pair(path: &std::path::Path) -> (PathBuf, PathBuf) {
    (path.to_path_buf(), path.with_extension("json.bak"))
}

pub fn ensure_all_directories() -> Result<(), String> {
    if !is_initialized() {
        eprintln!("Base directory: {}", get_base_directory().display());
    }

    for (name, dir) in [
        ("base", get_base_directory()),
        ("data", get_data_directory()),
        ("logs", get_logs_directory()),
    ] {
        if !dir.exists() {
            std::fs::create_dir_all(&dir).map_err(|e| {
                format!("Failed to create {} directory at {}: {}", name, dir.display(), e)
            })?;
        }
    }

    Ok(())
}

pub fn get_base_directory_display() -> String {
    BASE_DIRECTORY.display().to_string()
}

pub fn is_initialized() -> bool {
    INITIALIZED.load(Ordering::SeqCst)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn data_directory_is_subdir_of_base() {
        assert!(get_data_directory().starts_with(get_base_directory()));
    }

    #[test]
    fn logs_directory_is_subdir_of_base() {
        assert!(get_logs_directory().starts_with(get_base_directory()));
    }

    #[test]
    fn config_path_file_name() {
        assert_eq!(get_config_path().file_name().unwrap(), "config.toml");
    }

    #[test]
    fn backup_pair_shares_stem() {
        let (primary, backup) = backup_pair(&get_hunter_store_path());
        assert_ne!(primary, backup);
        assert!(backup.to_string_lossy().ends_with(".json.bak"));
    }
}
