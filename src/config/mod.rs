//! Database path resolution
//!
//! Finds the Beeper `index.db`: an explicit path wins, then the
//! `BEEPER_DB` environment variable, then the known per-platform install
//! locations.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::types::error::{BeelineError, Result};

const DB_ENV_VAR: &str = "BEEPER_DB";

pub fn resolve_db_path(explicit: Option<&Path>) -> Result<PathBuf> {
    if let Some(path) = explicit {
        let path = expand_path(path);
        if path.is_file() {
            return Ok(path);
        }
        return Err(BeelineError::Config(format!(
            "database not found at {}",
            path.display()
        )));
    }

    let mut tried: Vec<PathBuf> = Vec::new();

    if let Ok(env) = std::env::var(DB_ENV_VAR) {
        if !env.trim().is_empty() {
            let path = expand_path(Path::new(&env));
            if path.is_file() {
                debug!(path = %path.display(), "using database from {DB_ENV_VAR}");
                return Ok(path);
            }
            tried.push(path);
        }
    }

    for path in default_paths() {
        if path.is_file() {
            debug!(path = %path.display(), "using default database location");
            return Ok(path);
        }
        tried.push(path);
    }

    let tried: Vec<String> = tried.iter().map(|p| p.display().to_string()).collect();
    Err(BeelineError::Config(format!(
        "could not find Beeper database; tried: {}",
        tried.join(", ")
    )))
}

fn default_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    // The desktop app has shipped under both names.
    if let Some(home) = dirs::home_dir() {
        paths.push(home.join("Library/Application Support/BeeperTexts/index.db"));
        paths.push(home.join("Library/Application Support/Beeper/index.db"));
    }
    if let Some(config) = dirs::config_dir() {
        paths.push(config.join("BeeperTexts").join("index.db"));
        paths.push(config.join("Beeper").join("index.db"));
    }

    paths.dedup();
    paths
}

fn expand_path(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = dirs::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_path() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("index.db");
        std::fs::write(&db, b"").unwrap();

        assert_eq!(resolve_db_path(Some(&db)).unwrap(), db);

        let missing = tmp.path().join("nope.db");
        let err = resolve_db_path(Some(&missing)).err().unwrap();
        assert!(matches!(err, BeelineError::Config(_)));
    }

    #[test]
    fn test_env_override() {
        let tmp = tempfile::tempdir().unwrap();
        let db = tmp.path().join("index.db");
        std::fs::write(&db, b"").unwrap();

        std::env::set_var(DB_ENV_VAR, &db);
        assert_eq!(resolve_db_path(None).unwrap(), db);
        std::env::remove_var(DB_ENV_VAR);
    }

    #[test]
    fn test_tilde_expansion() {
        let expanded = expand_path(Path::new("~/some/index.db"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expanded, home.join("some/index.db"));
        }
    }
}
