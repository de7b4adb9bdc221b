// SPDX-License-Identifier: AGPL-3.0-or-later
// SPDX-FileCopyrightText: 2025 Jonathan D.A. Jewell
//! Configuration management

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory where reports, backups, and edited tables are written
    pub output_dir: PathBuf,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: directories::ProjectDirs::from("com", "hyperpolymath", "trackyard")
                .map(|d| d.data_dir().to_path_buf())
                .unwrap_or_else(|| PathBuf::from("~/.local/share/trackyard")),
            log_level: "info".to_string(),
        }
    }
}

/// Load configuration from disk or use defaults
pub fn load() -> Result<Config> {
    Ok(Config::default())
}

/// Resolve the output directory for a run.
///
/// Precedence: explicit `--output` flag, then `TRACKYARD_OUTPUT_DIR`, then an
/// `outputs/` directory next to the table file, then the platform data dir.
#[must_use]
pub fn resolve_output_dir(flag: Option<PathBuf>, table_path: Option<&Path>) -> PathBuf {
    if let Some(dir) = flag {
        return dir;
    }
    if let Ok(dir) = std::env::var("TRACKYARD_OUTPUT_DIR") {
        if !dir.is_empty() {
            return PathBuf::from(dir);
        }
    }
    if let Some(parent) = table_path.and_then(Path::parent) {
        return parent.join("outputs");
    }
    Config::default().output_dir
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flag_wins_over_table_location() {
        let dir = resolve_output_dir(
            Some(PathBuf::from("/tmp/explicit")),
            Some(Path::new("/data/table.json")),
        );
        assert_eq!(dir, PathBuf::from("/tmp/explicit"));
    }

    #[test]
    fn falls_back_to_outputs_beside_table() {
        // Only valid when the env override is not set in the test runner.
        if std::env::var("TRACKYARD_OUTPUT_DIR").is_err() {
            let dir = resolve_output_dir(None, Some(Path::new("/data/table.json")));
            assert_eq!(dir, PathBuf::from("/data/outputs"));
        }
    }
}
