// This file is part of regiond, a daemon which arbitrates exclusive access to reconfigurable FPGA regions and sequences their gating interfaces.
//
// Copyright 2025 Canonical Ltd.
//
// SPDX-License-Identifier: GPL-3.0-only
//
// regiond is free software: you can redistribute it and/or modify it under the terms of the GNU General Public License version 3, as published by the Free Software Foundation.
//
// regiond is distributed in the hope that it will be useful, but WITHOUT ANY WARRANTY; without even the implied warranties of MERCHANTABILITY, SATISFACTORY QUALITY, or FITNESS FOR A PARTICULAR PURPOSE.  See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with this program.  If not, see http://www.gnu.org/licenses/.

//! Daemon configuration.
//!
//! Two kinds of configuration live here: hardcoded fallback paths into sysfs,
//! and the optional `/etc/regiond/config.toml` file which may override those
//! paths and declares the static region/bridge topology the daemon
//! instantiates at startup. Discovering which manager and bridges serve a
//! region from the platform description (device tree or otherwise) is the
//! job of whatever produces this file, not of the daemon.

use crate::error::RegiondError;
use crate::system_io::fs_read;
use log::{trace, warn};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

// These are hardcoded backups to prevent crashing and lockups when the config
// file is missing or incomplete.
pub static FPGA_MANAGERS_DIR: &str = "/sys/class/fpga_manager/";
pub static FPGA_BRIDGES_DIR: &str = "/sys/class/fpga_bridge/";
pub static FW_PREFIX: &str = "/lib/firmware/";

static CONFIG_FILE: &str = "/etc/regiond/config.toml";

/// This is the top level struct which holds all sections
#[derive(Debug, Default, Deserialize)]
pub struct TomlConfig {
    system_paths: Option<SystemPaths>,
    #[serde(default)]
    pub bridges: Vec<BridgeEntry>,
    #[serde(default)]
    pub regions: Vec<RegionEntry>,
}

/// This is the "system_paths" section struct
#[derive(Debug, Default, Deserialize)]
struct SystemPaths {
    fpga_managers_dir: Option<String>,
    fpga_bridges_dir: Option<String>,
    firmware_prefix: Option<String>,
}

/// One gating bridge interface the daemon should create and register.
#[derive(Debug, Deserialize)]
pub struct BridgeEntry {
    /// Registry name of the interface; also the default sysfs directory name.
    pub name: String,
    /// Directory under the fpga_bridge class dir, when it differs from `name`.
    pub device_handle: Option<String>,
}

/// One reconfigurable region the daemon should create and register.
#[derive(Debug, Deserialize)]
pub struct RegionEntry {
    /// Registry name of the region.
    pub name: String,
    /// Directory of the manager that programs this region, under the
    /// fpga_manager class dir.
    pub device_handle: String,
    /// Optional 32-hex-digit compatibility tag.
    pub compat: Option<String>,
    /// Gating interfaces used when a pending image does not name its own.
    #[serde(default)]
    pub bridges: Vec<String>,
}

static CONFIG: OnceLock<TomlConfig> = OnceLock::new();

/// Parse a regiond config file.
///
/// # Returns: `Result<TomlConfig, RegiondError>`
/// * `Ok(TomlConfig)` - Parsed configuration
/// * `Err(RegiondError::IORead)` - Config file could not be read
/// * `Err(RegiondError::TomlDe)` - Config file is not valid TOML
pub fn config_from_file(config_path: &Path) -> Result<TomlConfig, RegiondError> {
    let toml_string = fs_read(config_path)?;
    toml::from_str(&toml_string).map_err(|e| RegiondError::TomlDe {
        file: config_path.to_path_buf(),
        e,
    })
}

fn init_config() -> TomlConfig {
    match config_from_file(&PathBuf::from(CONFIG_FILE)) {
        Ok(config) => {
            trace!("Successfully loaded config: {config:?}");
            config
        }
        Err(e) => {
            warn!("Using hardcoded paths and an empty topology because failed to load config: {e}");
            TomlConfig::default()
        }
    }
}

/// The process-wide configuration, loaded from [`CONFIG_FILE`] on first use.
pub fn config() -> &'static TomlConfig {
    CONFIG.get_or_init(init_config)
}

/// The fpga_manager class directory, possibly overridden by the config file.
pub fn fpga_managers_dir() -> PathBuf {
    PathBuf::from(
        config()
            .system_paths
            .as_ref()
            .and_then(|p| p.fpga_managers_dir.as_deref())
            .unwrap_or(FPGA_MANAGERS_DIR),
    )
}

/// The fpga_bridge class directory, possibly overridden by the config file.
pub fn fpga_bridges_dir() -> PathBuf {
    PathBuf::from(
        config()
            .system_paths
            .as_ref()
            .and_then(|p| p.fpga_bridges_dir.as_deref())
            .unwrap_or(FPGA_BRIDGES_DIR),
    )
}

/// The firmware search prefix bitstream paths are resolved against.
pub fn firmware_prefix() -> PathBuf {
    PathBuf::from(
        config()
            .system_paths
            .as_ref()
            .and_then(|p| p.firmware_prefix.as_deref())
            .unwrap_or(FW_PREFIX),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_topology_parses() {
        let parsed: TomlConfig = toml::from_str(
            r#"
            [system_paths]
            fpga_managers_dir = "/sys/class/fpga_manager/"

            [[bridges]]
            name = "br0"

            [[bridges]]
            name = "br1"
            device_handle = "fpga-bridge1"

            [[regions]]
            name = "region0"
            device_handle = "fpga0"
            compat = "0123456789abcdef0123456789abcdef"
            bridges = ["br0", "br1"]
            "#,
        )
        .expect("topology should parse");

        assert_eq!(parsed.bridges.len(), 2);
        assert_eq!(parsed.bridges[1].device_handle.as_deref(), Some("fpga-bridge1"));
        assert_eq!(parsed.regions.len(), 1);
        assert_eq!(parsed.regions[0].bridges, vec!["br0", "br1"]);
    }

    #[test]
    fn test_empty_config_parses() {
        let parsed: TomlConfig = toml::from_str("").expect("empty config should parse");
        assert!(parsed.bridges.is_empty());
        assert!(parsed.regions.is_empty());
        assert!(parsed.system_paths.is_none());
    }
}
