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

//! Gating-interface provider backed by the Linux FPGA bridge subsystem.
//!
//! Drives one fpga_bridge device through its sysfs files: `set` gates
//! transactions on or off, `state` reports `enabled`/`disabled`. Configure
//! writes the fragment's properties as files under the bridge directory,
//! which is how out-of-tree bridge drivers expose tunables.

use crate::config;
use crate::error::RegiondError;
use crate::fabric::interface::InterfaceOps;
use crate::fabric::loader::ConfigFragment;
use crate::system_io::{fs_read, fs_write};
use log::{trace, warn};
use std::path::PathBuf;

/// [`InterfaceOps`] over `/sys/class/fpga_bridge/<device>/`.
#[derive(Debug)]
pub struct SysfsBridge {
    device_handle: String,
}

impl SysfsBridge {
    pub fn new(device_handle: &str) -> SysfsBridge {
        SysfsBridge {
            device_handle: device_handle.to_owned(),
        }
    }

    fn bridge_dir(&self) -> PathBuf {
        config::fpga_bridges_dir().join(&self.device_handle)
    }
}

impl InterfaceOps for SysfsBridge {
    fn enable_show(&self) -> Option<bool> {
        let state_path = self.bridge_dir().join("state");
        match fs_read(&state_path) {
            Ok(state) => match state.trim_end_matches('\n') {
                "enabled" => Some(true),
                "disabled" => Some(false),
                other => {
                    warn!(
                        "bridge '{}' reports unexpected state '{other}'",
                        self.device_handle
                    );
                    None
                }
            },
            Err(e) => {
                warn!("could not read bridge '{}' state: {e}", self.device_handle);
                None
            }
        }
    }

    fn enable_set(&self, enable: bool) -> Result<(), RegiondError> {
        let set_path = self.bridge_dir().join("set");
        trace!(
            "writing '{}' to {set_path:?}",
            if enable { "1" } else { "0" }
        );
        fs_write(&set_path, false, if enable { "1" } else { "0" })
    }

    fn configure(&self, fragment: &ConfigFragment) -> Result<(), RegiondError> {
        // Deterministic application order; fragment properties are unordered.
        let mut keys: Vec<&String> = fragment.properties.keys().collect();
        keys.sort();
        for key in keys {
            let value = &fragment.properties[key];
            fs_write(&self.bridge_dir().join(key), false, value)?;
        }
        Ok(())
    }
}
