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

//! Configuration loader backed by the Linux FPGA manager subsystem.
//!
//! Loads bitstreams by driving an fpga_manager device through its sysfs
//! files: write the programming flags, write the firmware filename (which
//! triggers the kernel's own transfer), then verify the device reports the
//! `operating` state. Of the manager's sysfs files, only these are touched:
//!
//! - `flags` - Programming flags (hexadecimal format: "0x...")
//! - `firmware` - Trigger bitstream loading by writing the filename
//! - `state` - Current FPGA state (operating, unknown, write error, etc.)

use crate::config;
use crate::error::RegiondError;
use crate::fabric::loader::{ImageInfo, ImageLoader};
use crate::system_io::{fs_read, fs_write};
use log::{info, trace, warn};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

/// [`ImageLoader`] over `/sys/class/fpga_manager/<device>/`.
///
/// The loader lock is the daemon's own: the kernel serializes individual
/// sysfs writes but knows nothing about regiond's programming attempts, so
/// exclusivity across the whole flags/firmware/state sequence lives here.
#[derive(Debug)]
pub struct SysfsManagerLoader {
    device_handle: String,
    locked: AtomicBool,
}

impl SysfsManagerLoader {
    pub fn new(device_handle: &str) -> SysfsManagerLoader {
        SysfsManagerLoader {
            device_handle: device_handle.to_owned(),
            locked: AtomicBool::new(false),
        }
    }

    fn manager_dir(&self) -> PathBuf {
        config::fpga_managers_dir().join(&self.device_handle)
    }

    /// Read the manager's state file, trimmed.
    ///
    /// # Returns: `Result<String, RegiondError>`
    /// * `Ok(String)` - Current state (newlines trimmed)
    /// * `Err(RegiondError::IORead)` - Failed to read state file
    pub fn state(&self) -> Result<String, RegiondError> {
        let state_path = self.manager_dir().join("state");
        trace!("reading {state_path:?}");
        fs_read(&state_path).map(|s| s.trim_end_matches('\n').to_string())
    }

    /// Write the programming flags and verify them by reading back.
    fn set_flags(&self, flags: u32) -> Result<(), RegiondError> {
        let flag_path = self.manager_dir().join("flags");
        trace!("Writing 0x{flags:X} to {flag_path:?}");
        fs_write(&flag_path, false, format!("0x{flags:X}"))?;

        let contents = fs_read(&flag_path)?;
        let trimmed = contents.trim().trim_start_matches("0x");
        match u32::from_str_radix(trimmed, 16) {
            Ok(returned_flags) if returned_flags == flags => Ok(()),
            Ok(returned_flags) => Err(RegiondError::Load(format!(
                "setting {}'s flags to '{flags}' failed, resulting flags were '{returned_flags}'",
                self.device_handle
            ))),
            Err(_) => Err(RegiondError::Load(format!(
                "could not parse {}'s flags after setting them to '{flags}'",
                self.device_handle
            ))),
        }
    }
}

impl ImageLoader for SysfsManagerLoader {
    fn lock(&self) -> Result<(), RegiondError> {
        if self
            .locked
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(RegiondError::Busy(format!(
                "fpga manager '{}' is locked by another programming attempt",
                self.device_handle
            )));
        }
        trace!("locked fpga manager '{}'", self.device_handle);
        Ok(())
    }

    fn load(&self, info: &ImageInfo) -> Result<(), RegiondError> {
        if let Some(flags) = info.flags {
            self.set_flags(flags)?;
        }

        let control_path = self.manager_dir().join("firmware");
        fs_write(&control_path, false, info.firmware.to_string_lossy())?;

        match self.state()?.as_str() {
            "operating" => {
                info!("{}'s state is 'operating'", self.device_handle);
                Ok(())
            }
            state => {
                warn!("{}'s state is '{state}' after loading", self.device_handle);
                Err(RegiondError::Load(format!(
                    "after loading {:?}, {}'s state should be 'operating' but it is '{state}'",
                    info.firmware, self.device_handle
                )))
            }
        }
    }

    fn unlock(&self) {
        trace!("unlocked fpga manager '{}'", self.device_handle);
        self.locked.store(false, Ordering::Release);
    }
}
