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

//! Hardware-facing providers over the Linux FPGA sysfs classes.

pub mod bridge;
pub mod manager_loader;

use crate::config;
use crate::error::RegiondError;
use crate::system_io::fs_read_dir;

/// List all fpga_manager device handles present in the system.
///
/// # Returns: `Result<Vec<String>, RegiondError>`
/// * `Ok(Vec<String>)` - Device handles (e.g. ["fpga0", "fpga1"])
/// * `Err(RegiondError::IOReadDir)` - Failed to read the class directory
pub fn list_managers() -> Result<Vec<String>, RegiondError> {
    fs_read_dir(&config::fpga_managers_dir())
}

/// List all fpga_bridge device handles present in the system.
///
/// # Returns: `Result<Vec<String>, RegiondError>`
/// * `Ok(Vec<String>)` - Device handles (e.g. ["br0", "br1"])
/// * `Err(RegiondError::IOReadDir)` - Failed to read the class directory
pub fn list_bridges() -> Result<Vec<String>, RegiondError> {
    fs_read_dir(&config::fpga_bridges_dir())
}
