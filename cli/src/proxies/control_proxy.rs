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

use zbus::{Result, proxy};

#[proxy(
    default_service = "com.canonical.regiond",
    interface = "com.canonical.regiond.control",
    default_path = "/com/canonical/regiond/control"
)]
pub trait Control {
    async fn program_region(
        &self,
        region_handle: &str,
        firmware_path: &str,
        interface_csv: &str,
    ) -> Result<String>;

    async fn release_region_interfaces(&self, region_handle: &str) -> Result<String>;
}
