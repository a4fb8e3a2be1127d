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

use crate::comm::dbus::validate_handle;
use crate::error::RegiondError;
use crate::fabric::registry::{find_interface, find_region, list_interfaces, list_regions};
use log::info;
use zbus::{fdo, interface};

pub struct StatusInterface {}

#[interface(name = "com.canonical.regiond.status")]
impl StatusInterface {
    async fn get_regions(&self) -> Result<String, fdo::Error> {
        info!("get_regions called");
        Ok(list_regions()?.join("\n"))
    }

    async fn get_interfaces(&self) -> Result<String, fdo::Error> {
        info!("get_interfaces called");
        Ok(list_interfaces()?.join("\n"))
    }

    /// The region's compatibility tag, for callers that verify image/region
    /// compatibility before programming. regiond itself never enforces it.
    async fn get_region_compat(&self, region_handle: &str) -> Result<String, fdo::Error> {
        info!("get_region_compat called with region_handle: {region_handle}");
        validate_handle("region", region_handle)?;
        let region = find_region(region_handle)?;
        match region.compat() {
            Some(tag) => Ok(tag.to_string()),
            None => Err(RegiondError::NotFound(format!(
                "region '{region_handle}' has no compatibility tag"
            ))
            .into()),
        }
    }

    /// Names of the gating interfaces a region currently holds, in
    /// acquisition order. Empty unless a successful programming left them
    /// held.
    async fn get_region_interfaces(&self, region_handle: &str) -> Result<String, fdo::Error> {
        info!("get_region_interfaces called with region_handle: {region_handle}");
        validate_handle("region", region_handle)?;
        let region = find_region(region_handle)?;
        Ok(region.interfaces().names().join("\n"))
    }

    async fn get_interface_state(&self, interface_handle: &str) -> Result<String, fdo::Error> {
        info!("get_interface_state called with interface_handle: {interface_handle}");
        validate_handle("interface", interface_handle)?;
        let interface = find_interface(interface_handle)?;
        Ok(if interface.enabled() {
            "enabled".to_string()
        } else {
            "disabled".to_string()
        })
    }
}
