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

use crate::comm::dbus::{firmware_relative, split_interface_csv, validate_handle};
use crate::error::RegiondError;
use crate::fabric::loader::ImageInfo;
use crate::fabric::registry::find_region;
use log::info;
use zbus::{fdo, interface};

pub struct ControlInterface {}

#[interface(name = "com.canonical.regiond.control")]
impl ControlInterface {
    /// Stage an image on a region and run the full programming sequence.
    ///
    /// `interface_csv` optionally names the gating interfaces the image
    /// needs, in enable order; empty means the region's own gating set. On
    /// success the gates remain exclusively held until
    /// `release_region_interfaces` is called. A `Busy` failure means another
    /// attempt is in flight somewhere in the chain; retrying is the
    /// caller's decision.
    async fn program_region(
        &self,
        region_handle: &str,
        firmware_path: &str,
        interface_csv: &str,
    ) -> Result<String, fdo::Error> {
        info!(
            "program_region called with region_handle: {region_handle}, firmware_path: \
            {firmware_path} and interfaces: {interface_csv}"
        );
        validate_handle("region", region_handle)?;
        if firmware_path.is_empty() {
            return Err(RegiondError::Argument(
                "A firmware path is required. Provided firmware path is empty.".into(),
            )
            .into());
        }
        let region = find_region(region_handle)?;
        region.set_pending_image(ImageInfo {
            firmware: firmware_relative(firmware_path)?,
            flags: None,
            interfaces: split_interface_csv(interface_csv),
            config: None,
        });
        region.program()?;
        Ok(format!(
            "{firmware_path} programmed into {region_handle}; gating interfaces {:?} remain held",
            region.interfaces().names()
        ))
    }

    /// Release the gating interfaces held since a successful programming,
    /// permitting the region to be reprogrammed.
    async fn release_region_interfaces(&self, region_handle: &str) -> Result<String, fdo::Error> {
        info!("release_region_interfaces called with region_handle: {region_handle}");
        validate_handle("region", region_handle)?;
        let region = find_region(region_handle)?;
        let names = region.interfaces().names();
        region.release_interfaces();
        Ok(format!(
            "released {} gating interface(s) of {region_handle}: {names:?}",
            names.len()
        ))
    }
}
