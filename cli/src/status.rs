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

use crate::proxies::status_proxy;
use zbus::Connection;

async fn connect_status_proxy() -> Result<status_proxy::StatusProxy<'static>, zbus::Error> {
    let connection = Connection::system().await?;
    status_proxy::StatusProxy::new(&connection).await
}

/// Gets the state of every registered interface and the held gating
/// interfaces of every region, and returns an ascii table as String.
pub async fn get_full_status_message() -> Result<String, zbus::Error> {
    let proxy = connect_status_proxy().await?;
    let mut ret_string = String::from("---- REGIONS ----\n| region | compat | held interfaces |\n");

    let regions = proxy.get_regions().await?;
    for region in regions.lines() {
        let compat = proxy
            .get_region_compat(region)
            .await
            .unwrap_or_else(|_| "-".to_string());
        let held = proxy.get_region_interfaces(region).await?;
        let held = if held.is_empty() {
            "-".to_string()
        } else {
            held.lines().collect::<Vec<_>>().join(",")
        };
        ret_string.push_str(&format!("| {region} | {compat} | {held} |\n"));
    }

    ret_string.push_str("---- INTERFACES ----\n| interface | state |\n");
    let interfaces = proxy.get_interfaces().await?;
    for interface in interfaces.lines() {
        let state = proxy.get_interface_state(interface).await?;
        ret_string.push_str(&format!("| {interface} | {state} |\n"));
    }

    Ok(ret_string)
}
