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

//! FPGA region daemon (regiond) - system service arbitrating region
//! reprogramming.
//!
//! At startup the daemon reads its topology from `/etc/regiond/config.toml`,
//! creates and registers a gating interface per declared bridge and a region
//! per declared manager, then serves the programming protocol over DBus:
//!
//! - **Service Name**: `com.canonical.regiond`
//! - **Status Interface**: `/com/canonical/regiond/status` - Read-only operations
//! - **Control Interface**: `/com/canonical/regiond/control` - Programming protocol
//!
//! # Environment Variables
//!
//! - `RUST_LOG` - Controls logging level (`trace`, `debug`, `info`, `warn`,
//!   `error` or `off`). Defaults to `info`

use log::{info, warn};
use std::error::Error;
use std::future::pending;
use std::sync::Arc;
use zbus::connection;

use regiond::comm::dbus::{control_interface::ControlInterface, status_interface::StatusInterface};
use regiond::config;
use regiond::error::RegiondError;
use regiond::fabric::discovery::image_interface_discovery;
use regiond::fabric::interface::create_interface;
use regiond::fabric::loader::CompatTag;
use regiond::fabric::region::create_region;
use regiond::fabric::registry::{Liveness, register_interface, register_region};
use regiond::sysfs::bridge::SysfsBridge;
use regiond::sysfs::manager_loader::SysfsManagerLoader;
use regiond::sysfs::{list_bridges, list_managers};

/// Create and register every bridge interface and region the config file
/// declares.
///
/// The returned [`Liveness`] token backs every registered resource; it lives
/// for the whole daemon lifetime, so acquires only start failing
/// `Unavailable` during shutdown.
fn bootstrap_topology(topology: &config::TomlConfig) -> Result<Liveness, RegiondError> {
    let liveness = Liveness::new();

    // Devices may still probe after we start; a missing device is worth a
    // warning, not a refusal to register.
    let present_bridges = list_bridges().unwrap_or_else(|e| {
        warn!("could not enumerate fpga_bridge devices: {e}");
        Vec::new()
    });
    let present_managers = list_managers().unwrap_or_else(|e| {
        warn!("could not enumerate fpga_manager devices: {e}");
        Vec::new()
    });

    for entry in &topology.bridges {
        let device_handle = entry.device_handle.as_deref().unwrap_or(&entry.name);
        if !present_bridges.iter().any(|d| d == device_handle) {
            warn!(
                "bridge device '{device_handle}' is not present under {:?}",
                config::fpga_bridges_dir()
            );
        }
        let ops = Box::new(SysfsBridge::new(device_handle));
        let interface = create_interface(&entry.name, Some(ops), liveness.watch())?;
        register_interface(interface)?;
    }

    for entry in &topology.regions {
        if !present_managers.iter().any(|d| d == &entry.device_handle) {
            warn!(
                "manager device '{}' is not present under {:?}",
                entry.device_handle,
                config::fpga_managers_dir()
            );
        }
        let compat = entry
            .compat
            .as_deref()
            .map(CompatTag::from_hex)
            .transpose()?;
        let loader = Arc::new(SysfsManagerLoader::new(&entry.device_handle));
        let region = create_region(
            &entry.name,
            loader,
            liveness.watch(),
            compat,
            entry.bridges.clone(),
            Some(image_interface_discovery()),
        )?;
        register_region(region)?;
    }

    info!(
        "registered {} gating interface(s) and {} region(s)",
        topology.bridges.len(),
        topology.regions.len()
    );
    Ok(liveness)
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // The token must outlive the service: dropping it would revoke every
    // registered region and interface.
    let _liveness = bootstrap_topology(config::config())?;

    let status_interface = StatusInterface {};
    let control_interface = ControlInterface {};

    let _conn = connection::Builder::system()?
        .name("com.canonical.regiond")?
        .serve_at("/com/canonical/regiond/status", status_interface)?
        .serve_at("/com/canonical/regiond/control", control_interface)?
        .build()
        .await?;

    info!("Started com.canonical.regiond dbus service");
    // Do other things or go to wait forever
    pending::<()>().await;

    Ok(())
}
