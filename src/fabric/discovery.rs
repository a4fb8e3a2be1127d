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

//! Standard gating-interface discovery.
//!
//! Which interfaces gate a region comes from outside the programming core:
//! a [`DiscoverFn`] injected at region construction populates the region's
//! interface list for one attempt. The implementation here resolves the
//! names carried by the pending image (falling back to the region's own
//! gating set) through the interface registry, acquiring each in order.
//!
//! Discovery owns its own rollback: if any required interface cannot be
//! acquired, everything acquired so far is released before the error is
//! reported, so a failed discovery leaves no interface held.

use crate::error::RegiondError;
use crate::fabric::interface_list::acquire_to_list;
use crate::fabric::region::{DiscoverFn, Region};
use crate::fabric::registry;
use log::{debug, warn};
use std::collections::HashSet;

/// Build the standard discovery capability for a region.
///
/// For each interface name in the pending image (or in the region's default
/// gating set when the image names none): resolve it through the registry
/// and acquire it into the region's list, skipping names the image repeats.
/// Afterwards, run the configuration pass with the image's fragment, if it
/// carries one.
///
/// Acquisition order is enable order; the programming sequence disables in
/// reverse.
pub fn image_interface_discovery() -> DiscoverFn {
    Box::new(|region: &Region| {
        let image = region.pending_image().ok_or_else(|| {
            RegiondError::Argument(format!(
                "region '{}' has no pending image to discover interfaces from",
                region.name()
            ))
        })?;

        let names = if image.interfaces.is_empty() {
            region.default_interfaces().to_vec()
        } else {
            image.interfaces.clone()
        };

        // Interfaces still held from an earlier successful programming are
        // deliberately NOT skipped: re-acquiring them fails Busy, and the
        // rollback below then releases them along with everything else.
        // Only repeats within this run are skipped.
        let list = region.interfaces();
        let mut acquired_this_run: HashSet<&String> = HashSet::new();
        for name in &names {
            if acquired_this_run.contains(name) {
                debug!(
                    "interface '{name}' named twice for region '{}', skipping",
                    region.name()
                );
                continue;
            }
            let interface = match registry::find_interface(name) {
                Ok(interface) => interface,
                Err(e) => {
                    list.release_all();
                    return Err(e);
                }
            };
            if let Err(e) = acquire_to_list(&interface, list) {
                warn!(
                    "giving up on region '{}': interface '{name}' could not be acquired: {e}",
                    region.name()
                );
                list.release_all();
                return Err(e);
            }
            acquired_this_run.insert(name);
        }

        if let Some(fragment) = &image.config {
            if let Err(e) = list.configure_all(fragment) {
                list.release_all();
                return Err(e);
            }
        }

        Ok(())
    })
}
