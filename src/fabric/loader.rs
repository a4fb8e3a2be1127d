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

//! The configuration-loader contract and the image descriptor it consumes.
//!
//! The loader is an external collaborator: regiond locks it, hands it the
//! region's pending [`ImageInfo`] between the disable and enable passes, and
//! unlocks it afterwards. What "loading" means (sysfs firmware write, vendor
//! SDK call, test double) is entirely the implementor's business.

use crate::error::RegiondError;
use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;

/// Contract the configuration loader fulfils towards the programming
/// sequence.
///
/// `lock`/`unlock` bracket one programming attempt; `lock` must never block
/// and fails `Busy` when another attempt is in flight.
pub trait ImageLoader: Send + Sync {
    /// Take the loader for exclusive use.
    ///
    /// # Returns: `Result<(), RegiondError>`
    /// * `Ok(())` - Loader is now exclusively ours
    /// * `Err(RegiondError::Busy)` - Another programming attempt holds the loader
    fn lock(&self) -> Result<(), RegiondError>;

    /// Transfer the image into the fabric. Called with the loader locked and
    /// every gating interface disabled. The loader does not retry.
    fn load(&self, info: &ImageInfo) -> Result<(), RegiondError>;

    /// Release the loader after a programming attempt, successful or not.
    fn unlock(&self);
}

/// Descriptor of one configuration image, set on a region before
/// programming it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageInfo {
    /// Bitstream path, relative to the firmware search prefix.
    pub firmware: PathBuf,
    /// Optional programming flags word for the manager.
    #[serde(default)]
    pub flags: Option<u32>,
    /// Names of the gating interfaces this image needs quiesced, in enable
    /// order. Empty means "use the region's own gating set".
    #[serde(default)]
    pub interfaces: Vec<String>,
    /// Optional per-interface configuration applied after acquisition.
    #[serde(default)]
    pub config: Option<ConfigFragment>,
}

/// A fragment of hierarchical configuration description.
///
/// Interfaces pick the child fragment matching their own name out of the
/// tree; regiond never interprets the properties itself.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFragment {
    pub name: String,
    #[serde(default)]
    pub properties: HashMap<String, String>,
    #[serde(default)]
    pub children: Vec<ConfigFragment>,
}

impl ConfigFragment {
    /// Depth-first search for a descendant fragment with the given name.
    pub fn child(&self, name: &str) -> Option<&ConfigFragment> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.children.iter().find_map(|c| c.child(name)))
    }
}

/// Opaque 128-bit compatibility tag callers use to match images to regions.
/// Immutable once set on a region; regiond only stores and displays it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompatTag {
    pub msb: u64,
    pub lsb: u64,
}

impl CompatTag {
    /// Parse a tag from its canonical 32-hex-digit form.
    ///
    /// # Returns: `Result<CompatTag, RegiondError>`
    /// * `Ok(CompatTag)` - Parsed tag
    /// * `Err(RegiondError::Argument)` - Input is not 32 hex digits
    pub fn from_hex(s: &str) -> Result<Self, RegiondError> {
        if s.len() != 32 || !s.is_ascii() {
            return Err(RegiondError::Argument(format!(
                "'{s}' is not a valid compatibility tag: expected 32 hex digits"
            )));
        }
        let (high, low) = s.split_at(16);
        let msb = u64::from_str_radix(high, 16).map_err(|_| {
            RegiondError::Argument(format!("'{s}' is not a valid compatibility tag"))
        })?;
        let lsb = u64::from_str_radix(low, 16).map_err(|_| {
            RegiondError::Argument(format!("'{s}' is not a valid compatibility tag"))
        })?;
        Ok(CompatTag { msb, lsb })
    }
}

impl fmt::Display for CompatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}{:016x}", self.msb, self.lsb)
    }
}
