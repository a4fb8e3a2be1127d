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

//! DBus proxy interfaces for the regiond daemon.
//!
//! Auto-generated proxy traits (zbus `#[proxy]`) giving the CLI type-safe,
//! asynchronous access to the daemon:
//!
//! - **Service Name**: `com.canonical.regiond`
//! - **Control Interface**: `com.canonical.regiond.control` at `/com/canonical/regiond/control`
//! - **Status Interface**: `com.canonical.regiond.status` at `/com/canonical/regiond/status`

pub mod control_proxy;
pub mod status_proxy;
