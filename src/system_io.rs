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

//! Error Wrapping File System I/O Helpers
//!
//! Thin wrappers around the standard file system operations with trace
//! logging and conversion to `RegiondError`, so every IO failure carries
//! the path and operation that produced it. All sysfs access in the daemon
//! funnels through these.

use crate::error::RegiondError;
use log::trace;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

/// Read the contents of a file to a String.
///
/// # Returns: `Result<String, RegiondError>`
/// * `Ok(String)` - The complete contents of the file
/// * `Err(RegiondError::IORead)` - The file cannot be read (doesn't exist, permissions, etc.)
pub fn fs_read(file_path: &Path) -> Result<String, RegiondError> {
    trace!("reading {file_path:?}");
    std::fs::read_to_string(file_path).map_err(|e| RegiondError::IORead {
        file: file_path.into(),
        e,
    })
}

/// Write a string value to a file.
///
/// Driver virtual files must already exist; `create` is only set when
/// writing ordinary files.
///
/// # Returns: `Result<(), RegiondError>`
/// * `Ok(())` - Write succeeded
/// * `Err(RegiondError::IOWrite)` - The write failed (permissions, file missing with create=false, etc.)
pub fn fs_write(file_path: &Path, create: bool, value: impl AsRef<str>) -> Result<(), RegiondError> {
    let data = value.as_ref();
    trace!("writing {data:?} to {file_path:?}");
    OpenOptions::new()
        .create(create)
        .write(true)
        .open(file_path)
        .and_then(|mut f| f.write_all(data.as_bytes()))
        .map_err(|e| RegiondError::IOWrite {
            data: data.to_string(),
            file: file_path.into(),
            e,
        })
}

/// Read a directory and return its entry names (not full paths). Entries
/// that cannot be read are silently skipped.
///
/// # Returns: `Result<Vec<String>, RegiondError>`
/// * `Ok(Vec<String>)` - Entry names in the directory
/// * `Err(RegiondError::IOReadDir)` - The directory cannot be read
pub fn fs_read_dir(dir: &Path) -> Result<Vec<String>, RegiondError> {
    trace!("listing {dir:?}");
    let entries = std::fs::read_dir(dir).map_err(|e| RegiondError::IOReadDir {
        dir: dir.to_owned(),
        e,
    })?;
    Ok(entries
        .filter_map(Result::ok)
        .map(|entry| entry.file_name().to_string_lossy().into_owned())
        .collect())
}
