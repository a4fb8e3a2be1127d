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

use log::error;
use std::path::PathBuf;
use zbus::fdo;

#[derive(Debug, thiserror::Error)]
pub enum RegiondError {
    #[error("RegiondError::Busy: {0}")]
    Busy(String),
    #[error("RegiondError::NotFound: {0}")]
    NotFound(String),
    #[error("RegiondError::Unavailable: {0}")]
    Unavailable(String),
    #[error("RegiondError::Load: The configuration loader failed to apply the image: {0}")]
    Load(String),
    #[error("RegiondError::InterfaceOp: '{op}' failed on interface '{interface}': {source}")]
    InterfaceOp {
        interface: String,
        op: &'static str,
        #[source]
        source: Box<RegiondError>,
    },
    #[error("RegiondError::Argument: {0}")]
    Argument(String),
    #[error("RegiondError::IORead: An IO error occurred when reading from {file:?}: {e}")]
    IORead { file: PathBuf, e: std::io::Error },
    #[error("RegiondError::IOWrite: An IO error occurred when writing {data:?} to {file:?}: {e}")]
    IOWrite {
        data: String,
        file: PathBuf,
        e: std::io::Error,
    },
    #[error("RegiondError::IOReadDir: An IO error occurred when reading directory {dir:?}: {e}")]
    IOReadDir { dir: PathBuf, e: std::io::Error },
    #[error("RegiondError::TomlDe: Failed to parse {file:?}: {e}")]
    TomlDe { file: PathBuf, e: toml::de::Error },
    #[error("RegiondError::Internal: An internal error occurred: {0}")]
    Internal(String),
}

impl From<RegiondError> for fdo::Error {
    fn from(err: RegiondError) -> Self {
        error!("{err}");
        match err {
            RegiondError::Argument(..) => fdo::Error::InvalidArgs(err.to_string()),
            RegiondError::IORead { .. } => fdo::Error::IOError(err.to_string()),
            RegiondError::IOWrite { .. } => fdo::Error::IOError(err.to_string()),
            RegiondError::IOReadDir { .. } => fdo::Error::IOError(err.to_string()),
            _ => fdo::Error::Failed(err.to_string()),
        }
    }
}
