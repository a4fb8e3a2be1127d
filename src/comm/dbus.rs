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

//! DBus surface of the daemon.
//!
//! Two interfaces, split by privilege: `control` carries the programming
//! protocol, `status` is read-only observability.

pub mod control_interface;
pub mod status_interface;

use crate::config;
use crate::error::RegiondError;
use std::path::{Path, PathBuf};

/// Helper function to check that a handle is a plausible registry name.
pub(crate) fn validate_handle(kind: &str, handle: &str) -> Result<(), RegiondError> {
    if handle.is_empty() || !handle.is_ascii() {
        return Err(RegiondError::Argument(format!(
            "'{handle}' is an invalid name for a {kind}. Names must be non-empty ascii."
        )));
    }
    Ok(())
}

/// Split a comma-separated interface list into trimmed, non-empty names.
pub(crate) fn split_interface_csv(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .collect()
}

/// Turn a caller-supplied bitstream path into the form the loader writes to
/// the firmware trigger: relative to the firmware search prefix.
///
/// Relative paths pass through untouched; absolute paths must live under the
/// configured prefix and are stripped down to the remainder.
///
/// # Returns: `Result<PathBuf, RegiondError>`
/// * `Ok(PathBuf)` - Path relative to the firmware search prefix
/// * `Err(RegiondError::Argument)` - Absolute path outside the prefix, or nothing left after stripping
pub(crate) fn firmware_relative(path_str: &str) -> Result<PathBuf, RegiondError> {
    let path = Path::new(path_str);
    if !path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let prefix = config::firmware_prefix();
    match path.strip_prefix(&prefix) {
        Ok(suffix) if !suffix.as_os_str().is_empty() => Ok(suffix.to_path_buf()),
        Ok(_) => Err(RegiondError::Argument(format!(
            "Stripping {prefix:?} from {path:?} left nothing to write to the fpga."
        ))),
        Err(_) => Err(RegiondError::Argument(format!(
            "Could not find {path:?} inside the firmware search prefix {prefix:?}."
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use googletest::prelude::*;
    use rstest::*;

    #[gtest]
    #[rstest]
    #[case::plain("br0,br1", vec!["br0", "br1"])]
    #[case::spaced(" br0 , br1 ", vec!["br0", "br1"])]
    #[case::empty("", Vec::<&str>::new())]
    #[case::stray_commas(",br0,,", vec!["br0"])]
    fn test_split_interface_csv(#[case] csv: &str, #[case] expected: Vec<&str>) {
        assert_that!(
            split_interface_csv(csv),
            eq(&expected
                .into_iter()
                .map(str::to_string)
                .collect::<Vec<String>>())
        );
    }

    #[gtest]
    #[rstest]
    #[case::relative_passes_through("design.bit.bin", "design.bit.bin")]
    #[case::absolute_in_prefix("/lib/firmware/design.bit.bin", "design.bit.bin")]
    #[case::nested_suffix_kept("/lib/firmware/xilinx/design.bit.bin", "xilinx/design.bit.bin")]
    fn test_firmware_relative_should_pass(#[case] source: &str, #[case] expected: &str) {
        let result = firmware_relative(source);
        assert_that!(result, ok(eq(&PathBuf::from(expected))));
    }

    #[gtest]
    fn test_firmware_relative_rejects_paths_outside_the_prefix() {
        assert_that!(
            firmware_relative("/opt/images/design.bit.bin"),
            err(displays_as(contains_substring(
                "inside the firmware search prefix"
            )))
        );
        assert_that!(
            firmware_relative("/lib/firmware/"),
            err(displays_as(contains_substring("left nothing to write")))
        );
    }

    #[gtest]
    fn test_validate_handle_rejects_empty_and_non_ascii() {
        assert_that!(
            validate_handle("region", ""),
            err(displays_as(contains_substring("invalid name")))
        );
        assert_that!(
            validate_handle("region", "région"),
            err(displays_as(contains_substring("invalid name")))
        );
        assert_that!(validate_handle("region", "region0"), ok(anything()));
    }
}
