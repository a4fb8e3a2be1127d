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

//! Ordered collection of acquired gating interfaces.
//!
//! Insertion order is acquisition order is enable order; disable always
//! walks the list in reverse, so the gate established last is removed
//! first. The inner mutex covers only list bookkeeping (push, snapshot,
//! drain) — the enable/disable/configure calls themselves run outside that
//! window, so a slow hardware operation on one region's gates never blocks
//! another region's bookkeeping.

use crate::error::RegiondError;
use crate::fabric::interface::{InterfaceHandle, RegionInterface};
use log::trace;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// Ordered, mutation-safe list of held [`InterfaceHandle`]s.
///
/// Membership implies the interface's exclusive lock is held by this list's
/// owner.
#[derive(Debug, Default)]
pub struct InterfaceList {
    entries: Mutex<Vec<InterfaceHandle>>,
}

impl InterfaceList {
    pub fn new() -> Self {
        InterfaceList {
            entries: Mutex::new(Vec::new()),
        }
    }

    // A poisoned entries mutex would otherwise skip releases; the vec is
    // consistent after any panic since push/drain never unwind mid-update.
    fn lock_entries(&self) -> MutexGuard<'_, Vec<InterfaceHandle>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a held interface; it will be enabled last and disabled first.
    pub fn push(&self, handle: InterfaceHandle) {
        self.lock_entries().push(handle);
    }

    /// Snapshot the member interfaces in acquisition order.
    fn snapshot(&self) -> Vec<Arc<RegionInterface>> {
        self.lock_entries()
            .iter()
            .map(|handle| Arc::clone(handle.interface()))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_entries().is_empty()
    }

    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    /// Whether an interface with the given name is already a member.
    pub fn contains(&self, name: &str) -> bool {
        self.lock_entries()
            .iter()
            .any(|handle| handle.name() == name)
    }

    /// Member names in acquisition order.
    pub fn names(&self) -> Vec<String> {
        self.lock_entries()
            .iter()
            .map(|handle| handle.name().to_string())
            .collect()
    }

    /// Enable every member, in acquisition order.
    ///
    /// Stops at the first failure and leaves the partial enablement as-is;
    /// unwinding is the programming sequence's responsibility, not the
    /// sequencer's.
    ///
    /// # Returns: `Result<(), RegiondError>`
    /// * `Ok(())` - Every member enabled (or the list is empty)
    /// * `Err(RegiondError::InterfaceOp)` - First enable failure, naming the interface
    pub fn enable_all(&self) -> Result<(), RegiondError> {
        for interface in self.snapshot() {
            interface
                .enable()
                .map_err(|e| RegiondError::InterfaceOp {
                    interface: interface.name().to_string(),
                    op: "enable",
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Disable every member, in reverse acquisition order.
    ///
    /// Reverse order is mandatory: the gate enabled last sits closest to the
    /// region and must come down first. Stops at the first failure.
    ///
    /// # Returns: `Result<(), RegiondError>`
    /// * `Ok(())` - Every member disabled (or the list is empty)
    /// * `Err(RegiondError::InterfaceOp)` - First disable failure, naming the interface
    pub fn disable_all(&self) -> Result<(), RegiondError> {
        for interface in self.snapshot().iter().rev() {
            interface
                .disable()
                .map_err(|e| RegiondError::InterfaceOp {
                    interface: interface.name().to_string(),
                    op: "disable",
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Run the configuration pass over every member, in acquisition order.
    ///
    /// Members without a matching sub-fragment (or without a configure
    /// capability) are skipped successfully.
    pub fn configure_all(
        &self,
        fragment: &crate::fabric::loader::ConfigFragment,
    ) -> Result<(), RegiondError> {
        for interface in self.snapshot() {
            interface
                .configure(fragment)
                .map_err(|e| RegiondError::InterfaceOp {
                    interface: interface.name().to_string(),
                    op: "configure",
                    source: Box::new(e),
                })?;
        }
        Ok(())
    }

    /// Release every member and empty the list.
    ///
    /// Best-effort and unconditional: every handle is dropped whatever the
    /// state of its neighbours, because a skipped release is a leaked gate.
    pub fn release_all(&self) {
        let drained: Vec<InterfaceHandle> = {
            let mut entries = self.lock_entries();
            entries.drain(..).collect()
        };
        trace!("releasing {} interface(s)", drained.len());
        for handle in drained {
            handle.release();
        }
    }
}

/// Get an exclusive reference to `interface` and append it to `list`.
///
/// # Returns: `Result<(), RegiondError>`
/// * `Ok(())` - Interface acquired and now a member
/// * `Err(RegiondError::Busy)` - Interface already in use
/// * `Err(RegiondError::Unavailable)` - Interface's provider no longer loaded
pub fn acquire_to_list(
    interface: &Arc<RegionInterface>,
    list: &InterfaceList,
) -> Result<(), RegiondError> {
    let handle = interface.acquire()?;
    list.push(handle);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fabric::interface::{InterfaceOps, create_interface};
    use crate::fabric::registry::Liveness;
    use std::sync::atomic::{AtomicBool, Ordering};

    struct RecordingOps {
        name: String,
        log: Arc<Mutex<Vec<String>>>,
        fail: AtomicBool,
    }

    impl InterfaceOps for RecordingOps {
        fn enable_set(&self, enable: bool) -> Result<(), RegiondError> {
            let verb = if enable { "enable" } else { "disable" };
            self.log.lock().unwrap().push(format!("{verb} {}", self.name));
            if self.fail.load(Ordering::SeqCst) {
                return Err(RegiondError::Internal(format!(
                    "injected {verb} failure on {}",
                    self.name
                )));
            }
            Ok(())
        }
    }

    fn listed(names: &[&str], log: &Arc<Mutex<Vec<String>>>, owner: &Liveness) -> InterfaceList {
        let list = InterfaceList::new();
        for &name in names {
            let ops = Box::new(RecordingOps {
                name: name.to_string(),
                log: Arc::clone(log),
                fail: AtomicBool::new(false),
            });
            let iface = create_interface(name, Some(ops), owner.watch()).unwrap();
            acquire_to_list(&iface, &list).unwrap();
        }
        list
    }

    #[test]
    fn test_enable_all_runs_forward() {
        let owner = Liveness::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let list = listed(&["a", "b", "c"], &log, &owner);

        list.enable_all().unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enable a", "enable b", "enable c"]
        );
    }

    #[test]
    fn test_disable_all_runs_in_reverse() {
        let owner = Liveness::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let list = listed(&["a", "b", "c"], &log, &owner);

        list.disable_all().unwrap();
        assert_eq!(
            *log.lock().unwrap(),
            vec!["disable c", "disable b", "disable a"]
        );
    }

    #[test]
    fn test_enable_all_stops_on_first_failure() {
        let owner = Liveness::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let list = InterfaceList::new();
        for (name, fail) in [("a", false), ("b", true), ("c", false)] {
            let ops = Box::new(RecordingOps {
                name: name.to_string(),
                log: Arc::clone(&log),
                fail: AtomicBool::new(fail),
            });
            let iface = create_interface(name, Some(ops), owner.watch()).unwrap();
            acquire_to_list(&iface, &list).unwrap();
        }

        let err = list.enable_all().unwrap_err();
        match err {
            RegiondError::InterfaceOp { interface, op, .. } => {
                assert_eq!(interface, "b");
                assert_eq!(op, "enable");
            }
            other => panic!("expected InterfaceOp, got {other:?}"),
        }
        assert_eq!(
            *log.lock().unwrap(),
            vec!["enable a", "enable b"],
            "c must not be touched after b failed"
        );
    }

    #[test]
    fn test_release_all_empties_and_frees_every_member() {
        let owner = Liveness::new();
        let list = InterfaceList::new();
        let ifaces: Vec<_> = ["x", "y"]
            .iter()
            .map(|&name| create_interface(name, None, owner.watch()).unwrap())
            .collect();
        for iface in &ifaces {
            acquire_to_list(iface, &list).unwrap();
        }
        assert_eq!(list.len(), 2);

        list.release_all();
        assert!(list.is_empty());
        for iface in &ifaces {
            assert!(!iface.is_held(), "'{}' should be free again", iface.name());
        }
    }

    #[test]
    fn test_acquire_to_list_does_not_insert_on_busy() {
        let owner = Liveness::new();
        let iface = create_interface("taken", None, owner.watch()).unwrap();
        let _held = iface.acquire().unwrap();

        let list = InterfaceList::new();
        assert!(matches!(
            acquire_to_list(&iface, &list),
            Err(RegiondError::Busy(_))
        ));
        assert!(list.is_empty());
    }

    #[test]
    fn test_contains_and_names_track_membership() {
        let owner = Liveness::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let list = listed(&["a", "b"], &log, &owner);
        assert!(list.contains("a"));
        assert!(!list.contains("z"));
        assert_eq!(list.names(), vec!["a", "b"]);
    }
}
