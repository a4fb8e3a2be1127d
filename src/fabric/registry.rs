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

//! Identity allocation, provider liveness and the named resource registries.
//!
//! Regions and interfaces get stable numeric ids from per-kind [`IdPool`]s
//! (monotonically allocated, reused only after release) and become
//! discoverable by name once registered here. The discovery collaborator
//! resolves gating-interface names through [`find_interface`].
//!
//! Liveness is a strong/weak pair: the collaborator that owns a resource
//! holds a [`Liveness`] token and hands the resource a [`LivenessWatch`].
//! Acquiring the resource upgrades the watch; once the owner drops its
//! token, every subsequent acquire fails `Unavailable`.

use crate::error::RegiondError;
use crate::fabric::interface::RegionInterface;
use crate::fabric::region::Region;
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex, OnceLock, Weak};

/// Allocator for stable resource ids.
///
/// Ids increase monotonically; a released id goes to a free list and is the
/// first candidate for reuse (lowest free id wins).
#[derive(Debug, Default)]
pub struct IdPool {
    next: usize,
    free: BTreeSet<usize>,
}

impl IdPool {
    pub const fn new() -> Self {
        IdPool {
            next: 0,
            free: BTreeSet::new(),
        }
    }

    /// Allocate the lowest free id, or the next unused one.
    pub fn alloc(&mut self) -> usize {
        if let Some(&id) = self.free.iter().next() {
            self.free.remove(&id);
            return id;
        }
        let id = self.next;
        self.next += 1;
        id
    }

    /// Return an id to the pool for reuse.
    pub fn release(&mut self, id: usize) {
        if id < self.next {
            self.free.insert(id);
        }
    }
}

/// Strong half of the liveness pair, held by the collaborator that owns a
/// resource. Dropping it revokes every watch derived from it.
#[derive(Debug, Clone, Default)]
pub struct Liveness(Arc<()>);

impl Liveness {
    pub fn new() -> Self {
        Liveness(Arc::new(()))
    }

    /// Derive the weak half for embedding in a resource.
    pub fn watch(&self) -> LivenessWatch {
        LivenessWatch(Arc::downgrade(&self.0))
    }
}

/// Weak half of the liveness pair, embedded in each Region and interface.
#[derive(Debug, Clone)]
pub struct LivenessWatch(Weak<()>);

impl LivenessWatch {
    /// A watch whose owner is already gone; every [`hold`](Self::hold) fails.
    pub fn revoked() -> Self {
        LivenessWatch(Weak::new())
    }

    /// Take a strong reference on the owning collaborator, pinning it for as
    /// long as the returned value lives. `None` once the owner dropped its
    /// [`Liveness`] token.
    pub fn hold(&self) -> Option<LivenessRef> {
        self.0.upgrade().map(|token| LivenessRef { _token: token })
    }
}

/// A held liveness reference; keeps the owning collaborator pinned.
#[derive(Debug)]
pub struct LivenessRef {
    _token: Arc<()>,
}

pub(crate) static INTERFACE_IDS: Mutex<IdPool> = Mutex::new(IdPool::new());
pub(crate) static REGION_IDS: Mutex<IdPool> = Mutex::new(IdPool::new());

static INTERFACE_REGISTRY: OnceLock<Mutex<HashMap<String, Arc<RegionInterface>>>> = OnceLock::new();
static REGION_REGISTRY: OnceLock<Mutex<HashMap<String, Arc<Region>>>> = OnceLock::new();

fn interface_registry() -> &'static Mutex<HashMap<String, Arc<RegionInterface>>> {
    INTERFACE_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

fn region_registry() -> &'static Mutex<HashMap<String, Arc<Region>>> {
    REGION_REGISTRY.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Make an interface discoverable by name.
///
/// # Returns: `Result<(), RegiondError>`
/// * `Ok(())` - Interface registered
/// * `Err(RegiondError::Argument)` - An interface with this name already exists
pub fn register_interface(interface: Arc<RegionInterface>) -> Result<(), RegiondError> {
    let mut registry = interface_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock interface registry".to_string()))?;
    if registry.contains_key(interface.name()) {
        return Err(RegiondError::Argument(format!(
            "An interface named '{}' is already registered.",
            interface.name()
        )));
    }
    info!("fpga region interface [{}] registered", interface.name());
    registry.insert(interface.name().to_string(), interface);
    Ok(())
}

/// Remove an interface from the registry.
///
/// If the low level provider has a method for putting the interface into a
/// desired state upon unregister, it is invoked here.
///
/// # Returns: `Result<Arc<RegionInterface>, RegiondError>`
/// * `Ok(Arc<RegionInterface>)` - The unregistered interface
/// * `Err(RegiondError::NotFound)` - No interface with this name is registered
pub fn unregister_interface(name: &str) -> Result<Arc<RegionInterface>, RegiondError> {
    let interface = interface_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock interface registry".to_string()))?
        .remove(name)
        .ok_or_else(|| {
            RegiondError::NotFound(format!("No interface named '{name}' is registered."))
        })?;
    interface.teardown();
    debug!("fpga region interface [{name}] unregistered");
    Ok(interface)
}

/// Look an interface up by name.
///
/// # Returns: `Result<Arc<RegionInterface>, RegiondError>`
/// * `Ok(Arc<RegionInterface>)` - The registered interface
/// * `Err(RegiondError::NotFound)` - No interface with this name is registered
pub fn find_interface(name: &str) -> Result<Arc<RegionInterface>, RegiondError> {
    interface_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock interface registry".to_string()))?
        .get(name)
        .cloned()
        .ok_or_else(|| RegiondError::NotFound(format!("No interface named '{name}' is registered.")))
}

/// Names of all registered interfaces, sorted.
pub fn list_interfaces() -> Result<Vec<String>, RegiondError> {
    let mut names: Vec<String> = interface_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock interface registry".to_string()))?
        .keys()
        .cloned()
        .collect();
    names.sort();
    Ok(names)
}

/// Make a region discoverable by name.
///
/// # Returns: `Result<(), RegiondError>`
/// * `Ok(())` - Region registered
/// * `Err(RegiondError::Argument)` - A region with this name already exists
pub fn register_region(region: Arc<Region>) -> Result<(), RegiondError> {
    let mut registry = region_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock region registry".to_string()))?;
    if registry.contains_key(region.name()) {
        return Err(RegiondError::Argument(format!(
            "A region named '{}' is already registered.",
            region.name()
        )));
    }
    info!("fpga region [{}] registered", region.name());
    registry.insert(region.name().to_string(), region);
    Ok(())
}

/// Remove a region from the registry.
///
/// # Returns: `Result<Arc<Region>, RegiondError>`
/// * `Ok(Arc<Region>)` - The unregistered region
/// * `Err(RegiondError::NotFound)` - No region with this name is registered
pub fn unregister_region(name: &str) -> Result<Arc<Region>, RegiondError> {
    let region = region_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock region registry".to_string()))?
        .remove(name)
        .ok_or_else(|| RegiondError::NotFound(format!("No region named '{name}' is registered.")))?;
    debug!("fpga region [{name}] unregistered");
    Ok(region)
}

/// Look a region up by name.
///
/// # Returns: `Result<Arc<Region>, RegiondError>`
/// * `Ok(Arc<Region>)` - The registered region
/// * `Err(RegiondError::NotFound)` - No region with this name is registered
pub fn find_region(name: &str) -> Result<Arc<Region>, RegiondError> {
    region_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock region registry".to_string()))?
        .get(name)
        .cloned()
        .ok_or_else(|| RegiondError::NotFound(format!("No region named '{name}' is registered.")))
}

/// Names of all registered regions, sorted.
pub fn list_regions() -> Result<Vec<String>, RegiondError> {
    let mut names: Vec<String> = region_registry()
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock region registry".to_string()))?
        .keys()
        .cloned()
        .collect();
    names.sort();
    Ok(names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_pool_allocates_monotonically() {
        let mut pool = IdPool::new();
        assert_eq!(pool.alloc(), 0);
        assert_eq!(pool.alloc(), 1);
        assert_eq!(pool.alloc(), 2);
    }

    #[test]
    fn test_id_pool_reuses_lowest_released_id() {
        let mut pool = IdPool::new();
        for _ in 0..4 {
            pool.alloc();
        }
        pool.release(2);
        pool.release(0);
        assert_eq!(pool.alloc(), 0, "lowest released id should come back first");
        assert_eq!(pool.alloc(), 2);
        assert_eq!(pool.alloc(), 4, "fresh ids resume after the free list drains");
    }

    #[test]
    fn test_id_pool_ignores_never_allocated_ids() {
        let mut pool = IdPool::new();
        pool.release(17);
        assert_eq!(pool.alloc(), 0);
    }

    #[test]
    fn test_liveness_watch_holds_while_token_lives() {
        let token = Liveness::new();
        let watch = token.watch();
        let held = watch.hold();
        assert!(held.is_some());
        drop(token);
        // The outstanding reference keeps the owner pinned.
        assert!(watch.hold().is_some());
        drop(held);
        assert!(watch.hold().is_none());
    }

    #[test]
    fn test_revoked_watch_never_holds() {
        assert!(LivenessWatch::revoked().hold().is_none());
    }

    #[test]
    fn test_interface_lifecycle_register_find_unregister_destroy() {
        use crate::fabric::interface::{create_interface, destroy_interface};

        let owner = Liveness::new();
        let iface = create_interface("life-br", None, owner.watch()).unwrap();
        register_interface(Arc::clone(&iface)).unwrap();

        assert!(find_interface("life-br").is_ok());
        assert!(list_interfaces().unwrap().contains(&"life-br".to_string()));
        assert!(
            matches!(
                register_interface(Arc::clone(&iface)),
                Err(RegiondError::Argument(_))
            ),
            "duplicate names are rejected"
        );

        let unregistered = unregister_interface("life-br").unwrap();
        assert!(matches!(
            find_interface("life-br"),
            Err(RegiondError::NotFound(_))
        ));
        drop(iface);
        destroy_interface(unregistered);
    }

    #[test]
    fn test_unregister_interface_runs_the_teardown_capability() {
        use crate::fabric::interface::{InterfaceOps, create_interface};
        use std::sync::atomic::{AtomicBool, Ordering};

        struct TeardownProbe {
            torn_down: Arc<AtomicBool>,
        }

        impl InterfaceOps for TeardownProbe {
            fn teardown(&self) {
                self.torn_down.store(true, Ordering::SeqCst);
            }
        }

        let owner = Liveness::new();
        let torn_down = Arc::new(AtomicBool::new(false));
        let ops = Box::new(TeardownProbe {
            torn_down: Arc::clone(&torn_down),
        });
        let iface = create_interface("teardown-br", Some(ops), owner.watch()).unwrap();
        register_interface(iface).unwrap();

        unregister_interface("teardown-br").unwrap();
        assert!(
            torn_down.load(Ordering::SeqCst),
            "unregister must give the provider its teardown call"
        );
    }

    #[test]
    fn test_region_lifecycle_register_find_unregister_destroy() {
        use crate::fabric::loader::{ImageInfo, ImageLoader};
        use crate::fabric::region::{create_region, destroy_region};

        struct NullLoader;

        impl ImageLoader for NullLoader {
            fn lock(&self) -> Result<(), RegiondError> {
                Ok(())
            }

            fn load(&self, _info: &ImageInfo) -> Result<(), RegiondError> {
                Ok(())
            }

            fn unlock(&self) {}
        }

        let owner = Liveness::new();
        let region = create_region(
            "life-region",
            Arc::new(NullLoader),
            owner.watch(),
            None,
            vec![],
            None,
        )
        .unwrap();
        register_region(Arc::clone(&region)).unwrap();

        assert!(find_region("life-region").is_ok());
        assert!(list_regions().unwrap().contains(&"life-region".to_string()));

        let unregistered = unregister_region("life-region").unwrap();
        assert!(matches!(
            find_region("life-region"),
            Err(RegiondError::NotFound(_))
        ));
        drop(region);
        destroy_region(unregistered);
    }
}
