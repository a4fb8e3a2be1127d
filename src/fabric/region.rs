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

//! Reconfigurable regions and the programming sequence.
//!
//! A region is the resource being reprogrammed: it references its
//! configuration loader, carries the pending image descriptor and owns the
//! list of gating interfaces acquired for the current programming attempt.
//!
//! [`Region::program`] is the end-to-end sequence: acquire the region, lock
//! the loader, discover and acquire the gating interfaces, disable them in
//! reverse order, load the image, enable them in forward order, release the
//! loader and the region. Every stage failure unwinds exactly what earlier
//! stages acquired, in reverse, so no lock survives a failed attempt. The
//! one deliberate asymmetry: a successful attempt leaves the gating
//! interfaces held, transferring their ownership to the caller, who permits
//! future reprogramming by calling [`Region::release_interfaces`] when it is
//! safe to do so.

use crate::error::RegiondError;
use crate::fabric::interface_list::InterfaceList;
use crate::fabric::loader::{CompatTag, ImageInfo, ImageLoader};
use crate::fabric::registry::{self, LivenessRef, LivenessWatch};
use log::{error, info, trace};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

/// Optional capability that populates a region's interface list for one
/// programming attempt. Supplied at construction; a region without one is
/// assumed to have no gating interfaces.
pub type DiscoverFn = Box<dyn Fn(&Region) -> Result<(), RegiondError> + Send + Sync>;

/// One reconfigurable region and everything a programming attempt needs.
pub struct Region {
    name: String,
    id: usize,
    loader: Arc<dyn ImageLoader>,
    pending_image: Mutex<Option<ImageInfo>>,
    compat: Option<CompatTag>,
    default_interfaces: Vec<String>,
    interfaces: InterfaceList,
    in_use: AtomicBool,
    provider: LivenessWatch,
    discover: Option<DiscoverFn>,
}

impl fmt::Debug for Region {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Region")
            .field("name", &self.name)
            .field("id", &self.id)
            .field("compat", &self.compat)
            .field("in_use", &self.in_use.load(Ordering::Acquire))
            .field("held_interfaces", &self.interfaces.names())
            .finish()
    }
}

/// Create a region and allocate its id.
///
/// The region is not discoverable until passed to
/// [`registry::register_region`].
///
/// # Arguments
///
/// * `name` - Unique region name
/// * `loader` - The configuration loader that programs this region
/// * `provider` - Liveness watch on the owning collaborator
/// * `compat` - Optional compatibility tag, immutable from here on
/// * `default_interfaces` - Gating set used when a pending image names none
/// * `discover` - Optional interface discovery capability
///
/// # Returns: `Result<Arc<Region>, RegiondError>`
/// * `Ok(Arc<Region>)` - New region
/// * `Err(RegiondError::Argument)` - Empty name
pub fn create_region(
    name: &str,
    loader: Arc<dyn ImageLoader>,
    provider: LivenessWatch,
    compat: Option<CompatTag>,
    default_interfaces: Vec<String>,
    discover: Option<DiscoverFn>,
) -> Result<Arc<Region>, RegiondError> {
    if name.is_empty() {
        return Err(RegiondError::Argument(
            "Attempt to create a region with no name!".to_string(),
        ));
    }
    let id = registry::REGION_IDS
        .lock()
        .map_err(|_| RegiondError::Internal("couldn't lock region id pool".to_string()))?
        .alloc();
    trace!("created region '{name}' with id {id}");
    Ok(Arc::new(Region {
        name: name.to_string(),
        id,
        loader,
        pending_image: Mutex::new(None),
        compat,
        default_interfaces,
        interfaces: InterfaceList::new(),
        in_use: AtomicBool::new(false),
        provider,
        discover,
    }))
}

/// Return a region's id to the pool. The final owner calls this when the
/// providing driver detaches; the region must already be unregistered.
pub fn destroy_region(region: Arc<Region>) {
    if let Ok(mut pool) = registry::REGION_IDS.lock() {
        pool.release(region.id);
    }
    trace!("destroyed region '{}'", region.name);
}

impl Region {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn compat(&self) -> Option<&CompatTag> {
        self.compat.as_ref()
    }

    pub fn default_interfaces(&self) -> &[String] {
        &self.default_interfaces
    }

    /// The gating interfaces held by the current (or last successful)
    /// programming attempt.
    pub fn interfaces(&self) -> &InterfaceList {
        &self.interfaces
    }

    /// Whether someone currently holds the exclusive lock.
    pub fn is_held(&self) -> bool {
        self.in_use.load(Ordering::Acquire)
    }

    /// Stage the image the next [`program`](Self::program) call will load.
    /// Replaces any previously staged image.
    pub fn set_pending_image(&self, info: ImageInfo) {
        *self
            .pending_image
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(info);
    }

    /// The currently staged image, if any.
    pub fn pending_image(&self) -> Option<ImageInfo> {
        self.pending_image
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn clear_pending_image(&self) {
        *self
            .pending_image
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Get an exclusive reference to the region.
    ///
    /// Never waits: a region with a programming attempt in flight fails
    /// immediately.
    ///
    /// # Returns: `Result<RegionHandle, RegiondError>`
    /// * `Ok(RegionHandle)` - Exclusive handle; drop (or `release`) to give the region back
    /// * `Err(RegiondError::Busy)` - Someone already holds the region
    /// * `Err(RegiondError::Unavailable)` - The owning provider is no longer loaded
    pub fn acquire(self: &Arc<Self>) -> Result<RegionHandle, RegiondError> {
        if self
            .in_use
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(RegiondError::Busy(format!(
                "region '{}' is already in use",
                self.name
            )));
        }
        let Some(provider) = self.provider.hold() else {
            self.in_use.store(false, Ordering::Release);
            return Err(RegiondError::Unavailable(format!(
                "the provider of region '{}' is no longer loaded",
                self.name
            )));
        };
        trace!("get {}", self.name);
        Ok(RegionHandle {
            region: Arc::clone(self),
            _provider: provider,
        })
    }

    fn run_discovery(&self) -> Result<(), RegiondError> {
        match &self.discover {
            Some(discover) => discover(self),
            None => Ok(()),
        }
    }

    /// Program the region with its pending image.
    ///
    /// The full gated sequence: acquire region, lock loader, discover and
    /// acquire gating interfaces, disable them (reverse order), load, enable
    /// them (forward order), unlock loader, release region. Any stage
    /// failure unwinds everything acquired so far and surfaces the stage's
    /// error; afterwards the region, the loader and every interface are free
    /// again.
    ///
    /// On success the interface list stays populated and **held**: the
    /// caller owns continued exclusive use of the freshly enabled gates and
    /// re-permits programming via [`release_interfaces`](Self::release_interfaces).
    /// The pending image is consumed.
    ///
    /// # Returns: `Result<(), RegiondError>`
    /// * `Ok(())` - Image loaded, gates re-enabled and still held
    /// * `Err(RegiondError::Busy)` - Region or loader already in use
    /// * `Err(RegiondError::Argument)` - No pending image was staged
    /// * `Err(RegiondError)` - Discovery, gate or loader failure, fully unwound
    pub fn program(self: &Arc<Self>) -> Result<(), RegiondError> {
        let region = match self.acquire() {
            Ok(region) => region,
            Err(e) => {
                error!("failed to get region '{}': {e}", self.name);
                return Err(e);
            }
        };

        let Some(info) = self.pending_image() else {
            region.release();
            let e = RegiondError::Argument(format!(
                "region '{}' has no pending image to program",
                self.name
            ));
            error!("{e}");
            return Err(e);
        };

        if let Err(e) = self.loader.lock() {
            error!("configuration loader of region '{}' is busy: {e}", self.name);
            region.release();
            return Err(e);
        }

        if let Err(e) = self.run_discovery() {
            error!("failed to get region '{}' interfaces: {e}", self.name);
            self.loader.unlock();
            region.release();
            return Err(e);
        }

        if let Err(e) = self.interfaces.disable_all() {
            error!("failed to disable region '{}' interfaces: {e}", self.name);
            self.interfaces.release_all();
            self.loader.unlock();
            region.release();
            return Err(e);
        }

        if let Err(e) = self.loader.load(&info) {
            error!("failed to load image into region '{}': {e}", self.name);
            self.interfaces.release_all();
            self.loader.unlock();
            region.release();
            return Err(e);
        }

        if let Err(e) = self.interfaces.enable_all() {
            // The image is already in the fabric; gates that enabled before
            // the failing one stay enabled. Only the locks are given back.
            error!("failed to enable region '{}' interfaces: {e}", self.name);
            self.interfaces.release_all();
            self.loader.unlock();
            region.release();
            return Err(e);
        }

        self.loader.unlock();
        self.clear_pending_image();
        region.release();
        info!(
            "region '{}' programmed with {:?}; {} gating interface(s) remain held",
            self.name,
            info.firmware,
            self.interfaces.len()
        );
        Ok(())
    }

    /// Release the gating interfaces held since the last successful
    /// [`program`](Self::program), permitting future reprogramming.
    pub fn release_interfaces(&self) {
        self.interfaces.release_all();
    }

    fn unlock(&self) {
        trace!("put {}", self.name);
        self.in_use.store(false, Ordering::Release);
    }
}

/// Exclusive reference to an acquired region. Move-only; dropping releases.
pub struct RegionHandle {
    region: Arc<Region>,
    _provider: LivenessRef,
}

impl RegionHandle {
    /// Release the exclusive reference.
    pub fn release(self) {}
}

impl Drop for RegionHandle {
    fn drop(&mut self) {
        self.region.unlock();
    }
}

impl fmt::Debug for RegionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("RegionHandle").field(&self.region.name).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn test_create_region_rejects_empty_name() {
        let owner = registry::Liveness::new();
        assert!(matches!(
            create_region("", Arc::new(NullLoader), owner.watch(), None, vec![], None),
            Err(RegiondError::Argument(_))
        ));
    }

    #[test]
    fn test_region_acquire_is_exclusive() {
        let owner = registry::Liveness::new();
        let region = create_region(
            "excl-region",
            Arc::new(NullLoader),
            owner.watch(),
            None,
            vec![],
            None,
        )
        .unwrap();

        let handle = region.acquire().unwrap();
        assert!(region.is_held());
        assert!(matches!(region.acquire(), Err(RegiondError::Busy(_))));
        handle.release();
        assert!(!region.is_held());
    }

    #[test]
    fn test_program_without_pending_image_fails_clean() {
        let owner = registry::Liveness::new();
        let region = create_region(
            "no-image",
            Arc::new(NullLoader),
            owner.watch(),
            None,
            vec![],
            None,
        )
        .unwrap();

        assert!(matches!(
            region.program(),
            Err(RegiondError::Argument(_))
        ));
        assert!(!region.is_held(), "region must be free after the failure");
        assert!(region.interfaces().is_empty());
    }

    #[test]
    fn test_program_without_discovery_succeeds_with_empty_list() {
        let owner = registry::Liveness::new();
        let region = create_region(
            "gateless",
            Arc::new(NullLoader),
            owner.watch(),
            None,
            vec![],
            None,
        )
        .unwrap();

        region.set_pending_image(ImageInfo {
            firmware: "design.bit.bin".into(),
            ..Default::default()
        });
        region.program().expect("programming a gateless region should succeed");
        assert!(region.interfaces().is_empty());
        assert!(!region.is_held());
        assert!(
            region.pending_image().is_none(),
            "pending image is consumed on success"
        );
    }

    #[test]
    fn test_compat_tag_is_kept_and_displayed() {
        let owner = registry::Liveness::new();
        let tag = CompatTag {
            msb: 0x0123456789abcdef,
            lsb: 0x0fedcba987654321,
        };
        let region = create_region(
            "tagged",
            Arc::new(NullLoader),
            owner.watch(),
            Some(tag),
            vec![],
            None,
        )
        .unwrap();

        assert_eq!(
            region.compat().map(ToString::to_string).as_deref(),
            Some("0123456789abcdef0fedcba987654321")
        );
    }

    #[test]
    fn test_program_fails_unavailable_once_provider_unloads() {
        let owner = registry::Liveness::new();
        let region = create_region(
            "detached",
            Arc::new(NullLoader),
            owner.watch(),
            None,
            vec![],
            None,
        )
        .unwrap();
        region.set_pending_image(ImageInfo::default());
        drop(owner);

        assert!(matches!(
            region.program(),
            Err(RegiondError::Unavailable(_))
        ));
        assert!(!region.is_held());
    }
}
