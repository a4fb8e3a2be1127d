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

//! Test doubles for the programming protocol: a scriptable loader and a
//! recording bridge provider, sharing one ordered event log so tests can
//! assert the exact hardware call sequence.

use regiond::error::RegiondError;
use regiond::fabric::interface::{InterfaceOps, RegionInterface, create_interface};
use regiond::fabric::loader::{ConfigFragment, ImageInfo, ImageLoader};
use regiond::fabric::registry::{Liveness, register_interface};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    LoaderLock,
    LoaderUnlock,
    Load(String),
    Enable(String),
    Disable(String),
    Configure(String),
}

/// Ordered record of every hardware call the mocks observe.
#[derive(Debug, Clone, Default)]
pub struct EventLog(Arc<Mutex<Vec<Event>>>);

impl EventLog {
    pub fn new() -> Self {
        EventLog::default()
    }

    pub fn push(&self, event: Event) {
        self.0.lock().unwrap().push(event);
    }

    pub fn events(&self) -> Vec<Event> {
        self.0.lock().unwrap().clone()
    }
}

/// Rendezvous used to hold a programming attempt open mid-load.
pub struct Pause {
    pub entered: Sender<()>,
    pub release: Mutex<Receiver<()>>,
}

/// Scriptable [`ImageLoader`]: can refuse its lock, reject the image, or
/// pause inside `load` until told to continue.
pub struct MockLoader {
    log: EventLog,
    locked: AtomicBool,
    fail_lock: bool,
    fail_load: bool,
    pause: Option<Pause>,
}

impl MockLoader {
    pub fn new(log: &EventLog) -> Self {
        MockLoader {
            log: log.clone(),
            locked: AtomicBool::new(false),
            fail_lock: false,
            fail_load: false,
            pause: None,
        }
    }

    pub fn failing_lock(log: &EventLog) -> Self {
        MockLoader {
            fail_lock: true,
            ..MockLoader::new(log)
        }
    }

    pub fn failing_load(log: &EventLog) -> Self {
        MockLoader {
            fail_load: true,
            ..MockLoader::new(log)
        }
    }

    pub fn pausing(log: &EventLog, entered: Sender<()>, release: Receiver<()>) -> Self {
        MockLoader {
            pause: Some(Pause {
                entered,
                release: Mutex::new(release),
            }),
            ..MockLoader::new(log)
        }
    }

    pub fn is_locked(&self) -> bool {
        self.locked.load(Ordering::SeqCst)
    }
}

impl ImageLoader for MockLoader {
    fn lock(&self) -> Result<(), RegiondError> {
        if self.fail_lock
            || self
                .locked
                .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
                .is_err()
        {
            return Err(RegiondError::Busy("mock loader is busy".to_string()));
        }
        self.log.push(Event::LoaderLock);
        Ok(())
    }

    fn load(&self, info: &ImageInfo) -> Result<(), RegiondError> {
        if let Some(pause) = &self.pause {
            pause.entered.send(()).unwrap();
            pause.release.lock().unwrap().recv().unwrap();
        }
        self.log.push(Event::Load(info.firmware.display().to_string()));
        if self.fail_load {
            return Err(RegiondError::Load(
                "mock loader rejected the image".to_string(),
            ));
        }
        Ok(())
    }

    fn unlock(&self) {
        self.log.push(Event::LoaderUnlock);
        self.locked.store(false, Ordering::SeqCst);
    }
}

/// Recording [`InterfaceOps`] with injectable enable/disable failures and
/// an observable gate state.
pub struct MockBridgeOps {
    name: String,
    log: EventLog,
    enabled: AtomicBool,
    fail_enable: bool,
    fail_disable: bool,
}

impl InterfaceOps for MockBridgeOps {
    fn enable_show(&self) -> Option<bool> {
        Some(self.enabled.load(Ordering::SeqCst))
    }

    fn enable_set(&self, enable: bool) -> Result<(), RegiondError> {
        self.log.push(if enable {
            Event::Enable(self.name.clone())
        } else {
            Event::Disable(self.name.clone())
        });
        if enable && self.fail_enable {
            return Err(RegiondError::Internal(format!(
                "injected enable failure on {}",
                self.name
            )));
        }
        if !enable && self.fail_disable {
            return Err(RegiondError::Internal(format!(
                "injected disable failure on {}",
                self.name
            )));
        }
        self.enabled.store(enable, Ordering::SeqCst);
        Ok(())
    }

    fn configure(&self, fragment: &ConfigFragment) -> Result<(), RegiondError> {
        self.log
            .push(Event::Configure(format!("{} <- {}", self.name, fragment.name)));
        Ok(())
    }
}

/// Create and register a bridge interface driven by a [`MockBridgeOps`],
/// initially enabled.
pub fn register_mock_bridge(
    name: &str,
    owner: &Liveness,
    log: &EventLog,
    fail_enable: bool,
    fail_disable: bool,
) -> Arc<RegionInterface> {
    let ops = Box::new(MockBridgeOps {
        name: name.to_string(),
        log: log.clone(),
        enabled: AtomicBool::new(true),
        fail_enable,
        fail_disable,
    });
    let interface =
        create_interface(name, Some(ops), owner.watch()).expect("interface creation failed");
    register_interface(Arc::clone(&interface)).expect("interface registration failed");
    interface
}

/// An image naming the given gating interfaces, in enable order.
pub fn image(firmware: &str, interfaces: &[&str]) -> ImageInfo {
    ImageInfo {
        firmware: firmware.into(),
        flags: None,
        interfaces: interfaces.iter().map(|s| s.to_string()).collect(),
        config: None,
    }
}
