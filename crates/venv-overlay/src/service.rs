// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

//! A lock-guarded overlay manager for use as a process-wide service.

use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::{
    ActivateOptions, EnvStore, InterpreterHost, OverlayManager, OverlayMode, OverlayStatus, Result,
};

#[cfg(test)]
#[path = "./service_test.rs"]
mod service_test;

/// The single overlay manager of a host process.
///
/// Overlay state is process-wide, so a host creates exactly one service and
/// hands references to its command layer. All three operations go through
/// one mutex: concurrent callers are serialized rather than racing on the
/// shared state. Calls are still expected to come from one control thread.
#[derive(Debug)]
pub struct OverlayService<H, E> {
    manager: Mutex<OverlayManager<H, E>>,
}

impl<H: InterpreterHost, E: EnvStore> OverlayService<H, E> {
    pub fn new(manager: OverlayManager<H, E>) -> Self {
        Self {
            manager: Mutex::new(manager),
        }
    }

    /// Lock the manager for a sequence of operations.
    ///
    /// Activation records the overlay before it touches the host or the
    /// environment, so a manager left behind by a panicking host can still
    /// be deactivated. A poisoned lock is therefore recovered.
    pub fn lock(&self) -> MutexGuard<'_, OverlayManager<H, E>> {
        self.manager.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn activate(&self, root: impl Into<PathBuf>, options: &ActivateOptions) -> Result<()> {
        self.lock().activate_with(root.into(), options)
    }

    pub fn externally_synchronize(
        &self,
        search_path: &str,
        prefix: &str,
        exec_prefix: &str,
    ) -> Result<()> {
        self.lock()
            .externally_synchronize_str(search_path, prefix, exec_prefix)
    }

    pub fn deactivate(&self) {
        self.lock().deactivate()
    }

    pub fn mode(&self) -> OverlayMode {
        self.lock().mode()
    }

    pub fn status(&self) -> OverlayStatus {
        self.lock().status()
    }

    pub fn into_inner(self) -> OverlayManager<H, E> {
        self.manager
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
