// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;

use rstest::rstest;
use tempfile::TempDir;

use super::*;
use crate::{InMemoryInterpreter, MemoryEnv, VIRTUAL_ENV_VAR};

fn service() -> OverlayService<InMemoryInterpreter, MemoryEnv> {
    let host = InMemoryInterpreter::new(vec!["/usr/lib/python3.11".to_string()], "/usr");
    OverlayService::new(OverlayManager::new(host, MemoryEnv::new()))
}

#[rstest]
fn test_service_round_trip() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("lib/python3.11/site-packages")).unwrap();

    let service = service();
    service
        .activate(tmp.path(), &ActivateOptions::default())
        .unwrap();
    assert_eq!(service.mode(), OverlayMode::Internal);
    assert_eq!(service.status().search_path.len(), 2);

    service.deactivate();
    service.deactivate();

    let manager = service.into_inner();
    assert_eq!(manager.mode(), OverlayMode::Inactive);
    assert!(manager.env().is_empty());
    assert_eq!(manager.host().entries(), &["/usr/lib/python3.11".to_string()]);
}

#[rstest]
fn test_service_external_sync() {
    let service = service();
    service
        .externally_synchronize("['/ext/site']", "/ext", "/ext")
        .unwrap();
    assert_eq!(service.mode(), OverlayMode::External);
    assert_eq!(service.lock().env().get(VIRTUAL_ENV_VAR).unwrap(), None);

    assert!(service.externally_synchronize("['/other']", "/o", "/o").is_err());
    service.deactivate();
    assert_eq!(service.mode(), OverlayMode::Inactive);
}

#[rstest]
fn test_service_serializes_callers() {
    let service = Arc::new(service());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                let list = format!("['/ext/{i}']");
                if service.externally_synchronize(&list, "/ext", "/ext").is_ok() {
                    service.deactivate();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let status = service.status();
    assert_eq!(status.mode, OverlayMode::Inactive);
    assert_eq!(status.search_path, vec!["/usr/lib/python3.11".to_string()]);
}

#[rstest]
fn test_poisoned_lock_is_recovered() {
    let tmp = TempDir::new().unwrap();
    std::fs::create_dir_all(tmp.path().join("lib/python3.11/site-packages")).unwrap();

    let service = Arc::new(service());
    service
        .activate(tmp.path(), &ActivateOptions::default())
        .unwrap();

    let poisoner = Arc::clone(&service);
    let result = std::thread::spawn(move || {
        let _guard = poisoner.lock();
        panic!("poisoning the overlay lock");
    })
    .join();
    assert!(result.is_err());

    assert_eq!(service.mode(), OverlayMode::Internal);
    service.deactivate();
    assert_eq!(service.mode(), OverlayMode::Inactive);
    assert_eq!(service.status().search_path, vec!["/usr/lib/python3.11".to_string()]);
    assert_eq!(service.lock().env().get(VIRTUAL_ENV_VAR).unwrap(), None);
}
