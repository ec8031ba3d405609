// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn path_str(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[rstest]
fn test_new_interpreter_defaults() {
    let host = InMemoryInterpreter::new(vec!["/usr/lib/python3.11".to_string()], "/usr");
    assert_eq!(host.prefixes(), Prefixes::uniform("/usr"));
    assert_eq!(host.real_prefix(), None);
    assert_eq!(host.special_path(), DEFAULT_SPECIAL_PATH);

    let host = host.with_exec_prefix("/usr/local").with_special_path("_host_");
    assert_eq!(host.prefixes(), Prefixes::new("/usr", "/usr/local"));
    assert_eq!(host.special_path(), "_host_");
}

#[rstest]
fn test_add_site_dir_appends_once() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site-packages");
    std::fs::create_dir_all(&site).unwrap();

    let mut host = InMemoryInterpreter::new(vec!["/base".to_string()], "/usr");
    host.add_site_dir(&site).unwrap();
    host.add_site_dir(&site).unwrap();

    assert_eq!(host.entries(), &["/base".to_string(), path_str(&site)]);
}

#[rstest]
fn test_add_site_dir_processes_pth() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site-packages");
    let editable = tmp.path().join("checkout");
    std::fs::create_dir_all(&site).unwrap();
    std::fs::create_dir_all(&editable).unwrap();
    std::fs::write(site.join("editable.pth"), format!("{}\n", editable.display())).unwrap();

    let mut host = InMemoryInterpreter::new(vec![path_str(&editable)], "/usr");
    host.add_site_dir(&site).unwrap();

    // Already-known entries are not appended again.
    assert_eq!(host.entries(), &[path_str(&editable), path_str(&site)]);
}

#[rstest]
fn test_add_site_dir_propagates_errors() {
    let tmp = TempDir::new().unwrap();
    let mut host = InMemoryInterpreter::default();
    let result = host.add_site_dir(&tmp.path().join("missing"));
    assert!(result.is_err());
    assert!(host.entries().is_empty());
}
