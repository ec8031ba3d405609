// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;
use tempfile::TempDir;

use super::*;

fn make_dirs(root: &Path, dirs: &[&str]) {
    for dir in dirs {
        std::fs::create_dir_all(root.join(dir)).expect("Failed to create dir");
    }
}

#[rstest]
fn test_discover_orders_lib64_first() {
    let tmp = TempDir::new().unwrap();
    make_dirs(
        tmp.path(),
        &[
            "lib/python3.11/site-packages",
            "lib64/python3.11/site-packages",
            "lib32/python3.11/site-packages",
        ],
    );

    let dirs = discover_site_dirs(tmp.path()).expect("Should discover site dirs");
    let names: Vec<_> = dirs
        .iter()
        .map(|d| d.strip_prefix(tmp.path()).unwrap().to_path_buf())
        .collect();

    assert_eq!(
        names,
        vec![
            PathBuf::from("lib64/python3.11/site-packages"),
            PathBuf::from("lib32/python3.11/site-packages"),
            PathBuf::from("lib/python3.11/site-packages"),
        ]
    );
}

#[rstest]
fn test_discover_ignores_non_matching() {
    let tmp = TempDir::new().unwrap();
    make_dirs(
        tmp.path(),
        &[
            "lib/python3.11/dist-packages",
            "share/python3.11/site-packages",
            "lib/pypy/site-packages",
        ],
    );
    // A plain file with a matching name is not a site directory.
    std::fs::create_dir_all(tmp.path().join("lib/python3.12")).unwrap();
    std::fs::write(tmp.path().join("lib/python3.12/site-packages"), "").unwrap();

    let dirs = discover_site_dirs(tmp.path()).unwrap();
    assert!(dirs.is_empty(), "unexpected site dirs: {dirs:?}");
}

#[rstest]
fn test_discover_missing_root() {
    let tmp = TempDir::new().unwrap();
    let dirs = discover_site_dirs(tmp.path().join("does-not-exist")).unwrap();
    assert!(dirs.is_empty());
}

#[rstest]
fn test_discover_root_with_glob_characters() {
    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join("env[1]");
    make_dirs(&root, &["lib/python3.11/site-packages"]);

    let dirs = discover_site_dirs(&root).unwrap();
    assert_eq!(dirs, vec![root.join("lib/python3.11/site-packages")]);
}

#[rstest]
fn test_parse_pth() {
    let site = Path::new("/venv/lib/python3.11/site-packages");
    let content = "# comment\n\nimport _virtualenv\nextra\n../shared  \nimport\tsys\n";
    let entries = parse_pth(site, content);

    assert_eq!(
        entries,
        vec![
            PthEntry::Import("import _virtualenv".to_string()),
            PthEntry::Path(PathBuf::from("/venv/lib/python3.11/site-packages/extra")),
            PthEntry::Path(PathBuf::from("/venv/lib/python3.11/shared")),
            PthEntry::Import("import\tsys".to_string()),
        ]
    );
}

#[rstest]
fn test_site_dir_additions_follow_pth_files() {
    let tmp = TempDir::new().unwrap();
    let site = tmp.path().join("site-packages");
    make_dirs(tmp.path(), &["site-packages/b_pkg", "site-packages/a_pkg", "src"]);

    std::fs::write(site.join("b.pth"), "b_pkg\nmissing\n").unwrap();
    std::fs::write(site.join("a.pth"), "a_pkg\n../src\n").unwrap();
    std::fs::write(site.join(".hidden.pth"), "b_pkg\n").unwrap();
    std::fs::write(site.join("notes.txt"), "a_pkg\n").unwrap();

    let additions = site_dir_additions(&site).unwrap();
    assert_eq!(
        additions,
        vec![
            site.clone(),
            site.join("a_pkg"),
            tmp.path().join("src"),
            site.join("b_pkg"),
        ]
    );
}

#[rstest]
fn test_site_dir_additions_missing_dir() {
    let tmp = TempDir::new().unwrap();
    let result = site_dir_additions(&tmp.path().join("nope"));
    assert!(matches!(result, Err(Error::SiteRegistration { .. })));
}

#[cfg(unix)]
#[rstest]
fn test_discover_non_unicode_root() {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;

    let tmp = TempDir::new().unwrap();
    let root = tmp.path().join(OsStr::from_bytes(b"env\xff"));
    make_dirs(&root, &["lib/python3.11/site-packages"]);

    let result = discover_site_dirs(&root);
    assert!(matches!(result, Err(Error::NonUnicodePath(_))), "{result:?}");
}
