// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[rstest]
#[case("[]", &[])]
#[case("  [ ]  ", &[])]
#[case(
    "['/usr/lib/python311.zip', '/usr/lib/python3.11']",
    &["/usr/lib/python311.zip", "/usr/lib/python3.11"]
)]
#[case(r#"["/a", "/b",]"#, &["/a", "/b"])]
#[case("['', '/x']", &["", "/x"])]
#[case(r"['C:\\Python311\\Lib']", &[r"C:\Python311\Lib"])]
#[case(r#"['it\'s', "say \"hi\""]"#, &["it's", "say \"hi\""])]
#[case(r#"["caf\u00e9", 'caf\xe9', "\ud83d\ude00"]"#, &["café", "café", "😀"])]
#[case(r"['\d']", &[r"\d"])]
#[case("[\n  '/a',\n  '/b'\n]", &["/a", "/b"])]
fn test_parse_accepts_literals(#[case] input: &str, #[case] expected: &[&str]) {
    let entries = parse_search_path(input).expect("Should parse list literal");
    assert_eq!(entries, strings(expected));
}

#[rstest]
#[case("")]
#[case("'/a'")]
#[case("['/a'")]
#[case("['/a' '/b']")]
#[case("['/a'] + ['/b']")]
#[case("[__import__('os').system('true')]")]
#[case("[str(1)]")]
#[case("[1, 2]")]
#[case("['/a',,]")]
#[case("['unterminated]")]
#[case(r#"["\ud83d"]"#)]
#[case(r"['\x4']")]
fn test_parse_rejects_everything_else(#[case] input: &str) {
    let result = parse_search_path(input);
    assert!(
        matches!(result, Err(Error::InvalidSearchPath { .. })),
        "{input:?} should be rejected, got {result:?}"
    );
}

#[rstest]
fn test_parse_error_points_at_offending_token() {
    let err = parse_search_path("['/a', None]").unwrap_err();
    match err {
        Error::InvalidSearchPath { span, reason, .. } => {
            assert_eq!(span.offset(), 7);
            assert!(reason.contains("string literal"), "{reason}");
        }
        other => panic!("unexpected error {other:?}"),
    }
}

#[rstest]
fn test_move_new_entries_first() {
    let entries = strings(&["/p0", "/p1", "/n0", "/n1"]);
    assert_eq!(
        move_new_entries_first(entries, 2),
        strings(&["/n0", "/n1", "/p0", "/p1"])
    );

    let entries = strings(&["/p0"]);
    assert_eq!(move_new_entries_first(entries.clone(), 1), entries);
    assert_eq!(move_new_entries_first(entries.clone(), 5), entries);
}

#[rstest]
fn test_introduced_entries_keeps_order() {
    let previous = strings(&["/p0", "/p1"]);
    let current = strings(&["/n2", "/n1", "/p0", "/n2", "/p1", "/n0"]);
    assert_eq!(
        introduced_entries(&previous, &current),
        strings(&["/n2", "/n1", "/n0"])
    );
    assert!(introduced_entries(&current, &previous).is_empty());
}

#[rstest]
fn test_ensure_entry() {
    let mut entries = strings(&["/a", "_special_", "/b"]);
    ensure_entry(&mut entries, "_special_");
    assert_eq!(entries, strings(&["/a", "_special_", "/b"]));

    ensure_entry(&mut entries, "/c");
    assert_eq!(entries, strings(&["/a", "_special_", "/b", "/c"]));
}
