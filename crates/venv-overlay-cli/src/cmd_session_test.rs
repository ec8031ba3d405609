// Copyright (c) Contributors to the SPK project.
// SPDX-License-Identifier: Apache-2.0

use rstest::rstest;

use super::*;

#[rstest]
#[case("", None)]
#[case("   # a comment", None)]
#[case("status", Some(SessionCommand::Status))]
#[case("  deactivate  ", Some(SessionCommand::Deactivate))]
#[case("exit", Some(SessionCommand::Quit))]
#[case(
    "activate /envs/foo",
    Some(SessionCommand::Activate { root: PathBuf::from("/envs/foo"), update_pythonpath: true })
)]
#[case(
    "activate --no-pythonpath /envs/foo",
    Some(SessionCommand::Activate { root: PathBuf::from("/envs/foo"), update_pythonpath: false })
)]
#[case(
    "activate /envs/with space --no-pythonpath",
    Some(SessionCommand::Activate {
        root: PathBuf::from("/envs/with space"),
        update_pythonpath: false,
    })
)]
#[case(
    "activate  /envs/with space ",
    Some(SessionCommand::Activate {
        root: PathBuf::from("/envs/with space"),
        update_pythonpath: true,
    })
)]
#[case(
    "activate /envs/--no-pythonpath",
    Some(SessionCommand::Activate {
        root: PathBuf::from("/envs/--no-pythonpath"),
        update_pythonpath: true,
    })
)]
#[case(
    "sync /ext /ext-exec ['/ext/lib', '/with space']",
    Some(SessionCommand::Sync {
        prefix: "/ext".to_string(),
        exec_prefix: "/ext-exec".to_string(),
        search_path: "['/ext/lib', '/with space']".to_string(),
    })
)]
fn test_parse_line(#[case] line: &str, #[case] expected: Option<SessionCommand>) {
    assert_eq!(parse_line(line).unwrap(), expected);
}

#[rstest]
#[case("activate")]
#[case("activate --no-pythonpath")]
#[case("sync /ext")]
#[case("sync /ext /ext")]
#[case("bogus")]
fn test_parse_line_errors(#[case] line: &str) {
    assert!(parse_line(line).is_err(), "{line:?} should fail");
}
