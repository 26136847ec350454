// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn override_file_wins_over_inline_and_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let list = dir.path().join("plugins.txt");
    std::fs::write(
        &list,
        "# pinned set\nhttps://github.com/acme/one.git\n\n  https://github.com/acme/two\n",
    )
    .unwrap();

    let inline = vec!["https://github.com/acme/ignored.git".to_string()];
    let targets = resolve_repo_list(Some(&list), Some(&inline)).unwrap();
    assert_eq!(targets.len(), 2);
    assert_eq!(targets[0].dir_name, "one");
    assert_eq!(targets[1].dir_name, "two");
}

#[test]
fn inline_wins_over_defaults() {
    let inline = vec!["https://github.com/acme/solo.git".to_string()];
    let targets = resolve_repo_list(None, Some(&inline)).unwrap();
    assert_eq!(targets.len(), 1);
    assert_eq!(targets[0].dir_name, "solo");
}

#[test]
fn defaults_used_when_nothing_overrides() {
    let targets = resolve_repo_list(None, None).unwrap();
    assert_eq!(targets.len(), default_plugin_urls().len());
    assert!(targets.iter().any(|t| t.dir_name == "ComfyUI-Manager"));
}

#[test]
fn unreadable_override_file_is_an_error() {
    let err = resolve_repo_list(Some(std::path::Path::new("/nonexistent/list.txt")), None)
        .unwrap_err();
    assert!(matches!(err, ManifestError::RepoListUnreadable { .. }));
}
