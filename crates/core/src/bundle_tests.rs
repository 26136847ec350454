// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn archive_name_round_trips() {
    let key = BundleKey::new("plugins", "a1b2c3d4e5f6");
    let name = key.archive_name(1_700_000_123);
    assert_eq!(name, "plugins-a1b2c3d4e5f6-1700000123.tar.gz");
    let (parsed, ts) = BundleKey::parse_archive_name(&name).unwrap();
    assert_eq!(parsed, key);
    assert_eq!(ts, 1_700_000_123);
}

#[test]
fn tag_may_contain_dashes() {
    let key = BundleKey::new("comfy-plugins-v2", "deadbeef0123");
    let (parsed, _) = BundleKey::parse_archive_name(&key.archive_name(42)).unwrap();
    assert_eq!(parsed.tag, "comfy-plugins-v2");
    assert_eq!(parsed.signature, "deadbeef0123");
}

#[yare::parameterized(
    wrong_extension = { "plugins-abc-123.zip" },
    missing_ts      = { "plugins-abc.tar.gz" },
    non_numeric_ts  = { "plugins-abc-new.tar.gz" },
    empty           = { ".tar.gz" },
)]
fn malformed_names_rejected(name: &str) {
    assert!(BundleKey::parse_archive_name(name).is_none());
}

#[test]
fn prefix_matches_any_timestamp() {
    let key = BundleKey::new("plugins", "abc");
    assert!(key.archive_name(1).starts_with(&key.prefix()));
    assert!(key.archive_name(9_999_999).starts_with(&key.prefix()));
}

#[test]
fn manifest_serde_round_trip() {
    let manifest = BundleManifest {
        tag: "plugins".into(),
        repos: vec![RepoManifestEntry {
            name: "ComfyUI-Manager".into(),
            path: "custom_nodes/ComfyUI-Manager".into(),
            origin: "https://github.com/acme/ComfyUI-Manager".into(),
            branch: "main".into(),
            commit: "0123abcd".into(),
        }],
        requirements: vec!["gitpython".into(), "rich".into()],
    };
    let json = serde_json::to_string_pretty(&manifest).unwrap();
    let back: BundleManifest = serde_json::from_str(&json).unwrap();
    assert_eq!(back, manifest);
}
