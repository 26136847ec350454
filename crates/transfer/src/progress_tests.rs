// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn item(name: &str, state: JobState, total: u64, completed: u64, speed: u64) -> ItemProgress {
    ItemProgress { name: name.to_string(), state, total, completed, speed }
}

#[parameterized(
    zero = { 0, "0 B" },
    below_kib = { 1023, "1023 B" },
    one_kib = { 1024, "1.0 KiB" },
    sixteen_mib = { 16 * 1024 * 1024, "16.0 MiB" },
    half_gib = { 512 * 1024 * 1024, "512.0 MiB" },
    two_gib = { 2 * 1024 * 1024 * 1024, "2.0 GiB" },
)]
fn human_bytes_formats(bytes: u64, expected: &str) {
    assert_eq!(human_bytes(bytes), expected);
}

#[test]
fn percent_clamps_and_handles_unknown_total() {
    assert_eq!(item("a", JobState::Active, 0, 0, 0).percent(), 0);
    assert_eq!(item("a", JobState::Active, 100, 50, 0).percent(), 50);
    assert_eq!(item("a", JobState::Active, 100, 150, 0).percent(), 100);
}

#[test]
fn eta_rounds_up_and_is_none_when_stalled() {
    let active = item("a", JobState::Active, 100, 40, 7);
    assert_eq!(active.eta_secs(), Some(9));
    let stalled = item("a", JobState::Active, 100, 40, 0);
    assert_eq!(stalled.eta_secs(), None);
    let done = item("a", JobState::Complete, 100, 100, 7);
    assert_eq!(done.eta_secs(), None);
}

#[test]
fn snapshot_aggregates_and_renders_every_item() {
    let snapshot = Snapshot {
        items: vec![
            item("model-a.safetensors", JobState::Active, 2048, 1024, 512),
            item("model-b.safetensors", JobState::Complete, 4096, 4096, 0),
            item("model-c.safetensors", JobState::Failed, 1024, 0, 0),
        ],
    };
    assert_eq!(snapshot.total_bytes(), 7168);
    assert_eq!(snapshot.completed_bytes(), 5120);
    assert_eq!(snapshot.aggregate_speed(), 512);

    let rendered = snapshot.render();
    assert!(rendered.contains("model-a.safetensors"));
    assert!(rendered.contains("50%"));
    assert!(rendered.contains("model-b.safetensors"));
    assert!(rendered.contains("done"));
    assert!(rendered.contains("model-c.safetensors"));
    assert!(rendered.contains("FAILED"));
    assert!(rendered.ends_with("at 512 B/s"));
}

#[test]
fn ledger_records_each_gid_once() {
    let mut ledger = RecentLedger::new();
    assert!(ledger.record("g1", "a.bin", JobState::Complete, None));
    assert!(!ledger.record("g1", "a.bin", JobState::Complete, None));
    assert!(ledger.record("g2", "b.bin", JobState::Failed, Some("404")));
    assert!(ledger.record("g3", "c.bin", JobState::Removed, None));

    assert_eq!(ledger.completed().collect::<Vec<_>>(), vec!["a.bin"]);
    assert_eq!(
        ledger.failed().collect::<Vec<_>>(),
        vec![("b.bin", "404"), ("c.bin", "cancelled")]
    );
    assert_eq!(ledger.failure_count(), 2);
}

#[test]
fn ledger_ignores_non_terminal_states() {
    let mut ledger = RecentLedger::new();
    assert!(!ledger.record("g1", "a.bin", JobState::Active, None));
    // The gid stays recordable once it does terminate.
    assert!(ledger.record("g1", "a.bin", JobState::Complete, None));
}
