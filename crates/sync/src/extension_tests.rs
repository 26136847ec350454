// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use yare::parameterized;

fn spec_at(root: &Path) -> BuildSpec {
    BuildSpec {
        repo_url: "https://example.com/attention.git".into(),
        revisions: vec!["rev-a".into(), "rev-b".into(), "rev-c".into()],
        arch_flags: arch_flags(8, 9),
        workdir: root.join("build"),
        log_dir: root.join("logs"),
    }
}

#[parameterized(
    ada = { 8, 9, &["8.9"] },
    hopper = { 9, 0, &["9.0"] },
    newest = { 12, 0, &["8.6", "8.9", "9.0", "12.0"] },
    beyond = { 13, 1, &["8.6", "8.9", "9.0", "13.1"] },
)]
fn arch_flag_table(major: u32, minor: u32, expected: &[&str]) {
    assert_eq!(arch_flags(major, minor), expected);
}

#[tokio::test]
async fn first_success_stops_the_fallback_chain() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeBuildRunner::new();
    runner.fail_revision("rev-a");

    let report = build_with_fallback(&runner, &spec_at(tmp.path())).await;

    assert!(report.succeeded());
    assert_eq!(runner.checkouts(), vec!["rev-a", "rev-b"]);
    assert_eq!(report.attempts.len(), 2);
    assert_eq!(report.attempts[0].revision, "rev-a");
    assert!(matches!(report.attempts[0].outcome, BuildOutcome::Failed { .. }));
    assert_eq!(report.attempts[1].outcome, BuildOutcome::Succeeded);
    // Both attempts left their logs behind.
    assert!(report.attempts[0].log_path.exists());
    assert!(report.attempts[1].log_path.exists());
}

#[tokio::test]
async fn exhausting_every_revision_is_failure_not_panic() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeBuildRunner::new();
    for rev in ["rev-a", "rev-b", "rev-c"] {
        runner.fail_revision(rev);
    }

    let report = build_with_fallback(&runner, &spec_at(tmp.path())).await;

    assert!(!report.succeeded());
    assert_eq!(report.attempts.len(), 3);
    assert!(report
        .attempts
        .iter()
        .all(|a| matches!(a.outcome, BuildOutcome::Failed { .. })));
}

#[tokio::test]
async fn spawned_build_joins_within_deadline() {
    let tmp = tempfile::tempdir().unwrap();
    let runner = FakeBuildRunner::new();

    let handle = spawn_build(runner, spec_at(tmp.path()));
    let report = join_build(handle, Duration::from_secs(5), Duration::from_millis(5)).await;

    assert!(report.is_some_and(|r| r.succeeded()));
}

#[tokio::test]
async fn join_gives_up_at_the_deadline() {
    let handle = tokio::spawn(async {
        tokio::time::sleep(Duration::from_secs(60)).await;
        BuildReport::default()
    });

    let report = join_build(handle, Duration::from_millis(30), Duration::from_millis(5)).await;

    assert!(report.is_none());
}
