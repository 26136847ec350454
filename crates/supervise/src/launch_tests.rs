// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::notify::FakeNotifyAdapter;
use crate::probe::FakeHealthProbe;
use rigup_core::GpuAssignment;
use std::path::PathBuf;

fn shell_command(script: &str) -> WorkerCommand {
    WorkerCommand {
        program: PathBuf::from("/bin/sh"),
        args: vec!["-c".into(), script.into()],
    }
}

fn launcher(
    command: WorkerCommand,
) -> (Launcher<FakeNotifyAdapter, FakeHealthProbe>, FakeNotifyAdapter, FakeHealthProbe) {
    let notify = FakeNotifyAdapter::new();
    let probe = FakeHealthProbe::new();
    let launcher = Launcher::new(command, notify.clone(), probe.clone())
        .with_timing(Duration::from_millis(1), Duration::from_millis(50));
    (launcher, notify, probe)
}

#[tokio::test]
async fn launch_creates_isolated_dirs_and_log() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8188, GpuAssignment::Id(0));
    let (launcher, _, _) = launcher(shell_command("exit 0"));

    let mut handle = launcher.launch(&spec).unwrap();

    assert!(handle.pid > 0);
    assert!(spec.output_dir.is_dir());
    assert!(spec.cache_dir.is_dir());
    assert!(spec.log_file.is_file());
    // Shell exits on its own; wait until the handle notices.
    for _ in 0..100 {
        if !handle.try_alive() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    assert!(!handle.try_alive());
}

#[tokio::test]
async fn worker_output_lands_in_the_instance_log() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8190, GpuAssignment::All);
    let (launcher, _, _) = launcher(shell_command("echo booted"));

    let mut handle = launcher.launch(&spec).unwrap();
    for _ in 0..100 {
        if !handle.try_alive() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }

    let log = std::fs::read_to_string(&spec.log_file).unwrap();
    assert!(log.contains("booted"));
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8188, GpuAssignment::All);
    let command = WorkerCommand {
        program: PathBuf::from("/nonexistent/interpreter"),
        args: vec![],
    };
    let (launcher, _, _) = launcher(command);

    let err = launcher.launch(&spec).unwrap_err();

    assert!(matches!(err, LaunchError::Spawn { .. }));
}

#[tokio::test]
async fn ready_notification_fires_exactly_once() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8188, GpuAssignment::All);
    let (launcher, notify, probe) = launcher(shell_command("exit 0"));
    probe.script(8188, &[false, false, true]);

    let outcome = launcher.await_ready(&spec).await;

    assert_eq!(outcome, ReadyOutcome::Ready);
    assert_eq!(notify.titles(), vec!["worker-8188 ready"]);
}

#[tokio::test]
async fn timeout_sends_one_not_ready_warning() {
    let tmp = tempfile::tempdir().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8188, GpuAssignment::All);
    let (launcher, notify, _) = launcher(shell_command("exit 0"));

    let outcome = launcher.await_ready(&spec).await;

    assert_eq!(outcome, ReadyOutcome::TimedOut);
    assert_eq!(notify.titles(), vec!["worker-8188 not ready"]);
}
