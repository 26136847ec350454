// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker lifecycle specs: launch, readiness, steady-state supervision,
//! and the exactly-once death alert.

use crate::prelude::*;
use rigup_core::{GpuAssignment, HealthState, InstanceSpec, WorkerCommand};
use rigup_supervise::{
    spawn_monitor, FakeHealthProbe, FakeNotifyAdapter, FakeProcessWatch, Launcher, MonitorConfig,
    ReadyOutcome,
};
use std::path::PathBuf;

fn shell_command(script: &str) -> WorkerCommand {
    WorkerCommand { program: PathBuf::from("/bin/sh"), args: vec!["-c".into(), script.into()] }
}

/// The whole arc for one worker: spawn, answer the readiness probe, run,
/// die, and trigger exactly one operator alert.
#[tokio::test]
async fn lifecycle_ends_in_a_single_death_alert() {
    let tmp = TempDir::new().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8188, GpuAssignment::All);
    let notify = FakeNotifyAdapter::new();
    let probe = FakeHealthProbe::new();
    probe.set_steady(spec.port, true);
    let launcher = Launcher::new(shell_command("sleep 30"), notify.clone(), probe.clone())
        .with_timing(FAST_POLL, Duration::from_millis(200));

    let handle = launcher.launch(&spec).unwrap();
    assert_eq!(launcher.await_ready(&spec).await, ReadyOutcome::Ready);

    // Two healthy supervision cycles, then the process is gone.
    let watch = FakeProcessWatch::new();
    watch.script(handle.pid, &[true, true]);
    let monitor = spawn_monitor(
        spec.clone(),
        handle.pid,
        probe,
        watch,
        notify.clone(),
        MonitorConfig { poll: FAST_POLL },
    );

    let terminal = monitor.await.unwrap();
    assert_eq!(terminal, HealthState::Dead);
    assert_eq!(
        notify.titles(),
        ["worker-8188 ready", "worker-8188 became unresponsive"]
    );
}

/// A worker that never answers its port dies without an alert: nothing
/// was lost that was ever up.
#[tokio::test]
async fn never_ready_worker_dies_silently() {
    let tmp = TempDir::new().unwrap();
    let spec = InstanceSpec::for_port(tmp.path(), 8191, GpuAssignment::All);
    let notify = FakeNotifyAdapter::new();
    let probe = FakeHealthProbe::new();
    let launcher = Launcher::new(shell_command("exit 0"), notify.clone(), probe.clone())
        .with_timing(FAST_POLL, Duration::from_millis(30));

    let handle = launcher.launch(&spec).unwrap();
    assert_eq!(launcher.await_ready(&spec).await, ReadyOutcome::TimedOut);

    let watch = FakeProcessWatch::new();
    let monitor = spawn_monitor(
        spec,
        handle.pid,
        probe,
        watch,
        notify.clone(),
        MonitorConfig { poll: FAST_POLL },
    );

    assert_eq!(monitor.await.unwrap(), HealthState::Dead);
    // Only the not-ready notice from launch; no unresponsive alert.
    assert_eq!(notify.titles(), ["worker-8191 not ready"]);
}

/// Multi-instance layouts get consecutive ports, one GPU each, and fully
/// disjoint output/cache/log paths.
#[tokio::test]
async fn instances_are_isolated_per_port() {
    let (tmp, mut config) = test_config();
    config.instances.count = 2;
    let specs = config.instance_specs();

    assert_eq!(specs.len(), 2);
    assert_eq!((specs[0].port, specs[1].port), (8188, 8189));
    assert_eq!(specs[0].gpu, GpuAssignment::Id(0));
    assert_eq!(specs[1].gpu, GpuAssignment::Id(1));
    assert_ne!(specs[0].output_dir, specs[1].output_dir);
    assert_ne!(specs[0].cache_dir, specs[1].cache_dir);

    let notify = FakeNotifyAdapter::new();
    let launcher = Launcher::new(shell_command("exit 0"), notify, FakeHealthProbe::new());
    for spec in &specs {
        launcher.launch(spec).unwrap();
        assert!(spec.log_file.is_file());
    }
    assert!(tmp.path().join("output/8188").is_dir());
    assert!(tmp.path().join("output/8189").is_dir());
}
