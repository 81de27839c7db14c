//! Exit status and signal handling of the `pipevisor` binary.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;

const BIN: &str = env!("CARGO_BIN_EXE_pipevisor");

fn script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

fn pipevisor() -> Command {
    let mut cmd = Command::new(BIN);
    cmd.env_remove("PIPEVISOR_PRODUCER")
        .env_remove("PIPEVISOR_CONSUMER")
        .stdout(Stdio::null())
        .stderr(Stdio::null());
    cmd
}

#[test]
fn test_missing_arguments_exit_1() {
    let status = pipevisor().status().unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_help_exits_0() {
    let status = pipevisor().arg("--help").status().unwrap();
    assert_eq!(status.code(), Some(0));
}

#[test]
fn test_norestart_run_exits_1() {
    let dir = tempfile::tempdir().unwrap();
    let producer = script(dir.path(), "produce", "exit 0");
    let consumer = script(dir.path(), "consume", "exit 0");

    let status = pipevisor()
        .arg("--producer")
        .arg(&producer)
        .arg("--consumer")
        .arg(&consumer)
        .arg("--norestart")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_env_fallback_for_programs() {
    let dir = tempfile::tempdir().unwrap();
    let producer = script(dir.path(), "produce", "exit 0");
    let consumer = script(dir.path(), "consume", "exit 0");

    let status = pipevisor()
        .env("PIPEVISOR_PRODUCER", &producer)
        .env("PIPEVISOR_CONSUMER", &consumer)
        .arg("--norestart")
        .status()
        .unwrap();
    assert_eq!(status.code(), Some(1));
}

#[test]
fn test_sigterm_waits_for_running_generation() {
    let dir = tempfile::tempdir().unwrap();
    let producer = script(dir.path(), "produce", "exec sleep 2");
    let consumer = script(dir.path(), "consume", "exec sleep 30");

    let started = Instant::now();
    let mut child = pipevisor()
        .arg("--producer")
        .arg(&producer)
        .arg("--consumer")
        .arg(&consumer)
        .spawn()
        .unwrap();

    thread::sleep(Duration::from_millis(500));
    let pid = Pid::from_raw(i32::try_from(child.id()).unwrap());
    kill(pid, Signal::SIGTERM).unwrap();

    let status = child.wait().unwrap();
    let elapsed = started.elapsed();

    assert_eq!(status.code(), Some(1));
    assert!(elapsed >= Duration::from_secs(2), "stopped after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(30), "stopped after {elapsed:?}");
}
