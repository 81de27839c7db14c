//! # Process launcher: bind one pipe end and start the program.
//!
//! [`launch`] performs the launch sequence for one side of the pipeline:
//!
//! ```text
//! 1. drop the unused end          (producer: read end, consumer: write end)
//! 2. set O_NONBLOCK on the bound end
//! 3. dup the bound end onto stdout (producer) / stdin (consumer)   ┐
//! 4. close the original bound descriptor                           ├ Command::spawn
//! 5. exec the program, argv[0] = base name, inherited environment  ┘
//! ```
//!
//! Steps 3 to 5 run inside `Command::spawn`: the bound end is handed over as
//! `Stdio`, the child `dup2`s it onto the standard stream and the close-on-exec
//! original disappears at `exec`. The parent's copy is closed when the
//! `Command` is dropped at the end of [`launch`].
//!
//! Children are spawned with `kill_on_drop`: if a watcher is aborted (a
//! generation ended on a fatal error) its child is killed, never orphaned.
//!
//! An exec failure is reported back by `spawn` as an error, so it surfaces
//! here as [`LaunchError::Spawn`] rather than as a child exiting with status 1.

use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::debug;

use super::pipe::{PipeEnds, set_nonblocking};
use super::role::Role;
use crate::error::LaunchError;

/// Starts `program` as `role`, bound to its end of `pipe`.
pub fn launch(role: Role, program: &Path, pipe: PipeEnds) -> Result<Child, LaunchError> {
    let (bound, unused) = pipe.into_bound(role);
    drop(unused);

    set_nonblocking(&bound).map_err(|source| LaunchError::Descriptor {
        op: "fcntl(O_NONBLOCK)",
        source,
    })?;

    let mut cmd = Command::new(program);
    cmd.arg0(base_name(program)).kill_on_drop(true);
    match role {
        Role::Producer => cmd.stdout(Stdio::from(bound)),
        Role::Consumer => cmd.stdin(Stdio::from(bound)),
    };

    debug!(%role, program = %program.display(), "exec");
    cmd.spawn().map_err(|source| LaunchError::Spawn {
        path: program.to_path_buf(),
        source,
    })
}

/// Returns the last path component, or the whole path if it has none.
fn base_name(program: &Path) -> &OsStr {
    program.file_name().unwrap_or(program.as_os_str())
}

#[cfg(test)]
mod tests {
    use std::io;

    use super::*;

    #[test]
    fn test_base_name() {
        assert_eq!(base_name(Path::new("/usr/bin/cat")), "cat");
        assert_eq!(base_name(Path::new("run.sh")), "run.sh");
        assert_eq!(base_name(Path::new("/")), "/");
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let pipe = PipeEnds::new().unwrap();
        let err = launch(Role::Producer, Path::new("/nonexistent/producer"), pipe).unwrap_err();

        assert!(!err.is_fatal());
        match err {
            LaunchError::Spawn { path, source } => {
                assert_eq!(path, Path::new("/nonexistent/producer"));
                assert_eq!(source.kind(), io::ErrorKind::NotFound);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[cfg(target_os = "linux")]
    #[tokio::test]
    async fn test_dropped_child_is_killed() {
        use std::fs;
        use std::os::unix::fs::PermissionsExt;
        use std::time::{Duration, Instant};

        let dir = tempfile::tempdir().unwrap();
        let program = dir.path().join("linger");
        fs::write(&program, "#!/bin/sh\nexec sleep 30\n").unwrap();
        fs::set_permissions(&program, fs::Permissions::from_mode(0o755)).unwrap();

        let child = launch(Role::Producer, &program, PipeEnds::new().unwrap()).unwrap();
        let pid = child.id().unwrap();
        drop(child);

        // gone, or a zombie waiting for the orphan reaper
        let deadline = Instant::now() + Duration::from_secs(5);
        loop {
            let state = fs::read_to_string(format!("/proc/{pid}/stat"))
                .ok()
                .and_then(|stat| stat.rsplit(')').next().map(|rest| rest.trim_start().to_owned()));
            match state {
                None => break,
                Some(rest) if rest.starts_with('Z') => break,
                Some(_) => {}
            }
            assert!(Instant::now() < deadline, "child {pid} survived its handle");
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }

    #[tokio::test]
    async fn test_consumer_reads_bound_end() {
        use std::fs::File;
        use std::io::Write;

        let pipe = PipeEnds::new().unwrap();
        let mut child = launch(Role::Consumer, Path::new("/bin/true"), pipe.try_clone().unwrap()).unwrap();
        assert!(child.id().is_some());

        // the consumer holds its read end; the supervisor side can still write
        let (write, _read) = pipe.into_bound(Role::Producer);
        let mut writer = File::from(write);
        let _ = writer.write_all(b"ignored");
        drop(writer);

        let status = child.wait().await.unwrap();
        assert!(status.success());
    }
}
