//! # ChildWatcher: launches and reaps one side of a generation.
//!
//! Each generation runs two watchers concurrently, one per [`Role`]. A watcher
//! owns its child process for the whole lifetime of that process and reports to
//! the supervisor through the generation's handoff channel.
//!
//! ## Handoff protocol
//! ```text
//! watch()
//!   ├─► launch() ── Err ──► LaunchFailed { role, error }            (end)
//!   └─► Ok(child)
//!         ├─► Launched { role, pid }          pipe end set up, safe to close parent copies
//!         ├─► child.wait()                    (unbounded)
//!         └─► Exited { role, pid, status }    child reaped           (end)
//! ```
//!
//! ## Rules
//! - Exactly one process is launched per watcher.
//! - `Launched` is always sent before `Exited` (same sender, FIFO channel).
//! - The watcher keeps reaping even if the supervisor stopped listening.

use std::io;
use std::path::PathBuf;
use std::process::ExitStatus;

use tokio::sync::mpsc;
use tracing::{debug, error};

use super::launcher::launch;
use super::pipe::PipeEnds;
use super::role::Role;
use crate::error::LaunchError;
use crate::events::{Bus, Event, EventKind};

/// Message from a watcher to the supervisor.
#[derive(Debug)]
pub enum Handoff {
    /// Child spawned; its pipe end is bound.
    Launched { role: Role, pid: u32 },
    /// Child exited and was reaped. `status` is `None` if waiting failed.
    Exited {
        role: Role,
        pid: u32,
        status: Option<ExitStatus>,
    },
    /// Child could not be started.
    LaunchFailed { role: Role, error: LaunchError },
}

/// Launches and supervises one side of a pipeline generation.
pub struct ChildWatcher {
    role: Role,
    program: PathBuf,
    generation: u64,
    bus: Bus,
}

impl ChildWatcher {
    /// Creates a watcher for `role` running `program` in `generation`.
    pub fn new(role: Role, program: PathBuf, generation: u64, bus: Bus) -> Self {
        Self {
            role,
            program,
            generation,
            bus,
        }
    }

    /// Runs the watcher until its child has been reaped (or failed to launch).
    pub async fn watch(self, pipe: PipeEnds, handoff: mpsc::Sender<Handoff>) {
        let role = self.role;
        debug!(%role, generation = self.generation, "watcher starting");

        let mut child = match launch(role, &self.program, pipe) {
            Ok(child) => child,
            Err(error) => return self.report_failure(error, &handoff).await,
        };
        let Some(pid) = child.id() else {
            let error = LaunchError::Spawn {
                path: self.program.clone(),
                source: io::Error::other("child reaped before its pid was read"),
            };
            return self.report_failure(error, &handoff).await;
        };

        self.bus.publish(
            self.event(EventKind::ChildLaunched)
                .with_pid(pid)
                .with_reason(self.program.display().to_string()),
        );
        if handoff.send(Handoff::Launched { role, pid }).await.is_err() {
            debug!(%role, pid, "supervisor gone; still reaping child");
        }

        let status = match child.wait().await {
            Ok(status) => Some(status),
            Err(e) => {
                error!(%role, pid, error = %e, "failed to wait for child");
                None
            }
        };

        let mut ev = self.event(EventKind::ChildExited).with_pid(pid);
        if let Some(status) = status {
            ev = ev.with_status(status);
        }
        self.bus.publish(ev);
        let _ = handoff.send(Handoff::Exited { role, pid, status }).await;
    }

    async fn report_failure(&self, error: LaunchError, handoff: &mpsc::Sender<Handoff>) {
        self.bus.publish(
            self.event(EventKind::ChildLaunchFailed)
                .with_reason(error.to_string()),
        );
        let _ = handoff
            .send(Handoff::LaunchFailed {
                role: self.role,
                error,
            })
            .await;
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::new(kind)
            .with_generation(self.generation)
            .with_role(self.role)
    }
}
