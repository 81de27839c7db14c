//! # Supervisor: runs pipeline generations under a restart policy.
//!
//! The [`Supervisor`] owns the event bus, a [`SubscriberSet`] and the shutdown
//! token. Each loop iteration runs one *generation*: a fresh pipe, one producer
//! and one consumer.
//!
//! ## Generation state machine
//! ```text
//! Idle ─► PipeCreated ─► BothLaunched ─► Running ─► OneExited ─► Reaping ─┬─► Restart ─► Idle
//!                                                                         └─► Terminal
//!
//! PipeCreated   PipeEnds::new(); one clone per watcher
//! BothLaunched  spawn both ChildWatchers; wait for two acknowledgements
//!               (Launched or LaunchFailed, any order; early Exited is buffered)
//! Running       drop the supervisor's pipe ends; wait for the first exit
//! OneExited     SIGTERM every tracked child whose exit is not yet reported
//! Reaping       wait for the remaining exits (SIGKILL after `kill_after`, if set)
//! Decision      NoRestart → stop; shutdown requested → stop; otherwise restart
//! ```
//!
//! ## Shutdown
//! The shutdown token is only consulted between generations. A signal that
//! arrives while a generation runs lets that generation end on its own first.
//!
//! ## Example
//! ```no_run
//! use pipevisor::{RestartPolicy, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::new("/usr/local/bin/produce", "/usr/local/bin/consume");
//!     cfg.restart = RestartPolicy::NoRestart;
//!
//!     let sup = Supervisor::builder(cfg).build();
//!     let stopped = sup.run().await?;
//!     println!("stopped after {} generation(s): {:?}", stopped.generations, stopped.reason);
//!     Ok(())
//! }
//! ```

use std::os::unix::process::ExitStatusExt;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill};
use nix::unistd::Pid;
use tokio::sync::{broadcast::error::RecvError, mpsc};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{self, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::builder::SupervisorBuilder;
use super::config::SupervisorConfig;
use super::pipe::PipeEnds;
use super::role::Role;
use super::watcher::{ChildWatcher, Handoff};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::subscribers::SubscriberSet;

/// Why the supervisor loop ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// The restart policy is [`NoRestart`](crate::RestartPolicy::NoRestart).
    PolicyNoRestart,
    /// A shutdown was requested; observed at a generation boundary.
    ShutdownRequested,
}

impl StopReason {
    /// Returns a short stable label for logs and events.
    pub fn as_str(self) -> &'static str {
        match self {
            StopReason::PolicyNoRestart => "policy_no_restart",
            StopReason::ShutdownRequested => "shutdown_requested",
        }
    }
}

/// Outcome of a supervisor run that ended without a fatal error.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stopped {
    /// Why the loop ended.
    pub reason: StopReason,
    /// Number of generations that ran.
    pub generations: u64,
}

/// Runs producer/consumer generations until the policy or a shutdown request stops it.
pub struct Supervisor {
    cfg: SupervisorConfig,
    bus: Bus,
    subs: Option<SubscriberSet>,
    shutdown: CancellationToken,
}

impl Supervisor {
    /// Returns a builder for a supervisor with the given configuration.
    pub fn builder(cfg: SupervisorConfig) -> SupervisorBuilder {
        SupervisorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: SupervisorConfig,
        bus: Bus,
        subs: SubscriberSet,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            cfg,
            bus,
            subs: Some(subs),
            shutdown,
        }
    }

    /// Event bus shared with watchers and the signal listener.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Token that requests a stop at the next generation boundary.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Configuration this supervisor runs with.
    pub fn config(&self) -> &SupervisorConfig {
        &self.cfg
    }

    /// Runs generations until the restart policy or a shutdown request ends the loop.
    ///
    /// Always publishes [`EventKind::SupervisorStopped`] last and waits for the
    /// subscribers to drain before returning.
    pub async fn run(mut self) -> Result<Stopped, RuntimeError> {
        let listener = self.subscriber_listener();
        let res = self.drive().await;

        let ev = match &res {
            Ok(stopped) => Event::new(EventKind::SupervisorStopped)
                .with_generation(stopped.generations)
                .with_reason(stopped.reason.as_str()),
            Err(e) => Event::new(EventKind::SupervisorStopped)
                .with_reason(format!("{}: {e}", e.as_label())),
        };
        self.bus.publish(ev);

        if let Some(listener) = listener {
            let _ = listener.await;
        }
        res
    }

    /// Subscribes to the bus and forwards events to the subscriber set until
    /// `SupervisorStopped`, then drains the subscriber workers.
    fn subscriber_listener(&mut self) -> Option<JoinHandle<()>> {
        let set = self.subs.take().filter(|set| !set.is_empty())?;
        debug!(subscribers = set.len(), "starting subscriber listener");
        let mut rx = self.bus.subscribe();
        Some(tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ev) => {
                        let last = ev.kind == EventKind::SupervisorStopped;
                        set.emit(&ev);
                        if last {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        debug!(skipped, "subscriber listener lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            set.shutdown().await;
        }))
    }

    /// The restart loop.
    async fn drive(&self) -> Result<Stopped, RuntimeError> {
        let mut generation = 0;
        loop {
            if self.shutdown.is_cancelled() {
                return Ok(Stopped {
                    reason: StopReason::ShutdownRequested,
                    generations: generation,
                });
            }
            generation += 1;
            self.run_generation(generation).await?;

            if !self.cfg.restart.allows_restart() {
                return Ok(Stopped {
                    reason: StopReason::PolicyNoRestart,
                    generations: generation,
                });
            }
            if !self.shutdown.is_cancelled() {
                self.bus
                    .publish(Event::new(EventKind::RestartScheduled).with_generation(generation + 1));
            }
        }
    }

    /// Runs one generation from pipe creation until both children are reaped.
    async fn run_generation(&self, generation: u64) -> Result<(), RuntimeError> {
        let pipe = PipeEnds::new().map_err(|source| RuntimeError::Pipe { op: "pipe2", source })?;
        let (read, write) = pipe.raw();
        debug!(generation, read, write, "created pipe");

        let mut ends = Vec::with_capacity(Role::ALL.len());
        for _ in Role::ALL {
            ends.push(pipe.try_clone().map_err(|source| RuntimeError::Pipe { op: "dup", source })?);
        }

        self.bus
            .publish(Event::new(EventKind::GenerationStarting).with_generation(generation));

        let (tx, mut rx) = mpsc::channel::<Handoff>(1);
        let mut watchers = JoinSet::new();
        for (role, ends) in Role::ALL.into_iter().zip(ends) {
            let watcher = ChildWatcher::new(
                role,
                self.cfg.program(role).to_path_buf(),
                generation,
                self.bus.clone(),
            );
            watchers.spawn(watcher.watch(ends, tx.clone()));
        }
        drop(tx);

        let mut state = GenerationState::default();
        while !state.all_acknowledged() {
            self.next_handoff(&mut rx, &mut state, generation).await?;
        }

        drop(pipe);
        debug!(generation, "both children launched; closed supervisor pipe ends");

        let first = loop {
            if let Some(role) = state.first_exit {
                break role;
            }
            self.next_handoff(&mut rx, &mut state, generation).await?;
        };
        debug!(generation, %first, survivor = %first.sibling(), "first exit; tearing down the pipeline");

        self.signal_running(&state, Signal::SIGTERM, generation);
        self.reap(&mut rx, &mut state, generation).await?;
        while watchers.join_next().await.is_some() {}

        self.bus.publish(
            Event::new(EventKind::GenerationFinished)
                .with_generation(generation)
                .with_role(first),
        );
        Ok(())
    }

    /// Receives and records one handoff message; on a fatal launch error the
    /// already-launched children are terminated before the error is returned.
    async fn next_handoff(
        &self,
        rx: &mut mpsc::Receiver<Handoff>,
        state: &mut GenerationState,
        generation: u64,
    ) -> Result<(), RuntimeError> {
        let msg = rx
            .recv()
            .await
            .ok_or(RuntimeError::HandoffClosed { generation })?;
        match state.record(msg) {
            Ok(()) => Ok(()),
            Err(e) => {
                self.signal_running(state, Signal::SIGTERM, generation);
                Err(e)
            }
        }
    }

    /// Waits until every child of the generation has reported its exit.
    async fn reap(
        &self,
        rx: &mut mpsc::Receiver<Handoff>,
        state: &mut GenerationState,
        generation: u64,
    ) -> Result<(), RuntimeError> {
        let mut deadline = self.cfg.kill_after().map(|d| Instant::now() + d);
        while !state.all_exited() {
            let Some(at) = deadline else {
                self.next_handoff(rx, state, generation).await?;
                continue;
            };
            match time::timeout_at(at, self.next_handoff(rx, state, generation)).await {
                Ok(res) => res?,
                Err(_elapsed) => {
                    warn!(generation, "survivor ignored SIGTERM; escalating to SIGKILL");
                    self.signal_running(state, Signal::SIGKILL, generation);
                    deadline = None;
                }
            }
        }
        Ok(())
    }

    /// Sends `signal` to every tracked child whose exit has not been reported.
    ///
    /// Reported children are skipped: they have been reaped and their pid may
    /// already belong to another process.
    fn signal_running(&self, state: &GenerationState, signal: Signal, generation: u64) {
        for (role, pid) in state.running() {
            self.bus.publish(
                Event::new(EventKind::TerminateSent)
                    .with_generation(generation)
                    .with_role(role)
                    .with_pid(pid)
                    .with_reason(signal.as_str()),
            );
            let Ok(raw) = i32::try_from(pid) else {
                continue;
            };
            match kill(Pid::from_raw(raw), signal) {
                Ok(()) => {}
                Err(Errno::ESRCH) => debug!(%role, pid, "child already gone"),
                Err(e) => warn!(%role, pid, error = %e, signal = signal.as_str(), "failed to signal child"),
            }
        }
    }
}

/// Per-generation bookkeeping of what the watchers have reported.
#[derive(Debug, Default)]
struct GenerationState {
    pids: [Option<u32>; 2],
    acknowledged: [bool; 2],
    exited: [bool; 2],
    first_exit: Option<Role>,
}

impl GenerationState {
    /// Applies one handoff message. Fatal launch errors are returned.
    fn record(&mut self, msg: Handoff) -> Result<(), RuntimeError> {
        match msg {
            Handoff::Launched { role, pid } => {
                self.acknowledged[role.index()] = true;
                self.pids[role.index()] = Some(pid);
            }
            Handoff::Exited { role, pid, status } => {
                let raw = status.map(ExitStatusExt::into_raw);
                debug!(%role, pid, ?raw, "exit reported");
                self.mark_exited(role);
            }
            Handoff::LaunchFailed { role, error } => {
                if error.is_fatal() {
                    return Err(RuntimeError::Launch {
                        role,
                        source: error,
                    });
                }
                self.acknowledged[role.index()] = true;
                self.mark_exited(role);
            }
        }
        Ok(())
    }

    fn mark_exited(&mut self, role: Role) {
        self.exited[role.index()] = true;
        self.first_exit.get_or_insert(role);
    }

    fn all_acknowledged(&self) -> bool {
        self.acknowledged.iter().all(|a| *a)
    }

    fn all_exited(&self) -> bool {
        self.exited.iter().all(|e| *e)
    }

    /// Launched children whose exit has not been reported yet.
    fn running(&self) -> impl Iterator<Item = (Role, u32)> + '_ {
        Role::ALL.into_iter().filter_map(move |role| {
            let i = role.index();
            if self.exited[i] {
                None
            } else {
                self.pids[i].map(|pid| (role, pid))
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::os::unix::process::ExitStatusExt;
    use std::process::ExitStatus;
    use std::time::Duration;

    use super::*;
    use crate::error::LaunchError;

    fn exited(role: Role, pid: u32) -> Handoff {
        Handoff::Exited {
            role,
            pid,
            status: Some(ExitStatus::from_raw(0)),
        }
    }

    #[test]
    fn test_early_exit_is_buffered_until_both_acknowledged() {
        let mut state = GenerationState::default();
        state
            .record(Handoff::Launched { role: Role::Producer, pid: 10 })
            .unwrap();
        state.record(exited(Role::Producer, 10)).unwrap();

        assert!(!state.all_acknowledged());
        assert_eq!(state.first_exit, Some(Role::Producer));

        state
            .record(Handoff::Launched { role: Role::Consumer, pid: 11 })
            .unwrap();
        assert!(state.all_acknowledged());
        assert_eq!(state.running().collect::<Vec<_>>(), vec![(Role::Consumer, 11)]);
    }

    #[test]
    fn test_first_exit_is_sticky() {
        let mut state = GenerationState::default();
        for (role, pid) in [(Role::Producer, 1), (Role::Consumer, 2)] {
            state.record(Handoff::Launched { role, pid }).unwrap();
        }
        state.record(exited(Role::Consumer, 2)).unwrap();
        state.record(exited(Role::Producer, 1)).unwrap();

        assert_eq!(state.first_exit, Some(Role::Consumer));
        assert!(state.all_exited());
        assert_eq!(state.running().count(), 0);
    }

    #[test]
    fn test_spawn_failure_counts_as_acknowledged_exit() {
        let mut state = GenerationState::default();
        state
            .record(Handoff::LaunchFailed {
                role: Role::Consumer,
                error: LaunchError::Spawn {
                    path: "/nonexistent".into(),
                    source: io::Error::from(io::ErrorKind::NotFound),
                },
            })
            .unwrap();
        state
            .record(Handoff::Launched { role: Role::Producer, pid: 5 })
            .unwrap();

        assert!(state.all_acknowledged());
        assert_eq!(state.first_exit, Some(Role::Consumer));
        assert_eq!(state.running().collect::<Vec<_>>(), vec![(Role::Producer, 5)]);
    }

    #[test]
    fn test_descriptor_failure_is_fatal() {
        let mut state = GenerationState::default();
        let err = state
            .record(Handoff::LaunchFailed {
                role: Role::Producer,
                error: LaunchError::Descriptor {
                    op: "fcntl(O_NONBLOCK)",
                    source: Errno::EBADF,
                },
            })
            .unwrap_err();

        assert_eq!(err.as_label(), "runtime_launch");
        assert!(!state.all_acknowledged());
    }

    #[tokio::test]
    async fn test_runs_without_subscribers() {
        let mut cfg = SupervisorConfig::new("/bin/true", "/bin/true");
        cfg.restart = crate::RestartPolicy::NoRestart;
        let sup = Supervisor::builder(cfg).build();
        let mut events = sup.bus().subscribe();

        let stopped = time::timeout(Duration::from_secs(10), sup.run())
            .await
            .expect("supervisor stopped")
            .unwrap();
        assert_eq!(stopped.reason, StopReason::PolicyNoRestart);
        assert_eq!(stopped.generations, 1);

        let mut last = None;
        while let Ok(ev) = events.try_recv() {
            last = Some(ev.kind);
        }
        assert_eq!(last, Some(EventKind::SupervisorStopped));
    }

    #[test]
    fn test_exit_report_frees_the_pid() {
        let mut state = GenerationState::default();
        state
            .record(Handoff::Launched { role: Role::Producer, pid: 7 })
            .unwrap();
        state
            .record(Handoff::Exited {
                role: Role::Producer,
                pid: 7,
                status: Some(ExitStatus::from_raw(3 << 8)),
            })
            .unwrap();

        assert_eq!(state.first_exit.map(Role::sibling), Some(Role::Consumer));
        assert_eq!(state.running().count(), 0);
    }

    #[test]
    fn test_stop_reason_labels() {
        assert_eq!(StopReason::PolicyNoRestart.as_str(), "policy_no_restart");
        assert_eq!(StopReason::ShutdownRequested.as_str(), "shutdown_requested");
    }
}
