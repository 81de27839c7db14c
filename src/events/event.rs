//! # Runtime events emitted by the supervisor, child watchers and signal listener.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Generation events**: one pipeline generation starting, finishing, restarting
//! - **Child events**: one side of the pipeline launched, failed to launch, exited, terminated
//! - **Shutdown events**: signal observed, supervisor loop ended
//! - **Subscriber events**: delivery problems inside the subscriber fan-out
//!
//! The [`Event`] struct carries additional metadata such as the generation number,
//! role, process id, exit status and a free-form reason.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use pipevisor::{Event, EventKind, Role};
//!
//! let ev = Event::new(EventKind::ChildLaunched)
//!     .with_generation(2)
//!     .with_role(Role::Producer)
//!     .with_pid(4242);
//!
//! assert_eq!(ev.kind, EventKind::ChildLaunched);
//! assert_eq!(ev.role, Some(Role::Producer));
//! assert_eq!(ev.pid, Some(4242));
//! ```

use std::process::ExitStatus;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::core::Role;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `reason`: subscriber name and panic message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `reason`: subscriber name and drop reason ("full", "closed")
    SubscriberOverflow,

    // === Generation events ===
    /// A new pipeline generation is starting (fresh pipe allocated).
    ///
    /// Sets:
    /// - `generation`: generation number (1-based)
    GenerationStarting,

    /// Both sides of the generation exited and were reaped.
    ///
    /// Sets:
    /// - `generation`: generation number
    /// - `role`: side that exited first
    GenerationFinished,

    /// Restart policy allows another generation and no shutdown was requested.
    ///
    /// Sets:
    /// - `generation`: number of the generation about to start
    RestartScheduled,

    // === Child events ===
    /// One side of the pipeline was spawned with its pipe end bound.
    ///
    /// Sets:
    /// - `generation`, `role`, `pid`
    /// - `reason`: program path
    ChildLaunched,

    /// One side of the pipeline could not be started.
    ///
    /// Sets:
    /// - `generation`, `role`
    /// - `reason`: launch error message
    ChildLaunchFailed,

    /// One side of the pipeline exited and was reaped.
    ///
    /// Sets:
    /// - `generation`, `role`, `pid`
    /// - `status`: exit status (`None` if waiting on the child failed)
    ChildExited,

    /// A termination signal was sent to a still-tracked child.
    ///
    /// Sets:
    /// - `generation`, `role`, `pid`
    /// - `reason`: signal name (`SIGTERM`, or `SIGKILL` on escalation)
    TerminateSent,

    // === Shutdown events ===
    /// Shutdown requested (OS signal observed); honoured between generations.
    ///
    /// Sets:
    /// - `reason`: signal name
    ShutdownRequested,

    /// The supervisor loop ended. This is always the last event of a run.
    ///
    /// Sets:
    /// - `generation`: number of generations that ran
    /// - `reason`: stop reason or error label
    SupervisorStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Pipeline generation (1-based).
    pub generation: Option<u64>,
    /// Side of the pipeline, if applicable.
    pub role: Option<Role>,
    /// Process id of the child, if applicable.
    pub pid: Option<u32>,
    /// Exit status of the child (for `ChildExited`).
    pub status: Option<ExitStatus>,
    /// Human-readable reason (errors, signal names, program paths).
    pub reason: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            generation: None,
            role: None,
            pid: None,
            status: None,
            reason: None,
        }
    }

    /// Attaches a generation number.
    #[inline]
    pub fn with_generation(mut self, generation: u64) -> Self {
        self.generation = Some(generation);
        self
    }

    /// Attaches a pipeline role.
    #[inline]
    pub fn with_role(mut self, role: Role) -> Self {
        self.role = Some(role);
        self
    }

    /// Attaches a process id.
    #[inline]
    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = Some(pid);
        self
    }

    /// Attaches an exit status.
    #[inline]
    pub fn with_status(mut self, status: ExitStatus) -> Self {
        self.status = Some(status);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"))
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        Event::new(EventKind::SubscriberPanicked)
            .with_reason(format!("subscriber={subscriber} panic={info}"))
    }

    /// Raw wait status of a `ChildExited` event, as returned by `waitpid`.
    pub fn raw_status(&self) -> Option<i32> {
        use std::os::unix::process::ExitStatusExt;
        self.status.map(ExitStatusExt::into_raw)
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::process::ExitStatusExt;

    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::GenerationStarting);
        let b = Event::new(EventKind::GenerationFinished);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_raw_status_roundtrips_wait_status() {
        // exit code 3 is encoded in the high byte of the wait status
        let ev = Event::new(EventKind::ChildExited).with_status(ExitStatus::from_raw(3 << 8));
        assert_eq!(ev.raw_status(), Some(3 << 8));
        assert_eq!(ev.status.and_then(|s| s.code()), Some(3));

        let bare = Event::new(EventKind::ChildExited);
        assert_eq!(bare.raw_status(), None);
    }

    #[test]
    fn test_subscriber_events_carry_name() {
        let ev = Event::subscriber_overflow("log", "full");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.reason.as_deref(), Some("subscriber=log reason=full"));
    }
}
