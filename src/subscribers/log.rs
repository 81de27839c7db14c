//! # Logging subscriber.
//!
//! [`LogWriter`] renders runtime events through `tracing`, so the output
//! follows whatever subscriber the binary installed.
//!
//! ## Output (fmt layer)
//! ```text
//! INFO  generation 1 starting
//! INFO  producer launched generation=1 pid=4242 program=/opt/bin/produce
//! INFO  producer exited generation=1 pid=4242 status=0 code=0
//! WARN  terminating consumer generation=1 pid=4243 signal=SIGTERM
//! INFO  generation 1 finished first_exit=producer
//! INFO  restarting pipeline generation=2
//! WARN  shutdown requested signal=SIGINT
//! ERROR supervisor stopped generations=2 reason=shutdown_requested
//! ```

use std::os::unix::process::ExitStatusExt;

use async_trait::async_trait;
use tracing::{debug, error, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Subscriber that logs every event with `tracing`.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let generation = e.generation.unwrap_or_default();
        let role = e.role.map(|r| r.as_str()).unwrap_or("-");
        let pid = e.pid.unwrap_or_default();
        let reason = e.reason.as_deref().unwrap_or("");

        match e.kind {
            EventKind::GenerationStarting => info!("generation {generation} starting"),
            EventKind::ChildLaunched => {
                info!(generation, pid, program = reason, "{role} launched")
            }
            EventKind::ChildLaunchFailed => {
                error!(generation, error = reason, "{role} failed to launch")
            }
            EventKind::ChildExited => match e.status {
                Some(status) => info!(
                    generation,
                    pid,
                    status = status.into_raw(),
                    code = ?status.code(),
                    signal = ?status.signal(),
                    "{role} exited"
                ),
                None => warn!(generation, pid, "{role} exited with unknown status"),
            },
            EventKind::TerminateSent => {
                warn!(generation, pid, signal = reason, "terminating {role}")
            }
            EventKind::GenerationFinished => {
                info!(first_exit = role, "generation {generation} finished")
            }
            EventKind::RestartScheduled => info!(generation, "restarting pipeline"),
            EventKind::ShutdownRequested => warn!(signal = reason, "shutdown requested"),
            EventKind::SupervisorStopped => {
                error!(generations = generation, reason, "supervisor stopped")
            }
            EventKind::SubscriberOverflow => debug!(reason, "subscriber dropped an event"),
            EventKind::SubscriberPanicked => error!(reason, "subscriber panicked"),
        }
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
