//! # OS signal handling.
//!
//! Provides [`SignalListener`], which turns termination signals into a
//! shutdown request on a [`CancellationToken`].
//!
//! ## Signals
//! - `SIGHUP` (controlling terminal closed, or reload requested)
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//!
//! The listener never touches the pipeline's processes. The supervisor reads
//! the token only between generations, so a running generation always ends on
//! its own before the program stops.

use tokio::signal::unix::{Signal, SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};

/// Listens for termination signals and records a shutdown request.
pub struct SignalListener {
    hangup: Signal,
    interrupt: Signal,
    terminate: Signal,
    token: CancellationToken,
    bus: Bus,
}

impl SignalListener {
    /// Registers handlers for `SIGHUP`, `SIGINT` and `SIGTERM`.
    ///
    /// Handlers are active from this call on, before [`run`](Self::run) is
    /// polled. Must be called inside a Tokio runtime.
    pub fn install(token: CancellationToken, bus: Bus) -> Result<Self, RuntimeError> {
        Ok(Self {
            hangup: signal(SignalKind::hangup()).map_err(RuntimeError::Signal)?,
            interrupt: signal(SignalKind::interrupt()).map_err(RuntimeError::Signal)?,
            terminate: signal(SignalKind::terminate()).map_err(RuntimeError::Signal)?,
            token,
            bus,
        })
    }

    /// Waits for signals, cancelling the token on each one. Repeats are logged.
    pub async fn run(mut self) {
        loop {
            let name = tokio::select! {
                Some(()) = self.hangup.recv() => "SIGHUP",
                Some(()) = self.interrupt.recv() => "SIGINT",
                Some(()) = self.terminate.recv() => "SIGTERM",
                else => break,
            };
            warn!(
                signal = name,
                "shutdown requested; stopping after the current generation"
            );
            self.token.cancel();
            self.bus
                .publish(Event::new(EventKind::ShutdownRequested).with_reason(name));
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nix::sys::signal::{Signal as NixSignal, raise};

    use super::*;

    #[tokio::test]
    async fn test_sighup_sets_shutdown_flag() {
        let token = CancellationToken::new();
        let bus = Bus::new(8);
        let mut events = bus.subscribe();

        let listener = SignalListener::install(token.clone(), bus).unwrap();
        tokio::spawn(listener.run());
        raise(NixSignal::SIGHUP).unwrap();

        tokio::time::timeout(Duration::from_secs(5), token.cancelled())
            .await
            .expect("token cancelled");
        let ev = events.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::ShutdownRequested);
        assert_eq!(ev.reason.as_deref(), Some("SIGHUP"));
    }
}
