//! # pipevisor
//!
//! **Pipevisor** supervises a two-process pipeline, the equivalent of the shell's
//! `producer | consumer`. It starts both programs joined by an anonymous pipe,
//! waits for either to exit, tears the other one down and, depending on the
//! [`RestartPolicy`], starts a fresh pipeline or stops.
//!
//! ## Architecture
//! ```text
//!   SignalListener ── SIGHUP/SIGINT/SIGTERM ──► CancellationToken (shutdown flag)
//!                                                      │ read between generations
//!                                                      ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (restart loop)                                        │
//! │  - PipeEnds (fresh pipe per generation)                           │
//! │  - handoff channel (Launched / Exited / LaunchFailed)             │
//! │  - Bus + SubscriberSet (lifecycle events)                         │
//! └──────┬───────────────────────────────────────────────┬────────────┘
//!        ▼                                               ▼
//!   ┌──────────────────────┐                     ┌──────────────────────┐
//!   │ ChildWatcher         │                     │ ChildWatcher         │
//!   │ (producer)           │                     │ (consumer)           │
//!   └──────┬───────────────┘                     └──────┬───────────────┘
//!          ▼ spawn                                      ▼ spawn
//!     producer stdout ════════════ pipe ════════════► consumer stdin
//! ```
//!
//! ### Lifecycle
//! ```text
//! loop {
//!   ├─► shutdown requested? ─► stop
//!   ├─► create pipe, publish GenerationStarting
//!   ├─► spawn both watchers; wait for both acknowledgements
//!   ├─► close supervisor pipe ends
//!   ├─► wait for first exit ─► SIGTERM the survivor ─► reap both
//!   ├─► publish GenerationFinished
//!   └─► RestartPolicy::NoRestart ─► stop
//!       RestartPolicy::Restart   ─► shutdown requested? stop : continue
//! }
//! ```
//!
//! ## Features
//! | Area              | Description                                                 | Key types / traits                       |
//! |-------------------|-------------------------------------------------------------|------------------------------------------|
//! | **Supervision**   | Run generations of a producer/consumer pair.                | [`Supervisor`], [`SupervisorBuilder`]    |
//! | **Policies**      | Restart after each generation, or stop.                     | [`RestartPolicy`]                        |
//! | **Signals**       | Deferred shutdown on SIGHUP/SIGINT/SIGTERM.                 | [`SignalListener`]                       |
//! | **Subscriber API**| Hook into lifecycle events.                                 | [`Subscribe`], [`Event`], [`EventKind`]  |
//! | **Errors**        | Typed runtime and launch errors.                            | [`RuntimeError`], [`LaunchError`]        |
//! | **Configuration** | Programs, policy and teardown settings.                     | [`SupervisorConfig`]                     |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```no_run
//! use std::sync::Arc;
//! use pipevisor::{RestartPolicy, SignalListener, Subscribe, Supervisor, SupervisorConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = SupervisorConfig::new("/opt/bin/produce", "/opt/bin/consume");
//!     cfg.restart = RestartPolicy::Restart;
//!
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(pipevisor::LogWriter)];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let sup = Supervisor::builder(cfg).with_subscribers(subs).build();
//!     let signals = SignalListener::install(sup.shutdown_token(), sup.bus().clone())?;
//!     tokio::spawn(signals.run());
//!
//!     let stopped = sup.run().await?;
//!     eprintln!("stopped: {:?}", stopped.reason);
//!     Ok(())
//! }
//! ```

#[cfg(not(unix))]
compile_error!("pipevisor supports Unix platforms only");

mod core;
mod error;
mod events;
mod policies;
mod subscribers;

// ---- Public re-exports ----

pub use crate::core::{
    Role, SignalListener, StopReason, Stopped, Supervisor, SupervisorBuilder, SupervisorConfig,
};
pub use error::{LaunchError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::RestartPolicy;
pub use subscribers::{Subscribe, SubscriberSet};

#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
