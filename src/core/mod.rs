//! Runtime core: pipeline generations and their lifecycle.
//!
//! The public API from this module is [`Supervisor`] (with its builder and
//! configuration), [`Role`] and [`SignalListener`].
//!
//! Internal modules:
//! - [`pipe`]: pipe endpoint pair, close-on-exec and non-blocking setup;
//! - [`launcher`]: binds one pipe end onto a standard stream and spawns the program;
//! - [`watcher`]: launches and reaps one side, reports through the handoff channel;
//! - [`supervisor`]: the restart loop and per-generation state machine;
//! - [`shutdown`]: OS signal handling.

mod builder;
mod config;
mod launcher;
mod pipe;
mod role;
mod shutdown;
mod supervisor;
mod watcher;

pub use builder::SupervisorBuilder;
pub use config::SupervisorConfig;
pub use role::Role;
pub use shutdown::SignalListener;
pub use supervisor::{StopReason, Stopped, Supervisor};
