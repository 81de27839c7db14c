//! # Supervisor configuration.
//!
//! Provides [`SupervisorConfig`] centralized settings for one supervisor run.
//! The binary builds it from command-line arguments; library users fill the
//! public fields directly.
//!
//! ## Sentinel values
//! - `kill_after = 0s` → never escalate to `SIGKILL` (wait for the survivor indefinitely)

use std::path::{Path, PathBuf};
use std::time::Duration;

use super::role::Role;
use crate::policies::RestartPolicy;

/// Configuration for a producer/consumer supervisor.
///
/// ## Field semantics
/// - `producer` / `consumer`: programs to execute; used as given, so pass absolute paths
/// - `restart`: what to do after a generation ends
/// - `kill_after`: grace before `SIGKILL` for a survivor that ignored `SIGTERM` (`0s` = never)
/// - `bus_capacity`: event bus ring buffer size (min 1)
#[derive(Clone, Debug)]
pub struct SupervisorConfig {
    /// Program whose standard output feeds the pipe.
    pub producer: PathBuf,
    /// Program whose standard input drains the pipe.
    pub consumer: PathBuf,
    /// Restart policy applied after every generation.
    pub restart: RestartPolicy,
    /// Delay between `SIGTERM` and `SIGKILL` for the surviving child.
    pub kill_after: Duration,
    /// Capacity of the event bus broadcast channel.
    pub bus_capacity: usize,
}

impl SupervisorConfig {
    /// Creates a configuration with default policy settings:
    ///
    /// - `restart = RestartPolicy::Restart`
    /// - `kill_after = 0s` (no escalation)
    /// - `bus_capacity = 1024`
    pub fn new(producer: impl Into<PathBuf>, consumer: impl Into<PathBuf>) -> Self {
        Self {
            producer: producer.into(),
            consumer: consumer.into(),
            restart: RestartPolicy::default(),
            kill_after: Duration::ZERO,
            bus_capacity: 1024,
        }
    }

    /// Program launched for `role`.
    #[inline]
    pub fn program(&self, role: Role) -> &Path {
        match role {
            Role::Producer => &self.producer,
            Role::Consumer => &self.consumer,
        }
    }

    /// Returns the `SIGKILL` escalation delay as an `Option`.
    ///
    /// - `None` → never escalate
    /// - `Some(d)` → escalate `d` after `SIGTERM`
    #[inline]
    pub fn kill_after(&self) -> Option<Duration> {
        if self.kill_after == Duration::ZERO {
            None
        } else {
            Some(self.kill_after)
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}
