//! Error types used by the pipevisor runtime and its launcher.
//!
//! This module defines two main error enums:
//!
//! - [`RuntimeError`] errors raised by the supervisor itself; all of them are fatal.
//! - [`LaunchError`] errors raised while starting one side of the pipeline.
//!
//! Both types provide `as_label` for logs and [`LaunchError::is_fatal`] tells the
//! supervisor whether a launch failure ends the program or only the generation.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::core::Role;

/// # Errors produced by the pipevisor runtime.
///
/// Every variant terminates [`Supervisor::run`](crate::Supervisor::run); the
/// binary maps them to exit status `1`.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Creating or duplicating the pipe for a new generation failed.
    #[error("pipe operation `{op}` failed: {source}")]
    Pipe {
        /// Name of the failing operation.
        op: &'static str,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },

    /// A launch failed in a way that cannot be confined to the child.
    #[error("failed to launch {role}: {source}")]
    Launch {
        /// Side of the pipeline that failed.
        role: Role,
        /// Underlying launch failure.
        #[source]
        source: LaunchError,
    },

    /// Every watcher dropped its handoff sender before reporting.
    #[error("handoff channel closed during generation {generation}")]
    HandoffClosed {
        /// Generation in which the channel closed.
        generation: u64,
    },

    /// Installing the OS signal handlers failed.
    #[error("failed to install signal handlers: {0}")]
    Signal(#[source] io::Error),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs.
    ///
    /// # Example
    /// ```
    /// use pipevisor::RuntimeError;
    ///
    /// let err = RuntimeError::HandoffClosed { generation: 3 };
    /// assert_eq!(err.as_label(), "runtime_handoff_closed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Pipe { .. } => "runtime_pipe",
            RuntimeError::Launch { .. } => "runtime_launch",
            RuntimeError::HandoffClosed { .. } => "runtime_handoff_closed",
            RuntimeError::Signal(_) => "runtime_signal",
        }
    }
}

/// # Errors produced while launching one side of the pipeline.
///
/// Descriptor errors happen in the supervising process and are fatal.
/// Spawn errors (including a failed `exec`) only affect the child role; the
/// supervisor handles them like an early exit of that child.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum LaunchError {
    /// A descriptor operation on the bound pipe end failed.
    #[error("descriptor operation `{op}` failed: {source}")]
    Descriptor {
        /// Name of the failing operation.
        op: &'static str,
        /// Underlying OS error.
        #[source]
        source: nix::Error,
    },

    /// Spawning or exec'ing the program failed.
    #[error("failed to spawn {}: {source}", path.display())]
    Spawn {
        /// Program that could not be started.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: io::Error,
    },
}

impl LaunchError {
    /// Returns a short stable label (snake_case) for use in logs.
    pub fn as_label(&self) -> &'static str {
        match self {
            LaunchError::Descriptor { .. } => "launch_descriptor",
            LaunchError::Spawn { .. } => "launch_spawn",
        }
    }

    /// Indicates whether the failure must stop the whole program.
    ///
    /// # Example
    /// ```
    /// use pipevisor::LaunchError;
    ///
    /// let spawn = LaunchError::Spawn {
    ///     path: "/nonexistent".into(),
    ///     source: std::io::Error::from(std::io::ErrorKind::NotFound),
    /// };
    /// assert!(!spawn.is_fatal());
    ///
    /// let fd = LaunchError::Descriptor { op: "fcntl", source: nix::Error::EBADF };
    /// assert!(fd.is_fatal());
    /// ```
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::Descriptor { .. })
    }
}
