//! # Restart policy for pipeline generations.
//!
//! [`RestartPolicy`] decides what the supervisor does once a generation has
//! ended (one side exited, the other was torn down and both were reaped).
//!
//! - [`RestartPolicy::Restart`] start a fresh generation with a fresh pipe (default).
//! - [`RestartPolicy::NoRestart`] stop after the first generation.
//!
//! ```text
//! generation ends
//!   ├─► NoRestart                    → stop
//!   ├─► Restart + shutdown requested → stop
//!   └─► Restart                      → next generation
//! ```
//!
//! The policy is fixed when the supervisor is built and applies to every
//! generation regardless of which side exited first or with what status.

/// Policy controlling whether a new generation starts after the current one ends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum RestartPolicy {
    /// Restart the whole pipeline after every generation (default).
    #[default]
    Restart,
    /// Run a single generation, then stop.
    NoRestart,
}

impl RestartPolicy {
    /// Maps the command-line `--norestart` switch onto a policy.
    #[inline]
    pub fn from_norestart(norestart: bool) -> Self {
        if norestart {
            RestartPolicy::NoRestart
        } else {
            RestartPolicy::Restart
        }
    }

    /// Returns `true` if another generation may start.
    #[inline]
    pub fn allows_restart(self) -> bool {
        matches!(self, RestartPolicy::Restart)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_restarts() {
        assert_eq!(RestartPolicy::default(), RestartPolicy::Restart);
        assert!(RestartPolicy::default().allows_restart());
    }

    #[test]
    fn test_norestart_switch() {
        assert_eq!(RestartPolicy::from_norestart(true), RestartPolicy::NoRestart);
        assert_eq!(RestartPolicy::from_norestart(false), RestartPolicy::Restart);
        assert!(!RestartPolicy::NoRestart.allows_restart());
    }
}
