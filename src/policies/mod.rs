//! Restart policies.
//!
//! ## Contents
//! - [`RestartPolicy`] whether a new pipeline generation starts after one ends
//!
//! ## Quick wiring
//! ```text
//! SupervisorConfig { restart: RestartPolicy, .. }
//!      └─► core::supervisor::Supervisor consults it after every generation
//! ```
//!
//! Restarts are immediate; there is no backoff between generations.

mod restart;

pub use restart::RestartPolicy;
