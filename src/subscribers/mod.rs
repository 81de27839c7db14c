//! # Event subscribers for the pipevisor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`].
//!
//! ## Architecture
//! ```text
//! Supervisor / ChildWatcher ── publish(Event) ──► Bus ──► subscriber_listener
//!                                                              │
//!                                                       SubscriberSet::emit
//!                                                  ┌───────────┼───────────┐
//!                                                  ▼           ▼           ▼
//!                                              LogWriter    Metrics     Custom
//! ```

mod set;
mod subscribe;

#[cfg(feature = "logging")]
mod log;

pub use set::SubscriberSet;
pub use subscribe::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
