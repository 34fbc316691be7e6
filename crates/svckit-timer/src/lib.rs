//! Cooperative millisecond timer scheduler
//!
//! Timers are kept in a flat list scanned by one background task on a
//! configurable tick. Cancellation is lazy: [`TimerHandle::cancel`] only
//! marks the entry, and the next scan drops it without running the
//! callback.
//!
//! The scheduler never runs callbacks itself. Expired timers are forwarded
//! to the framework event queue as [`TimerFired`] values and the host's
//! dispatch loop calls [`TimerFired::run`], so timer callbacks are
//! serialized with every other event the host processes. The cancellation
//! flag is checked again at that point, covering timers cancelled between
//! expiry and dispatch.

pub mod scheduler;

pub use scheduler::{TimerFired, TimerHandle, TimerScheduler};
