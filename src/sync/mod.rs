//! The sync module provides the small pieces of shared state that coordinate the descriptor factory
//! across frames and threads.
//!
//! - The [`frame_clock`] module holds the monotonic frame counter used to decide when a descriptor set
//! is no longer read by the device.
//! - The [`worker`] module assigns a totally ordered identity to every thread that requests sets.

pub mod frame_clock;
pub mod worker;
