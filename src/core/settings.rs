//! Exposes all structs needed to store factory configuration.

use anyhow::Result;

use crate::Error;

/// Amount of descriptor sets the first pool block of every thread allocator can hold.
pub const DESCRIPTOR_POOL_INITIAL_SIZE: u32 = 64;
/// Every new pool block holds this many times the sets of the block before it.
pub const DESCRIPTOR_POOL_SIZE_SCALE: u32 = 2;
/// Amount of frames the device may still read a descriptor set after it was last handed out.
/// Five seconds of frames at 60 Hz.
pub const DESCRIPTOR_FRAME_BUFFERING: u64 = 60 * 5;

/// Settings used to initialize a [`DescriptorSetFactory`](crate::DescriptorSetFactory).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FactorySettings {
    /// Set capacity of the first pool block created by each thread allocator.
    pub initial_pool_capacity: u32,
    /// Factor the set capacity is multiplied by every time a new pool block is needed.
    pub pool_growth_factor: u32,
    /// Amount of frames a set must go unused before it may be rewritten with new contents.
    /// This must be at least the amount of frames the device can have in flight, a smaller
    /// value lets sets be overwritten while the device is still reading them.
    pub frame_buffering: u64,
}

impl Default for FactorySettings {
    fn default() -> Self {
        Self {
            initial_pool_capacity: DESCRIPTOR_POOL_INITIAL_SIZE,
            pool_growth_factor: DESCRIPTOR_POOL_SIZE_SCALE,
            frame_buffering: DESCRIPTOR_FRAME_BUFFERING,
        }
    }
}

impl FactorySettings {
    /// Check that all settings are in range.
    /// # Errors
    /// - Fails with [`Error::InvalidSettings`] if the initial capacity or the frame window is zero,
    ///   or if the growth factor would not grow the pool.
    pub fn validate(&self) -> Result<()> {
        if self.initial_pool_capacity == 0 {
            return Err(Error::InvalidSettings("initial pool capacity must be at least one set").into());
        }
        if self.pool_growth_factor < 2 {
            return Err(Error::InvalidSettings("pool growth factor must be at least two").into());
        }
        if self.frame_buffering == 0 {
            return Err(Error::InvalidSettings("frame buffering window must be at least one frame").into());
        }
        Ok(())
    }
}

/// The settings builder is a convenience struct to easily create [`FactorySettings`].
///
/// For information about each of the fields, see [`FactorySettings`]
/// # Example
/// ```
/// # use deimos::*;
/// let settings = SettingsBuilder::new()
///     .initial_pool_capacity(16u32)
///     .frame_buffering(3u64)
///     .build();
/// ```
#[derive(Debug, Default)]
pub struct SettingsBuilder {
    inner: FactorySettings,
}

impl SettingsBuilder {
    /// Create a new settings builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the capacity of the first pool block.
    pub fn initial_pool_capacity(mut self, capacity: impl Into<u32>) -> Self {
        self.inner.initial_pool_capacity = capacity.into();
        self
    }

    /// Sets the factor each following pool block grows by.
    pub fn pool_growth_factor(mut self, factor: impl Into<u32>) -> Self {
        self.inner.pool_growth_factor = factor.into();
        self
    }

    /// Sets the amount of frames a set stays untouched before it can be recycled.
    pub fn frame_buffering(mut self, frames: impl Into<u64>) -> Self {
        self.inner.frame_buffering = frames.into();
        self
    }

    /// Build the resulting factory settings.
    pub fn build(self) -> FactorySettings {
        self.inner
    }
}
