//! The descriptor set factory ties the layout registry, the per-thread set caches and the frame clock together.

use std::sync::Arc;

use anyhow::Result;

use crate::descriptor::binding::SetBindings;
use crate::descriptor::cache::{AllocatorStats, ThreadAllocator};
use crate::descriptor::layout::{BindingSlot, Layout, LayoutHandle, LayoutRegistry};
use crate::device::DescriptorDevice;
use crate::sync::frame_clock::FrameClock;
use crate::{Error, FactorySettings, WorkerId};

/// Usage counters of every thread allocator of one layout, sorted by worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutStats {
    /// Index of the layout
    pub layout: u32,
    /// One entry per worker that allocated sets with this layout
    pub allocators: Vec<AllocatorStats>,
}

impl LayoutStats {
    /// Total amount of native sets allocated with this layout.
    pub fn sets(&self) -> usize {
        self.allocators.iter().map(|allocator| allocator.sets).sum()
    }

    /// Total amount of pool blocks created for this layout.
    pub fn pool_blocks(&self) -> usize {
        self.allocators.iter().map(|allocator| allocator.pool_blocks).sum()
    }
}

/// Creates canonical layouts and hands out descriptor sets for them, reusing sets whenever the same resources
/// are bound again.
///
/// The factory is shared between all threads recording commands. Each thread passes its own [`WorkerId`] and
/// gets its own cache and pool blocks per layout, so threads only contend when they touch a layout for the
/// first time.
/// # Example
/// ```ignore
/// use deimos::*;
/// let factory = DescriptorSetFactory::new(device.clone(), FactorySettings::default())?;
/// let layout = factory.create_layout(&[
///     BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::VERTEX),
///     BindingSlot::new(1, DescriptorKind::Texture, ShaderStages::FRAGMENT),
/// ])?;
/// // Once per draw
/// let bindings = SetBindings::new()
///     .bind_uniform_buffer(0, &camera, 0, 256)?
///     .bind_texture(1, &albedo, &sampler, TextureLayout::ShaderReadOnly)?;
/// let set = factory.create_set(WorkerId::current(), &layout, &bindings)?;
/// // Once per frame
/// factory.next_frame();
/// ```
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct DescriptorSetFactory<D: DescriptorDevice> {
    #[derivative(Debug = "ignore")]
    device: Arc<D>,
    settings: FactorySettings,
    layouts: LayoutRegistry<D>,
    clock: FrameClock,
}

impl<D: DescriptorDevice> DescriptorSetFactory<D> {
    /// Create a new factory without any layouts.
    /// # Errors
    /// - Fails with [`Error::InvalidSettings`] if the settings are out of range.
    pub fn new(device: Arc<D>, settings: FactorySettings) -> Result<Self> {
        settings.validate()?;
        Ok(Self {
            layouts: LayoutRegistry::new(device.clone()),
            device,
            settings,
            clock: FrameClock::new(),
        })
    }

    /// Get the canonical layout for a set of slots. Declaration order does not matter, and calling this again with the
    /// same slots returns the same handle without creating anything.
    /// # Errors
    /// - Fails with [`Error::DuplicateBinding`] if two slots have the same binding index.
    /// - Fails with [`Error::SlotOutOfRange`] if a binding index is too large.
    /// - Fails with [`Error::DeviceAllocation`] if the native layout could not be created.
    pub fn create_layout(&self, slots: &[BindingSlot]) -> Result<LayoutHandle<D>> {
        Ok(self.layouts.intern(slots)?.handle())
    }

    /// Get full information about a layout.
    /// # Errors
    /// - Fails with [`Error::InvalidLayoutHandle`] if the handle was not created by this factory.
    pub fn layout(&self, handle: &LayoutHandle<D>) -> Result<Arc<Layout<D>>> {
        self.layouts.get(handle)
    }

    /// Amount of distinct layouts created so far.
    pub fn layout_count(&self) -> usize {
        self.layouts.len()
    }

    /// Get a descriptor set holding `bindings`. If this worker already has a set with exactly these resources, that
    /// set is returned without writing anything. Otherwise a set that has been unused for longer than the frame
    /// buffering window is rewritten, or a new set is allocated.
    ///
    /// Validation happens before any state changes, so a failed call leaves the cache untouched.
    /// # Errors
    /// - Fails with [`Error::InvalidLayoutHandle`] if the handle was not created by this factory.
    /// - Fails with [`Error::EmptyDescriptorBinding`] if the layout has no slots.
    /// - Fails with [`Error::MissingBinding`], [`Error::BindingKindMismatch`] or [`Error::MipLevelOutOfRange`]
    ///   if the bindings do not fit the layout.
    /// - Fails with [`Error::DeviceAllocation`] if the pool had to grow and the device refused.
    pub fn create_set(&self, worker: WorkerId, layout: &LayoutHandle<D>, bindings: &SetBindings<'_, D>) -> Result<D::Set> {
        let layout = self.layouts.get(layout)?;
        if layout.is_empty() {
            return Err(Error::EmptyDescriptorBinding.into());
        }
        let hash = bindings.content_hash(&layout)?;

        let allocator = layout
            .allocators
            .get_or_create(worker, || ThreadAllocator::new(worker, self.device.clone(), &self.settings))?;
        let mut allocator = allocator.lock().map_err(Error::from)?;
        // Read the frame while holding the allocator, so frames stamped on its sets never decrease.
        let frame = self.clock.current();
        allocator.get_or_create(&layout, &self.device, hash, bindings, frame)
    }

    /// Advance to the next frame and return its index.
    pub fn next_frame(&self) -> u64 {
        self.clock.advance()
    }

    /// Mirror an externally maintained frame counter. Lower values than the current frame are ignored.
    pub fn set_frame(&self, frame: u64) {
        self.clock.set(frame);
    }

    /// The current frame.
    pub fn current_frame(&self) -> u64 {
        self.clock.current()
    }

    /// Settings this factory was created with.
    pub fn settings(&self) -> &FactorySettings {
        &self.settings
    }

    /// Usage counters of every worker that allocated sets with a layout.
    /// # Errors
    /// - Fails with [`Error::InvalidLayoutHandle`] if the handle was not created by this factory.
    pub fn stats(&self, layout: &LayoutHandle<D>) -> Result<LayoutStats> {
        let layout = self.layouts.get(layout)?;
        Ok(LayoutStats {
            layout: layout.index(),
            allocators: layout.allocators.stats()?,
        })
    }

    /// Destroy the factory with all sets, pool blocks and layouts it created. The device must no longer be
    /// executing any work that uses these sets.
    pub fn destroy(self) {
        drop(self);
    }
}

impl<D: DescriptorDevice> Drop for DescriptorSetFactory<D> {
    fn drop(&mut self) {
        debug!("Destroying descriptor set factory with {} layouts", self.layouts.len());
        self.layouts.clear();
    }
}
