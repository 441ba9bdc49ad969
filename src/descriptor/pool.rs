//! Pool blocks descriptor sets are carved out of. A [`SetPool`] grows automatically: whenever the newest
//! block is full, a new one is created that holds `growth_factor` times as many sets.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use anyhow::{Context, Result};
use smallvec::SmallVec;

use crate::descriptor::layout::{DescriptorKind, Layout, PoolSize};
use crate::device::DescriptorDevice;
use crate::{DeviceObject, Error, FactorySettings};

/// A single native pool with room for a fixed amount of sets of one layout.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct PoolBlock<D: DescriptorDevice> {
    handle: D::Pool,
    capacity: u32,
    free: u32,
}

impl<D: DescriptorDevice> PoolBlock<D> {
    /// Amount of sets this block was created for.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Amount of sets that can still be allocated.
    pub fn free(&self) -> u32 {
        self.free
    }
}

/// Growing list of pool blocks for one layout, owned by a single thread allocator.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct SetPool<D: DescriptorDevice> {
    #[derivative(Debug = "ignore")]
    device: Arc<D>,
    blocks: Vec<PoolBlock<D>>,
    initial_capacity: u32,
    growth_factor: u32,
}

/// Descriptor budget of a pool block holding `capacity` sets.
fn block_budget(pool_sizes: &[PoolSize], capacity: u32) -> SmallVec<[PoolSize; DescriptorKind::COUNT]> {
    pool_sizes
        .iter()
        .map(|size| PoolSize {
            kind: size.kind,
            count: size.count.saturating_mul(capacity),
        })
        .collect()
}

impl<D: DescriptorDevice> SetPool<D> {
    /// Create an empty pool. No native objects are created until the first set is allocated.
    pub fn new(device: Arc<D>, settings: &FactorySettings) -> Self {
        Self {
            device,
            blocks: Vec::new(),
            initial_capacity: settings.initial_pool_capacity,
            growth_factor: settings.pool_growth_factor,
        }
    }

    /// Capacity the next block will be created with.
    fn next_capacity(&self) -> u32 {
        match self.blocks.last() {
            None => self.initial_capacity,
            Some(block) => block.capacity.saturating_mul(self.growth_factor),
        }
    }

    /// Make sure the newest block has room for at least one more set, creating a new block if needed.
    /// Returns the index of the block to allocate from.
    /// # Errors
    /// - Fails with [`Error::DeviceAllocation`] if the device could not create a new block.
    pub fn ensure_capacity(&mut self, layout: &Layout<D>) -> Result<usize> {
        if let Some(block) = self.blocks.last() {
            if block.free > 0 {
                return Ok(self.blocks.len() - 1);
            }
        }

        let capacity = self.next_capacity();
        let budget = block_budget(layout.pool_sizes(), capacity);
        let handle = self
            .device
            .create_pool(&budget, capacity)
            .with_context(|| Error::DeviceAllocation(DeviceObject::Pool))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new descriptor pool {handle:?} with room for {capacity} sets");
        debug!(
            "Descriptor pool for layout #{} grew to {} blocks, newest block holds {capacity} sets",
            layout.index(),
            self.blocks.len() + 1
        );

        self.blocks.push(PoolBlock {
            handle,
            capacity,
            free: capacity,
        });
        Ok(self.blocks.len() - 1)
    }

    /// Allocate a new set, growing the pool first if the newest block is full.
    /// # Errors
    /// - Fails with [`Error::DeviceAllocation`] if a new block was needed and could not be created.
    pub fn allocate(&mut self, layout: &Layout<D>) -> Result<D::Set> {
        let index = self.ensure_capacity(layout)?;
        let block = &mut self.blocks[index];
        debug_assert!(block.free > 0, "allocating from a full pool block");
        let set = self.device.allocate_set(block.handle, layout.native()).map_err(|err| {
            debug_assert!(false, "allocating a set from a pool block with free capacity failed: {err:#}");
            err.context(Error::DeviceAllocation(DeviceObject::Set))
        })?;
        block.free -= 1;
        Ok(set)
    }

    /// All blocks, oldest first.
    pub fn blocks(&self) -> &[PoolBlock<D>] {
        &self.blocks
    }
}

impl<D: DescriptorDevice> Drop for SetPool<D> {
    fn drop(&mut self) {
        for block in self.blocks.drain(..) {
            #[cfg(feature = "log-objects")]
            trace!("Destroying descriptor pool {:?}", block.handle);
            self.device.destroy_pool(block.handle);
        }
    }
}

impl Display for PoolSize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?} => {}", self.kind, self.count)
    }
}
