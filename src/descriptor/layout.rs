//! Canonical descriptor set layouts and the registry that interns them.
//!
//! Two layouts declaring the same slots collapse into the same [`Layout`], no matter in which order the
//! slots were declared. Layouts are never removed while the owning factory is alive, so their index in
//! the registry is a stable identifier.

use std::ops::BitOr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result};
use smallvec::SmallVec;
use static_assertions::const_assert;

use crate::descriptor::cache::ThreadAllocators;
use crate::device::DescriptorDevice;
use crate::util::hash::hash_of;
use crate::{DeviceObject, Error};

/// Maximum amount of binding slots in a single descriptor set. Slot indices range from `0` to
/// `MAX_BINDING_SLOTS - 1`.
pub const MAX_BINDING_SLOTS: u32 = 32;

// Active slots are tracked in a single u32.
const_assert!(MAX_BINDING_SLOTS <= u32::BITS);

/// Reserved layout hash for a layout without any bindings.
pub const EMPTY_LAYOUT_HASH: u64 = 1;

/// The kinds of descriptors a binding slot can hold.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum DescriptorKind {
    /// Sampled texture, combined with a sampler.
    Texture,
    /// Read-only uniform buffer range.
    UniformBuffer,
    /// Read/write storage buffer range.
    StorageBuffer,
    /// Single mip level of a texture, bound as read/write storage image.
    Image,
}

impl DescriptorKind {
    /// Amount of descriptor kinds.
    pub const COUNT: usize = 4;
}

/// Bitmask of shader stages that access a binding slot.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub struct ShaderStages(u32);

impl ShaderStages {
    /// Vertex shader stage
    pub const VERTEX: Self = Self(1 << 0);
    /// Tessellation control shader stage
    pub const TESSELLATION_CONTROL: Self = Self(1 << 1);
    /// Tessellation evaluation shader stage
    pub const TESSELLATION_EVALUATION: Self = Self(1 << 2);
    /// Geometry shader stage
    pub const GEOMETRY: Self = Self(1 << 3);
    /// Fragment shader stage
    pub const FRAGMENT: Self = Self(1 << 4);
    /// Compute shader stage
    pub const COMPUTE: Self = Self(1 << 5);
    /// Every stage of the graphics pipeline
    pub const ALL_GRAPHICS: Self = Self(0b1_1111);
    /// Every stage
    pub const ALL: Self = Self(0b11_1111);

    /// Empty stage mask.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Whether all stages in `other` are also in `self`.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Raw bitmask.
    pub const fn bits(self) -> u32 {
        self.0
    }
}

impl BitOr for ShaderStages {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

/// Describes a single binding slot in a descriptor set layout.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BindingSlot {
    /// Binding index of this slot.
    pub binding: u32,
    /// Kind of descriptor in this slot.
    pub kind: DescriptorKind,
    /// Shader stages that use this slot.
    pub stages: ShaderStages,
}

impl BindingSlot {
    /// Describe a new binding slot.
    pub fn new(binding: u32, kind: DescriptorKind, stages: ShaderStages) -> Self {
        Self {
            binding,
            kind,
            stages,
        }
    }
}

/// Amount of descriptors of one kind reserved for a single set in a pool block.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct PoolSize {
    /// Kind of descriptor
    pub kind: DescriptorKind,
    /// Amount of descriptors
    pub count: u32,
}

/// Handle to an interned layout. This is cheap to copy, and two handles compare equal exactly when
/// they refer to the same canonical layout.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""), PartialEq(bound = ""), Eq(bound = ""), Hash(bound = ""))]
pub struct LayoutHandle<D: DescriptorDevice> {
    pub(crate) index: u32,
    pub(crate) hash: u64,
    pub(crate) native: D::SetLayout,
}

impl<D: DescriptorDevice> LayoutHandle<D> {
    /// Stable index of the layout inside its factory.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Structural hash of the layout.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Native layout handle, used to build pipeline layouts.
    pub fn native(&self) -> D::SetLayout {
        self.native
    }
}

/// A canonical descriptor set layout. Shared by every set allocated from it and by the thread allocators
/// that own those sets.
///
/// Native objects belong to the factory, not to this value. Once the factory is destroyed, a `Layout`
/// still held by the caller only describes the shape, its native handle is no longer valid.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub struct Layout<D: DescriptorDevice> {
    #[derivative(Debug = "ignore")]
    device: Arc<D>,
    hash: u64,
    index: u32,
    native: D::SetLayout,
    slots: SmallVec<[BindingSlot; 8]>,
    active: u32,
    min_slot: u32,
    max_slot: u32,
    pool_sizes: SmallVec<[PoolSize; DescriptorKind::COUNT]>,
    #[derivative(Debug = "ignore")]
    pub(crate) allocators: ThreadAllocators<D>,
    released: AtomicBool,
}

/// Sort slots by binding index and compute the structural hash of the result.
/// # Errors
/// - Fails if a slot index is out of range.
/// - Fails if two slots share a binding index.
fn canonicalize(slots: &[BindingSlot]) -> Result<(SmallVec<[BindingSlot; 8]>, u64)> {
    let mut sorted = slots.iter().copied().collect::<SmallVec<[BindingSlot; 8]>>();
    sorted.sort_by_key(|slot| slot.binding);

    if let Some(slot) = sorted.iter().find(|slot| slot.binding >= MAX_BINDING_SLOTS) {
        return Err(Error::SlotOutOfRange(slot.binding).into());
    }
    if let Some(pair) = sorted.windows(2).find(|pair| pair[0].binding == pair[1].binding) {
        return Err(Error::DuplicateBinding(pair[0].binding).into());
    }

    if sorted.is_empty() {
        return Ok((sorted, EMPTY_LAYOUT_HASH));
    }

    let hash = match hash_of(sorted.as_slice()) {
        EMPTY_LAYOUT_HASH => !EMPTY_LAYOUT_HASH,
        hash => hash,
    };
    Ok((sorted, hash))
}

impl<D: DescriptorDevice> Layout<D> {
    fn new(device: Arc<D>, slots: SmallVec<[BindingSlot; 8]>, hash: u64, index: u32) -> Result<Self> {
        let mut active = 0u32;
        let mut min_slot = u32::MAX;
        let mut max_slot = 0;
        let mut pool_sizes = SmallVec::<[PoolSize; DescriptorKind::COUNT]>::new();
        for slot in &slots {
            debug_assert!(active & (1 << slot.binding) == 0, "duplicate slots must be rejected before building a layout");
            active |= 1 << slot.binding;
            min_slot = min_slot.min(slot.binding);
            max_slot = max_slot.max(slot.binding);
            match pool_sizes.iter_mut().find(|size| size.kind == slot.kind) {
                Some(size) => size.count += 1,
                None => pool_sizes.push(PoolSize {
                    kind: slot.kind,
                    count: 1,
                }),
            }
        }

        let native = device
            .create_set_layout(&slots)
            .with_context(|| Error::DeviceAllocation(DeviceObject::SetLayout))?;
        #[cfg(feature = "log-objects")]
        trace!("Created new descriptor set layout {native:?}");

        Ok(Self {
            device,
            hash,
            index,
            native,
            slots,
            active,
            min_slot,
            max_slot,
            pool_sizes,
            allocators: ThreadAllocators::new(),
            released: AtomicBool::new(false),
        })
    }

    /// Get a copyable handle to this layout.
    pub fn handle(&self) -> LayoutHandle<D> {
        LayoutHandle {
            index: self.index,
            hash: self.hash,
            native: self.native,
        }
    }

    /// Structural hash of the sorted slot descriptions.
    pub fn hash(&self) -> u64 {
        self.hash
    }

    /// Stable index of this layout in its factory.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Native layout handle.
    pub fn native(&self) -> D::SetLayout {
        self.native
    }

    /// Slot descriptions, sorted by binding index.
    pub fn slots(&self) -> &[BindingSlot] {
        &self.slots
    }

    /// Find the description of a slot.
    pub fn slot(&self, binding: u32) -> Option<&BindingSlot> {
        if !self.is_active(binding) {
            return None;
        }
        self.slots.iter().find(|slot| slot.binding == binding)
    }

    /// Bitmask of active slot indices.
    pub fn active_mask(&self) -> u32 {
        self.active
    }

    /// Whether the given slot is part of this layout.
    pub fn is_active(&self, binding: u32) -> bool {
        binding < MAX_BINDING_SLOTS && self.active & (1 << binding) != 0
    }

    /// Whether this is the reserved layout without bindings.
    pub fn is_empty(&self) -> bool {
        self.active == 0
    }

    /// Lowest active slot index, `None` for the empty layout.
    pub fn min_slot(&self) -> Option<u32> {
        (!self.is_empty()).then_some(self.min_slot)
    }

    /// Highest active slot index, `None` for the empty layout.
    pub fn max_slot(&self) -> Option<u32> {
        (!self.is_empty()).then_some(self.max_slot)
    }

    /// Iterate over all active slot indices in ascending order.
    pub fn active_slots(&self) -> impl Iterator<Item = u32> + '_ {
        let range = if self.is_empty() { 1..=0 } else { self.min_slot..=self.max_slot };
        range.filter(move |binding| self.active & (1 << binding) != 0)
    }

    /// How many descriptors of each kind one set of this layout needs.
    pub fn pool_sizes(&self) -> &[PoolSize] {
        &self.pool_sizes
    }
}

impl<D: DescriptorDevice> Layout<D> {
    /// Destroy every thread allocator and then the native layout. Runs at most once, later calls do nothing.
    pub(crate) fn release(&self) {
        if self.released.swap(true, Ordering::AcqRel) {
            return;
        }
        // Sets and pool blocks must go before the layout they were allocated with.
        self.allocators.clear();
        #[cfg(feature = "log-objects")]
        trace!("Destroying descriptor set layout {:?}", self.native);
        self.device.destroy_set_layout(self.native);
    }

    /// Whether the native objects of this layout were destroyed together with its factory.
    pub fn is_released(&self) -> bool {
        self.released.load(Ordering::Acquire)
    }
}

impl<D: DescriptorDevice> Drop for Layout<D> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Append-only table of canonical layouts.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct LayoutRegistry<D: DescriptorDevice> {
    #[derivative(Debug = "ignore")]
    device: Arc<D>,
    layouts: RwLock<Vec<Arc<Layout<D>>>>,
}

fn find_layout<D: DescriptorDevice>(layouts: &[Arc<Layout<D>>], hash: u64, slots: &[BindingSlot]) -> Option<Arc<Layout<D>>> {
    layouts
        .iter()
        .find(|layout| layout.hash == hash && layout.slots.as_slice() == slots)
        .cloned()
}

impl<D: DescriptorDevice> LayoutRegistry<D> {
    pub fn new(device: Arc<D>) -> Self {
        Self {
            device,
            layouts: RwLock::new(Vec::new()),
        }
    }

    /// Find the canonical layout for these slots, creating it if this is the first time the shape is seen.
    /// # Errors
    /// - Fails with [`Error::DuplicateBinding`] or [`Error::SlotOutOfRange`] on invalid slots.
    /// - Fails with [`Error::DeviceAllocation`] if the native layout could not be created.
    pub fn intern(&self, slots: &[BindingSlot]) -> Result<Arc<Layout<D>>> {
        let (sorted, hash) = canonicalize(slots)?;

        {
            let layouts = self.layouts.read().map_err(Error::from)?;
            if let Some(layout) = find_layout(&layouts, hash, &sorted) {
                return Ok(layout);
            }
        }

        let mut layouts = self.layouts.write().map_err(Error::from)?;
        // Another thread may have interned the same shape between the two locks.
        if let Some(layout) = find_layout(&layouts, hash, &sorted) {
            return Ok(layout);
        }

        let index = layouts.len() as u32;
        let layout = Arc::new(Layout::new(self.device.clone(), sorted, hash, index)?);
        info!(
            "Interned descriptor set layout #{index} with {} slots (hash {hash:#018x})",
            layout.slots.len()
        );
        layouts.push(layout.clone());
        Ok(layout)
    }

    /// Look up a layout by handle.
    /// # Errors
    /// - Fails with [`Error::InvalidLayoutHandle`] if this registry did not create the handle.
    pub fn get(&self, handle: &LayoutHandle<D>) -> Result<Arc<Layout<D>>> {
        let layouts = self.layouts.read().map_err(Error::from)?;
        layouts
            .get(handle.index as usize)
            .filter(|layout| layout.hash == handle.hash && layout.native == handle.native)
            .cloned()
            .ok_or_else(|| Error::InvalidLayoutHandle(handle.index).into())
    }

    /// Amount of interned layouts.
    pub fn len(&self) -> usize {
        match self.layouts.read() {
            Ok(layouts) => layouts.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    /// Destroy the native objects of every layout, newest first, and empty the table. Layouts the caller
    /// still holds are released as well.
    pub fn clear(&self) {
        let mut layouts = match self.layouts.write() {
            Ok(layouts) => layouts,
            Err(poisoned) => poisoned.into_inner(),
        };
        while let Some(layout) = layouts.pop() {
            layout.release();
        }
    }
}
