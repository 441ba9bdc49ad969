//! The device module defines the interface between deimos and the graphics device.
//!
//! Deimos never creates or destroys native objects itself. Everything goes through an implementation of
//! [`DescriptorDevice`], which owns the native pool, layout and set objects. An implementation on top of
//! [`ash`] is available as [`VulkanDevice`](vulkan::VulkanDevice).

use std::fmt::Debug;
use std::hash::Hash;

use anyhow::Result;

use crate::descriptor::binding::TextureLayout;
use crate::descriptor::layout::{BindingSlot, DescriptorKind, PoolSize};

pub mod vulkan;

/// A resource with a content identifier. Two resources with the same identifier must have the same
/// contents, so that descriptor sets referencing them can be shared. A resource that is recreated or
/// reallocated must get a new identifier.
pub trait ContentId {
    /// Opaque identifier of the current version of this resource.
    fn content_id(&self) -> u64;
}

/// A texture that can be bound as a sampled texture, or one mip level at a time as a storage image.
pub trait TextureResource: ContentId {
    /// Amount of mip levels the texture has.
    fn mip_levels(&self) -> u32;
}

/// Resources written into a single slot.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub enum WriteSource<'a, D: DescriptorDevice + ?Sized> {
    /// Sampled texture with the sampler to read it with.
    Texture {
        /// Texture to sample
        texture: &'a D::Texture,
        /// Sampler to sample with
        sampler: &'a D::Sampler,
        /// Layout the texture is in while the set is used
        layout: TextureLayout,
    },
    /// Range of a uniform or storage buffer.
    Buffer {
        /// Bound buffer
        buffer: &'a D::Buffer,
        /// Offset of the range in bytes
        offset: u64,
        /// Size of the range in bytes
        range: u64,
    },
    /// One mip level of a texture, always accessed read/write in [`TextureLayout::General`].
    Image {
        /// Texture holding the mip level
        texture: &'a D::Texture,
        /// Mip level to bind
        mip_level: u32,
    },
}

/// A single slot update inside a batched [`DescriptorDevice::write_set`] call.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub struct SlotWrite<'a, D: DescriptorDevice + ?Sized> {
    /// Binding index of the slot
    pub slot: u32,
    /// Descriptor kind of the slot
    pub kind: DescriptorKind,
    /// Resources to write
    pub source: WriteSource<'a, D>,
}

/// Capabilities deimos needs from the graphics device. Implementations must be safe to call from multiple
/// threads at once, except that a single native pool is only ever used by one thread at a time.
pub trait DescriptorDevice: Send + Sync + 'static {
    /// Native descriptor set layout handle.
    type SetLayout: Copy + Eq + Hash + Debug + Send + Sync;
    /// Native descriptor pool handle.
    type Pool: Copy + Eq + Hash + Debug + Send + Sync;
    /// Native descriptor set handle.
    type Set: Copy + Eq + Hash + Debug + Send + Sync;
    /// Buffer resource that can be bound to uniform and storage buffer slots.
    type Buffer: ContentId + Debug;
    /// Texture resource that can be bound to texture and image slots.
    type Texture: TextureResource + Debug;
    /// Sampler that is combined with textures.
    type Sampler: ContentId + Debug;

    /// Create a native layout for slots that are already sorted by binding index.
    fn create_set_layout(&self, slots: &[BindingSlot]) -> Result<Self::SetLayout>;

    /// Destroy a native layout. All sets allocated with it have already been released.
    fn destroy_set_layout(&self, layout: Self::SetLayout);

    /// Create a pool able to hold `max_sets` sets, with room for the given amount of descriptors of each kind.
    fn create_pool(&self, sizes: &[PoolSize], max_sets: u32) -> Result<Self::Pool>;

    /// Destroy a pool, releasing every set allocated from it.
    fn destroy_pool(&self, pool: Self::Pool);

    /// Allocate one set from a pool. Deimos only calls this when the pool is known to have room left.
    fn allocate_set(&self, pool: Self::Pool, layout: Self::SetLayout) -> Result<Self::Set>;

    /// Write resources into the slots of a set. All writes for one set arrive in a single call.
    fn write_set(&self, set: Self::Set, writes: &[SlotWrite<'_, Self>]);
}
