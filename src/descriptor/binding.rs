//! Concrete resources bound to the slots of a layout for a single draw or dispatch.
//!
//! Every binding carries a pair of content identifiers derived from the resources it references. The
//! identifiers of all active slots, in ascending slot order, hash into the key the set cache is
//! indexed by.

use anyhow::Result;
use smallvec::SmallVec;

use crate::descriptor::layout::{DescriptorKind, Layout, MAX_BINDING_SLOTS};
use crate::device::{ContentId, DescriptorDevice, SlotWrite, TextureResource, WriteSource};
use crate::util::hash::{combine, hash_ids};
use crate::Error;

/// Image layout a sampled texture is in while the set is in use.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TextureLayout {
    /// Regular read-only sampling.
    ShaderReadOnly,
    /// Sampling a depth/stencil attachment that stays bound read-only.
    DepthStencilReadOnly,
    /// General layout. Storage images are always in this layout.
    General,
}

/// A resource bound to a single slot.
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Copy(bound = ""))]
pub struct ResourceBinding<'a, D: DescriptorDevice> {
    kind: DescriptorKind,
    source: WriteSource<'a, D>,
    uuids: [u64; 2],
}

impl<'a, D: DescriptorDevice> ResourceBinding<'a, D> {
    /// Bind a texture to be sampled with `sampler`.
    pub fn texture(texture: &'a D::Texture, sampler: &'a D::Sampler, layout: TextureLayout) -> Self {
        Self {
            kind: DescriptorKind::Texture,
            source: WriteSource::Texture {
                texture,
                sampler,
                layout,
            },
            uuids: [texture.content_id(), combine(sampler.content_id(), layout as u64)],
        }
    }

    /// Bind a range of a buffer as uniform buffer.
    pub fn uniform_buffer(buffer: &'a D::Buffer, offset: u64, range: u64) -> Self {
        Self::buffer(DescriptorKind::UniformBuffer, buffer, offset, range)
    }

    /// Bind a range of a buffer as storage buffer.
    pub fn storage_buffer(buffer: &'a D::Buffer, offset: u64, range: u64) -> Self {
        Self::buffer(DescriptorKind::StorageBuffer, buffer, offset, range)
    }

    fn buffer(kind: DescriptorKind, buffer: &'a D::Buffer, offset: u64, range: u64) -> Self {
        Self {
            kind,
            source: WriteSource::Buffer {
                buffer,
                offset,
                range,
            },
            uuids: [buffer.content_id(), combine(offset, range)],
        }
    }

    /// Bind a single mip level of a texture as read/write storage image.
    pub fn image(texture: &'a D::Texture, mip_level: u32) -> Self {
        Self {
            kind: DescriptorKind::Image,
            source: WriteSource::Image {
                texture,
                mip_level,
            },
            uuids: [texture.content_id(), mip_level as u64],
        }
    }

    /// Descriptor kind of this binding.
    pub fn kind(&self) -> DescriptorKind {
        self.kind
    }

    /// Content identifiers of the bound resources.
    pub fn uuids(&self) -> [u64; 2] {
        self.uuids
    }

    /// Resources to write into the set.
    pub fn source(&self) -> WriteSource<'a, D> {
        self.source
    }
}

/// Resources bound to each slot of a set. Slots are addressed by binding index, binding the same slot twice
/// replaces the earlier binding. Slots that the layout does not declare are ignored.
/// # Example
/// ```ignore
/// let bindings = SetBindings::new()
///     .bind_uniform_buffer(0, &camera_buffer, 0, 256)?
///     .bind_texture(1, &albedo, &linear_sampler, TextureLayout::ShaderReadOnly)?;
/// let set = factory.create_set(WorkerId::current(), &layout, &bindings)?;
/// ```
#[derive(Derivative)]
#[derivative(Debug(bound = ""), Clone(bound = ""), Default(bound = ""))]
pub struct SetBindings<'a, D: DescriptorDevice> {
    /// Sorted by slot index
    slots: SmallVec<[(u32, ResourceBinding<'a, D>); 8]>,
}

impl<'a, D: DescriptorDevice> SetBindings<'a, D> {
    /// Create a new empty set of bindings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind any resource to a slot.
    /// # Errors
    /// - Fails with [`Error::SlotOutOfRange`] if `slot` is not a valid binding index.
    pub fn bind(mut self, slot: u32, binding: ResourceBinding<'a, D>) -> Result<Self> {
        if slot >= MAX_BINDING_SLOTS {
            return Err(Error::SlotOutOfRange(slot).into());
        }
        match self.slots.binary_search_by_key(&slot, |(index, _)| *index) {
            Ok(position) => self.slots[position].1 = binding,
            Err(position) => self.slots.insert(position, (slot, binding)),
        }
        Ok(self)
    }

    /// Bind a texture and sampler to a slot of kind [`DescriptorKind::Texture`].
    pub fn bind_texture(self, slot: u32, texture: &'a D::Texture, sampler: &'a D::Sampler, layout: TextureLayout) -> Result<Self> {
        self.bind(slot, ResourceBinding::texture(texture, sampler, layout))
    }

    /// Bind a buffer range to a slot of kind [`DescriptorKind::UniformBuffer`].
    pub fn bind_uniform_buffer(self, slot: u32, buffer: &'a D::Buffer, offset: u64, range: u64) -> Result<Self> {
        self.bind(slot, ResourceBinding::uniform_buffer(buffer, offset, range))
    }

    /// Bind a buffer range to a slot of kind [`DescriptorKind::StorageBuffer`].
    pub fn bind_storage_buffer(self, slot: u32, buffer: &'a D::Buffer, offset: u64, range: u64) -> Result<Self> {
        self.bind(slot, ResourceBinding::storage_buffer(buffer, offset, range))
    }

    /// Bind one mip level of a texture to a slot of kind [`DescriptorKind::Image`].
    pub fn bind_image(self, slot: u32, texture: &'a D::Texture, mip_level: u32) -> Result<Self> {
        self.bind(slot, ResourceBinding::image(texture, mip_level))
    }

    /// Get the binding in a slot, if any.
    pub fn get(&self, slot: u32) -> Option<&ResourceBinding<'a, D>> {
        self.slots
            .binary_search_by_key(&slot, |(index, _)| *index)
            .ok()
            .map(|position| &self.slots[position].1)
    }

    /// Amount of bound slots, including slots a layout may not declare.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether no slot is bound.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Check the bindings against a layout and compute the content hash used as cache key.
    /// # Errors
    /// - Fails with [`Error::MissingBinding`] if an active slot has no resource.
    /// - Fails with [`Error::BindingKindMismatch`] if a resource does not match the kind of its slot.
    /// - Fails with [`Error::MipLevelOutOfRange`] if an image binding names a missing mip level.
    pub fn content_hash(&self, layout: &Layout<D>) -> Result<u64> {
        let mut uuids = SmallVec::<[u64; 16]>::new();
        for slot in layout.slots() {
            let binding = self.get(slot.binding).ok_or(Error::MissingBinding(slot.binding))?;
            if binding.kind != slot.kind {
                return Err(Error::BindingKindMismatch {
                    slot: slot.binding,
                    expected: slot.kind,
                    found: binding.kind,
                }
                .into());
            }
            if let WriteSource::Image {
                texture,
                mip_level,
            } = binding.source
            {
                let count = texture.mip_levels();
                if mip_level >= count {
                    return Err(Error::MipLevelOutOfRange {
                        slot: slot.binding,
                        level: mip_level,
                        count,
                    }
                    .into());
                }
            }
            uuids.extend_from_slice(&binding.uuids);
        }
        Ok(hash_ids(&uuids))
    }

    /// Collect the writes for every active slot of the layout. Only valid after [`SetBindings::content_hash`]
    /// accepted these bindings.
    pub(crate) fn writes(&self, layout: &Layout<D>) -> SmallVec<[SlotWrite<'a, D>; 8]> {
        layout
            .active_slots()
            .filter_map(|slot| {
                let binding = self.get(slot);
                debug_assert!(binding.is_some(), "active slot {slot} has no binding, bindings were not validated");
                binding.map(|binding| SlotWrite {
                    slot,
                    kind: binding.kind,
                    source: binding.source,
                })
            })
            .collect()
    }
}
