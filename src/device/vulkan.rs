//! Vulkan implementation of [`DescriptorDevice`] on top of [`ash`].

use anyhow::Result;
use ash::vk;
use smallvec::SmallVec;

use crate::descriptor::binding::TextureLayout;
use crate::descriptor::layout::{BindingSlot, PoolSize};
use crate::device::{ContentId, DescriptorDevice, SlotWrite, TextureResource, WriteSource};
use crate::util::to_vk::IntoVulkanType;
use crate::Error;

/// A buffer that can be bound to uniform and storage buffer slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VulkanBuffer {
    /// Raw buffer handle
    pub handle: vk::Buffer,
    /// Content identifier, must change whenever the buffer is recreated.
    pub id: u64,
}

/// A sampler that can be combined with textures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VulkanSampler {
    /// Raw sampler handle
    pub handle: vk::Sampler,
    /// Content identifier, must change whenever the sampler is recreated.
    pub id: u64,
}

/// Views of a texture. `view` covers the full resource and is used for sampling,
/// `mip_views` holds one single-level view per mip for storage image bindings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VulkanTexture {
    /// View over all mip levels
    pub view: vk::ImageView,
    /// One view per mip level
    pub mip_views: Vec<vk::ImageView>,
    /// Content identifier, must change whenever the texture is recreated.
    pub id: u64,
}

impl ContentId for VulkanBuffer {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl ContentId for VulkanSampler {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl ContentId for VulkanTexture {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl TextureResource for VulkanTexture {
    fn mip_levels(&self) -> u32 {
        self.mip_views.len() as u32
    }
}

/// Wrapper around an [`ash::Device`] that creates and writes descriptor objects.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct VulkanDevice {
    #[derivative(Debug = "ignore")]
    handle: ash::Device,
}

impl VulkanDevice {
    /// Wrap a device. The device must outlive every factory using this wrapper.
    pub fn new(handle: ash::Device) -> Self {
        Self {
            handle,
        }
    }

    /// Get the wrapped device
    pub fn handle(&self) -> &ash::Device {
        &self.handle
    }
}

enum DescriptorInfo {
    Image(usize),
    Buffer(usize),
}

impl DescriptorDevice for VulkanDevice {
    type SetLayout = vk::DescriptorSetLayout;
    type Pool = vk::DescriptorPool;
    type Set = vk::DescriptorSet;
    type Buffer = VulkanBuffer;
    type Texture = VulkanTexture;
    type Sampler = VulkanSampler;

    fn create_set_layout(&self, slots: &[BindingSlot]) -> Result<Self::SetLayout> {
        let bindings = slots
            .iter()
            .map(|slot| slot.into_vulkan())
            .collect::<SmallVec<[vk::DescriptorSetLayoutBinding; 8]>>();
        let info = vk::DescriptorSetLayoutCreateInfo::builder()
            .bindings(bindings.as_slice())
            .build();
        // SAFETY: info only points into `bindings`, which lives until the end of this function.
        let handle = unsafe { self.handle.create_descriptor_set_layout(&info, None) }.map_err(Error::from)?;
        Ok(handle)
    }

    fn destroy_set_layout(&self, layout: Self::SetLayout) {
        unsafe {
            self.handle.destroy_descriptor_set_layout(layout, None);
        }
    }

    fn create_pool(&self, sizes: &[PoolSize], max_sets: u32) -> Result<Self::Pool> {
        let pool_sizes = sizes
            .iter()
            .map(|size| size.into_vulkan())
            .collect::<SmallVec<[vk::DescriptorPoolSize; 4]>>();
        let info = vk::DescriptorPoolCreateInfo::builder()
            .max_sets(max_sets)
            .pool_sizes(pool_sizes.as_slice())
            .build();
        let handle = unsafe { self.handle.create_descriptor_pool(&info, None) }.map_err(Error::from)?;
        Ok(handle)
    }

    fn destroy_pool(&self, pool: Self::Pool) {
        unsafe {
            self.handle.destroy_descriptor_pool(pool, None);
        }
    }

    fn allocate_set(&self, pool: Self::Pool, layout: Self::SetLayout) -> Result<Self::Set> {
        let info = vk::DescriptorSetAllocateInfo::builder()
            .descriptor_pool(pool)
            .set_layouts(std::slice::from_ref(&layout))
            .build();
        let sets = unsafe { self.handle.allocate_descriptor_sets(&info) }.map_err(Error::from)?;
        sets.first()
            .copied()
            .ok_or_else(|| Error::VkError(vk::Result::ERROR_OUT_OF_POOL_MEMORY).into())
    }

    fn write_set(&self, set: Self::Set, writes: &[SlotWrite<'_, Self>]) {
        let mut image_infos = SmallVec::<[vk::DescriptorImageInfo; 8]>::new();
        let mut buffer_infos = SmallVec::<[vk::DescriptorBufferInfo; 8]>::new();
        let mut infos = SmallVec::<[(u32, vk::DescriptorType, DescriptorInfo); 8]>::new();

        for write in writes {
            let info = match write.source {
                WriteSource::Texture {
                    texture,
                    sampler,
                    layout,
                } => {
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: sampler.handle,
                        image_view: texture.view,
                        image_layout: layout.into_vulkan(),
                    });
                    DescriptorInfo::Image(image_infos.len() - 1)
                }
                WriteSource::Buffer {
                    buffer,
                    offset,
                    range,
                } => {
                    buffer_infos.push(vk::DescriptorBufferInfo {
                        buffer: buffer.handle,
                        offset,
                        range,
                    });
                    DescriptorInfo::Buffer(buffer_infos.len() - 1)
                }
                WriteSource::Image {
                    texture,
                    mip_level,
                } => {
                    let view = texture.mip_views.get(mip_level as usize).copied();
                    debug_assert!(view.is_some(), "mip level {mip_level} was not validated before writing");
                    image_infos.push(vk::DescriptorImageInfo {
                        sampler: vk::Sampler::null(),
                        image_view: view.unwrap_or(texture.view),
                        image_layout: TextureLayout::General.into_vulkan(),
                    });
                    DescriptorInfo::Image(image_infos.len() - 1)
                }
            };
            infos.push((write.slot, write.kind.into_vulkan(), info));
        }

        // Info arrays are complete at this point, so pointers into them stay valid.
        let vk_writes = infos
            .iter()
            .map(|(slot, ty, info)| {
                let write = vk::WriteDescriptorSet::builder()
                    .dst_set(set)
                    .dst_binding(*slot)
                    .dst_array_element(0)
                    .descriptor_type(*ty);
                match info {
                    DescriptorInfo::Image(index) => write.image_info(std::slice::from_ref(&image_infos[*index])).build(),
                    DescriptorInfo::Buffer(index) => write.buffer_info(std::slice::from_ref(&buffer_infos[*index])).build(),
                }
            })
            .collect::<SmallVec<[vk::WriteDescriptorSet; 8]>>();

        unsafe {
            self.handle.update_descriptor_sets(vk_writes.as_slice(), &[]);
        }
    }
}
