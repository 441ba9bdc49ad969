pub use ash::vk;

pub use crate::core::error::{DeviceObject, Error};
pub use crate::core::settings::*;

pub use crate::descriptor::binding::{ResourceBinding, SetBindings, TextureLayout};
pub use crate::descriptor::cache::AllocatorStats;
pub use crate::descriptor::factory::{DescriptorSetFactory, LayoutStats};
pub use crate::descriptor::layout::{
    BindingSlot, DescriptorKind, Layout, LayoutHandle, PoolSize, ShaderStages, EMPTY_LAYOUT_HASH, MAX_BINDING_SLOTS,
};

pub use crate::device::vulkan::{VulkanBuffer, VulkanDevice, VulkanSampler, VulkanTexture};
pub use crate::device::{ContentId, DescriptorDevice, SlotWrite, TextureResource, WriteSource};

pub use crate::sync::frame_clock::FrameClock;
pub use crate::sync::worker::WorkerId;

pub use crate::util::to_vk::IntoVulkanType;
