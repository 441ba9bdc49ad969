//! Utility traits to convert objects into their corresponding vulkan types

use ash::vk;

use crate::descriptor::layout::{BindingSlot, DescriptorKind, PoolSize, ShaderStages};
use crate::descriptor::binding::TextureLayout;

/// Convert an object into a vulkan type
pub trait IntoVulkanType {
    /// Output Vulkan type
    type Output;

    /// Consume self and return a vulkan type
    fn into_vulkan(self) -> Self::Output;
}

impl IntoVulkanType for DescriptorKind {
    type Output = vk::DescriptorType;

    fn into_vulkan(self) -> Self::Output {
        match self {
            DescriptorKind::Texture => vk::DescriptorType::COMBINED_IMAGE_SAMPLER,
            DescriptorKind::UniformBuffer => vk::DescriptorType::UNIFORM_BUFFER,
            DescriptorKind::StorageBuffer => vk::DescriptorType::STORAGE_BUFFER,
            DescriptorKind::Image => vk::DescriptorType::STORAGE_IMAGE,
        }
    }
}

impl IntoVulkanType for ShaderStages {
    type Output = vk::ShaderStageFlags;

    fn into_vulkan(self) -> Self::Output {
        const MAPPING: [(ShaderStages, vk::ShaderStageFlags); 6] = [
            (ShaderStages::VERTEX, vk::ShaderStageFlags::VERTEX),
            (ShaderStages::TESSELLATION_CONTROL, vk::ShaderStageFlags::TESSELLATION_CONTROL),
            (ShaderStages::TESSELLATION_EVALUATION, vk::ShaderStageFlags::TESSELLATION_EVALUATION),
            (ShaderStages::GEOMETRY, vk::ShaderStageFlags::GEOMETRY),
            (ShaderStages::FRAGMENT, vk::ShaderStageFlags::FRAGMENT),
            (ShaderStages::COMPUTE, vk::ShaderStageFlags::COMPUTE),
        ];
        MAPPING
            .iter()
            .filter(|(stage, _)| self.contains(*stage))
            .fold(vk::ShaderStageFlags::empty(), |flags, (_, vk_stage)| flags | *vk_stage)
    }
}

impl IntoVulkanType for TextureLayout {
    type Output = vk::ImageLayout;

    fn into_vulkan(self) -> Self::Output {
        match self {
            TextureLayout::ShaderReadOnly => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            TextureLayout::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            TextureLayout::General => vk::ImageLayout::GENERAL,
        }
    }
}

impl IntoVulkanType for PoolSize {
    type Output = vk::DescriptorPoolSize;

    fn into_vulkan(self) -> Self::Output {
        vk::DescriptorPoolSize {
            ty: self.kind.into_vulkan(),
            descriptor_count: self.count,
        }
    }
}

impl IntoVulkanType for BindingSlot {
    type Output = vk::DescriptorSetLayoutBinding;

    fn into_vulkan(self) -> Self::Output {
        vk::DescriptorSetLayoutBinding::builder()
            .binding(self.binding)
            .descriptor_type(self.kind.into_vulkan())
            .descriptor_count(1)
            .stage_flags(self.stages.into_vulkan())
            .build()
    }
}
