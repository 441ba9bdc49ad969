use ash::vk;

use deimos::{
    BindingSlot, ContentId, DescriptorKind, IntoVulkanType, PoolSize, ShaderStages, TextureLayout, TextureResource,
    VulkanBuffer, VulkanTexture,
};

#[test]
pub fn descriptor_kinds_map_to_descriptor_types() {
    assert_eq!(DescriptorKind::Texture.into_vulkan(), vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(DescriptorKind::UniformBuffer.into_vulkan(), vk::DescriptorType::UNIFORM_BUFFER);
    assert_eq!(DescriptorKind::StorageBuffer.into_vulkan(), vk::DescriptorType::STORAGE_BUFFER);
    assert_eq!(DescriptorKind::Image.into_vulkan(), vk::DescriptorType::STORAGE_IMAGE);
}

#[test]
pub fn shader_stages_map_to_stage_flags() {
    assert_eq!(ShaderStages::empty().into_vulkan(), vk::ShaderStageFlags::empty());
    assert_eq!(
        (ShaderStages::VERTEX | ShaderStages::FRAGMENT).into_vulkan(),
        vk::ShaderStageFlags::VERTEX | vk::ShaderStageFlags::FRAGMENT
    );
    assert_eq!(ShaderStages::ALL_GRAPHICS.into_vulkan(), vk::ShaderStageFlags::ALL_GRAPHICS);
    assert_eq!(
        ShaderStages::ALL.into_vulkan(),
        vk::ShaderStageFlags::ALL_GRAPHICS | vk::ShaderStageFlags::COMPUTE
    );
    assert!(ShaderStages::ALL.contains(ShaderStages::COMPUTE));
    assert!(!ShaderStages::ALL_GRAPHICS.contains(ShaderStages::COMPUTE));
}

#[test]
pub fn texture_layouts_map_to_image_layouts() {
    assert_eq!(TextureLayout::ShaderReadOnly.into_vulkan(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
    assert_eq!(
        TextureLayout::DepthStencilReadOnly.into_vulkan(),
        vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
    );
    assert_eq!(TextureLayout::General.into_vulkan(), vk::ImageLayout::GENERAL);
}

#[test]
pub fn slots_and_pool_sizes_convert() {
    let binding = BindingSlot::new(5, DescriptorKind::StorageBuffer, ShaderStages::COMPUTE).into_vulkan();
    assert_eq!(binding.binding, 5);
    assert_eq!(binding.descriptor_type, vk::DescriptorType::STORAGE_BUFFER);
    assert_eq!(binding.descriptor_count, 1);
    assert_eq!(binding.stage_flags, vk::ShaderStageFlags::COMPUTE);

    let size = PoolSize {
        kind: DescriptorKind::Texture,
        count: 12,
    }
    .into_vulkan();
    assert_eq!(size.ty, vk::DescriptorType::COMBINED_IMAGE_SAMPLER);
    assert_eq!(size.descriptor_count, 12);
}

#[test]
pub fn vulkan_resources_expose_content_ids() {
    let texture = VulkanTexture {
        view: vk::ImageView::null(),
        mip_views: vec![vk::ImageView::null(); 5],
        id: 42,
    };
    assert_eq!(texture.mip_levels(), 5);
    assert_eq!(texture.content_id(), 42);

    let buffer = VulkanBuffer {
        handle: vk::Buffer::null(),
        id: 7,
    };
    assert_eq!(buffer.content_id(), 7);
}
