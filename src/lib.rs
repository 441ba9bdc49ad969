//! Descriptor set caching for Vulkan renderers
//!
//! Deimos turns a binding layout and the resources bound for one draw or dispatch into a ready to bind
//! descriptor set. Sets are reused whenever the same resources are bound again, and sets that have not been used
//! for long enough are rewritten rather than leaked. Every recording thread gets its own caches and pools,
//! so the per-draw path never contends with other threads.
//!
//! To get started, the easiest way is to simply
//! ```
//! // Import all types
//! use deimos::prelude::*;
//! ```
//!
//! # Example
//!
//! First, wrap your device in something implementing [`DescriptorDevice`](crate::DescriptorDevice). For Vulkan
//! through `ash`, this is [`VulkanDevice`](crate::VulkanDevice).
//! ```ignore
//! use std::sync::Arc;
//! use deimos::prelude::*;
//!
//! let device = Arc::new(VulkanDevice::new(ash_device.clone()));
//! let settings = SettingsBuilder::new()
//!     // Must cover every frame the GPU can still be working on.
//!     .frame_buffering(3u64)
//!     .build();
//! let factory = DescriptorSetFactory::new(device, settings)?;
//! ```
//! Layouts are created once per distinct shader binding shape.
//! ```ignore
//! let layout = factory.create_layout(&[
//!     BindingSlot::new(0, DescriptorKind::UniformBuffer, ShaderStages::VERTEX),
//!     BindingSlot::new(1, DescriptorKind::Texture, ShaderStages::FRAGMENT),
//! ])?;
//! ```
//! Then, for every draw call, request a set for the resources you want to bind. This can happen from any amount
//! of threads at once.
//! ```ignore
//! let bindings = SetBindings::new()
//!     .bind_uniform_buffer(0, &camera, 0, 256)?
//!     .bind_texture(1, &albedo, &sampler, TextureLayout::ShaderReadOnly)?;
//! let set = factory.create_set(WorkerId::current(), &layout, &bindings)?;
//! ```
//! Finally, advance the frame clock once every frame.
//! ```ignore
//! factory.next_frame();
//! ```
//! For further information, check out the following modules
//! - [`descriptor`] for layouts, bindings and the factory itself.
//! - [`device`] for the interface to the graphics device.
//! - [`sync`] for the frame clock and worker identities.
//! - [`core`] for errors and settings.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod core;
pub mod descriptor;
pub mod device;
pub mod sync;
pub mod util;
