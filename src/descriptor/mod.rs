//! This module handles everything related to descriptor sets.
//! Similarly to a pipeline cache, this module exposes a [`DescriptorSetFactory`](factory::DescriptorSetFactory) struct.
//! This struct interns descriptor set layouts, allocates descriptor sets, writes to them and manages the descriptor
//! pools they are allocated from.
//!
//! Descriptor pools automatically grow as more sets are allocated, removing the need to declare their size upfront.
//!
//! To allocate descriptor sets, use the provided [`SetBindings`](binding::SetBindings) structure to specify the
//! resources bound to each slot.
//!
//! # Example
//!
//! ```ignore
//! use deimos::*;
//!
//! let layout = factory.create_layout(&[
//!     // In GLSL this would be a descriptor
//!     // layout(set = X, binding = 0) uniform sampler2D tex;
//!     BindingSlot::new(0, DescriptorKind::Texture, ShaderStages::FRAGMENT),
//! ])?;
//! let bindings = SetBindings::new().bind_texture(0, &my_texture, &my_sampler, TextureLayout::ShaderReadOnly)?;
//! let set = factory.create_set(WorkerId::current(), &layout, &bindings)?;
//! ```
//!
//! # Reuse and recycling
//!
//! Sets are cached per worker thread and per layout, keyed by the content identifiers of the bound resources.
//! Requesting a set with resources that were bound before returns the same set and does not touch the device.
//! A set that has not been requested for more than [`FactorySettings::frame_buffering`](crate::FactorySettings)
//! frames is overwritten with new contents instead of allocating a new one. Call
//! [`DescriptorSetFactory::next_frame`](factory::DescriptorSetFactory::next_frame) once per frame so the factory
//! knows which sets are still in flight.

pub mod binding;
pub mod cache;
pub mod factory;
pub mod layout;

mod pool;
