//! Various utilities

pub(crate) mod hash;
pub mod to_vk;
