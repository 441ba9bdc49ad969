//! Exposes the deimos error type

use std::fmt::{Display, Formatter};
use std::sync::PoisonError;

use thiserror::Error;

use crate::descriptor::layout::DescriptorKind;

/// Native object kinds the device collaborator can refuse to create.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DeviceObject {
    /// A native descriptor set layout.
    SetLayout,
    /// A native descriptor pool block.
    Pool,
    /// A single descriptor set carved out of a pool block.
    Set,
}

impl Display for DeviceObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceObject::SetLayout => write!(f, "descriptor set layout"),
            DeviceObject::Pool => write!(f, "descriptor pool"),
            DeviceObject::Set => write!(f, "descriptor set"),
        }
    }
}

/// Error type that deimos can return.
///
/// Public functions return [`anyhow::Result`], use `err.downcast_ref::<Error>()` to inspect which of these
/// caused a failure.
#[derive(Error, Debug)]
pub enum Error {
    /// Two slot descriptions in one layout claim the same binding index.
    #[error("Binding slot {0} is declared more than once in the same layout.")]
    DuplicateBinding(u32),
    /// The device refused to create a native object, usually because it ran out of descriptor memory.
    #[error("Device failed to allocate a {0}.")]
    DeviceAllocation(DeviceObject),
    /// Binding slot index is larger than the maximum amount of slots in a set.
    #[error("Binding slot {0} is out of range.")]
    SlotOutOfRange(u32),
    /// Layout handle was not created by this factory.
    #[error("Layout handle with index {0} does not exist.")]
    InvalidLayoutHandle(u32),
    /// The layout declares a slot, but no resource was bound to it.
    #[error("No resource bound to active slot {0}.")]
    MissingBinding(u32),
    /// The resource bound to a slot does not match the kind declared by the layout.
    #[error("Slot {slot} expects a {expected:?} binding, but a {found:?} binding was given.")]
    BindingKindMismatch {
        /// Offending slot
        slot: u32,
        /// Kind declared by the layout
        expected: DescriptorKind,
        /// Kind of the bound resource
        found: DescriptorKind,
    },
    /// Storage image binding refers to a mip level the texture does not have.
    #[error("Slot {slot} binds mip level {level}, but the texture only has {count} levels.")]
    MipLevelOutOfRange {
        /// Offending slot
        slot: u32,
        /// Requested mip level
        level: u32,
        /// Amount of mip levels in the texture
        count: u32,
    },
    /// Tried to allocate a descriptor set from a layout without any bindings.
    #[error("Empty descriptor set.")]
    EmptyDescriptorBinding,
    /// Factory settings are invalid.
    #[error("Invalid factory settings: {0}")]
    InvalidSettings(&'static str),
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
