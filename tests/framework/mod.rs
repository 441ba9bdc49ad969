#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::{anyhow, Result};

use deimos::{
    BindingSlot, ContentId, DescriptorDevice, DescriptorKind, DescriptorSetFactory, FactorySettings, PoolSize,
    SetBindings, SlotWrite, TextureLayout, TextureResource, WriteSource,
};

/// Bindings for sets of the mock device
pub type Bindings<'a> = SetBindings<'a, MockDevice>;

/// Buffer resource of the mock device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockBuffer {
    pub id: u64,
}

/// Sampler resource of the mock device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockSampler {
    pub id: u64,
}

/// Texture resource of the mock device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockTexture {
    pub id: u64,
    pub mips: u32,
}

impl ContentId for MockBuffer {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl ContentId for MockSampler {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl ContentId for MockTexture {
    fn content_id(&self) -> u64 {
        self.id
    }
}

impl TextureResource for MockTexture {
    fn mip_levels(&self) -> u32 {
        self.mips
    }
}

/// A single slot write as seen by the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedWrite {
    Texture {
        slot: u32,
        texture: u64,
        sampler: u64,
        layout: TextureLayout,
    },
    Buffer {
        slot: u32,
        kind: DescriptorKind,
        buffer: u64,
        offset: u64,
        range: u64,
    },
    Image {
        slot: u32,
        texture: u64,
        mip_level: u32,
    },
}

#[derive(Debug, Clone)]
pub struct MockPool {
    pub handle: u64,
    pub sizes: Vec<PoolSize>,
    pub max_sets: u32,
    pub allocated: u32,
    pub destroyed: bool,
}

/// Where a set came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetRecord {
    pub pool: u64,
    pub layout: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    CreateLayout(u64),
    DestroyLayout(u64),
    CreatePool(u64),
    DestroyPool(u64),
}

#[derive(Debug, Default)]
pub struct MockState {
    next_handle: u64,
    pub layouts: HashMap<u64, Vec<BindingSlot>>,
    pub pools: Vec<MockPool>,
    pub sets: HashMap<u64, SetRecord>,
    /// Every write batch, in order
    pub writes: Vec<(u64, Vec<RecordedWrite>)>,
    pub events: Vec<Event>,
    pub fail_pools: bool,
    pub fail_layouts: bool,
}

impl MockState {
    fn handle(&mut self) -> u64 {
        self.next_handle += 1;
        self.next_handle
    }
}

/// Device that records everything it is asked to do.
#[derive(Debug, Default)]
pub struct MockDevice {
    state: Mutex<MockState>,
    panic_on_layout: AtomicBool,
}

impl MockDevice {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn fail_pool_creation(&self, fail: bool) {
        self.state().fail_pools = fail;
    }

    pub fn fail_layout_creation(&self, fail: bool) {
        self.state().fail_layouts = fail;
    }

    /// Panic inside the next layout creation, without holding the state lock.
    pub fn panic_on_layout_creation(&self, panic: bool) {
        self.panic_on_layout.store(panic, Ordering::SeqCst);
    }

    pub fn layouts_created(&self) -> usize {
        self.state()
            .events
            .iter()
            .filter(|event| matches!(event, Event::CreateLayout(_)))
            .count()
    }

    pub fn pools_created(&self) -> usize {
        self.state().pools.len()
    }

    pub fn sets_allocated(&self) -> usize {
        self.state().sets.len()
    }

    pub fn write_count(&self) -> usize {
        self.state().writes.len()
    }

    /// Most recent write batch for a set.
    pub fn last_write(&self, set: u64) -> Option<Vec<RecordedWrite>> {
        self.state()
            .writes
            .iter()
            .rev()
            .find(|(handle, _)| *handle == set)
            .map(|(_, writes)| writes.clone())
    }
}

impl DescriptorDevice for MockDevice {
    type SetLayout = u64;
    type Pool = u64;
    type Set = u64;
    type Buffer = MockBuffer;
    type Texture = MockTexture;
    type Sampler = MockSampler;

    fn create_set_layout(&self, slots: &[BindingSlot]) -> Result<Self::SetLayout> {
        if self.panic_on_layout.swap(false, Ordering::SeqCst) {
            panic!("device lost while creating a layout");
        }
        let mut state = self.state();
        if state.fail_layouts {
            return Err(anyhow!("out of host memory"));
        }
        let handle = state.handle();
        state.layouts.insert(handle, slots.to_vec());
        state.events.push(Event::CreateLayout(handle));
        Ok(handle)
    }

    fn destroy_set_layout(&self, layout: Self::SetLayout) {
        let mut state = self.state();
        assert!(state.layouts.remove(&layout).is_some(), "destroyed unknown layout {layout}");
        state.events.push(Event::DestroyLayout(layout));
    }

    fn create_pool(&self, sizes: &[PoolSize], max_sets: u32) -> Result<Self::Pool> {
        let mut state = self.state();
        if state.fail_pools {
            return Err(anyhow!("out of descriptor pool memory"));
        }
        let handle = state.handle();
        state.pools.push(MockPool {
            handle,
            sizes: sizes.to_vec(),
            max_sets,
            allocated: 0,
            destroyed: false,
        });
        state.events.push(Event::CreatePool(handle));
        Ok(handle)
    }

    fn destroy_pool(&self, pool: Self::Pool) {
        let mut state = self.state();
        let entry = state
            .pools
            .iter_mut()
            .find(|entry| entry.handle == pool)
            .expect("destroyed unknown pool");
        assert!(!entry.destroyed, "pool {pool} destroyed twice");
        entry.destroyed = true;
        state.events.push(Event::DestroyPool(pool));
    }

    fn allocate_set(&self, pool: Self::Pool, layout: Self::SetLayout) -> Result<Self::Set> {
        let mut state = self.state();
        if !state.layouts.contains_key(&layout) {
            return Err(anyhow!("unknown layout {layout}"));
        }
        let entry = state
            .pools
            .iter_mut()
            .find(|entry| entry.handle == pool && !entry.destroyed)
            .ok_or_else(|| anyhow!("unknown pool {pool}"))?;
        if entry.allocated == entry.max_sets {
            return Err(anyhow!("pool {pool} is exhausted"));
        }
        entry.allocated += 1;
        let handle = state.handle();
        state.sets.insert(handle, SetRecord {
            pool,
            layout,
        });
        Ok(handle)
    }

    fn write_set(&self, set: Self::Set, writes: &[SlotWrite<'_, Self>]) {
        let recorded = writes
            .iter()
            .map(|write| match write.source {
                WriteSource::Texture {
                    texture,
                    sampler,
                    layout,
                } => RecordedWrite::Texture {
                    slot: write.slot,
                    texture: texture.id,
                    sampler: sampler.id,
                    layout,
                },
                WriteSource::Buffer {
                    buffer,
                    offset,
                    range,
                } => RecordedWrite::Buffer {
                    slot: write.slot,
                    kind: write.kind,
                    buffer: buffer.id,
                    offset,
                    range,
                },
                WriteSource::Image {
                    texture,
                    mip_level,
                } => RecordedWrite::Image {
                    slot: write.slot,
                    texture: texture.id,
                    mip_level,
                },
            })
            .collect();
        let mut state = self.state();
        assert!(state.sets.contains_key(&set), "wrote to unknown set {set}");
        state.writes.push((set, recorded));
    }
}

/// Start logging for tests. Safe to call more than once.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}

/// Create a mock device and a factory with the given settings
pub fn make_factory(settings: FactorySettings) -> Result<(Arc<MockDevice>, DescriptorSetFactory<MockDevice>)> {
    init_logging();
    let device = MockDevice::new();
    let factory = DescriptorSetFactory::new(device.clone(), settings)?;
    Ok((device, factory))
}

/// Create a mock device and a factory with default settings
pub fn make_default_factory() -> Result<(Arc<MockDevice>, DescriptorSetFactory<MockDevice>)> {
    make_factory(FactorySettings::default())
}
