//! Per-thread descriptor set caches.
//!
//! Every `(layout, worker)` pair owns one [`ThreadAllocator`]. It keeps all sets it ever allocated, indexed by
//! the content hash of the resources that were last written into them. A lookup with a known hash returns the
//! existing set without touching the device. On a miss, the least recently used set is rewritten if the device
//! can no longer be reading it, otherwise a new set is carved out of the allocator's [`SetPool`].
//!
//! Sets are never freed individually. They live until their thread allocator is dropped together with its
//! pool blocks.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::Result;

use crate::descriptor::binding::SetBindings;
use crate::descriptor::layout::Layout;
use crate::descriptor::pool::SetPool;
use crate::device::DescriptorDevice;
use crate::{Error, FactorySettings, WorkerId};

/// Doubly linked list over set indices, least recently used at the front.
#[derive(Debug, Default)]
struct RecencyList {
    links: Vec<Link>,
    head: Option<usize>,
    tail: Option<usize>,
}

#[derive(Debug, Default, Copy, Clone)]
struct Link {
    prev: Option<usize>,
    next: Option<usize>,
}

impl RecencyList {
    /// Append a new index at the most recently used end. Indices must be pushed in order `0, 1, 2, ...`.
    fn push_back(&mut self, index: usize) {
        debug_assert_eq!(index, self.links.len(), "recency list indices must be dense");
        self.links.push(Link {
            prev: self.tail,
            next: None,
        });
        self.attach_back(index);
    }

    fn attach_back(&mut self, index: usize) {
        self.links[index].prev = self.tail;
        self.links[index].next = None;
        match self.tail {
            Some(tail) => self.links[tail].next = Some(index),
            None => self.head = Some(index),
        }
        self.tail = Some(index);
    }

    fn unlink(&mut self, index: usize) {
        let Link {
            prev,
            next,
        } = self.links[index];
        match prev {
            Some(prev) => self.links[prev].next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.links[next].prev = prev,
            None => self.tail = prev,
        }
    }

    /// Mark an index as most recently used.
    fn move_to_back(&mut self, index: usize) {
        if self.tail == Some(index) {
            return;
        }
        self.unlink(index);
        self.attach_back(index);
    }

    /// Least recently used index.
    fn front(&self) -> Option<usize> {
        self.head
    }
}

/// A descriptor set owned by a thread allocator.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
struct AllocatedSet<D: DescriptorDevice> {
    handle: D::Set,
    hash: u64,
    last_frame_used: u64,
}

/// Usage counters of a single thread allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocatorStats {
    /// Worker owning the allocator
    pub worker: WorkerId,
    /// Amount of native sets allocated so far
    pub sets: usize,
    /// Amount of pool blocks created so far
    pub pool_blocks: usize,
    /// Set capacity of the newest pool block, zero if no block was created yet
    pub last_block_capacity: u32,
    /// Sets that can still be allocated from the newest block
    pub free_in_last_block: u32,
}

/// Set cache and pool for one layout, used by a single worker.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct ThreadAllocator<D: DescriptorDevice> {
    worker: WorkerId,
    sets: Vec<AllocatedSet<D>>,
    recency: RecencyList,
    index: HashMap<u64, usize>,
    pool: SetPool<D>,
    frame_buffering: u64,
}

impl<D: DescriptorDevice> ThreadAllocator<D> {
    pub fn new(worker: WorkerId, device: Arc<D>, settings: &FactorySettings) -> Self {
        Self {
            worker,
            sets: Vec::new(),
            recency: RecencyList::default(),
            index: HashMap::new(),
            pool: SetPool::new(device, settings),
            frame_buffering: settings.frame_buffering,
        }
    }

    /// Get the set holding the resources identified by `hash`, writing `bindings` into a recycled or new set
    /// if no such set exists. `frame` must never be lower than in a previous call.
    /// # Errors
    /// - Fails with [`Error::DeviceAllocation`] if a new pool block was needed and could not be created.
    pub fn get_or_create(&mut self, layout: &Layout<D>, device: &D, hash: u64, bindings: &SetBindings<'_, D>, frame: u64) -> Result<D::Set> {
        match self.try_find(hash, frame) {
            Some(set) => Ok(set),
            None => self.new_set(layout, device, hash, bindings, frame),
        }
    }

    fn try_find(&mut self, hash: u64, frame: u64) -> Option<D::Set> {
        let index = *self.index.get(&hash)?;
        self.recency.move_to_back(index);
        let set = &mut self.sets[index];
        set.last_frame_used = frame;
        Some(set.handle)
    }

    /// Find the least recently used set the device is done with. Sets are ordered by last use, so when the
    /// least recently used set may still be read by the device, every other set may be too.
    fn find_recyclable(&self, frame: u64) -> Option<usize> {
        self.recency
            .front()
            .filter(|index| frame.saturating_sub(self.sets[*index].last_frame_used) > self.frame_buffering)
    }

    fn new_set(&mut self, layout: &Layout<D>, device: &D, hash: u64, bindings: &SetBindings<'_, D>, frame: u64) -> Result<D::Set> {
        let index = match self.find_recyclable(frame) {
            Some(index) => {
                let set = &mut self.sets[index];
                trace!(
                    "Recycling descriptor set {:?} of layout #{} for {}, unused for {} frames",
                    set.handle,
                    layout.index(),
                    self.worker,
                    frame.saturating_sub(set.last_frame_used)
                );
                self.index.remove(&set.hash);
                set.hash = hash;
                self.index.insert(hash, index);
                self.recency.move_to_back(index);
                index
            }
            None => {
                let handle = self.pool.allocate(layout)?;
                let index = self.sets.len();
                self.sets.push(AllocatedSet {
                    handle,
                    hash,
                    last_frame_used: frame,
                });
                self.recency.push_back(index);
                self.index.insert(hash, index);
                index
            }
        };

        let set = &mut self.sets[index];
        set.last_frame_used = frame;
        let writes = bindings.writes(layout);
        device.write_set(set.handle, &writes);
        Ok(set.handle)
    }

    pub fn stats(&self) -> AllocatorStats {
        let last = self.pool.blocks().last();
        AllocatorStats {
            worker: self.worker,
            sets: self.sets.len(),
            pool_blocks: self.pool.blocks().len(),
            last_block_capacity: last.map(|block| block.capacity()).unwrap_or_default(),
            free_in_last_block: last.map(|block| block.free()).unwrap_or_default(),
        }
    }
}

/// Thread allocators of one layout, sorted by worker id.
#[derive(Derivative)]
#[derivative(Debug(bound = ""))]
pub(crate) struct ThreadAllocators<D: DescriptorDevice> {
    entries: Mutex<Vec<(WorkerId, Arc<Mutex<ThreadAllocator<D>>>)>>,
}

impl<D: DescriptorDevice> ThreadAllocators<D> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Find the allocator of a worker, creating it on first use.
    pub fn get_or_create(&self, worker: WorkerId, create: impl FnOnce() -> ThreadAllocator<D>) -> Result<Arc<Mutex<ThreadAllocator<D>>>> {
        let mut entries = self.entries.lock().map_err(Error::from)?;
        match entries.binary_search_by_key(&worker, |(id, _)| *id) {
            Ok(position) => Ok(entries[position].1.clone()),
            Err(position) => {
                let allocator = Arc::new(Mutex::new(create()));
                entries.insert(position, (worker, allocator.clone()));
                debug!("Created descriptor set allocator for {worker} ({} workers on this layout)", entries.len());
                Ok(allocator)
            }
        }
    }

    pub fn stats(&self) -> Result<Vec<AllocatorStats>> {
        let entries = self.entries.lock().map_err(Error::from)?;
        entries
            .iter()
            .map(|(_, allocator)| -> Result<AllocatorStats> { Ok(allocator.lock().map_err(Error::from)?.stats()) })
            .collect()
    }

    /// Drop every allocator, releasing their sets and pool blocks.
    pub fn clear(&self) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.clear();
    }
}
