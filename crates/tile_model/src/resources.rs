//! Pooled raster resources with drop-based reclaim.
//!
//! A [`PooledResource`] stands in for one tile-sized texture allocation.
//! Dropping it anywhere sends its key back to the owning [`ResourcePool`]
//! over a channel, so a tile destroyed deep inside a tiling can never leak
//! its resource from the pool's accounting.

use crossbeam_channel::{Receiver, Sender, unbounded};
use geometry::IntSize;
use slotmap::{SlotMap, new_key_type};

new_key_type! {
    pub struct ResourceKey;
}

const BYTES_PER_PIXEL: i64 = 4;

pub fn bytes_for_size(size: IntSize) -> i64 {
    size.area() * BYTES_PER_PIXEL
}

#[derive(Debug)]
pub struct PooledResource {
    key: ResourceKey,
    size: IntSize,
    bytes: i64,
    reclaim: Sender<ResourceKey>,
}

impl PooledResource {
    pub fn key(&self) -> ResourceKey {
        self.key
    }

    pub fn size(&self) -> IntSize {
        self.size
    }

    pub fn bytes(&self) -> i64 {
        self.bytes
    }
}

impl Drop for PooledResource {
    fn drop(&mut self) {
        // The pool may already be gone at process teardown.
        let _ = self.reclaim.send(self.key);
    }
}

#[derive(Debug)]
struct Entry {
    size: IntSize,
    bytes: i64,
    acquired: bool,
}

#[derive(Debug)]
pub struct ResourcePool {
    entries: SlotMap<ResourceKey, Entry>,
    reclaim_tx: Sender<ResourceKey>,
    reclaim_rx: Receiver<ResourceKey>,
    acquired_bytes: i64,
}

impl ResourcePool {
    pub fn new() -> Self {
        let (reclaim_tx, reclaim_rx) = unbounded();
        Self {
            entries: SlotMap::with_key(),
            reclaim_tx,
            reclaim_rx,
            acquired_bytes: 0,
        }
    }

    /// Hands out a resource of the given size, reusing a returned entry of
    /// the same size when one is free.
    pub fn acquire(&mut self, size: IntSize) -> PooledResource {
        self.process_returns();
        let key = self
            .entries
            .iter()
            .find(|(_, entry)| !entry.acquired && entry.size == size)
            .map(|(key, _)| key)
            .unwrap_or_else(|| {
                self.entries.insert(Entry {
                    size,
                    bytes: bytes_for_size(size),
                    acquired: false,
                })
            });
        let entry = &mut self.entries[key];
        entry.acquired = true;
        self.acquired_bytes += entry.bytes;
        PooledResource {
            key,
            size: entry.size,
            bytes: entry.bytes,
            reclaim: self.reclaim_tx.clone(),
        }
    }

    /// Drains the reclaim channel, marking dropped resources free again.
    pub fn process_returns(&mut self) {
        while let Ok(key) = self.reclaim_rx.try_recv() {
            let entry = self
                .entries
                .get_mut(key)
                .filter(|entry| entry.acquired)
                .unwrap_or_else(|| panic!("resource returned twice or never acquired"));
            entry.acquired = false;
            self.acquired_bytes -= entry.bytes;
        }
    }

    /// Frees unacquired entries until the pool's total footprint is at most
    /// `target_bytes`.
    pub fn trim_free(&mut self, target_bytes: i64) {
        self.process_returns();
        while self.total_memory_bytes() > target_bytes {
            let Some(key) = self
                .entries
                .iter()
                .find(|(_, entry)| !entry.acquired)
                .map(|(key, _)| key)
            else {
                break;
            };
            self.entries.remove(key);
        }
    }

    pub fn acquired_memory_bytes(&self) -> i64 {
        self.acquired_bytes
    }

    pub fn total_memory_bytes(&self) -> i64 {
        self.entries.values().map(|entry| entry.bytes).sum()
    }

    pub fn acquired_resource_count(&self) -> usize {
        self.entries.values().filter(|entry| entry.acquired).count()
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dropping_a_resource_returns_it_to_the_pool() {
        let mut pool = ResourcePool::new();
        let size = IntSize::new(256, 256);
        let resource = pool.acquire(size);
        assert_eq!(pool.acquired_memory_bytes(), 256 * 256 * 4);
        drop(resource);
        pool.process_returns();
        assert_eq!(pool.acquired_memory_bytes(), 0);
        assert_eq!(pool.acquired_resource_count(), 0);
        // The entry stays around for reuse.
        assert_eq!(pool.total_memory_bytes(), 256 * 256 * 4);
    }

    #[test]
    fn freed_entries_are_reused_for_matching_sizes() {
        let mut pool = ResourcePool::new();
        let size = IntSize::new(64, 64);
        let first = pool.acquire(size);
        let first_key = first.key();
        drop(first);
        let second = pool.acquire(size);
        assert_eq!(second.key(), first_key);
        assert_eq!(pool.total_memory_bytes(), 64 * 64 * 4);
    }

    #[test]
    fn mismatched_sizes_allocate_new_entries() {
        let mut pool = ResourcePool::new();
        drop(pool.acquire(IntSize::new(64, 64)));
        let other = pool.acquire(IntSize::new(128, 128));
        assert_eq!(other.size(), IntSize::new(128, 128));
        assert_eq!(pool.total_memory_bytes(), (64 * 64 + 128 * 128) * 4);
    }

    #[test]
    fn trim_free_only_drops_unacquired_entries() {
        let mut pool = ResourcePool::new();
        let held = pool.acquire(IntSize::new(64, 64));
        drop(pool.acquire(IntSize::new(64, 64)));
        pool.trim_free(0);
        assert_eq!(pool.total_memory_bytes(), held.bytes());
        assert_eq!(pool.acquired_resource_count(), 1);
    }
}
