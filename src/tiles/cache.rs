//! In-memory tile store with explicit per-key fetch status.
//!
//! One entity tracks both the decoded images and the request bookkeeping:
//! every key carries a [`TileSlot`] status, so "was this tile already
//! attempted" and "is its image available" can never drift apart. Loaded
//! entries are evicted in insertion order once the store grows past its high
//! water mark; an eviction pass also resets failed slots, which is the only
//! way a failed tile ever becomes fetchable again.

use crate::core::geo::TileCoord;
use crate::prelude::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;

/// Decoded raster tile ready for compositing.
pub type TileImage = Arc<image::RgbaImage>;

/// Fetch status of one tile key.
#[derive(Debug, Clone)]
pub enum TileSlot {
    /// Never requested (absent from the store).
    NotRequested,
    /// A fetch is in flight; no second request may be issued.
    Pending,
    /// Decoded and ready to draw.
    Loaded(TileImage),
    /// Fetch failed or timed out; stays failed until an eviction pass.
    Failed,
}

impl TileSlot {
    /// Whether a fetch has been issued for this slot (successfully or not).
    pub fn is_attempted(&self) -> bool {
        !matches!(self, TileSlot::NotRequested)
    }
}

/// Tile cache keyed by [`TileCoord`].
#[derive(Debug)]
pub struct TileStore {
    slots: HashMap<TileCoord, TileSlot>,
    /// Loaded keys, oldest insertion first.
    insertion_order: VecDeque<TileCoord>,
    evict_high: usize,
    evict_keep: usize,
}

impl TileStore {
    pub fn new(evict_high: usize, evict_keep: usize) -> Self {
        Self {
            slots: HashMap::default(),
            insertion_order: VecDeque::new(),
            evict_high,
            evict_keep: evict_keep.min(evict_high),
        }
    }

    /// Current status of a key. Absent keys read as `NotRequested`.
    pub fn status(&self, coord: &TileCoord) -> TileSlot {
        self.slots
            .get(coord)
            .cloned()
            .unwrap_or(TileSlot::NotRequested)
    }

    /// Get a decoded tile, if loaded.
    pub fn get(&self, coord: &TileCoord) -> Option<TileImage> {
        match self.slots.get(coord) {
            Some(TileSlot::Loaded(image)) => Some(image.clone()),
            _ => None,
        }
    }

    /// Transition a key to `Pending` before spawning its fetch. Returns
    /// false (and changes nothing) if the key was already attempted, which
    /// is what deduplicates concurrent requests.
    pub fn mark_pending(&mut self, coord: TileCoord) -> bool {
        if self.slots.get(&coord).is_some_and(TileSlot::is_attempted) {
            return false;
        }
        self.slots.insert(coord, TileSlot::Pending);
        true
    }

    /// Record a failed or timed-out fetch.
    pub fn mark_failed(&mut self, coord: TileCoord) {
        self.slots.insert(coord, TileSlot::Failed);
    }

    /// Insert a decoded tile and run the eviction check. Returns the number
    /// of entries evicted (usually 0).
    pub fn insert(&mut self, coord: TileCoord, image: TileImage) -> usize {
        let was_loaded = matches!(self.slots.get(&coord), Some(TileSlot::Loaded(_)));
        self.slots.insert(coord, TileSlot::Loaded(image));
        if !was_loaded {
            self.insertion_order.push_back(coord);
        }

        if self.loaded_len() > self.evict_high {
            self.evict()
        } else {
            0
        }
    }

    /// Number of loaded tiles.
    pub fn loaded_len(&self) -> usize {
        self.insertion_order.len()
    }

    /// Number of keys with any attempted status.
    pub fn attempted_len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Drop everything (e.g. on teardown).
    pub fn clear(&mut self) {
        self.slots.clear();
        self.insertion_order.clear();
    }

    /// Trim loaded tiles to the most recently inserted `evict_keep` and
    /// reset every failed slot so those tiles can be fetched again.
    /// In-flight `Pending` slots survive, keeping at most one outstanding
    /// fetch per key.
    fn evict(&mut self) -> usize {
        let excess = self.loaded_len().saturating_sub(self.evict_keep);
        for _ in 0..excess {
            if let Some(old) = self.insertion_order.pop_front() {
                self.slots.remove(&old);
            }
        }

        self.slots
            .retain(|_, slot| !matches!(slot, TileSlot::Failed));

        log::debug!(
            "tile store evicted {} entries, {} loaded remain",
            excess,
            self.loaded_len()
        );

        excess
    }
}
