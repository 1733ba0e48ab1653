//! Fixed-size-slot pool for I/O buffers and filter state records.
//!
//! Slots live in pre-sized blocks. Each block keeps an intra-block free list
//! of slot indices; the pool keeps a ready list of blocks that currently have
//! a reusable slot, so `acquire` and `release` are O(1) amortized.
//!
//! A block is deallocated only once it has been fully exhausted (its free
//! count reached zero) and then fully released again. A block that was never
//! exhausted is kept, so callers that take a few slots and return them
//! immediately do not churn whole blocks.

use crate::error::{Result, StreamError};

/// Default number of slots per block.
pub const DEFAULT_BLOCK_CAPACITY: usize = 32;

/// Index of a live slot in a [`Pool`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    block: u32,
    slot: u32,
}

enum Slot<T> {
    Used(T),
    Free { next: Option<u32> },
}

struct Block<T> {
    slots: Vec<Slot<T>>,
    free_head: Option<u32>,
    free_count: usize,
    /// All slots were in use at some point since the block was allocated.
    exhausted: bool,
}

impl<T> Block<T> {
    fn new(capacity: usize) -> Result<Self> {
        let mut slots = Vec::new();
        slots
            .try_reserve_exact(capacity)
            .map_err(|_| StreamError::AllocationFailure("pool block"))?;
        for i in 0..capacity {
            let next = if i + 1 < capacity {
                Some(i as u32 + 1)
            } else {
                None
            };
            slots.push(Slot::Free { next });
        }
        Ok(Self {
            slots,
            free_head: Some(0),
            free_count: capacity,
            exhausted: false,
        })
    }
}

/// Generic fixed-size-object pool.
///
/// `acquire` hands out a zero-initialized (`Default`) slot; `release` returns
/// it. Handles index into the block arena and stay valid until the slot is
/// released. Passing a released or foreign handle is a caller bug and panics.
pub struct Pool<T> {
    blocks: Vec<Option<Block<T>>>,
    /// Blocks that had a free slot when last seen; cleaned lazily.
    ready: Vec<u32>,
    block_capacity: usize,
    live: usize,
}

impl<T: Default> Pool<T> {
    pub fn new() -> Self {
        Self::with_block_capacity(DEFAULT_BLOCK_CAPACITY)
    }

    pub fn with_block_capacity(block_capacity: usize) -> Self {
        assert!(block_capacity > 0, "pool block capacity must be nonzero");
        Self {
            blocks: Vec::new(),
            ready: Vec::new(),
            block_capacity,
            live: 0,
        }
    }

    /// Take a slot, reusing a freed one when any block has one.
    ///
    /// On allocation failure the pool is left exactly as it was.
    pub fn acquire(&mut self) -> Result<Handle> {
        let block_idx = loop {
            match self.ready.last().copied() {
                Some(idx) => {
                    let has_free = self
                        .blocks
                        .get(idx as usize)
                        .and_then(Option::as_ref)
                        .is_some_and(|b| b.free_head.is_some());
                    if has_free {
                        break idx;
                    }
                    // Stale entry: block was deallocated or drained.
                    self.ready.pop();
                }
                None => {
                    let block = Block::new(self.block_capacity)?;
                    let idx = match self.blocks.iter().position(Option::is_none) {
                        Some(i) => {
                            self.blocks[i] = Some(block);
                            i
                        }
                        None => {
                            self.blocks
                                .try_reserve(1)
                                .map_err(|_| StreamError::AllocationFailure("pool block table"))?;
                            self.blocks.push(Some(block));
                            self.blocks.len() - 1
                        }
                    };
                    self.ready.push(idx as u32);
                }
            }
        };

        let block = self.blocks[block_idx as usize]
            .as_mut()
            .unwrap_or_else(|| panic!("ready list pointed at a dead block"));
        let slot_idx = match block.free_head {
            Some(s) => s,
            None => panic!("ready list pointed at a drained block"),
        };
        let next = match block.slots[slot_idx as usize] {
            Slot::Free { next } => next,
            Slot::Used(_) => panic!("free list pointed at a used slot"),
        };
        block.slots[slot_idx as usize] = Slot::Used(T::default());
        block.free_head = next;
        block.free_count -= 1;
        if block.free_count == 0 {
            block.exhausted = true;
            self.ready.pop();
        }
        self.live += 1;
        Ok(Handle {
            block: block_idx,
            slot: slot_idx,
        })
    }

    /// Return a slot to its block's free list.
    pub fn release(&mut self, handle: Handle) {
        let block = self
            .blocks
            .get_mut(handle.block as usize)
            .and_then(Option::as_mut)
            .unwrap_or_else(|| panic!("stale pool handle"));
        match block.slots[handle.slot as usize] {
            Slot::Used(_) => {}
            Slot::Free { .. } => panic!("pool slot released twice"),
        }
        block.slots[handle.slot as usize] = Slot::Free {
            next: block.free_head,
        };
        block.free_head = Some(handle.slot);
        block.free_count += 1;
        self.live -= 1;
        if block.free_count == 1 {
            self.ready.push(handle.block);
        }
        if block.exhausted && block.free_count == block.slots.len() {
            self.blocks[handle.block as usize] = None;
        }
    }

    pub fn get(&self, handle: Handle) -> &T {
        match self
            .blocks
            .get(handle.block as usize)
            .and_then(Option::as_ref)
            .map(|b| &b.slots[handle.slot as usize])
        {
            Some(Slot::Used(value)) => value,
            _ => panic!("stale pool handle"),
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        match self
            .blocks
            .get_mut(handle.block as usize)
            .and_then(Option::as_mut)
            .map(|b| &mut b.slots[handle.slot as usize])
        {
            Some(Slot::Used(value)) => value,
            _ => panic!("stale pool handle"),
        }
    }

    /// Number of slots currently checked out.
    pub fn count_live(&self) -> usize {
        self.live
    }

    /// Number of blocks currently allocated.
    pub fn block_count(&self) -> usize {
        self.blocks.iter().filter(|b| b.is_some()).count()
    }

    /// Iterate over live slots, for diagnostics and tests.
    pub fn iter_live(&self) -> impl Iterator<Item = (Handle, &T)> {
        self.blocks.iter().enumerate().flat_map(|(bi, block)| {
            block.iter().flat_map(move |b| {
                b.slots.iter().enumerate().filter_map(move |(si, slot)| match slot {
                    Slot::Used(value) => Some((
                        Handle {
                            block: bi as u32,
                            slot: si as u32,
                        },
                        value,
                    )),
                    Slot::Free { .. } => None,
                })
            })
        })
    }

    /// Free every block regardless of occupancy. Outstanding handles become
    /// stale. Used at teardown.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.ready.clear();
        self.live = 0;
    }
}

impl<T: Default> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}
