// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Generation-checked slot arena backing the opaque handles.
//
// A handle is `(index, generation)` packed into a pointer-sized integer. The
// index is stored +1 so a live handle is never null. Removing an entry bumps
// the slot's generation, so a stale handle fails the lookup instead of
// reaching whatever now occupies the slot.

use std::ffi::c_void;

const HALF_BITS: u32 = usize::BITS / 2;
const INDEX_MASK: usize = (1usize << HALF_BITS) - 1;
const GENERATION_MASK: u32 = INDEX_MASK as u32;

/// Key identifying one registry entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandleKey {
    index: u32,
    generation: u32,
}

impl HandleKey {
    /// Encode as the opaque pointer given to the host. Never null.
    pub fn into_raw(self) -> *mut c_void {
        let packed = ((self.generation as usize) << HALF_BITS) | (self.index as usize + 1);
        packed as *mut c_void
    }

    /// Decode a host-supplied pointer. Null yields `None`; any other value
    /// decodes, and is validated by the registry lookup.
    pub fn from_raw(ptr: *const c_void) -> Option<Self> {
        let packed = ptr as usize;
        let slot = packed & INDEX_MASK;
        if slot == 0 {
            return None;
        }
        Some(Self {
            index: (slot - 1) as u32,
            generation: (packed >> HALF_BITS) as u32,
        })
    }
}

impl std::fmt::Display for HandleKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Arena mapping handles to owned records.
pub struct HandleRegistry<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    live: usize,
}

impl<T> HandleRegistry<T> {
    pub const fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            live: 0,
        }
    }

    /// Store `value`, returning its key, or hand `value` back when every
    /// encodable index is in use.
    pub fn insert(&mut self, value: T) -> Result<HandleKey, T> {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                // The last index is reserved so `index + 1` fits the mask.
                if self.slots.len() >= INDEX_MASK {
                    return Err(value);
                }
                self.slots.push(Slot {
                    generation: 0,
                    value: None,
                });
                (self.slots.len() - 1) as u32
            }
        };

        let slot = &mut self.slots[index as usize];
        slot.value = Some(value);
        self.live += 1;
        Ok(HandleKey {
            index,
            generation: slot.generation,
        })
    }

    pub fn get(&self, key: HandleKey) -> Option<&T> {
        self.slots
            .get(key.index as usize)
            .filter(|slot| slot.generation == key.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Remove the entry for `key`. The slot's generation moves on, so `key`
    /// never resolves again.
    pub fn remove(&mut self, key: HandleKey) -> Option<T> {
        let slot = self.slots.get_mut(key.index as usize)?;
        if slot.generation != key.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1) & GENERATION_MASK;
        self.free.push(key.index);
        self.live -= 1;
        Some(value)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}
