//! Fixed-capacity slot table with remaining-uses eviction.
//!
//! The table is a plain array of `capacity` slots. Each occupied slot holds a
//! value, its fingerprint, and a countdown of remaining hits. A slot whose
//! countdown reached zero is *expired*: it is never reported as a hit again,
//! but it keeps its storage until [`SlotTable::cleanup_expired`] runs.
//!
//! # Eviction
//!
//! Insertion always overwrites the slot with the fewest remaining uses (empty
//! slots count as zero), the first such slot winning ties. This approximates
//! TTL expiry; it is not LRU.
//!
//! # Handles
//!
//! Every insertion stamps its slot with a fresh value of a table-wide
//! generation counter. A [`Handle`] is `(index, generation)`, so a handle
//! that outlived its slot fails with [`CacheError::StaleHandle`] instead of
//! silently reading whatever was inserted there later.

use std::fmt::{Display, Formatter};

use log::{debug, trace};

use crate::error::{CacheError, Result};

#[derive(Debug, Clone)]
struct Slot<T> {
    fingerprint: u64,
    value: T,
    remaining_uses: u32,
    generation: u64,
}

/// Shortcut for the most recently matched fingerprint.
#[derive(Debug, Copy, Clone)]
struct LastHit {
    fingerprint: u64,
    index: usize,
    generation: u64,
}

/// Generation-stamped reference to a slot.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct Handle {
    index: usize,
    generation: u64,
}

impl Handle {
    /// Slot index.
    pub const fn index(self) -> usize {
        self.index
    }

    /// Generation the slot had when the handle was issued.
    pub const fn generation(self) -> u64 {
        self.generation
    }
}

impl Display for Handle {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.index, self.generation)
    }
}

pub struct SlotTable<T> {
    slots: Vec<Option<Slot<T>>>,
    last_hit: Option<LastHit>,
    /// Last generation handed out.
    generation: u64,
    hits: usize,
    misses: usize,
    evictions: usize,
}

impl<T> SlotTable<T> {
    /// Create a new table with `capacity` empty slots.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "Slot table capacity should be positive");

        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            last_hit: None,
            generation: 0,
            hits: 0,
            misses: 0,
            evictions: 0,
        }
    }

    /// Number of slots.
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }
    /// Number of occupied slots, expired ones included.
    pub fn len(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }
    pub fn is_empty(&self) -> bool {
        self.slots.iter().all(|s| s.is_none())
    }

    pub fn hits(&self) -> usize {
        self.hits
    }
    pub fn misses(&self) -> usize {
        self.misses
    }
    /// Number of insertions that overwrote an occupied slot.
    pub fn evictions(&self) -> usize {
        self.evictions
    }

    /// Remaining uses of the slot at `index`; zero for an empty slot.
    pub fn remaining_uses(&self, index: usize) -> u32 {
        self.slots[index].as_ref().map_or(0, |s| s.remaining_uses)
    }
    pub fn fingerprint_at(&self, index: usize) -> Option<u64> {
        self.slots[index].as_ref().map(|s| s.fingerprint)
    }
    pub fn value_at(&self, index: usize) -> Option<&T> {
        self.slots[index].as_ref().map(|s| &s.value)
    }
    pub fn is_occupied(&self, index: usize) -> bool {
        self.slots[index].is_some()
    }

    /// Find the live slot holding `fingerprint`, consuming one of its uses.
    ///
    /// The most recent hit is checked first. Otherwise the table is scanned,
    /// and the *first* slot carrying the fingerprint decides the outcome: if
    /// it is expired, the lookup misses even when a later slot would match.
    pub fn lookup(&mut self, fingerprint: u64) -> Option<Handle> {
        if let Some(last) = self.last_hit.filter(|last| last.fingerprint == fingerprint) {
            if let Some(slot) = self.slots[last.index].as_mut() {
                if slot.generation == last.generation
                    && slot.fingerprint == fingerprint
                    && slot.remaining_uses > 0
                {
                    slot.remaining_uses -= 1;
                    self.hits += 1;
                    trace!("lookup({:#x}): shortcut hit at {}", fingerprint, last.index);
                    return Some(Handle {
                        index: last.index,
                        generation: last.generation,
                    });
                }
            }
        }

        let found = self
            .slots
            .iter_mut()
            .enumerate()
            .find_map(|(i, s)| match s {
                Some(slot) if slot.fingerprint == fingerprint => Some((i, slot)),
                _ => None,
            });

        let Some((index, slot)) = found else {
            trace!("lookup({:#x}): miss", fingerprint);
            self.misses += 1;
            return None;
        };

        if slot.remaining_uses == 0 {
            debug!("lookup({:#x}): slot {} expired", fingerprint, index);
            self.misses += 1;
            return None;
        }

        slot.remaining_uses -= 1;
        let generation = slot.generation;
        trace!(
            "lookup({:#x}): hit at {}, {} uses left",
            fingerprint,
            index,
            slot.remaining_uses
        );

        self.hits += 1;
        self.last_hit = Some(LastHit {
            fingerprint,
            index,
            generation,
        });
        Some(Handle { index, generation })
    }

    /// Index of the slot with the fewest remaining uses, lowest index first.
    pub fn select_victim(&self) -> usize {
        self.slots
            .iter()
            .enumerate()
            .min_by_key(|(_, s)| s.as_ref().map_or(0, |s| s.remaining_uses))
            .map_or(0, |(i, _)| i)
    }

    /// Overwrite the victim slot with a new entry.
    pub fn insert(&mut self, fingerprint: u64, value: T, ttl: u32) -> Handle {
        let index = self.select_victim();
        self.generation += 1;
        let generation = self.generation;

        let evicted = self.slots[index].replace(Slot {
            fingerprint,
            value,
            remaining_uses: ttl,
            generation,
        });

        if let Some(old) = evicted {
            self.evictions += 1;
            debug!(
                "insert({:#x}): evicting {:#x} from slot {} ({} uses left)",
                fingerprint, old.fingerprint, index, old.remaining_uses
            );
        } else {
            trace!("insert({:#x}): slot {}", fingerprint, index);
        }

        Handle { index, generation }
    }

    /// Empty every expired slot. Returns the number of slots cleared.
    pub fn cleanup_expired(&mut self) -> usize {
        let mut cleared = 0;
        for slot in &mut self.slots {
            if slot.as_ref().is_some_and(|s| s.remaining_uses == 0) {
                *slot = None;
                cleared += 1;
            }
        }
        debug!("cleanup_expired: cleared {} slots", cleared);
        cleared
    }

    /// Empty the whole table.
    pub fn clear(&mut self) {
        self.slots.fill_with(|| None);
        self.last_hit = None;
    }

    fn slot(&self, handle: Handle) -> Option<&Slot<T>> {
        self.slots
            .get(handle.index)
            .and_then(Option::as_ref)
            .filter(|s| s.generation == handle.generation)
    }

    /// Dereference a handle.
    pub fn get(&self, handle: Handle) -> Result<&T> {
        self.slot(handle)
            .map(|s| &s.value)
            .ok_or_else(|| stale(handle))
    }

    /// Dereference a handle mutably.
    pub fn get_mut(&mut self, handle: Handle) -> Result<&mut T> {
        self.slots
            .get_mut(handle.index)
            .and_then(Option::as_mut)
            .filter(|s| s.generation == handle.generation)
            .map(|s| &mut s.value)
            .ok_or_else(|| stale(handle))
    }

    /// Whether the handle still points at its original entry.
    pub fn is_valid(&self, handle: Handle) -> bool {
        self.slot(handle).is_some()
    }
}

fn stale(handle: Handle) -> CacheError {
    CacheError::StaleHandle {
        index: handle.index,
        generation: handle.generation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use test_log::test;

    #[test]
    fn test_insert_fills_empty_slots_in_order() {
        let mut table = SlotTable::new(3);
        assert_eq!(table.insert(10, "a", 2).index(), 0);
        assert_eq!(table.insert(20, "b", 2).index(), 1);
        assert_eq!(table.insert(30, "c", 2).index(), 2);
        assert_eq!(table.len(), 3);
        assert_eq!(table.evictions(), 0);
    }

    #[test]
    fn test_lookup_decrements() {
        let mut table = SlotTable::new(2);
        let h = table.insert(10, "a", 3);

        assert_eq!(table.lookup(10), Some(h));
        assert_eq!(table.remaining_uses(0), 2);
        assert_eq!(table.lookup(10), Some(h));
        assert_eq!(table.remaining_uses(0), 1);
        assert_eq!(table.lookup(10), Some(h));
        assert_eq!(table.remaining_uses(0), 0);

        // Expired, but still physically present.
        assert_eq!(table.lookup(10), None);
        assert_eq!(table.remaining_uses(0), 0);
        assert!(table.is_occupied(0));
        assert_eq!(table.hits(), 3);
        assert_eq!(table.misses(), 1);
    }

    #[test]
    fn test_lookup_miss() {
        let mut table = SlotTable::<u32>::new(2);
        assert_eq!(table.lookup(42), None);
        table.insert(1, 1, 5);
        assert_eq!(table.lookup(42), None);
        assert_eq!(table.misses(), 2);
    }

    #[test]
    fn test_shortcut_ignores_overwritten_slot() {
        let mut table = SlotTable::new(1);
        table.insert(10, "a", 5);
        assert!(table.lookup(10).is_some());

        // Slot 0 now holds a different entry; the shortcut must not fire.
        table.insert(20, "b", 5);
        assert_eq!(table.lookup(10), None);
        let h = table.lookup(20).unwrap();
        assert_eq!(table.get(h), Ok(&"b"));
    }

    #[test]
    fn test_first_expired_match_hides_later_match() {
        let mut table = SlotTable::new(2);
        table.insert(5, "a", 1);
        let live = table.insert(10, "live", 3);
        assert_eq!(live.index(), 1);

        // Expire slot 0, then reuse it for the same fingerprint with no uses.
        assert!(table.lookup(5).is_some());
        let dead = table.insert(10, "dead", 0);
        assert_eq!(dead.index(), 0);

        assert_eq!(table.lookup(10), None);
        assert_eq!(table.remaining_uses(1), 3);

        table.cleanup_expired();
        assert_eq!(table.lookup(10), Some(live));
    }

    #[test]
    fn test_select_victim() {
        let mut table = SlotTable::new(3);
        assert_eq!(table.select_victim(), 0);

        table.insert(1, (), 5);
        table.insert(2, (), 3);
        table.insert(3, (), 4);
        assert_eq!(table.select_victim(), 1);

        table.lookup(3);
        table.lookup(3);
        assert_eq!(table.remaining_uses(2), 2);
        assert_eq!(table.select_victim(), 2);
    }

    #[test]
    fn test_select_victim_is_minimal() {
        let mut table = SlotTable::new(5);
        for (fp, ttl) in [(1, 7), (2, 3), (3, 9), (4, 3), (5, 6)] {
            table.insert(fp, (), ttl);
        }
        let victim = table.select_victim();
        assert_eq!(victim, 1);
        for i in 0..table.capacity() {
            assert!(table.remaining_uses(victim) <= table.remaining_uses(i));
        }
    }

    #[test]
    fn test_insert_leaves_other_slots_alone() {
        let mut table = SlotTable::new(3);
        table.insert(1, "a", 2);
        table.insert(2, "b", 1);
        table.insert(3, "c", 2);

        table.insert(4, "d", 2);
        assert_eq!(table.fingerprint_at(0), Some(1));
        assert_eq!(table.value_at(0), Some(&"a"));
        assert_eq!(table.fingerprint_at(1), Some(4));
        assert_eq!(table.value_at(1), Some(&"d"));
        assert_eq!(table.fingerprint_at(2), Some(3));
        assert_eq!(table.value_at(2), Some(&"c"));
        assert_eq!(table.evictions(), 1);
    }

    #[test]
    fn test_cleanup_expired() {
        let mut table = SlotTable::new(3);
        table.insert(1, "a", 1);
        table.insert(2, "b", 2);
        table.lookup(1);

        assert_eq!(table.cleanup_expired(), 1);
        assert!(!table.is_occupied(0));
        assert!(table.is_occupied(1));
        assert_eq!(table.lookup(1), None);
        assert_eq!(table.cleanup_expired(), 0);
    }

    #[test]
    fn test_zero_ttl_is_expired_immediately() {
        let mut table = SlotTable::new(2);
        table.insert(1, "a", 0);
        assert!(table.is_occupied(0));
        assert_eq!(table.lookup(1), None);
    }

    #[test]
    fn test_stale_handle() {
        let mut table = SlotTable::new(1);
        let h1 = table.insert(1, 10, 2);
        assert_eq!(table.get(h1), Ok(&10));
        *table.get_mut(h1).unwrap() += 1;
        assert_eq!(table.get(h1), Ok(&11));

        let h2 = table.insert(2, 20, 2);
        assert_eq!(h1.index(), h2.index());
        assert_ne!(h1.generation(), h2.generation());
        assert!(!table.is_valid(h1));
        assert_eq!(
            table.get(h1),
            Err(CacheError::StaleHandle {
                index: 0,
                generation: h1.generation()
            })
        );
        assert!(table.get_mut(h1).is_err());
        assert_eq!(table.get(h2), Ok(&20));
    }

    #[test]
    fn test_handle_stale_after_cleanup() {
        let mut table = SlotTable::new(2);
        let h = table.insert(1, "a", 0);
        assert!(table.is_valid(h));
        table.cleanup_expired();
        assert!(matches!(table.get(h), Err(CacheError::StaleHandle { .. })));
    }

    #[test]
    fn test_clear() {
        let mut table = SlotTable::new(2);
        let h = table.insert(1, "a", 3);
        table.insert(2, "b", 3);
        assert!(table.lookup(1).is_some());

        table.clear();
        assert!(table.is_empty());
        assert_eq!(table.capacity(), 2);
        assert!(!table.is_valid(h));
        assert_eq!(table.lookup(1), None);
        assert_eq!(table.lookup(2), None);
    }

    #[test]
    #[should_panic(expected = "capacity should be positive")]
    fn test_zero_capacity() {
        SlotTable::<()>::new(0);
    }
}
