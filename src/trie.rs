//! Transient keyword trie built before double-array packing.

use std::collections::BTreeMap;

use crate::errors::{AcdatError, Result};

/// The root state id.
pub(crate) const ROOT_STATE_ID: u32 = 0;

/// Sentinel for a state that has not been packed yet.
pub(crate) const SLOT_UNASSIGNED: u32 = u32::MAX;

/// State of the transient trie.
///
/// Edges are kept in a `BTreeMap` so that sibling enumeration is ordered by
/// code unit; packing must be deterministic for byte-identical round trips.
pub(crate) struct TrieState {
    pub(crate) edges: BTreeMap<u16, u32>,
    /// Keyword indices accepted at this state, ascending.
    pub(crate) emits: Vec<u32>,
    /// Slot in the packed arrays, assigned during packing.
    pub(crate) slot: u32,
}

impl TrieState {
    fn new() -> Self {
        Self {
            edges: BTreeMap::new(),
            emits: vec![],
            slot: SLOT_UNASSIGNED,
        }
    }
}

/// One entry of a sibling group handed to the packer.
///
/// A `Terminal` is the synthetic leaf prepended at key 0 for an accepting
/// parent; it carries the largest keyword index accepted there and becomes
/// the slot whose negative `base` marks the keyword end.
pub(crate) enum Sibling {
    Terminal(u32),
    Child(u32),
}

/// Arena of trie states.
pub(crate) struct Trie {
    states: Vec<TrieState>,
}

impl Trie {
    pub(crate) fn new() -> Self {
        Self {
            states: vec![TrieState::new()],
        }
    }

    /// Adds a keyword, descending from the root and creating states on demand.
    pub(crate) fn add(&mut self, units: &[u16], index: u32) -> Result<()> {
        let mut state_id = ROOT_STATE_ID;
        for &c in units {
            if let Some(&next_state_id) = self.state(state_id).edges.get(&c) {
                state_id = next_state_id;
            } else if let Ok(next_state_id) = u32::try_from(self.states.len()) {
                self.state_mut(state_id).edges.insert(c, next_state_id);
                self.states.push(TrieState::new());
                state_id = next_state_id;
            } else {
                return Err(AcdatError::automaton_scale(
                    "a trie state id must be representable with u32",
                ));
            }
        }
        // Indices arrive ascending, so the last element stays the largest.
        self.state_mut(state_id).emits.push(index);
        Ok(())
    }

    /// Enumerates the sibling group below `state_id`, keys already shifted by
    /// one so that 0 is free for the terminal marker.
    pub(crate) fn siblings(&self, state_id: u32) -> Vec<(u32, Sibling)> {
        let state = self.state(state_id);
        let mut siblings = Vec::with_capacity(state.edges.len() + 1);
        if let Some(&largest) = state.emits.last() {
            siblings.push((0, Sibling::Terminal(largest)));
        }
        for (&c, &child_id) in &state.edges {
            siblings.push((u32::from(c) + 1, Sibling::Child(child_id)));
        }
        siblings
    }

    #[inline]
    pub(crate) fn state(&self, state_id: u32) -> &TrieState {
        &self.states[state_id as usize]
    }

    #[inline]
    pub(crate) fn state_mut(&mut self, state_id: u32) -> &mut TrieState {
        &mut self.states[state_id as usize]
    }

    pub(crate) fn set_slot(&mut self, state_id: u32, slot: u32) {
        self.state_mut(state_id).slot = slot;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_shares_prefixes() {
        let mut trie = Trie::new();
        trie.add(&[104, 101], 0).unwrap(); // "he"
        trie.add(&[104, 101, 114], 1).unwrap(); // "her"
        trie.add(&[104, 105], 2).unwrap(); // "hi"
        // root -> h -> {e -> r, i}
        assert_eq!(trie.states.len(), 5);
        let h = trie.state(ROOT_STATE_ID).edges[&104];
        assert_eq!(trie.state(h).edges.len(), 2);
    }

    #[test]
    fn test_duplicate_keys_accumulate_emits() {
        let mut trie = Trie::new();
        trie.add(&[97], 0).unwrap();
        trie.add(&[97], 1).unwrap();
        let a = trie.state(ROOT_STATE_ID).edges[&97];
        assert_eq!(trie.state(a).emits, vec![0, 1]);
    }

    #[test]
    fn test_sibling_order_and_terminal_marker() {
        let mut trie = Trie::new();
        trie.add(&[98], 0).unwrap();
        trie.add(&[97], 1).unwrap();
        trie.add(&[], 2).unwrap();
        let siblings = trie.siblings(ROOT_STATE_ID);
        assert_eq!(siblings.len(), 3);
        assert!(matches!(siblings[0], (0, Sibling::Terminal(2))));
        // Shifted keys follow code-unit order regardless of insertion order.
        assert!(matches!(siblings[1], (98, Sibling::Child(_))));
        assert!(matches!(siblings[2], (99, Sibling::Child(_))));
    }
}
