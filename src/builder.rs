//! Builder of [`AhoCorasickDoubleArrayTrie`].

use std::collections::VecDeque;

use crate::errors::{AcdatError, Result};
use crate::trie::{Sibling, Trie, ROOT_STATE_ID};
use crate::utils::fold_code_unit;
use crate::{AhoCorasickDoubleArrayTrie, ROOT_SLOT};

// The initial capacity of the double array.
const INIT_CAPACITY: usize = 1 << 16;
// The capacity ceiling, 95% of i32::MAX.
const MAX_CAPACITY: usize = 2_040_109_464;
// Trailing cells appended after packing so the scanner can probe one
// transition past the last occupied slot without leaving the arrays.
const SCAN_HEADROOM: usize = 65535;
// Occupancy ratio above which a searched region is skipped for good.
const DENSITY_THRESHOLD: f64 = 0.95;

/// Builder of [`AhoCorasickDoubleArrayTrie`].
///
/// # Examples
///
/// ```
/// use acdat::AhoCorasickDoubleArrayTrieBuilder;
///
/// let patvals = vec![("IT", 0), ("Dolor", 1)];
/// let pma = AhoCorasickDoubleArrayTrieBuilder::new()
///     .ignore_case(true)
///     .build(patvals)
///     .unwrap();
///
/// assert_eq!(pma.exact_match_search("dolor"), Some(1));
/// ```
pub struct AhoCorasickDoubleArrayTrieBuilder {
    base: Vec<i32>,
    check: Vec<i32>,
    used: Vec<bool>,
    size: usize,
    next_check_pos: usize,
    progress: usize,
    key_count: usize,
    ignore_case: bool,
}

impl Default for AhoCorasickDoubleArrayTrieBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AhoCorasickDoubleArrayTrieBuilder {
    /// Creates a new [`AhoCorasickDoubleArrayTrieBuilder`].
    pub fn new() -> Self {
        Self {
            base: vec![],
            check: vec![],
            used: vec![],
            size: 0,
            next_check_pos: 0,
            progress: 0,
            key_count: 0,
            ignore_case: false,
        }
    }

    /// Specifies whether matching folds case.
    ///
    /// When enabled, keywords are folded during construction and input code
    /// units are folded during scanning: ASCII letters through the fast path,
    /// anything else through the single-code-unit lowercase mapping.
    #[must_use]
    pub fn ignore_case(mut self, yes: bool) -> Self {
        self.ignore_case = yes;
        self
    }

    /// Builds and returns a new [`AhoCorasickDoubleArrayTrie`] from keyword-value pairs.
    ///
    /// Keyword `i` in iteration order gets index `i`; duplicate keywords keep
    /// every index they were given. An empty collection is legal and yields
    /// an automaton that reports nothing.
    ///
    /// # Errors
    ///
    /// [`AcdatError`] is returned when the keyword set or the packed automaton
    /// exceeds the representable scale.
    pub fn build<I, K, V>(mut self, patvals: I) -> Result<AhoCorasickDoubleArrayTrie<V>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        let mut trie = Trie::new();
        let mut lengths = vec![];
        let mut values = vec![];
        for (key, value) in patvals {
            let mut units: Vec<u16> = key.as_ref().encode_utf16().collect();
            if self.ignore_case {
                for unit in &mut units {
                    *unit = fold_code_unit(*unit);
                }
            }
            let index = u32::try_from(lengths.len())
                .ok()
                .filter(|&i| i < i32::MAX as u32)
                .ok_or_else(|| {
                    AcdatError::pattern_scale("keyword indices must be smaller than 2^31 - 1")
                })?;
            let len = i32::try_from(units.len()).map_err(|_| {
                AcdatError::pattern_scale("keyword lengths must be smaller than 2^31")
            })?;
            trie.add(&units, index)?;
            lengths.push(len);
            values.push(value);
        }
        self.key_count = lengths.len();

        self.init_arrays();
        if !lengths.is_empty() {
            self.pack(&mut trie)?;
        }
        let (fail, output) = self.compile_fails(&trie);

        // Lose weight: trim to the logical size plus scan headroom.
        self.base.resize(self.size + SCAN_HEADROOM, 0);
        self.check.resize(self.size + SCAN_HEADROOM, 0);
        self.base.shrink_to_fit();
        self.check.shrink_to_fit();

        Ok(AhoCorasickDoubleArrayTrie {
            base: self.base,
            check: self.check,
            fail,
            output,
            l: lengths,
            v: Some(values),
            size: self.size,
            ignore_case: self.ignore_case,
        })
    }

    fn init_arrays(&mut self) {
        self.base = vec![0; INIT_CAPACITY];
        self.check = vec![0; INIT_CAPACITY];
        self.used = vec![false; INIT_CAPACITY];
        self.size = 0;
        self.next_check_pos = 0;
        self.progress = 0;
    }

    /// Maps every trie state to a slot, breadth first over sibling groups.
    fn pack(&mut self, trie: &mut Trie) -> Result<()> {
        let mut queue = VecDeque::new();
        queue.push_back((ROOT_SLOT, trie.siblings(ROOT_STATE_ID)));
        while let Some((parent_slot, siblings)) = queue.pop_front() {
            let begin = self.find_begin(&siblings)?;
            self.base[parent_slot] = begin as i32;

            for &(key, _) in &siblings {
                self.check[begin + key as usize] = begin as i32;
            }
            for &(key, ref sibling) in &siblings {
                let slot = begin + key as usize;
                match *sibling {
                    Sibling::Terminal(largest_emit) => {
                        self.base[slot] = -(largest_emit as i32) - 1;
                        self.progress += 1;
                    }
                    Sibling::Child(child_id) => {
                        trie.set_slot(child_id, slot as u32);
                        queue.push_back((slot, trie.siblings(child_id)));
                    }
                }
            }

            let last_key = siblings[siblings.len() - 1].0 as usize;
            self.size = self.size.max(begin + last_key + 1);
        }
        Ok(())
    }

    /// Searches a `begin` value placing every sibling in a vacant slot.
    fn find_begin(&mut self, siblings: &[(u32, Sibling)]) -> Result<usize> {
        let first_key = siblings[0].0 as usize;
        let last_key = siblings[siblings.len() - 1].0 as usize;

        let mut pos = (first_key + 1).max(self.next_check_pos) - 1;
        let mut nonzero = 0usize;
        let mut first_vacant = true;
        let begin = 'search: loop {
            pos += 1;
            if pos >= self.check.len() {
                self.grow_to(pos + 1)?;
            }
            if self.check[pos] != 0 {
                nonzero += 1;
                continue;
            }
            if first_vacant {
                self.next_check_pos = pos;
                first_vacant = false;
            }

            let begin = pos - first_key;
            if begin + last_key >= self.check.len() {
                let factor =
                    (self.key_count as f64 / (self.progress as f64 + 1.0)).max(1.05);
                let target = ((self.check.len() as f64 * factor) as usize)
                    .max(begin + last_key + 1);
                self.grow_to(target)?;
            }
            if self.used[begin] {
                continue;
            }
            for &(key, _) in &siblings[1..] {
                if self.check[begin + key as usize] != 0 {
                    continue 'search;
                }
            }
            break begin;
        };

        // Skip regions that have become too dense to be worth rescanning.
        let searched = pos - self.next_check_pos + 1;
        if nonzero as f64 / searched as f64 >= DENSITY_THRESHOLD {
            self.next_check_pos = pos;
        }
        self.used[begin] = true;
        Ok(begin)
    }

    fn grow_to(&mut self, new_capacity: usize) -> Result<()> {
        if new_capacity > MAX_CAPACITY {
            return Err(AcdatError::automaton_scale(format!(
                "the double array cannot grow beyond {MAX_CAPACITY} cells"
            )));
        }
        self.base.resize(new_capacity, 0);
        self.check.resize(new_capacity, 0);
        self.used.resize(new_capacity, false);
        Ok(())
    }

    /// Computes `fail` and `output` breadth first over the packed slots.
    ///
    /// A state's output is its own emits followed by the output inherited
    /// through its failure target, so a single lookup per scanned position
    /// yields every keyword ending there.
    fn compile_fails(&self, trie: &Trie) -> (Vec<i32>, Vec<Option<Vec<i32>>>) {
        let mut fail = vec![0i32; self.size + 1];
        let mut output: Vec<Option<Vec<i32>>> = vec![None; self.size + 1];

        let mut queue = VecDeque::new();
        for &child_id in trie.state(ROOT_STATE_ID).edges.values() {
            let child = trie.state(child_id);
            let slot = child.slot as usize;
            fail[slot] = ROOT_SLOT as i32;
            if !child.emits.is_empty() {
                output[slot] = Some(child.emits.iter().map(|&e| e as i32).collect());
            }
            queue.push_back(child_id);
        }

        while let Some(state_id) = queue.pop_front() {
            let state = trie.state(state_id);
            let slot = state.slot as usize;
            for (&c, &child_id) in &state.edges {
                let child = trie.state(child_id);
                let child_slot = child.slot as usize;

                let mut fail_slot = usize::try_from(fail[slot]).unwrap_or(ROOT_SLOT);
                let fail_target = loop {
                    if let Some(next) = self.transition_with_root(fail_slot, c) {
                        break next;
                    }
                    fail_slot = usize::try_from(fail[fail_slot]).unwrap_or(ROOT_SLOT);
                };
                fail[child_slot] = fail_target as i32;

                let mut emits: Vec<i32> = child.emits.iter().map(|&e| e as i32).collect();
                if let Some(inherited) = &output[fail_target] {
                    emits.extend_from_slice(inherited);
                }
                if !emits.is_empty() {
                    output[child_slot] = Some(emits);
                }
                queue.push_back(child_id);
            }
        }
        (fail, output)
    }

    /// Packed transition, with the root absorbing undefined moves.
    fn transition_with_root(&self, slot: usize, c: u16) -> Option<usize> {
        let b = self.base[slot];
        if b >= 0 {
            let p = b as usize + usize::from(c) + 1;
            if self.check.get(p).copied() == Some(b) {
                return Some(p);
            }
        }
        (slot == ROOT_SLOT).then_some(ROOT_SLOT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(keys: &[&str]) -> AhoCorasickDoubleArrayTrie<u32> {
        AhoCorasickDoubleArrayTrieBuilder::new()
            .build(keys.iter().enumerate().map(|(i, &k)| (k, i as u32)))
            .unwrap()
    }

    /// Walks a keyword through `base`/`check` asserting the double-array
    /// identity on every stored transition.
    fn walk_checked(pma: &AhoCorasickDoubleArrayTrie<u32>, key: &str) -> usize {
        let mut b = pma.base[ROOT_SLOT];
        for c in key.encode_utf16() {
            let p = b as usize + usize::from(c) + 1;
            assert_eq!(pma.check[p], b, "broken transition in {key:?}");
            b = pma.base[p];
        }
        let p = b as usize;
        assert_eq!(pma.check[p], b);
        assert!(pma.base[p] < 0, "missing terminal marker for {key:?}");
        (-pma.base[p] - 1) as usize
    }

    #[test]
    fn test_dat_identity_along_keyword_paths() {
        let keys = ["he", "hers", "his", "she"];
        let pma = build(&keys);
        for (i, key) in keys.iter().enumerate() {
            assert_eq!(walk_checked(&pma, key), i);
        }
    }

    #[test]
    fn test_root_base_positive() {
        let pma = build(&["a"]);
        assert!(pma.base[ROOT_SLOT] >= 1);
    }

    #[test]
    fn test_terminal_marker_keeps_largest_duplicate() {
        let pma = AhoCorasickDoubleArrayTrieBuilder::new()
            .build(vec![("dup", 0u32), ("dup", 1u32), ("other", 2u32)])
            .unwrap();
        assert_eq!(walk_checked(&pma, "dup"), 1);
        assert_eq!(walk_checked(&pma, "other"), 2);
    }

    #[test]
    fn test_depth_one_fails_to_root() {
        let pma = build(&["ab", "ba"]);
        let b = pma.base[ROOT_SLOT];
        for c in [u16::from(b'a'), u16::from(b'b')] {
            let slot = b as usize + usize::from(c) + 1;
            assert_eq!(pma.check[slot], b);
            assert_eq!(pma.fail[slot], ROOT_SLOT as i32);
        }
    }

    #[test]
    fn test_fail_targets_within_size() {
        let pma = build(&["he", "she", "his", "hers", "sherlock"]);
        for &f in &pma.fail {
            assert!(f >= 0);
            assert!((f as usize) < pma.size.max(1));
        }
    }

    #[test]
    fn test_output_union_through_failures() {
        // Entering the "she" terminal must also report "he".
        let keys = ["he", "she"];
        let pma = build(&keys);
        let hits = pma.parse_text("she");
        let indices: Vec<_> = hits.iter().map(|h| h.index()).collect();
        assert_eq!(indices, vec![1, 0]);
    }

    #[test]
    fn test_packed_arrays_are_deterministic() {
        let keys = ["one", "two", "three", "four", "five"];
        let a = build(&keys);
        let b = build(&keys);
        assert_eq!(a.base, b.base);
        assert_eq!(a.check, b.check);
        assert_eq!(a.fail, b.fail);
        assert_eq!(a.output, b.output);
        assert_eq!(a.size, b.size);
    }

    #[test]
    fn test_empty_dictionary() {
        let pma = AhoCorasickDoubleArrayTrieBuilder::new()
            .build(Vec::<(&str, u32)>::new())
            .unwrap();
        assert_eq!(pma.size, 0);
        assert_eq!(pma.num_keywords(), 0);
        assert!(pma.parse_text("anything").is_empty());
    }

    #[test]
    fn test_growth_beyond_initial_capacity() {
        // Enough pseudo-random keys to overflow the initial 2^16 cells.
        let keys: std::collections::BTreeSet<String> = (0u64..12_000)
            .map(|i| format!("{:08x}", i.wrapping_mul(0x9E37_79B9_7F4A_7C15)))
            .collect();
        let patvals: Vec<(String, u32)> = keys
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k, i as u32))
            .collect();
        let expected: Vec<(String, u32)> = patvals.clone();
        let pma = AhoCorasickDoubleArrayTrieBuilder::new()
            .build(patvals)
            .unwrap();
        assert!(pma.size > INIT_CAPACITY);
        for (key, val) in &expected {
            assert_eq!(pma.exact_match_search(key), Some(*val as usize));
        }
    }
}
