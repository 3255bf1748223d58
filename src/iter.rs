//! Iterators for [`AhoCorasickDoubleArrayTrie`].

use std::iter::Enumerate;

use crate::utils::fold_code_unit;
use crate::{AhoCorasickDoubleArrayTrie, Hit};

/// Iterator created by [`AhoCorasickDoubleArrayTrie::hit_iter()`] and
/// [`AhoCorasickDoubleArrayTrie::hit_iter_from_iter()`].
///
/// Yields every overlapping occurrence of every keyword: hits come out in
/// non-decreasing end position, and hits sharing an end position follow the
/// output order of the accepting state.
pub struct HitIterator<'a, V, U> {
    pub(crate) pma: &'a AhoCorasickDoubleArrayTrie<V>,
    pub(crate) haystack: Enumerate<U>,
    pub(crate) state_id: usize,
    /// Outputs of the last accepting state, drained across `next` calls.
    pub(crate) outputs: &'a [i32],
    pub(crate) output_pos: usize,
    pub(crate) end: usize,
}

impl<'a, V, U> HitIterator<'a, V, U>
where
    U: Iterator<Item = u16>,
{
    pub(crate) fn new(pma: &'a AhoCorasickDoubleArrayTrie<V>, haystack: U) -> Self {
        Self {
            pma,
            haystack: haystack.enumerate(),
            state_id: crate::ROOT_SLOT,
            outputs: &[],
            output_pos: 0,
            end: 0,
        }
    }
}

impl<'a, V, U> Iterator for HitIterator<'a, V, U>
where
    U: Iterator<Item = u16>,
{
    type Item = Hit<'a, V>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        if let Some(&index) = self.outputs.get(self.output_pos) {
            self.output_pos += 1;
            return Some(self.pma.hit_at(index, self.end));
        }
        if self.pma.l.is_empty() {
            // An empty dictionary has no meaningful transitions to follow.
            return None;
        }
        for (pos, c) in self.haystack.by_ref() {
            let c = if self.pma.ignore_case {
                fold_code_unit(c)
            } else {
                c
            };
            self.state_id = self.pma.next_state(self.state_id, c);
            if let Some(outputs) = self
                .pma
                .output
                .get(self.state_id)
                .and_then(|entry| entry.as_deref())
            {
                self.outputs = outputs;
                self.output_pos = 1;
                self.end = pos + 1;
                return Some(self.pma.hit_at(outputs[0], self.end));
            }
        }
        None
    }
}
