//! # acdat: Aho-Corasick over a Double-Array Trie
//!
//! A multi-pattern searcher: feed it a dictionary of keywords with associated
//! values and it scans text in a single linear pass, reporting every
//! overlapping occurrence. The compiled automaton doubles as a perfect hash
//! over the dictionary and can be persisted to a compact binary stream.
//!
//! Matching operates on UTF-16 code units, so all reported positions are in
//! code units, not bytes; surrogate pairs match as unit sequences.
//!
//! ## Examples
//!
//! ```
//! use acdat::AhoCorasickDoubleArrayTrie;
//!
//! let patvals = vec![("he", 0), ("she", 1), ("hers", 2)];
//! let pma = AhoCorasickDoubleArrayTrie::new(patvals).unwrap();
//!
//! let mut it = pma.hit_iter("ushers");
//!
//! let h = it.next().unwrap();
//! assert_eq!((1, 4, Some(&1)), (h.start(), h.end(), h.value()));
//!
//! let h = it.next().unwrap();
//! assert_eq!((2, 4, Some(&0)), (h.start(), h.end(), h.value()));
//!
//! let h = it.next().unwrap();
//! assert_eq!((2, 6, Some(&2)), (h.start(), h.end(), h.value()));
//!
//! assert_eq!(None, it.next());
//! ```

mod builder;
pub mod errors;
pub mod iter;
mod serializer;
mod trie;
mod utils;

use std::io;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use builder::AhoCorasickDoubleArrayTrieBuilder;
use errors::{AcdatError, Result};
use iter::HitIterator;
pub use serializer::SerializableValue;
use serializer::{read_i32_array, read_string, read_varint, write_i32_array, write_string, write_varint};
use utils::fold_code_unit;

// The slot of the root state.
pub(crate) const ROOT_SLOT: usize = 0;

/// A reported match.
///
/// Positions are in UTF-16 code units; `start` is inclusive, `end` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Hit<'a, V> {
    length: usize,
    end: usize,
    index: usize,
    value: Option<&'a V>,
}

impl<'a, V> Hit<'a, V> {
    /// Starting position of the match.
    #[inline]
    pub const fn start(&self) -> usize {
        self.end - self.length
    }

    /// Ending position of the match.
    #[inline]
    pub const fn end(&self) -> usize {
        self.end
    }

    /// Length of the matched keyword in code units.
    #[inline]
    pub const fn length(&self) -> usize {
        self.length
    }

    /// Index of the matched keyword in dictionary order.
    #[inline]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Value associated with the matched keyword, or `None` when the
    /// automaton was loaded without values.
    #[inline]
    pub const fn value(&self) -> Option<&'a V> {
        self.value
    }
}

/// Multi-pattern searcher implemented with the Aho-Corasick algorithm over a
/// double-array trie.
///
/// Construction assigns each keyword the index of its position in the input
/// iteration order and records its associated value. A built (or loaded)
/// automaton is immutable, so shared references may scan from any number of
/// threads.
///
/// # Examples
///
/// ```
/// use acdat::AhoCorasickDoubleArrayTrie;
///
/// let patvals = vec![("space", 100), ("craft", 200)];
/// let pma = AhoCorasickDoubleArrayTrie::new(patvals).unwrap();
///
/// let hits = pma.parse_text("spacecraft");
/// assert_eq!(hits.len(), 2);
/// assert_eq!(hits[0].value(), Some(&100));
/// assert_eq!(hits[1].value(), Some(&200));
///
/// assert_eq!(pma.exact_match_search("craft"), Some(1));
/// assert_eq!(pma.get("craft"), Some(&200));
/// ```
#[derive(Clone)]
pub struct AhoCorasickDoubleArrayTrie<V> {
    pub(crate) base: Vec<i32>,
    pub(crate) check: Vec<i32>,
    pub(crate) fail: Vec<i32>,
    pub(crate) output: Vec<Option<Vec<i32>>>,
    /// Keyword lengths in code units, by keyword index.
    pub(crate) l: Vec<i32>,
    /// Keyword values, absent after a values-less load.
    pub(crate) v: Option<Vec<V>>,
    pub(crate) size: usize,
    pub(crate) ignore_case: bool,
}

impl<V> AhoCorasickDoubleArrayTrie<V> {
    /// Creates a new [`AhoCorasickDoubleArrayTrie`] from keyword-value pairs.
    ///
    /// Keyword `i` in iteration order gets index `i`; duplicates keep every
    /// index. The empty collection is legal and matches nothing.
    ///
    /// # Errors
    ///
    /// [`AcdatError`] is returned when the keyword set or the packed
    /// automaton exceeds the representable scale.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("a", 0), ("ab", 1)]).unwrap();
    /// assert_eq!(pma.num_keywords(), 2);
    /// ```
    pub fn new<I, K>(patvals: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
    {
        AhoCorasickDoubleArrayTrieBuilder::new().build(patvals)
    }

    /// Returns the number of keywords in the dictionary.
    #[inline]
    pub fn num_keywords(&self) -> usize {
        self.l.len()
    }

    /// Checks whether the dictionary is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.l.is_empty()
    }

    /// Checks whether matching folds case.
    #[inline]
    pub const fn ignore_case(&self) -> bool {
        self.ignore_case
    }

    /// Returns an iterator of all overlapping matches in the haystack.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("ab", 0), ("b", 1)]).unwrap();
    /// let ends: Vec<_> = pma.hit_iter("ab").map(|h| h.end()).collect();
    /// assert_eq!(ends, vec![2, 2]);
    /// ```
    pub fn hit_iter<'s, 'h>(
        &'s self,
        haystack: &'h str,
    ) -> HitIterator<'s, V, std::str::EncodeUtf16<'h>> {
        HitIterator::new(self, haystack.encode_utf16())
    }

    /// Returns an iterator of all overlapping matches in the given code-unit
    /// iterator.
    pub fn hit_iter_from_iter<U>(&self, haystack: U) -> HitIterator<'_, V, U>
    where
        U: Iterator<Item = u16>,
    {
        HitIterator::new(self, haystack)
    }

    /// Collects every overlapping match in the haystack.
    ///
    /// Hits are ordered by non-decreasing end position; hits sharing an end
    /// position follow the output order of the accepting state.
    pub fn parse_text(&self, haystack: &str) -> Vec<Hit<'_, V>> {
        self.hit_iter(haystack).collect()
    }

    /// Feeds every overlapping match in the haystack to `predicate`,
    /// stopping as soon as it returns `false`.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("foo", 0), ("bar", 1)]).unwrap();
    /// let mut count = 0;
    /// pma.parse_text_with("foobar", |_| {
    ///     count += 1;
    ///     true
    /// });
    /// assert_eq!(count, 2);
    /// ```
    pub fn parse_text_with<F>(&self, haystack: &str, mut predicate: F)
    where
        F: FnMut(&Hit<'_, V>) -> bool,
    {
        for hit in self.hit_iter(haystack) {
            if !predicate(&hit) {
                break;
            }
        }
    }

    /// Collects every overlapping match in a code-unit slice.
    ///
    /// Positions are relative to the start of the slice, so scanning a
    /// subslice searches a window of a larger buffer.
    pub fn parse_units(&self, haystack: &[u16]) -> Vec<Hit<'_, V>> {
        self.hit_iter_from_iter(haystack.iter().copied()).collect()
    }

    /// Feeds every overlapping match in a code-unit slice to `predicate`,
    /// stopping as soon as it returns `false`.
    pub fn parse_units_with<F>(&self, haystack: &[u16], mut predicate: F)
    where
        F: FnMut(&Hit<'_, V>) -> bool,
    {
        for hit in self.hit_iter_from_iter(haystack.iter().copied()) {
            if !predicate(&hit) {
                break;
            }
        }
    }

    /// Checks whether the haystack contains any keyword.
    ///
    /// The scan stops at the first accepting state, so a hit near the start
    /// of a long text returns quickly.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("ch", 0), ("space", 1)]).unwrap();
    /// assert!(pma.matches("  ch"));
    /// assert!(!pma.matches("spac"));
    /// ```
    pub fn matches(&self, haystack: &str) -> bool {
        self.hit_iter(haystack).next().is_some()
    }

    /// Returns the first match in the haystack, or `None`.
    pub fn find_first(&self, haystack: &str) -> Option<Hit<'_, V>> {
        self.hit_iter(haystack).next()
    }

    /// Looks up a key exactly, returning its keyword index.
    ///
    /// The double array is a perfect hash over the dictionary: the walk
    /// either ends at the key's terminal marker or proves absence. When the
    /// same key was inserted more than once, the largest of its indices is
    /// returned.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("his", 0), ("hers", 1)]).unwrap();
    /// assert_eq!(pma.exact_match_search("hers"), Some(1));
    /// assert_eq!(pma.exact_match_search("her"), None);
    /// ```
    pub fn exact_match_search(&self, key: &str) -> Option<usize> {
        let mut b = self.base.get(ROOT_SLOT).copied().unwrap_or(0);
        for c in key.encode_utf16() {
            let c = if self.ignore_case { fold_code_unit(c) } else { c };
            if b < 0 {
                return None;
            }
            let p = b as usize + usize::from(c) + 1;
            if self.check.get(p).copied() != Some(b) {
                return None;
            }
            b = self.base.get(p).copied().unwrap_or(0);
        }
        if b < 0 {
            return None;
        }
        let p = b as usize;
        let n = self.base.get(p).copied().unwrap_or(0);
        if self.check.get(p).copied() == Some(b) && n < 0 {
            Some((-n - 1) as usize)
        } else {
            None
        }
    }

    /// Looks up a key exactly, returning its associated value.
    ///
    /// Returns `None` when the key is absent or values were not loaded.
    pub fn get(&self, key: &str) -> Option<&V> {
        let index = self.exact_match_search(key)?;
        self.v.as_ref().and_then(|v| v.get(index))
    }

    /// Follows transitions from `state_id` on `c`, chasing failure links
    /// until one is defined; the root absorbs everything, so this always
    /// lands on a valid state.
    #[inline]
    pub(crate) fn next_state(&self, mut state_id: usize, c: u16) -> usize {
        loop {
            if let Some(next) = self.transition_with_root(state_id, c) {
                return next;
            }
            state_id = self
                .fail
                .get(state_id)
                .and_then(|&f| usize::try_from(f).ok())
                .unwrap_or(ROOT_SLOT);
        }
    }

    #[inline]
    pub(crate) fn transition_with_root(&self, state_id: usize, c: u16) -> Option<usize> {
        let b = self.base.get(state_id).copied().unwrap_or(0);
        if b >= 0 {
            let p = b as usize + usize::from(c) + 1;
            if self.check.get(p).copied() == Some(b) {
                return Some(p);
            }
        }
        (state_id == ROOT_SLOT).then_some(ROOT_SLOT)
    }

    #[inline]
    pub(crate) fn hit_at(&self, index: i32, end: usize) -> Hit<'_, V> {
        let index = index as usize;
        let length = self.l.get(index).map_or(0, |&len| len as usize);
        Hit {
            length,
            end,
            index,
            value: self.v.as_ref().and_then(|v| v.get(index)),
        }
    }
}

impl<V> AhoCorasickDoubleArrayTrie<V>
where
    V: SerializableValue,
{
    /// Serializes the automaton into the writer.
    ///
    /// With `save_values` the keyword values are appended to the stream;
    /// without, the structural arrays alone are written and a later load
    /// leaves values absent (or rebuilds them through
    /// [`load_with`](Self::load_with)).
    ///
    /// # Errors
    ///
    /// `std::io::Error` is returned if it fails to write the data, or when
    /// `save_values` is requested on an automaton whose values are absent.
    ///
    /// # Examples
    ///
    /// ```
    /// use acdat::AhoCorasickDoubleArrayTrie;
    ///
    /// let pma = AhoCorasickDoubleArrayTrie::new(vec![("a", 1u32)]).unwrap();
    /// let mut buffer = vec![];
    /// pma.save(&mut buffer, true).unwrap();
    ///
    /// let other: AhoCorasickDoubleArrayTrie<u32> =
    ///     AhoCorasickDoubleArrayTrie::load(&buffer[..]).unwrap();
    /// assert_eq!(other.get("a"), Some(&1));
    /// ```
    pub fn save<W>(&self, mut wtr: W, save_values: bool) -> io::Result<()>
    where
        W: io::Write,
    {
        wtr.write_u8(3)?;
        write_string(&mut wtr, "saveValues")?;
        wtr.write_u8(u8::from(save_values))?;
        write_string(&mut wtr, "size")?;
        wtr.write_i32::<LittleEndian>(self.size as i32)?;
        write_string(&mut wtr, "ignoreCase")?;
        wtr.write_u8(u8::from(self.ignore_case))?;

        write_i32_array(&mut wtr, Some(&self.l))?;
        write_i32_array(&mut wtr, Some(&self.base))?;
        write_i32_array(&mut wtr, Some(&self.check))?;
        write_i32_array(&mut wtr, Some(&self.fail))?;
        write_varint(&mut wtr, self.output.len() as i32)?;
        for entry in &self.output {
            write_i32_array(&mut wtr, entry.as_deref())?;
        }

        if save_values {
            let values = self.v.as_ref().ok_or_else(|| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "cannot save values of an automaton loaded without them",
                )
            })?;
            write_varint(&mut wtr, values.len() as i32)?;
            wtr.write_u8(V::TYPE_CODE)?;
            for value in values {
                value.serialize(&mut wtr)?;
            }
        }
        Ok(())
    }

    /// Deserializes an automaton from the reader.
    ///
    /// Streams written with `save_values = false` load with values absent.
    ///
    /// # Errors
    ///
    /// [`AcdatError`] is returned when the stream is malformed or carries
    /// values of a different type.
    pub fn load<R>(mut rdr: R) -> Result<Self>
    where
        R: io::Read,
    {
        let (mut pma, save_values) = Self::load_structure(&mut rdr)?;
        if save_values {
            let count = read_varint(&mut rdr)?;
            let count = usize::try_from(count)
                .map_err(|_| AcdatError::corrupt_stream("negative value count"))?;
            if count != pma.l.len() {
                return Err(AcdatError::corrupt_stream(
                    "value count does not match the keyword count",
                ));
            }
            let type_code = rdr.read_u8()?;
            if type_code != V::TYPE_CODE {
                return Err(AcdatError::unsupported_value_type(V::TYPE_CODE, type_code));
            }
            let mut values = Vec::with_capacity(count.min(1 << 16));
            for _ in 0..count {
                values.push(V::deserialize(&mut rdr)?);
            }
            pma.v = Some(values);
        }
        Ok(pma)
    }
}

impl<V> AhoCorasickDoubleArrayTrie<V> {
    /// Deserializes an automaton from the reader, rebuilding values through
    /// `value_fn` instead of reading them from the stream.
    ///
    /// This is the loading path for streams written with
    /// `save_values = false`, and the only one available when `V` is not a
    /// primitive serializable type.
    ///
    /// # Errors
    ///
    /// [`AcdatError`] is returned when the stream is malformed.
    pub fn load_with<R, F>(mut rdr: R, value_fn: F) -> Result<Self>
    where
        R: io::Read,
        F: FnMut(usize) -> V,
    {
        let (mut pma, _) = Self::load_structure(&mut rdr)?;
        pma.v = Some((0..pma.l.len()).map(value_fn).collect());
        Ok(pma)
    }

    /// Reads everything up to (but not including) the value section.
    fn load_structure<R>(mut rdr: R) -> Result<(Self, bool)>
    where
        R: io::Read,
    {
        let mut save_values = true;
        let mut ignore_case = false;
        let mut size = 0i32;

        let prop_count = rdr.read_u8()?;
        for _ in 0..prop_count {
            let name = read_string(&mut rdr)?;
            match name.as_str() {
                "saveValues" => save_values = rdr.read_u8()? != 0,
                "size" => size = rdr.read_i32::<LittleEndian>()?,
                "ignoreCase" => ignore_case = rdr.read_u8()? != 0,
                // Unknown properties are flag-sized; skip their single byte.
                _ => {
                    rdr.read_u8()?;
                }
            }
        }

        let l = read_i32_array(&mut rdr)?.unwrap_or_default();
        let base = read_i32_array(&mut rdr)?.unwrap_or_default();
        let check = read_i32_array(&mut rdr)?.unwrap_or_default();
        let fail = read_i32_array(&mut rdr)?.unwrap_or_default();

        let outer_len = read_varint(&mut rdr)?;
        let outer_len = usize::try_from(outer_len)
            .map_err(|_| AcdatError::corrupt_stream("negative output table length"))?;
        let mut output = Vec::with_capacity(outer_len.min(1 << 16));
        for _ in 0..outer_len {
            // Normalize empty entries so scanning treats them as absent.
            output.push(read_i32_array(&mut rdr)?.filter(|entry| !entry.is_empty()));
        }

        let size = usize::try_from(size)
            .map_err(|_| AcdatError::corrupt_stream("negative automaton size"))?;
        let pma = Self {
            base,
            check,
            fail,
            output,
            l,
            v: None,
            size,
            ignore_case,
        };
        pma.validate()?;
        Ok((pma, save_values))
    }

    /// Structural sanity checks so a malformed stream is rejected here
    /// rather than misbehaving during scans.
    fn validate(&self) -> Result<()> {
        if self.size > self.base.len() || self.size > self.check.len() {
            return Err(AcdatError::corrupt_stream(
                "declared size exceeds the packed arrays",
            ));
        }
        if self.fail.len() < self.size || self.output.len() < self.size {
            return Err(AcdatError::corrupt_stream(
                "failure or output table shorter than the declared size",
            ));
        }
        let state_bound = self.size.max(1) as i32;
        for &f in &self.fail {
            if f < 0 || f >= state_bound {
                return Err(AcdatError::corrupt_stream("failure target out of range"));
            }
        }
        let index_bound = self.l.len() as i32;
        for entry in self.output.iter().flatten() {
            for &k in entry {
                if k < 0 || k >= index_bound {
                    return Err(AcdatError::corrupt_stream("output index out of range"));
                }
            }
        }
        for &len in &self.l {
            if len < 0 {
                return Err(AcdatError::corrupt_stream("negative keyword length"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overlapping_hits_share_end_position() {
        let pma = AhoCorasickDoubleArrayTrie::new(vec![("she", 0), ("he", 1)]).unwrap();
        let hits = pma.parse_text("she");
        assert_eq!(hits.len(), 2);
        assert_eq!((hits[0].start(), hits[0].end(), hits[0].index()), (0, 3, 0));
        assert_eq!((hits[1].start(), hits[1].end(), hits[1].index()), (1, 3, 1));
        assert_eq!(hits[0].length(), 3);
        assert_eq!(hits[1].length(), 2);
    }

    #[test]
    fn test_positions_are_code_units() {
        // "é" is one UTF-16 code unit but two UTF-8 bytes.
        let pma = AhoCorasickDoubleArrayTrie::new(vec![("b", 0)]).unwrap();
        let hits = pma.parse_text("éb");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start(), hits[0].end()), (1, 2));
    }

    #[test]
    fn test_surrogate_pairs_match_as_unit_sequences() {
        // U+1F600 encodes as a surrogate pair, two code units long.
        let pma = AhoCorasickDoubleArrayTrie::new(vec![("\u{1F600}", 7)]).unwrap();
        let hits = pma.parse_text("a\u{1F600}b");
        assert_eq!(hits.len(), 1);
        assert_eq!((hits[0].start(), hits[0].end()), (1, 3));
        assert_eq!(pma.exact_match_search("\u{1F600}"), Some(0));
    }

    #[test]
    fn test_empty_key_is_exact_matchable_but_never_scanned() {
        let pma = AhoCorasickDoubleArrayTrie::new(vec![("", 0), ("a", 1)]).unwrap();
        assert_eq!(pma.exact_match_search(""), Some(0));
        let hits = pma.parse_text("aa");
        assert!(hits.iter().all(|h| h.index() == 1));
    }

    #[test]
    fn test_exact_match_folds_case() {
        let pma = AhoCorasickDoubleArrayTrieBuilder::new()
            .ignore_case(true)
            .build(vec![("GrüSSe", 0u32)])
            .unwrap();
        assert_eq!(pma.exact_match_search("grüsse"), Some(0));
        assert_eq!(pma.exact_match_search("GRÜSSE"), Some(0));
        assert_eq!(pma.exact_match_search("grüße"), None);
    }

    #[test]
    fn test_get_returns_values() {
        let pma =
            AhoCorasickDoubleArrayTrie::new(vec![("one", 1u64), ("two", 2u64)]).unwrap();
        assert_eq!(pma.get("one"), Some(&1));
        assert_eq!(pma.get("two"), Some(&2));
        assert_eq!(pma.get("three"), None);
    }

    #[test]
    fn test_empty_haystack_and_empty_dictionary() {
        let pma = AhoCorasickDoubleArrayTrie::new(vec![("a", 0)]).unwrap();
        assert!(pma.parse_text("").is_empty());
        assert!(!pma.matches(""));

        let empty = AhoCorasickDoubleArrayTrie::new(Vec::<(&str, u32)>::new()).unwrap();
        assert!(empty.parse_text("haystack").is_empty());
        assert!(!empty.matches("haystack"));
        assert_eq!(empty.exact_match_search("haystack"), None);
        assert_eq!(empty.exact_match_search(""), None);
    }
}
