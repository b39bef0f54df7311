//! Dense bitset over small chronological indices
//!
//! Used for defined/deleted export sets, used-export sets of cell usages and
//! node-id marks in memoization. Trailing zero words are always trimmed, so
//! two sets with the same members compare equal regardless of history.
//!
//! Snapshots hold sets behind `Arc`; [`share_bits`] returns the previous
//! `Arc` when the contents did not change and the shared empty set when the
//! new contents are empty.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

const WORD_BITS: usize = 64;

static EMPTY: Lazy<Arc<BitSet>> = Lazy::new(|| Arc::new(BitSet::new()));

/// Growable dense bitset
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct BitSet {
    words: Vec<u64>,
}

impl BitSet {
    #[inline]
    pub fn new() -> Self {
        Self { words: Vec::new() }
    }

    /// Canonical shared empty set
    pub fn empty() -> Arc<BitSet> {
        Arc::clone(&EMPTY)
    }

    pub fn from_indices(indices: impl IntoIterator<Item = usize>) -> Self {
        let mut bits = Self::new();
        for i in indices {
            bits.set(i);
        }
        bits
    }

    /// Bits `[0, len)` set
    pub fn filled(len: usize) -> Self {
        let mut words = vec![u64::MAX; len / WORD_BITS];
        let rem = len % WORD_BITS;
        if rem != 0 {
            words.push((1u64 << rem) - 1);
        }
        Self { words }
    }

    #[inline]
    pub fn get(&self, i: usize) -> bool {
        self.words
            .get(i / WORD_BITS)
            .map_or(false, |w| w & (1u64 << (i % WORD_BITS)) != 0)
    }

    pub fn set(&mut self, i: usize) {
        let w = i / WORD_BITS;
        if w >= self.words.len() {
            self.words.resize(w + 1, 0);
        }
        self.words[w] |= 1u64 << (i % WORD_BITS);
    }

    pub fn clear(&mut self, i: usize) {
        let w = i / WORD_BITS;
        if w < self.words.len() {
            self.words[w] &= !(1u64 << (i % WORD_BITS));
            self.trim();
        }
    }

    /// Index of the highest set bit plus one
    pub fn len(&self) -> usize {
        match self.words.last() {
            Some(&w) => (self.words.len() - 1) * WORD_BITS + (WORD_BITS - w.leading_zeros() as usize),
            None => 0,
        }
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn count_ones(&self) -> usize {
        self.words.iter().map(|w| w.count_ones() as usize).sum()
    }

    pub fn intersects(&self, other: &BitSet) -> bool {
        self.words
            .iter()
            .zip(other.words.iter())
            .any(|(a, b)| a & b != 0)
    }

    pub fn intersection(&self, other: &BitSet) -> BitSet {
        let mut out = BitSet {
            words: self
                .words
                .iter()
                .zip(other.words.iter())
                .map(|(a, b)| a & b)
                .collect(),
        };
        out.trim();
        out
    }

    pub fn is_subset(&self, other: &BitSet) -> bool {
        self.words.iter().enumerate().all(|(i, &w)| {
            let o = other.words.get(i).copied().unwrap_or(0);
            w & !o == 0
        })
    }

    /// `[0, len)` minus `self`
    pub fn complement_within(&self, len: usize) -> BitSet {
        let mut out = BitSet::filled(len);
        for (i, w) in out.words.iter_mut().enumerate() {
            *w &= !self.words.get(i).copied().unwrap_or(0);
        }
        out.trim();
        out
    }

    /// Set bit indices in increasing order
    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.words.iter().enumerate().flat_map(|(wi, &word)| {
            let mut w = word;
            std::iter::from_fn(move || {
                if w == 0 {
                    return None;
                }
                let bit = w.trailing_zeros() as usize;
                w &= w - 1;
                Some(wi * WORD_BITS + bit)
            })
        })
    }

    fn trim(&mut self) {
        while self.words.last() == Some(&0) {
            self.words.pop();
        }
    }
}

impl fmt::Debug for BitSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Reuse `old` when `new` has the same members; the shared empty set when empty
pub fn share_bits(old: &Arc<BitSet>, new: BitSet) -> Arc<BitSet> {
    if **old == new {
        Arc::clone(old)
    } else if new.is_empty() {
        BitSet::empty()
    } else {
        Arc::new(new)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_get_clear() {
        let mut bits = BitSet::new();
        bits.set(3);
        bits.set(130);
        assert!(bits.get(3));
        assert!(bits.get(130));
        assert!(!bits.get(4));
        assert_eq!(bits.len(), 131);
        assert_eq!(bits.count_ones(), 2);

        bits.clear(130);
        assert_eq!(bits.len(), 4);
        bits.clear(3);
        assert!(bits.is_empty());
        assert_eq!(bits, BitSet::new());
    }

    #[test]
    fn test_filled_and_complement() {
        let filled = BitSet::filled(70);
        assert_eq!(filled.count_ones(), 70);
        assert_eq!(filled.len(), 70);

        let defined = BitSet::from_indices([0, 2, 65]);
        let deleted = defined.complement_within(66);
        assert_eq!(deleted.iter().collect::<Vec<_>>().len(), 63);
        assert!(!deleted.get(0));
        assert!(deleted.get(1));
        assert!(!deleted.get(65));
        assert!(!deleted.intersects(&defined));
    }

    #[test]
    fn test_iter_in_order() {
        let bits = BitSet::from_indices([64, 1, 200, 5]);
        assert_eq!(bits.iter().collect::<Vec<_>>(), vec![1, 5, 64, 200]);
    }

    #[test]
    fn test_subset_and_intersection() {
        let a = BitSet::from_indices([1, 2]);
        let b = BitSet::from_indices([1, 2, 100]);
        assert!(a.is_subset(&b));
        assert!(!b.is_subset(&a));
        assert_eq!(b.intersection(&a), a);
        assert!(BitSet::from_indices([100]).intersection(&a).is_empty());
    }

    #[test]
    fn test_share_bits() {
        let old = Arc::new(BitSet::from_indices([1]));
        assert!(Arc::ptr_eq(&share_bits(&old, BitSet::from_indices([1])), &old));
        assert!(Arc::ptr_eq(&share_bits(&old, BitSet::new()), &BitSet::empty()));
        let changed = share_bits(&old, BitSet::from_indices([2]));
        assert!(!Arc::ptr_eq(&changed, &old));
        assert!(changed.get(2));
    }
}
