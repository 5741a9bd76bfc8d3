use core::{fmt, ops::*};

/// Fixed size bitset, stored as `WORDS` 64-bit words.
/// 
/// Indices outside of the bitset are never set: writes to them are ignored and reads return `false`.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitSet<const WORDS: usize> {
    bits: [u64; WORDS],
}

impl<const WORDS: usize> BitSet<WORDS> {
    /// Number of bits in the bitset
    pub const BIT_COUNT : usize = WORDS * 64;

    pub const fn new() -> Self {
        Self { bits: [0; WORDS] }
    }

    /// Set the given bit.
    pub fn set(&mut self, idx: usize, set: bool) {
        if set {
            self.enable(idx);
        } else {
            self.disable(idx);
        }
    }

    /// Enable a bit
    pub fn enable(&mut self, idx: usize) {
        let (word_idx, bit_idx) = Self::indices(idx);
        if let Some(word) = self.bits.get_mut(word_idx) {
            *word |= 1u64 << bit_idx;
        }
    }

    /// Disable a bit
    pub fn disable(&mut self, idx: usize) {
        let (word_idx, bit_idx) = Self::indices(idx);
        if let Some(word) = self.bits.get_mut(word_idx) {
            *word &= !(1u64 << bit_idx);
        }
    }

    /// Get the given bit.
    pub fn get(&self, idx: usize) -> bool {
        let (word_idx, bit_idx) = Self::indices(idx);
        self.bits.get(word_idx).map_or(false, |word| (word >> bit_idx) & 0x1 != 0)
    }

    /// Check if any bits are set
    pub fn any(&self) -> bool {
        self.bits.iter().any(|word| *word != 0)
    }

    /// Check if no bits are set
    pub fn none(&self) -> bool {
        !self.any()
    }

    /// Count the number of bits set to 1
    pub fn count_ones(&self) -> usize {
        self.bits.iter().map(|word| word.count_ones() as usize).sum()
    }

    /// Get the underlying words
    pub fn bits(&self) -> &[u64; WORDS] {
        &self.bits
    }

    /// Iterate over the indices of all set bits, in ascending order.
    pub fn iter_ones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bits.iter().enumerate().flat_map(|(word_idx, word)| {
            let word = *word;
            (0..64).filter(move |bit| (word >> bit) & 0x1 != 0).map(move |bit| word_idx * 64 + bit)
        })
    }

    fn indices(idx: usize) -> (usize, usize) {
        (idx / 64, idx % 64)
    }
}

impl<const WORDS: usize> Default for BitSet<WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const WORDS: usize> BitOr for BitSet<WORDS> {
    type Output = Self;

    fn bitor(mut self, rhs: Self) -> Self::Output {
        self |= rhs;
        self
    }
}

impl<const WORDS: usize> BitOrAssign for BitSet<WORDS> {
    fn bitor_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.bits.iter_mut().zip(rhs.bits) {
            *lhs |= rhs;
        }
    }
}

impl<const WORDS: usize> BitAnd for BitSet<WORDS> {
    type Output = Self;

    fn bitand(mut self, rhs: Self) -> Self::Output {
        self &= rhs;
        self
    }
}

impl<const WORDS: usize> BitAndAssign for BitSet<WORDS> {
    fn bitand_assign(&mut self, rhs: Self) {
        for (lhs, rhs) in self.bits.iter_mut().zip(rhs.bits) {
            *lhs &= rhs;
        }
    }
}

/// Formats the set bits as a list of indices, e.g. `{0, 2, 5}`
impl<const WORDS: usize> fmt::Debug for BitSet<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter_ones()).finish()
    }
}

/// Formats the bitset as a hexadecimal mask, most significant word first, without leading zero words.
impl<const WORDS: usize> fmt::Display for BitSet<WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let highest = self.bits.iter().rposition(|word| *word != 0);
        match highest {
            None => f.write_str("0x0"),
            Some(highest) => {
                write!(f, "0x{:X}", self.bits[highest])?;
                for word in self.bits[..highest].iter().rev() {
                    write!(f, "{:016X}", word)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::BitSet;

    #[test]
    fn set_get_flip() {
        let mut bits = BitSet::<2>::new();
        assert!(bits.none());

        bits.enable(3);
        bits.set(64, true);
        bits.set(127, true);
        assert!(bits.get(3));
        assert!(bits.get(64));
        assert!(bits.get(127));
        assert!(!bits.get(4));
        assert_eq!(bits.count_ones(), 3);

        bits.set(3, false);
        assert!(!bits.get(3));
        bits.disable(64);
        assert_eq!(bits.iter_ones().collect::<Vec<_>>(), vec![127]);
    }

    #[test]
    fn out_of_range_is_ignored() {
        let mut bits = BitSet::<1>::new();
        bits.enable(64);
        assert!(bits.none());
        assert!(!bits.get(1000));
        bits.disable(200);
        assert!(bits.none());
    }

    #[test]
    fn display_as_mask() {
        let mut bits = BitSet::<2>::new();
        assert_eq!(bits.to_string(), "0x0");
        bits.enable(0);
        bits.enable(5);
        assert_eq!(bits.to_string(), "0x21");
        bits.enable(64);
        assert_eq!(bits.to_string(), "0x10000000000000021");
    }
}
