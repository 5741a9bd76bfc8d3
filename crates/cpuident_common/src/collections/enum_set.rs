use core::{fmt, marker::PhantomData};

use cpuident_base::{EnumCountT, EnumIndexT};

use super::BitSet;

/// Set of enum values, backed by a [`BitSet`] indexed by [`EnumIndexT::to_idx`].
/// 
/// `WORDS` needs to be large enough to hold `E::COUNT` bits, values with an index outside of the set are dropped.
pub struct EnumSet<E: EnumIndexT + EnumCountT, const WORDS: usize> {
    bits: BitSet<WORDS>,
    _phantom: PhantomData<E>,
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> EnumSet<E, WORDS> {
    pub const fn new() -> Self {
        Self { bits: BitSet::new(), _phantom: PhantomData }
    }

    /// Insert a value, returns `true` if it was not present yet.
    pub fn insert(&mut self, value: E) -> bool {
        let idx = value.to_idx();
        let was_set = self.bits.get(idx);
        self.bits.enable(idx);
        !was_set && self.bits.get(idx)
    }

    /// Remove a value, returns `true` if it was present.
    pub fn remove(&mut self, value: E) -> bool {
        let idx = value.to_idx();
        let was_set = self.bits.get(idx);
        self.bits.disable(idx);
        was_set
    }

    pub fn set(&mut self, value: E, present: bool) {
        self.bits.set(value.to_idx(), present);
    }

    pub fn contains(&self, value: E) -> bool {
        self.bits.get(value.to_idx())
    }

    pub fn len(&self) -> usize {
        self.bits.count_ones()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.none()
    }

    /// Iterate over the values in the set, in index order.
    pub fn iter(&self) -> impl Iterator<Item = E> + '_ {
        self.bits.iter_ones().filter_map(E::from_idx)
    }

    pub fn bits(&self) -> &BitSet<WORDS> {
        &self.bits
    }
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> Clone for EnumSet<E, WORDS> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> Copy for EnumSet<E, WORDS> {}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> PartialEq for EnumSet<E, WORDS> {
    fn eq(&self, other: &Self) -> bool {
        self.bits == other.bits
    }
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> Eq for EnumSet<E, WORDS> {}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> Default for EnumSet<E, WORDS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: EnumIndexT + EnumCountT + fmt::Debug, const WORDS: usize> fmt::Debug for EnumSet<E, WORDS> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> FromIterator<E> for EnumSet<E, WORDS> {
    fn from_iter<T: IntoIterator<Item = E>>(iter: T) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

impl<E: EnumIndexT + EnumCountT, const WORDS: usize> Extend<E> for EnumSet<E, WORDS> {
    fn extend<T: IntoIterator<Item = E>>(&mut self, iter: T) {
        for value in iter {
            self.insert(value);
        }
    }
}
