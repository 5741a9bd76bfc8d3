//! Contains traits implemented by the cpuident derive macros


/// Trait to get the number of elements in an enum
pub trait EnumCountT {
    /// Count or number of element in an enum
    const COUNT : usize;
}

/// Trait to convert between an enum and its index
/// 
/// Indices are the enum discriminants, so they are only dense when the enum does not skip values.
pub trait EnumIndexT: Sized + Copy {
    /// Try to convert an index to an enum
    fn from_idx(idx: usize) -> Option<Self>;

    /// Get the index of the variant
    fn to_idx(self) -> usize;
}

/// Trait to parse an enum from its name
pub trait EnumFromNameT: Sized {
    /// Try to parse the enum from a string slice.
    fn parse(s: &str) -> Option<Self>;
}
