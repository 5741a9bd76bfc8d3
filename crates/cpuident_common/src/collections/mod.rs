mod bitset;
pub use bitset::*;

mod enum_set;
pub use enum_set::*;
