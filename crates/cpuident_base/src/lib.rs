//! Library defining cross library traits that can be implemented using `#![no_std]`
#![no_std]

mod macro_traits;
pub use macro_traits::*;
