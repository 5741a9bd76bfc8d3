//! Utilities shared by the cpuident crates.

mod bytes;

pub mod collections;
pub mod fmt;
pub mod utils;

pub use bytes::*;
