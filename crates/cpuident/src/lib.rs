//! CPU identification
//! 
//! Captures the raw identification data of a CPU (CPUID leaves on x86, ID registers on AArch64)
//! and decodes it into a [`CpuIdentity`]: vendor, brand, family/model/stepping, features, caches,
//! core counts, codename, hypervisor and SGX capabilities.
//! 
//! Every decode stage works on a [`RawCpuData`], which can also be loaded from a snapshot,
//! so identification does not need to run on the CPU being identified.

use cpuident_logging::LogCategory;

mod api;
mod cache;
mod codename;
mod error;
mod features;
mod hypervisor;
mod identity;
pub mod raw;
mod sgx;
mod sys;
mod topology;
mod vendor;

#[cfg(test)]
mod test_data;

pub use api::*;
pub use cache::{CacheDescriptor, CacheLevel, CacheSource, Caches};
pub use codename::*;
pub use error::*;
pub use features::*;
pub use hypervisor::*;
pub use identity::*;
pub use raw::{capture_raw, ArmRegister, RawBucket, RawCpuData, Register, Registers};
pub use sgx::*;
pub use topology::{decode_topology, Purpose, Topology};
pub use vendor::*;

pub(crate) const LOG_CAT : LogCategory = LogCategory::new("cpuident");

/// Version of the cpuident crate
pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
