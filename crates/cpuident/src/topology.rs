//! Core, thread and cache topology

use core::fmt;

use cpuident_common::utils::{bit_field, is_bit_set};
use cpuident_macros::{EnumDisplay, EnumFromName};

use crate::{
    cache::{decode_caches, Caches, CoreCounts},
    raw::RawCpuData,
    vendor::X86Signature,
    DetectionHint, DetectionHints, Vendor,
};

/// Purpose of the core type an identity describes
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Default, EnumDisplay, EnumFromName)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Purpose {
    /// Non-hybrid CPU
    #[default]
    #[display("general")]
    General,
    /// Performance (big) core
    #[display("performance")]
    Performance,
    /// Efficiency (little) core
    #[display("efficiency")]
    Efficiency,
    /// Low power efficiency core, outside of the compute tile
    #[display("low power efficiency")]
    #[parse_name("lp-efficiency")]
    LpEfficiency,
}

/// Decoded topology of the CPU the raw data was captured on
#[derive(Clone, PartialEq, Eq, Debug, Default)]
pub struct Topology {
    /// Number of physical cores per package
    pub num_cores:        Option<u32>,
    /// Number of logical CPUs per package
    pub num_logical_cpus: Option<u32>,
    pub threads_per_core: Option<u32>,
    pub caches:           Caches,
    pub purpose:          Purpose,
    /// Width of the SSE execution units, in bits
    pub sse_size:         Option<u32>,
    pub hints:            DetectionHints,
}

impl fmt::Display for Topology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let opt = |val: Option<u32>| val.map_or_else(|| "unknown".to_string(), |val| val.to_string());
        writeln!(f, "Cores:            {}", opt(self.num_cores))?;
        writeln!(f, "Logical CPUs:     {}", opt(self.num_logical_cpus))?;
        writeln!(f, "Threads per core: {}", opt(self.threads_per_core))?;
        writeln!(f, "Purpose:          {}", self.purpose)?;
        write!(f, "{}", self.caches)
    }
}

/// Counts decoded from the topology leaves
#[derive(Clone, Copy, Default, Debug)]
struct Counts {
    num_cores:        Option<u32>,
    num_logical_cpus: Option<u32>,
    threads_per_core: Option<u32>,
    from_extended:    bool,
}

/// Decode the core topology and caches.
pub fn decode_topology(raw: &RawCpuData, vendor: Vendor) -> Topology {
    let counts = decode_counts(raw, vendor);
    let (caches, mut hints) = decode_caches(raw, vendor, CoreCounts { num_cores: counts.num_cores, threads_per_core: counts.threads_per_core });

    if counts.from_extended {
        hints.insert(DetectionHint::TopologyFromExtendedLeaf);
    }

    let purpose = match hybrid_purpose(raw, vendor, &caches) {
        Some(purpose) => {
            hints.insert(DetectionHint::PurposeFromHybridLeaf);
            purpose
        },
        None => Purpose::General,
    };

    let sse_size = match authoritative_sse_size(raw, vendor) {
        Some(size) => {
            hints.insert(DetectionHint::SseSizeAuthoritative);
            Some(size)
        },
        None => heuristic_sse_size(raw, vendor),
    };

    Topology {
        num_cores: counts.num_cores,
        num_logical_cpus: counts.num_logical_cpus,
        threads_per_core: counts.threads_per_core,
        caches,
        purpose,
        sse_size,
        hints,
    }
}

pub(crate) fn decode_core_counts(raw: &RawCpuData, vendor: Vendor) -> CoreCounts {
    let counts = decode_counts(raw, vendor);
    CoreCounts { num_cores: counts.num_cores, threads_per_core: counts.threads_per_core }
}

fn decode_counts(raw: &RawCpuData, vendor: Vendor) -> Counts {
    // No x86 leaves means there is nothing to decode
    if raw.leaf(1, 0).is_none() {
        return Counts::default();
    }

    let counts = match vendor {
        Vendor::Intel => intel_x2apic_counts(raw).unwrap_or_else(|| intel_legacy_counts(raw)),
        Vendor::AMD | Vendor::Hygon => amd_counts(raw).unwrap_or_else(|| legacy_logical_counts(raw)),
        _ => legacy_logical_counts(raw),
    };

    Counts {
        num_cores: counts.num_cores.filter(|val| *val != 0),
        num_logical_cpus: counts.num_logical_cpus.filter(|val| *val != 0),
        threads_per_core: counts.threads_per_core.filter(|val| *val != 0),
        ..counts
    }
}

/// Leaf 0xB, level type 1 is SMT and 2 is core, EBX holds the logical CPU count up to that level.
fn intel_x2apic_counts(raw: &RawCpuData) -> Option<Counts> {
    let mut smt = None;
    let mut core = None;
    for subleaf in 0..4 {
        let Some(regs) = raw.leaf(0xB, subleaf) else { break };
        let count = bit_field(regs.ebx, 0, 16);
        match bit_field(regs.ecx, 8, 8) {
            0 => break,
            1 => smt = Some(count),
            2 => core = Some(count),
            _ => {},
        }
    }

    let (smt, core) = (smt.filter(|val| *val != 0)?, core.filter(|val| *val != 0)?);
    Some(Counts {
        num_cores: Some((core / smt).max(1)),
        num_logical_cpus: Some(core),
        threads_per_core: Some(smt),
        from_extended: true,
    })
}

/// Leaf 1 EBX[23:16] logical CPUs per package, leaf 4 EAX[31:26] cores per package.
fn intel_legacy_counts(raw: &RawCpuData) -> Counts {
    let logical = leaf1_logical_count(raw);
    let cores = raw.leaf(4, 0)
        .filter(|regs| bit_field(regs.eax, 0, 5) != 0)
        .map_or(1, |regs| bit_field(regs.eax, 26, 6) + 1);

    // Leaf 1 reports the addressable IDs, which can be larger than the actual number of logical CPUs
    let threads_per_core = (logical / cores).max(1);
    Counts {
        num_cores: Some(cores),
        num_logical_cpus: Some(cores * threads_per_core),
        threads_per_core: Some(threads_per_core),
        from_extended: false,
    }
}

/// 0x8000_0008 ECX[7:0] logical CPUs per package, 0x8000_001E EBX[15:8] threads per core.
fn amd_counts(raw: &RawCpuData) -> Option<Counts> {
    let logical = bit_field(raw.leaf(0x8000_0008, 0)?.ecx, 0, 8) + 1;
    let has_topoext = raw.leaf(0x8000_0001, 0).map_or(false, |regs| is_bit_set(regs.ecx, 22));
    let threads_per_core = match raw.leaf(0x8000_001E, 0) {
        Some(regs) if has_topoext => bit_field(regs.ebx, 8, 8) + 1,
        _ => 1,
    };
    Some(Counts {
        num_cores: Some((logical / threads_per_core).max(1)),
        num_logical_cpus: Some(logical),
        threads_per_core: Some(threads_per_core),
        from_extended: false,
    })
}

fn legacy_logical_counts(raw: &RawCpuData) -> Counts {
    let logical = leaf1_logical_count(raw);
    Counts {
        num_cores: Some(logical),
        num_logical_cpus: Some(logical),
        threads_per_core: Some(1),
        from_extended: false,
    }
}

fn leaf1_logical_count(raw: &RawCpuData) -> u32 {
    match raw.leaf(1, 0) {
        // HTT: EBX[23:16] is valid
        Some(regs) if is_bit_set(regs.edx, 28) => bit_field(regs.ebx, 16, 8).max(1),
        _ => 1,
    }
}

/// Core type of a hybrid Intel CPU from leaf 0x1A.
fn hybrid_purpose(raw: &RawCpuData, vendor: Vendor, caches: &Caches) -> Option<Purpose> {
    if vendor != Vendor::Intel {
        return None;
    }
    let is_hybrid = raw.leaf(7, 0).map_or(false, |regs| is_bit_set(regs.edx, 15));
    if !is_hybrid {
        return None;
    }

    match bit_field(raw.leaf(0x1A, 0)?.eax, 24, 8) {
        // Low power E-cores live outside of the compute tile and have no access to the L3
        0x20 if !caches.l3.is_present() => Some(Purpose::LpEfficiency),
        0x20 => Some(Purpose::Efficiency),
        0x40 => Some(Purpose::Performance),
        _ => None,
    }
}

/// 0x8000_001A EAX bit 0 (FP128): the SSE unit executes 128-bit operations natively
fn authoritative_sse_size(raw: &RawCpuData, vendor: Vendor) -> Option<u32> {
    if !matches!(vendor, Vendor::AMD | Vendor::Hygon) {
        return None;
    }
    let eax = raw.leaf(0x8000_001A, 0)?.eax;
    Some(if is_bit_set(eax, 0) { 128 } else { 64 })
}

fn heuristic_sse_size(raw: &RawCpuData, vendor: Vendor) -> Option<u32> {
    let sig = X86Signature::from_raw(raw, vendor)?;
    match vendor {
        // Core 2 and later
        Vendor::Intel if sig.ext_family == 6 && sig.ext_model >= 0xF => Some(128),
        Vendor::Intel if sig.ext_family > 0xF => Some(128),
        Vendor::Intel => Some(64),
        // K10 and later
        Vendor::AMD | Vendor::Hygon if sig.ext_family >= 0x10 => Some(128),
        Vendor::AMD | Vendor::Hygon => Some(64),
        _ => None,
    }
}
