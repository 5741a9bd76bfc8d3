//! Decoded CPU identity

use core::fmt::{self, Write};

use cpuident_common::{
    collections::{BitSet, EnumSet},
    fmt::Indenter,
};
use cpuident_macros::{EnumCount, EnumDisplay, EnumIndex};

use crate::{Architecture, Caches, CpuFeature, FeatureSet, HypervisorVendor, Purpose, SgxInfo, Vendor};

/// Hint about how a value was detected
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumCount, EnumIndex, EnumDisplay)]
pub enum DetectionHint {
    /// The SSE unit size was reported by the CPU, instead of being derived from the family
    #[display("authoritative SSE size")]
    SseSizeAuthoritative,
    /// Caches were decoded from the deterministic cache leaves
    #[display("deterministic caches")]
    CachesDeterministic,
    /// Caches were decoded from the legacy cache leaves or descriptors
    #[display("legacy caches")]
    CachesLegacy,
    /// Core and thread counts were decoded from the x2APIC topology leaf
    #[display("extended topology")]
    TopologyFromExtendedLeaf,
    /// Purpose was decoded from the hybrid information leaf
    #[display("hybrid purpose")]
    PurposeFromHybridLeaf,
}

pub type DetectionHints = EnumSet<DetectionHint, 1>;

/// Maximum number of logical CPUs an affinity mask can describe
pub const MAX_AFFINITY_CPUS : usize = 1024;

/// Logical CPUs belonging to the core type an identity describes, bit `i` is logical CPU `i`.
pub type AffinityMask = BitSet<{ MAX_AFFINITY_CPUS / 64 }>;

/// x86 specific identification
#[derive(Clone, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct X86Identity {
    pub family:     Option<u32>,
    pub model:      Option<u32>,
    pub stepping:   Option<u32>,
    /// Display family, combining the base and extended family
    pub ext_family: Option<u32>,
    /// Display model, combining the base and extended model
    pub ext_model:  Option<u32>,
    /// Width of the SSE execution units, in bits
    pub sse_size:   Option<u32>,
    pub sgx:        Option<SgxInfo>,
}

/// ARM specific identification, decoded from MIDR_EL1
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ArmIdentity {
    pub implementer: u32,
    pub variant:     u32,
    pub part_num:    u32,
    pub revision:    u32,
}

/// Architecture specific identification
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ArchIdentity {
    X86(X86Identity),
    Arm(ArmIdentity),
    Unknown,
}

/// Decoded identity of a CPU, or of a single core type on a hybrid CPU.
/// 
/// Values that could not be determined are `None`.
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CpuIdentity {
    pub architecture:       Architecture,
    pub vendor:             Vendor,
    pub vendor_str:         String,
    pub brand_str:          String,
    /// Physical cores per package
    pub num_cores:          Option<u32>,
    /// Logical CPUs per package
    pub num_logical_cpus:   Option<u32>,
    /// Logical CPUs reported by the OS, over all packages
    pub total_logical_cpus: Option<u32>,
    pub purpose:            Purpose,
    pub features:           FeatureSet,
    pub caches:             Caches,
    pub codename:           Option<String>,
    pub hypervisor:         Option<HypervisorVendor>,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_display"))]
    pub affinity_mask:      AffinityMask,
    #[cfg_attr(feature = "serde", serde(serialize_with = "serialize_enum_set"))]
    pub detection_hints:    DetectionHints,
    pub arch:               ArchIdentity,
}

impl CpuIdentity {
    pub fn has_feature(&self, feature: CpuFeature) -> bool {
        self.features.contains(feature)
    }

    pub fn x86(&self) -> Option<&X86Identity> {
        match &self.arch {
            ArchIdentity::X86(x86) => Some(x86),
            _ => None,
        }
    }

    pub fn arm(&self) -> Option<&ArmIdentity> {
        match &self.arch {
            ArchIdentity::Arm(arm) => Some(arm),
            _ => None,
        }
    }
}

fn write_opt(f: &mut dyn Write, name: &str, val: Option<u32>) -> fmt::Result {
    match val {
        Some(val) => writeln!(f, "{name:<20}{val}"),
        None => writeln!(f, "{name:<20}unknown"),
    }
}

fn write_opt_hex(f: &mut dyn Write, name: &str, val: Option<u32>) -> fmt::Result {
    match val {
        Some(val) => writeln!(f, "{name:<20}0x{val:X}"),
        None => writeln!(f, "{name:<20}unknown"),
    }
}

impl fmt::Display for CpuIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "CPU:")?;
        let mut indenter = Indenter::new(f);

        writeln!(indenter, "{:<20}{}", "Architecture:", self.architecture)?;
        writeln!(indenter, "{:<20}{} ({})", "Vendor:", self.vendor, self.vendor_str)?;
        writeln!(indenter, "{:<20}{}", "Brand:", self.brand_str)?;
        writeln!(indenter, "{:<20}{}", "Codename:", self.codename.as_deref().unwrap_or("unknown"))?;

        match &self.arch {
            ArchIdentity::X86(x86) => {
                write_opt_hex(&mut indenter, "Family:", x86.ext_family)?;
                write_opt_hex(&mut indenter, "Model:", x86.ext_model)?;
                write_opt(&mut indenter, "Stepping:", x86.stepping)?;
                write_opt(&mut indenter, "SSE size:", x86.sse_size)?;
            },
            ArchIdentity::Arm(arm) => {
                writeln!(indenter, "{:<20}0x{:02X}", "Implementer:", arm.implementer)?;
                writeln!(indenter, "{:<20}0x{:03X}", "Part:", arm.part_num)?;
                writeln!(indenter, "{:<20}r{}p{}", "Revision:", arm.variant, arm.revision)?;
            },
            ArchIdentity::Unknown => {},
        }

        write_opt(&mut indenter, "Cores:", self.num_cores)?;
        write_opt(&mut indenter, "Logical CPUs:", self.num_logical_cpus)?;
        write_opt(&mut indenter, "Total logical CPUs:", self.total_logical_cpus)?;
        writeln!(indenter, "{:<20}{}", "Purpose:", self.purpose)?;
        if self.affinity_mask.any() {
            writeln!(indenter, "{:<20}{}", "Affinity mask:", self.affinity_mask)?;
        }
        if let Some(hypervisor) = self.hypervisor {
            writeln!(indenter, "{:<20}{}", "Hypervisor:", hypervisor)?;
        }

        write!(indenter, "{:<20}", "Detection hints:")?;
        for (idx, hint) in self.detection_hints.iter().enumerate() {
            if idx != 0 {
                indenter.write_str(", ")?;
            }
            write!(indenter, "{hint}")?;
        }
        writeln!(indenter)?;

        writeln!(indenter, "{}", self.caches)?;
        if let Some(sgx) = self.x86().and_then(|x86| x86.sgx.as_ref()) {
            writeln!(indenter, "{sgx}")?;
        }
        write!(indenter, "Features: {}", self.features)
    }
}

#[cfg(feature = "serde")]
pub(crate) fn serialize_enum_set<E, S, const WORDS: usize>(set: &EnumSet<E, WORDS>, serializer: S) -> Result<S::Ok, S::Error>
where
    E: cpuident_base::EnumIndexT + cpuident_base::EnumCountT + fmt::Display,
    S: serde::Serializer,
{
    serializer.collect_seq(set.iter().map(|val| val.to_string()))
}

#[cfg(feature = "serde")]
fn serialize_display<T: fmt::Display, S: serde::Serializer>(val: &T, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.collect_str(val)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{identify_raw, test_data};

    #[test]
    fn report_is_indented() {
        let identity = identify_raw(&test_data::intel_kaby_lake_u());
        let report = identity.to_string();
        let mut lines = report.lines();
        assert_eq!(lines.next(), Some("CPU:"));
        assert!(lines.all(|line| line.starts_with("    ")));
        assert!(report.contains("    Codename:           Kaby Lake-U\n"));
        assert!(report.contains("    Family:             0x6\n"));
        assert!(report.contains("    Model:              0x8E\n"));
        assert!(report.contains("    Caches:\n        L1 data:        32 KiB, 8-way, 64-byte lines, 2x (deterministic)\n"));
        assert!(report.contains("Detection hints:    deterministic caches, extended topology\n"));
    }

    #[test]
    fn arm_report() {
        let identity = identify_raw(&test_data::arm_cortex_a72());
        let report = identity.to_string();
        assert!(report.contains("    Part:               0xD08\n"));
        assert!(report.contains("    Revision:           r0p3\n"));
        assert!(report.contains("    Cores:              unknown\n"));
    }

    #[test]
    fn arch_accessors() {
        let identity = identify_raw(&test_data::arm_cortex_a72());
        assert!(identity.x86().is_none());
        assert_eq!(identity.arm().map(|arm| arm.part_num), Some(0xD08));
    }
}
