//! Cache descriptor decoding
//! 
//! Caches are decoded from the deterministic cache leaves when available (leaf 4 or 0x8000_001D),
//! falling back to the legacy fixed layout leaves (0x8000_0005/6 and the leaf 2 descriptors) for each missing level.
//! ARM caches are decoded from CLIDR/CCSIDR.

use core::fmt::{self, Write};

use cpuident_common::{fmt::Indenter, utils::{bit_field, bit_field64, is_bit_set}};
use cpuident_macros::{EnumCount, EnumDisplay, EnumIndex};

use crate::{
    raw::{ArmRegister, RawBucket, RawCpuData, Registers},
    DetectionHint, DetectionHints, Vendor,
};

/// Cache level
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumCount, EnumIndex, EnumDisplay)]
pub enum CacheLevel {
    #[display("L1 data")]
    L1Data,
    #[display("L1 instruction")]
    L1Instruction,
    #[display("L2")]
    L2,
    #[display("L3")]
    L3,
    #[display("L4")]
    L4,
}

/// Where a cache descriptor was decoded from
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumDisplay)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum CacheSource {
    /// Deterministic cache parameter leaf (4 or 0x8000_001D)
    #[display("deterministic")]
    Deterministic,
    /// Legacy fixed layout leaf (0x8000_0005 or 0x8000_0006)
    #[display("legacy")]
    Legacy,
    /// Leaf 2 cache descriptor bytes
    #[display("descriptor")]
    Descriptor,
    /// ARM CCSIDR register
    #[display("CCSIDR")]
    ArmCcsidr,
}

/// Description of a single cache level.
/// 
/// All values are `None` when the cache level is not present.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CacheDescriptor {
    /// Size in KiB
    pub size_kb:       Option<u32>,
    /// Number of ways, fully associative caches report the number of lines
    pub associativity: Option<u32>,
    /// Line size in bytes
    pub line_size:     Option<u32>,
    /// Number of instances of this cache in the package
    pub instances:     Option<u32>,
    pub source:        Option<CacheSource>,
}

impl CacheDescriptor {
    pub const ABSENT : CacheDescriptor = CacheDescriptor {
        size_kb: None,
        associativity: None,
        line_size: None,
        instances: None,
        source: None,
    };

    pub fn is_present(&self) -> bool {
        self.size_kb.is_some()
    }
}

impl Default for CacheDescriptor {
    fn default() -> Self {
        Self::ABSENT
    }
}

impl fmt::Display for CacheDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(size) = self.size_kb else {
            return f.write_str("not present");
        };
        write!(f, "{size} KiB")?;
        if let Some(assoc) = self.associativity {
            write!(f, ", {assoc}-way")?;
        }
        if let Some(line) = self.line_size {
            write!(f, ", {line}-byte lines")?;
        }
        if let Some(instances) = self.instances {
            write!(f, ", {instances}x")?;
        }
        if let Some(source) = self.source {
            write!(f, " ({source})")?;
        }
        Ok(())
    }
}

/// Cache descriptors for each cache level
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Caches {
    pub l1_data:        CacheDescriptor,
    pub l1_instruction: CacheDescriptor,
    pub l2:             CacheDescriptor,
    pub l3:             CacheDescriptor,
    pub l4:             CacheDescriptor,
}

impl Caches {
    pub fn get(&self, level: CacheLevel) -> &CacheDescriptor {
        match level {
            CacheLevel::L1Data        => &self.l1_data,
            CacheLevel::L1Instruction => &self.l1_instruction,
            CacheLevel::L2            => &self.l2,
            CacheLevel::L3            => &self.l3,
            CacheLevel::L4            => &self.l4,
        }
    }

    pub fn get_mut(&mut self, level: CacheLevel) -> &mut CacheDescriptor {
        match level {
            CacheLevel::L1Data        => &mut self.l1_data,
            CacheLevel::L1Instruction => &mut self.l1_instruction,
            CacheLevel::L2            => &mut self.l2,
            CacheLevel::L3            => &mut self.l3,
            CacheLevel::L4            => &mut self.l4,
        }
    }

    /// Iterate over all levels and their descriptors
    pub fn iter(&self) -> impl Iterator<Item = (CacheLevel, &CacheDescriptor)> {
        [CacheLevel::L1Data, CacheLevel::L1Instruction, CacheLevel::L2, CacheLevel::L3, CacheLevel::L4]
            .into_iter()
            .map(|level| (level, self.get(level)))
    }

    /// Set a level if it was not set yet, returns `true` if it was set.
    fn fill(&mut self, level: CacheLevel, desc: CacheDescriptor) -> bool {
        let slot = self.get_mut(level);
        if slot.is_present() {
            false
        } else {
            *slot = desc;
            true
        }
    }
}

impl fmt::Display for Caches {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Caches:")?;

        let mut indenter = Indenter::new(f);
        for (idx, (level, desc)) in self.iter().enumerate() {
            if idx != 0 {
                writeln!(indenter)?;
            }
            write!(indenter, "{:<15} {desc}", format!("{level}:"))?;
        }
        Ok(())
    }
}

/// Core counts needed to derive the number of cache instances
#[derive(Clone, Copy, Debug)]
pub(crate) struct CoreCounts {
    pub num_cores:        Option<u32>,
    pub threads_per_core: Option<u32>,
}

/// Decode the caches, filling each level from the most authoritative source available.
pub(crate) fn decode_caches(raw: &RawCpuData, vendor: Vendor, counts: CoreCounts) -> (Caches, DetectionHints) {
    let mut caches = Caches::default();
    let mut hints = DetectionHints::new();

    let bucket = deterministic_bucket(raw, vendor);
    if decode_deterministic(raw, bucket, counts, &mut caches) {
        hints.insert(DetectionHint::CachesDeterministic);
    }

    let mut legacy = false;
    if matches!(vendor, Vendor::AMD | Vendor::Hygon) {
        legacy |= decode_amd_legacy(raw, &mut caches);
    } else if vendor == Vendor::Intel {
        legacy |= decode_intel_descriptors(raw, &mut caches);
        legacy |= decode_intel_legacy_l2(raw, &mut caches);
    }
    if legacy {
        hints.insert(DetectionHint::CachesLegacy);
    }

    decode_arm(raw, &mut caches);
    (caches, hints)
}

fn deterministic_bucket(raw: &RawCpuData, vendor: Vendor) -> RawBucket {
    let has_topoext = raw.leaf(0x8000_0001, 0).map_or(false, |regs| is_bit_set(regs.ecx, 22));
    if matches!(vendor, Vendor::AMD | Vendor::Hygon) && has_topoext {
        RawBucket::AmdFn8000001Dh
    } else {
        RawBucket::IntelFn4
    }
}

/// Decode a deterministic cache leaf entry, returns `None` for the terminator.
/// 
/// Both leaf 4 and 0x8000_001D share the same layout.
pub(crate) fn deterministic_entry(regs: &Registers, counts: CoreCounts) -> Option<(CacheLevel, CacheDescriptor)> {
    let cache_type = bit_field(regs.eax, 0, 5);
    let level = match (bit_field(regs.eax, 5, 3), cache_type) {
        (_, 0) => return None,
        (1, 1) => CacheLevel::L1Data,
        (1, 2) => CacheLevel::L1Instruction,
        (2, _) => CacheLevel::L2,
        (3, _) => CacheLevel::L3,
        (4, _) => CacheLevel::L4,
        // Unified L1 or unknown level
        _ => return None,
    };

    let fully_associative = is_bit_set(regs.eax, 9);
    let sharing = bit_field(regs.eax, 14, 12) + 1;
    let line_size = bit_field(regs.ebx, 0, 12) + 1;
    let partitions = bit_field(regs.ebx, 12, 10) + 1;
    let ways = bit_field(regs.ebx, 22, 10) + 1;
    let sets = u64::from(regs.ecx) + 1;

    let size = [ways, partitions, line_size].into_iter()
        .try_fold(sets, |acc, val| acc.checked_mul(u64::from(val)))?;
    let size_kb = size_in_kib(size)?;
    let associativity = if fully_associative {
        u32::try_from(size / u64::from(line_size)).ok()
    } else {
        Some(ways)
    };

    Some((level, CacheDescriptor {
        size_kb: Some(size_kb),
        associativity,
        line_size: Some(line_size),
        instances: instance_count(sharing, counts),
        source: Some(CacheSource::Deterministic),
    }))
}

/// Size in whole KiB, `None` when it is zero or does not fit.
fn size_in_kib(bytes: u64) -> Option<u32> {
    u32::try_from(bytes / 1024).ok().filter(|kib| *kib != 0)
}

/// Number of cache instances, `None` when any divisor is zero or the core count is unknown.
fn instance_count(sharing: u32, counts: CoreCounts) -> Option<u32> {
    let threads_per_core = counts.threads_per_core.filter(|threads| *threads != 0)?;
    let cores_sharing = sharing / threads_per_core;
    if cores_sharing == 0 {
        return None;
    }
    let num_cores = counts.num_cores?;
    Some(num_cores.div_ceil(cores_sharing).max(1))
}

fn decode_deterministic(raw: &RawCpuData, bucket: RawBucket, counts: CoreCounts, caches: &mut Caches) -> bool {
    let mut any = false;
    for regs in raw.bucket_entries(bucket) {
        match deterministic_entry(&regs, counts) {
            Some((level, desc)) => any |= caches.fill(level, desc),
            None if bit_field(regs.eax, 0, 5) == 0 => break,
            None => {},
        }
    }
    any
}

/// Associativity encoding of leaf 0x8000_0006, `Some(0)` means fully associative
fn amd_assoc(code: u32) -> Option<u32> {
    match code {
        0x1 => Some(1),
        0x2 => Some(2),
        0x3 => Some(3),
        0x4 => Some(4),
        0x5 => Some(6),
        0x6 => Some(8),
        0x8 => Some(16),
        0xA => Some(32),
        0xB => Some(48),
        0xC => Some(64),
        0xD => Some(96),
        0xE => Some(128),
        0xF => Some(0),
        _ => None,
    }
}

fn legacy_descriptor(size_kb: u32, assoc: Option<u32>, line_size: u32, source: CacheSource) -> CacheDescriptor {
    let assoc = match assoc {
        Some(0) if line_size != 0 => u32::try_from(u64::from(size_kb) * 1024 / u64::from(line_size)).ok(),
        Some(0) => None,
        assoc => assoc,
    };
    CacheDescriptor {
        size_kb: Some(size_kb),
        associativity: assoc,
        line_size: (line_size != 0).then_some(line_size),
        instances: None,
        source: Some(source),
    }
}

fn decode_amd_legacy(raw: &RawCpuData, caches: &mut Caches) -> bool {
    let mut any = false;

    if let Some(regs) = raw.leaf(0x8000_0005, 0) {
        for (level, reg) in [(CacheLevel::L1Data, regs.ecx), (CacheLevel::L1Instruction, regs.edx)] {
            let size = bit_field(reg, 24, 8);
            if size == 0 {
                continue;
            }
            // 0xFF is fully associative
            let assoc = match bit_field(reg, 16, 8) {
                0xFF => Some(0),
                0 => None,
                ways => Some(ways),
            };
            any |= caches.fill(level, legacy_descriptor(size, assoc, bit_field(reg, 0, 8), CacheSource::Legacy));
        }
    }

    if let Some(regs) = raw.leaf(0x8000_0006, 0) {
        let l2_size = bit_field(regs.ecx, 16, 16);
        let l2_assoc = bit_field(regs.ecx, 12, 4);
        if l2_size != 0 && l2_assoc != 0 {
            any |= caches.fill(CacheLevel::L2, legacy_descriptor(l2_size, amd_assoc(l2_assoc), bit_field(regs.ecx, 0, 8), CacheSource::Legacy));
        }

        // L3 size is in 512 KiB units
        let l3_size = bit_field(regs.edx, 18, 14) * 512;
        let l3_assoc = bit_field(regs.edx, 12, 4);
        if l3_size != 0 && l3_assoc != 0 {
            any |= caches.fill(CacheLevel::L3, legacy_descriptor(l3_size, amd_assoc(l3_assoc), bit_field(regs.edx, 0, 8), CacheSource::Legacy));
        }
    }

    any
}

/// Intel only reports the L2 cache in leaf 0x8000_0006
fn decode_intel_legacy_l2(raw: &RawCpuData, caches: &mut Caches) -> bool {
    let Some(regs) = raw.leaf(0x8000_0006, 0) else { return false };
    let size = bit_field(regs.ecx, 16, 16);
    let assoc = bit_field(regs.ecx, 12, 4);
    if size == 0 || assoc == 0 {
        return false;
    }
    caches.fill(CacheLevel::L2, legacy_descriptor(size, amd_assoc(assoc), bit_field(regs.ecx, 0, 8), CacheSource::Legacy))
}

/// Leaf 2 cache descriptors: (descriptor, level, size in KiB, ways, line size)
#[rustfmt::skip]
static INTEL_CACHE_DESCRIPTORS : &[(u8, CacheLevel, u32, u32, u32)] = &[
    (0x06, CacheLevel::L1Instruction,     8,  4, 32),
    (0x08, CacheLevel::L1Instruction,    16,  4, 32),
    (0x09, CacheLevel::L1Instruction,    32,  4, 64),
    (0x0A, CacheLevel::L1Data,            8,  2, 32),
    (0x0C, CacheLevel::L1Data,           16,  4, 32),
    (0x0D, CacheLevel::L1Data,           16,  4, 64),
    (0x0E, CacheLevel::L1Data,           24,  6, 64),
    (0x1D, CacheLevel::L2,              128,  2, 64),
    (0x21, CacheLevel::L2,              256,  8, 64),
    (0x22, CacheLevel::L3,              512,  4, 64),
    (0x23, CacheLevel::L3,             1024,  8, 64),
    (0x24, CacheLevel::L2,             1024, 16, 64),
    (0x25, CacheLevel::L3,             2048,  8, 64),
    (0x29, CacheLevel::L3,             4096,  8, 64),
    (0x2C, CacheLevel::L1Data,           32,  8, 64),
    (0x30, CacheLevel::L1Instruction,    32,  8, 64),
    (0x39, CacheLevel::L2,              128,  4, 64),
    (0x3A, CacheLevel::L2,              192,  6, 64),
    (0x3B, CacheLevel::L2,              128,  2, 64),
    (0x3C, CacheLevel::L2,              256,  4, 64),
    (0x3D, CacheLevel::L2,              384,  6, 64),
    (0x3E, CacheLevel::L2,              512,  4, 64),
    (0x41, CacheLevel::L2,              128,  4, 32),
    (0x42, CacheLevel::L2,              256,  4, 32),
    (0x43, CacheLevel::L2,              512,  4, 32),
    (0x44, CacheLevel::L2,             1024,  4, 32),
    (0x45, CacheLevel::L2,             2048,  4, 32),
    (0x46, CacheLevel::L3,             4096,  4, 64),
    (0x47, CacheLevel::L3,             8192,  8, 64),
    (0x48, CacheLevel::L2,             3072, 12, 64),
    (0x4A, CacheLevel::L3,             6144, 12, 64),
    (0x4B, CacheLevel::L3,             8192, 16, 64),
    (0x4C, CacheLevel::L3,            12288, 12, 64),
    (0x4D, CacheLevel::L3,            16384, 16, 64),
    (0x4E, CacheLevel::L2,             6144, 24, 64),
    (0x60, CacheLevel::L1Data,           16,  8, 64),
    (0x66, CacheLevel::L1Data,            8,  4, 64),
    (0x67, CacheLevel::L1Data,           16,  4, 64),
    (0x68, CacheLevel::L1Data,           32,  4, 64),
    (0x78, CacheLevel::L2,             1024,  4, 64),
    (0x79, CacheLevel::L2,              128,  8, 64),
    (0x7A, CacheLevel::L2,              256,  8, 64),
    (0x7B, CacheLevel::L2,              512,  8, 64),
    (0x7C, CacheLevel::L2,             1024,  8, 64),
    (0x7D, CacheLevel::L2,             2048,  8, 64),
    (0x7F, CacheLevel::L2,              512,  2, 64),
    (0x80, CacheLevel::L2,              512,  8, 64),
    (0x82, CacheLevel::L2,              256,  8, 32),
    (0x83, CacheLevel::L2,              512,  8, 32),
    (0x84, CacheLevel::L2,             1024,  8, 32),
    (0x85, CacheLevel::L2,             2048,  8, 32),
    (0x86, CacheLevel::L2,              512,  4, 64),
    (0x87, CacheLevel::L2,             1024,  8, 64),
    (0xD0, CacheLevel::L3,              512,  4, 64),
    (0xD1, CacheLevel::L3,             1024,  4, 64),
    (0xD2, CacheLevel::L3,             2048,  4, 64),
    (0xD6, CacheLevel::L3,             1024,  8, 64),
    (0xD7, CacheLevel::L3,             2048,  8, 64),
    (0xD8, CacheLevel::L3,             4096,  8, 64),
    (0xDC, CacheLevel::L3,             1536, 12, 64),
    (0xDD, CacheLevel::L3,             3072, 12, 64),
    (0xDE, CacheLevel::L3,             6144, 12, 64),
    (0xE2, CacheLevel::L3,             2048, 16, 64),
    (0xE3, CacheLevel::L3,             4096, 16, 64),
    (0xE4, CacheLevel::L3,             8192, 16, 64),
    (0xEA, CacheLevel::L3,            12288, 24, 64),
    (0xEB, CacheLevel::L3,            18432, 24, 64),
    (0xEC, CacheLevel::L3,            24576, 24, 64),
];

fn decode_intel_descriptors(raw: &RawCpuData, caches: &mut Caches) -> bool {
    let Some(regs) = raw.leaf(2, 0) else { return false };

    let mut any = false;
    for (reg_idx, reg) in [regs.eax, regs.ebx, regs.ecx, regs.edx].into_iter().enumerate() {
        // Bit 31 set means the register holds no descriptors
        if is_bit_set(reg, 31) {
            continue;
        }
        for (byte_idx, descriptor) in reg.to_le_bytes().into_iter().enumerate() {
            // The lowest byte of EAX is the iteration count
            if reg_idx == 0 && byte_idx == 0 {
                continue;
            }
            if let Some((_, level, size, ways, line)) = INTEL_CACHE_DESCRIPTORS.iter().find(|entry| entry.0 == descriptor) {
                any |= caches.fill(*level, legacy_descriptor(*size, Some(*ways), *line, CacheSource::Descriptor));
            }
        }
    }
    any
}

/// Decode the CCSIDR values for all cache levels reported in CLIDR
fn decode_arm(raw: &RawCpuData, caches: &mut Caches) {
    let Some(clidr) = raw.arm_register(ArmRegister::Clidr) else { return };

    for level in 1..=4u32 {
        let ctype = bit_field64(clidr, (level - 1) * 3, 3);
        // 1: instruction only, 2: data only, 3: separate, 4: unified
        let entries: &[(bool, CacheLevel)] = match (level, ctype) {
            (_, 0)    => break,
            (1, 1)    => &[(true, CacheLevel::L1Instruction)],
            (1, 2)    => &[(false, CacheLevel::L1Data)],
            (1, 3)    => &[(false, CacheLevel::L1Data), (true, CacheLevel::L1Instruction)],
            (1, _)    => &[(false, CacheLevel::L1Data)],
            (2, 2..=4) => &[(false, CacheLevel::L2)],
            (3, 2..=4) => &[(false, CacheLevel::L3)],
            (4, 2..=4) => &[(false, CacheLevel::L4)],
            _         => &[],
        };

        for (is_instruction, cache_level) in entries {
            let idx = ((level - 1) << 1) as usize | *is_instruction as usize;
            if let Some(desc) = raw.arm_ccsidr(idx).and_then(ccsidr_descriptor) {
                caches.fill(*cache_level, desc);
            }
        }
    }
}

fn ccsidr_descriptor(ccsidr: u64) -> Option<CacheDescriptor> {
    let line_size = 1u32 << (bit_field64(ccsidr, 0, 3) + 4);
    let ways = bit_field64(ccsidr, 3, 10) as u32 + 1;
    let sets = bit_field64(ccsidr, 13, 15) + 1;
    Some(CacheDescriptor {
        size_kb: Some(size_in_kib(u64::from(line_size) * u64::from(ways) * sets)?),
        associativity: Some(ways),
        line_size: Some(line_size),
        instances: None,
        source: Some(CacheSource::ArmCcsidr),
    })
}
