//! Raw CPUID register capture
//! 
//! Captured values are stored per bucket, each bucket covering a range of leaves or the subleaves of a single leaf.
//! Snapshots of the captured data can be written to and read from a simple text format:
//! 
//! ```text
//! # comment
//! basic[0]=0000000d 756e6547 6c65746e 49656e69
//! arm_midr=00000000410fd083
//! arm_ccsidr[0]=00000000700fe01a
//! ```

use core::fmt;
use std::{io, path::Path};

use cpuident_base::{EnumCountT, EnumFromNameT, EnumIndexT};
use cpuident_logging::{log_warning, log_verbose};
use cpuident_macros::{EnumCount, EnumDisplay, EnumFromName, EnumIndex};
use static_assertions::const_assert;

use crate::{Error, Result, LOG_CAT};

/// Maximum number of basic leaves that can be stored.
pub const MAX_BASIC_LEAVES      : usize = 32;
/// Maximum number of extended leaves that can be stored.
pub const MAX_EXTENDED_LEAVES   : usize = 32;
/// Maximum number of hypervisor leaves that can be stored.
pub const MAX_HYPERVISOR_LEAVES : usize = 8;
/// Maximum number of cache descriptors that can be stored for the deterministic cache leaves.
pub const MAX_CACHE_SUBLEAVES   : usize = 8;
/// Maximum number of CCSIDR values that can be stored, 1 per cache level and type
pub const MAX_ARM_CCSIDR        : usize = 8;

const MAX_BUCKET_CAPACITY : usize = 32;
const_assert!(MAX_BASIC_LEAVES <= MAX_BUCKET_CAPACITY);
const_assert!(MAX_EXTENDED_LEAVES <= MAX_BUCKET_CAPACITY);

pub(crate) const HYPERVISOR_LEAF_BASE : u32 = 0x4000_0000;
pub(crate) const EXTENDED_LEAF_BASE   : u32 = 0x8000_0000;

/// CPUID register selector
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumDisplay)]
pub enum Register {
    #[display("EAX")]
    Eax,
    #[display("EBX")]
    Ebx,
    #[display("ECX")]
    Ecx,
    #[display("EDX")]
    Edx,
}

/// Registers returned by a single CPUID query
#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub struct Registers {
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl Registers {
    pub const fn new(eax: u32, ebx: u32, ecx: u32, edx: u32) -> Self {
        Self { eax, ebx, ecx, edx }
    }

    pub const fn get(&self, reg: Register) -> u32 {
        match reg {
            Register::Eax => self.eax,
            Register::Ebx => self.ebx,
            Register::Ecx => self.ecx,
            Register::Edx => self.edx,
        }
    }

    /// Get the bytes of the given registers, in register order
    pub fn bytes<const N: usize>(&self, order: [Register; N]) -> Vec<u8> {
        order.iter().flat_map(|reg| self.get(*reg).to_le_bytes()).collect()
    }
}

/// Storage bucket of raw x86 data
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumCount, EnumIndex, EnumDisplay, EnumFromName)]
pub enum RawBucket {
    /// Basic leaves `0x0000_0000 + i`
    #[display("basic")]
    Basic,
    /// Extended leaves `0x8000_0000 + i`
    #[display("extended")]
    Extended,
    /// Hypervisor leaves `0x4000_0000 + i`
    #[display("hypervisor")]
    Hypervisor,
    /// Deterministic cache parameters, leaf 4
    #[display("intel_fn4")]
    IntelFn4,
    /// Structured extended features, leaf 7
    #[display("intel_fn7")]
    IntelFn7,
    /// Extended topology, leaf 0xB
    #[display("intel_fn11")]
    IntelFn11,
    /// Processor extended state, leaf 0xD
    #[display("intel_fn13")]
    IntelFn13,
    /// SGX capabilities and EPC sections, leaf 0x12
    #[display("intel_fn12h")]
    IntelFn12h,
    /// Processor trace, leaf 0x14
    #[display("intel_fn14h")]
    IntelFn14h,
    /// AMD cache topology, leaf 0x8000_001D
    #[display("amd_fn8000001dh")]
    AmdFn8000001Dh,
}

impl RawBucket {
    /// Number of entries the bucket can hold
    pub const fn capacity(self) -> usize {
        match self {
            RawBucket::Basic          => MAX_BASIC_LEAVES,
            RawBucket::Extended       => MAX_EXTENDED_LEAVES,
            RawBucket::Hypervisor     => MAX_HYPERVISOR_LEAVES,
            RawBucket::IntelFn4       => MAX_CACHE_SUBLEAVES,
            RawBucket::IntelFn7       => 4,
            RawBucket::IntelFn11      => 4,
            RawBucket::IntelFn13      => 4,
            RawBucket::IntelFn12h     => 8,
            RawBucket::IntelFn14h     => 4,
            RawBucket::AmdFn8000001Dh => MAX_CACHE_SUBLEAVES,
        }
    }

    /// Get the bucket and index a leaf/subleaf pair is stored at, leaves without subleaves are only stored for subleaf 0.
    pub fn locate(leaf: u32, subleaf: u32) -> Option<(RawBucket, usize)> {
        let (bucket, idx) = match leaf {
            0x4                                      => (RawBucket::IntelFn4, subleaf),
            0x7                                      => (RawBucket::IntelFn7, subleaf),
            0xB                                      => (RawBucket::IntelFn11, subleaf),
            0xD                                      => (RawBucket::IntelFn13, subleaf),
            0x12                                     => (RawBucket::IntelFn12h, subleaf),
            0x14                                     => (RawBucket::IntelFn14h, subleaf),
            0x8000_001D                              => (RawBucket::AmdFn8000001Dh, subleaf),
            _ if subleaf != 0                        => return None,
            _ if leaf >= EXTENDED_LEAF_BASE          => (RawBucket::Extended, leaf - EXTENDED_LEAF_BASE),
            _ if leaf >= HYPERVISOR_LEAF_BASE        => (RawBucket::Hypervisor, leaf - HYPERVISOR_LEAF_BASE),
            _                                        => (RawBucket::Basic, leaf),
        };
        let idx = idx as usize;
        (idx < bucket.capacity()).then_some((bucket, idx))
    }

    /// Get the leaf/subleaf pair stored at the given index of this bucket
    pub const fn leaf_at(self, idx: usize) -> (u32, u32) {
        let idx = idx as u32;
        match self {
            RawBucket::Basic          => (idx, 0),
            RawBucket::Extended       => (EXTENDED_LEAF_BASE + idx, 0),
            RawBucket::Hypervisor     => (HYPERVISOR_LEAF_BASE + idx, 0),
            RawBucket::IntelFn4       => (0x4, idx),
            RawBucket::IntelFn7       => (0x7, idx),
            RawBucket::IntelFn11      => (0xB, idx),
            RawBucket::IntelFn13      => (0xD, idx),
            RawBucket::IntelFn12h     => (0x12, idx),
            RawBucket::IntelFn14h     => (0x14, idx),
            RawBucket::AmdFn8000001Dh => (0x8000_001D, idx),
        }
    }
}

/// AArch64 identification system registers
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumCount, EnumIndex, EnumDisplay, EnumFromName)]
pub enum ArmRegister {
    /// Main ID register
    #[display("midr")]
    Midr,
    /// Multiprocessor affinity register
    #[display("mpidr")]
    Mpidr,
    /// Revision ID register
    #[display("revidr")]
    Revidr,
    #[display("id_aa64pfr0")]
    IdAa64Pfr0,
    #[display("id_aa64pfr1")]
    IdAa64Pfr1,
    #[display("id_aa64isar0")]
    IdAa64Isar0,
    #[display("id_aa64isar1")]
    IdAa64Isar1,
    #[display("id_aa64isar2")]
    IdAa64Isar2,
    #[display("id_aa64mmfr0")]
    IdAa64Mmfr0,
    /// SVE feature ID register
    #[display("id_aa64zfr0")]
    IdAa64Zfr0,
    /// Cache type register
    #[display("ctr")]
    Ctr,
    /// Cache level ID register
    #[display("clidr")]
    Clidr,
}

type Bucket = [Option<Registers>; MAX_BUCKET_CAPACITY];

/// Raw data captured from the CPU.
/// 
/// The data is immutable once captured, decoding never queries the CPU again.
#[derive(Clone, PartialEq, Eq)]
pub struct RawCpuData {
    buckets:    [Bucket; RawBucket::COUNT],
    arm:        [Option<u64>; ArmRegister::COUNT],
    arm_ccsidr: [Option<u64>; MAX_ARM_CCSIDR],
}

impl RawCpuData {
    /// Create empty raw data, nothing is captured.
    pub const fn new() -> Self {
        Self {
            buckets: [[None; MAX_BUCKET_CAPACITY]; RawBucket::COUNT],
            arm: [None; ArmRegister::COUNT],
            arm_ccsidr: [None; MAX_ARM_CCSIDR],
        }
    }

    /// Get the registers of a leaf/subleaf, `None` if it wasn't captured.
    pub fn leaf(&self, leaf: u32, subleaf: u32) -> Option<Registers> {
        let (bucket, idx) = RawBucket::locate(leaf, subleaf)?;
        self.buckets[bucket.to_idx()][idx]
    }

    /// Store the registers of a leaf/subleaf, returns `false` if it does not fit in its bucket.
    pub fn set_leaf(&mut self, leaf: u32, subleaf: u32, regs: Registers) -> bool {
        match RawBucket::locate(leaf, subleaf) {
            Some((bucket, idx)) => {
                self.buckets[bucket.to_idx()][idx] = Some(regs);
                true
            },
            None => false,
        }
    }

    /// Builder version of [`RawCpuData::set_leaf`], leaves that don't fit are dropped.
    pub fn with_leaf(mut self, leaf: u32, subleaf: u32, regs: Registers) -> Self {
        self.set_leaf(leaf, subleaf, regs);
        self
    }

    /// Remove a leaf/subleaf from the captured data
    pub fn clear_leaf(&mut self, leaf: u32, subleaf: u32) {
        if let Some((bucket, idx)) = RawBucket::locate(leaf, subleaf) {
            self.buckets[bucket.to_idx()][idx] = None;
        }
    }

    /// Get the entries of a bucket, limited to its capacity
    pub fn bucket(&self, bucket: RawBucket) -> &[Option<Registers>] {
        &self.buckets[bucket.to_idx()][..bucket.capacity()]
    }

    /// Get the captured entries of a bucket until the first entry that wasn't captured
    pub fn bucket_entries(&self, bucket: RawBucket) -> impl Iterator<Item = Registers> + '_ {
        self.bucket(bucket).iter().map_while(|regs| *regs)
    }

    pub fn arm_register(&self, reg: ArmRegister) -> Option<u64> {
        self.arm[reg.to_idx()]
    }

    pub fn set_arm_register(&mut self, reg: ArmRegister, value: u64) {
        self.arm[reg.to_idx()] = Some(value);
    }

    pub fn with_arm_register(mut self, reg: ArmRegister, value: u64) -> Self {
        self.set_arm_register(reg, value);
        self
    }

    /// Get the CCSIDR for a given CSSELR index (`(level - 1) << 1 | is_instruction`)
    pub fn arm_ccsidr(&self, idx: usize) -> Option<u64> {
        self.arm_ccsidr.get(idx).copied().flatten()
    }

    pub fn set_arm_ccsidr(&mut self, idx: usize, value: u64) -> bool {
        match self.arm_ccsidr.get_mut(idx) {
            Some(slot) => {
                *slot = Some(value);
                true
            },
            None => false,
        }
    }

    /// Check if no x86 leaf or ARM register was captured.
    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(|bucket| bucket.iter().all(Option::is_none)) &&
        self.arm.iter().all(Option::is_none) &&
        self.arm_ccsidr.iter().all(Option::is_none)
    }

    /// Highest basic leaf reported by leaf 0
    pub fn max_basic_leaf(&self) -> Option<u32> {
        self.leaf(0, 0).map(|regs| regs.eax)
    }

    /// Highest extended leaf reported by leaf 0x8000_0000
    pub fn max_extended_leaf(&self) -> Option<u32> {
        self.leaf(EXTENDED_LEAF_BASE, 0).map(|regs| regs.eax).filter(|max| *max >= EXTENDED_LEAF_BASE)
    }

    /// Write the captured data in the snapshot text format
    pub fn serialize<W: io::Write>(&self, mut writer: W) -> Result<()> {
        writeln!(writer, "# cpuident raw data, version {}", crate::version())?;
        for bucket_idx in 0..RawBucket::COUNT {
            let Some(bucket) = RawBucket::from_idx(bucket_idx) else { continue };
            for (idx, regs) in self.bucket(bucket).iter().enumerate() {
                if let Some(regs) = regs {
                    writeln!(writer, "{bucket}[{idx}]={:08x} {:08x} {:08x} {:08x}", regs.eax, regs.ebx, regs.ecx, regs.edx)?;
                }
            }
        }
        for reg_idx in 0..ArmRegister::COUNT {
            let Some(reg) = ArmRegister::from_idx(reg_idx) else { continue };
            if let Some(value) = self.arm_register(reg) {
                writeln!(writer, "arm_{reg}={value:016x}")?;
            }
        }
        for (idx, value) in self.arm_ccsidr.iter().enumerate() {
            if let Some(value) = value {
                writeln!(writer, "arm_ccsidr[{idx}]={value:016x}")?;
            }
        }
        Ok(())
    }

    /// Parse data in the snapshot text format
    pub fn deserialize(text: &str) -> Result<Self> {
        let mut raw = RawCpuData::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line_nr = line_idx + 1;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let invalid = |reason: String| Error::InvalidSnapshot { line: line_nr, reason };

            let (key, value) = line.split_once('=').ok_or_else(|| invalid(format!("expected '<key>=<value>', found '{line}'")))?;
            let (name, index) = parse_key(key.trim()).map_err(invalid)?;
            let value = value.trim();

            if let Some(arm_name) = name.strip_prefix("arm_") {
                let value = u64::from_str_radix(value, 16).map_err(|err| invalid(format!("invalid ARM register value '{value}': {err}")))?;
                if arm_name == "ccsidr" {
                    let idx = index.ok_or_else(|| invalid("'arm_ccsidr' requires an index".to_string()))?;
                    if !raw.set_arm_ccsidr(idx, value) {
                        return Err(invalid(format!("CCSIDR index {idx} exceeds capacity {MAX_ARM_CCSIDR}")));
                    }
                } else {
                    let reg = ArmRegister::parse(arm_name).ok_or_else(|| invalid(format!("unknown ARM register '{arm_name}'")))?;
                    raw.set_arm_register(reg, value);
                }
                continue;
            }

            let bucket = RawBucket::parse(name).ok_or_else(|| invalid(format!("unknown bucket '{name}'")))?;
            let idx = index.ok_or_else(|| invalid(format!("bucket '{name}' requires an index")))?;
            if idx >= bucket.capacity() {
                return Err(invalid(format!("index {idx} exceeds capacity {} of bucket '{bucket}'", bucket.capacity())));
            }

            let mut words = [0u32; 4];
            let mut parts = value.split_whitespace();
            for word in &mut words {
                let part = parts.next().ok_or_else(|| invalid("expected 4 register values".to_string()))?;
                *word = u32::from_str_radix(part, 16).map_err(|err| invalid(format!("invalid register value '{part}': {err}")))?;
            }
            if parts.next().is_some() {
                return Err(invalid("expected 4 register values".to_string()));
            }

            raw.buckets[bucket.to_idx()][idx] = Some(Registers::new(words[0], words[1], words[2], words[3]));
        }
        Ok(raw)
    }

    /// Load a snapshot from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::deserialize(&text)
    }

    /// Save a snapshot to a file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let file = std::fs::File::create(path.as_ref())?;
        self.serialize(io::BufWriter::new(file))
    }
}

impl Default for RawCpuData {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawCpuData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut buf = Vec::new();
        self.serialize(&mut buf).map_err(|_| fmt::Error)?;
        f.write_str(&String::from_utf8_lossy(&buf))
    }
}

/// Split `name[index]` into its name and index.
fn parse_key(key: &str) -> core::result::Result<(&str, Option<usize>), String> {
    match key.split_once('[') {
        Some((name, rest)) => {
            let idx = rest.strip_suffix(']').ok_or_else(|| format!("missing ']' in '{key}'"))?;
            let idx = idx.parse::<usize>().map_err(|err| format!("invalid index '{idx}': {err}"))?;
            Ok((name, Some(idx)))
        },
        None => Ok((key, None)),
    }
}

/// Number of entries that will be captured, warns when the CPU reports more leaves than can be stored.
fn clip_count(bucket: RawBucket, reported: u32) -> usize {
    let reported = reported as usize;
    if reported > bucket.capacity() {
        log_warning!(LOG_CAT, "CPU reports {} entries for bucket '{}', only {} will be captured", reported, bucket, bucket.capacity());
    }
    reported.min(bucket.capacity())
}

/// Capture all leaves using the given query function.
/// 
/// Used on live hardware, the query is a separate function so capture can be tested with a fake CPU.
pub(crate) fn capture_with<F: FnMut(u32, u32) -> Registers>(mut query: F) -> RawCpuData {
    let mut raw = RawCpuData::new();

    let leaf0 = query(0, 0);
    let max_basic = leaf0.eax;
    // Leaves with subleaves are captured into their own bucket below
    for leaf in 0..clip_count(RawBucket::Basic, max_basic.saturating_add(1)) as u32 {
        if is_plain_leaf(leaf) {
            raw.set_leaf(leaf, 0, if leaf == 0 { leaf0 } else { query(leaf, 0) });
        }
    }

    let max_extended = query(EXTENDED_LEAF_BASE, 0).eax;
    if max_extended >= EXTENDED_LEAF_BASE {
        for idx in 0..clip_count(RawBucket::Extended, max_extended - EXTENDED_LEAF_BASE + 1) as u32 {
            let leaf = EXTENDED_LEAF_BASE + idx;
            if is_plain_leaf(leaf) {
                raw.set_leaf(leaf, 0, query(leaf, 0));
            }
        }
    }

    let hypervisor_present = raw.leaf(1, 0).map_or(false, |regs| regs.ecx & (1 << 31) != 0);
    if hypervisor_present {
        let max_hypervisor = query(HYPERVISOR_LEAF_BASE, 0).eax;
        let count = if max_hypervisor >= HYPERVISOR_LEAF_BASE { max_hypervisor - HYPERVISOR_LEAF_BASE + 1 } else { 1 };
        for idx in 0..clip_count(RawBucket::Hypervisor, count) as u32 {
            raw.set_leaf(HYPERVISOR_LEAF_BASE + idx, 0, query(HYPERVISOR_LEAF_BASE + idx, 0));
        }
    }

    if max_basic >= 0x4 {
        capture_until(&mut raw, &mut query, 0x4, |regs| regs.eax & 0x1F == 0);
    }

    let leaf7 = if max_basic >= 0x7 { Some(query(0x7, 0)) } else { None };
    if let Some(leaf7) = leaf7 {
        for subleaf in 0..clip_count(RawBucket::IntelFn7, leaf7.eax.saturating_add(1)) as u32 {
            raw.set_leaf(0x7, subleaf, if subleaf == 0 { leaf7 } else { query(0x7, subleaf) });
        }
    }

    if max_basic >= 0xB {
        capture_until(&mut raw, &mut query, 0xB, |regs| (regs.ecx >> 8) & 0xFF == 0);
    }

    if max_basic >= 0xD {
        for subleaf in 0..RawBucket::IntelFn13.capacity() as u32 {
            raw.set_leaf(0xD, subleaf, query(0xD, subleaf));
        }
    }

    let has_sgx = leaf7.map_or(false, |regs| regs.ebx & (1 << 2) != 0);
    if max_basic >= 0x12 && has_sgx {
        for subleaf in 0..RawBucket::IntelFn12h.capacity() as u32 {
            let regs = query(0x12, subleaf);
            // Subleaves 2 and up describe EPC sections, a type of 0 ends the list
            if subleaf >= 2 && regs.eax & 0xF == 0 {
                break;
            }
            raw.set_leaf(0x12, subleaf, regs);
        }
    }

    let has_processor_trace = leaf7.map_or(false, |regs| regs.ebx & (1 << 25) != 0);
    if max_basic >= 0x14 && has_processor_trace {
        let leaf14 = query(0x14, 0);
        for subleaf in 0..clip_count(RawBucket::IntelFn14h, leaf14.eax.saturating_add(1)) as u32 {
            raw.set_leaf(0x14, subleaf, if subleaf == 0 { leaf14 } else { query(0x14, subleaf) });
        }
    }

    if max_extended >= 0x8000_001D {
        capture_until(&mut raw, &mut query, 0x8000_001D, |regs| regs.eax & 0x1F == 0);
    }

    log_verbose!(LOG_CAT, "Captured raw CPUID data, max basic leaf 0x{:X}, max extended leaf 0x{:X}", max_basic, max_extended);
    raw
}

fn is_plain_leaf(leaf: u32) -> bool {
    matches!(RawBucket::locate(leaf, 0), Some((RawBucket::Basic | RawBucket::Extended | RawBucket::Hypervisor, _)))
}

/// Capture subleaves of a leaf until the terminator is returned or the bucket is full.
fn capture_until<F, T>(raw: &mut RawCpuData, query: &mut F, leaf: u32, is_terminator: T)
where
    F: FnMut(u32, u32) -> Registers,
    T: Fn(&Registers) -> bool,
{
    let Some((bucket, _)) = RawBucket::locate(leaf, 0) else { return };
    for subleaf in 0..bucket.capacity() as u32 {
        let regs = query(leaf, subleaf);
        if is_terminator(&regs) {
            return;
        }
        raw.set_leaf(leaf, subleaf, regs);
    }
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
mod x86 {
    #[cfg(target_arch = "x86")]
    use core::arch::x86::__cpuid_count;
    #[cfg(target_arch = "x86_64")]
    use core::arch::x86_64::__cpuid_count;

    use super::Registers;

    /// Check if the `cpuid` instruction can be used, only pre-Pentium 32-bit CPUs lack it.
    #[cfg(target_arch = "x86")]
    pub fn cpuid_present() -> bool {
        core::arch::x86::has_cpuid()
    }

    #[cfg(target_arch = "x86_64")]
    pub fn cpuid_present() -> bool {
        true
    }

    #[allow(unused_unsafe)]
    pub fn query(leaf: u32, subleaf: u32) -> Registers {
        // SAFETY: `cpuid` is available, this is checked by `cpuid_present` before any query is issued
        let res = unsafe { __cpuid_count(leaf, subleaf) };
        Registers::new(res.eax, res.ebx, res.ecx, res.edx)
    }
}

#[cfg(all(target_arch = "aarch64", target_os = "linux"))]
mod arm {
    use core::arch::asm;

    use super::{ArmRegister, RawCpuData};

    macro_rules! read_sysreg {
        ($name:literal) => {{
            let value: u64;
            // SAFETY: Linux traps and emulates EL0 reads of the ID registers
            unsafe { asm!(concat!("mrs {}, ", $name), out(reg) value, options(nomem, nostack, preserves_flags)) };
            value
        }};
    }

    /// Read all identification registers that are accessible from user space.
    /// 
    /// CLIDR and CCSIDR are not exposed to user space, so these can only come from a snapshot.
    pub fn capture() -> RawCpuData {
        let mut raw = RawCpuData::new();
        raw.set_arm_register(ArmRegister::Midr, read_sysreg!("MIDR_EL1"));
        raw.set_arm_register(ArmRegister::Mpidr, read_sysreg!("MPIDR_EL1"));
        raw.set_arm_register(ArmRegister::Revidr, read_sysreg!("REVIDR_EL1"));
        raw.set_arm_register(ArmRegister::IdAa64Pfr0, read_sysreg!("ID_AA64PFR0_EL1"));
        raw.set_arm_register(ArmRegister::IdAa64Pfr1, read_sysreg!("ID_AA64PFR1_EL1"));
        raw.set_arm_register(ArmRegister::IdAa64Isar0, read_sysreg!("ID_AA64ISAR0_EL1"));
        raw.set_arm_register(ArmRegister::IdAa64Isar1, read_sysreg!("ID_AA64ISAR1_EL1"));
        // ID_AA64ISAR2_EL1 and ID_AA64ZFR0_EL1, by encoding as older assemblers don't know the names
        raw.set_arm_register(ArmRegister::IdAa64Isar2, read_sysreg!("S3_0_C0_C6_2"));
        raw.set_arm_register(ArmRegister::IdAa64Zfr0, read_sysreg!("S3_0_C0_C4_4"));
        raw.set_arm_register(ArmRegister::IdAa64Mmfr0, read_sysreg!("ID_AA64MMFR0_EL1"));
        raw.set_arm_register(ArmRegister::Ctr, read_sysreg!("CTR_EL0"));
        raw
    }
}

cfg_if::cfg_if! {
    if #[cfg(any(target_arch = "x86", target_arch = "x86_64"))] {
        /// Check if the CPU can be queried for identification data.
        pub fn cpuid_present() -> bool {
            x86::cpuid_present()
        }

        /// Capture the raw identification data of the CPU the current thread runs on.
        pub fn capture_raw() -> Result<RawCpuData> {
            if !x86::cpuid_present() {
                return Err(Error::InstructionUnsupported);
            }
            Ok(capture_with(x86::query))
        }
    } else if #[cfg(all(target_arch = "aarch64", target_os = "linux"))] {
        /// Check if the CPU can be queried for identification data.
        pub fn cpuid_present() -> bool {
            true
        }

        /// Capture the raw identification data of the CPU the current thread runs on.
        pub fn capture_raw() -> Result<RawCpuData> {
            Ok(arm::capture())
        }
    } else {
        /// Check if the CPU can be queried for identification data.
        pub fn cpuid_present() -> bool {
            false
        }

        /// Capture the raw identification data of the CPU the current thread runs on.
        pub fn capture_raw() -> Result<RawCpuData> {
            Err(Error::UnsupportedPlatform)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_data;

    #[test]
    fn leaf_lookup_uses_buckets() {
        let raw = RawCpuData::new()
            .with_leaf(0x4, 2, Registers::new(1, 2, 3, 4))
            .with_leaf(0x8000_0002, 0, Registers::new(5, 6, 7, 8))
            .with_leaf(0x4000_0000, 0, Registers::new(9, 10, 11, 12));

        assert_eq!(raw.leaf(0x4, 2), Some(Registers::new(1, 2, 3, 4)));
        assert_eq!(raw.leaf(0x8000_0002, 0), Some(Registers::new(5, 6, 7, 8)));
        assert_eq!(raw.leaf(0x4000_0000, 0), Some(Registers::new(9, 10, 11, 12)));
        assert_eq!(raw.bucket(RawBucket::IntelFn4)[2], Some(Registers::new(1, 2, 3, 4)));
        assert_eq!(raw.leaf(0x4, 1), None);
        // Leaves without subleaves are only stored at subleaf 0
        assert_eq!(raw.leaf(0x8000_0002, 1), None);
    }

    #[test]
    fn out_of_capacity_is_dropped() {
        let mut raw = RawCpuData::new();
        assert!(!raw.set_leaf(MAX_BASIC_LEAVES as u32, 0, Registers::default()));
        assert!(!raw.set_leaf(0x7, 4, Registers::default()));
        assert!(!raw.set_arm_ccsidr(MAX_ARM_CCSIDR, 0));
        assert!(raw.is_empty());
        assert_eq!(raw.leaf(0x4000_0010, 0), None);
    }

    #[test]
    fn snapshot_roundtrip_preserves_data() {
        let raw = test_data::intel_kaby_lake_u();
        let mut text = Vec::new();
        raw.serialize(&mut text).unwrap();

        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("basic[0]=00000016 756e6547 6c65746e 49656e69"));
        assert_eq!(RawCpuData::deserialize(&text).unwrap(), raw);

        let arm = test_data::arm_cortex_a72();
        let mut text = Vec::new();
        arm.serialize(&mut text).unwrap();
        let text = String::from_utf8(text).unwrap();
        assert!(text.contains("arm_midr=00000000410fd083"));
        assert_eq!(RawCpuData::deserialize(&text).unwrap(), arm);
    }

    #[test]
    fn snapshot_errors_report_line() {
        let err = RawCpuData::deserialize("# header\n\nbasic[0]=1 2 3\n").unwrap_err();
        assert_eq!(err, Error::InvalidSnapshot { line: 3, reason: "expected 4 register values".to_string() });

        let err = RawCpuData::deserialize("intel_fn7[4]=0 0 0 0").unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot { line: 1, .. }));

        let err = RawCpuData::deserialize("l2[0]=0 0 0 0").unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot { line: 1, ref reason } if reason.contains("unknown bucket")));

        let err = RawCpuData::deserialize("arm_foo=0").unwrap_err();
        assert!(matches!(err, Error::InvalidSnapshot { line: 1, .. }));
    }

    #[test]
    fn capture_is_clipped_to_capacity() {
        // Fake CPU reporting far more leaves than can be stored, returning the leaf as every register
        let raw = capture_with(|leaf, subleaf| match (leaf, subleaf) {
            (0, _)                  => Registers::new(0x40, 0, 0, 0),
            (0x8000_0000, _)        => Registers::new(0x8000_0040, 0, 0, 0),
            (0x4, _)                => Registers::new(0x21, 0, 0, 0),
            (0x7, 0)                => Registers::new(10, 0, 0, 0),
            (0xB, sub) if sub < 2   => Registers::new(0, 0, (sub + 1) << 8, 0),
            (0x8000_001D, _)        => Registers::new(0, 0, 0, 0),
            (leaf, _)               => Registers::new(leaf, leaf, leaf, leaf),
        });

        // Leaves 4, 7, 0xB, 0xD, 0x12 and 0x14 live in their own buckets, as does 0x8000_001D
        assert_eq!(raw.bucket(RawBucket::Basic).iter().flatten().count(), MAX_BASIC_LEAVES - 6);
        assert_eq!(raw.bucket(RawBucket::Extended).iter().flatten().count(), MAX_EXTENDED_LEAVES - 1);
        assert_eq!(raw.leaf(0x1F, 0), Some(Registers::new(0x1F, 0x1F, 0x1F, 0x1F)));
        assert_eq!(raw.leaf(0x20, 0), None);
        assert_eq!(raw.bucket_entries(RawBucket::IntelFn4).count(), MAX_CACHE_SUBLEAVES);
        assert_eq!(raw.bucket_entries(RawBucket::IntelFn7).count(), 4);
        assert_eq!(raw.bucket_entries(RawBucket::IntelFn11).count(), 2);
        assert_eq!(raw.bucket_entries(RawBucket::AmdFn8000001Dh).count(), 0);
        // No hypervisor bit, no SGX bit
        assert_eq!(raw.bucket_entries(RawBucket::Hypervisor).count(), 0);
        assert_eq!(raw.bucket_entries(RawBucket::IntelFn12h).count(), 0);
    }
}
