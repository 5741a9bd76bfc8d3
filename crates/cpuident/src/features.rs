//! Table driven feature decoding
//! 
//! Every feature is a single bit (x86) or a minimum field value (AArch64) in the captured raw data.
//! Some bits have a different meaning depending on the vendor, these are only decoded for the matching vendor.

use core::fmt;

use cpuident_base::EnumCountT;
use cpuident_common::{collections::EnumSet, utils::{bit_field64, is_bit_set}};
use cpuident_macros::{EnumCount, EnumDisplay, EnumFromName, EnumIndex};
use static_assertions::const_assert;

use crate::{
    raw::{ArmRegister, RawCpuData, Register},
    Architecture, Vendor,
};

/// CPU feature flag
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, EnumCount, EnumIndex, EnumDisplay, EnumFromName)]
pub enum CpuFeature {
    // x86: cpuid(1).edx
    /// Onboard x87 FPU
    FPU,
    /// Virtual 8086 mode extensions
    VME,
    /// Debugging extensions
    DE,
    /// Page size extensions (4 MiB pages)
    PSE,
    /// Time stamp counter
    TSC,
    /// Model-specific registers
    MSR,
    /// Physical address extensions
    PAE,
    /// Machine check exception
    MCE,
    /// `CMPXCHG8B`
    CX8,
    /// Onboard APIC
    APIC,
    /// Memory type range registers
    MTRR,
    /// `SYSENTER`/`SYSEXIT`
    SEP,
    /// Page global enable
    PGE,
    /// Machine check architecture
    MCA,
    /// Conditional moves
    CMOV,
    /// Page attribute table
    PAT,
    /// 36-bit page size extensions
    PSE36,
    /// Processor serial number
    PN,
    /// `CLFLUSH`
    CLFLUSH,
    /// Debug store
    DTS,
    /// Thermal control MSRs for ACPI
    ACPI,
    MMX,
    /// `FXSAVE`/`FXRSTOR`
    FXSR,
    SSE,
    SSE2,
    /// Self-snoop
    SS,
    /// Hyper-threading
    HT,
    /// Thermal monitor
    TM,
    /// IA64 processor emulating x86
    IA64,
    /// Pending break enable
    PBE,

    // x86: cpuid(1).ecx
    /// SSE3
    PNI,
    /// `PCLMULQDQ`
    PCLMUL,
    /// 64-bit debug store
    DTS64,
    /// `MONITOR`/`MWAIT`
    MONITOR,
    /// CPL qualified debug store
    DS_CPL,
    /// Virtual machine extensions
    VMX,
    /// Safer mode extensions
    SMX,
    /// Enhanced SpeedStep
    EST,
    /// Thermal monitor 2
    TM2,
    SSSE3,
    /// L1 context ID
    CID,
    FMA3,
    /// `CMPXCHG16B`
    CX16,
    /// Can disable sending task priority messages
    XTPR,
    /// Perfmon & debug capability
    PDCM,
    /// Process context identifiers
    PCID,
    /// Direct cache access for DMA writes
    DCA,
    SSE4_1,
    SSE4_2,
    X2APIC,
    MOVBE,
    POPCNT,
    TSC_DEADLINE,
    AES,
    XSAVE,
    /// `XSAVE` enabled by the OS
    OSXSAVE,
    AVX,
    F16C,
    RDRAND,
    /// Running under a hypervisor
    HYPERVISOR,

    // x86: cpuid(0x8000_0001)
    /// `SYSCALL`/`SYSRET`
    SYSCALL,
    /// Execute disable bit (Intel)
    XD,
    /// No-execute bit (AMD)
    NX,
    /// AMD extended MMX
    MMXEXT,
    #[display("3DNOW")]
    _3DNOW,
    #[display("3DNOWEXT")]
    _3DNOWEXT,
    /// `FXSAVE`/`FXRSTOR` optimizations
    FXSR_OPT,
    /// 1 GiB pages
    PDPE1GB,
    RDTSCP,
    /// Long mode (x86-64)
    LM,
    /// `LAHF`/`SAHF` in long mode
    LAHF_LM,
    /// Hyper-threading not valid
    CMP_LEGACY,
    /// Secure virtual machine
    SVM,
    /// `LZCNT`
    ABM,
    /// Misaligned SSE mode
    MISALIGNSSE,
    SSE4A,
    /// `PREFETCH`/`PREFETCHW`
    #[display("3DNOWPREFETCH")]
    _3DNOWPREFETCH,
    /// OS visible workaround
    OSVW,
    /// Instruction based sampling
    IBS,
    /// SSE5, later renamed to XOP
    SSE5,
    XOP,
    /// `SKINIT`/`STGI`
    SKINIT,
    /// Watchdog timer
    WDT,
    FMA4,
    /// Trailing bit manipulation
    TBM,
    /// Topology extensions
    TOPOEXT,
    /// Core performance counter extensions
    PERFCTR_CORE,

    // x86: cpuid(0x8000_0007).edx
    /// Temperature sensor
    TS,
    /// Frequency ID control
    FID,
    /// Voltage ID control
    VID,
    /// Thermal trip
    TTP,
    /// AMD thermal monitoring
    TM_AMD,
    /// Software thermal control
    STC,
    /// 100 MHz multiplier control
    #[display("100MHZSTEPS")]
    _100MHZSTEPS,
    /// Hardware P-state control
    HWPSTATE,
    /// Invariant TSC
    CONSTANT_TSC,
    /// Core performance boost
    CPB,
    /// `APERF`/`MPERF` MSRs
    APERFMPERF,
    /// Processor feedback interface
    PFI,
    /// Processor accumulator
    PA,

    // x86: cpuid(7, 0)
    FSGSBASE,
    /// Software guard extensions
    SGX,
    BMI1,
    /// Hardware lock elision
    HLE,
    AVX2,
    /// Supervisor mode execution prevention
    SMEP,
    BMI2,
    /// Enhanced `REP MOVSB`/`STOSB`
    ERMS,
    INVPCID,
    /// Restricted transactional memory
    RTM,
    /// Memory protection extensions
    MPX,
    AVX512F,
    AVX512DQ,
    RDSEED,
    ADX,
    /// Supervisor mode access prevention
    SMAP,
    AVX512IFMA,
    CLFLUSHOPT,
    CLWB,
    /// Processor trace
    INTEL_PT,
    AVX512PF,
    AVX512ER,
    AVX512CD,
    SHA_NI,
    AVX512BW,
    AVX512VL,
    PREFETCHWT1,
    AVX512VBMI,
    /// User mode instruction prevention
    UMIP,
    /// Memory protection keys
    PKU,
    OSPKE,
    WAITPKG,
    AVX512VBMI2,
    /// CET shadow stack
    CET_SS,
    GFNI,
    VAES,
    VPCLMULQDQ,
    AVX512VNNI,
    AVX512BITALG,
    AVX512VPOPCNTDQ,
    /// 5-level paging
    LA57,
    RDPID,
    /// SGX launch control
    SGX_LC,
    AVX512_4VNNIW,
    AVX512_4FMAPS,
    /// Fast short `REP MOVSB`
    FSRM,
    AVX512VP2INTERSECT,
    MD_CLEAR,
    SERIALIZE,
    /// Hybrid core design
    HYBRID,
    TSXLDTRK,
    PCONFIG,
    /// CET indirect branch tracking
    CET_IBT,
    AMX_BF16,
    AVX512FP16,
    AMX_TILE,
    AMX_INT8,
    IBRS_IBPB,
    STIBP,
    L1D_FLUSH,
    ARCH_CAPABILITIES,
    /// Speculative store bypass disable
    SSBD,

    // x86: cpuid(7, 1)
    AVX_VNNI,
    AVX512BF16,
    HRESET,
    /// Linear address masking
    LAM,

    // x86: cpuid(0xD, 1)
    XSAVEOPT,
    XSAVEC,
    XGETBV_ECX1,
    XSAVES,

    // x86: cpuid(0x8000_0008).ebx and cpuid(0x8000_001F).eax
    CLZERO,
    /// Instructions retired counter
    IRPERF,
    WBNOINVD,
    /// Secure memory encryption
    SME,
    /// Secure encrypted virtualization
    SEV,
    SEV_ES,

    // AArch64: ID_AA64PFR0_EL1
    /// Floating point
    FP,
    /// Advanced SIMD
    ASIMD,
    /// Half precision floating point
    FPHP,
    /// Half precision advanced SIMD
    ASIMDHP,
    /// Reliability, availability and serviceability extension
    RAS,
    /// Scalable vector extension
    SVE,
    /// Secure EL2
    SEL2,
    /// Activity monitors
    AMU,
    /// Data independent timing
    DIT,
    CSV2,
    CSV3,

    // AArch64: ID_AA64PFR1_EL1
    /// Branch target identification
    BTI,
    /// Speculative store bypass safe
    SSBS,
    /// Memory tagging extension
    MTE,
    /// Scalable matrix extension
    SME_ARM,

    // AArch64: ID_AA64ISAR0_EL1
    PMULL,
    SHA1,
    SHA2,
    SHA512,
    CRC32,
    /// Large system extension atomics
    ATOMICS,
    /// Rounding double multiply accumulate
    RDM,
    SHA3,
    SM3,
    SM4,
    DOTPROD,
    /// FMLAL/FMLSL
    FHM,
    FLAGM,
    FLAGM2,
    TLBIOS,
    /// `RNDR`/`RNDRRS`
    RNG,

    // AArch64: ID_AA64ISAR1_EL1
    /// `DC CVAP`
    DPB,
    /// `DC CVADP`
    DPB2,
    /// Pointer authentication
    PAUTH,
    JSCVT,
    FCMA,
    LRCPC,
    LRCPC2,
    FRINTTS,
    /// Speculation barrier
    SB,
    SPECRES,
    BF16,
    DGH,
    I8MM,
    XS,
    LS64,

    // AArch64: ID_AA64ISAR2_EL1
    WFXT,
    RPRES,
    MOPS,
    HBC,
    CSSC,

    // AArch64: ID_AA64MMFR0_EL1
    /// Fine grained traps
    FGT,
    /// Enhanced counter virtualization
    ECV,

    // AArch64: ID_AA64ZFR0_EL1
    SVE2,
    SVE_AES,
    SVE_PMULL,
    SVE_BITPERM,
    SVE_BF16,
    SVE_SHA3,
    SVE_SM4,
    SVE_I8MM,
    SVE_F32MM,
    SVE_F64MM,
}

/// Number of words needed to store a bit per feature
pub const FEATURE_WORDS : usize = (<CpuFeature as EnumCountT>::COUNT + 63) / 64;
const_assert!(FEATURE_WORDS * 64 >= <CpuFeature as EnumCountT>::COUNT);

/// Set of CPU features, membership tests are a single bit test.
#[derive(Clone, Copy, PartialEq, Eq, Default)]
pub struct FeatureSet(EnumSet<CpuFeature, FEATURE_WORDS>);

impl FeatureSet {
    pub const fn new() -> Self {
        Self(EnumSet::new())
    }

    pub fn contains(&self, feature: CpuFeature) -> bool {
        self.0.contains(feature)
    }

    pub fn insert(&mut self, feature: CpuFeature) -> bool {
        self.0.insert(feature)
    }

    pub fn remove(&mut self, feature: CpuFeature) -> bool {
        self.0.remove(feature)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the features, in declaration order
    pub fn iter(&self) -> impl Iterator<Item = CpuFeature> + '_ {
        self.0.iter()
    }
}

impl FromIterator<CpuFeature> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = CpuFeature>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl fmt::Debug for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

/// Space separated list of feature names
impl fmt::Display for FeatureSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, feature) in self.iter().enumerate() {
            if idx != 0 {
                f.write_str(" ")?;
            }
            write!(f, "{feature}")?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for FeatureSet {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.iter().map(|feature| feature.to_string()))
    }
}

/// Vendors a feature bit is valid for
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum VendorScope {
    Any,
    Intel,
    /// AMD and Hygon
    Amd,
}

impl VendorScope {
    fn matches(self, vendor: Vendor) -> bool {
        match self {
            VendorScope::Any   => true,
            VendorScope::Intel => vendor == Vendor::Intel,
            VendorScope::Amd   => matches!(vendor, Vendor::AMD | Vendor::Hygon),
        }
    }
}

struct X86FeatureBit {
    feature:      CpuFeature,
    leaf:         u32,
    subleaf:      u32,
    reg:          Register,
    bit:          u32,
    scope:        VendorScope,
    prerequisite: Option<CpuFeature>,
}

impl X86FeatureBit {
    const fn new(feature: CpuFeature, leaf: u32, subleaf: u32, reg: Register, bit: u32) -> Self {
        Self { feature, leaf, subleaf, reg, bit, scope: VendorScope::Any, prerequisite: None }
    }

    const fn intel(mut self) -> Self {
        self.scope = VendorScope::Intel;
        self
    }

    const fn amd(mut self) -> Self {
        self.scope = VendorScope::Amd;
        self
    }

    const fn requires(mut self, prerequisite: CpuFeature) -> Self {
        self.prerequisite = Some(prerequisite);
        self
    }
}

const fn x86(feature: CpuFeature, leaf: u32, reg: Register, bit: u32) -> X86FeatureBit {
    X86FeatureBit::new(feature, leaf, 0, reg, bit)
}

const fn x86_sub(feature: CpuFeature, leaf: u32, subleaf: u32, reg: Register, bit: u32) -> X86FeatureBit {
    X86FeatureBit::new(feature, leaf, subleaf, reg, bit)
}

use CpuFeature::*;
use Register::*;

#[rustfmt::skip]
static X86_FEATURES : &[X86FeatureBit] = &[
    x86(FPU,            1, Edx,  0),
    x86(VME,            1, Edx,  1),
    x86(DE,             1, Edx,  2),
    x86(PSE,            1, Edx,  3),
    x86(TSC,            1, Edx,  4),
    x86(MSR,            1, Edx,  5),
    x86(PAE,            1, Edx,  6),
    x86(MCE,            1, Edx,  7),
    x86(CX8,            1, Edx,  8),
    x86(APIC,           1, Edx,  9),
    x86(SEP,            1, Edx, 11),
    x86(MTRR,           1, Edx, 12),
    x86(PGE,            1, Edx, 13),
    x86(MCA,            1, Edx, 14),
    x86(CMOV,           1, Edx, 15),
    x86(PAT,            1, Edx, 16),
    x86(PSE36,          1, Edx, 17),
    x86(PN,             1, Edx, 18),
    x86(CLFLUSH,        1, Edx, 19),
    x86(DTS,            1, Edx, 21),
    x86(ACPI,           1, Edx, 22),
    x86(MMX,            1, Edx, 23),
    x86(FXSR,           1, Edx, 24),
    x86(SSE,            1, Edx, 25),
    x86(SSE2,           1, Edx, 26),
    x86(SS,             1, Edx, 27),
    x86(HT,             1, Edx, 28),
    x86(TM,             1, Edx, 29),
    x86(IA64,           1, Edx, 30),
    x86(PBE,            1, Edx, 31),

    x86(PNI,            1, Ecx,  0),
    x86(PCLMUL,         1, Ecx,  1),
    x86(DTS64,          1, Ecx,  2),
    x86(MONITOR,        1, Ecx,  3),
    x86(DS_CPL,         1, Ecx,  4),
    x86(VMX,            1, Ecx,  5),
    x86(SMX,            1, Ecx,  6),
    x86(EST,            1, Ecx,  7),
    x86(TM2,            1, Ecx,  8),
    x86(SSSE3,          1, Ecx,  9),
    x86(CID,            1, Ecx, 10),
    x86(FMA3,           1, Ecx, 12),
    x86(CX16,           1, Ecx, 13),
    x86(XTPR,           1, Ecx, 14),
    x86(PDCM,           1, Ecx, 15),
    x86(PCID,           1, Ecx, 17),
    x86(DCA,            1, Ecx, 18),
    x86(SSE4_1,         1, Ecx, 19),
    x86(SSE4_2,         1, Ecx, 20),
    x86(X2APIC,         1, Ecx, 21),
    x86(MOVBE,          1, Ecx, 22),
    x86(POPCNT,         1, Ecx, 23),
    x86(TSC_DEADLINE,   1, Ecx, 24),
    x86(AES,            1, Ecx, 25),
    x86(XSAVE,          1, Ecx, 26),
    x86(OSXSAVE,        1, Ecx, 27),
    x86(AVX,            1, Ecx, 28),
    x86(F16C,           1, Ecx, 29),
    x86(RDRAND,         1, Ecx, 30),
    x86(HYPERVISOR,     1, Ecx, 31),

    x86(APERFMPERF,     6, Ecx,  0).intel(),

    x86(SYSCALL,        0x8000_0001, Edx, 11),
    x86(XD,             0x8000_0001, Edx, 20).intel(),
    x86(NX,             0x8000_0001, Edx, 20).amd(),
    x86(MMXEXT,         0x8000_0001, Edx, 22).amd(),
    x86(FXSR_OPT,       0x8000_0001, Edx, 25).amd(),
    x86(PDPE1GB,        0x8000_0001, Edx, 26),
    x86(RDTSCP,         0x8000_0001, Edx, 27),
    x86(LM,             0x8000_0001, Edx, 29),
    x86(_3DNOWEXT,      0x8000_0001, Edx, 30).amd(),
    x86(_3DNOW,         0x8000_0001, Edx, 31).amd(),

    x86(LAHF_LM,        0x8000_0001, Ecx,  0),
    x86(CMP_LEGACY,     0x8000_0001, Ecx,  1).amd(),
    x86(SVM,            0x8000_0001, Ecx,  2).amd(),
    x86(ABM,            0x8000_0001, Ecx,  5),
    x86(SSE4A,          0x8000_0001, Ecx,  6).amd(),
    x86(MISALIGNSSE,    0x8000_0001, Ecx,  7).amd(),
    x86(_3DNOWPREFETCH, 0x8000_0001, Ecx,  8),
    x86(OSVW,           0x8000_0001, Ecx,  9).amd(),
    x86(IBS,            0x8000_0001, Ecx, 10).amd(),
    x86(SSE5,           0x8000_0001, Ecx, 11).amd(),
    x86(XOP,            0x8000_0001, Ecx, 11).amd(),
    x86(SKINIT,         0x8000_0001, Ecx, 12).amd(),
    x86(WDT,            0x8000_0001, Ecx, 13).amd(),
    x86(FMA4,           0x8000_0001, Ecx, 16).amd(),
    x86(TBM,            0x8000_0001, Ecx, 21).amd(),
    x86(TOPOEXT,        0x8000_0001, Ecx, 22).amd(),
    x86(PERFCTR_CORE,   0x8000_0001, Ecx, 23).amd(),

    x86(TS,             0x8000_0007, Edx,  0).amd(),
    x86(FID,            0x8000_0007, Edx,  1).amd(),
    x86(VID,            0x8000_0007, Edx,  2).amd(),
    x86(TTP,            0x8000_0007, Edx,  3).amd(),
    x86(TM_AMD,         0x8000_0007, Edx,  4).amd(),
    x86(STC,            0x8000_0007, Edx,  5).amd(),
    x86(_100MHZSTEPS,   0x8000_0007, Edx,  6).amd(),
    x86(HWPSTATE,       0x8000_0007, Edx,  7).amd(),
    x86(CONSTANT_TSC,   0x8000_0007, Edx,  8),
    x86(CPB,            0x8000_0007, Edx,  9).amd(),
    x86(APERFMPERF,     0x8000_0007, Edx, 10).amd(),
    x86(PFI,            0x8000_0007, Edx, 11).amd(),
    x86(PA,             0x8000_0007, Edx, 12).amd(),

    x86(FSGSBASE,       7, Ebx,  0),
    x86(SGX,            7, Ebx,  2).intel(),
    x86(BMI1,           7, Ebx,  3),
    x86(HLE,            7, Ebx,  4),
    x86(AVX2,           7, Ebx,  5),
    x86(SMEP,           7, Ebx,  7),
    x86(BMI2,           7, Ebx,  8),
    x86(ERMS,           7, Ebx,  9),
    x86(INVPCID,        7, Ebx, 10),
    x86(RTM,            7, Ebx, 11),
    x86(MPX,            7, Ebx, 14).intel(),
    x86(AVX512F,        7, Ebx, 16),
    x86(AVX512DQ,       7, Ebx, 17).requires(AVX512F),
    x86(RDSEED,         7, Ebx, 18),
    x86(ADX,            7, Ebx, 19),
    x86(SMAP,           7, Ebx, 20),
    x86(AVX512IFMA,     7, Ebx, 21).requires(AVX512F),
    x86(CLFLUSHOPT,     7, Ebx, 23),
    x86(CLWB,           7, Ebx, 24),
    x86(INTEL_PT,       7, Ebx, 25).intel(),
    x86(AVX512PF,       7, Ebx, 26).requires(AVX512F),
    x86(AVX512ER,       7, Ebx, 27).requires(AVX512F),
    x86(AVX512CD,       7, Ebx, 28).requires(AVX512F),
    x86(SHA_NI,         7, Ebx, 29),
    x86(AVX512BW,       7, Ebx, 30).requires(AVX512F),
    x86(AVX512VL,       7, Ebx, 31).requires(AVX512F),

    x86(PREFETCHWT1,        7, Ecx,  0).intel(),
    x86(AVX512VBMI,         7, Ecx,  1).requires(AVX512F),
    x86(UMIP,               7, Ecx,  2),
    x86(PKU,                7, Ecx,  3),
    x86(OSPKE,              7, Ecx,  4),
    x86(WAITPKG,            7, Ecx,  5).intel(),
    x86(AVX512VBMI2,        7, Ecx,  6).requires(AVX512F),
    x86(CET_SS,             7, Ecx,  7),
    x86(GFNI,               7, Ecx,  8),
    x86(VAES,               7, Ecx,  9),
    x86(VPCLMULQDQ,         7, Ecx, 10),
    x86(AVX512VNNI,         7, Ecx, 11).requires(AVX512F),
    x86(AVX512BITALG,       7, Ecx, 12).requires(AVX512F),
    x86(AVX512VPOPCNTDQ,    7, Ecx, 14).requires(AVX512F),
    x86(LA57,               7, Ecx, 16),
    x86(RDPID,              7, Ecx, 22),
    x86(SGX_LC,             7, Ecx, 30).intel().requires(SGX),

    x86(AVX512_4VNNIW,      7, Edx,  2).intel().requires(AVX512F),
    x86(AVX512_4FMAPS,      7, Edx,  3).intel().requires(AVX512F),
    x86(FSRM,               7, Edx,  4),
    x86(AVX512VP2INTERSECT, 7, Edx,  8).requires(AVX512F),
    x86(MD_CLEAR,           7, Edx, 10).intel(),
    x86(SERIALIZE,          7, Edx, 14).intel(),
    x86(HYBRID,             7, Edx, 15).intel(),
    x86(TSXLDTRK,           7, Edx, 16).intel(),
    x86(PCONFIG,            7, Edx, 18).intel(),
    x86(CET_IBT,            7, Edx, 20),
    x86(AMX_BF16,           7, Edx, 22).intel(),
    x86(AVX512FP16,         7, Edx, 23).requires(AVX512F),
    x86(AMX_TILE,           7, Edx, 24).intel(),
    x86(AMX_INT8,           7, Edx, 25).intel(),
    x86(IBRS_IBPB,          7, Edx, 26).intel(),
    x86(STIBP,              7, Edx, 27).intel(),
    x86(L1D_FLUSH,          7, Edx, 28).intel(),
    x86(ARCH_CAPABILITIES,  7, Edx, 29).intel(),
    x86(SSBD,               7, Edx, 31).intel(),

    x86_sub(AVX_VNNI,       7, 1, Eax,  4),
    x86_sub(AVX512BF16,     7, 1, Eax,  5).requires(AVX512F),
    x86_sub(HRESET,         7, 1, Eax, 22).intel(),
    x86_sub(LAM,            7, 1, Eax, 26).intel(),

    x86_sub(XSAVEOPT,       0xD, 1, Eax, 0),
    x86_sub(XSAVEC,         0xD, 1, Eax, 1),
    x86_sub(XGETBV_ECX1,    0xD, 1, Eax, 2),
    x86_sub(XSAVES,         0xD, 1, Eax, 3),

    x86(CLZERO,             0x8000_0008, Ebx, 0).amd(),
    x86(IRPERF,             0x8000_0008, Ebx, 1).amd(),
    x86(WBNOINVD,           0x8000_0008, Ebx, 9),
    x86(SME,                0x8000_001F, Eax, 0).amd(),
    x86(SEV,                0x8000_001F, Eax, 1).amd(),
    x86(SEV_ES,             0x8000_001F, Eax, 3).amd(),
];

/// Interpretation of a 4-bit ID register field
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum FieldKind {
    Unsigned,
    /// Signed field, `0xF` means not implemented
    Signed,
}

struct ArmFeatureField {
    feature:      CpuFeature,
    reg:          ArmRegister,
    shift:        u32,
    min:          i8,
    kind:         FieldKind,
    prerequisite: Option<CpuFeature>,
}

const fn arm(feature: CpuFeature, reg: ArmRegister, shift: u32, min: i8) -> ArmFeatureField {
    ArmFeatureField { feature, reg, shift, min, kind: FieldKind::Unsigned, prerequisite: None }
}

const fn arm_signed(feature: CpuFeature, reg: ArmRegister, shift: u32, min: i8) -> ArmFeatureField {
    ArmFeatureField { feature, reg, shift, min, kind: FieldKind::Signed, prerequisite: None }
}

const fn sve(feature: CpuFeature, shift: u32, min: i8) -> ArmFeatureField {
    ArmFeatureField { feature, reg: ArmRegister::IdAa64Zfr0, shift, min, kind: FieldKind::Unsigned, prerequisite: Some(SVE) }
}

use ArmRegister::*;

#[rustfmt::skip]
static ARM_FEATURES : &[ArmFeatureField] = &[
    arm_signed(FP,      IdAa64Pfr0, 16, 0),
    arm_signed(FPHP,    IdAa64Pfr0, 16, 1),
    arm_signed(ASIMD,   IdAa64Pfr0, 20, 0),
    arm_signed(ASIMDHP, IdAa64Pfr0, 20, 1),
    arm(RAS,            IdAa64Pfr0, 28, 1),
    arm(SVE,            IdAa64Pfr0, 32, 1),
    arm(SEL2,           IdAa64Pfr0, 36, 1),
    arm(AMU,            IdAa64Pfr0, 44, 1),
    arm(DIT,            IdAa64Pfr0, 48, 1),
    arm(CSV2,           IdAa64Pfr0, 56, 1),
    arm(CSV3,           IdAa64Pfr0, 60, 1),

    arm(BTI,            IdAa64Pfr1,  0, 1),
    arm(SSBS,           IdAa64Pfr1,  4, 1),
    arm(MTE,            IdAa64Pfr1,  8, 1),
    arm(SME_ARM,        IdAa64Pfr1, 24, 1),

    arm(AES,            IdAa64Isar0,  4, 1),
    arm(PMULL,          IdAa64Isar0,  4, 2),
    arm(SHA1,           IdAa64Isar0,  8, 1),
    arm(SHA2,           IdAa64Isar0, 12, 1),
    arm(SHA512,         IdAa64Isar0, 12, 2),
    arm(CRC32,          IdAa64Isar0, 16, 1),
    arm(ATOMICS,        IdAa64Isar0, 20, 2),
    arm(RDM,            IdAa64Isar0, 28, 1),
    arm(SHA3,           IdAa64Isar0, 32, 1),
    arm(SM3,            IdAa64Isar0, 36, 1),
    arm(SM4,            IdAa64Isar0, 40, 1),
    arm(DOTPROD,        IdAa64Isar0, 44, 1),
    arm(FHM,            IdAa64Isar0, 48, 1),
    arm(FLAGM,          IdAa64Isar0, 52, 1),
    arm(FLAGM2,         IdAa64Isar0, 52, 2),
    arm(TLBIOS,         IdAa64Isar0, 56, 1),
    arm(RNG,            IdAa64Isar0, 60, 1),

    arm(DPB,            IdAa64Isar1,  0, 1),
    arm(DPB2,           IdAa64Isar1,  0, 2),
    arm(PAUTH,          IdAa64Isar1,  8, 1),
    arm(JSCVT,          IdAa64Isar1, 12, 1),
    arm(FCMA,           IdAa64Isar1, 16, 1),
    arm(LRCPC,          IdAa64Isar1, 20, 1),
    arm(LRCPC2,         IdAa64Isar1, 20, 2),
    arm(FRINTTS,        IdAa64Isar1, 32, 1),
    arm(SB,             IdAa64Isar1, 36, 1),
    arm(SPECRES,        IdAa64Isar1, 40, 1),
    arm(BF16,           IdAa64Isar1, 44, 1),
    arm(DGH,            IdAa64Isar1, 48, 1),
    arm(I8MM,           IdAa64Isar1, 52, 1),
    arm(XS,             IdAa64Isar1, 56, 1),
    arm(LS64,           IdAa64Isar1, 60, 1),

    arm(WFXT,           IdAa64Isar2,  0, 2),
    arm(RPRES,          IdAa64Isar2,  4, 1),
    arm(MOPS,           IdAa64Isar2, 16, 1),
    arm(HBC,            IdAa64Isar2, 20, 1),
    arm(CSSC,           IdAa64Isar2, 52, 1),

    arm(FGT,            IdAa64Mmfr0, 56, 1),
    arm(ECV,            IdAa64Mmfr0, 60, 1),

    sve(SVE2,            0, 1),
    sve(SVE_AES,         4, 1),
    sve(SVE_PMULL,       4, 2),
    sve(SVE_BITPERM,    16, 1),
    sve(SVE_BF16,       20, 1),
    sve(SVE_SHA3,       32, 1),
    sve(SVE_SM4,        40, 1),
    sve(SVE_I8MM,       44, 1),
    sve(SVE_F32MM,      52, 1),
    sve(SVE_F64MM,      56, 1),
];

impl ArmFeatureField {
    fn is_present(&self, value: u64) -> bool {
        let field = bit_field64(value, self.shift, 4) as i8;
        let field = match self.kind {
            FieldKind::Unsigned => field,
            // Sign extend the 4-bit value
            FieldKind::Signed => (field << 4) >> 4,
        };
        field >= self.min
    }
}

/// Decode the feature flags from the raw data.
/// 
/// Features that need a prerequisite feature are dropped when the prerequisite is missing.
pub fn decode_features(raw: &RawCpuData, vendor: Vendor, architecture: Architecture) -> FeatureSet {
    let mut features = FeatureSet::new();
    match architecture {
        Architecture::X86 => {
            for entry in X86_FEATURES {
                if !entry.scope.matches(vendor) {
                    continue;
                }
                if let Some(regs) = raw.leaf(entry.leaf, entry.subleaf) {
                    if is_bit_set(regs.get(entry.reg), entry.bit) {
                        features.insert(entry.feature);
                    }
                }
            }
            for entry in X86_FEATURES {
                if let Some(prerequisite) = entry.prerequisite {
                    if !features.contains(prerequisite) {
                        features.remove(entry.feature);
                    }
                }
            }
        },
        Architecture::ARM => {
            for entry in ARM_FEATURES {
                if let Some(value) = raw.arm_register(entry.reg) {
                    if entry.is_present(value) {
                        features.insert(entry.feature);
                    }
                }
            }
            for entry in ARM_FEATURES {
                if let Some(prerequisite) = entry.prerequisite {
                    if !features.contains(prerequisite) {
                        features.remove(entry.feature);
                    }
                }
            }
        },
        Architecture::Unknown => {},
    }
    features
}

#[cfg(test)]
mod tests {
    use cpuident_base::EnumFromNameT;

    use super::*;
    use crate::{raw::Registers, test_data};

    #[test]
    fn decodes_fixed_bit_positions() {
        let raw = RawCpuData::new().with_leaf(1, 0, Registers::new(0, 0, 0, (1 << 0) | (1 << 25) | (1 << 26)));
        let features = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert_eq!(features.iter().collect::<Vec<_>>(), vec![FPU, SSE, SSE2]);
    }

    #[test]
    fn decoding_is_idempotent() {
        let raw = test_data::intel_kaby_lake_u();
        let first = decode_features(&raw, Vendor::Intel, Architecture::X86);
        let second = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert_eq!(first, second);
        assert_eq!(first.0.bits(), second.0.bits());
    }

    #[test]
    fn vendor_specific_bits() {
        let raw = RawCpuData::new().with_leaf(0x8000_0001, 0, Registers::new(0, 0, 1 << 6, 1 << 20));

        let intel = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert!(intel.contains(XD));
        assert!(!intel.contains(NX));
        assert!(!intel.contains(SSE4A));

        let amd = decode_features(&raw, Vendor::AMD, Architecture::X86);
        assert!(amd.contains(NX));
        assert!(amd.contains(SSE4A));
        assert!(!amd.contains(XD));

        let hygon = decode_features(&raw, Vendor::Hygon, Architecture::X86);
        assert!(hygon.contains(NX));
    }

    #[test]
    fn avx512_subsets_need_avx512f() {
        // AVX512DQ, AVX512CD and AVX512BW without AVX512F
        let ebx = (1 << 17) | (1 << 28) | (1 << 30) | (1 << 5);
        let raw = RawCpuData::new().with_leaf(7, 0, Registers::new(0, ebx, 0, 0));
        let features = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert!(features.contains(AVX2));
        assert!(!features.contains(AVX512DQ));
        assert!(!features.contains(AVX512CD));
        assert!(!features.contains(AVX512BW));

        let raw = RawCpuData::new().with_leaf(7, 0, Registers::new(0, ebx | (1 << 16), 0, 0));
        let features = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert!(features.contains(AVX512F));
        assert!(features.contains(AVX512DQ));
        assert!(features.contains(AVX512BW));
    }

    #[test]
    fn sgx_launch_control_needs_sgx() {
        let raw = RawCpuData::new().with_leaf(7, 0, Registers::new(0, 0, 1 << 30, 0));
        assert!(!decode_features(&raw, Vendor::Intel, Architecture::X86).contains(SGX_LC));

        let raw = RawCpuData::new().with_leaf(7, 0, Registers::new(0, 1 << 2, 1 << 30, 0));
        let features = decode_features(&raw, Vendor::Intel, Architecture::X86);
        assert!(features.contains(SGX));
        assert!(features.contains(SGX_LC));
    }

    #[test]
    fn unknown_architecture_has_no_features() {
        let raw = test_data::intel_kaby_lake_u();
        assert!(decode_features(&raw, Vendor::Unknown, Architecture::Unknown).is_empty());
    }

    #[test]
    fn arm_fields() {
        let raw = test_data::arm_cortex_a72();
        let features = decode_features(&raw, Vendor::ARM, Architecture::ARM);
        assert!(features.contains(FP));
        assert!(features.contains(ASIMD));
        assert!(!features.contains(FPHP));
        assert!(features.contains(AES));
        assert!(features.contains(PMULL));
        assert!(features.contains(SHA2));
        assert!(features.contains(CRC32));
        assert!(!features.contains(ATOMICS));
        assert!(!features.contains(SVE));

        // FP not implemented is encoded as 0xF
        let raw = RawCpuData::new().with_arm_register(ArmRegister::IdAa64Pfr0, 0xF << 16);
        assert!(!decode_features(&raw, Vendor::ARM, Architecture::ARM).contains(FP));
    }

    #[test]
    fn sve_features_need_sve() {
        let raw = RawCpuData::new().with_arm_register(ArmRegister::IdAa64Zfr0, 0x1);
        assert!(!decode_features(&raw, Vendor::ARM, Architecture::ARM).contains(SVE2));

        let raw = raw.with_arm_register(ArmRegister::IdAa64Pfr0, 1 << 32);
        assert!(decode_features(&raw, Vendor::ARM, Architecture::ARM).contains(SVE2));
    }

    #[test]
    fn names() {
        assert_eq!(CpuFeature::parse("sse4_2"), Some(SSE4_2));
        assert_eq!(CpuFeature::parse("3dnow"), Some(_3DNOW));
        assert_eq!(CpuFeature::parse("avx1024"), None);

        let features: FeatureSet = [SSE2, FPU, _3DNOW].into_iter().collect();
        assert_eq!(features.to_string(), "FPU SSE2 3DNOW");
    }
}
