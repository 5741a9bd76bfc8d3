//! Vendor and architecture classification

use cpuident_common::utils::{bit_field, bit_field64};
use cpuident_macros::{EnumDisplay, EnumFromName};

use crate::raw::{ArmRegister, RawCpuData, Register, EXTENDED_LEAF_BASE};

/// Maximum length of the vendor string, in bytes
pub const VENDOR_STR_MAX : usize = 16;
/// Maximum length of the brand string, in bytes
pub const BRAND_STR_MAX  : usize = 64;

/// CPU architecture.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumDisplay)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Architecture {
    #[display("x86")]
    X86,
    #[display("ARM")]
    ARM,
    Unknown,
}

/// CPU vendor.
/// 
/// x86 vendors are identified by the vendor string in leaf 0, ARM vendors by the implementer code in MIDR_EL1.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumDisplay, EnumFromName)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum Vendor {
    /// Intel: "GenuineIntel", ARM implementer 0x69
    Intel,
    /// AMD: "AuthenticAMD", "AMDisbetter!"
    AMD,
    /// Cyrix: "CyrixInstead"
    Cyrix,
    /// NexGen: "NexGenDriven"
    NexGen,
    /// Transmeta: "GenuineTMx86", "TransmetaCPU"
    Transmeta,
    /// United Microelectronics Corporation: "UMC UMC UMC "
    UMC,
    /// IDT/Centaur, VIA and Zhaoxin: "CentaurHauls", "  Shanghai  "
    Centaur,
    /// Rise: "RiseRiseRise"
    Rise,
    /// Silicon Integrated Systems: "SiS SiS SiS "
    #[display("SiS")]
    SIS,
    /// National Semiconductor: "Geode by NSC"
    NSC,
    /// Hygon: "HygonGenuine"
    Hygon,
    /// ARM implementer 0x41
    ARM,
    /// ARM implementer 0x42
    Broadcom,
    /// ARM implementer 0x43
    Cavium,
    /// ARM implementer 0x44
    DEC,
    /// ARM implementer 0x46
    Fujitsu,
    /// ARM implementer 0x48
    HiSilicon,
    /// ARM implementer 0x49
    Infineon,
    /// ARM implementer 0x4D
    Freescale,
    /// ARM implementer 0x4E
    #[display("NVIDIA")]
    Nvidia,
    /// ARM implementer 0x50
    #[display("APM")]
    APM,
    /// ARM implementer 0x51
    Qualcomm,
    /// ARM implementer 0x53
    Samsung,
    /// ARM implementer 0x56
    Marvell,
    /// ARM implementer 0x61
    Apple,
    /// ARM implementer 0x66
    Faraday,
    /// ARM implementer 0x6D
    Microsoft,
    /// ARM implementer 0x70
    Phytium,
    /// ARM implementer 0xC0
    Ampere,
    Unknown,
}

/// Exact vendor string matches for x86 CPUs
static X86_VENDORS : &[(&[u8; 12], Vendor)] = &[
    (b"GenuineIntel", Vendor::Intel),
    (b"AuthenticAMD", Vendor::AMD),
    (b"AMDisbetter!", Vendor::AMD),
    (b"CyrixInstead", Vendor::Cyrix),
    (b"NexGenDriven", Vendor::NexGen),
    (b"GenuineTMx86", Vendor::Transmeta),
    (b"TransmetaCPU", Vendor::Transmeta),
    (b"UMC UMC UMC ", Vendor::UMC),
    (b"CentaurHauls", Vendor::Centaur),
    (b"  Shanghai  ", Vendor::Centaur),
    (b"RiseRiseRise", Vendor::Rise),
    (b"SiS SiS SiS ", Vendor::SIS),
    (b"Geode by NSC", Vendor::NSC),
    (b"HygonGenuine", Vendor::Hygon),
];

/// ARM implementer codes
static ARM_IMPLEMENTERS : &[(u32, Vendor)] = &[
    (0x41, Vendor::ARM),
    (0x42, Vendor::Broadcom),
    (0x43, Vendor::Cavium),
    (0x44, Vendor::DEC),
    (0x46, Vendor::Fujitsu),
    (0x48, Vendor::HiSilicon),
    (0x49, Vendor::Infineon),
    (0x4D, Vendor::Freescale),
    (0x4E, Vendor::Nvidia),
    (0x50, Vendor::APM),
    (0x51, Vendor::Qualcomm),
    (0x53, Vendor::Samsung),
    (0x56, Vendor::Marvell),
    (0x61, Vendor::Apple),
    (0x66, Vendor::Faraday),
    (0x69, Vendor::Intel),
    (0x6D, Vendor::Microsoft),
    (0x70, Vendor::Phytium),
    (0xC0, Vendor::Ampere),
];

/// Known ARM parts: (implementer, part number, name)
static ARM_PARTS : &[(u32, u32, &str)] = &[
    (0x41, 0xD02, "Cortex-A34"),
    (0x41, 0xD03, "Cortex-A53"),
    (0x41, 0xD04, "Cortex-A35"),
    (0x41, 0xD05, "Cortex-A55"),
    (0x41, 0xD06, "Cortex-A65"),
    (0x41, 0xD07, "Cortex-A57"),
    (0x41, 0xD08, "Cortex-A72"),
    (0x41, 0xD09, "Cortex-A73"),
    (0x41, 0xD0A, "Cortex-A75"),
    (0x41, 0xD0B, "Cortex-A76"),
    (0x41, 0xD0C, "Neoverse-N1"),
    (0x41, 0xD0D, "Cortex-A77"),
    (0x41, 0xD0E, "Cortex-A76AE"),
    (0x41, 0xD40, "Neoverse-V1"),
    (0x41, 0xD41, "Cortex-A78"),
    (0x41, 0xD42, "Cortex-A78AE"),
    (0x41, 0xD44, "Cortex-X1"),
    (0x41, 0xD46, "Cortex-A510"),
    (0x41, 0xD47, "Cortex-A710"),
    (0x41, 0xD48, "Cortex-X2"),
    (0x41, 0xD49, "Neoverse-N2"),
    (0x41, 0xD4A, "Neoverse-E1"),
    (0x41, 0xD4B, "Cortex-A78C"),
    (0x41, 0xD4D, "Cortex-A715"),
    (0x41, 0xD4E, "Cortex-X3"),
    (0x41, 0xD4F, "Neoverse-V2"),
    (0x41, 0xD80, "Cortex-A520"),
    (0x41, 0xD81, "Cortex-A720"),
    (0x41, 0xD82, "Cortex-X4"),
    (0x43, 0x0AF, "ThunderX2"),
    (0x46, 0x001, "A64FX"),
    (0x48, 0xD01, "Kunpeng-920"),
    (0x4E, 0x004, "Carmel"),
    (0x51, 0x800, "Kryo 2XX Gold"),
    (0x51, 0x801, "Kryo 2XX Silver"),
    (0x51, 0x802, "Kryo 3XX Gold"),
    (0x51, 0x803, "Kryo 3XX Silver"),
    (0x51, 0x804, "Kryo 4XX Gold"),
    (0x51, 0x805, "Kryo 4XX Silver"),
    (0x51, 0xC00, "Falkor"),
    (0x61, 0x022, "M1 Icestorm"),
    (0x61, 0x023, "M1 Firestorm"),
    (0x61, 0x032, "M2 Blizzard"),
    (0x61, 0x033, "M2 Avalanche"),
    (0xC0, 0xAC3, "Ampere-1"),
    (0xC0, 0xAC4, "Ampere-1a"),
];

/// Decoded fields of MIDR_EL1
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Midr {
    pub implementer: u32,
    pub variant:     u32,
    pub part_num:    u32,
    pub revision:    u32,
}

impl Midr {
    pub const fn from_raw(midr: u64) -> Self {
        Self {
            implementer: bit_field64(midr, 24, 8) as u32,
            variant:     bit_field64(midr, 20, 4) as u32,
            part_num:    bit_field64(midr, 4, 12) as u32,
            revision:    bit_field64(midr, 0, 4) as u32,
        }
    }

    /// Get the MIDR of the captured raw data, if any
    pub fn from_raw_data(raw: &RawCpuData) -> Option<Self> {
        raw.arm_register(ArmRegister::Midr).map(Self::from_raw)
    }
}

/// Get the vendor of an ARM implementer code
pub fn arm_implementer_vendor(implementer: u32) -> Vendor {
    ARM_IMPLEMENTERS.iter()
        .find(|(code, _)| *code == implementer)
        .map_or(Vendor::Unknown, |(_, vendor)| *vendor)
}

/// Get the name of an ARM part
pub fn arm_part_name(implementer: u32, part_num: u32) -> Option<&'static str> {
    ARM_PARTS.iter()
        .find(|(imp, part, _)| *imp == implementer && *part == part_num)
        .map(|(_, _, name)| *name)
}

/// Family, model and stepping from leaf 1.
/// 
/// `ext_family` and `ext_model` are the display values, combining the base and extended fields.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct X86Signature {
    pub family:     u32,
    pub model:      u32,
    pub stepping:   u32,
    pub ext_family: u32,
    pub ext_model:  u32,
}

impl X86Signature {
    pub fn from_raw(raw: &RawCpuData, vendor: Vendor) -> Option<Self> {
        let eax = raw.leaf(1, 0)?.eax;
        let family = bit_field(eax, 8, 4);
        let model = bit_field(eax, 4, 4);
        let stepping = bit_field(eax, 0, 4);
        let xfamily = bit_field(eax, 20, 8);
        let xmodel = bit_field(eax, 16, 4);

        // Early AMD CPUs have garbage in the extended family field
        let ext_family = if vendor == Vendor::AMD && family < 0xF { family } else { family + xfamily };
        let ext_model = model + (xmodel << 4);

        Some(Self { family, model, stepping, ext_family, ext_model })
    }
}

/// Result of classifying the raw data
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Classification {
    pub architecture: Architecture,
    pub vendor:       Vendor,
    pub vendor_str:   String,
    pub brand_str:    String,
}

impl Classification {
    pub fn unknown() -> Self {
        Self {
            architecture: Architecture::Unknown,
            vendor: Vendor::Unknown,
            vendor_str: String::new(),
            brand_str: String::new(),
        }
    }
}

/// Classify the architecture and vendor of the raw data.
/// 
/// An unknown vendor string is still returned verbatim, with [`Vendor::Unknown`].
pub fn classify(raw: &RawCpuData) -> Classification {
    let x86_vendor = raw.leaf(0, 0)
        .map(|leaf0| leaf0.bytes([Register::Ebx, Register::Edx, Register::Ecx]))
        .filter(|bytes| bytes.iter().any(|b| *b != 0));

    if let Some(vendor_bytes) = x86_vendor {
        let vendor = X86_VENDORS.iter()
            .find(|(name, _)| name.as_slice() == vendor_bytes.as_slice())
            .map_or(Vendor::Unknown, |(_, vendor)| *vendor);

        return Classification {
            architecture: Architecture::X86,
            vendor,
            vendor_str: bounded_string(&vendor_bytes, VENDOR_STR_MAX, false),
            brand_str: x86_brand(raw),
        };
    }

    if let Some(midr) = Midr::from_raw_data(raw) {
        let vendor = arm_implementer_vendor(midr.implementer);
        let vendor_str = match vendor {
            Vendor::Unknown => format!("0x{:02X}", midr.implementer),
            vendor => vendor.to_string(),
        };
        let brand_str = arm_part_name(midr.implementer, midr.part_num)
            .map_or_else(String::new, |part| format!("{vendor_str} {part}"));

        return Classification {
            architecture: Architecture::ARM,
            vendor,
            vendor_str,
            brand_str,
        };
    }

    Classification::unknown()
}

fn x86_brand(raw: &RawCpuData) -> String {
    if raw.max_extended_leaf().map_or(true, |max| max < 0x8000_0004) {
        return String::new();
    }

    let mut bytes = Vec::with_capacity(48);
    for leaf in 2..=4 {
        if let Some(regs) = raw.leaf(EXTENDED_LEAF_BASE + leaf, 0) {
            bytes.extend(regs.bytes([Register::Eax, Register::Ebx, Register::Ecx, Register::Edx]));
        }
    }
    bounded_string(&bytes, BRAND_STR_MAX, true)
}

/// Convert a NUL terminated byte string, limited to `max_len` bytes.
fn bounded_string(bytes: &[u8], max_len: usize, trim: bool) -> String {
    let bytes = &bytes[..bytes.len().min(max_len)];
    let end = bytes.iter().position(|b| *b == 0).unwrap_or(bytes.len());
    let s = String::from_utf8_lossy(&bytes[..end]);
    if trim { s.trim().to_string() } else { s.into_owned() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{raw::Registers, test_data};

    #[test]
    fn cleared_leaf0_is_unknown() {
        let mut raw = test_data::intel_kaby_lake_u();
        raw.set_leaf(0, 0, Registers::default());
        let class = classify(&raw);
        assert_eq!(class.vendor, Vendor::Unknown);
        assert_eq!(class.architecture, Architecture::Unknown);

        raw.clear_leaf(0, 0);
        assert_eq!(classify(&raw), Classification::unknown());
        assert_eq!(classify(&RawCpuData::new()), Classification::unknown());
    }

    #[test]
    fn intel_vendor_and_brand() {
        let class = classify(&test_data::intel_kaby_lake_u());
        assert_eq!(class.architecture, Architecture::X86);
        assert_eq!(class.vendor, Vendor::Intel);
        assert_eq!(class.vendor_str, "GenuineIntel");
        assert_eq!(class.brand_str, "Intel(R) Core(TM) i7-7500U CPU @ 2.70GHz");
    }

    #[test]
    fn unknown_vendor_string_is_kept() {
        let raw = test_data::with_vendor(RawCpuData::new().with_leaf(0, 0, Registers::new(1, 0, 0, 0)), b"MiSTer AO486");
        let class = classify(&raw);
        assert_eq!(class.architecture, Architecture::X86);
        assert_eq!(class.vendor, Vendor::Unknown);
        assert_eq!(class.vendor_str, "MiSTer AO486");
        assert_eq!(class.brand_str, "");
    }

    #[test]
    fn vendor_strings_with_spaces() {
        let raw = test_data::with_vendor(RawCpuData::new().with_leaf(0, 0, Registers::new(1, 0, 0, 0)), b"  Shanghai  ");
        let class = classify(&raw);
        assert_eq!(class.vendor, Vendor::Centaur);
        assert_eq!(class.vendor_str, "  Shanghai  ");
    }

    #[test]
    fn arm_implementer() {
        let class = classify(&test_data::arm_cortex_a72());
        assert_eq!(class.architecture, Architecture::ARM);
        assert_eq!(class.vendor, Vendor::ARM);
        assert_eq!(class.vendor_str, "ARM");
        assert_eq!(class.brand_str, "ARM Cortex-A72");

        let raw = RawCpuData::new().with_arm_register(ArmRegister::Midr, 0x7F0F_0010);
        let class = classify(&raw);
        assert_eq!(class.vendor, Vendor::Unknown);
        assert_eq!(class.vendor_str, "0x7F");
        assert_eq!(class.brand_str, "");
    }

    #[test]
    fn display_family_and_model() {
        let raw = test_data::intel_kaby_lake_u();
        let sig = X86Signature::from_raw(&raw, Vendor::Intel).unwrap();
        assert_eq!(sig, X86Signature { family: 6, model: 0xE, stepping: 9, ext_family: 6, ext_model: 0x8E });

        // Zen 2: family 0xF + 0x8, model 0x1 + (0x3 << 4)
        let raw = RawCpuData::new().with_leaf(1, 0, Registers::new(0x0083_0F10, 0, 0, 0));
        let sig = X86Signature::from_raw(&raw, Vendor::AMD).unwrap();
        assert_eq!((sig.ext_family, sig.ext_model, sig.stepping), (0x17, 0x31, 0));

        // K7 reports family 6 without an extended family
        let raw = RawCpuData::new().with_leaf(1, 0, Registers::new(0x0100_0681, 0, 0, 0));
        assert_eq!(X86Signature::from_raw(&raw, Vendor::AMD).unwrap().ext_family, 6);
    }

    #[test]
    fn midr_fields() {
        let midr = Midr::from_raw(0x410F_D083);
        assert_eq!(midr, Midr { implementer: 0x41, variant: 0, part_num: 0xD08, revision: 3 });
    }
}
