//! Raw data captured on real CPUs, shared by the unit tests

use crate::raw::{ArmRegister, RawCpuData, Registers};

fn word(bytes: &[u8]) -> u32 {
    u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
}

fn leaves(raw: RawCpuData, entries: &[(u32, u32, [u32; 4])]) -> RawCpuData {
    entries.iter().fold(raw, |raw, (leaf, subleaf, [eax, ebx, ecx, edx])| raw.with_leaf(*leaf, *subleaf, Registers::new(*eax, *ebx, *ecx, *edx)))
}

/// Replace the vendor string in leaf 0, keeping the max basic leaf
pub fn with_vendor(raw: RawCpuData, vendor: &[u8; 12]) -> RawCpuData {
    let max_basic = raw.leaf(0, 0).map_or(0, |regs| regs.eax);
    raw.with_leaf(0, 0, Registers::new(max_basic, word(&vendor[0..4]), word(&vendor[8..12]), word(&vendor[4..8])))
}

/// Store the brand string in leaves 0x8000_0002 to 0x8000_0004
pub fn with_brand(mut raw: RawCpuData, brand: &str) -> RawCpuData {
    let mut bytes = [0u8; 48];
    bytes[..brand.len()].copy_from_slice(brand.as_bytes());
    for (idx, chunk) in bytes.chunks(16).enumerate() {
        raw.set_leaf(0x8000_0002 + idx as u32, 0, Registers::new(word(&chunk[0..4]), word(&chunk[4..8]), word(&chunk[8..12]), word(&chunk[12..16])));
    }
    raw
}

/// Set the hypervisor bit and the hypervisor signature
pub fn with_hypervisor(mut raw: RawCpuData, signature: &[u8; 12]) -> RawCpuData {
    let leaf1 = raw.leaf(1, 0).unwrap_or_default();
    raw.set_leaf(1, 0, Registers { ecx: leaf1.ecx | (1 << 31), ..leaf1 });
    raw.with_leaf(0x4000_0000, 0, Registers::new(0x4000_0001, word(&signature[0..4]), word(&signature[4..8]), word(&signature[8..12])))
        .with_leaf(0x4000_0001, 0, Registers::new(0x0100_7AFB, 0, 0, 0))
}

/// Intel Core i7-7500U
#[rustfmt::skip]
pub fn intel_kaby_lake_u() -> RawCpuData {
    let raw = leaves(RawCpuData::new(), &[
        (0x0000_0000, 0, [0x0000_0016, 0x756E_6547, 0x6C65_746E, 0x4965_6E69]),
        (0x0000_0001, 0, [0x0008_06E9, 0x0010_0800, 0x7FFA_FBBF, 0xBFEB_FBFF]),
        (0x0000_0002, 0, [0x7603_6301, 0x00F0_B5FF, 0x0000_0000, 0x00C3_0000]),
        (0x0000_0003, 0, [0x0000_0000, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x0000_0004, 0, [0x1C00_4121, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x0000_0004, 1, [0x1C00_4122, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x0000_0004, 2, [0x1C00_4143, 0x00C0_003F, 0x0000_03FF, 0x0000_0000]),
        (0x0000_0004, 3, [0x1C03_C163, 0x03C0_003F, 0x0000_0FFF, 0x0000_0006]),
        (0x0000_0005, 0, [0x0000_0040, 0x0000_0040, 0x0000_0003, 0x1114_2120]),
        (0x0000_0006, 0, [0x0000_27F7, 0x0000_0002, 0x0000_0009, 0x0000_0000]),
        (0x0000_0007, 0, [0x0000_0000, 0x029C_6FBF, 0x0000_0000, 0x9C00_0000]),
        (0x0000_0008, 0, [0x0000_0000, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x0000_0009, 0, [0x0000_0000, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x0000_000A, 0, [0x0730_0404, 0x0000_0000, 0x0000_0000, 0x0000_0603]),
        (0x0000_000B, 0, [0x0000_0001, 0x0000_0002, 0x0000_0100, 0x0000_0002]),
        (0x0000_000B, 1, [0x0000_0004, 0x0000_0004, 0x0000_0201, 0x0000_0002]),
        (0x0000_000D, 0, [0x0000_001F, 0x0000_0440, 0x0000_0440, 0x0000_0000]),
        (0x0000_000D, 1, [0x0000_000F, 0x0000_03C0, 0x0000_0100, 0x0000_0000]),
        (0x0000_000D, 2, [0x0000_0100, 0x0000_0240, 0x0000_0000, 0x0000_0000]),
        (0x0000_000D, 3, [0x0000_0040, 0x0000_03C0, 0x0000_0000, 0x0000_0000]),
        (0x0000_0012, 0, [0x0000_0001, 0x0000_0000, 0x0000_0000, 0x0000_241F]),
        (0x0000_0012, 1, [0x0000_0036, 0x0000_0000, 0x0000_001F, 0x0000_0000]),
        (0x0000_0012, 2, [0x7000_0001, 0x0000_0000, 0x05D8_0001, 0x0000_0000]),
        (0x0000_0014, 0, [0x0000_0001, 0x0000_000F, 0x0000_0007, 0x0000_0000]),
        (0x0000_0014, 1, [0x0249_0002, 0x003F_3FFF, 0x0000_0000, 0x0000_0000]),
        (0x0000_0015, 0, [0x0000_0002, 0x0000_00B0, 0x0000_0000, 0x0000_0000]),
        (0x0000_0016, 0, [0x0000_0A8C, 0x0000_0DAC, 0x0000_0064, 0x0000_0000]),
        (0x8000_0000, 0, [0x8000_0008, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x8000_0001, 0, [0x0000_0000, 0x0000_0000, 0x0000_0121, 0x2C10_0800]),
        (0x8000_0005, 0, [0x0000_0000, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x8000_0006, 0, [0x0000_0000, 0x0000_0000, 0x0100_6040, 0x0000_0000]),
        (0x8000_0007, 0, [0x0000_0000, 0x0000_0000, 0x0000_0000, 0x0000_0100]),
        (0x8000_0008, 0, [0x0000_3027, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
    ]);
    with_brand(raw, "Intel(R) Core(TM) i7-7500U CPU @ 2.70GHz")
}

/// AMD Ryzen 7 3700X
#[rustfmt::skip]
pub fn amd_zen2() -> RawCpuData {
    let raw = leaves(RawCpuData::new(), &[
        (0x0000_0000, 0, [0x0000_0010, 0x6874_7541, 0x444D_4163, 0x6974_6E65]),
        (0x0000_0001, 0, [0x0087_0F10, 0x0010_0800, 0x7ED8_320B, 0x178B_FBFF]),
        (0x0000_0005, 0, [0x0000_0040, 0x0000_0040, 0x0000_0003, 0x0000_0011]),
        (0x0000_0006, 0, [0x0000_0004, 0x0000_0000, 0x0000_0001, 0x0000_0000]),
        (0x0000_0007, 0, [0x0000_0000, 0x219C_91A9, 0x0040_0004, 0x0000_0000]),
        (0x0000_000D, 0, [0x0000_0207, 0x0000_0340, 0x0000_0380, 0x0000_0000]),
        (0x0000_000D, 1, [0x0000_000F, 0x0000_0340, 0x0000_0000, 0x0000_0000]),
        (0x0000_000D, 2, [0x0000_0100, 0x0000_0240, 0x0000_0000, 0x0000_0000]),
        (0x8000_0000, 0, [0x8000_001F, 0x6874_7541, 0x444D_4163, 0x6974_6E65]),
        (0x8000_0001, 0, [0x0087_0F10, 0x2000_0000, 0x75C2_37FF, 0x2FD3_FBFF]),
        (0x8000_0005, 0, [0xFF40_FF40, 0xFF40_FF40, 0x2008_0140, 0x2008_0140]),
        (0x8000_0006, 0, [0x2600_6400, 0x6600_6400, 0x0200_6140, 0x0100_9140]),
        (0x8000_0007, 0, [0x0000_0000, 0x0000_001B, 0x0000_0000, 0x0000_6799]),
        (0x8000_0008, 0, [0x0000_3030, 0x010E_B757, 0x0000_700F, 0x0001_0000]),
        (0x8000_001A, 0, [0x0000_0006, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x8000_001D, 0, [0x0000_4121, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x8000_001D, 1, [0x0000_4122, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x8000_001D, 2, [0x0000_4143, 0x01C0_003F, 0x0000_03FF, 0x0000_0002]),
        (0x8000_001D, 3, [0x0001_C163, 0x03C0_003F, 0x0000_3FFF, 0x0000_0001]),
        (0x8000_001E, 0, [0x0000_0000, 0x0000_0100, 0x0000_0000, 0x0000_0000]),
        (0x8000_001F, 0, [0x0001_01A7, 0x0000_0040, 0x0000_01FD, 0x0000_0001]),
    ]);
    with_brand(raw, "AMD Ryzen 7 3700X 8-Core Processor")
}

/// AMD Ryzen 7 3700X in a KVM guest
pub fn amd_zen2_kvm() -> RawCpuData {
    with_hypervisor(amd_zen2(), b"KVMKVMKVM\0\0\0")
}

/// Leaves shared by both core types of the Intel Core i7-12700H
#[rustfmt::skip]
fn intel_alder_lake_common() -> RawCpuData {
    let raw = leaves(RawCpuData::new(), &[
        (0x0000_0000, 0, [0x0000_0020, 0x756E_6547, 0x6C65_746E, 0x4965_6E69]),
        (0x0000_0001, 0, [0x0009_06A3, 0x0080_0800, 0x7FFA_FBFF, 0xBFEB_FBFF]),
        (0x0000_0002, 0, [0x00FE_FF01, 0x0000_00F0, 0x0000_0000, 0x0000_0000]),
        (0x0000_0004, 3, [0xFC1F_C163, 0x02C0_003F, 0x0000_7FFF, 0x0000_0004]),
        (0x0000_0007, 0, [0x0000_0002, 0x239C_A7EB, 0x98C0_27AC, 0xFC1C_C410]),
        (0x0000_000B, 1, [0x0000_0007, 0x0000_0014, 0x0000_0201, 0x0000_0000]),
        (0x8000_0000, 0, [0x8000_0008, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
        (0x8000_0001, 0, [0x0000_0000, 0x0000_0000, 0x0000_0121, 0x2C10_0800]),
        (0x8000_0006, 0, [0x0000_0000, 0x0000_0000, 0x0500_7040, 0x0000_0000]),
        (0x8000_0008, 0, [0x0000_3027, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
    ]);
    with_brand(raw, "12th Gen Intel(R) Core(TM) i7-12700H")
}

/// Performance core of the Intel Core i7-12700H
#[rustfmt::skip]
pub fn intel_alder_lake_p() -> RawCpuData {
    leaves(intel_alder_lake_common(), &[
        (0x0000_0004, 0, [0xFC00_4121, 0x02C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x0000_0004, 1, [0xFC00_4122, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x0000_0004, 2, [0xFC01_C143, 0x0240_003F, 0x0000_07FF, 0x0000_0000]),
        (0x0000_000B, 0, [0x0000_0001, 0x0000_0002, 0x0000_0100, 0x0000_0000]),
        (0x0000_001A, 0, [0x4000_0001, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
    ])
}

/// Efficiency core of the Intel Core i7-12700H
#[rustfmt::skip]
pub fn intel_alder_lake_e() -> RawCpuData {
    leaves(intel_alder_lake_common(), &[
        (0x0000_0004, 0, [0xFC00_4121, 0x01C0_003F, 0x0000_003F, 0x0000_0000]),
        (0x0000_0004, 1, [0xFC00_4122, 0x01C0_003F, 0x0000_007F, 0x0000_0000]),
        (0x0000_0004, 2, [0xFC01_C143, 0x03C0_003F, 0x0000_07FF, 0x0000_0000]),
        (0x0000_000B, 0, [0x0000_0001, 0x0000_0001, 0x0000_0100, 0x0000_0000]),
        (0x0000_001A, 0, [0x2000_0001, 0x0000_0000, 0x0000_0000, 0x0000_0000]),
    ])
}

/// ARM Cortex-A72 r0p3, as found in the Raspberry Pi 4
pub fn arm_cortex_a72() -> RawCpuData {
    let mut raw = RawCpuData::new()
        .with_arm_register(ArmRegister::Midr, 0x410F_D083)
        .with_arm_register(ArmRegister::Mpidr, 0x8000_0000)
        .with_arm_register(ArmRegister::Revidr, 0)
        .with_arm_register(ArmRegister::IdAa64Pfr0, 0x2222)
        .with_arm_register(ArmRegister::IdAa64Pfr1, 0)
        .with_arm_register(ArmRegister::IdAa64Isar0, 0x1_1120)
        .with_arm_register(ArmRegister::IdAa64Isar1, 0)
        .with_arm_register(ArmRegister::IdAa64Isar2, 0)
        .with_arm_register(ArmRegister::IdAa64Mmfr0, 0x1124)
        .with_arm_register(ArmRegister::IdAa64Zfr0, 0)
        .with_arm_register(ArmRegister::Ctr, 0x8444_C004)
        .with_arm_register(ArmRegister::Clidr, 0x0A20_0023);
    // L1 data 32 KiB 2-way, L1 instruction 48 KiB 3-way, L2 1 MiB 16-way, all with 64 byte lines
    raw.set_arm_ccsidr(0, 0x001F_E00A);
    raw.set_arm_ccsidr(1, 0x001F_E012);
    raw.set_arm_ccsidr(2, 0x007F_E07A);
    raw
}
