use super::CodenameEntry;
use crate::{Architecture, Vendor};

const fn intel(family: u32, models: (u32, u32), codename: &'static str) -> CodenameEntry {
    CodenameEntry::new(Vendor::Intel, Architecture::X86, family, models, codename)
}

/// Single model
const fn intel_m(family: u32, model: u32, codename: &'static str) -> CodenameEntry {
    intel(family, (model, model), codename)
}

#[rustfmt::skip]
pub(super) static CODENAMES : &[CodenameEntry] = &[
    // P5
    intel_m(5, 0x01, "P5"),
    intel_m(5, 0x02, "P54C"),
    intel_m(5, 0x04, "P55C"),
    intel_m(5, 0x07, "P54C"),
    intel_m(5, 0x08, "Tillamook"),

    // P6
    intel_m(6, 0x01, "Pentium Pro"),
    intel_m(6, 0x03, "Klamath"),
    intel_m(6, 0x05, "Deschutes"),
    intel_m(6, 0x06, "Mendocino"),
    intel_m(6, 0x07, "Katmai"),
    intel_m(6, 0x08, "Coppermine"),
    intel_m(6, 0x0A, "Coppermine"),
    intel_m(6, 0x0B, "Tualatin"),
    intel_m(6, 0x09, "Banias"),
    intel_m(6, 0x0D, "Dothan"),
    intel_m(6, 0x0E, "Yonah"),

    // Core
    intel_m(6, 0x0F, "Merom"),
    intel_m(6, 0x16, "Merom-L"),
    intel_m(6, 0x17, "Yorkfield").brand("Core(TM)2 Quad"),
    intel_m(6, 0x17, "Penryn"),
    intel_m(6, 0x1D, "Dunnington"),

    // Nehalem and Westmere
    intel_m(6, 0x1A, "Gainestown").brand("Xeon"),
    intel_m(6, 0x1A, "Bloomfield"),
    intel_m(6, 0x1E, "Clarksfield").brand("Mobile"),
    intel_m(6, 0x1E, "Lynnfield"),
    intel_m(6, 0x25, "Arrandale").brand("Mobile"),
    intel_m(6, 0x25, "Clarkdale"),
    intel_m(6, 0x2C, "Gulftown"),
    intel_m(6, 0x2E, "Beckton"),
    intel_m(6, 0x2F, "Westmere-EX"),

    // Sandy Bridge to Broadwell
    intel_m(6, 0x2A, "Sandy Bridge"),
    intel_m(6, 0x2D, "Sandy Bridge-E"),
    intel_m(6, 0x3A, "Ivy Bridge"),
    intel_m(6, 0x3E, "Ivy Bridge-E"),
    intel_m(6, 0x3C, "Haswell"),
    intel_m(6, 0x3F, "Haswell-E"),
    intel_m(6, 0x45, "Haswell-ULT"),
    intel_m(6, 0x46, "Crystal Well"),
    intel_m(6, 0x3D, "Broadwell-U"),
    intel_m(6, 0x47, "Broadwell-H"),
    intel_m(6, 0x4F, "Broadwell-E"),
    intel_m(6, 0x56, "Broadwell-DE"),

    // Skylake and its refreshes
    intel_m(6, 0x4E, "Skylake-U"),
    intel_m(6, 0x5E, "Skylake-S"),
    intel(6, (0x55, 0x55), "Skylake-SP").steppings(0x0, 0x4),
    intel(6, (0x55, 0x55), "Cascade Lake-SP").steppings(0x5, 0x7),
    intel(6, (0x55, 0x55), "Cooper Lake-SP").steppings(0xA, 0xB),
    intel_m(6, 0x8E, "Kaby Lake-Y").stepping(0x9).brand("7Y"),
    intel_m(6, 0x8E, "Kaby Lake-U").stepping(0x9),
    intel_m(6, 0x8E, "Kaby Lake-R").stepping(0xA),
    intel_m(6, 0x8E, "Amber Lake-Y").stepping(0xC).brand("Y"),
    intel_m(6, 0x8E, "Whiskey Lake-U").stepping(0xB),
    intel_m(6, 0x8E, "Comet Lake-U").stepping(0xC),
    intel_m(6, 0x8E, "Kaby Lake"),
    intel_m(6, 0x9E, "Kaby Lake-S").stepping(0x9),
    intel(6, (0x9E, 0x9E), "Coffee Lake-S").steppings(0xA, 0xD),
    intel_m(6, 0xA5, "Comet Lake-S"),
    intel_m(6, 0xA6, "Comet Lake-U"),
    intel_m(6, 0x66, "Cannon Lake"),

    // Sunny Cove and later
    intel_m(6, 0x7D, "Ice Lake"),
    intel_m(6, 0x7E, "Ice Lake-U"),
    intel_m(6, 0x6A, "Ice Lake-SP"),
    intel_m(6, 0x6C, "Ice Lake-D"),
    intel_m(6, 0xA7, "Rocket Lake"),
    intel_m(6, 0x8C, "Tiger Lake-U"),
    intel_m(6, 0x8D, "Tiger Lake-H"),
    intel_m(6, 0x8A, "Lakefield"),
    intel_m(6, 0x97, "Alder Lake-S"),
    intel_m(6, 0x9A, "Alder Lake-P"),
    intel_m(6, 0xBE, "Alder Lake-N"),
    intel_m(6, 0xB7, "Raptor Lake-S"),
    intel_m(6, 0xBF, "Raptor Lake-S"),
    intel_m(6, 0xBA, "Raptor Lake-P"),
    intel_m(6, 0xAA, "Meteor Lake"),
    intel_m(6, 0xBD, "Lunar Lake"),
    intel_m(6, 0xC5, "Arrow Lake-H"),
    intel_m(6, 0xC6, "Arrow Lake-S"),
    intel_m(6, 0x8F, "Sapphire Rapids"),
    intel_m(6, 0xCF, "Emerald Rapids"),
    intel_m(6, 0xAD, "Granite Rapids"),
    intel_m(6, 0xAF, "Sierra Forest"),

    // Atom
    intel_m(6, 0x1C, "Bonnell"),
    intel_m(6, 0x26, "Lincroft"),
    intel_m(6, 0x36, "Cedarview"),
    intel_m(6, 0x37, "Bay Trail"),
    intel_m(6, 0x4C, "Cherry Trail"),
    intel_m(6, 0x5C, "Apollo Lake"),
    intel_m(6, 0x5F, "Denverton"),
    intel_m(6, 0x7A, "Gemini Lake"),
    intel_m(6, 0x86, "Snow Ridge"),
    intel_m(6, 0x96, "Elkhart Lake"),
    intel_m(6, 0x9C, "Jasper Lake"),

    // Xeon Phi
    intel_m(6, 0x57, "Knights Landing"),
    intel_m(6, 0x85, "Knights Mill"),

    // NetBurst
    intel(0xF, (0x00, 0x01), "Willamette"),
    intel_m(0xF, 0x02, "Northwood"),
    intel(0xF, (0x03, 0x04), "Prescott"),
    intel_m(0xF, 0x06, "Cedar Mill"),
];
