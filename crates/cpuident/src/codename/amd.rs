use super::CodenameEntry;
use crate::{Architecture, Vendor};

const fn amd(family: u32, models: (u32, u32), codename: &'static str) -> CodenameEntry {
    CodenameEntry::new(Vendor::AMD, Architecture::X86, family, models, codename)
}

const fn amd_m(family: u32, model: u32, codename: &'static str) -> CodenameEntry {
    amd(family, (model, model), codename)
}

#[rustfmt::skip]
pub(super) static CODENAMES : &[CodenameEntry] = &[
    // K5 and K6
    amd(5, (0x00, 0x03), "K5"),
    amd(5, (0x06, 0x07), "K6"),
    amd_m(5, 0x08, "K6-2"),
    amd(5, (0x09, 0x0D), "K6-III"),

    // K7
    amd_m(6, 0x01, "Argon"),
    amd_m(6, 0x02, "Pluto"),
    amd_m(6, 0x03, "Spitfire"),
    amd_m(6, 0x04, "Thunderbird"),
    amd_m(6, 0x06, "Palomino"),
    amd_m(6, 0x07, "Morgan"),
    amd_m(6, 0x08, "Thoroughbred"),
    amd_m(6, 0x0A, "Barton"),

    // K8
    amd(0xF, (0x04, 0x0F), "SledgeHammer").brand("Opteron"),
    amd(0xF, (0x04, 0x0F), "ClawHammer"),
    amd(0xF, (0x1F, 0x2F), "Venice"),
    amd(0xF, (0x40, 0x7F), "Windsor"),

    // K10
    amd_m(0x10, 0x02, "Barcelona").brand("Opteron"),
    amd_m(0x10, 0x02, "Agena"),
    amd_m(0x10, 0x04, "Shanghai").brand("Opteron"),
    amd_m(0x10, 0x04, "Deneb"),
    amd_m(0x10, 0x05, "Propus"),
    amd_m(0x10, 0x06, "Regor"),
    amd_m(0x10, 0x08, "Istanbul"),
    amd_m(0x10, 0x09, "Magny-Cours"),
    amd_m(0x10, 0x0A, "Thuban"),
    amd_m(0x11, 0x03, "Griffin"),
    amd_m(0x12, 0x01, "Llano"),
    amd(0x14, (0x01, 0x02), "Brazos"),

    // Bulldozer
    amd_m(0x15, 0x01, "Zambezi"),
    amd_m(0x15, 0x02, "Vishera"),
    amd(0x15, (0x10, 0x1F), "Trinity"),
    amd(0x15, (0x30, 0x3F), "Kaveri"),
    amd(0x15, (0x60, 0x6F), "Carrizo"),
    amd(0x15, (0x70, 0x7F), "Stoney Ridge"),
    amd(0x16, (0x00, 0x0F), "Kabini"),
    amd(0x16, (0x30, 0x3F), "Beema"),

    // Zen to Zen 2
    amd_m(0x17, 0x01, "Naples").brand("EPYC"),
    amd_m(0x17, 0x01, "Whitehaven").brand("Threadripper"),
    amd_m(0x17, 0x01, "Summit Ridge"),
    amd_m(0x17, 0x08, "Colfax").brand("Threadripper"),
    amd_m(0x17, 0x08, "Pinnacle Ridge"),
    amd_m(0x17, 0x11, "Raven Ridge"),
    amd_m(0x17, 0x18, "Picasso"),
    amd_m(0x17, 0x20, "Dali"),
    amd_m(0x17, 0x31, "Castle Peak").brand("Threadripper"),
    amd_m(0x17, 0x31, "Rome"),
    amd_m(0x17, 0x60, "Renoir"),
    amd_m(0x17, 0x68, "Lucienne"),
    amd_m(0x17, 0x71, "Matisse"),
    amd_m(0x17, 0x90, "Van Gogh"),
    amd_m(0x17, 0xA0, "Mendocino"),

    // Zen 3 and Zen 4
    amd_m(0x19, 0x01, "Milan"),
    amd_m(0x19, 0x08, "Chagall"),
    amd(0x19, (0x10, 0x11), "Genoa"),
    amd_m(0x19, 0x18, "Storm Peak"),
    amd_m(0x19, 0x21, "Vermeer"),
    amd(0x19, (0x40, 0x44), "Rembrandt"),
    amd_m(0x19, 0x50, "Cezanne"),
    amd_m(0x19, 0x61, "Raphael"),
    amd(0x19, (0x74, 0x75), "Phoenix"),
    amd_m(0x19, 0x78, "Phoenix 2"),
    amd(0x19, (0xA0, 0xAF), "Bergamo"),

    // Zen 5
    amd_m(0x1A, 0x02, "Turin"),
    amd_m(0x1A, 0x11, "Turin Dense"),
    amd_m(0x1A, 0x24, "Strix Point"),
    amd_m(0x1A, 0x44, "Granite Ridge"),

    // Hygon licensed Zen
    CodenameEntry::new(Vendor::Hygon, Architecture::X86, 0x18, (0x00, 0x0F), "Dhyana"),
];
