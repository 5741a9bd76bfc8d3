use super::CodenameEntry;
use crate::{Architecture, Vendor};

/// Any variant and revision of a part
const fn part(vendor: Vendor, part_num: u32, codename: &'static str) -> CodenameEntry {
    CodenameEntry::new(vendor, Architecture::ARM, part_num, (0, 0xF), codename)
}

#[rustfmt::skip]
pub(super) static CODENAMES : &[CodenameEntry] = &[
    part(Vendor::ARM, 0xD03, "Apollo"),
    part(Vendor::ARM, 0xD05, "Ananke"),
    part(Vendor::ARM, 0xD07, "Atlas"),
    part(Vendor::ARM, 0xD08, "Maia"),
    part(Vendor::ARM, 0xD09, "Artemis"),
    part(Vendor::ARM, 0xD0A, "Prometheus"),
    part(Vendor::ARM, 0xD0B, "Enyo"),
    part(Vendor::ARM, 0xD0C, "Ares"),
    part(Vendor::ARM, 0xD0D, "Deimos"),
    part(Vendor::ARM, 0xD40, "Zeus"),
    part(Vendor::ARM, 0xD41, "Hercules"),
    part(Vendor::ARM, 0xD44, "Hera"),
    part(Vendor::ARM, 0xD46, "Klein"),
    part(Vendor::ARM, 0xD47, "Matterhorn"),
    part(Vendor::ARM, 0xD49, "Perseus"),
    part(Vendor::ARM, 0xD4F, "Demeter"),
    part(Vendor::ARM, 0xD80, "Hayes"),
    part(Vendor::ARM, 0xD81, "Hunter"),
    part(Vendor::Cavium, 0x0AF, "Vulcan"),
    part(Vendor::HiSilicon, 0xD01, "TaiShan v110"),
    part(Vendor::Nvidia, 0x004, "Carmel"),
    part(Vendor::Apple, 0x022, "Icestorm"),
    part(Vendor::Apple, 0x023, "Firestorm"),
    part(Vendor::Apple, 0x032, "Blizzard"),
    part(Vendor::Apple, 0x033, "Avalanche"),
    part(Vendor::Ampere, 0xAC3, "Siryn"),
];
