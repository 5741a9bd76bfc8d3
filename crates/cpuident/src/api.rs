//! Public query functions

use cpuident_logging::{log_info, log_verbose};

use crate::{
    arm_part_name, classify, decode_features, decode_sgx, decode_topology, detect_hypervisor, raw, resolve_codename,
    sys, AffinityMask, ArchIdentity, Architecture, ArmIdentity, CodenameDatabase, CpuIdentity, Error, Midr, Purpose,
    RawCpuData, Result, Vendor, X86Identity, X86Signature, LOG_CAT, MAX_AFFINITY_CPUS,
};

/// ARM parts used as little cores in big.LITTLE systems, as `(implementer, part number)`
#[rustfmt::skip]
const LITTLE_ARM_PARTS : &[(u32, u32)] = &[
    (0x41, 0xD03), // Cortex-A53
    (0x41, 0xD04), // Cortex-A35
    (0x41, 0xD05), // Cortex-A55
    (0x41, 0xD46), // Cortex-A510
    (0x41, 0xD80), // Cortex-A520
    (0x51, 0x801), // Kryo 2XX Silver
    (0x51, 0x803), // Kryo 3XX Silver
    (0x51, 0x805), // Kryo 4XX Silver
    (0x61, 0x022), // M1 Icestorm
    (0x61, 0x032), // M2 Blizzard
];

/// Identify the CPU the current thread runs on.
/// 
/// `total_logical_cpus` is filled in from the OS, all other values come from the CPU.
pub fn identify() -> Result<CpuIdentity> {
    let raw = raw::capture_raw()?;
    let mut identity = identify_raw(&raw);
    identity.total_logical_cpus = u32::try_from(total_logical_cpus()).ok();
    log_info!(LOG_CAT, "Identified {} {} ({})", identity.vendor, identity.brand_str, identity.codename.as_deref().unwrap_or("unknown codename"));
    Ok(identity)
}

/// Identify a CPU from previously captured raw data.
pub fn identify_raw(raw: &RawCpuData) -> CpuIdentity {
    let class = classify(raw);
    let features = decode_features(raw, class.vendor, class.architecture);
    let topology = decode_topology(raw, class.vendor);

    let (arch, codename, hypervisor) = match class.architecture {
        Architecture::X86 => {
            let signature = X86Signature::from_raw(raw, class.vendor);
            let codename = signature.and_then(|sig| resolve_codename(class.vendor, Architecture::X86, sig.ext_family, sig.ext_model, sig.stepping, &class.brand_str));
            let x86 = X86Identity {
                family: signature.map(|sig| sig.family),
                model: signature.map(|sig| sig.model),
                stepping: signature.map(|sig| sig.stepping),
                ext_family: signature.map(|sig| sig.ext_family),
                ext_model: signature.map(|sig| sig.ext_model),
                sse_size: topology.sse_size,
                sgx: decode_sgx(raw, &features),
            };
            (ArchIdentity::X86(x86), codename, detect_hypervisor(raw))
        },
        Architecture::ARM => match Midr::from_raw_data(raw) {
            Some(midr) => {
                let codename = resolve_codename(class.vendor, Architecture::ARM, midr.part_num, midr.variant, midr.revision, &class.brand_str);
                let arm = ArmIdentity {
                    implementer: midr.implementer,
                    variant: midr.variant,
                    part_num: midr.part_num,
                    revision: midr.revision,
                };
                (ArchIdentity::Arm(arm), codename, None)
            },
            None => (ArchIdentity::Unknown, None, None),
        },
        Architecture::Unknown => (ArchIdentity::Unknown, None, None),
    };

    log_verbose!(LOG_CAT, "Decoded {} {} with {} features", class.architecture, class.vendor, features.len());

    CpuIdentity {
        architecture: class.architecture,
        vendor: class.vendor,
        vendor_str: class.vendor_str,
        brand_str: class.brand_str,
        num_cores: topology.num_cores,
        num_logical_cpus: topology.num_logical_cpus,
        total_logical_cpus: None,
        purpose: topology.purpose,
        features,
        caches: topology.caches,
        codename,
        hypervisor,
        affinity_mask: AffinityMask::new(),
        detection_hints: topology.hints,
        arch,
    }
}

/// Identify all core types of a system, from raw data captured on each logical CPU.
/// 
/// The raw data at index `i` is treated as captured on logical CPU `i`.
/// One identity is returned per distinct purpose, in order of first appearance, with the affinity mask of its logical CPUs.
/// On systems with more than one core type, the core counts describe the logical CPUs of that core type.
pub fn identify_system(raws: &[RawCpuData]) -> Vec<CpuIdentity> {
    let mut identities : Vec<CpuIdentity> = raws.iter().map(identify_raw).collect();
    classify_arm_parts(&mut identities);

    let mut groups : Vec<(CpuIdentity, u32)> = Vec::new();
    for (idx, identity) in identities.into_iter().enumerate() {
        let group = match groups.iter_mut().position(|(group, _)| group.purpose == identity.purpose) {
            Some(pos) => &mut groups[pos],
            None => {
                groups.push((identity, 0));
                let last = groups.len() - 1;
                &mut groups[last]
            },
        };

        if idx < MAX_AFFINITY_CPUS {
            group.0.affinity_mask.enable(idx);
        }
        group.1 += 1;
    }

    let is_heterogeneous = groups.len() > 1;
    let total = u32::try_from(raws.len()).ok();
    groups.into_iter()
        .map(|(mut identity, members)| {
            if is_heterogeneous {
                let threads_per_core = match (identity.num_logical_cpus, identity.num_cores) {
                    (Some(logical), Some(cores)) if cores != 0 => (logical / cores).max(1),
                    _ => 1,
                };
                identity.num_logical_cpus = Some(members);
                identity.num_cores = Some(members.div_ceil(threads_per_core));
            }
            identity.total_logical_cpus = total;
            identity
        })
        .collect()
}

/// Mark ARM identities as big or little cores, when more than one distinct part is present.
fn classify_arm_parts(identities: &mut [CpuIdentity]) {
    let mut parts : Vec<(u32, u32)> = Vec::new();
    for arm in identities.iter().filter_map(CpuIdentity::arm) {
        if !parts.contains(&(arm.implementer, arm.part_num)) {
            parts.push((arm.implementer, arm.part_num));
        }
    }
    if parts.len() < 2 {
        return;
    }

    for identity in identities {
        let Some((implementer, part_num)) = identity.arm().map(|arm| (arm.implementer, arm.part_num)) else { continue };
        let is_little = LITTLE_ARM_PARTS.contains(&(implementer, part_num));
        identity.purpose = if is_little { Purpose::Efficiency } else { Purpose::Performance };
        log_verbose!(LOG_CAT, "ARM part {} classified as {}", arm_part_name(implementer, part_num).unwrap_or("unknown"), identity.purpose);
    }
}

/// Get all known codenames for a vendor, in registration order.
pub fn list_known_cpus(vendor: Vendor) -> Result<Vec<String>> {
    let names = CodenameDatabase::global().codenames(vendor);
    if names.is_empty() {
        Err(Error::EmptyResult)
    } else {
        Ok(names)
    }
}

/// Check if the CPU can be queried for identification data.
pub fn cpuid_present() -> bool {
    raw::cpuid_present()
}

/// Number of logical CPUs reported by the OS.
pub fn total_logical_cpus() -> usize {
    sys::logical_processor_count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_data, CacheDescriptor, CpuFeature, DetectionHint, HypervisorVendor};

    #[test]
    fn intel_kaby_lake() {
        let identity = identify_raw(&test_data::intel_kaby_lake_u());
        assert_eq!(identity.architecture, Architecture::X86);
        assert_eq!(identity.vendor, Vendor::Intel);
        assert_eq!(identity.codename.as_deref(), Some("Kaby Lake-U"));
        assert_eq!(identity.num_cores, Some(2));
        assert_eq!(identity.num_logical_cpus, Some(4));
        assert_eq!(identity.total_logical_cpus, None);
        assert_eq!(identity.hypervisor, None);
        assert!(identity.affinity_mask.none());
        assert!(identity.has_feature(CpuFeature::SSE4_2));
        assert!(identity.has_feature(CpuFeature::AVX2));
        assert!(!identity.has_feature(CpuFeature::AVX512F));

        let x86 = identity.x86().unwrap();
        assert_eq!((x86.ext_family, x86.ext_model, x86.stepping), (Some(6), Some(0x8E), Some(9)));
        assert_eq!(x86.sgx.as_ref().map(|sgx| sgx.num_epc_sections()), Some(1));
    }

    #[test]
    fn amd_under_kvm() {
        let identity = identify_raw(&test_data::amd_zen2_kvm());
        assert_eq!(identity.vendor, Vendor::AMD);
        assert_eq!(identity.hypervisor, Some(HypervisorVendor::KVM));
        assert_eq!(identity.codename.as_deref(), Some("Matisse"));
        assert!(identity.has_feature(CpuFeature::HYPERVISOR));
    }

    #[test]
    fn arm_cortex_a72() {
        let identity = identify_raw(&test_data::arm_cortex_a72());
        assert_eq!(identity.architecture, Architecture::ARM);
        assert_eq!(identity.vendor, Vendor::ARM);
        assert_eq!(identity.brand_str, "ARM Cortex-A72");
        assert_eq!(identity.codename.as_deref(), Some("Maia"));
        assert_eq!(identity.purpose, Purpose::General);
        assert_eq!(identity.num_cores, None);
        assert_eq!(identity.hypervisor, None);
        assert!(identity.has_feature(CpuFeature::ASIMD));
    }

    #[test]
    fn empty_raw_data() {
        let identity = identify_raw(&RawCpuData::new());
        assert_eq!(identity.architecture, Architecture::Unknown);
        assert_eq!(identity.vendor, Vendor::Unknown);
        assert_eq!(identity.arch, ArchIdentity::Unknown);
        assert!(identity.features.is_empty());
        assert_eq!(identity.num_cores, None);
        assert_eq!(identity.codename, None);
        for (_, desc) in identity.caches.iter() {
            assert_eq!(*desc, CacheDescriptor::ABSENT);
        }
    }

    #[test]
    fn snapshot_preserves_identity() {
        let raw = test_data::intel_kaby_lake_u();
        let mut text = Vec::new();
        raw.serialize(&mut text).unwrap();
        let loaded = RawCpuData::deserialize(&String::from_utf8(text).unwrap()).unwrap();
        assert_eq!(identify_raw(&loaded), identify_raw(&raw));
    }

    #[test]
    fn hybrid_system() {
        // 6 P-cores with 2 threads each, followed by 8 E-cores
        let mut raws = vec![test_data::intel_alder_lake_p(); 12];
        raws.extend(vec![test_data::intel_alder_lake_e(); 8]);

        let identities = identify_system(&raws);
        assert_eq!(identities.len(), 2);

        let p_cores = &identities[0];
        assert_eq!(p_cores.purpose, Purpose::Performance);
        assert_eq!(p_cores.codename.as_deref(), Some("Alder Lake-P"));
        assert_eq!(p_cores.num_logical_cpus, Some(12));
        assert_eq!(p_cores.num_cores, Some(6));
        assert_eq!(p_cores.total_logical_cpus, Some(20));
        assert_eq!(p_cores.affinity_mask.iter_ones().collect::<Vec<_>>(), (0..12).collect::<Vec<_>>());
        assert!(p_cores.detection_hints.contains(DetectionHint::PurposeFromHybridLeaf));

        let e_cores = &identities[1];
        assert_eq!(e_cores.purpose, Purpose::Efficiency);
        assert_eq!(e_cores.num_logical_cpus, Some(8));
        assert_eq!(e_cores.num_cores, Some(8));
        assert_eq!(e_cores.affinity_mask.iter_ones().collect::<Vec<_>>(), (12..20).collect::<Vec<_>>());
    }

    #[test]
    fn homogeneous_system() {
        let raws = vec![test_data::intel_kaby_lake_u(); 4];
        let identities = identify_system(&raws);
        assert_eq!(identities.len(), 1);
        assert_eq!(identities[0].num_cores, Some(2));
        assert_eq!(identities[0].affinity_mask.count_ones(), 4);
        assert_eq!(identities[0].total_logical_cpus, Some(4));
        assert_eq!(identify_system(&[]), Vec::new());
    }

    #[test]
    fn big_little_arm() {
        let little = RawCpuData::new().with_arm_register(crate::raw::ArmRegister::Midr, 0x410F_D034);
        let raws = vec![little.clone(), little, test_data::arm_cortex_a72(), test_data::arm_cortex_a72()];
        let identities = identify_system(&raws);
        assert_eq!(identities.len(), 2);
        assert_eq!(identities[0].purpose, Purpose::Efficiency);
        assert_eq!(identities[0].codename.as_deref(), Some("Apollo"));
        assert_eq!(identities[1].purpose, Purpose::Performance);
        assert_eq!(identities[1].affinity_mask.iter_ones().collect::<Vec<_>>(), vec![2, 3]);

        // A single part stays general purpose
        let identities = identify_system(&[test_data::arm_cortex_a72()]);
        assert_eq!(identities[0].purpose, Purpose::General);
    }

    #[test]
    fn known_cpus() {
        let intel = list_known_cpus(Vendor::Intel).unwrap();
        assert!(intel.iter().any(|name| name == "Kaby Lake-U"));
        assert_eq!(intel, list_known_cpus(Vendor::Intel).unwrap());
        assert!(list_known_cpus(Vendor::Hygon).unwrap().contains(&"Dhyana".to_string()));
        assert_eq!(list_known_cpus(Vendor::Cyrix), Err(Error::EmptyResult));
    }

    #[test]
    fn live_identification() {
        match identify() {
            Ok(identity) => {
                assert!(identity.total_logical_cpus.map_or(false, |count| count >= 1));
                assert!(cpuid_present());
            },
            Err(err) => assert!(matches!(err, Error::UnsupportedPlatform | Error::InstructionUnsupported)),
        }
    }
}
