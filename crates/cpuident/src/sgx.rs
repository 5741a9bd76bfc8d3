//! SGX capability decoding, from leaf 0x12

use core::fmt::{self, Write};

use cpuident_common::{collections::EnumSet, fmt::Indenter, utils::{bit_field, is_bit_set}};
use cpuident_macros::{EnumCount, EnumDisplay, EnumIndex};

use crate::{raw::RawCpuData, CpuFeature, FeatureSet};

/// SGX instruction set extensions, indexed by their bit in leaf 0x12.0 EAX
#[derive(Clone, Copy, PartialEq, Eq, Debug, EnumCount, EnumIndex, EnumDisplay)]
pub enum SgxFeature {
    #[display("SGX1")]
    Sgx1     = 0,
    #[display("SGX2")]
    Sgx2     = 1,
    /// ENCLV leaf functions for oversubscription of the EPC in a VM
    #[display("ENCLV")]
    Enclv    = 5,
    /// ENCLS leaf functions for EPC oversubscription
    #[display("OVERSUB")]
    Oversub  = 6,
    /// ENCLU[EDECCSSA]
    #[display("EDECCSSA")]
    Edeccssa = 11,
}

pub type SgxFeatures = EnumSet<SgxFeature, 1>;

/// Enclave page cache section
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct EpcSection {
    /// Physical base address
    pub base: u64,
    /// Size in bytes
    pub size: u64,
}

/// SGX capabilities
#[derive(Clone, PartialEq, Eq, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SgxInfo {
    /// log2 of the maximum enclave size in 32-bit mode
    pub max_enclave_32bit: u32,
    /// log2 of the maximum enclave size in 64-bit mode
    pub max_enclave_64bit: u32,
    #[cfg_attr(feature = "serde", serde(serialize_with = "crate::identity::serialize_enum_set"))]
    pub features:          SgxFeatures,
    /// Bit vector of the supported extended SGX features written to the SSA
    pub misc_select:       u32,
    /// Attributes that can be set in SECS.ATTRIBUTES
    pub secs_attributes:   u64,
    /// XSAVE features that can be set in SECS.ATTRIBUTES.XFRM
    pub secs_xfrm:         u64,
    pub epc_sections:      Vec<EpcSection>,
}

impl SgxInfo {
    pub fn num_epc_sections(&self) -> usize {
        self.epc_sections.len()
    }
}

impl fmt::Display for SgxInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "SGX:")?;
        let mut indenter = Indenter::new(f);
        write!(indenter, "Features:         ")?;
        for (idx, feature) in self.features.iter().enumerate() {
            if idx != 0 {
                indenter.write_char(' ')?;
            }
            write!(indenter, "{feature}")?;
        }
        writeln!(indenter)?;
        writeln!(indenter, "Max enclave size: 2^{} (32-bit), 2^{} (64-bit)", self.max_enclave_32bit, self.max_enclave_64bit)?;
        writeln!(indenter, "MISCSELECT:       0x{:08X}", self.misc_select)?;
        writeln!(indenter, "SECS attributes:  0x{:016X}", self.secs_attributes)?;
        writeln!(indenter, "SECS XFRM:        0x{:016X}", self.secs_xfrm)?;
        write!(indenter, "EPC sections:     {}", self.num_epc_sections())?;
        for section in &self.epc_sections {
            write!(indenter, "\n    0x{:016X}: {} MiB", section.base, section.size / (1024 * 1024))?;
        }
        Ok(())
    }
}

/// Decode the SGX capabilities, `None` when SGX is not supported or leaf 0x12 was not captured.
pub fn decode_sgx(raw: &RawCpuData, features: &FeatureSet) -> Option<SgxInfo> {
    if !features.contains(CpuFeature::SGX) {
        return None;
    }
    let caps = raw.leaf(0x12, 0)?;

    let mut sgx_features = SgxFeatures::new();
    for feature in [SgxFeature::Sgx1, SgxFeature::Sgx2, SgxFeature::Enclv, SgxFeature::Oversub, SgxFeature::Edeccssa] {
        sgx_features.set(feature, is_bit_set(caps.eax, feature as u32));
    }

    let (secs_attributes, secs_xfrm) = raw.leaf(0x12, 1)
        .map_or((0, 0), |regs| (combine(regs.eax, regs.ebx), combine(regs.ecx, regs.edx)));

    let mut epc_sections = Vec::new();
    for subleaf in 2.. {
        let Some(regs) = raw.leaf(0x12, subleaf) else { break };
        // Type 1 is a valid EPC section, 0 ends the list
        match bit_field(regs.eax, 0, 4) {
            0 => break,
            1 => epc_sections.push(EpcSection {
                base: (u64::from(bit_field(regs.ebx, 0, 20)) << 32) | u64::from(regs.eax & 0xFFFF_F000),
                size: (u64::from(bit_field(regs.edx, 0, 20)) << 32) | u64::from(regs.ecx & 0xFFFF_F000),
            }),
            _ => {},
        }
    }

    Some(SgxInfo {
        max_enclave_32bit: bit_field(caps.edx, 0, 8),
        max_enclave_64bit: bit_field(caps.edx, 8, 8),
        features: sgx_features,
        misc_select: caps.ebx,
        secs_attributes,
        secs_xfrm,
        epc_sections,
    })
}

fn combine(low: u32, high: u32) -> u64 {
    (u64::from(high) << 32) | u64::from(low)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{decode_features, raw::Registers, test_data, Architecture, Vendor};

    #[test]
    fn decodes_capabilities() {
        let raw = test_data::intel_kaby_lake_u();
        let features = decode_features(&raw, Vendor::Intel, Architecture::X86);
        let sgx = decode_sgx(&raw, &features).unwrap();

        assert!(sgx.features.contains(SgxFeature::Sgx1));
        assert!(!sgx.features.contains(SgxFeature::Sgx2));
        assert_eq!(sgx.max_enclave_32bit, 0x1F);
        assert_eq!(sgx.max_enclave_64bit, 0x24);
        assert_eq!(sgx.misc_select, 0);
        assert_eq!(sgx.secs_attributes, 0x36);
        assert_eq!(sgx.secs_xfrm, 0x1F);
        assert_eq!(sgx.num_epc_sections(), 1);
        assert_eq!(sgx.epc_sections[0], EpcSection { base: 0x7000_0000, size: 0x05D8_0000 });
    }

    #[test]
    fn requires_sgx_feature() {
        let raw = test_data::intel_kaby_lake_u();
        assert_eq!(decode_sgx(&raw, &FeatureSet::new()), None);

        let raw = test_data::amd_zen2();
        let features = decode_features(&raw, Vendor::AMD, Architecture::X86);
        assert_eq!(decode_sgx(&raw, &features), None);
    }

    #[test]
    fn feature_bits() {
        let features: FeatureSet = [CpuFeature::SGX].into_iter().collect();
        let raw = RawCpuData::new()
            .with_leaf(0x12, 0, Registers::new((1 << 0) | (1 << 1) | (1 << 5) | (1 << 11), 0x1, 0, 0x3F20))
            .with_leaf(0x12, 2, Registers::new(0x1000_0001, 0x1, 0x0010_0001, 0x0));
        let sgx = decode_sgx(&raw, &features).unwrap();
        assert_eq!(sgx.features.iter().collect::<Vec<_>>(), vec![SgxFeature::Sgx1, SgxFeature::Sgx2, SgxFeature::Enclv, SgxFeature::Edeccssa]);
        assert_eq!(sgx.misc_select, 1);
        assert_eq!(sgx.max_enclave_32bit, 0x20);
        assert_eq!(sgx.max_enclave_64bit, 0x3F);
        // Without subleaf 1 the SECS values are unknown
        assert_eq!((sgx.secs_attributes, sgx.secs_xfrm), (0, 0));
        assert_eq!(sgx.epc_sections, vec![EpcSection { base: 0x1_1000_0000, size: 0x10_0000 }]);
    }
}
