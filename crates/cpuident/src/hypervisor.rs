//! Hypervisor detection

use cpuident_common::utils::is_bit_set;
use cpuident_macros::{EnumDisplay, EnumFromName};

use crate::raw::{RawCpuData, Register, HYPERVISOR_LEAF_BASE};

/// Hypervisor the CPU data was captured under
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, EnumDisplay, EnumFromName)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum HypervisorVendor {
    #[display("bhyve")]
    Bhyve,
    #[display("Hyper-V")]
    HyperV,
    KVM,
    Parallels,
    QEMU,
    VirtualBox,
    VMware,
    Xen,
    ACRN,
    QNX,
    #[display("Apple Virtualization")]
    #[parse_name("VirtualApple")]
    VirtualApple,
    /// The hypervisor bit is set, but the vendor string is unknown
    Unknown,
}

#[rustfmt::skip]
static HYPERVISOR_VENDORS : &[(&[u8; 12], HypervisorVendor)] = &[
    (b"bhyve bhyve ", HypervisorVendor::Bhyve),
    (b"Microsoft Hv", HypervisorVendor::HyperV),
    (b"KVMKVMKVM\0\0\0", HypervisorVendor::KVM),
    (b" lrpepyh  vr", HypervisorVendor::Parallels),
    (b"TCGTCGTCGTCG", HypervisorVendor::QEMU),
    (b"VBoxVBoxVBox", HypervisorVendor::VirtualBox),
    (b"VMwareVMware", HypervisorVendor::VMware),
    (b"XenVMMXenVMM", HypervisorVendor::Xen),
    (b"ACRNACRNACRN", HypervisorVendor::ACRN),
    (b" QNXQVMBSQG ", HypervisorVendor::QNX),
    (b"VirtualApple", HypervisorVendor::VirtualApple),
];

/// Detect the hypervisor, `None` when running on bare metal.
/// 
/// Presence is indicated by leaf 1 ECX bit 31, the vendor by the signature in leaf 0x4000_0000.
pub fn detect_hypervisor(raw: &RawCpuData) -> Option<HypervisorVendor> {
    let present = raw.leaf(1, 0).map_or(false, |regs| is_bit_set(regs.ecx, 31));
    if !present {
        return None;
    }

    let Some(regs) = raw.leaf(HYPERVISOR_LEAF_BASE, 0) else {
        return Some(HypervisorVendor::Unknown);
    };
    let signature = regs.bytes([Register::Ebx, Register::Ecx, Register::Edx]);
    let vendor = HYPERVISOR_VENDORS.iter()
        .find(|(name, _)| name.as_slice() == signature.as_slice())
        .map_or(HypervisorVendor::Unknown, |(_, vendor)| *vendor);
    Some(vendor)
}
