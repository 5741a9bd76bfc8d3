//! Bit manipulation helpers for decoding register values.

/// Check if bit `bit` is set in `val`.
/// 
/// Bits outside of the register width are never set.
pub const fn is_bit_set(val: u32, bit: u32) -> bool {
    bit < 32 && (val >> bit) & 0x1 == 0x1
}

/// Extract a `width` bit wide field starting at bit `shift`.
pub const fn bit_field(val: u32, shift: u32, width: u32) -> u32 {
    if shift >= 32 || width == 0 {
        return 0;
    }
    let val = val >> shift;
    if width >= 32 { val } else { val & ((1 << width) - 1) }
}

/// Extract a `width` bit wide field starting at bit `shift` from a 64-bit system register.
pub const fn bit_field64(val: u64, shift: u32, width: u32) -> u64 {
    if shift >= 64 || width == 0 {
        return 0;
    }
    let val = val >> shift;
    if width >= 64 { val } else { val & ((1 << width) - 1) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_extraction() {
        // family/model/stepping layout of cpuid(1).eax
        let eax = 0x0008_06E9;
        assert_eq!(bit_field(eax, 0, 4), 0x9);
        assert_eq!(bit_field(eax, 4, 4), 0xE);
        assert_eq!(bit_field(eax, 8, 4), 0x6);
        assert_eq!(bit_field(eax, 16, 4), 0x8);
        assert_eq!(bit_field(eax, 40, 4), 0);
        assert_eq!(bit_field(u32::MAX, 0, 32), u32::MAX);

        assert_eq!(bit_field64(0x410F_D083, 24, 8), 0x41);
        assert_eq!(bit_field64(0x410F_D083, 4, 12), 0xD08);
    }

    #[test]
    fn bit_checks() {
        assert!(is_bit_set(0x8000_0000, 31));
        assert!(!is_bit_set(0x8000_0000, 30));
        assert!(!is_bit_set(u32::MAX, 32));
    }
}
