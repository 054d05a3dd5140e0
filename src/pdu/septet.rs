// ABOUTME: GSM 03.38 default alphabet septet packing for SMS user data
// ABOUTME: Packs 7-bit values LSB first into octets using the standard carry technique

/// Number of octets needed to carry `septets` packed septets
pub fn packed_len(septets: usize) -> usize {
    (septets * 7).div_ceil(8)
}

/// Pack 7-bit values into octets
///
/// Each septet is shifted in above the bits already pending, so the low bits
/// of septet `n + 1` fill the free high bits of the octet carrying septet `n`.
/// The output is always exactly `ceil(7n / 8)` octets, including a final
/// octet that happens to be zero.
pub fn pack_septets(septets: &[u8]) -> Vec<u8> {
    let mut packed = Vec::with_capacity(packed_len(septets.len()));
    let mut pending: u16 = 0;
    let mut bits = 0;

    for &septet in septets {
        pending |= u16::from(septet & 0x7F) << bits;
        bits += 7;
        while bits >= 8 {
            packed.push(pending as u8);
            pending >>= 8;
            bits -= 8;
        }
    }
    if bits > 0 {
        packed.push(pending as u8);
    }
    packed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::to_hex;

    #[test]
    fn test_pack_hellohello() {
        assert_eq!(to_hex(&pack_septets(b"hellohello")), "E8329BFD4697D9EC37");
    }

    #[test]
    fn test_pack_eight_septets_fill_seven_octets() {
        let packed = pack_septets(b"12345678");
        assert_eq!(packed.len(), 7);
        assert_eq!(to_hex(&packed), "31D98C56B3DD70");
    }

    #[test]
    fn test_pack_keeps_trailing_zero_octet() {
        // The last septet's top bit lands alone in the final octet
        let packed = pack_septets(b"abcdef1");
        assert_eq!(to_hex(&packed), "61F1985C36C700");
        assert_eq!(packed.len(), packed_len(7));
    }

    #[test]
    fn test_packed_len() {
        assert_eq!(packed_len(0), 0);
        assert_eq!(packed_len(1), 1);
        assert_eq!(packed_len(8), 7);
        assert_eq!(packed_len(10), 9);
        assert_eq!(packed_len(160), 140);
        assert_eq!(packed_len(152), 133);
    }

    #[test]
    fn test_pack_empty() {
        assert!(pack_septets(&[]).is_empty());
    }
}
