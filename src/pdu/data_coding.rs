// ABOUTME: Alphabet selection, capacities and TP-DCS values for SMS-SUBMIT user data
// ABOUTME: GSM 7-bit for pure ASCII text, UCS2 big-endian for everything else

use super::PduError;
use super::septet::pack_septets;
use super::udh::ConcatHeader;

/// Character set a message is encoded in, chosen once per message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Alphabet {
    /// GSM default alphabet, 7 bits per character
    Gsm7,
    /// UCS2, 16 bits per character
    Ucs2,
}

impl Alphabet {
    /// GSM 7-bit when every character is ASCII, UCS2 otherwise
    pub fn for_text(text: &str) -> Self {
        if text.is_ascii() {
            Alphabet::Gsm7
        } else {
            Alphabet::Ucs2
        }
    }

    /// Characters that fit a message sent as one segment
    pub const fn single_capacity(self) -> usize {
        match self {
            Alphabet::Gsm7 => 160,
            Alphabet::Ucs2 => 70,
        }
    }

    /// Characters per segment once a header is needed
    pub const fn multipart_capacity(self) -> usize {
        match self {
            Alphabet::Gsm7 => 152,
            Alphabet::Ucs2 => 67,
        }
    }

    /// Number of segments needed for `chars` characters
    pub fn segment_count(self, chars: usize) -> usize {
        if chars <= self.single_capacity() {
            1
        } else {
            chars.div_ceil(self.multipart_capacity())
        }
    }

    /// TP-DCS octet; flash messages set the class 0 bit
    pub const fn dcs(self, flash: bool) -> u8 {
        let base = match self {
            Alphabet::Gsm7 => 0x00,
            Alphabet::Ucs2 => 0x08,
        };
        if flash { base | 0x10 } else { base }
    }

    /// Encode one segment into `(TP-UDL, TP-UD)`
    pub(crate) fn encode_segment(
        self,
        chars: &[char],
        header: Option<&ConcatHeader>,
    ) -> Result<(u8, Vec<u8>), PduError> {
        let mut user_data = header.map(ConcatHeader::to_bytes).unwrap_or_default();
        let offset = header.map_or(0, ConcatHeader::udl_offset);

        let udl = match self {
            Alphabet::Gsm7 => {
                let septets: Vec<u8> = chars.iter().map(|&c| c as u8).collect();
                user_data.extend(pack_septets(&septets));
                septets.len() + offset
            }
            Alphabet::Ucs2 => {
                let encoded = encode_ucs2(chars)?;
                let octets = encoded.len();
                user_data.extend(encoded);
                octets + offset
            }
        };

        let udl = u8::try_from(udl)
            .map_err(|_| PduError::Encoding(format!("user data length {udl} exceeds one octet")))?;
        Ok((udl, user_data))
    }
}

/// Big-endian UCS2; characters outside the Basic Multilingual Plane have no
/// UCS2 form
pub fn encode_ucs2(chars: &[char]) -> Result<Vec<u8>, PduError> {
    let mut encoded = Vec::with_capacity(chars.len() * 2);
    for &c in chars {
        let unit = u16::try_from(u32::from(c)).map_err(|_| {
            PduError::Encoding(format!("U+{:X} cannot be represented in UCS2", u32::from(c)))
        })?;
        encoded.extend_from_slice(&unit.to_be_bytes());
    }
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::to_hex;

    #[test]
    fn test_alphabet_selection() {
        assert_eq!(Alphabet::for_text("hello"), Alphabet::Gsm7);
        assert_eq!(Alphabet::for_text(""), Alphabet::Gsm7);
        assert_eq!(Alphabet::for_text("Привіт"), Alphabet::Ucs2);
        assert_eq!(Alphabet::for_text("caf\u{e9}"), Alphabet::Ucs2);
    }

    #[test]
    fn test_segment_count() {
        assert_eq!(Alphabet::Gsm7.segment_count(0), 1);
        assert_eq!(Alphabet::Gsm7.segment_count(160), 1);
        assert_eq!(Alphabet::Gsm7.segment_count(161), 2);
        assert_eq!(Alphabet::Gsm7.segment_count(304), 2);
        assert_eq!(Alphabet::Gsm7.segment_count(305), 3);
        assert_eq!(Alphabet::Ucs2.segment_count(70), 1);
        assert_eq!(Alphabet::Ucs2.segment_count(71), 2);
        assert_eq!(Alphabet::Ucs2.segment_count(134), 2);
        assert_eq!(Alphabet::Ucs2.segment_count(135), 3);
    }

    #[test]
    fn test_dcs() {
        assert_eq!(Alphabet::Gsm7.dcs(false), 0x00);
        assert_eq!(Alphabet::Gsm7.dcs(true), 0x10);
        assert_eq!(Alphabet::Ucs2.dcs(false), 0x08);
        assert_eq!(Alphabet::Ucs2.dcs(true), 0x18);
    }

    #[test]
    fn test_ucs2_big_endian() {
        let chars: Vec<char> = "Привіт".chars().collect();
        assert_eq!(to_hex(&encode_ucs2(&chars).unwrap()), "041F04400438043204560442");
    }

    #[test]
    fn test_ucs2_rejects_astral_plane() {
        let chars: Vec<char> = "ok \u{1F600}".chars().collect();
        assert!(matches!(encode_ucs2(&chars), Err(PduError::Encoding(_))));
    }

    #[test]
    fn test_encode_segment_with_header() {
        let chars: Vec<char> = "hi".chars().collect();
        let header = ConcatHeader::narrow(7, 2, 1);
        let (udl, data) = Alphabet::Ucs2.encode_segment(&chars, Some(&header)).unwrap();
        assert_eq!(udl, 4 + 6);
        assert_eq!(to_hex(&data), "05000307020100680069");
    }

    #[test]
    fn test_ucs2_multipart_udl_counts_octets_not_chars() {
        let chars: Vec<char> = "ї".repeat(67).chars().collect();
        let header = ConcatHeader::narrow(0x2A, 3, 1);
        let (udl, data) = Alphabet::Ucs2.encode_segment(&chars, Some(&header)).unwrap();
        assert_eq!(udl, 134 + 6);
        assert_ne!(udl, 67 + 6);
        assert_eq!(usize::from(udl), data.len());
    }
}
