// ABOUTME: SMS-SUBMIT PDU compiler: turns a message description into hex SCA and TPDU strings
// ABOUTME: Pure and I/O free; handles alphabet choice, segmentation, UDH, validity and addressing

pub mod address;
pub mod data_coding;
pub mod septet;
pub mod udh;
pub mod validity;

pub use address::decode_address;
pub use data_coding::Alphabet;
pub use validity::ValidityPeriod;

use thiserror::Error;
use udh::ConcatHeader;

/// TP-PID: plain short message
const PROTOCOL_ID: u8 = 0x00;
/// Offset added to the 1-based segment index to form TP-MR
const MESSAGE_REFERENCE_BASE: u16 = 100;

/// First octet bits of an SMS-SUBMIT TPDU
const MTI_SUBMIT: u8 = 0x01;
const VPF_RELATIVE: u8 = 0x10;
const UDHI: u8 = 0x40;

/// Errors produced while compiling a message
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PduError {
    /// Text cannot be represented in the selected alphabet
    #[error("{0}")]
    Encoding(String),

    /// Centre or recipient number is empty or not made of digits
    #[error("Invalid phone number: {0}")]
    InvalidNumber(String),

    /// Validity period value outside the range of its unit
    #[error("Invalid validity period: {0}")]
    InvalidValidity(String),

    /// Segment index and total are single octets
    #[error("Message needs {0} segments, at most 255 are possible")]
    TooManySegments(usize),
}

/// Everything needed to submit one short message
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PduMessage {
    center_number: String,
    recipient_number: String,
    text: String,
    flash: bool,
    validity: Option<ValidityPeriod>,
}

impl PduMessage {
    pub fn new(recipient_number: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            recipient_number: recipient_number.into().trim().to_string(),
            text: text.into(),
            ..Default::default()
        }
    }

    /// SMS service centre; empty means the one stored on the SIM
    pub fn with_center_number(mut self, center_number: impl Into<String>) -> Self {
        self.center_number = center_number.into().trim().to_string();
        self
    }

    /// Class 0 message shown immediately and not stored by the handset
    pub fn with_flash(mut self, flash: bool) -> Self {
        self.flash = flash;
        self
    }

    pub fn with_validity(mut self, validity: ValidityPeriod) -> Self {
        self.validity = Some(validity);
        self
    }

    pub fn set_validity_minutes(&mut self, minutes: u32) -> Result<(), PduError> {
        self.validity = Some(ValidityPeriod::minutes(minutes)?);
        Ok(())
    }

    pub fn set_validity_hours(&mut self, hours: u32, half_hour: bool) -> Result<(), PduError> {
        self.validity = Some(ValidityPeriod::hours(hours, half_hour)?);
        Ok(())
    }

    pub fn set_validity_days(&mut self, days: u32) -> Result<(), PduError> {
        self.validity = Some(ValidityPeriod::days(days)?);
        Ok(())
    }

    pub fn set_validity_weeks(&mut self, weeks: u32) -> Result<(), PduError> {
        self.validity = Some(ValidityPeriod::weeks(weeks)?);
        Ok(())
    }

    /// Drop the validity period so the network default applies
    pub fn clear_validity(&mut self) {
        self.validity = None;
    }

    pub fn center_number(&self) -> &str {
        &self.center_number
    }

    pub fn recipient_number(&self) -> &str {
        &self.recipient_number
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn is_flash(&self) -> bool {
        self.flash
    }

    pub fn validity(&self) -> Option<ValidityPeriod> {
        self.validity
    }

    pub fn alphabet(&self) -> Alphabet {
        Alphabet::for_text(&self.text)
    }

    /// Segments this message will be split into
    pub fn segment_count(&self) -> usize {
        self.alphabet().segment_count(self.text.chars().count())
    }
}

/// One compiled segment, ready for `AT+CMGS`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PduPart {
    /// 1-based segment index
    pub index: u8,
    pub total: u8,
    /// Service centre address field, hex
    pub sca: String,
    /// SMS-SUBMIT TPDU, hex
    pub tpdu: String,
}

impl PduPart {
    /// TPDU length in octets, the argument `AT+CMGS` expects in PDU mode
    pub fn tpdu_octets(&self) -> usize {
        self.tpdu.len() / 2
    }

    /// SCA followed by TPDU, as written after the `>` prompt
    pub fn submission(&self) -> String {
        format!("{}{}", self.sca, self.tpdu)
    }
}

/// Compile `message` with a random concatenation reference
pub fn compile(message: &PduMessage) -> Result<Vec<PduPart>, PduError> {
    compile_with_reference(message, rand::random::<u16>())
}

/// Compile `message` using `reference` for every segment's concatenation
/// header. UCS2 messages carry only the low octet.
pub fn compile_with_reference(
    message: &PduMessage,
    reference: u16,
) -> Result<Vec<PduPart>, PduError> {
    let sca = address::encode_sca(&message.center_number)?;
    let destination = address::encode_destination(&message.recipient_number)?;

    let alphabet = message.alphabet();
    let chars: Vec<char> = message.text.chars().collect();
    let count = alphabet.segment_count(chars.len());
    let total = u8::try_from(count).map_err(|_| PduError::TooManySegments(count))?;

    let segments: Vec<&[char]> = if total == 1 {
        vec![&chars[..]]
    } else {
        chars.chunks(alphabet.multipart_capacity()).collect()
    };

    let dcs = alphabet.dcs(message.flash);
    let validity = message
        .validity
        .map(|vp| format!("{:02X}", vp.octet()))
        .unwrap_or_default();

    segments
        .into_iter()
        .zip(1..=total)
        .map(|(segment, index)| {
            let header = (total > 1).then(|| match alphabet {
                Alphabet::Gsm7 => ConcatHeader::wide(reference, total, index),
                Alphabet::Ucs2 => ConcatHeader::narrow(reference as u8, total, index),
            });
            let (udl, user_data) = alphabet.encode_segment(segment, header.as_ref())?;

            let tpdu = format!(
                "{:02X}{:02X}{}{:02X}{:02X}{}{:02X}{}",
                pdu_type(message.validity.is_some(), header.is_some()),
                message_reference(index),
                destination,
                PROTOCOL_ID,
                dcs,
                validity,
                udl,
                to_hex(&user_data),
            );

            Ok(PduPart {
                index,
                total,
                sca: sca.clone(),
                tpdu,
            })
        })
        .collect()
}

fn pdu_type(validity_present: bool, header_present: bool) -> u8 {
    let mut value = MTI_SUBMIT;
    if validity_present {
        value |= VPF_RELATIVE;
    }
    if header_present {
        value |= UDHI;
    }
    value
}

/// TP-MR for a segment; wraps past 255
fn message_reference(index: u8) -> u8 {
    ((MESSAGE_REFERENCE_BASE + u16::from(index)) & 0xFF) as u8
}

/// Uppercase hex without separators
pub fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02X}")).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ascii_text(len: usize) -> String {
        "abcdefghij".chars().cycle().take(len).collect()
    }

    #[test]
    fn test_single_part_without_validity() {
        let message = PduMessage::new("+380501234567", "hellohello");
        let parts = compile_with_reference(&message, 0).unwrap();

        assert_eq!(parts.len(), 1);
        let part = &parts[0];
        assert_eq!((part.index, part.total), (1, 1));
        assert_eq!(part.sca, "00");
        assert_eq!(part.tpdu, "01650C9183501032547600000AE8329BFD4697D9EC37");
        assert_eq!(part.tpdu_octets(), part.tpdu.len() / 2);
        assert!(part.submission().starts_with("0001650C91"));
    }

    #[test]
    fn test_single_part_with_validity_and_center() {
        let mut message =
            PduMessage::new("380501234567", "hellohello").with_center_number("+380672021111");
        message.set_validity_days(4).unwrap();

        let part = &compile_with_reference(&message, 0).unwrap()[0];
        assert_eq!(part.sca, "0791836027201111");
        assert_eq!(&part.tpdu[..2], "11");
        assert_eq!(&part.tpdu[2..4], "65");
        // PID, DCS, VP, UDL follow the destination address
        assert_eq!(&part.tpdu[20..28], "0000AA0A");
    }

    #[test]
    fn test_multipart_seven_bit() {
        let message = PduMessage::new("+31641600986", ascii_text(200));
        let parts = compile_with_reference(&message, 0x1234).unwrap();

        assert_eq!(parts.len(), 2);
        for (i, part) in parts.iter().enumerate() {
            let index = i as u8 + 1;
            assert_eq!(part.index, index);
            assert_eq!(part.total, 2);
            assert_eq!(&part.tpdu[..2], "41");
            assert_eq!(&part.tpdu[2..4], format!("{:02X}", 100 + index));
            // type, MR, DA(8 octets), PID, DCS
            let udl = &part.tpdu[24..26];
            let udh = &part.tpdu[26..40];
            assert_eq!(udh, format!("060804123402{index:02X}"));
            let expected_chars = if index == 1 { 152 } else { 48 };
            assert_eq!(udl, format!("{:02X}", expected_chars + 8));
        }
    }

    #[test]
    fn test_multipart_with_validity_sets_both_bits() {
        let message = PduMessage::new("123", ascii_text(161))
            .with_validity(ValidityPeriod::hours(12, false).unwrap());
        let parts = compile_with_reference(&message, 1).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts.iter().all(|p| p.tpdu.starts_with("51")));
    }

    #[test]
    fn test_segment_counts_follow_capacity() {
        for (len, expected) in [(160, 1), (161, 2), (304, 2), (305, 3)] {
            let message = PduMessage::new("123", ascii_text(len));
            assert_eq!(message.segment_count(), expected, "length {len}");
            assert_eq!(compile(&message).unwrap().len(), expected, "length {len}");
        }
    }

    #[test]
    fn test_random_reference_shared_by_all_parts() {
        let message = PduMessage::new("123", ascii_text(400));
        let parts = compile(&message).unwrap();
        assert_eq!(parts.len(), 3);

        // DA for "123" is 4 octets, so the UDH starts at hex offset 18
        let references: Vec<&str> = parts.iter().map(|p| &p.tpdu[24..28]).collect();
        assert!(references.iter().all(|r| *r == references[0]));
    }

    #[test]
    fn test_multipart_ucs2() {
        let text: String = "Ж".repeat(71);
        let message = PduMessage::new("123", text).with_flash(true);
        let parts = compile_with_reference(&message, 0xAB42).unwrap();

        assert_eq!(parts.len(), 2);
        let first = &parts[0];
        // type, MR, DA "123" (4 octets), then PID and flash UCS2 DCS
        assert_eq!(&first.tpdu[..12], "4165039121F3");
        assert_eq!(&first.tpdu[12..16], "0018");
        assert_eq!(&first.tpdu[16..18], format!("{:02X}", 67 * 2 + 6));
        assert_eq!(&first.tpdu[18..30], "050003420201");
        assert_eq!(&parts[1].tpdu[16..18], format!("{:02X}", 4 * 2 + 6));
        assert_eq!(&parts[1].tpdu[18..30], "050003420202");
    }

    #[test]
    fn test_astral_character_is_encoding_error() {
        let message = PduMessage::new("123", "smile \u{1F600}");
        assert!(matches!(compile(&message), Err(PduError::Encoding(_))));
    }

    #[test]
    fn test_invalid_recipient() {
        assert!(matches!(
            compile(&PduMessage::new("", "hi")),
            Err(PduError::InvalidNumber(_))
        ));
        assert!(matches!(
            compile(&PduMessage::new("+38(050)", "hi")),
            Err(PduError::InvalidNumber(_))
        ));
    }

    #[test]
    fn test_failed_validity_setter_keeps_previous_value() {
        let mut message = PduMessage::new("123", "hi");
        message.set_validity_weeks(5).unwrap();
        assert!(message.set_validity_minutes(721).is_err());
        assert!(message.set_validity_hours(24, true).is_err());
        assert_eq!(message.validity(), Some(ValidityPeriod::from_octet(0xC5)));

        message.clear_validity();
        assert_eq!(message.validity(), None);
    }

    #[test]
    fn test_too_many_segments() {
        let message = PduMessage::new("123", ascii_text(152 * 255 + 1));
        assert!(matches!(
            compile_with_reference(&message, 0),
            Err(PduError::TooManySegments(256))
        ));
    }

    #[test]
    fn test_empty_text_is_one_empty_part() {
        let parts = compile_with_reference(&PduMessage::new("123", ""), 0).unwrap();
        assert_eq!(parts.len(), 1);
        assert!(parts[0].tpdu.ends_with("000000"));
    }
}
