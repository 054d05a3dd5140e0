// ABOUTME: Concatenated-message user data header for multi-part SMS
// ABOUTME: Emits the 8-bit or 16-bit reference information element, prefixed with its UDHL

/// IEI for an 8-bit concatenation reference
pub const IEI_CONCAT_8BIT: u8 = 0x00;
/// IEI for a 16-bit concatenation reference
pub const IEI_CONCAT_16BIT: u8 = 0x08;

/// Concatenation information element for one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConcatHeader {
    pub reference: u16,
    pub total: u8,
    pub index: u8,
    pub wide_reference: bool,
}

impl ConcatHeader {
    /// Header with a 16-bit reference, used for 7-bit text
    pub fn wide(reference: u16, total: u8, index: u8) -> Self {
        Self {
            reference,
            total,
            index,
            wide_reference: true,
        }
    }

    /// Header with an 8-bit reference, used for UCS2 text
    pub fn narrow(reference: u8, total: u8, index: u8) -> Self {
        Self {
            reference: u16::from(reference),
            total,
            index,
            wide_reference: false,
        }
    }

    /// Encoded length in octets, UDHL included
    pub fn len(&self) -> usize {
        if self.wide_reference { 7 } else { 6 }
    }

    /// Length the header adds to TP-UDL: septets for 7-bit text, octets for UCS2
    pub fn udl_offset(&self) -> usize {
        if self.wide_reference { 8 } else { 6 }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.push((self.len() - 1) as u8);
        if self.wide_reference {
            bytes.push(IEI_CONCAT_16BIT);
            bytes.push(4);
            bytes.extend_from_slice(&self.reference.to_be_bytes());
        } else {
            bytes.push(IEI_CONCAT_8BIT);
            bytes.push(3);
            bytes.push(self.reference as u8);
        }
        bytes.push(self.total);
        bytes.push(self.index);
        bytes
    }
}
