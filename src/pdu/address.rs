// ABOUTME: Semi-octet phone number encoding for the SMS service centre and destination addresses
// ABOUTME: Strips the international '+', pads odd digit counts with 'F' and swaps each nibble pair

use super::PduError;

/// Type-of-address octet for international ISDN numbers
pub const TOA_INTERNATIONAL: u8 = 0x91;

/// Normalize a phone number to its bare digits
///
/// Surrounding whitespace and a leading `+` are removed. Anything other than
/// ASCII digits left after that is rejected.
pub fn normalize_number(number: &str) -> Result<String, PduError> {
    let trimmed = number.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);

    if digits.is_empty() {
        return Err(PduError::InvalidNumber(format!("'{number}' has no digits")));
    }
    if !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(PduError::InvalidNumber(format!(
            "'{number}' contains characters other than digits"
        )));
    }
    Ok(digits.to_string())
}

/// Swap every pair of digits, padding an odd count with a trailing `F`
pub fn swap_digits(digits: &str) -> String {
    let mut padded: Vec<char> = digits.chars().collect();
    if padded.len() % 2 != 0 {
        padded.push('F');
    }
    padded
        .chunks(2)
        .flat_map(|pair| [pair[1], pair[0]])
        .collect()
}

/// Reverse of [`swap_digits`], dropping the `F` filler
pub fn decode_address(swapped: &str) -> String {
    let chars: Vec<char> = swapped.chars().collect();
    chars
        .chunks(2)
        .flat_map(|pair| pair.iter().rev().copied())
        .filter(|c| !c.eq_ignore_ascii_case(&'F'))
        .collect()
}

/// SCA field: octet count (type octet included), `91`, swapped digits.
/// An empty centre number lets the modem use its stored SMSC: `00`.
pub fn encode_sca(center_number: &str) -> Result<String, PduError> {
    if center_number.trim().is_empty() {
        return Ok("00".to_string());
    }
    let swapped = swap_digits(&normalize_number(center_number)?);
    Ok(format!(
        "{:02X}{:02X}{}",
        swapped.len() / 2 + 1,
        TOA_INTERNATIONAL,
        swapped
    ))
}

/// TP-DA field: digit count (filler excluded), `91`, swapped digits
pub fn encode_destination(recipient_number: &str) -> Result<String, PduError> {
    let digits = normalize_number(recipient_number)?;
    Ok(format!(
        "{:02X}{:02X}{}",
        digits.len(),
        TOA_INTERNATIONAL,
        swap_digits(&digits)
    ))
}
