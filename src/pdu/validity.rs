// ABOUTME: Relative TP-VP validity period octet with range-checked constructors per unit
// ABOUTME: Minutes, hours, days and weeks each map onto their own band of the single octet

use super::PduError;
use std::fmt;

/// Encoded relative validity period (TP-VP), one octet
///
/// | band     | octets    | accepted input        |
/// |----------|-----------|-----------------------|
/// | minutes  | 0x00-0x8F | 1-720 minutes         |
/// | hours    | 0x90-0xA7 | 12-24 hours           |
/// | days     | 0xA8-0xC4 | 2-30 days             |
/// | weeks    | 0xC5-0xFF | 5-63 weeks            |
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ValidityPeriod(u8);

impl ValidityPeriod {
    /// Five minute steps, `1..=720` minutes
    pub fn minutes(value: u32) -> Result<Self, PduError> {
        check_range("minutes", value, 1, 720)?;
        let octet = (value / 5).saturating_sub(1).min(143);
        Ok(Self(octet as u8))
    }

    /// Half hour steps from 12 hours, `12..=24` hours plus an optional half hour
    pub fn hours(value: u32, half_hour: bool) -> Result<Self, PduError> {
        check_range("hours", value, 12, 24)?;
        if value == 24 && half_hour {
            return Err(PduError::InvalidValidity(
                "24.5 hours is outside 12..=24 hours".to_string(),
            ));
        }
        let octet = (144 + 2 * (value - 12) + u32::from(half_hour)).min(167);
        Ok(Self(octet as u8))
    }

    /// Whole days, `2..=30`
    pub fn days(value: u32) -> Result<Self, PduError> {
        check_range("days", value, 2, 30)?;
        Ok(Self((166 + value) as u8))
    }

    /// Whole weeks, `5..=63`
    pub fn weeks(value: u32) -> Result<Self, PduError> {
        check_range("weeks", value, 5, 63)?;
        Ok(Self((197 + (value - 5)) as u8))
    }

    /// Wrap an already encoded octet
    pub const fn from_octet(octet: u8) -> Self {
        Self(octet)
    }

    pub const fn octet(self) -> u8 {
        self.0
    }
}

fn check_range(unit: &str, value: u32, min: u32, max: u32) -> Result<(), PduError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(PduError::InvalidValidity(format!(
            "{value} {unit} is outside {min}..={max} {unit}"
        )))
    }
}

impl fmt::Debug for ValidityPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ValidityPeriod(0x{:02X})", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minutes() {
        assert_eq!(ValidityPeriod::minutes(5).unwrap().octet(), 0x00);
        assert_eq!(ValidityPeriod::minutes(1).unwrap().octet(), 0x00);
        assert_eq!(ValidityPeriod::minutes(60).unwrap().octet(), 0x0B);
        assert_eq!(ValidityPeriod::minutes(720).unwrap().octet(), 0x8F);
        assert!(ValidityPeriod::minutes(0).is_err());
        assert!(ValidityPeriod::minutes(721).is_err());
    }

    #[test]
    fn test_hours() {
        assert_eq!(ValidityPeriod::hours(12, false).unwrap().octet(), 0x90);
        assert_eq!(ValidityPeriod::hours(12, true).unwrap().octet(), 0x91);
        assert_eq!(ValidityPeriod::hours(23, true).unwrap().octet(), 0xA7);
        assert_eq!(ValidityPeriod::hours(24, false).unwrap().octet(), 0xA7);
        assert!(ValidityPeriod::hours(11, false).is_err());
        assert!(ValidityPeriod::hours(24, true).is_err());
        assert!(ValidityPeriod::hours(25, false).is_err());
    }

    #[test]
    fn test_days() {
        assert_eq!(ValidityPeriod::days(2).unwrap().octet(), 0xA8);
        assert_eq!(ValidityPeriod::days(4).unwrap().octet(), 0xAA);
        assert!(ValidityPeriod::days(1).is_err());
        assert!(ValidityPeriod::days(31).is_err());
    }

    #[test]
    fn test_days_thirty_is_c4_not_c6() {
        assert_eq!(ValidityPeriod::days(30).unwrap().octet(), 0xC4);
        assert_ne!(ValidityPeriod::days(30).unwrap().octet(), 0xC6);
    }

    #[test]
    fn test_weeks() {
        assert_eq!(ValidityPeriod::weeks(5).unwrap().octet(), 0xC5);
        assert_eq!(ValidityPeriod::weeks(63).unwrap().octet(), 0xFF);
        assert!(ValidityPeriod::weeks(4).is_err());
        assert!(ValidityPeriod::weeks(64).is_err());
    }

    #[test]
    fn test_error_names_unit() {
        let err = ValidityPeriod::days(31).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Invalid validity period: 31 days is outside 2..=30 days"
        );
    }
}
