// ABOUTME: GPRS bearer status and HTTP method codes as numbered by the SIM900 firmware
// ABOUTME: Wire digits are converted with num_enum's TryFromPrimitive

use num_enum::TryFromPrimitive;

/// Bearer status digit from `+SAPBR: <cid>,<status>,"<ip>"`
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum BearerState {
    Connecting = 0,
    Connected = 1,
    Closing = 2,
    Closed = 3,
    /// Any status digit the firmware documents no meaning for
    Unknown = 255,
}

impl BearerState {
    /// Parse the status field; anything outside 0..=3 is `None`
    pub fn from_field(field: &str) -> Option<Self> {
        field
            .trim()
            .parse::<u8>()
            .ok()
            .filter(|code| *code <= BearerState::Closed as u8)
            .and_then(|code| BearerState::try_from(code).ok())
    }
}

/// Method code used by `AT+HTTPACTION` and echoed in `+HTTPACTION:`
#[derive(TryFromPrimitive)]
#[repr(u8)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get = 0,
    Post = 1,
}

impl HttpMethod {
    pub fn code(self) -> u8 {
        self as u8
    }
}
