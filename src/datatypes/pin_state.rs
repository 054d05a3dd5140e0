// ABOUTME: SIM lock state reported by AT+CPIN?
// ABOUTME: Maps the textual +CPIN reply onto a closed set of states

use std::fmt;

/// SIM card lock state
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum PinState {
    #[default]
    Unknown,
    /// `READY`: the SIM is unlocked
    NoPinNeeded,
    /// `SIM PIN`
    SimPin,
    /// `SIM PUK`
    SimPuk,
    /// `PH_SIM PIN`: phone-to-SIM lock
    PhSimPin,
    /// `PH_SIM PUK`
    PhSimPuk,
    /// `SIM PIN2`
    SimPin2,
    /// `SIM PUK2`
    SimPuk2,
}

impl PinState {
    /// Parse the value part of a `+CPIN:` line. Unrecognised text gives `None`.
    pub fn from_reply(value: &str) -> Option<Self> {
        let state = match value.trim() {
            "READY" => PinState::NoPinNeeded,
            "SIM PIN" => PinState::SimPin,
            "SIM PUK" => PinState::SimPuk,
            "PH_SIM PIN" => PinState::PhSimPin,
            "PH_SIM PUK" => PinState::PhSimPuk,
            "SIM PIN2" => PinState::SimPin2,
            "SIM PUK2" => PinState::SimPuk2,
            _ => return None,
        };
        Some(state)
    }

    /// True when a PIN or PUK has to be entered before the SIM is usable
    pub fn needs_code(&self) -> bool {
        !matches!(self, PinState::Unknown | PinState::NoPinNeeded)
    }
}

impl fmt::Display for PinState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PinState::Unknown => "UNKNOWN",
            PinState::NoPinNeeded => "READY",
            PinState::SimPin => "SIM PIN",
            PinState::SimPuk => "SIM PUK",
            PinState::PhSimPin => "PH_SIM PIN",
            PinState::PhSimPuk => "PH_SIM PUK",
            PinState::SimPin2 => "SIM PIN2",
            PinState::SimPuk2 => "SIM PUK2",
        };
        f.write_str(name)
    }
}
