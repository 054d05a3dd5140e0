// ABOUTME: Lifecycle state of a modem session as tracked by the driver
// ABOUTME: Moves from Unknown through Ready to Attached, and to Error on any failed step

use std::fmt;

/// Where a `ModemSession` is in its lifecycle
///
/// The TCP states are reserved for socket-level features and are never
/// entered by the SMS, USSD and HTTP layers.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum ModemState {
    /// Nothing has been negotiated yet
    #[default]
    Unknown,
    /// The last lifecycle step failed
    Error,
    /// Port open, startup not finished
    Idle,
    /// Startup negotiation finished
    Ready,
    /// A GPRS bearer is up
    Attached,
    TcpServerWait,
    TcpConnectedServer,
    TcpConnectedClient,
}

impl ModemState {
    /// True once `begin()` has completed and the modem accepts commands
    pub fn is_ready(&self) -> bool {
        matches!(
            self,
            ModemState::Ready
                | ModemState::Attached
                | ModemState::TcpServerWait
                | ModemState::TcpConnectedServer
                | ModemState::TcpConnectedClient
        )
    }
}

impl fmt::Display for ModemState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModemState::Unknown => "unknown",
            ModemState::Error => "error",
            ModemState::Idle => "idle",
            ModemState::Ready => "ready",
            ModemState::Attached => "attached",
            ModemState::TcpServerWait => "tcp server wait",
            ModemState::TcpConnectedServer => "tcp connected (server)",
            ModemState::TcpConnectedClient => "tcp connected (client)",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ready_states() {
        assert!(!ModemState::default().is_ready());
        assert!(!ModemState::Error.is_ready());
        assert!(!ModemState::Idle.is_ready());
        assert!(ModemState::Ready.is_ready());
        assert!(ModemState::Attached.is_ready());
    }

    #[test]
    fn test_display() {
        assert_eq!(ModemState::Attached.to_string(), "attached");
        assert_eq!(ModemState::TcpConnectedClient.to_string(), "tcp connected (client)");
    }
}
