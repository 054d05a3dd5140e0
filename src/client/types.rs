// ABOUTME: Option structs and result types for the modem session and its SMS, USSD and HTTP layers
// ABOUTME: Options follow the with_* builder style with defaults matching SIM900 timing

use crate::datatypes::BearerState;

/// Startup negotiation settings for `ModemSession::begin`
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// How many `AT` probes to send before giving up
    pub probe_attempts: u32,
    /// Wait for the first reply line of each probe
    pub probe_timeout_ms: u64,
    /// Pause after a probe that got no answer at all
    pub probe_pause_ms: u64,
    /// Settle time after `ATE0` before the input is flushed
    pub echo_settle_ms: u64,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            probe_attempts: 5,
            probe_timeout_ms: 2000,
            probe_pause_ms: 200,
            echo_settle_ms: 500,
        }
    }
}

impl SessionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_probe_attempts(mut self, attempts: u32) -> Self {
        self.probe_attempts = attempts;
        self
    }

    pub fn with_probe_timeout(mut self, timeout_ms: u64) -> Self {
        self.probe_timeout_ms = timeout_ms;
        self
    }
}

/// Retry and timing settings for SMS submission
#[derive(Debug, Clone)]
pub struct SmsOptions {
    /// Submission attempts per message (or per segment in PDU mode)
    pub attempts: u32,
    /// Wait for the `>` prompt after `AT+CMGS`
    pub prompt_timeout_ms: u64,
    /// Wait for the final result after the text and Ctrl-Z
    pub submit_timeout_ms: u64,
}

impl Default for SmsOptions {
    fn default() -> Self {
        Self {
            attempts: 3,
            prompt_timeout_ms: 1000,
            submit_timeout_ms: 10_000,
        }
    }
}

impl SmsOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_submit_timeout(mut self, timeout_ms: u64) -> Self {
        self.submit_timeout_ms = timeout_ms;
        self
    }
}

/// HTTP client settings for the modem's built-in HTTP stack
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Sent with every request via `HTTPPARA="UA"`
    pub user_agent: String,
    /// Server-side timeout passed with `HTTPPARA="TIMEOUT"`, in seconds
    pub timeout_secs: u32,
    /// Whether the modem follows redirects
    pub follow_redirects: bool,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            user_agent: "Aminis SIM-900 module client (version 0.1)".to_string(),
            timeout_secs: 45,
            follow_redirects: true,
        }
    }
}

impl HttpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_timeout_secs(mut self, timeout_secs: u32) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }

    pub fn with_redirects(mut self, follow: bool) -> Self {
        self.follow_redirects = follow;
        self
    }
}

/// GPRS access point credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApnCredentials {
    pub apn: String,
    pub user: String,
    pub password: String,
}

impl ApnCredentials {
    pub fn new(apn: impl Into<String>) -> Self {
        Self {
            apn: apn.into(),
            user: String::new(),
            password: String::new(),
        }
    }

    pub fn with_login(mut self, user: impl Into<String>, password: impl Into<String>) -> Self {
        self.user = user.into();
        self.password = password.into();
        self
    }
}

/// Parsed `+SAPBR` bearer query reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BearerInfo {
    pub cid: u8,
    pub state: BearerState,
    /// Assigned address; `None` until the bearer is connected
    pub ip: Option<String>,
}

impl BearerInfo {
    pub fn is_connected(&self) -> bool {
        self.state == BearerState::Connected
    }
}

/// Outcome of an HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// HTTP status code reported by `+HTTPACTION`
    pub status: u16,
    /// Body length announced by the modem
    pub length: usize,
    /// Body text; empty when the status carries no data
    pub body: String,
}

impl HttpResponse {
    /// 2xx codes the modem reports for a completed request
    pub fn is_success(&self) -> bool {
        matches!(self.status, 200..=207 | 226)
    }
}

/// Parsed `+CUSD` unsolicited result
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UssdResponse {
    /// 0: no further action, 1: further action required, 2: terminated by network
    pub status: u8,
    pub text: String,
    pub dcs: Option<u8>,
}

impl UssdResponse {
    /// True when the network expects a follow-up reply
    pub fn needs_reply(&self) -> bool {
        self.status == 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_defaults() {
        let session = SessionOptions::default();
        assert_eq!(session.probe_attempts, 5);
        assert_eq!(session.probe_timeout_ms, 2000);

        let sms = SmsOptions::new().with_attempts(1);
        assert_eq!(sms.attempts, 1);
        assert_eq!(sms.prompt_timeout_ms, 1000);
        assert_eq!(sms.submit_timeout_ms, 10_000);

        let http = HttpOptions::new().with_user_agent("probe/1.0");
        assert_eq!(http.user_agent, "probe/1.0");
        assert_eq!(http.timeout_secs, 45);
        assert!(http.follow_redirects);
    }

    #[test]
    fn test_http_success_codes() {
        let response = |status| HttpResponse {
            status,
            length: 0,
            body: String::new(),
        };
        assert!(response(200).is_success());
        assert!(response(206).is_success());
        assert!(response(226).is_success());
        assert!(!response(208).is_success());
        assert!(!response(404).is_success());
        assert!(!response(601).is_success());
    }

    #[test]
    fn test_apn_credentials() {
        let apn = ApnCredentials::new("internet").with_login("user", "secret");
        assert_eq!(apn.apn, "internet");
        assert_eq!(apn.user, "user");
        assert_eq!(apn.password, "secret");
    }
}
