// ABOUTME: Response framing for AT command replies: CR fragmenting, terminal token matching
// ABOUTME: Pure functions over the accumulated byte buffer, shared by the engine and feature parsers

/// Default result codes that terminate an ordinary AT command
pub const STANDARD_RESULTS: &[&str] = &["OK", "ERROR"];

/// A completed command exchange
///
/// `body` is every fragment that preceded the terminal line, concatenated in
/// arrival order (line feeds kept, carriage returns removed). `result` is the
/// terminal token that ended the exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub body: String,
    pub result: String,
}

impl Response {
    pub fn is_ok(&self) -> bool {
        self.result == "OK"
    }

    /// Body with surrounding whitespace removed
    pub fn text(&self) -> &str {
        self.body.trim()
    }

    /// Non-empty trimmed body lines
    pub fn lines(&self) -> impl Iterator<Item = &str> {
        self.body.lines().map(str::trim).filter(|l| !l.is_empty())
    }
}

/// Split the accumulated bytes into carriage-return delimited fragments
///
/// Modem firmware emits partial lines, so a fragment is not necessarily a
/// whole logical line.
pub fn split_fragments(buffer: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(buffer)
        .split('\r')
        .map(str::to_owned)
        .collect()
}

/// Last fragment that is not blank, trimmed
pub fn last_non_empty(fragments: &[String]) -> Option<&str> {
    fragments
        .iter()
        .rev()
        .map(|f| f.trim())
        .find(|f| !f.is_empty())
}

/// Drop the terminal line and everything after it, joining what remains
pub fn strip_terminal(mut fragments: Vec<String>, terminal: &str) -> String {
    while let Some(fragment) = fragments.pop() {
        if fragment.trim() == terminal {
            break;
        }
    }
    fragments.concat()
}

/// Try to complete an exchange from the bytes received so far
///
/// Returns `None` while the last non-empty line is not one of `terminals`.
pub fn match_terminal(buffer: &[u8], terminals: &[&str]) -> Option<Response> {
    let fragments = split_fragments(buffer);
    let last = last_non_empty(&fragments)?;
    let result = terminals.iter().find(|t| **t == last)?.to_string();

    Some(Response {
        body: strip_terminal(fragments, &result),
        result,
    })
}

/// Split on `separator`, trim each piece and drop empty ones
pub fn split_and_filter(value: &str, separator: char) -> Vec<&str> {
    value
        .split(separator)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect()
}

/// Value part of a `+TAG: value` information line, if the tag matches
pub fn tagged_value<'a>(line: &'a str, tag: &str) -> Option<&'a str> {
    let (left, right) = line.trim().split_once(':')?;
    (left.trim() == tag).then(|| right.trim())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_match_terminal_simple() {
        let response = match_terminal(b"junk\rOK\r", STANDARD_RESULTS).unwrap();
        assert_eq!(response.body, "junk");
        assert_eq!(response.result, "OK");
        assert!(response.is_ok());
    }

    #[test]
    fn test_match_terminal_keeps_line_feeds() {
        let buffer = b"\r\n+CPIN: READY\r\n\r\nOK\r\n";
        let response = match_terminal(buffer, STANDARD_RESULTS).unwrap();
        assert_eq!(response.body, "\n+CPIN: READY\n");
        assert_eq!(response.text(), "+CPIN: READY");
        assert_eq!(response.lines().collect::<Vec<_>>(), vec!["+CPIN: READY"]);
    }

    #[test]
    fn test_match_terminal_needs_last_line() {
        // OK followed by an unsolicited line is not complete
        assert!(match_terminal(b"\r\nOK\r\n\r\n+CREG: 1\r\n", STANDARD_RESULTS).is_none());
        assert!(match_terminal(b"\r\nOK", &["ERROR"]).is_none());
        assert!(match_terminal(b"", STANDARD_RESULTS).is_none());
        assert!(match_terminal(b"\r\n\r\n", STANDARD_RESULTS).is_none());
    }

    #[test]
    fn test_match_terminal_prompt() {
        let response = match_terminal(b"\r\n> ", &[">"]).unwrap();
        assert_eq!(response.result, ">");
        assert_eq!(response.body, "");
    }

    #[test]
    fn test_match_terminal_error() {
        let response = match_terminal(b"AT+FOO\r\r\nERROR\r\n", STANDARD_RESULTS).unwrap();
        assert_eq!(response.result, "ERROR");
        assert_eq!(response.body, "AT+FOO");
        assert!(!response.is_ok());
    }

    #[test]
    fn test_strip_terminal_removes_trailing_fragments() {
        let fragments = vec![
            "a".to_string(),
            "\nOK".to_string(),
            "\n".to_string(),
        ];
        assert_eq!(strip_terminal(fragments, "OK"), "a");
    }

    #[test]
    fn test_split_and_filter() {
        assert_eq!(split_and_filter(" 1, 1 ,,\"10.0.0.1\" ", ','), vec!["1", "1", "\"10.0.0.1\""]);
        assert!(split_and_filter("  ", ':').is_empty());
    }

    #[test]
    fn test_tagged_value() {
        assert_eq!(tagged_value("+CPIN: SIM PIN", "+CPIN"), Some("SIM PIN"));
        assert_eq!(tagged_value(" +HTTPACTION:0,200,15", "+HTTPACTION"), Some("0,200,15"));
        assert_eq!(tagged_value("+CSQ: 20,0", "+CPIN"), None);
        assert_eq!(tagged_value("READY", "+CPIN"), None);
    }
}
