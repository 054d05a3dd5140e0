// ABOUTME: Scripted in-memory modem used by unit and scenario tests
// ABOUTME: Answers CR LF terminated command lines with canned reply bursts and optional echo

use super::{ByteTransport, not_open};
use std::collections::VecDeque;
use std::io;

type Matcher = Box<dyn Fn(&str) -> bool>;

struct Rule {
    matches: Matcher,
    replies: VecDeque<Vec<Vec<u8>>>,
}

enum Inbound {
    Burst(Vec<u8>),
    Gap,
}

/// Fake modem behind a `ByteTransport`
///
/// Replies are queued as bursts. A read never crosses a burst boundary and
/// the read following a drained burst returns nothing, so the engine sees
/// the same fragmented arrival pattern real firmware produces.
pub(crate) struct MockModem {
    open: bool,
    echo: bool,
    rules: Vec<Rule>,
    inbound: VecDeque<Inbound>,
    partial: Vec<u8>,
    pub(crate) commands: Vec<String>,
    pub(crate) fail_reads: bool,
    pub(crate) write_limit: Option<usize>,
}

impl MockModem {
    pub(crate) fn new() -> Self {
        Self {
            open: true,
            echo: false,
            rules: Vec::new(),
            inbound: VecDeque::new(),
            partial: Vec::new(),
            commands: Vec::new(),
            fail_reads: false,
            write_limit: None,
        }
    }

    /// Echo every received command line back before answering, like a fresh SIM900
    pub(crate) fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Answer `command` with a single burst
    pub(crate) fn on(self, command: &str, reply: &str) -> Self {
        self.on_bursts(command, &[reply])
    }

    /// Answer `command` with several bursts separated by read gaps
    pub(crate) fn on_bursts(self, command: &str, bursts: &[&str]) -> Self {
        let expected = command.to_string();
        self.rule(move |line| line == expected, bursts)
    }

    /// Answer any command starting with `prefix`
    pub(crate) fn on_prefix(self, prefix: &str, reply: &str) -> Self {
        let expected = prefix.to_string();
        self.rule(move |line| line.starts_with(&expected), &[reply])
    }

    /// Queue another reply for an already scripted command. Replies are used
    /// in order and the last one repeats.
    pub(crate) fn then(mut self, reply: &str) -> Self {
        if let Some(rule) = self.rules.last_mut() {
            rule.replies.push_back(vec![reply.as_bytes().to_vec()]);
        }
        self
    }

    /// Make `command` produce no answer at all
    pub(crate) fn silent(self, command: &str) -> Self {
        self.on_bursts(command, &[])
    }

    fn rule(mut self, matches: impl Fn(&str) -> bool + 'static, bursts: &[&str]) -> Self {
        let reply = bursts.iter().map(|b| b.as_bytes().to_vec()).collect();
        self.rules.push(Rule {
            matches: Box::new(matches),
            replies: VecDeque::from([reply]),
        });
        self
    }

    /// Bytes that arrive without being asked for
    pub(crate) fn push_unsolicited(&mut self, bytes: &[u8]) {
        self.inbound.push_back(Inbound::Burst(bytes.to_vec()));
        self.inbound.push_back(Inbound::Gap);
    }

    fn answer(&mut self, line: String) {
        if self.echo {
            let mut echoed = line.clone().into_bytes();
            echoed.push(b'\r');
            self.inbound.push_back(Inbound::Burst(echoed));
        }
        if line == "ATE0" {
            self.echo = false;
        }

        let reply = match self.rules.iter_mut().find(|rule| (rule.matches)(&line)) {
            Some(rule) if rule.replies.len() > 1 => rule.replies.pop_front().unwrap_or_default(),
            Some(rule) => rule.replies.front().cloned().unwrap_or_default(),
            None => vec![b"\r\nERROR\r\n".to_vec()],
        };
        for burst in reply {
            self.inbound.push_back(Inbound::Burst(burst));
            self.inbound.push_back(Inbound::Gap);
        }
        self.commands.push(line);
    }
}

impl ByteTransport for MockModem {
    async fn open(&mut self) -> io::Result<()> {
        self.open = true;
        Ok(())
    }

    async fn close(&mut self) -> io::Result<()> {
        self.open = false;
        Ok(())
    }

    async fn clear(&mut self) -> io::Result<()> {
        if !self.open {
            return Err(not_open());
        }
        self.inbound.clear();
        Ok(())
    }

    async fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        if !self.open {
            return Err(not_open());
        }
        let accepted = self.write_limit.map_or(data.len(), |limit| limit.min(data.len()));
        self.partial.extend_from_slice(&data[..accepted]);

        while let Some(pos) = self.partial.windows(2).position(|w| w == b"\r\n") {
            let line: Vec<u8> = self.partial.drain(..pos + 2).take(pos).collect();
            self.answer(String::from_utf8_lossy(&line).into_owned());
        }
        Ok(accepted)
    }

    async fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if !self.open {
            return Err(not_open());
        }
        if self.fail_reads {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "cable unplugged"));
        }

        match self.inbound.front_mut() {
            None => Ok(0),
            Some(Inbound::Gap) => {
                self.inbound.pop_front();
                Ok(0)
            }
            Some(Inbound::Burst(bytes)) => {
                let n = buf.len().min(bytes.len());
                buf[..n].copy_from_slice(&bytes[..n]);
                bytes.drain(..n);
                if bytes.is_empty() {
                    self.inbound.pop_front();
                }
                Ok(n)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.open
    }
}
