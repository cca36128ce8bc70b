//! Command interpreter of the simulated module.
//!
//! Settings written with `<code>=<value>` commands are kept in a single table
//! shared by all sockets, and the status queries are answered from it.

use std::collections::{HashMap, HashSet, VecDeque};
use std::net::Ipv4Addr;

use ism43362::framer::PAD_BYTE;
use ism43362::OK_TERMINATOR;
use tracing::{debug, trace};

/// Prompt the module prints after every response.
pub const PROMPT: &[u8] = b"> ";

/// Body of a failed command.
pub const ERROR_BODY: &[u8] = b"\r\nERROR\r\n";

/// Parsed form of one command window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCommand {
    /// Command line up to the first `\r`, e.g. `C1=lab-ap`.
    pub head: String,
    /// Command code, the part of the head before `=`.
    pub code: String,
    /// Value after `=`, if any.
    pub value: Option<String>,
    /// Raw bytes following the header `\r`.
    pub tail: Vec<u8>,
}

impl ParsedCommand {
    /// Split the bytes written in one chip-select window.
    pub fn parse(window: &[u8]) -> ParsedCommand {
        let (head, tail) = match window.iter().position(|&b| b == b'\r') {
            Some(end) => (window[..end].to_vec(), window[end + 1..].to_vec()),
            None => (strip_padding(window), Vec::new()),
        };
        let head = String::from_utf8_lossy(&head).into_owned();
        let (code, value) = match head.split_once('=') {
            Some((code, value)) => (code.to_string(), Some(value.to_string())),
            None => (head.clone(), None),
        };
        ParsedCommand {
            head,
            code,
            value,
            tail,
        }
    }
}

/// Drop the `'\n'` filler of an odd-length command without terminator.
fn strip_padding(window: &[u8]) -> Vec<u8> {
    let mut bytes = window.to_vec();
    let len = bytes.len();
    if len >= 2 && len % 2 == 0 && bytes[len - 2] == PAD_BYTE {
        bytes.remove(len - 2);
    }
    bytes
}

/// State of the simulated module's command processor.
#[derive(Debug, Default)]
pub struct Firmware {
    settings: HashMap<String, String>,
    overrides: HashMap<String, Vec<u8>>,
    failures: HashSet<String>,
    inbound: VecDeque<Vec<u8>>,
    accepts: VecDeque<(Ipv4Addr, u16)>,
    sent: Vec<Vec<u8>>,
    connected: bool,
}

impl Firmware {
    /// Create a firmware with factory settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer `response` verbatim to commands whose head or code matches.
    pub fn respond_to(&mut self, command: &str, response: &[u8]) {
        self.overrides.insert(command.to_string(), response.to_vec());
    }

    /// Fail commands whose head or code matches.
    pub fn fail_on(&mut self, command: &str) {
        self.failures.insert(command.to_string());
    }

    /// Queue a payload for the next `R0`.
    pub fn push_inbound(&mut self, data: &[u8]) {
        self.inbound.push_back(data.to_vec());
    }

    /// Queue an accepted TCP client for the next `MR`.
    pub fn accept_connection(&mut self, ip: Ipv4Addr, port: u16) {
        self.accepts.push_back((ip, port));
    }

    /// Payloads received with `S3`.
    pub fn sent_payloads(&self) -> &[Vec<u8>] {
        &self.sent
    }

    /// Value stored by the last `<code>=<value>` command.
    pub fn setting(&self, code: &str) -> Option<&str> {
        self.settings.get(code).map(String::as_str)
    }

    /// Whether a join has completed.
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Forget the connection, as a hardware reset does.
    pub fn reboot(&mut self) {
        self.connected = false;
    }

    /// Process one command and produce the bytes to send back.
    pub fn handle(&mut self, command: &ParsedCommand) -> Vec<u8> {
        debug!("Firmware: command {:?}", command.head);

        if let Some(raw) = self
            .overrides
            .get(&command.head)
            .or_else(|| self.overrides.get(&command.code))
        {
            trace!("Firmware: scripted response for {:?}", command.head);
            return raw.clone();
        }
        if self.failures.contains(&command.head) || self.failures.contains(&command.code) {
            debug!("Firmware: failing {:?}", command.head);
            return error_response();
        }

        match command.code.as_str() {
            "C0" => {
                self.connected = true;
                ok_response(&[])
            }
            "C?" => ok_response(self.status_line().as_bytes()),
            "P?" => ok_response(self.socket_line().as_bytes()),
            "S3" => self.receive_payload(command),
            "R0" => {
                let data = self.inbound.pop_front().unwrap_or_default();
                ok_response(&data)
            }
            "MR" => match self.accepts.pop_front() {
                Some((ip, port)) => {
                    ok_response(format!("[SOMA][TCP SVR] Accepted {}:{}", ip, port).as_bytes())
                }
                None => ok_response(&[]),
            },
            _ => {
                if let Some(value) = &command.value {
                    self.settings.insert(command.code.clone(), value.clone());
                }
                ok_response(&[])
            }
        }
    }

    fn receive_payload(&mut self, command: &ParsedCommand) -> Vec<u8> {
        let declared = command.value.as_deref().and_then(|v| v.parse::<usize>().ok());
        match declared {
            Some(len) if command.tail.len() >= len => {
                self.sent.push(command.tail[..len].to_vec());
                ok_response(&[])
            }
            _ => error_response(),
        }
    }

    fn setting_or<'s>(&'s self, code: &str, default: &'s str) -> &'s str {
        self.setting(code).unwrap_or(default)
    }

    fn status_line(&self) -> String {
        let country = self.setting_or("CN", "US/0");
        let country = country.split('/').next().unwrap_or(country);
        [
            self.setting_or("C1", ""),
            self.setting_or("C2", ""),
            self.setting_or("C3", "0"),
            self.setting_or("C4", "1"),
            "4",
            self.setting_or("C6", "0.0.0.0"),
            self.setting_or("C7", "0.0.0.0"),
            self.setting_or("C8", "0.0.0.0"),
            self.setting_or("C9", "0.0.0.0"),
            self.setting_or("CA", "0.0.0.0"),
            self.setting_or("CB", "5"),
            "0",
            self.setting_or("CE", "0"),
            country,
            if self.connected { "1" } else { "0" },
        ]
        .join(",")
    }

    fn socket_line(&self) -> String {
        [
            self.setting_or("P1", "0"),
            self.setting_or("P3", "0.0.0.0"),
            self.setting_or("P2", "0"),
            self.setting_or("C6", "0.0.0.0"),
            self.setting_or("P4", "0"),
            "0",
            "0",
        ]
        .join(",")
    }
}

/// `\r\n<body>\r\nOK\r\n> `
pub fn ok_response(body: &[u8]) -> Vec<u8> {
    let mut response = Vec::with_capacity(body.len() + 10);
    response.extend_from_slice(b"\r\n");
    response.extend_from_slice(body);
    response.extend_from_slice(OK_TERMINATOR);
    response.extend_from_slice(PROMPT);
    response
}

/// `\r\nERROR\r\n> `
pub fn error_response() -> Vec<u8> {
    let mut response = ERROR_BODY.to_vec();
    response.extend_from_slice(PROMPT);
    response
}
