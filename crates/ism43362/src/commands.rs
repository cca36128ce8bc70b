//! Commands understood by the module.
//!
//! Every command is an ASCII line of the form `<code>[=<args>]` terminated by
//! `\r\n`. The one exception is the data send, whose header ends in a bare
//! `\r` and is followed by the raw payload and then `\r\n`:
//!
//! ```text
//! S3=<len>\r<payload bytes>\r\n
//! ```

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;
use core::net::Ipv4Addr;

use bytes::BufMut;

use crate::types::{CountryCode, SecurityMode, Socket, TransportProtocol, WepAuth};

/// Terminator of every command line.
pub const COMMAND_TERMINATOR: &[u8] = b"\r\n";

/// Size of the staging buffer a send command is assembled in.
pub const SEND_STAGING_CAPACITY: usize = 2000;

/// Largest payload accepted by a single send.
///
/// The module's packet size is capped at 1460 bytes; the `S3=1460\r` header
/// and trailing `\r\n` leave ample room in the staging buffer.
pub const MAX_SEND_PAYLOAD: usize = 1460;

/// Commands that can be sent to the module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command<'a> {
    // ========== Mode Commands ==========
    /// Enter command mode (`$$$`).
    EnterCommandMode,
    /// Enter machine mode (`---`).
    EnterMachineMode,

    // ========== Network Commands ==========
    /// Set the SSID (`C1`).
    SetSsid(&'a str),
    /// Set the passphrase (`C2`).
    SetPassword(&'a str),
    /// Set the security mode (`C3`).
    SetSecurity(SecurityMode),
    /// Enable or disable DHCP (`C4`).
    SetDhcp(bool),
    /// Set the static address (`C6`).
    SetIpAddress(Ipv4Addr),
    /// Set the static netmask (`C7`).
    SetNetmask(Ipv4Addr),
    /// Set the gateway (`C8`).
    SetGateway(Ipv4Addr),
    /// Set the primary DNS server (`C9`).
    SetPrimaryDns(Ipv4Addr),
    /// Set the secondary DNS server (`CA`).
    SetSecondaryDns(Ipv4Addr),
    /// Set the join retry count (`CB`).
    SetJoinRetryCount(u8),
    /// Set the WEP authentication type (`CE`).
    SetWepAuth(WepAuth),
    /// Set the regulatory domain (`CN`).
    SetCountryCode(CountryCode),
    /// Join the configured network (`C0`).
    JoinNetwork,
    /// Show the network settings and status (`C?`).
    ShowNetworkSettings,

    // ========== Socket Commands ==========
    /// Select the socket later commands apply to (`P0`).
    SelectSocket(Socket),
    /// Set the transport protocol (`P1`).
    SetTransportProtocol(TransportProtocol),
    /// Set the local port (`P2`).
    SetLocalPort(u16),
    /// Set the remote host address (`P3`).
    SetRemoteHost(Ipv4Addr),
    /// Set the remote port (`P4`).
    SetRemotePort(u16),
    /// Start a UDP server (`P5=1`).
    StartServer,
    /// Close the accepted TCP server connection (`P5=10`).
    CloseServerConnection,
    /// Start a multi-accept TCP server (`P5=11`).
    StartTcpServer,
    /// Start a client connection (`P6=1`).
    StartClient,
    /// Set the TCP listen backlog (`P8`).
    SetListenBacklog(u8),
    /// Enable TCP keep-alive with the given period in ms (`PK=1,<ms>`).
    SetKeepAlive(u32),
    /// Show the selected socket's settings (`P?`).
    ShowSocketSettings,

    // ========== Data Commands ==========
    /// Read pending data (`R0`).
    ReadData,
    /// Set the read packet size (`R1`).
    SetReadPacketSize(u16),
    /// Set the read timeout in ms (`R2`).
    SetReadTimeout(u16),
    /// Set the write timeout in ms (`S2`).
    SetWriteTimeout(u16),
    /// Send a payload (`S3`).
    SendData(&'a [u8]),

    // ========== Message Commands ==========
    /// Read the asynchronous message queue (`MR`).
    ReadMessages,

    // ========== Raw Command ==========
    /// Send a raw command line, without terminator.
    Raw(&'a str),
}

impl Command<'_> {
    /// Encode the command as the bytes to send, terminator included.
    pub fn encode(&self) -> Vec<u8> {
        let line = self.to_command_string();
        match self {
            Command::SendData(payload) => {
                let mut buf = Vec::with_capacity(line.len() + 1 + payload.len() + 2);
                buf.put_slice(line.as_bytes());
                buf.put_u8(b'\r');
                buf.put_slice(payload);
                buf.put_slice(COMMAND_TERMINATOR);
                buf
            }
            _ => {
                let mut buf = Vec::with_capacity(line.len() + COMMAND_TERMINATOR.len());
                buf.put_slice(line.as_bytes());
                buf.put_slice(COMMAND_TERMINATOR);
                buf
            }
        }
    }

    /// Get the command line without the terminator.
    ///
    /// For [`Command::SendData`] this is the header only.
    pub fn to_command_string(&self) -> String {
        match self {
            // Modes
            Command::EnterCommandMode => "$$$".to_string(),
            Command::EnterMachineMode => "---".to_string(),

            // Network
            Command::SetSsid(ssid) => format!("C1={}", ssid),
            Command::SetPassword(password) => format!("C2={}", password),
            Command::SetSecurity(mode) => format!("C3={}", *mode as u8),
            Command::SetDhcp(enabled) => format!("C4={}", u8::from(*enabled)),
            Command::SetIpAddress(ip) => format!("C6={}", ip),
            Command::SetNetmask(mask) => format!("C7={}", mask),
            Command::SetGateway(gw) => format!("C8={}", gw),
            Command::SetPrimaryDns(dns) => format!("C9={}", dns),
            Command::SetSecondaryDns(dns) => format!("CA={}", dns),
            Command::SetJoinRetryCount(count) => format!("CB={}", count),
            Command::SetWepAuth(auth) => format!("CE={}", *auth as u8),
            Command::SetCountryCode(code) => format!("CN={}", code.as_token()),
            Command::JoinNetwork => "C0".to_string(),
            Command::ShowNetworkSettings => "C?".to_string(),

            // Sockets
            Command::SelectSocket(socket) => format!("P0={}", *socket as u8),
            Command::SetTransportProtocol(protocol) => format!("P1={}", *protocol as u8),
            Command::SetLocalPort(port) => format!("P2={}", port),
            Command::SetRemoteHost(ip) => format!("P3={}", ip),
            Command::SetRemotePort(port) => format!("P4={}", port),
            Command::StartServer => "P5=1".to_string(),
            Command::CloseServerConnection => "P5=10".to_string(),
            Command::StartTcpServer => "P5=11".to_string(),
            Command::StartClient => "P6=1".to_string(),
            Command::SetListenBacklog(backlog) => format!("P8={}", backlog),
            Command::SetKeepAlive(period_ms) => format!("PK=1,{}", period_ms),
            Command::ShowSocketSettings => "P?".to_string(),

            // Data
            Command::ReadData => "R0".to_string(),
            Command::SetReadPacketSize(size) => format!("R1={}", size),
            Command::SetReadTimeout(ms) => format!("R2={}", ms),
            Command::SetWriteTimeout(ms) => format!("S2={}", ms),
            Command::SendData(payload) => format!("S3={}", payload.len()),

            // Messages
            Command::ReadMessages => "MR".to_string(),

            // Raw
            Command::Raw(line) => line.to_string(),
        }
    }
}
