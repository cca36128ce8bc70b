//! Configuration records and closed enumerations used by the command set.
//!
//! Enumerations that travel as integers on the wire keep their wire value as
//! the discriminant; `TryFrom<u8>` maps a wire value back and rejects codes
//! the module does not define.

use alloc::string::String;
use core::net::Ipv4Addr;

use crate::error::{DriverError, DriverResult};

/// Longest SSID the module accepts.
pub const MAX_SSID_LEN: usize = 31;
/// Longest passphrase the module accepts.
pub const MAX_PASSWORD_LEN: usize = 64;
/// Highest join retry count.
pub const MAX_JOIN_RETRIES: u8 = 10;
/// Largest read packet size.
pub const MAX_PACKET_SIZE: u16 = 1460;
/// Largest read or write timeout in milliseconds.
pub const MAX_IO_TIMEOUT_MS: u16 = 30_000;
/// Largest TCP listen backlog.
pub const MAX_LISTEN_BACKLOG: u8 = 6;
/// Shortest TCP keep-alive period in milliseconds.
pub const MIN_KEEP_ALIVE_MS: u32 = 250;
/// Longest TCP keep-alive period in milliseconds.
pub const MAX_KEEP_ALIVE_MS: u32 = 7_200_000;

/// Network security mode (`C3`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum SecurityMode {
    /// No security.
    #[default]
    Open = 0,
    /// WEP.
    Wep = 1,
    /// WPA.
    Wpa = 2,
    /// WPA2 (AES).
    Wpa2 = 3,
    /// WPA/WPA2 mixed.
    WpaWpa2 = 4,
    /// WPA2 with TKIP.
    Wpa2Tkip = 5,
}

impl TryFrom<u8> for SecurityMode {
    type Error = DriverError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SecurityMode::Open),
            1 => Ok(SecurityMode::Wep),
            2 => Ok(SecurityMode::Wpa),
            3 => Ok(SecurityMode::Wpa2),
            4 => Ok(SecurityMode::WpaWpa2),
            5 => Ok(SecurityMode::Wpa2Tkip),
            _ => Err(DriverError::Malformed {
                field: "security mode",
            }),
        }
    }
}

/// WEP authentication type (`CE`), only sent when security is WEP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum WepAuth {
    /// Open system authentication.
    #[default]
    Open = 0,
    /// Shared key authentication.
    SharedKey = 1,
}

impl TryFrom<u8> for WepAuth {
    type Error = DriverError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(WepAuth::Open),
            1 => Ok(WepAuth::SharedKey),
            _ => Err(DriverError::Malformed { field: "WEP auth" }),
        }
    }
}

/// Regulatory domain (`CN`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CountryCode {
    /// United States.
    #[default]
    Us,
    /// Canada.
    Ca,
    /// France.
    Fr,
    /// Japan.
    Jp,
}

impl CountryCode {
    /// Token sent with the `CN=` command.
    pub fn as_token(&self) -> &'static str {
        match self {
            CountryCode::Us => "US/0",
            CountryCode::Ca => "CA/0",
            CountryCode::Fr => "FR/0",
            CountryCode::Jp => "JP/0",
        }
    }

    /// Decode the country token of a status line.
    ///
    /// Only the first character is significant.
    pub fn from_token(token: &str) -> Option<CountryCode> {
        match token.as_bytes().first()? {
            b'U' => Some(CountryCode::Us),
            b'C' => Some(CountryCode::Ca),
            b'F' => Some(CountryCode::Fr),
            b'J' => Some(CountryCode::Jp),
            _ => None,
        }
    }
}

/// One of the module's four socket slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Socket {
    /// Slot 0.
    #[default]
    S0 = 0,
    /// Slot 1.
    S1 = 1,
    /// Slot 2.
    S2 = 2,
    /// Slot 3.
    S3 = 3,
}

impl TryFrom<u8> for Socket {
    type Error = DriverError;

    fn try_from(id: u8) -> Result<Self, Self::Error> {
        match id {
            0 => Ok(Socket::S0),
            1 => Ok(Socket::S1),
            2 => Ok(Socket::S2),
            3 => Ok(Socket::S3),
            _ => Err(DriverError::InvalidArgument("socket id must be 0-3")),
        }
    }
}

/// Transport protocol of a socket (`P1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum TransportProtocol {
    /// TCP.
    #[default]
    Tcp = 0,
    /// UDP.
    Udp = 1,
    /// UDP-Lite.
    UdpLite = 2,
}

impl TryFrom<u8> for TransportProtocol {
    type Error = DriverError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(TransportProtocol::Tcp),
            1 => Ok(TransportProtocol::Udp),
            2 => Ok(TransportProtocol::UdpLite),
            _ => Err(DriverError::Malformed { field: "protocol" }),
        }
    }
}

/// Address and port of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RemoteEndpoint {
    /// IPv4 address.
    pub ip: Ipv4Addr,
    /// Port number.
    pub port: u16,
}

impl RemoteEndpoint {
    /// Create an endpoint.
    pub fn new(ip: Ipv4Addr, port: u16) -> Self {
        RemoteEndpoint { ip, port }
    }
}

impl Default for RemoteEndpoint {
    fn default() -> Self {
        RemoteEndpoint {
            ip: Ipv4Addr::UNSPECIFIED,
            port: 0,
        }
    }
}

/// Parameters for joining an access point.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinWifiConfig {
    /// Network name, 1 to 31 bytes.
    pub ssid: String,
    /// Passphrase, up to 64 bytes. Empty for open networks.
    pub password: String,
    /// Security mode.
    pub security: SecurityMode,
    /// Use DHCP. When false, `ip` and `netmask` are configured.
    pub dhcp: bool,
    /// Static address.
    pub ip: Ipv4Addr,
    /// Static netmask.
    pub netmask: Ipv4Addr,
    /// Gateway.
    pub gateway: Ipv4Addr,
    /// Primary DNS server.
    pub primary_dns: Ipv4Addr,
    /// Secondary DNS server.
    pub secondary_dns: Ipv4Addr,
    /// Join attempts, 0 to 10.
    pub join_retry_count: u8,
    /// WEP authentication, used only with `SecurityMode::Wep`.
    pub wep_auth: WepAuth,
    /// Regulatory domain.
    pub country_code: CountryCode,
    /// Whether the module reported itself connected. Output only.
    pub is_connected: bool,
}

impl Default for JoinWifiConfig {
    fn default() -> Self {
        JoinWifiConfig {
            ssid: String::new(),
            password: String::new(),
            security: SecurityMode::Open,
            dhcp: true,
            ip: Ipv4Addr::UNSPECIFIED,
            netmask: Ipv4Addr::UNSPECIFIED,
            gateway: Ipv4Addr::BROADCAST,
            primary_dns: Ipv4Addr::BROADCAST,
            secondary_dns: Ipv4Addr::BROADCAST,
            join_retry_count: 5,
            wep_auth: WepAuth::Open,
            country_code: CountryCode::Us,
            is_connected: false,
        }
    }
}

impl JoinWifiConfig {
    /// Create a config for the given network with default addressing.
    pub fn new(ssid: impl Into<String>, password: impl Into<String>, security: SecurityMode) -> Self {
        JoinWifiConfig {
            ssid: ssid.into(),
            password: password.into(),
            security,
            ..Default::default()
        }
    }

    /// Check the record against the module's limits.
    pub fn validate(&self) -> DriverResult<()> {
        if self.ssid.is_empty() {
            return Err(DriverError::InvalidArgument("ssid must not be empty"));
        }
        if self.ssid.len() > MAX_SSID_LEN {
            return Err(DriverError::InvalidArgument("ssid longer than 31 bytes"));
        }
        if self.password.len() > MAX_PASSWORD_LEN {
            return Err(DriverError::InvalidArgument("password longer than 64 bytes"));
        }
        if self.join_retry_count > MAX_JOIN_RETRIES {
            return Err(DriverError::InvalidArgument("join retry count must be 0-10"));
        }
        Ok(())
    }
}

/// Network status read back with `C?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WifiStatus {
    /// Join parameters as stored on the module, with the connection flag.
    pub config: JoinWifiConfig,
    /// IP version field.
    pub ip_version: u8,
    /// Auto-connect flag.
    pub auto_connect: bool,
}

/// Parameters for opening a client connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiClientConfig {
    /// Socket slot to configure.
    pub socket: Socket,
    /// Transport protocol.
    pub protocol: TransportProtocol,
    /// Peer to connect to.
    pub remote: RemoteEndpoint,
    /// Read packet size, 1 to 1460.
    pub read_packet_size: u16,
    /// Read timeout, 0 to 30000 ms.
    pub read_timeout_ms: u16,
    /// Write timeout, 0 to 30000 ms.
    pub write_timeout_ms: u16,
}

impl Default for WifiClientConfig {
    fn default() -> Self {
        WifiClientConfig {
            socket: Socket::S0,
            protocol: TransportProtocol::Tcp,
            remote: RemoteEndpoint::new(Ipv4Addr::UNSPECIFIED, 5025),
            read_packet_size: MAX_PACKET_SIZE,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl WifiClientConfig {
    /// Check the record against the module's limits.
    pub fn validate(&self) -> DriverResult<()> {
        validate_io(self.read_packet_size, self.read_timeout_ms, self.write_timeout_ms)
    }
}

/// Settings shared by the UDP and TCP servers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiBaseServerConfig {
    /// Socket slot to configure.
    pub socket: Socket,
    /// Port to listen on.
    pub local_port: u16,
    /// Read packet size, 1 to 1460.
    pub read_packet_size: u16,
    /// Read timeout, 0 to 30000 ms.
    pub read_timeout_ms: u16,
    /// Write timeout, 0 to 30000 ms.
    pub write_timeout_ms: u16,
}

impl Default for WifiBaseServerConfig {
    fn default() -> Self {
        WifiBaseServerConfig {
            socket: Socket::S0,
            local_port: 5024,
            read_packet_size: MAX_PACKET_SIZE,
            read_timeout_ms: 5000,
            write_timeout_ms: 5000,
        }
    }
}

impl WifiBaseServerConfig {
    /// Check the record against the module's limits.
    pub fn validate(&self) -> DriverResult<()> {
        validate_io(self.read_packet_size, self.read_timeout_ms, self.write_timeout_ms)
    }
}

/// TCP server settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WifiTcpServerConfig {
    /// Shared server settings.
    pub base: WifiBaseServerConfig,
    /// Pending connection backlog, 1 to 6.
    pub listen_backlogs: u8,
    /// Enable TCP keep-alive.
    pub keep_alive_enabled: bool,
    /// Keep-alive period, 250 to 7,200,000 ms.
    pub keep_alive_timeout_ms: u32,
}

impl Default for WifiTcpServerConfig {
    fn default() -> Self {
        WifiTcpServerConfig {
            base: WifiBaseServerConfig::default(),
            listen_backlogs: 1,
            keep_alive_enabled: false,
            keep_alive_timeout_ms: MAX_KEEP_ALIVE_MS,
        }
    }
}

impl WifiTcpServerConfig {
    /// Check the record against the module's limits.
    pub fn validate(&self) -> DriverResult<()> {
        self.base.validate()?;
        if !(1..=MAX_LISTEN_BACKLOG).contains(&self.listen_backlogs) {
            return Err(DriverError::InvalidArgument("listen backlog must be 1-6"));
        }
        if self.keep_alive_enabled
            && !(MIN_KEEP_ALIVE_MS..=MAX_KEEP_ALIVE_MS).contains(&self.keep_alive_timeout_ms)
        {
            return Err(DriverError::InvalidArgument(
                "keep-alive timeout must be 250-7200000 ms",
            ));
        }
        Ok(())
    }
}

/// Result of polling a TCP server for an accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpServerConnection {
    /// Whether a client was accepted.
    pub connected: bool,
    /// The accepted client. Unspecified when not connected.
    pub remote: RemoteEndpoint,
}

/// Settings of the selected socket, as reported by `P?`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SocketInfo {
    /// Transport protocol.
    pub protocol: TransportProtocol,
    /// First address field.
    pub address: Ipv4Addr,
    /// Local port.
    pub local_port: u16,
    /// Second address field.
    pub host_address: Ipv4Addr,
    /// Port field.
    pub port: u16,
}

fn validate_io(packet_size: u16, read_timeout_ms: u16, write_timeout_ms: u16) -> DriverResult<()> {
    if !(1..=MAX_PACKET_SIZE).contains(&packet_size) {
        return Err(DriverError::InvalidArgument("read packet size must be 1-1460"));
    }
    if read_timeout_ms > MAX_IO_TIMEOUT_MS {
        return Err(DriverError::InvalidArgument("read timeout must be 0-30000 ms"));
    }
    if write_timeout_ms > MAX_IO_TIMEOUT_MS {
        return Err(DriverError::InvalidArgument("write timeout must be 0-30000 ms"));
    }
    Ok(())
}
