//! Network, socket and data operations.
//!
//! Each operation is an ordered list of commands. The first step that fails
//! aborts the sequence and its error is returned as-is; settings the module
//! already applied are left in place.
//!
//! Per-socket commands act on whichever socket the module last selected, so
//! every sequence that depends on a socket selects it first.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use embedded_hal::spi::SpiBus;
use log::debug;

use crate::commands::{Command, MAX_SEND_PAYLOAD};
use crate::decoder;
use crate::engine::{Ism43362, ModuleMode};
use crate::error::{DriverError, DriverResult};
use crate::ready::WaitReady;
use crate::response::CommandResponse;
use crate::types::{
    JoinWifiConfig, RemoteEndpoint, SecurityMode, Socket, SocketInfo, TcpServerConnection,
    TransportProtocol, WifiBaseServerConfig, WifiClientConfig, WifiStatus, WifiTcpServerConfig,
};

/// Response capacity for configuration steps.
pub const CONFIG_RESPONSE_CAPACITY: usize = 200;
/// Response capacity for the `C?` status query.
pub const STATUS_RESPONSE_CAPACITY: usize = 500;
/// Response capacity for the `P?` socket query.
pub const SOCKET_RESPONSE_CAPACITY: usize = 1000;
/// Response capacity for data reads and the message queue.
pub const DATA_RESPONSE_CAPACITY: usize = 2000;

/// Bytes of protocol framing around the data returned by `R0`.
///
/// The payload is copied from [`READ_DATA_OFFSET`], past the leading `\r\n`.
pub const READ_ENVELOPE_LEN: usize = 10;
/// Offset of the first payload byte in an `R0` response.
pub const READ_DATA_OFFSET: usize = 2;

impl<'a, SPI, CS, RST, RDY, D, W> Ism43362<'a, SPI, CS, RST, RDY, D, W>
where
    SPI: SpiBus<u16>,
    CS: OutputPin,
    RST: OutputPin,
    RDY: InputPin,
    D: DelayNs,
    W: WaitReady,
{
    /// Run one configuration command, discarding the response text.
    fn step(&mut self, command: Command<'_>) -> DriverResult<()> {
        let mut response = CommandResponse::<CONFIG_RESPONSE_CAPACITY>::new();
        self.execute(&command, &mut response)
    }

    // ========================================================================
    // Network
    // ========================================================================

    /// Configure the access point parameters and join the network.
    ///
    /// The password is only sent when non-empty, the static address and
    /// netmask only when DHCP is off, and the WEP authentication type only
    /// for [`SecurityMode::Wep`]. The result is that of the final join.
    pub fn join_network(&mut self, config: &JoinWifiConfig) -> DriverResult<()> {
        config.validate()?;
        debug!("ism43362: joining {:?}", config.ssid);

        self.step(Command::SetSsid(&config.ssid))?;
        if !config.password.is_empty() {
            self.step(Command::SetPassword(&config.password))?;
        }
        self.step(Command::SetSecurity(config.security))?;
        self.step(Command::SetDhcp(config.dhcp))?;
        if !config.dhcp {
            self.step(Command::SetIpAddress(config.ip))?;
            self.step(Command::SetNetmask(config.netmask))?;
        }
        self.step(Command::SetGateway(config.gateway))?;
        self.step(Command::SetPrimaryDns(config.primary_dns))?;
        self.step(Command::SetSecondaryDns(config.secondary_dns))?;
        self.step(Command::SetJoinRetryCount(config.join_retry_count))?;
        if config.security == SecurityMode::Wep {
            self.step(Command::SetWepAuth(config.wep_auth))?;
        }
        self.step(Command::SetCountryCode(config.country_code))?;
        self.step(Command::JoinNetwork)?;

        self.mode = ModuleMode::Connected;
        Ok(())
    }

    /// Read back the network settings and connection status.
    pub fn read_wifi_config(&mut self) -> DriverResult<WifiStatus> {
        let mut response = CommandResponse::<STATUS_RESPONSE_CAPACITY>::new();
        self.execute(&Command::ShowNetworkSettings, &mut response)?;
        decoder::decode_wifi_status(response.as_bytes())
    }

    // ========================================================================
    // Sockets
    // ========================================================================

    /// Select the socket later per-socket commands apply to.
    pub fn set_socket(&mut self, socket: Socket) -> DriverResult<()> {
        self.step(Command::SelectSocket(socket))
    }

    /// Query the settings of the selected socket.
    pub fn socket_info(&mut self) -> DriverResult<SocketInfo> {
        let mut response = CommandResponse::<SOCKET_RESPONSE_CAPACITY>::new();
        self.execute(&Command::ShowSocketSettings, &mut response)?;
        decoder::decode_socket_info(response.as_bytes())
    }

    /// Peer of the selected socket.
    ///
    /// Pairs the first address field of the socket status with its port
    /// field.
    pub fn get_remote(&mut self) -> DriverResult<RemoteEndpoint> {
        let info = self.socket_info()?;
        Ok(RemoteEndpoint::new(info.address, info.port))
    }

    /// Configure a socket and open a client connection.
    pub fn start_wifi_client(&mut self, config: &WifiClientConfig) -> DriverResult<()> {
        config.validate()?;
        debug!(
            "ism43362: client {:?} to {}:{}",
            config.protocol, config.remote.ip, config.remote.port
        );

        self.step(Command::SelectSocket(config.socket))?;
        self.step(Command::SetTransportProtocol(config.protocol))?;
        self.step(Command::SetRemoteHost(config.remote.ip))?;
        self.step(Command::SetRemotePort(config.remote.port))?;
        self.step(Command::SetReadPacketSize(config.read_packet_size))?;
        self.step(Command::SetReadTimeout(config.read_timeout_ms))?;
        self.step(Command::SetWriteTimeout(config.write_timeout_ms))?;
        self.step(Command::StartClient)
    }

    // ========================================================================
    // Servers
    // ========================================================================

    fn setup_server(&mut self, config: &WifiBaseServerConfig) -> DriverResult<()> {
        self.step(Command::SelectSocket(config.socket))?;
        self.step(Command::SetLocalPort(config.local_port))?;
        self.step(Command::SetReadPacketSize(config.read_packet_size))?;
        self.step(Command::SetReadTimeout(config.read_timeout_ms))?;
        self.step(Command::SetWriteTimeout(config.write_timeout_ms))
    }

    /// Start a UDP server on the configured socket.
    pub fn start_udp_server(&mut self, config: &WifiBaseServerConfig) -> DriverResult<()> {
        config.validate()?;
        debug!("ism43362: UDP server on port {}", config.local_port);

        self.setup_server(config)?;
        self.step(Command::SetTransportProtocol(TransportProtocol::Udp))?;
        self.step(Command::StartServer)
    }

    /// Start a TCP server on the configured socket.
    ///
    /// Keep-alive is only configured when enabled.
    pub fn start_tcp_server(&mut self, config: &WifiTcpServerConfig) -> DriverResult<()> {
        config.validate()?;
        debug!("ism43362: TCP server on port {}", config.base.local_port);

        self.setup_server(&config.base)?;
        self.step(Command::SetListenBacklog(config.listen_backlogs))?;
        if config.keep_alive_enabled {
            self.step(Command::SetKeepAlive(config.keep_alive_timeout_ms))?;
        }
        self.step(Command::StartTcpServer)
    }

    /// Poll the message queue for an accepted TCP client.
    pub fn check_tcp_server_connection(&mut self) -> DriverResult<TcpServerConnection> {
        let mut response = CommandResponse::<DATA_RESPONSE_CAPACITY>::new();
        self.execute(&Command::ReadMessages, &mut response)?;
        let connection = decoder::decode_tcp_accept(response.as_bytes())?;
        if connection.connected {
            debug!(
                "ism43362: accepted {}:{}",
                connection.remote.ip, connection.remote.port
            );
        }
        Ok(connection)
    }

    /// Close the client accepted on the selected socket.
    pub fn close_current_connection(&mut self) -> DriverResult<()> {
        let mut response = CommandResponse::<STATUS_RESPONSE_CAPACITY>::new();
        self.execute(&Command::CloseServerConnection, &mut response)
    }

    // ========================================================================
    // Data
    // ========================================================================

    /// Send a payload on the selected socket.
    ///
    /// The payload goes out verbatim, control bytes included, and may be at
    /// most [`MAX_SEND_PAYLOAD`] bytes.
    pub fn send(&mut self, payload: &[u8]) -> DriverResult<()> {
        if payload.len() > MAX_SEND_PAYLOAD {
            return Err(DriverError::InvalidArgument("payload longer than 1460 bytes"));
        }
        self.step(Command::SendData(payload))
    }

    /// Read pending data from the selected socket into `buf`.
    ///
    /// Returns the number of bytes copied. The payload length is the
    /// response length minus [`READ_ENVELOPE_LEN`], copied from
    /// [`READ_DATA_OFFSET`]. If `buf` is shorter, it is filled and
    /// [`DriverError::PacketBufferTooSmall`] reports both lengths.
    pub fn read(&mut self, buf: &mut [u8]) -> DriverResult<usize> {
        let mut response = CommandResponse::<DATA_RESPONSE_CAPACITY>::new();
        self.execute(&Command::ReadData, &mut response)?;

        let received = response.len().saturating_sub(READ_ENVELOPE_LEN);
        let copied = received.min(buf.len());
        let data = &response.as_bytes()[READ_DATA_OFFSET..READ_DATA_OFFSET + copied];
        buf[..copied].copy_from_slice(data);

        if copied < received {
            return Err(DriverError::PacketBufferTooSmall { received, copied });
        }
        Ok(copied)
    }
}
