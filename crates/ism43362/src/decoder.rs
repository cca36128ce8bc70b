//! Parsers for the module's fixed-grammar status responses.
//!
//! Responses are framed as `\r\n<body>\r\nOK\r\n> `. Each parser checks the
//! field count, delimiters and numeric ranges of its body and fails with
//! [`DriverError::Malformed`] on any mismatch.

use alloc::string::ToString;
use core::net::Ipv4Addr;
use core::str::FromStr;

use crate::error::{DriverError, DriverResult};
use crate::response::{find, OK_TERMINATOR};
use crate::types::{
    CountryCode, JoinWifiConfig, RemoteEndpoint, SecurityMode, SocketInfo, TcpServerConnection,
    TransportProtocol, WepAuth, WifiStatus,
};

/// Line prefix of every response body.
const LINE_START: &str = "\r\n";

/// Marker the message queue uses for an accepted TCP client.
pub const ACCEPTED_MARKER: &[u8] = b"Accepted";

/// Prefix of the accepted-client notification in the message queue.
pub const ACCEPTED_PREFIX: &str = "\r\n[SOMA][TCP SVR] Accepted ";

/// Number of comma-separated fields in a `C?` status line.
const WIFI_STATUS_FIELDS: usize = 15;

/// Minimum number of comma-separated fields in a `P?` status line.
const SOCKET_INFO_FIELDS: usize = 5;

/// Extract the body between the leading `\r\n` and the OK terminator.
fn response_body(raw: &[u8]) -> DriverResult<&str> {
    let end = find(raw, OK_TERMINATOR).ok_or(DriverError::BadResponse)?;
    let text = core::str::from_utf8(&raw[..end])
        .map_err(|_| DriverError::Malformed { field: "encoding" })?;
    text.strip_prefix(LINE_START)
        .ok_or(DriverError::Malformed { field: "line start" })
}

fn parse_number<T: FromStr>(text: &str, field: &'static str) -> DriverResult<T> {
    text.trim().parse().map_err(|_| DriverError::Malformed { field })
}

/// Parse `a.b.c.d` with each part a decimal octet.
fn parse_dotted_quad(text: &str, field: &'static str) -> DriverResult<Ipv4Addr> {
    let mut octets = [0u8; 4];
    let mut parts = text.trim().split('.');
    for octet in octets.iter_mut() {
        let part = parts.next().ok_or(DriverError::Malformed { field })?;
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DriverError::Malformed { field });
        }
        *octet = parse_number(part, field)?;
    }
    if parts.next().is_some() {
        return Err(DriverError::Malformed { field });
    }
    Ok(Ipv4Addr::from(octets))
}

/// Parse the `C?` status line.
///
/// ```text
/// \r\n<ssid>,<password>,<security>,<dhcp>,<ip version>,<ip>,<netmask>,<gateway>,
///     <dns1>,<dns2>,<retries>,<auto connect>,<wep auth>,<country>,<status>\r\nOK\r\n
/// ```
pub fn decode_wifi_status(raw: &[u8]) -> DriverResult<WifiStatus> {
    let body = response_body(raw)?;
    let line = body.lines().next().unwrap_or("");
    let fields: alloc::vec::Vec<&str> = line.split(',').collect();
    if fields.len() != WIFI_STATUS_FIELDS {
        return Err(DriverError::Malformed {
            field: "status field count",
        });
    }

    let security = SecurityMode::try_from(parse_number::<u8>(fields[2], "security mode")?)?;
    let dhcp: u8 = parse_number(fields[3], "dhcp")?;
    let ip_version = parse_number(fields[4], "ip version")?;
    let auto_connect: u8 = parse_number(fields[11], "auto connect")?;
    let wep_auth = WepAuth::try_from(parse_number::<u8>(fields[12], "WEP auth")?)?;
    let country_code = CountryCode::from_token(fields[13]).ok_or(DriverError::Malformed {
        field: "country code",
    })?;
    let status: u8 = parse_number(fields[14], "connection status")?;

    let config = JoinWifiConfig {
        ssid: fields[0].to_string(),
        password: fields[1].to_string(),
        security,
        dhcp: dhcp == 1,
        ip: parse_dotted_quad(fields[5], "ip address")?,
        netmask: parse_dotted_quad(fields[6], "netmask")?,
        gateway: parse_dotted_quad(fields[7], "gateway")?,
        primary_dns: parse_dotted_quad(fields[8], "primary dns")?,
        secondary_dns: parse_dotted_quad(fields[9], "secondary dns")?,
        join_retry_count: parse_number(fields[10], "join retry count")?,
        wep_auth,
        country_code,
        is_connected: status == 1,
    };

    Ok(WifiStatus {
        config,
        ip_version,
        auto_connect: auto_connect == 1,
    })
}

/// Parse the `P?` socket status line.
///
/// ```text
/// \r\n<protocol>,<a.b.c.d>,<local port>,<a.b.c.d>,<port>,...\r\nOK\r\n
/// ```
pub fn decode_socket_info(raw: &[u8]) -> DriverResult<SocketInfo> {
    let body = response_body(raw)?;
    let line = body.lines().next().unwrap_or("");
    let fields: alloc::vec::Vec<&str> = line.split(',').collect();
    if fields.len() < SOCKET_INFO_FIELDS {
        return Err(DriverError::Malformed {
            field: "socket field count",
        });
    }

    Ok(SocketInfo {
        protocol: TransportProtocol::try_from(parse_number::<u8>(fields[0], "protocol")?)?,
        address: parse_dotted_quad(fields[1], "address")?,
        local_port: parse_number(fields[2], "local port")?,
        host_address: parse_dotted_quad(fields[3], "host address")?,
        port: parse_number(fields[4], "port")?,
    })
}

/// Whether a message queue dump reports an accepted TCP client.
pub fn has_accepted_client(raw: &[u8]) -> bool {
    find(raw, ACCEPTED_MARKER).is_some()
}

/// Parse the message queue dump returned by `MR`.
///
/// Without an `Accepted` notification the result is "not connected".
/// Otherwise the dump must start with
/// `\r\n[SOMA][TCP SVR] Accepted <a.b.c.d>:<port>`.
pub fn decode_tcp_accept(raw: &[u8]) -> DriverResult<TcpServerConnection> {
    if !has_accepted_client(raw) {
        return Ok(TcpServerConnection::default());
    }

    let head = match find(raw, OK_TERMINATOR) {
        Some(end) => &raw[..end],
        None => raw,
    };
    let text = core::str::from_utf8(head).map_err(|_| DriverError::Malformed { field: "encoding" })?;
    let rest = text.strip_prefix(ACCEPTED_PREFIX).ok_or(DriverError::Malformed {
        field: "accept notification",
    })?;

    let (address, tail) = rest.split_once(':').ok_or(DriverError::Malformed {
        field: "accepted endpoint",
    })?;
    let digits = tail
        .find(|c: char| !c.is_ascii_digit())
        .map_or(tail, |end| &tail[..end]);
    if digits.is_empty() {
        return Err(DriverError::Malformed {
            field: "accepted port",
        });
    }

    Ok(TcpServerConnection {
        connected: true,
        remote: RemoteEndpoint::new(
            parse_dotted_quad(address, "accepted address")?,
            parse_number(digits, "accepted port")?,
        ),
    })
}
