//! Network, socket and data operation tests against the simulated module.

use std::net::Ipv4Addr;

use ism43362::{
    CountryCode, DriverError, JoinWifiConfig, ModuleMode, RemoteEndpoint, ReturnCode,
    SecurityMode, Socket, TransportProtocol, WepAuth, WifiBaseServerConfig, WifiClientConfig,
    WifiTcpServerConfig, MAX_SEND_PAYLOAD,
};
use ism43362_sim::{ok_response, SimModule};

fn heads(commands: &[&str]) -> Vec<String> {
    commands.iter().map(|c| c.to_string()).collect()
}

// ============================================================================
// Join
// ============================================================================

#[test]
fn test_join_with_dhcp() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    wifi.reset().unwrap();

    let config = JoinWifiConfig::new("lab-ap", "secret", SecurityMode::Wpa2);
    wifi.join_network(&config).unwrap();

    assert_eq!(
        sim.commands(),
        heads(&[
            "C1=lab-ap",
            "C2=secret",
            "C3=3",
            "C4=1",
            "C8=255.255.255.255",
            "C9=255.255.255.255",
            "CA=255.255.255.255",
            "CB=5",
            "CN=US/0",
            "C0",
        ])
    );
    assert_eq!(wifi.mode(), ModuleMode::Connected);
    assert!(sim.is_connected());
}

#[test]
fn test_join_static_wep_network() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let config = JoinWifiConfig {
        dhcp: false,
        ip: Ipv4Addr::new(192, 168, 1, 50),
        netmask: Ipv4Addr::new(255, 255, 255, 0),
        gateway: Ipv4Addr::new(192, 168, 1, 1),
        primary_dns: Ipv4Addr::new(8, 8, 8, 8),
        secondary_dns: Ipv4Addr::new(8, 8, 4, 4),
        join_retry_count: 3,
        wep_auth: WepAuth::SharedKey,
        country_code: CountryCode::Fr,
        ..JoinWifiConfig::new("legacy", "0123456789", SecurityMode::Wep)
    };
    wifi.join_network(&config).unwrap();

    assert_eq!(
        sim.commands(),
        heads(&[
            "C1=legacy",
            "C2=0123456789",
            "C3=1",
            "C4=0",
            "C6=192.168.1.50",
            "C7=255.255.255.0",
            "C8=192.168.1.1",
            "C9=8.8.8.8",
            "CA=8.8.4.4",
            "CB=3",
            "CE=1",
            "CN=FR/0",
            "C0",
        ])
    );
}

#[test]
fn test_join_open_network_skips_password() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.join_network(&JoinWifiConfig::new("cafe", "", SecurityMode::Open))
        .unwrap();

    let commands = sim.commands();
    assert_eq!(commands[0], "C1=cafe");
    assert_eq!(commands[1], "C3=0");
    assert!(!commands.iter().any(|c| c.starts_with("C2") || c.starts_with("CE")));
}

#[test]
fn test_join_empty_ssid_touches_nothing() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let result = wifi.join_network(&JoinWifiConfig::default());

    assert_eq!(ReturnCode::of(&result), ReturnCode::Error);
    assert!(sim.wire_log().is_empty());
    assert_eq!(wifi.mode(), ModuleMode::Uninitialized);
}

#[test]
fn test_join_stops_at_first_failure() {
    let sim = SimModule::new();
    sim.fail_on("C4");
    let mut wifi = sim.driver();
    wifi.reset().unwrap();

    let config = JoinWifiConfig::new("lab-ap", "secret", SecurityMode::Wpa2);
    let result = wifi.join_network(&config);

    assert_eq!(result, Err(DriverError::BadResponse));
    assert_eq!(sim.commands(), heads(&["C1=lab-ap", "C2=secret", "C3=3", "C4=1"]));
    // Steps already applied stay applied.
    assert_eq!(sim.setting("C1").as_deref(), Some("lab-ap"));
    assert_eq!(wifi.mode(), ModuleMode::CommandReady);
}

#[test]
fn test_join_reports_final_step_result() {
    let sim = SimModule::new();
    sim.fail_on("C0");
    let mut wifi = sim.driver();

    let config = JoinWifiConfig::new("lab-ap", "secret", SecurityMode::Wpa2);

    assert_eq!(wifi.join_network(&config), Err(DriverError::BadResponse));
    assert_eq!(sim.commands().last().map(String::as_str), Some("C0"));
    assert!(!sim.is_connected());
}

// ============================================================================
// Status
// ============================================================================

#[test]
fn test_read_wifi_config_after_join() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    let mut config = JoinWifiConfig::new("lab-ap", "secret", SecurityMode::Wpa2);
    config.country_code = CountryCode::Jp;
    wifi.join_network(&config).unwrap();

    let status = wifi.read_wifi_config().unwrap();

    assert_eq!(status.config.ssid, "lab-ap");
    assert_eq!(status.config.password, "secret");
    assert_eq!(status.config.security, SecurityMode::Wpa2);
    assert!(status.config.dhcp);
    assert_eq!(status.config.gateway, Ipv4Addr::BROADCAST);
    assert_eq!(status.config.join_retry_count, 5);
    assert_eq!(status.config.country_code, CountryCode::Jp);
    assert!(status.config.is_connected);
    assert_eq!(status.ip_version, 4);
}

#[test]
fn test_read_wifi_config_unknown_country() {
    let sim = SimModule::new();
    sim.respond_to(
        "C?",
        &ok_response(b"ap,,0,1,4,0.0.0.0,0.0.0.0,0.0.0.0,0.0.0.0,0.0.0.0,5,0,0,DE,0"),
    );
    let mut wifi = sim.driver();

    let result = wifi.read_wifi_config();

    assert_eq!(ReturnCode::of(&result), ReturnCode::BadResponse);
}

#[test]
fn test_read_wifi_config_short_line() {
    let sim = SimModule::new();
    sim.respond_to("C?", &ok_response(b"ap,,0,1"));
    let mut wifi = sim.driver();

    let result = wifi.read_wifi_config();

    assert!(matches!(result, Err(DriverError::Malformed { .. })));
}

// ============================================================================
// Client
// ============================================================================

#[test]
fn test_start_wifi_client_order() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let config = WifiClientConfig {
        socket: Socket::S2,
        protocol: TransportProtocol::Tcp,
        remote: RemoteEndpoint::new(Ipv4Addr::new(10, 0, 0, 2), 8080),
        read_packet_size: 512,
        read_timeout_ms: 100,
        write_timeout_ms: 200,
    };
    wifi.start_wifi_client(&config).unwrap();

    assert_eq!(
        sim.commands(),
        heads(&[
            "P0=2",
            "P1=0",
            "P3=10.0.0.2",
            "P4=8080",
            "R1=512",
            "R2=100",
            "S2=200",
            "P6=1",
        ])
    );
}

#[test]
fn test_start_wifi_client_stops_at_first_failure() {
    let sim = SimModule::new();
    sim.fail_on("P3");
    let mut wifi = sim.driver();

    let result = wifi.start_wifi_client(&WifiClientConfig::default());

    assert_eq!(result, Err(DriverError::BadResponse));
    assert_eq!(sim.commands(), heads(&["P0=0", "P1=0", "P3=0.0.0.0"]));
}

#[test]
fn test_start_wifi_client_rejects_bad_timeout() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let config = WifiClientConfig {
        read_timeout_ms: 30_001,
        ..Default::default()
    };

    assert!(matches!(
        wifi.start_wifi_client(&config),
        Err(DriverError::InvalidArgument(_))
    ));
    assert!(sim.wire_log().is_empty());
}

#[test]
fn test_socket_selection_and_remote() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    let config = WifiClientConfig {
        remote: RemoteEndpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5025),
        ..Default::default()
    };
    wifi.start_wifi_client(&config).unwrap();

    wifi.set_socket(Socket::S0).unwrap();
    let remote = wifi.get_remote().unwrap();

    assert_eq!(remote, RemoteEndpoint::new(Ipv4Addr::new(10, 0, 0, 2), 5025));
    assert_eq!(sim.commands()[8], "P0=0");
    assert_eq!(sim.commands()[9], "P?");
}

#[test]
fn test_socket_info() {
    let sim = SimModule::new();
    sim.respond_to("P?", &ok_response(b"1,10.0.0.7,5024,10.0.0.2,6000,0,0"));
    let mut wifi = sim.driver();

    let info = wifi.socket_info().unwrap();

    assert_eq!(info.protocol, TransportProtocol::Udp);
    assert_eq!(info.address, Ipv4Addr::new(10, 0, 0, 7));
    assert_eq!(info.local_port, 5024);
    assert_eq!(info.host_address, Ipv4Addr::new(10, 0, 0, 2));
    assert_eq!(info.port, 6000);
}

// ============================================================================
// Data
// ============================================================================

#[test]
fn test_send_wire_bytes() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.send(&[0x41, 0x42, 0x43]).unwrap();

    assert_eq!(sim.wire_log(), vec![b"S3=3\rABC\r\n".to_vec()]);
    assert_eq!(sim.sent_payloads(), vec![b"ABC".to_vec()]);
}

#[test]
fn test_send_passes_control_bytes() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.send(b"a\r\nb").unwrap();

    assert_eq!(sim.sent_payloads(), vec![b"a\r\nb".to_vec()]);
}

#[test]
fn test_send_rejects_oversized_payload() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let payload = vec![0u8; MAX_SEND_PAYLOAD + 1];

    assert!(matches!(wifi.send(&payload), Err(DriverError::InvalidArgument(_))));
    assert!(sim.wire_log().is_empty());
}

#[test]
fn test_send_largest_payload() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let payload: Vec<u8> = (0..MAX_SEND_PAYLOAD).map(|i| (i % 251) as u8).collect();
    wifi.send(&payload).unwrap();

    assert_eq!(sim.sent_payloads(), vec![payload]);
}

#[test]
fn test_read_copies_payload() {
    let sim = SimModule::new();
    sim.push_inbound(b"hello!");
    let mut wifi = sim.driver();
    let mut buf = [0u8; 64];

    let copied = wifi.read(&mut buf).unwrap();

    assert_eq!(copied, 6);
    assert_eq!(&buf[..copied], b"hello!");
    assert_eq!(sim.commands(), heads(&["R0"]));
}

#[test]
fn test_read_nothing_pending() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    let mut buf = [0u8; 8];

    assert_eq!(wifi.read(&mut buf), Ok(0));
}

#[test]
fn test_read_truncates_to_caller_buffer() {
    let sim = SimModule::new();
    sim.push_inbound(b"0123456789");
    let mut wifi = sim.driver();
    let mut buf = [0u8; 4];

    let result = wifi.read(&mut buf);

    assert_eq!(
        result,
        Err(DriverError::PacketBufferTooSmall {
            received: 10,
            copied: 4,
        })
    );
    assert_eq!(ReturnCode::of(&result), ReturnCode::PacketBufferTooSmall);
    assert_eq!(&buf, b"0123");
}

#[test]
fn test_read_odd_payload_counts_fill_byte() {
    let sim = SimModule::new();
    sim.push_inbound(b"abc");
    let mut wifi = sim.driver();
    let mut buf = [0u8; 16];

    // The fill byte completing the odd response counts towards the payload
    // length, so the first trailer byte is delivered as well.
    let copied = wifi.read(&mut buf).unwrap();

    assert_eq!(copied, 4);
    assert_eq!(&buf[..copied], b"abc\r");
}

// ============================================================================
// Servers
// ============================================================================

#[test]
fn test_start_udp_server() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let config = WifiBaseServerConfig {
        socket: Socket::S1,
        ..Default::default()
    };
    wifi.start_udp_server(&config).unwrap();

    assert_eq!(
        sim.commands(),
        heads(&["P0=1", "P2=5024", "R1=1460", "R2=5000", "S2=5000", "P1=1", "P5=1"])
    );
}

#[test]
fn test_start_tcp_server_with_keep_alive() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let config = WifiTcpServerConfig {
        listen_backlogs: 3,
        keep_alive_enabled: true,
        keep_alive_timeout_ms: 60_000,
        ..Default::default()
    };
    wifi.start_tcp_server(&config).unwrap();

    assert_eq!(
        sim.commands(),
        heads(&[
            "P0=0",
            "P2=5024",
            "R1=1460",
            "R2=5000",
            "S2=5000",
            "P8=3",
            "PK=1,60000",
            "P5=11",
        ])
    );
}

#[test]
fn test_start_tcp_server_without_keep_alive() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.start_tcp_server(&WifiTcpServerConfig::default()).unwrap();

    let commands = sim.commands();
    assert!(!commands.iter().any(|c| c.starts_with("PK")));
    assert_eq!(commands.last().map(String::as_str), Some("P5=11"));
}

#[test]
fn test_start_tcp_server_base_failure_skips_listen() {
    let sim = SimModule::new();
    sim.fail_on("P2");
    let mut wifi = sim.driver();

    let result = wifi.start_tcp_server(&WifiTcpServerConfig::default());

    assert_eq!(result, Err(DriverError::BadResponse));
    assert_eq!(sim.commands(), heads(&["P0=0", "P2=5024"]));
}

#[test]
fn test_check_tcp_server_connection_idle() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    let connection = wifi.check_tcp_server_connection().unwrap();

    assert!(!connection.connected);
    assert_eq!(sim.commands(), heads(&["MR"]));
}

#[test]
fn test_check_tcp_server_connection_accepted() {
    let sim = SimModule::new();
    sim.accept_connection(Ipv4Addr::new(192, 168, 1, 5), 4000);
    let mut wifi = sim.driver();

    let connection = wifi.check_tcp_server_connection().unwrap();

    assert!(connection.connected);
    assert_eq!(
        connection.remote,
        RemoteEndpoint::new(Ipv4Addr::new(192, 168, 1, 5), 4000)
    );

    // The notification is consumed by the poll.
    assert!(!wifi.check_tcp_server_connection().unwrap().connected);
}

#[test]
fn test_close_current_connection() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.close_current_connection().unwrap();

    assert_eq!(sim.wire_log(), vec![b"P5=10\r\n\n".to_vec()]);
    assert_eq!(sim.commands(), heads(&["P5=10"]));
}
