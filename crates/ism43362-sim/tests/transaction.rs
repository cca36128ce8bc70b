//! Transaction engine, handshake and reset tests against the simulated module.

use ism43362::{
    BoundedSpin, CommandResponse, DriverError, ModuleMode, ReturnCode, TimingConfig, BOOT_BANNER,
};
use ism43362_sim::{ok_response, SimModule};

// ============================================================================
// Framing
// ============================================================================

#[test]
fn test_even_command_is_sent_unpadded() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<100>::new();

    wifi.execute_text_command("P0=1\r\n", &mut response).unwrap();

    assert_eq!(sim.wire_log(), vec![b"P0=1\r\n".to_vec()]);
    assert_eq!(sim.commands(), vec!["P0=1".to_string()]);
}

#[test]
fn test_odd_command_ends_with_padding_word() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.enter_command_mode().unwrap();
    wifi.enter_machine_mode().unwrap();

    // "$$$\r\n" is five bytes: the last word carries '\n' then the final byte.
    assert_eq!(
        sim.wire_log(),
        vec![b"$$$\r\n\n".to_vec(), b"---\r\n\n".to_vec()]
    );
    assert_eq!(sim.commands(), vec!["$$$".to_string(), "---".to_string()]);
}

#[test]
fn test_empty_command_is_rejected_before_bus_activity() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<100>::new();

    let result = wifi.transact(b"", &mut response);

    assert!(matches!(result, Err(DriverError::InvalidArgument(_))));
    assert!(sim.wire_log().is_empty());
}

// ============================================================================
// Response capture
// ============================================================================

#[test]
fn test_exact_ok_response() {
    let sim = SimModule::new();
    sim.respond_to("AT", b"\r\nOK\r\n");
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<100>::new();

    let result = wifi.execute_text_command("AT\r\n", &mut response);

    assert_eq!(ReturnCode::of(&result), ReturnCode::Ok);
    assert_eq!(response.len(), 6);
    assert_eq!(response.as_bytes(), b"\r\nOK\r\n");
    assert_eq!(response.as_bytes_with_nul(), b"\r\nOK\r\n\0");
}

#[test]
fn test_missing_terminator_is_bad_response() {
    let sim = SimModule::new();
    sim.respond_to("AT", b"\r\nERROR\r\n> ");
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<100>::new();

    let result = wifi.execute_text_command("AT\r\n", &mut response);

    assert_eq!(result, Err(DriverError::BadResponse));
    assert_eq!(response.as_bytes(), b"\r\nERROR\r\n> \x15");
}

#[test]
fn test_odd_response_is_filled() {
    let sim = SimModule::new();
    sim.respond_to("AT", b"\r\nOK\r\n>");
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<100>::new();

    wifi.execute_text_command("AT\r\n", &mut response).unwrap();

    assert_eq!(response.as_bytes(), b"\r\nOK\r\n>\x15");
}

#[test]
fn test_full_buffer_wins_over_terminator() {
    let sim = SimModule::new();
    sim.respond_to("AT", &ok_response(b"0123456789"));
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<8>::new();

    let result = wifi.execute_text_command("AT\r\n", &mut response);

    // Seven usable bytes round down to three words.
    assert_eq!(result, Err(DriverError::RespBufferTooSmall { captured: 6 }));
    assert_eq!(result.unwrap_err().code(), ReturnCode::RespBufferTooSmall);
    assert_eq!(response.as_bytes(), b"\r\n0123");
    assert!(!sim.is_selected());
}

#[test]
fn test_truncated_capture_with_terminator_still_reports_full() {
    let sim = SimModule::new();
    sim.respond_to("AT", b"\r\nOK\r\ntrailing bytes");
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<8>::new();

    let result = wifi.execute_text_command("AT\r\n", &mut response);

    assert!(response.contains_ok());
    assert_eq!(result, Err(DriverError::RespBufferTooSmall { captured: 6 }));
}

#[test]
fn test_response_filling_buffer_exactly_is_ok() {
    let sim = SimModule::new();
    sim.respond_to("AT", b"\r\nOK\r\n");
    let mut wifi = sim.driver();
    let mut response = CommandResponse::<7>::new();

    let result = wifi.execute_text_command("AT\r\n", &mut response);

    assert_eq!(result, Ok(()));
    assert_eq!(response.len(), 6);
}

#[test]
fn test_settle_delay_after_each_transaction() {
    let sim = SimModule::new();
    let mut wifi = sim.driver().with_timing(TimingConfig {
        settle_delay_us: 250,
        ..TimingConfig::default()
    });

    wifi.enter_command_mode().unwrap();
    wifi.enter_command_mode().unwrap();

    assert_eq!(sim.delays(), vec![250_000, 250_000]);
}

// ============================================================================
// Ready handshake
// ============================================================================

#[test]
fn test_bounded_wait_times_out_on_silent_module() {
    let sim = SimModule::new();
    sim.set_silent(true);
    let mut wifi = sim.driver().with_waiter(BoundedSpin::new(50));

    let result = wifi.enter_command_mode();

    assert_eq!(result, Err(DriverError::ReadyTimeout { polls: 50 }));
    assert_eq!(result.unwrap_err().code(), ReturnCode::Error);
    assert!(!sim.is_selected());
}

#[test]
fn test_ready_raised_during_write_is_discarded() {
    let sim = SimModule::new();
    sim.raise_on_write(true);
    sim.set_silent(true);
    let mut wifi = sim.driver().with_waiter(BoundedSpin::new(50));

    // Only an assertion after the write may release the wait.
    let result = wifi.enter_command_mode();

    assert_eq!(result, Err(DriverError::ReadyTimeout { polls: 50 }));
}

#[test]
fn test_signal_consumed_by_each_transaction() {
    let sim = SimModule::new();
    let mut wifi = sim.driver().with_waiter(BoundedSpin::new(10));

    wifi.enter_command_mode().unwrap();
    assert!(!sim.ready_signal().is_raised());
    wifi.enter_machine_mode().unwrap();
    assert!(!sim.ready_signal().is_raised());
}

// ============================================================================
// Bus faults
// ============================================================================

#[test]
fn test_spi_fault_releases_chip_select() {
    let sim = SimModule::new();
    sim.inject_spi_fault();
    let mut wifi = sim.driver();

    let result = wifi.enter_command_mode();

    assert!(matches!(result, Err(DriverError::Spi(_))));
    assert!(!sim.is_selected());
}

#[test]
fn test_ready_line_fault_releases_chip_select() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    sim.inject_ready_line_fault();

    let result = wifi.enter_command_mode();

    assert!(matches!(result, Err(DriverError::Pin(_))));
    assert!(!sim.is_selected());
}

// ============================================================================
// Reset
// ============================================================================

#[test]
fn test_reset_accepts_boot_banner() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();
    assert_eq!(wifi.mode(), ModuleMode::Uninitialized);

    wifi.reset().unwrap();

    assert_eq!(wifi.mode(), ModuleMode::CommandReady);
    assert_eq!(sim.pending_bytes(), 0);
    assert!(!sim.ready_signal().is_raised());
    assert!(!sim.is_selected());
}

#[test]
fn test_reset_timings() {
    let sim = SimModule::new();
    let mut wifi = sim.driver();

    wifi.reset().unwrap();

    assert_eq!(sim.delays(), vec![50_000_000, 500_000_000]);
}

#[test]
fn test_reset_rejects_wrong_banner() {
    let sim = SimModule::new();
    sim.set_banner(&[0x15, 0x15, b'\r', b'\n', b'#', b' ']);
    let mut wifi = sim.driver();

    let result = wifi.reset();

    assert_eq!(result, Err(DriverError::WrongInitMsg));
    assert_eq!(wifi.mode(), ModuleMode::Uninitialized);
}

#[test]
fn test_reset_rejects_short_banner() {
    let sim = SimModule::new();
    sim.set_banner(&BOOT_BANNER[..4]);
    let mut wifi = sim.driver();

    assert_eq!(wifi.reset(), Err(DriverError::WrongInitMsg));
}

#[test]
fn test_reset_rejects_banner_overflow() {
    let sim = SimModule::new();
    let mut banner = BOOT_BANNER.to_vec();
    banner.extend_from_slice(b"> ");
    sim.set_banner(&banner);
    let mut wifi = sim.driver();

    let result = wifi.reset();

    assert_eq!(result, Err(DriverError::WrongInitMsg));
    assert_eq!(result.unwrap_err().code(), ReturnCode::WrongInitMsg);
    assert!(!sim.ready_signal().is_raised());
}

#[test]
fn test_release_returns_peripherals() {
    let sim = SimModule::new();
    let wifi = sim.driver();

    let (_spi, _cs, _reset, _ready, _delay) = wifi.release();
}
