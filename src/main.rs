//! Bigben Bridge - Main Application
//!
//! Polls a Bigben wired controller over USB and drives the output
//! configured in `configs/default.toml` (or the file given as the first
//! argument).
//!
//! ⚠️  WARNING: in keymouse mode on Windows this sends REAL keyboard and
//! ⚠️  mouse input to your system. Check your config before running.

use anyhow::{bail, Context, Result};
use bigben_bridge::backend::{BackendError, ReportDelivery};
use bigben_bridge::bigben::{ConnectionState, Layout, UsbTransport};
use bigben_bridge::mapping::{
    Config, HidOutput, HidReportBuilder, KeyMouseEmulator, OutputMode, OutputSink,
};
use bigben_bridge::{ConnectionSupervisor, SupervisorEvent};
use crossbeam_channel::{bounded, select};
use log::{info, trace, warn};

/// Stand-in for a virtual HID device: there is no user-space driver to
/// hand reports to, so they are only traced
struct TracedDelivery;

impl ReportDelivery for TracedDelivery {
    fn deliver_input_report(&self, timestamp_us: u64, report: &[u8]) -> Result<(), BackendError> {
        trace!("HID report @{}us: {:02x?}", timestamp_us, report);
        Ok(())
    }
}

#[cfg(windows)]
fn input_backends() -> (
    bigben_bridge::backend::KeyboardSendInputBackend,
    bigben_bridge::backend::MouseSendInputBackend,
) {
    (
        bigben_bridge::backend::KeyboardSendInputBackend,
        bigben_bridge::backend::MouseSendInputBackend,
    )
}

#[cfg(not(windows))]
fn input_backends() -> (
    bigben_bridge::backend::MockKeyboardBackend,
    bigben_bridge::backend::MockMouseBackend,
) {
    warn!("No input injection on this platform; using logging backends");
    (
        bigben_bridge::backend::MockKeyboardBackend::new(),
        bigben_bridge::backend::MockMouseBackend::new(),
    )
}

fn build_sink(config: &Config) -> Result<Box<dyn OutputSink + Send>> {
    match config.settings.output {
        OutputMode::Hid => {
            let builder = HidReportBuilder::new(
                config.settings.stick_deadzone,
                config.settings.trigger_deadzone,
            )
            .with_invert_y(config.settings.layout == Layout::Legacy);
            warn!("No virtual HID device is available; reports are only traced (RUST_LOG=trace)");
            println!("✓ Output: HID gamepad reports");
            Ok(Box::new(HidOutput::new(builder, TracedDelivery)))
        }
        OutputMode::KeyMouse => {
            let (keyboard, mouse) = input_backends();
            let mut emulator = KeyMouseEmulator::new(config, keyboard, mouse)?;
            emulator
                .start_flush_clock()
                .context("failed to start mouse flush thread")?;
            println!("✓ Output: keyboard/mouse (profile '{}')", emulator.current_profile_name());
            Ok(Box::new(emulator))
        }
    }
}

fn main() -> Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    println!("=== Bigben Bridge ===");
    println!();
    println!("This application will:");
    println!("1. Wait for a Bigben wired controller on USB");
    println!("2. Decode its input reports");
    println!("3. Drive the configured output (HID gamepad or keyboard/mouse)");
    println!("4. Reconnect automatically if the controller is unplugged");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::load(&path).with_context(|| format!("failed to load {}", path))?,
        None => Config::load_default().context("failed to load configs/default.toml")?,
    };
    println!("✓ Loaded configuration ({:?} layout)", config.settings.layout);

    let sink = build_sink(&config)?;
    let transport = UsbTransport::new().context("failed to initialise libusb")?;
    let mut supervisor = ConnectionSupervisor::from_settings(transport, sink, &config.settings);

    let (stop_sender, stop_receiver) = bounded::<()>(1);
    ctrlc::set_handler(move || {
        let _ = stop_sender.try_send(());
    })
    .context("failed to install Ctrl-C handler")?;

    let events = supervisor.events();
    supervisor.start()?;
    println!("Supervisor started! Waiting for controller...");
    println!();

    let mut fault = None;
    loop {
        select! {
            recv(stop_receiver) -> _ => break,
            recv(events) -> event => match event {
                Ok(SupervisorEvent::StateChanged(ConnectionState::Connected)) => {
                    println!("✓ Controller connected");
                }
                Ok(SupervisorEvent::StateChanged(ConnectionState::Disconnected)) => {
                    println!("Controller disconnected, waiting...");
                }
                Ok(SupervisorEvent::StateChanged(ConnectionState::Faulted(reason))) => {
                    fault = Some(reason);
                    break;
                }
                Ok(_) => {}
                Err(_) => break,
            }
        }
    }

    println!("Stopping...");
    supervisor.stop();
    let stats = supervisor.stats();
    info!(
        "Reports: {}, decode errors: {}, I/O errors: {}, disconnects: {}",
        stats.reports, stats.decode_errors, stats.io_errors, stats.disconnects
    );

    if let Some(reason) = fault {
        bail!("controller faulted: {}", reason);
    }
    Ok(())
}
