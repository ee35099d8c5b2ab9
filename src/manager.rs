//! Connection supervisor
//!
//! Owns the transport and the output sink, and runs the fixed-interval
//! poll loop on a dedicated thread: read, decode, shape, detect edges and
//! hand the frame to the sink. Reconnects with a fixed backoff when the
//! device goes away.
//!
//! ```text
//! Disconnected -> Connecting --open ok--> Connected --NoDevice--> Disconnected
//!                  ^      |                                           |
//!                  +------+ open failed, backoff                      |
//!                     ^                                               |
//!                     +------------------ backoff --------------------+
//! ```
//!
//! Timeouts are a normal outcome of every idle cycle and are only counted.
//! Decode errors and other read errors are counted and polling continues.

use crate::bigben::constants::{DEFAULT_RECONNECT_BACKOFF_MS, MAX_INPUT_REPORT_SIZE, MAX_READ_TIMEOUT_MS};
use crate::bigben::{
    Connection, ConnectionState, ControllerState, LedIntent, ReportCodec, RumbleIntent, Transport,
    TransportError,
};
use crate::mapping::config::Settings;
use crate::mapping::edge::EdgeTracker;
use crate::mapping::shaper::{shape, ShapingSettings};
use crate::mapping::sink::{Frame, OutputSink};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TryRecvError, TrySendError};
use log::{debug, error, info, trace, warn};
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use thiserror::Error;

const EVENT_QUEUE_DEPTH: usize = 256;
const COMMAND_QUEUE_DEPTH: usize = 16;

#[derive(Debug, Error)]
pub enum SupervisorError {
    #[error("Failed to spawn poll thread: {0}")]
    Spawn(#[from] io::Error),

    /// The poll thread panicked and took the transport and sink with it
    #[error("Transport and sink were lost when the poll thread panicked")]
    Lost,
}

/// Timing for the poll loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SupervisorSettings {
    pub poll_interval: Duration,
    /// Upper bound on one blocking read
    pub read_timeout: Duration,
    /// Wait between a disconnect or failed open and the next open
    pub reconnect_backoff: Duration,
    /// Consecutive failed opens before giving up; `None` retries forever
    pub max_open_attempts: Option<u32>,
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(3),
            read_timeout: Duration::from_millis(MAX_READ_TIMEOUT_MS),
            reconnect_backoff: Duration::from_millis(DEFAULT_RECONNECT_BACKOFF_MS),
            max_open_attempts: None,
        }
    }
}

impl From<&Settings> for SupervisorSettings {
    fn from(s: &Settings) -> Self {
        Self {
            poll_interval: s.poll_interval(),
            read_timeout: s.read_timeout(),
            reconnect_backoff: s.reconnect_backoff(),
            max_open_attempts: s.max_open_attempts,
        }
    }
}

/// Posted to the consumer; never blocks the poll loop
#[derive(Debug, Clone, PartialEq)]
pub enum SupervisorEvent {
    StateChanged(ConnectionState),
    /// A decoded state that differs from the previous one
    State(ControllerState),
}

/// Aggregate poll counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollStats {
    pub reports: u64,
    pub decode_errors: u64,
    pub timeouts: u64,
    pub io_errors: u64,
    pub write_errors: u64,
    pub disconnects: u64,
    pub open_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    reports: AtomicU64,
    decode_errors: AtomicU64,
    timeouts: AtomicU64,
    io_errors: AtomicU64,
    write_errors: AtomicU64,
    disconnects: AtomicU64,
    open_failures: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PollStats {
        PollStats {
            reports: self.reports.load(Ordering::Relaxed),
            decode_errors: self.decode_errors.load(Ordering::Relaxed),
            timeouts: self.timeouts.load(Ordering::Relaxed),
            io_errors: self.io_errors.load(Ordering::Relaxed),
            write_errors: self.write_errors.load(Ordering::Relaxed),
            disconnects: self.disconnects.load(Ordering::Relaxed),
            open_failures: self.open_failures.load(Ordering::Relaxed),
        }
    }
}

/// Connection state plus the channel that announces its transitions
struct StateCell {
    state: Mutex<ConnectionState>,
    events: Sender<SupervisorEvent>,
}

impl StateCell {
    fn get(&self) -> ConnectionState {
        self.state.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    fn set(&self, next: ConnectionState) {
        {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if *state == next {
                return;
            }
            debug!("Connection state: {} -> {}", *state, next);
            *state = next.clone();
        }
        post(&self.events, SupervisorEvent::StateChanged(next));
    }
}

fn post(events: &Sender<SupervisorEvent>, event: SupervisorEvent) {
    match events.try_send(event) {
        Ok(()) | Err(TrySendError::Disconnected(_)) => {}
        Err(TrySendError::Full(_)) => trace!("Event queue full, dropping event"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Rumble(RumbleIntent),
    Led(LedIntent),
}

/// Why a connected session ended
enum SessionEnd {
    Shutdown,
    Disconnected,
}

/// Everything the poll thread needs besides the transport and sink
struct PollLoop {
    codec: ReportCodec,
    shaping: ShapingSettings,
    settings: SupervisorSettings,
    state: Arc<StateCell>,
    counters: Arc<Counters>,
    events: Sender<SupervisorEvent>,
    commands: Receiver<Command>,
    shutdown: Receiver<()>,
}

impl PollLoop {
    /// Sleep for `duration` unless shutdown is requested first.
    /// Returns true on shutdown.
    fn wait(&self, duration: Duration) -> bool {
        !matches!(self.shutdown.recv_timeout(duration), Err(RecvTimeoutError::Timeout))
    }

    fn shutdown_requested(&self) -> bool {
        !matches!(self.shutdown.try_recv(), Err(TryRecvError::Empty))
    }

    fn run<T: Transport, S: OutputSink>(self, mut transport: T, mut sink: S) -> (T, S) {
        info!("Poll loop started ({:?} layout)", self.codec.layout());
        let mut tracker = EdgeTracker::new();
        let mut failed_opens: u32 = 0;

        loop {
            if self.shutdown_requested() {
                break;
            }

            self.state.set(ConnectionState::Connecting);
            let mut connection = match transport.open() {
                Ok(connection) => connection,
                Err(e) => {
                    Counters::bump(&self.counters.open_failures);
                    failed_opens += 1;

                    if let Some(max) = self.settings.max_open_attempts {
                        if failed_opens >= max {
                            error!("Giving up after {} failed open attempts: {}", failed_opens, e);
                            self.state.set(ConnectionState::Faulted(format!(
                                "failed to open device after {} attempts: {}",
                                failed_opens, e
                            )));
                            // Stay faulted until stopped
                            let _ = self.shutdown.recv();
                            break;
                        }
                    }

                    if failed_opens == 1 {
                        warn!("Failed to open controller: {}. Retrying every {:?}", e, self.settings.reconnect_backoff);
                    } else {
                        debug!("Open attempt {} failed: {}", failed_opens, e);
                    }
                    // Stays Connecting across retries
                    if self.wait(self.settings.reconnect_backoff) {
                        break;
                    }
                    continue;
                }
            };

            failed_opens = 0;
            info!("✓ Controller connected");
            self.state.set(ConnectionState::Connected);

            let end = self.poll_session(&mut connection, &mut sink, &mut tracker);

            // Nothing may stay held across a disconnect, and inputs that change
            // while away must come back as fresh edges
            sink.release_all();
            tracker.reset();
            connection.close();

            match end {
                SessionEnd::Shutdown => break,
                SessionEnd::Disconnected => {
                    Counters::bump(&self.counters.disconnects);
                    info!("Controller disconnected, reconnecting in {:?}", self.settings.reconnect_backoff);
                    self.state.set(ConnectionState::Disconnected);
                    if self.wait(self.settings.reconnect_backoff) {
                        break;
                    }
                }
            }
        }

        self.state.set(ConnectionState::Disconnected);
        info!("Poll loop exited");
        (transport, sink)
    }

    fn poll_session<C: Connection, S: OutputSink>(
        &self,
        connection: &mut C,
        sink: &mut S,
        tracker: &mut EdgeTracker,
    ) -> SessionEnd {
        let mut buf = [0u8; MAX_INPUT_REPORT_SIZE];
        let mut last_published: Option<ControllerState> = None;

        loop {
            let cycle_start = Instant::now();

            if self.shutdown_requested() {
                return SessionEnd::Shutdown;
            }

            while let Ok(command) = self.commands.try_recv() {
                if let Err(TransportError::NoDevice) = self.write_command(connection, command) {
                    return SessionEnd::Disconnected;
                }
            }

            match connection.read(&mut buf, self.settings.read_timeout) {
                Ok(n) => match self.codec.decode(&buf[..n]) {
                    Ok(state) => {
                        Counters::bump(&self.counters.reports);
                        let shaped = shape(&state, &self.shaping);
                        let edges = tracker.update(state).collect();
                        sink.consume(&Frame { state, shaped, edges });

                        if last_published != Some(state) {
                            last_published = Some(state);
                            post(&self.events, SupervisorEvent::State(state));
                        }
                    }
                    Err(e) => {
                        Counters::bump(&self.counters.decode_errors);
                        trace!("Dropped report: {}", e);
                    }
                },
                Err(TransportError::Timeout) => Counters::bump(&self.counters.timeouts),
                Err(TransportError::NoDevice) => return SessionEnd::Disconnected,
                Err(TransportError::Other(msg)) => {
                    Counters::bump(&self.counters.io_errors);
                    debug!("Transient read error: {}", msg);
                }
            }

            if let Some(rest) = self.settings.poll_interval.checked_sub(cycle_start.elapsed()) {
                if !rest.is_zero() && self.wait(rest) {
                    return SessionEnd::Shutdown;
                }
            }
        }
    }

    fn write_command<C: Connection>(&self, connection: &mut C, command: Command) -> Result<(), TransportError> {
        let report = match command {
            Command::Rumble(intent) => self.codec.encode_rumble(intent),
            Command::Led(intent) => self.codec.encode_led(intent),
        };
        connection.write(&report, self.settings.read_timeout).map_err(|e| {
            Counters::bump(&self.counters.write_errors);
            debug!("Failed to write {:?}: {}", command, e);
            e
        })
    }
}

/// Supervises one controller connection and drives one output sink
pub struct ConnectionSupervisor<T, S>
where
    T: Transport,
    S: OutputSink + Send + 'static,
{
    /// Transport and sink while stopped; the poll thread owns them while running
    parts: Option<(T, S)>,
    codec: ReportCodec,
    shaping: ShapingSettings,
    settings: SupervisorSettings,
    state: Arc<StateCell>,
    counters: Arc<Counters>,
    event_receiver: Receiver<SupervisorEvent>,
    command_sender: Sender<Command>,
    command_receiver: Receiver<Command>,
    shutdown: Option<Sender<()>>,
    handle: Option<JoinHandle<(T, S)>>,
}

impl<T, S> ConnectionSupervisor<T, S>
where
    T: Transport,
    S: OutputSink + Send + 'static,
{
    pub fn new(
        transport: T,
        sink: S,
        codec: ReportCodec,
        shaping: ShapingSettings,
        settings: SupervisorSettings,
    ) -> Self {
        let (event_sender, event_receiver) = bounded(EVENT_QUEUE_DEPTH);
        let (command_sender, command_receiver) = bounded(COMMAND_QUEUE_DEPTH);

        Self {
            parts: Some((transport, sink)),
            codec,
            shaping,
            settings,
            state: Arc::new(StateCell {
                state: Mutex::new(ConnectionState::Disconnected),
                events: event_sender,
            }),
            counters: Arc::new(Counters::default()),
            event_receiver,
            command_sender,
            command_receiver,
            shutdown: None,
            handle: None,
        }
    }

    /// Build a supervisor from loaded settings
    pub fn from_settings(transport: T, sink: S, settings: &Settings) -> Self {
        Self::new(
            transport,
            sink,
            ReportCodec::new(settings.layout),
            ShapingSettings::from(settings),
            SupervisorSettings::from(settings),
        )
    }


    /// Start the poll thread. Does nothing if it is already running.
    pub fn start(&mut self) -> Result<(), SupervisorError> {
        if self.handle.is_some() {
            debug!("Supervisor already running");
            return Ok(());
        }
        let (transport, sink) = self.parts.take().ok_or(SupervisorError::Lost)?;

        let (shutdown_sender, shutdown_receiver) = bounded::<()>(0);
        let poll_loop = PollLoop {
            codec: self.codec,
            shaping: self.shaping,
            settings: self.settings,
            state: Arc::clone(&self.state),
            counters: Arc::clone(&self.counters),
            events: self.state.events.clone(),
            commands: self.command_receiver.clone(),
            shutdown: shutdown_receiver,
        };

        info!("Starting connection supervisor...");
        let handle = thread::Builder::new()
            .name("poll-loop".to_string())
            .spawn(move || poll_loop.run(transport, sink))?;

        self.shutdown = Some(shutdown_sender);
        self.handle = Some(handle);
        Ok(())
    }

    /// Stop polling and join the poll thread.
    ///
    /// The sink has released everything it held by the time this returns,
    /// and the state is `Disconnected`. Idempotent.
    pub fn stop(&mut self) {
        // Dropping the sender wakes the poll thread from any wait
        if self.shutdown.take().is_none() && self.handle.is_none() {
            return;
        }
        info!("Stopping connection supervisor...");

        if let Some(handle) = self.handle.take() {
            match handle.join() {
                Ok(parts) => self.parts = Some(parts),
                Err(_) => {
                    error!("Poll thread panicked");
                    self.state.set(ConnectionState::Disconnected);
                }
            }
        }
        info!("✓ Supervisor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_some()
    }

    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Connection transitions and decoded states, in order.
    /// Events are dropped rather than queued without bound when nobody reads.
    pub fn events(&self) -> Receiver<SupervisorEvent> {
        self.event_receiver.clone()
    }

    pub fn stats(&self) -> PollStats {
        self.counters.snapshot()
    }

    /// Queue a rumble report for the poll thread to write.
    /// Returns false if the command queue is full.
    pub fn set_rumble(&self, intent: RumbleIntent) -> bool {
        self.command_sender.try_send(Command::Rumble(intent)).is_ok()
    }

    /// Queue a player LED report for the poll thread to write.
    /// Returns false if the command queue is full.
    pub fn set_led(&self, intent: LedIntent) -> bool {
        self.command_sender.try_send(Command::Led(intent)).is_ok()
    }

    /// The sink, while stopped
    pub fn sink(&self) -> Option<&S> {
        self.parts.as_ref().map(|(_, sink)| sink)
    }

    /// The transport, while stopped
    pub fn transport(&self) -> Option<&T> {
        self.parts.as_ref().map(|(transport, _)| transport)
    }

    /// Stop and hand back the transport and sink
    pub fn into_parts(mut self) -> Option<(T, S)> {
        self.stop();
        self.parts.take()
    }
}

impl<T, S> Drop for ConnectionSupervisor<T, S>
where
    T: Transport,
    S: OutputSink + Send + 'static,
{
    fn drop(&mut self) {
        self.stop();
    }
}
