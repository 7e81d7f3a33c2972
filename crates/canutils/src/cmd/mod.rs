use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use canutils_frame::{parse_c_ulong, Frame};
use canutils_link::DEFAULT_SYSFS_ROOT;
use canutils_transport::{
    Channel, Endpoint, EndpointConfig, TransportError, CAN_RAW, PF_CAN, SOCK_RAW,
};
use clap::{Args, Subcommand, ValueEnum};

use crate::exit::{transport_error, CliError, CliResult, INTERNAL};
use crate::output::OutputFormat;

pub mod config;
#[cfg(target_os = "linux")]
pub mod dump;
#[cfg(target_os = "linux")]
pub mod echo;
#[cfg(target_os = "linux")]
pub mod send;
pub mod version;

/// How long `send --poll` waits for buffer space before retrying.
pub const WRITABLE_TIMEOUT: Duration = Duration::from_millis(1000);

/// Upper bound on a blocking receive, so the stop flag is re-checked.
pub const STOP_CHECK_INTERVAL: Duration = Duration::from_millis(500);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send one frame, once, N times or until stopped.
    Send(SendArgs),
    /// Print received frames, one line each.
    Dump(DumpArgs),
    /// Write every received frame back with its identifier incremented.
    Echo(EchoArgs),
    /// Show or change interface bitrate, mode and bus state.
    Config(ConfigArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        #[cfg(target_os = "linux")]
        Command::Send(args) => send::run(args, format),
        #[cfg(target_os = "linux")]
        Command::Dump(args) => dump::run(args, format),
        #[cfg(target_os = "linux")]
        Command::Echo(args) => echo::run(args, format),
        #[cfg(not(target_os = "linux"))]
        Command::Send(_) | Command::Dump(_) | Command::Echo(_) => Err(CliError::new(
            crate::exit::TRANSPORT_ERROR,
            "raw CAN sockets are only available on Linux",
        )),
        Command::Config(args) => config::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

/// `socket(2)` overrides shared by every frame-carrying subcommand.
///
/// Long-only: `send` already uses `-p` for `--poll`.
#[derive(Args, Debug, Clone)]
pub struct SocketArgs {
    /// Protocol family.
    #[arg(long, default_value_t = PF_CAN, value_parser = parse_socket_number)]
    pub family: i32,
    /// Socket type.
    #[arg(long = "type", default_value_t = SOCK_RAW, value_parser = parse_socket_number)]
    pub socket_type: i32,
    /// CAN protocol.
    #[arg(long, default_value_t = CAN_RAW, value_parser = parse_socket_number)]
    pub protocol: i32,
}

impl SocketArgs {
    pub fn endpoint_config(&self, read_timeout: Option<Duration>) -> EndpointConfig {
        EndpointConfig {
            family: self.family,
            socket_type: self.socket_type,
            protocol: self.protocol,
            read_timeout,
            ..EndpointConfig::default()
        }
    }
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Interface to send on.
    pub interface: String,
    /// Payload bytes (up to 8), e.g. `0x11 22 033`.
    #[arg(value_name = "BYTE", conflicts_with = "from_file")]
    pub data: Vec<String>,
    /// CAN identifier.
    #[arg(short = 'i', long, default_value = "1", value_parser = parse_number)]
    pub identifier: u32,
    /// Send a remote request.
    #[arg(short = 'r', long)]
    pub rtr: bool,
    /// Send an extended frame.
    #[arg(short = 'e', long)]
    pub extended: bool,
    /// Send until interrupted.
    #[arg(short = 'l', long, conflicts_with = "loop_count")]
    pub infinite: bool,
    /// Send COUNT times.
    #[arg(long = "loop", value_name = "COUNT", value_parser = parse_number)]
    pub loop_count: Option<u32>,
    /// Wait for buffer space when the transmit queue is full.
    #[arg(short = 'p', long = "poll")]
    pub poll: bool,
    /// Print the frame before sending.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    /// Replay 16-byte wire records from a file instead of building a frame.
    #[arg(long, value_name = "PATH")]
    pub from_file: Option<PathBuf>,
    #[command(flatten)]
    pub socket: SocketArgs,
}

#[derive(Args, Debug)]
pub struct DumpArgs {
    /// Interface to listen on.
    pub interface: String,
    /// Acceptance filters. Every field is hex, with or without `0x`, so
    /// `010` means 0x10 (no octal).
    #[arg(long, value_name = "ID:MASK[:ID:MASK]...")]
    pub filter: Option<String>,
    /// Append output to a file instead of stdout.
    #[arg(short = 'o', long, value_name = "FILE")]
    pub output: Option<PathBuf>,
    /// Exit after printing N frames.
    #[arg(long)]
    pub count: Option<usize>,
    #[command(flatten)]
    pub socket: SocketArgs,
}

#[derive(Args, Debug)]
pub struct EchoArgs {
    /// Interface to echo on.
    pub interface: String,
    /// Print every frame before echoing it.
    #[arg(short = 'v', long)]
    pub verbose: bool,
    #[command(flatten)]
    pub socket: SocketArgs,
}

#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Interface to inspect or change.
    pub interface: String,
    /// Root of the per-interface attribute tree.
    #[arg(long, value_name = "DIR", env = "CANUTILS_SYSFS_ROOT", default_value = DEFAULT_SYSFS_ROOT)]
    pub sysfs_root: PathBuf,
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the bitrate, or set it first when BR is given.
    Baudrate {
        /// One of 10, 20, 50, 100, 125, 250, 500, 800, 1000 (kbit/s).
        #[arg(value_name = "BR")]
        bitrate: Option<String>,
    },
    /// Change the controller mode.
    Mode {
        #[arg(value_enum)]
        mode: ModeArg,
    },
    /// Show the bus state.
    State,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ModeArg {
    Start,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

fn parse_number(input: &str) -> Result<u32, String> {
    parse_c_ulong(input).ok_or_else(|| format!("not a number: {input}"))
}

fn parse_socket_number(input: &str) -> Result<i32, String> {
    let value = parse_number(input)?;
    i32::try_from(value).map_err(|_| format!("out of range: {input}"))
}

/// Stop flag flipped by SIGINT, SIGTERM and SIGHUP.
pub fn install_stop_handler() -> CliResult<Arc<AtomicBool>> {
    let running = Arc::new(AtomicBool::new(true));
    let flag = running.clone();
    ctrlc::set_handler(move || {
        flag.store(false, Ordering::SeqCst);
    })
    .map_err(|err| CliError::new(INTERNAL, format!("signal handler setup failed: {err}")))?;
    Ok(running)
}

/// The send half of an endpoint, as seen by the retry loop.
pub trait FrameSink {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError>;

    fn wait_writable(&self, timeout: Duration) -> Result<bool, TransportError>;
}

impl<C: Channel> FrameSink for Endpoint<C> {
    fn send_frame(&mut self, frame: &Frame) -> Result<(), TransportError> {
        self.send(frame)
    }

    fn wait_writable(&self, timeout: Duration) -> Result<bool, TransportError> {
        Endpoint::wait_writable(self, timeout)
    }
}

/// Send one frame, retrying on `Interrupted`, and on `OutOfBuffers` too
/// when `poll` is set (after waiting for writability).
pub fn send_with_retry<S: FrameSink>(
    sink: &mut S,
    frame: &Frame,
    poll: bool,
) -> Result<(), TransportError> {
    loop {
        match sink.send_frame(frame) {
            Ok(()) => return Ok(()),
            Err(TransportError::Interrupted) => continue,
            Err(TransportError::OutOfBuffers) if poll => {
                if !sink.wait_writable(WRITABLE_TIMEOUT)? {
                    tracing::debug!("transmit queue still full after poll timeout");
                }
            }
            Err(err) => return Err(err),
        }
    }
}

/// What a receive loop does with a failed `receive`.
pub enum RecvDisposition {
    /// Nothing arrived in time; check the stop flag and receive again.
    Retry,
    /// A bad record was dropped; keep going.
    Skip,
    Fatal(CliError),
}

pub fn classify_recv_error(err: TransportError) -> RecvDisposition {
    match err {
        TransportError::TimedOut | TransportError::Interrupted => RecvDisposition::Retry,
        TransportError::Frame(err) => {
            tracing::warn!(error = %err, "skipping malformed frame");
            RecvDisposition::Skip
        }
        other => RecvDisposition::Fatal(transport_error("receive failed", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use canutils_frame::FrameError;
    use std::cell::Cell;

    struct MockSink {
        failures: Vec<TransportError>,
        sends: usize,
        waits: Cell<usize>,
    }

    impl MockSink {
        fn failing_with(failures: Vec<TransportError>) -> Self {
            Self {
                failures,
                sends: 0,
                waits: Cell::new(0),
            }
        }
    }

    impl FrameSink for MockSink {
        fn send_frame(&mut self, _frame: &Frame) -> Result<(), TransportError> {
            self.sends += 1;
            if self.failures.is_empty() {
                Ok(())
            } else {
                Err(self.failures.remove(0))
            }
        }

        fn wait_writable(&self, timeout: Duration) -> Result<bool, TransportError> {
            assert_eq!(timeout, WRITABLE_TIMEOUT);
            self.waits.set(self.waits.get() + 1);
            Ok(true)
        }
    }

    #[test]
    fn interrupted_send_is_always_retried() {
        let mut sink = MockSink::failing_with(vec![
            TransportError::Interrupted,
            TransportError::Interrupted,
        ]);
        send_with_retry(&mut sink, &Frame::new(1, &[]), false).expect("send should succeed");
        assert_eq!(sink.sends, 3);
    }

    #[test]
    fn out_of_buffers_is_fatal_without_poll() {
        let mut sink = MockSink::failing_with(vec![TransportError::OutOfBuffers]);
        let err = send_with_retry(&mut sink, &Frame::new(1, &[]), false)
            .expect_err("send should fail");
        assert!(matches!(err, TransportError::OutOfBuffers));
        assert_eq!(sink.sends, 1);
        assert_eq!(sink.waits.get(), 0);
    }

    #[test]
    fn out_of_buffers_waits_and_retries_with_poll() {
        let mut sink = MockSink::failing_with(vec![
            TransportError::OutOfBuffers,
            TransportError::OutOfBuffers,
        ]);
        send_with_retry(&mut sink, &Frame::new(1, &[]), true).expect("send should succeed");
        assert_eq!(sink.sends, 3);
        assert_eq!(sink.waits.get(), 2);
    }

    #[test]
    fn other_send_errors_are_not_retried() {
        let mut sink = MockSink::failing_with(vec![TransportError::NotBound]);
        let err = send_with_retry(&mut sink, &Frame::new(1, &[]), true)
            .expect_err("send should fail");
        assert!(matches!(err, TransportError::NotBound));
        assert_eq!(sink.sends, 1);
    }

    #[test]
    fn receive_errors_are_classified() {
        assert!(matches!(
            classify_recv_error(TransportError::TimedOut),
            RecvDisposition::Retry
        ));
        assert!(matches!(
            classify_recv_error(TransportError::Interrupted),
            RecvDisposition::Retry
        ));
        assert!(matches!(
            classify_recv_error(TransportError::Frame(FrameError::MalformedFrame {
                len: 4,
                expected: 16,
            })),
            RecvDisposition::Skip
        ));
        assert!(matches!(
            classify_recv_error(TransportError::TransportClosed { source: None }),
            RecvDisposition::Fatal(_)
        ));
    }

    #[test]
    fn numbers_accept_c_literals() {
        assert_eq!(parse_number("0x7ff"), Ok(0x7FF));
        assert_eq!(parse_number("010"), Ok(8));
        assert_eq!(parse_number("42"), Ok(42));
        assert!(parse_number("forty").is_err());
        assert_eq!(parse_socket_number("29"), Ok(29));
        assert!(parse_socket_number("0xFFFFFFFF").is_err());
    }
}
