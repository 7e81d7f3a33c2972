use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use canutils_frame::Frame;
use canutils_transport::{CanEndpoint, TransportError};
use tracing::{info, trace, warn};

use crate::cmd::{
    classify_recv_error, install_stop_handler, send_with_retry, EchoArgs, FrameSink,
    RecvDisposition, STOP_CHECK_INTERVAL,
};
use crate::exit::{io_error, transport_error, CliResult, SUCCESS};
use crate::output::{write_frame, OutputFormat};

pub fn run(args: EchoArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.socket.endpoint_config(Some(STOP_CHECK_INTERVAL));
    info!(
        interface = %args.interface,
        family = config.family,
        socket_type = config.socket_type,
        protocol = config.protocol,
        "opening endpoint"
    );
    let mut endpoint =
        CanEndpoint::open(&config).map_err(|err| transport_error("open failed", err))?;
    endpoint
        .bind(&args.interface)
        .map_err(|err| transport_error("bind failed", err))?;

    let running = install_stop_handler()?;
    let mut out = io::stdout().lock();
    let verbose = args.verbose.then_some(&mut out as &mut dyn Write);

    let echoed = echo_frames(&mut endpoint, verbose, &args.interface, format, &running)?;

    info!(echoed, "stopped");
    endpoint.close();
    Ok(SUCCESS)
}

/// Both halves of an endpoint, as seen by the echo loop.
trait EchoPort: FrameSink {
    fn receive_frame(&mut self) -> Result<Frame, TransportError>;
}

impl EchoPort for CanEndpoint {
    fn receive_frame(&mut self) -> Result<Frame, TransportError> {
        self.receive()
    }
}

/// Write every received frame back as its [`Frame::echo_reply`].
fn echo_frames<P: EchoPort>(
    port: &mut P,
    mut verbose: Option<&mut dyn Write>,
    interface: &str,
    format: OutputFormat,
    running: &AtomicBool,
) -> CliResult<u64> {
    let mut echoed = 0u64;

    while running.load(Ordering::SeqCst) {
        let frame = match port.receive_frame() {
            Ok(frame) => frame,
            Err(err) => match classify_recv_error(err) {
                RecvDisposition::Retry | RecvDisposition::Skip => continue,
                RecvDisposition::Fatal(err) => return Err(err),
            },
        };

        if let Some(out) = verbose.as_deref_mut() {
            write_frame(out, &frame, interface, format)
                .map_err(|err| io_error("write failed", err))?;
        }

        let reply = frame.echo_reply();
        match send_with_retry(port, &reply, false) {
            Ok(()) => {
                trace!(%reply, "echoed frame");
                echoed += 1;
            }
            Err(TransportError::OutOfBuffers) => {
                warn!(%reply, "transmit queue full, reply dropped");
            }
            Err(err) => return Err(transport_error("echo send failed", err)),
        }
    }
    Ok(echoed)
}
