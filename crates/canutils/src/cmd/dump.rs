use std::fs::OpenOptions;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};

use canutils_frame::{FilterTable, Frame};
use canutils_transport::{CanEndpoint, TransportError};
use tracing::{debug, info};

use crate::cmd::{
    classify_recv_error, install_stop_handler, DumpArgs, RecvDisposition, STOP_CHECK_INTERVAL,
};
use crate::exit::{frame_error, io_error, transport_error, CliResult, SUCCESS};
use crate::output::{write_frame, OutputFormat};

pub fn run(args: DumpArgs, format: OutputFormat) -> CliResult<i32> {
    let filters = args
        .filter
        .as_deref()
        .map(FilterTable::parse)
        .transpose()
        .map_err(|err| frame_error("invalid --filter", err))?;

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
    if let Some(filters) = filters {
        for entry in &filters {
            info!(%entry, "filter");
        }
        endpoint
            .install_filters(filters)
            .map_err(|err| transport_error("filter install failed", err))?;
    }

    let running = install_stop_handler()?;

    let mut out: Box<dyn Write> = match &args.output {
        Some(path) => Box::new(
            OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .map_err(|err| io_error(&format!("failed opening {}", path.display()), err))?,
        ),
        None => Box::new(io::stdout().lock()),
    };

    let printed = dump_frames(
        || endpoint.receive(),
        &mut out,
        &args.interface,
        format,
        args.count,
        &running,
    )?;

    info!(printed, "stopped");
    endpoint.close();
    Ok(SUCCESS)
}

/// Receive and print until the stop flag clears, `count` frames are
/// printed, or the reader goes away.
fn dump_frames<R, W>(
    mut receive: R,
    out: &mut W,
    interface: &str,
    format: OutputFormat,
    count: Option<usize>,
    running: &AtomicBool,
) -> CliResult<usize>
where
    R: FnMut() -> Result<Frame, TransportError>,
    W: Write,
{
    let mut printed = 0usize;

    while running.load(Ordering::SeqCst) {
        if count.is_some_and(|count| printed >= count) {
            break;
        }
        let frame = match receive() {
            Ok(frame) => frame,
            Err(err) => match classify_recv_error(err) {
                RecvDisposition::Retry | RecvDisposition::Skip => continue,
                RecvDisposition::Fatal(err) => return Err(err),
            },
        };

        match write_frame(out, &frame, interface, format) {
            Ok(()) => printed += 1,
            Err(err) if err.kind() == io::ErrorKind::BrokenPipe => {
                debug!("output closed");
                break;
            }
            Err(err) => return Err(io_error("write failed", err)),
        }
    }
    Ok(printed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use canutils_frame::FrameError;
    use std::collections::VecDeque;

    fn scripted(
        mut script: VecDeque<Result<Frame, TransportError>>,
    ) -> impl FnMut() -> Result<Frame, TransportError> {
        move || {
            script
                .pop_front()
                .unwrap_or(Err(TransportError::TransportClosed { source: None }))
        }
    }

    #[test]
    fn prints_frames_and_skips_timeouts_and_malformed_records() {
        let script = VecDeque::from(vec![
            Ok(Frame::new(0x123, &[0xAB, 0xCD])),
            Err(TransportError::TimedOut),
            Err(TransportError::Frame(FrameError::MalformedFrame {
                len: 5,
                expected: 16,
            })),
            Ok(Frame::new(0x1ABCDEF, &[]).extended().remote_request()),
        ]);
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        let printed = dump_frames(
            scripted(script),
            &mut out,
            "can0",
            OutputFormat::Text,
            Some(2),
            &running,
        )
        .unwrap();

        assert_eq!(printed, 2);
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "<0x123> [2] ab cd \n<0x01abcdef> [0] remote request\n"
        );
    }

    #[test]
    fn raw_dump_reads_back_as_a_capture() {
        let frames = vec![
            Frame::new(0x123, &[0xAB, 0xCD]),
            Frame::new(0x1ABCDEF, &[1, 2, 3, 4, 5, 6, 7, 8]).extended(),
            Frame::new(0x7FF, &[]).remote_request(),
        ];
        let script = frames.iter().copied().map(Ok).collect();
        let running = AtomicBool::new(true);
        let mut out = Vec::new();

        let printed = dump_frames(
            scripted(script),
            &mut out,
            "can0",
            OutputFormat::Raw,
            Some(frames.len()),
            &running,
        )
        .unwrap();

        assert_eq!(printed, 3);
        assert_eq!(out.len(), 3 * canutils_frame::FRAME_SIZE);
        let replayed: Vec<Frame> = canutils_frame::FrameReader::new(io::Cursor::new(out))
            .collect::<Result<_, _>>()
            .unwrap();
        assert_eq!(replayed, frames);
    }

    #[test]
    fn closed_transport_is_fatal() {
        let running = AtomicBool::new(true);
        let mut out = Vec::new();
        let err = dump_frames(
            scripted(VecDeque::new()),
            &mut out,
            "can0",
            OutputFormat::Text,
            None,
            &running,
        )
        .expect_err("closed transport should end the dump");
        assert_eq!(err.code, crate::exit::TRANSPORT_ERROR);
    }

    #[test]
    fn cleared_flag_stops_before_receiving() {
        let running = AtomicBool::new(false);
        let mut out = Vec::new();
        let printed = dump_frames(
            || panic!("receive must not be called"),
            &mut out,
            "can0",
            OutputFormat::Text,
            None,
            &running,
        )
        .unwrap();
        assert_eq!(printed, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn broken_pipe_ends_quietly() {
        struct ClosedPipe;

        impl Write for ClosedPipe {
            fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
                Err(io::Error::from(io::ErrorKind::BrokenPipe))
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let running = AtomicBool::new(true);
        let script = VecDeque::from(vec![Ok(Frame::new(1, &[1]))]);
        let printed = dump_frames(
            scripted(script),
            &mut ClosedPipe,
            "can0",
            OutputFormat::Text,
            None,
            &running,
        )
        .unwrap();
        assert_eq!(printed, 0);
    }
}
