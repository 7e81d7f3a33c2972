use std::fs::File;
use std::io::BufReader;
use std::sync::atomic::{AtomicBool, Ordering};

use canutils_frame::{parse_c_ulong, Frame, FrameReader, MAX_DATA_LENGTH};
use canutils_transport::CanEndpoint;
use tracing::{info, warn};

use crate::cmd::{install_stop_handler, send_with_retry, FrameSink, SendArgs};
use crate::exit::{frame_error, io_error, transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{write_frame, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let frames = match &args.from_file {
        Some(path) => read_capture(path)?,
        None => vec![build_frame(&args)?],
    };

    let config = args.socket.endpoint_config(None);
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

    if args.verbose {
        let mut out = std::io::stdout().lock();
        for frame in &frames {
            write_frame(&mut out, frame, &args.interface, format)
                .map_err(|err| io_error("write failed", err))?;
        }
    }

    let running = if args.infinite {
        Some(install_stop_handler()?)
    } else {
        None
    };
    let repeat = Repeat::from_args(&args);
    let sent = send_repeated(&mut endpoint, &frames, repeat, args.poll, running.as_deref())
        .map_err(|err| transport_error("send failed", err))?;

    info!(sent, "done");
    endpoint.close();
    Ok(SUCCESS)
}

/// How many times the frame sequence is sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Repeat {
    Times(u32),
    Forever,
}

impl Repeat {
    fn from_args(args: &SendArgs) -> Self {
        if args.infinite {
            Repeat::Forever
        } else {
            Repeat::Times(args.loop_count.unwrap_or(1))
        }
    }
}

fn send_repeated<S: FrameSink>(
    sink: &mut S,
    frames: &[Frame],
    repeat: Repeat,
    poll: bool,
    running: Option<&AtomicBool>,
) -> Result<u64, canutils_transport::TransportError> {
    let keep_going = || running.is_none_or(|flag| flag.load(Ordering::SeqCst));
    let mut sent = 0u64;
    let mut round = 0u32;

    while keep_going() {
        if let Repeat::Times(count) = repeat {
            if round >= count {
                break;
            }
        }
        for frame in frames {
            send_with_retry(sink, frame, poll)?;
            sent += 1;
        }
        round = round.saturating_add(1);
    }
    Ok(sent)
}

fn build_frame(args: &SendArgs) -> CliResult<Frame> {
    let data = parse_data_bytes(&args.data)?;
    let mut frame = Frame::new(args.identifier, &data);
    frame.set_extended(args.extended);
    frame.set_remote_request(args.rtr);
    Ok(frame)
}

fn parse_data_bytes(values: &[String]) -> CliResult<Vec<u8>> {
    let limit = usize::from(MAX_DATA_LENGTH);
    if values.len() > limit {
        warn!(
            given = values.len(),
            used = limit,
            "ignoring payload bytes past the eighth"
        );
    }
    values
        .iter()
        .take(limit)
        .map(|value| {
            parse_c_ulong(value)
                .and_then(|byte| u8::try_from(byte).ok())
                .ok_or_else(|| CliError::new(USAGE, format!("invalid data byte: {value}")))
        })
        .collect()
}

fn read_capture(path: &std::path::Path) -> CliResult<Vec<Frame>> {
    let context = format!("failed reading {}", path.display());
    let file = File::open(path).map_err(|err| io_error(&context, err))?;
    let frames = FrameReader::new(BufReader::new(file))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| frame_error(&context, err))?;
    if frames.is_empty() {
        return Err(CliError::new(
            USAGE,
            format!("{} holds no frames", path.display()),
        ));
    }
    Ok(frames)
}
