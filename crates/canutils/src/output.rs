use std::io::{self, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use canutils_frame::display::hex_payload;
use canutils_frame::{Frame, FrameError, FrameWriter};
use canutils_link::LinkInfo;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One dump line per frame.
    Text,
    Json,
    Table,
    /// 16-byte wire records, replayable with `send --from-file`.
    Raw,
}

#[derive(Serialize)]
struct FrameOutput<'a> {
    interface: &'a str,
    identifier: u32,
    extended: bool,
    remote_request: bool,
    data_length: u8,
    data: String,
    timestamp: String,
}

impl<'a> FrameOutput<'a> {
    fn new(frame: &Frame, interface: &'a str) -> Self {
        Self {
            interface,
            identifier: frame.masked_identifier(),
            extended: frame.is_extended(),
            remote_request: frame.is_remote_request(),
            data_length: frame.data_length(),
            data: hex_payload(frame),
            timestamp: now_unix_seconds(),
        }
    }
}

pub fn write_frame<W: Write + ?Sized>(
    out: &mut W,
    frame: &Frame,
    interface: &str,
    format: OutputFormat,
) -> io::Result<()> {
    match format {
        OutputFormat::Text => writeln!(out, "{frame}")?,
        OutputFormat::Json => {
            let line = serde_json::to_string(&FrameOutput::new(frame, interface))
                .unwrap_or_else(|_| "{}".to_string());
            writeln!(out, "{line}")?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INTERFACE", "ID", "FLAGS", "DLC", "DATA"])
                .add_row(vec![
                    interface.to_string(),
                    identifier_text(frame),
                    flags_text(frame),
                    frame.data_length().to_string(),
                    hex_payload(frame),
                ]);
            writeln!(out, "{table}")?;
        }
        OutputFormat::Raw => {
            return FrameWriter::new(out)
                .write_frame(frame)
                .map_err(frame_io_error)
        }
    }
    out.flush()
}

fn frame_io_error(err: FrameError) -> io::Error {
    match err {
        FrameError::Io(err) => err,
        other => io::Error::new(io::ErrorKind::InvalidData, other),
    }
}

pub fn write_link_info<W: Write + ?Sized>(
    out: &mut W,
    info: &LinkInfo,
    show_bitrate: bool,
    show_state: bool,
    format: OutputFormat,
) -> io::Result<()> {
    let bitrate = info
        .bitrate_kbit
        .map(|kbit| kbit.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match format {
        OutputFormat::Text | OutputFormat::Raw => {
            if show_bitrate {
                writeln!(out, "{}: baudrate {bitrate}", info.interface)?;
            }
            if show_state {
                writeln!(out, "{}: state {}", info.interface, info.state)?;
            }
        }
        OutputFormat::Json => {
            let line = serde_json::to_string(info).unwrap_or_else(|_| "{}".to_string());
            writeln!(out, "{line}")?;
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["INTERFACE", "BAUDRATE", "STATE"])
                .add_row(vec![
                    info.interface.clone(),
                    bitrate,
                    info.state.to_string(),
                ]);
            writeln!(out, "{table}")?;
        }
    }
    out.flush()
}

fn identifier_text(frame: &Frame) -> String {
    if frame.is_extended() {
        format!("0x{:08x}", frame.masked_identifier())
    } else {
        format!("0x{:03x}", frame.masked_identifier())
    }
}

fn flags_text(frame: &Frame) -> String {
    let mut flags = Vec::new();
    if frame.is_extended() {
        flags.push("EXT");
    }
    if frame.is_remote_request() {
        flags.push("RTR");
    }
    flags.join(",")
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs().to_string())
        .unwrap_or_else(|_| "0".to_string())
}
