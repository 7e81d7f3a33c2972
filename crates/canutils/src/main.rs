mod cmd;
mod exit;
mod logging;
mod output;

use clap::Parser;

use crate::cmd::Command;
use crate::logging::{init_logging, LogFormat, LogLevel};
use crate::output::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "canutils", version, about = "CAN interface utilities")]
struct Cli {
    /// Output format.
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    format: OutputFormat,

    /// Log output format (stderr).
    #[arg(long, value_name = "FORMAT", default_value = "text", global = true)]
    log_format: LogFormat,

    /// Minimum log level (stderr).
    #[arg(long, value_name = "LEVEL", default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_format, cli.log_level);

    match cmd::run(cli.command, cli.format) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(err.code);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd::ConfigAction;

    #[test]
    fn parses_send_subcommand() {
        let cli = Cli::try_parse_from([
            "canutils", "send", "can0", "-i", "0x123", "-e", "--loop", "3", "0x11", "22",
        ])
        .expect("send args should parse");

        let Command::Send(args) = cli.command else {
            panic!("expected send");
        };
        assert_eq!(args.interface, "can0");
        assert_eq!(args.identifier, 0x123);
        assert!(args.extended);
        assert_eq!(args.loop_count, Some(3));
        assert_eq!(args.data, vec!["0x11", "22"]);
    }

    #[test]
    fn rejects_infinite_with_loop_count() {
        let err = Cli::try_parse_from(["canutils", "send", "can0", "-l", "--loop", "2"])
            .expect_err("conflicting args should fail");

        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn parses_dump_with_filter_and_socket_overrides() {
        let cli = Cli::try_parse_from([
            "canutils",
            "--format",
            "json",
            "dump",
            "can0",
            "--filter",
            "123:7ff",
            "--family",
            "29",
            "-o",
            "/tmp/dump.log",
        ])
        .expect("dump args should parse");

        assert_eq!(cli.format, OutputFormat::Json);
        let Command::Dump(args) = cli.command else {
            panic!("expected dump");
        };
        assert_eq!(args.filter.as_deref(), Some("123:7ff"));
        assert_eq!(args.socket.family, 29);
        assert_eq!(args.socket.protocol, canutils_transport::CAN_RAW);
    }

    #[test]
    fn dump_help_says_filter_fields_are_hex() {
        let err = Cli::try_parse_from(["canutils", "dump", "--help"])
            .expect_err("--help exits through the error path");
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        let help = err.to_string();
        assert!(help.contains("--filter"), "help: {help}");
        assert!(help.contains("Every field is hex"), "help: {help}");
    }

    #[test]
    fn parses_config_baudrate() {
        let cli = Cli::try_parse_from([
            "canutils",
            "config",
            "can0",
            "--sysfs-root",
            "/tmp/sys",
            "baudrate",
            "125",
        ])
        .expect("config args should parse");

        let Command::Config(args) = cli.command else {
            panic!("expected config");
        };
        assert!(matches!(
            args.action,
            Some(ConfigAction::Baudrate { bitrate: Some(ref br) }) if br == "125"
        ));
    }
}
