use std::io;

use canutils_link::{Bitrate, ControlMode, LinkConfig, SysfsLink};
use tracing::info;

use crate::cmd::{ConfigAction, ConfigArgs, ModeArg};
use crate::exit::{io_error, link_error, CliResult, SUCCESS};
use crate::output::{write_link_info, OutputFormat};

pub fn run(args: ConfigArgs, format: OutputFormat) -> CliResult<i32> {
    let link = SysfsLink::with_root(&args.sysfs_root);
    let mut out = io::stdout().lock();
    apply(&link, &args.interface, args.action, &mut out, format)?;
    Ok(SUCCESS)
}

fn apply<L: LinkConfig, W: io::Write>(
    link: &L,
    interface: &str,
    action: Option<ConfigAction>,
    out: &mut W,
    format: OutputFormat,
) -> CliResult<()> {
    let (show_bitrate, show_state) = match action {
        None => (true, false),
        Some(ConfigAction::Baudrate { bitrate }) => {
            if let Some(value) = bitrate {
                let bitrate: Bitrate = value
                    .parse()
                    .map_err(|err| link_error("invalid baudrate", err))?;
                link.set_bitrate(interface, bitrate)
                    .map_err(|err| link_error("set baudrate failed", err))?;
                info!(interface, %bitrate, "baudrate set");
            }
            (true, false)
        }
        Some(ConfigAction::Mode { mode }) => {
            let mode = match mode {
                ModeArg::Start => ControlMode::Start,
            };
            link.set_mode(interface, mode)
                .map_err(|err| link_error("set mode failed", err))?;
            return Ok(());
        }
        Some(ConfigAction::State) => (false, true),
    };

    let info = link
        .info(interface)
        .map_err(|err| link_error("read interface failed", err))?;
    write_link_info(out, &info, show_bitrate, show_state, format)
        .map_err(|err| io_error("write failed", err))
}

#[cfg(test)]
mod tests {
    use super::*;
    use canutils_link::{BusState, LinkError};
    use std::cell::RefCell;

    #[derive(Default)]
    struct MemoryLink {
        bitrate: RefCell<Option<u32>>,
        modes: RefCell<Vec<ControlMode>>,
    }

    impl LinkConfig for MemoryLink {
        fn bitrate(&self, interface: &str) -> canutils_link::Result<Option<u32>> {
            known(interface)?;
            Ok(*self.bitrate.borrow())
        }

        fn set_bitrate(&self, interface: &str, bitrate: Bitrate) -> canutils_link::Result<()> {
            known(interface)?;
            *self.bitrate.borrow_mut() = Some(bitrate.bits_per_second());
            Ok(())
        }

        fn state(&self, interface: &str) -> canutils_link::Result<BusState> {
            known(interface)?;
            Ok(BusState::Active)
        }

        fn set_mode(&self, interface: &str, mode: ControlMode) -> canutils_link::Result<()> {
            known(interface)?;
            self.modes.borrow_mut().push(mode);
            Ok(())
        }
    }

    fn known(interface: &str) -> canutils_link::Result<()> {
        if interface == "can0" {
            Ok(())
        } else {
            Err(LinkError::UnknownInterface(interface.to_string()))
        }
    }

    fn run_text(link: &MemoryLink, interface: &str, action: Option<ConfigAction>) -> CliResult<String> {
        let mut out = Vec::new();
        apply(link, interface, action, &mut out, OutputFormat::Text)?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn no_action_shows_bitrate_only() {
        let link = MemoryLink::default();
        let text = run_text(&link, "can0", None).unwrap();
        assert_eq!(text, "can0: baudrate unknown\n");
    }

    #[test]
    fn state_action_shows_state() {
        let link = MemoryLink::default();
        let text = run_text(&link, "can0", Some(ConfigAction::State)).unwrap();
        assert_eq!(text, "can0: state active\n");
    }

    #[test]
    fn baudrate_sets_then_shows() {
        let link = MemoryLink::default();
        let text = run_text(
            &link,
            "can0",
            Some(ConfigAction::Baudrate {
                bitrate: Some("250".to_string()),
            }),
        )
        .unwrap();
        assert_eq!(text, "can0: baudrate 250\n");
        assert_eq!(*link.bitrate.borrow(), Some(250_000));
    }

    #[test]
    fn invalid_baudrate_is_a_usage_error() {
        let link = MemoryLink::default();
        let err = run_text(
            &link,
            "can0",
            Some(ConfigAction::Baudrate {
                bitrate: Some("33".to_string()),
            }),
        )
        .expect_err("33 kbit/s is not in the table");
        assert_eq!(err.code, crate::exit::USAGE);
        assert!(link.bitrate.borrow().is_none());
    }

    #[test]
    fn mode_start_prints_nothing() {
        let link = MemoryLink::default();
        let text = run_text(
            &link,
            "can0",
            Some(ConfigAction::Mode {
                mode: ModeArg::Start,
            }),
        )
        .unwrap();
        assert!(text.is_empty());
        assert_eq!(*link.modes.borrow(), vec![ControlMode::Start]);
    }

    #[test]
    fn unknown_interface_fails() {
        let link = MemoryLink::default();
        let err = run_text(&link, "can7", Some(ConfigAction::State)).expect_err("unknown");
        assert_eq!(err.code, crate::exit::FAILURE);
    }
}
