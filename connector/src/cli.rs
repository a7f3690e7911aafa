//! Command line options.
//!
//! Option names match the established connector command line so launch scripts keep
//! working (`--com=COM19 --udp-in-port=5501 ...`). clap rejects unknown
//! options and a second occurrence of any single-valued option.

use clap::Parser;

/// Relay FlightGear generic-protocol data between a serial cockpit device and UDP
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "fg-connector", version, about)]
pub struct Cli {
    /// The serial port name to listen to (ex. --com=COM19)
    #[arg(long = "com", value_name = "NAME")]
    pub com: String,

    /// The serial port baud rate to use
    #[arg(long, value_name = "NUMBER", default_value_t = 9600)]
    pub baud: u32,

    /// The port to listen to for data from FlightGear
    #[arg(long = "udp-in-port", value_name = "NUMBER")]
    pub udp_in_port: u16,

    /// The port to send data on to FlightGear
    #[arg(long = "udp-out-port", value_name = "NUMBER")]
    pub udp_out_port: u16,

    /// The IP to send data on to FlightGear
    #[arg(long = "udp-out-ip", value_name = "IP", default_value = "127.0.0.1")]
    pub udp_out_ip: String,

    /// Copy data as is instead of forwarding only records that changed
    #[arg(long = "copypast", visible_alias = "basic")]
    pub copypast: bool,

    /// Print more verbose messages
    #[arg(long)]
    pub debug: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::error::ErrorKind;

    fn parse(args: &[&str]) -> Result<Cli, clap::Error> {
        Cli::try_parse_from(std::iter::once("fg-connector").chain(args.iter().copied()))
    }

    #[test]
    fn test_equals_option_syntax() {
        let cli = parse(&[
            "--com=COM19",
            "--baud=115200",
            "--udp-in-port=5501",
            "--udp-out-port=5502",
            "--udp-out-ip=192.168.1.20",
            "--debug",
        ])
        .unwrap();

        assert_eq!(cli.com, "COM19");
        assert_eq!(cli.baud, 115_200);
        assert_eq!(cli.udp_in_port, 5501);
        assert_eq!(cli.udp_out_port, 5502);
        assert_eq!(cli.udp_out_ip, "192.168.1.20");
        assert!(cli.debug);
        assert!(!cli.copypast);
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["--com=/dev/ttyUSB0", "--udp-in-port=1", "--udp-out-port=2"]).unwrap();
        assert_eq!(cli.baud, 9600);
        assert_eq!(cli.udp_out_ip, "127.0.0.1");
    }

    #[test]
    fn test_basic_alias() {
        let cli = parse(&["--com=COM1", "--udp-in-port=1", "--udp-out-port=2", "--basic"]).unwrap();
        assert!(cli.copypast);
    }

    #[test]
    fn test_duplicate_option_rejected() {
        let err = parse(&[
            "--com=COM1",
            "--udp-in-port=1",
            "--udp-in-port=3",
            "--udp-out-port=2",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ArgumentConflict);
    }

    #[test]
    fn test_unknown_option_rejected() {
        let err = parse(&["--com=COM1", "--udp-in-port=1", "--udp-out-port=2", "--fast"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnknownArgument);
    }

    #[test]
    fn test_unparsable_number_rejected() {
        let err = parse(&["--com=COM1", "--udp-in-port=abc", "--udp-out-port=2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ValueValidation);
    }

    #[test]
    fn test_missing_port_rejected() {
        let err = parse(&["--udp-in-port=1", "--udp-out-port=2"]).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::MissingRequiredArgument);
    }
}
