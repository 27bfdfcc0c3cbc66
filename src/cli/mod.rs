pub mod actions;
pub mod config;
pub mod consent;

use clap::{Arg, ArgMatches, Command};

/// Build the command-line definition.
pub fn command() -> Command {
    Command::new("fingerprobe")
        .about("Check the serial link to an Arduino fingerprint attendance device")
        .version(env!("CARGO_PKG_VERSION"))
        .arg(
            Arg::new("port")
                .long("port")
                .short('p')
                .help("Serial port the Arduino is attached to")
                .value_name("PORT"),
        )
        .arg(
            Arg::new("baud-rate")
                .long("baud-rate")
                .short('b')
                .help("Serial port baud rate [default: 57600]")
                .value_name("BAUD")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .help("Serial read timeout in milliseconds [default: 5000]")
                .value_name("MS")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new("config")
                .long("config")
                .short('c')
                .help("TOML file with port and timing settings")
                .value_name("FILE"),
        )
        .arg(
            Arg::new("hardware")
                .long("hardware")
                .help("Run the LED/buzzer hardware test: ask, yes or no")
                .value_name("MODE")
                .value_parser(["ask", "yes", "no"]),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .short('j')
                .help("Output results in JSON format")
                .action(clap::ArgAction::SetTrue),
        )
        .arg(
            Arg::new("list-ports")
                .long("list-ports")
                .short('l')
                .help("List all available serial ports and exit")
                .action(clap::ArgAction::SetTrue)
                .conflicts_with("send"),
        )
        .arg(
            Arg::new("send")
                .long("send")
                .help("Send one device command (e.g. PING, ENROLL:5) and print the reply")
                .value_name("COMMAND"),
        )
        .arg(
            Arg::new("simulate")
                .long("simulate")
                .help("Talk to a built-in simulated device instead of a serial port")
                .action(clap::ArgAction::SetTrue),
        )
}

/// Parse command line arguments and return ArgMatches.
pub fn parse_args() -> Result<ArgMatches, clap::Error> {
    command().try_get_matches()
}
