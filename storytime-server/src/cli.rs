use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process;

use getopts::{Matches, Options};

pub const ADDR_VAR: &str = "STORYTIME_ADDR";
pub const EVENTS_VAR: &str = "STORYTIME_EVENTS";
pub const LOCATIONS_VAR: &str = "STORYTIME_LOCATIONS";

const DEFAULT_EVENTS: &str = "combined_events.json";
const DEFAULT_LOCATIONS: &str = "locations.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Serve(ServeArgs),
    Normalize(NormalizeArgs),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeArgs {
    pub address: SocketAddr,
    pub events: PathBuf,
    pub locations: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeArgs {
    pub jersey_city: Option<PathBuf>,
    pub hoboken: Option<PathBuf>,
    pub output: PathBuf,
}

fn opts() -> Options {
    let mut opts = Options::new();
    opts.optflag(
        "h",
        "help",
        concat!("Print the help output of ", env!("CARGO_PKG_NAME")),
    );
    opts.optopt(
        "a",
        "address",
        "Socket address (IP and port) to listen on [Env: STORYTIME_ADDR] [Default: 127.0.0.1:8080]",
        "SOCKET_ADDRESS",
    );
    opts.optopt(
        "e",
        "events",
        "Combined store file [Env: STORYTIME_EVENTS] [Default: combined_events.json]",
        "FILE",
    );
    opts.optopt(
        "l",
        "locations",
        "Location table file [Env: STORYTIME_LOCATIONS] [Default: locations.json]",
        "FILE",
    );
    opts.optopt(
        "j",
        "jersey-city",
        "normalize: Jersey City LibCal fetcher output",
        "FILE",
    );
    opts.optopt("b", "hoboken", "normalize: Hoboken Communico fetcher output", "FILE");
    opts.optopt(
        "o",
        "output",
        "normalize: combined store to write [Default: the --events file]",
        "FILE",
    );
    opts
}

fn usage(opts: &Options) -> String {
    let brief = format!(
        "Usage: {} [serve|normalize] [options]",
        env!("CARGO_PKG_NAME")
    );
    opts.usage(&brief)
}

/// Parses the process arguments, printing usage and exiting on `--help` or
/// invalid input.
pub fn parse(args: Vec<String>) -> Command {
    let opts = opts();

    let matches = match opts.parse(args.iter().skip(1)) {
        Ok(matches) => matches,
        Err(fail) => {
            eprintln!("{fail}");
            process::exit(1);
        }
    };

    if matches.opt_present("help") {
        println!("{}", usage(&opts));
        process::exit(0);
    }

    match command(&matches, |name| env::var(name).ok()) {
        Ok(command) => command,
        Err(err) => {
            eprintln!("{err}");
            process::exit(1);
        }
    }
}

/// Resolves each setting from its flag, then its environment variable, then
/// the compiled default.
pub fn command<F>(matches: &Matches, env: F) -> Result<Command, String>
where
    F: Fn(&str) -> Option<String>,
{
    let setting = |flag: &str, var: &str| matches.opt_str(flag).or_else(|| env(var));

    let events = setting("events", EVENTS_VAR).unwrap_or_else(|| DEFAULT_EVENTS.to_string());

    match matches.free.first().map(String::as_str) {
        None | Some("serve") => {
            let address = match setting("address", ADDR_VAR) {
                Some(raw) => raw.parse().map_err(|err| {
                    format!("Provided value for option 'address' is invalid: {err}")
                })?,
                None => SocketAddr::from(([127, 0, 0, 1], 8080)),
            };

            Ok(Command::Serve(ServeArgs {
                address,
                events: events.into(),
                locations: setting("locations", LOCATIONS_VAR)
                    .unwrap_or_else(|| DEFAULT_LOCATIONS.to_string())
                    .into(),
            }))
        }
        Some("normalize") => {
            let jersey_city = matches.opt_str("jersey-city").map(PathBuf::from);
            let hoboken = matches.opt_str("hoboken").map(PathBuf::from);
            if jersey_city.is_none() && hoboken.is_none() {
                return Err("normalize needs --jersey-city and/or --hoboken".into());
            }

            Ok(Command::Normalize(NormalizeArgs {
                jersey_city,
                hoboken,
                output: matches.opt_str("output").unwrap_or(events).into(),
            }))
        }
        Some(other) => Err(format!("Unknown command '{other}'")),
    }
}
