//! The snapkv-client executable supports the following command line arguments:
//!
//! `snapkv-client get <KEY> [--addr IP-PORT]`
//!
//!     Get the string value of a given string key. Prints "Key not found" if the key is absent.
//!
//! `snapkv-client list [--addr IP-PORT]`
//!
//!     Print every key/value pair in the store as a JSON object.
//!
//! `snapkv-client rm <KEY> [--addr IP-PORT]`
//!
//!     Remove a given string key and print the value it held.
//!     A "key not found" is treated as an error in the "rm" command.
//!
//! `snapkv-client upsert <KEY=VALUE>... [--addr IP-PORT]`
//!
//!     Insert or overwrite one or more keys in a single batch. If a key is given more than
//!     once, the last value wins.
//!
//! `snapkv-client -V`
//!
//!     Print the version.
//!
//! --addr accepts an IP address, either v4 or v6, and a port number, with the format IP:PORT.
//! If --addr is not specified then connect on 127.0.0.1:5555.
//! Print an error and return a non-zero exit code on server error, or if IP-PORT does not parse
//! as an address.

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::process::exit;
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use snapkv::config::DEFAULT_ADDRESS;
use snapkv::{parse_pairs, KvsClient, KvsError, Request, Result};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's ip:port
    addr: SocketAddr,
    req: Request,
}

impl Opt {
    fn new(addr: SocketAddr, req: Request) -> Self {
        Self { addr, req }
    }

    /// validates the `addr` parameter is a valid IP address and PORT
    /// returns `Ok<Opt>` if everything is valid
    /// # Errors
    /// returns [`KvsError::Parsing`] if one of the parameters is invalid
    ///
    fn build(addr: &str, req: Request) -> Result<Opt> {
        let addr: SocketAddr = addr
            .parse()
            .map_err(|_| KvsError::Parsing(format!("could not parse {} into an IP address and port", &addr)))?;

        Ok(Opt::new(addr, req))
    }
}

fn main() {
    // configure a subscriber that will log warnings to STDERR
    subscriber_config();

    let matches = App::new("snapkv-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a client for the snapkv key-value store")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("get")
                .about("Get the string value of a given string key")
                .arg(Arg::with_name("KEY").required(true).index(1)),
            SubCommand::with_name("list")
                .about("List every key/value pair in the store"),
            SubCommand::with_name("rm")
                .about("Removes a given key")
                .arg(Arg::with_name("KEY").required(true).index(1)),
            SubCommand::with_name("upsert")
                .about("Insert or overwrite one or more KEY=VALUE pairs")
                .arg(Arg::with_name("PAIRS").required(true).multiple(true).index(1)),
        ])
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT of the server to connect to")
            .global(true)
            .default_value(DEFAULT_ADDRESS))
        .get_matches();

    // parse commands into an Opt struct, then send the request
    if let Err(e) = parse_options(&matches).and_then(run) {
        eprintln!("{}", e);
        exit(1);
    }
}

/// runs the specified request on the [`KvsClient`]
/// `opt` contains the server address and the request type to execute
fn run(opt: Opt) -> Result<()> {
    let mut client = KvsClient::connect(opt.addr)?;
    match opt.req {
        Request::Get { key } => match client.get(key) {
            Ok(value) => println!("{}", value),
            Err(KvsError::KeyNotFound) => println!("Key not found"),
            Err(e) => return Err(e),
        },
        Request::List => {
            // sorted, so the output is stable between runs
            let items: BTreeMap<String, String> = client.list()?.into_iter().collect();
            println!("{}", serde_json::to_string(&items)?);
        }
        Request::Delete { key } => {
            let value = client.delete(key)?;
            println!("{}", value);
        }
        Request::Upsert { items } => {
            client.upsert(items)?;
        }
    }
    Ok(())
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let (name, args) = matches.subcommand();
    let args = args.ok_or_else(|| KvsError::Parsing("no command given".to_string()))?;
    let addr = args
        .value_of("addr")
        .or_else(|| matches.value_of("addr"))
        .unwrap_or(DEFAULT_ADDRESS);
    let key = || args.value_of("KEY").map(String::from).unwrap_or_default();

    let req = match name {
        "get" => Request::Get { key: key() },
        "list" => Request::List,
        "rm" => Request::Delete { key: key() },
        "upsert" => Request::Upsert {
            items: parse_pairs(args.values_of("PAIRS").into_iter().flatten())?,
        },
        other => return Err(KvsError::Parsing(format!("unknown command: {}", other))),
    };
    Opt::build(addr, req)
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        // the client only reports problems, request results go to stdout
        .with_max_level(Level::WARN)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting tracing default subscriber failed: {}", e);
    }
}
