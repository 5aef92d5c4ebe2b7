//! this binary starts the snapkv server
//! to see the list of options, type: `snapkv-server --help`
//!
//! On start-up the server loads the snapshot file into memory, starts a background thread that
//! backs the store up to that same file every `--backup-interval` milliseconds, and then
//! services client connections on a thread pool.

use clap::{crate_version, App, Arg};
use snapkv::config::{DEFAULT_ADDRESS, DEFAULT_BACKUP_INTERVAL_MS, DEFAULT_SNAPSHOT_FILE, DEFAULT_THREADS};
use snapkv::{
    BackupScheduler, KvStore, KvsEngine, KvsServer, PoolKind, RayonThreadPool, Result,
    ServerConfig, SharedQueueThreadPool, ThreadPool,
};
use std::process::exit;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    // parse command line args
    let matches = App::new("snapkv-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("an in-memory key-value store with periodic snapshots")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the server listens on")
            .default_value(DEFAULT_ADDRESS))
        .arg(Arg::with_name("file")
            .long("file")
            .value_name("PATH")
            .help("path of the snapshot file to load at start-up and back up to")
            .default_value(DEFAULT_SNAPSHOT_FILE))
        .arg(Arg::with_name("backup-interval")
            .long("backup-interval")
            .value_name("MILLIS")
            .help("milliseconds between two backups of the store")
            .default_value(DEFAULT_BACKUP_INTERVAL_MS))
        .arg(Arg::with_name("allow-empty-db-on-start")
            .long("allow-empty-db-on-start")
            .value_name("BOOL")
            .help("start with an empty store if the snapshot file is missing")
            .possible_values(&["true", "false"])
            .default_value("true"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .help("the thread pool used to serve connections")
            .possible_values(&PoolKind::variants())
            .default_value("shared"))
        .arg(Arg::with_name("threads")
            .long("threads")
            .value_name("N")
            .help("number of threads in the connection pool")
            .default_value(DEFAULT_THREADS))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("maximum level of log messages: error, warn, info, debug or trace")
            .default_value("info"))
        .get_matches();

    // validate command line options, store them in a ServerConfig
    let config = match ServerConfig::build(
        matches.value_of("addr").unwrap_or(DEFAULT_ADDRESS),
        matches.value_of("file").unwrap_or(DEFAULT_SNAPSHOT_FILE),
        matches.value_of("backup-interval").unwrap_or(DEFAULT_BACKUP_INTERVAL_MS),
        matches.value_of("allow-empty-db-on-start").unwrap_or("true"),
        matches.value_of("pool").unwrap_or("shared"),
        matches.value_of("threads").unwrap_or(DEFAULT_THREADS),
        matches.value_of("log-level").unwrap_or("info"),
    ) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("{}", err);
            exit(1);
        }
    };

    // set up a tracing subscriber to log to STDERR
    subscriber_config(config.log_level);

    // start the server
    if let Err(e) = run(config) {
        eprintln!("{}", e);
        exit(1);
    }
}

fn run(config: ServerConfig) -> Result<()> {
    info!("snapkv-server {}", env!("CARGO_PKG_VERSION"));
    info!("Snapshot file: {:?}", config.snapshot_path);

    // any failure to produce the initial state aborts the start-up
    let store = KvStore::open(&config.snapshot_path, config.allow_empty)?;
    info!("Loaded {} keys", store.len());

    match config.pool {
        PoolKind::shared => {
            run_with_pool(store, SharedQueueThreadPool::new(config.threads)?, &config)
        }
        PoolKind::rayon => run_with_pool(store, RayonThreadPool::new(config.threads)?, &config),
    }
}

fn run_with_pool<E: KvsEngine, P: ThreadPool>(engine: E, pool: P, config: &ServerConfig) -> Result<()> {
    let backups = BackupScheduler::new(
        engine.clone(),
        config.snapshot_path.clone(),
        config.backup_interval,
    )
    .start()?;

    let server = KvsServer::new(engine, pool);
    let result = server.run(config.addr);

    // the server only returns on error, stop backing up before exiting
    backups.join()?;
    result
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        // all spans/events at `level` or more severe will be written
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("setting tracing default subscriber failed: {}", e);
    }
}
