//! tyrantkv CLI Client
//!
//! Command-line interface for a Tokyo Tyrant server. One subcommand per
//! wire command, plus `keys` for a full cursor walk.

use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};
use tyrantkv::{Config, ExtOpts, MiscOpts, Tyrant};

/// tyrantkv CLI
#[derive(Parser, Debug)]
#[command(name = "tyrantkv-cli")]
#[command(about = "CLI client for Tokyo Tyrant servers")]
#[command(version)]
struct Args {
    /// Server hostname or IP address
    #[arg(long, default_value = "127.0.0.1")]
    host: String,

    /// Server TCP port
    #[arg(short, long, default_value = "1978")]
    port: u16,

    /// Socket timeout in seconds, applied to connect, read and write
    #[arg(short, long)]
    timeout: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Store a value, replacing any existing one
    Put { key: String, value: String },

    /// Store a value only if the key is absent
    Putkeep { key: String, value: String },

    /// Append to the value under a key
    Putcat { key: String, value: String },

    /// Append, then keep only the trailing WIDTH bytes
    Putshl {
        key: String,
        value: String,
        width: u32,
    },

    /// Store a value without waiting for a reply
    Putnr { key: String, value: String },

    /// Remove a key
    Out { key: String },

    /// Fetch the value under a key
    Get { key: String },

    /// Fetch several keys in one round trip
    Mget { keys: Vec<String> },

    /// Byte length of the value under a key
    Vsiz { key: String },

    /// List keys, all of them or those under a prefix
    Keys {
        /// Only return keys beginning with this prefix
        #[arg(long)]
        prefix: Option<String>,

        /// Maximum number of keys to return (prefix mode only)
        #[arg(long)]
        max: Option<u32>,
    },

    /// Call a server-side script function on a key and value
    Ext {
        func: String,
        key: String,
        value: String,

        /// Lock the record while the function runs
        #[arg(long)]
        record_lock: bool,

        /// Lock the whole database while the function runs
        #[arg(long)]
        global_lock: bool,
    },

    /// Invoke a versatile function such as putlist, getlist or outlist
    Misc {
        func: String,
        args: Vec<String>,

        /// Suppress the update log for this call
        #[arg(long)]
        no_update_log: bool,
    },

    /// Flush pending updates to the server's storage device
    Sync,

    /// Remove every record
    Vanish,

    /// Copy the database file on the server host
    Copy { path: String },

    /// Replay the update log from a timestamp (milliseconds)
    Restore { path: String, timestamp_ms: u64 },

    /// Point the server at a new replication master
    Setmst { host: String, port: u16 },

    /// Number of records
    Rnum,

    /// Database size in bytes
    Size,

    /// Server statistics
    Stat,
}

fn main() {
    // Quiet by default; RUST_LOG overrides.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    fmt().with_env_filter(filter).with_target(true).init();

    let args = Args::parse();

    if let Err(e) = run(args) {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> tyrantkv::Result<()> {
    let mut builder = Config::builder().host(&args.host).port(args.port);
    if let Some(secs) = args.timeout {
        let timeout = Duration::from_secs(secs);
        builder = builder
            .connect_timeout(timeout)
            .read_timeout(timeout)
            .write_timeout(timeout);
    }

    let mut db = Tyrant::connect(&builder.build())?;

    match args.command {
        Commands::Put { key, value } => db.put(key, value)?,
        Commands::Putkeep { key, value } => db.putkeep(key, value)?,
        Commands::Putcat { key, value } => db.putcat(key, value)?,
        Commands::Putshl { key, value, width } => db.putshl(key, value, width)?,
        Commands::Putnr { key, value } => db.putnr(key, value)?,
        Commands::Out { key } => db.out(key)?,
        Commands::Get { key } => println!("{}", render(&db.get(key)?)),
        Commands::Mget { keys } => {
            for (key, value) in db.mget(&keys)? {
                println!("{}\t{}", render(&key), render(&value));
            }
        }
        Commands::Vsiz { key } => println!("{}", db.vsiz(key)?),
        Commands::Keys { prefix, max } => match prefix {
            Some(prefix) => {
                let max = match max {
                    Some(n) => n,
                    None => u32::try_from(db.rnum()?).unwrap_or(u32::MAX),
                };
                for key in db.fwmkeys(prefix, max)? {
                    println!("{}", render(&key));
                }
            }
            None => {
                db.iterinit()?;
                while let Some(key) = db.iternext()? {
                    println!("{}", render(&key));
                }
            }
        },
        Commands::Ext {
            func,
            key,
            value,
            record_lock,
            global_lock,
        } => {
            let mut opts = ExtOpts::NONE;
            if record_lock {
                opts = opts | ExtOpts::LOCK_RECORD;
            }
            if global_lock {
                opts = opts | ExtOpts::LOCK_GLOBAL;
            }
            println!("{}", render(&db.ext(func, opts, key, value)?));
        }
        Commands::Misc {
            func,
            args,
            no_update_log,
        } => {
            let opts = if no_update_log {
                MiscOpts::NO_UPDATE_LOG
            } else {
                MiscOpts::NONE
            };
            for record in db.misc(&func, opts, &args)? {
                println!("{}", render(&record));
            }
        }
        Commands::Sync => db.sync()?,
        Commands::Vanish => db.vanish()?,
        Commands::Copy { path } => db.copy(path)?,
        Commands::Restore { path, timestamp_ms } => db.restore(path, timestamp_ms)?,
        Commands::Setmst { host, port } => db.setmst(host, port)?,
        Commands::Rnum => println!("{}", db.rnum()?),
        Commands::Size => println!("{}", db.size()?),
        Commands::Stat => print!("{}", String::from_utf8_lossy(&db.stat()?)),
    }

    db.close()
}

/// Values are arbitrary bytes; print clean UTF-8 as-is and escape the rest.
fn render(bytes: &[u8]) -> String {
    match std::str::from_utf8(bytes) {
        Ok(s) if !s.chars().any(char::is_control) => s.to_string(),
        _ => bytes.escape_ascii().to_string(),
    }
}
