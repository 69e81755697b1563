//! nskv - command line access to namespaced tables
//!
//! Connects to a Redis-compatible server and runs one command against a
//! table, applying the table's expiration policy the same way the library
//! does.

use anyhow::{bail, Context};
use bytes::Bytes;
use nskv::store::KeyTtl;
use nskv::{ClientConfig, Database, KeyCommands, RespClient, Table};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Command line configuration
struct Config {
    /// Server to connect to
    client: ClientConfig,
    /// Database, table, command and its arguments
    positional: Vec<String>,
}

impl Config {
    /// Parse configuration from command-line arguments
    fn from_args() -> Self {
        let mut client = ClientConfig::default();
        let mut positional = Vec::new();
        let args: Vec<String> = std::env::args().collect();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--host" | "-h" => {
                    if i + 1 < args.len() {
                        client.host = args[i + 1].clone();
                        i += 2;
                    } else {
                        eprintln!("Error: --host requires a value");
                        std::process::exit(1);
                    }
                }
                "--port" | "-p" => {
                    if i + 1 < args.len() {
                        client.port = args[i + 1].parse().unwrap_or_else(|_| {
                            eprintln!("Error: invalid port number");
                            std::process::exit(1);
                        });
                        i += 2;
                    } else {
                        eprintln!("Error: --port requires a value");
                        std::process::exit(1);
                    }
                }
                "--help" => {
                    print_help();
                    std::process::exit(0);
                }
                "--version" | "-v" => {
                    println!("nskv version {}", nskv::VERSION);
                    std::process::exit(0);
                }
                arg if arg.starts_with("--") => {
                    eprintln!("Unknown argument: {}", arg);
                    print_help();
                    std::process::exit(1);
                }
                _ => {
                    positional.push(args[i].clone());
                    i += 1;
                }
            }
        }

        Config { client, positional }
    }
}

fn print_help() {
    println!(
        r#"
nskv - Namespaced tables over a Redis-compatible store

USAGE:
    nskv [OPTIONS] <DB> <TABLE> <COMMAND> [ARGS...]

OPTIONS:
    -h, --host <HOST>    Server host (default: 127.0.0.1)
    -p, --port <PORT>    Server port (default: 6379)
    -v, --version        Print version information
        --help           Print this help message

COMMANDS:
    get <KEY>                 Read a value (renews the sliding window)
    set <KEY> <VALUE> [MS]    Write a value, with the table TTL unless MS is given
    del <KEY>                 Delete a key
    ttl <KEY>                 Remaining time to live in milliseconds
    keys [PATTERN]            List the table's keys (default: *)
    expire <MS>               Set the table's explicit TTL (0 clears it)
    window <MS>               Set the table's sliding window (0 disables it)
    policy                    Show the table's TTL settings
    drop-table                Delete every key of the table
    drop-db                   Delete every key of the database

EXAMPLES:
    nskv app sessions window 1800000
    nskv app sessions set abc ariz
    nskv --port 6380 app sessions get abc

Set RUST_LOG=debug to see the commands being issued.
"#
    );
}

fn parse_millis(raw: &str) -> anyhow::Result<Duration> {
    let ms: u64 = raw
        .parse()
        .with_context(|| format!("invalid milliseconds: {raw}"))?;
    Ok(Duration::from_millis(ms))
}

fn arg<'a>(args: &'a [String], index: usize, name: &str) -> anyhow::Result<&'a str> {
    args.get(index)
        .map(String::as_str)
        .with_context(|| format!("missing <{name}>"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_args();

    // Logs go to stderr so command output stays pipeable.
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let [db_name, table_name, command, args @ ..] = config.positional.as_slice() else {
        print_help();
        bail!("expected <DB> <TABLE> <COMMAND>");
    };

    info!(addr = %config.client.addr(), "connecting");
    let client = RespClient::connect(config.client.clone())
        .await
        .with_context(|| format!("can't connect to {}", config.client.addr()))?;

    let db = Database::new(db_name, Arc::new(client))?;
    let table = db.create_table(table_name).await?;

    run(&db, &table, command, args).await
}

async fn run(db: &Database, table: &Table, command: &str, args: &[String]) -> anyhow::Result<()> {
    let values = table.value_ops();

    match command {
        "get" => {
            let key = arg(args, 0, "KEY")?;
            match values.get(key).await? {
                Some(value) => println!("{}", String::from_utf8_lossy(&value)),
                None => println!("(nil)"),
            }
        }
        "set" => {
            let key = arg(args, 0, "KEY")?;
            let value = Bytes::copy_from_slice(arg(args, 1, "VALUE")?.as_bytes());
            match args.get(2) {
                Some(ms) => values.set_with_ttl(key, value, parse_millis(ms)?).await?,
                None => values.set(key, value).await?,
            }
            println!("OK");
        }
        "del" => {
            let key = arg(args, 0, "KEY")?;
            println!("{}", u8::from(values.delete(key).await?));
        }
        "ttl" => {
            let key = arg(args, 0, "KEY")?;
            match values.ttl(key).await? {
                KeyTtl::Missing => println!("(missing)"),
                KeyTtl::Persistent => println!("(persistent)"),
                KeyTtl::Expires(left) => println!("{}", left.as_millis()),
            }
        }
        "keys" => {
            let pattern = args.first().map(String::as_str).unwrap_or("*");
            let mut keys = values.keys(pattern).await?;
            keys.sort();
            for key in keys {
                println!("{key}");
            }
        }
        "expire" => {
            table
                .set_expire(parse_millis(arg(args, 0, "MS")?)?)
                .await?;
            println!("OK");
        }
        "window" => {
            table
                .set_auto_window(parse_millis(arg(args, 0, "MS")?)?)
                .await?;
            println!("OK");
        }
        "policy" => {
            println!("table:   {}", table.table_key());
            println!("expire:  {} ms", table.table_expire().await?);
            println!("window:  {} ms", table.auto_window());
        }
        "drop-table" => {
            println!("{} keys deleted", table.delete().await?);
        }
        "drop-db" => {
            println!("{} keys deleted", db.delete().await?);
        }
        other => bail!("unknown command: {other} (see --help)"),
    }

    Ok(())
}
