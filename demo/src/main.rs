//! RBLOGS — Event Log Demo CLI
//!
//! Exercises every `EventLog` operation against an on-disk `sled` database.
//!
//! Usage:
//!   cargo run -p demo -- --db ./data/events.rblogs.db write --space s --type system_event
//!   cargo run -p demo -- --db ./data/events.rblogs.db query-space --space s
//!   cargo run -p demo -- --db ./data/events.rblogs.db verify
//!   cargo run -p demo -- --db ./data/events.rblogs.db usage

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use rblogs::{Config, Event, EventInput, EventType, Order, Payload, QueryOptions, RblogsResult};
use tracing_subscriber::EnvFilter;

/// RBLOGS — embedded event log demo.
#[derive(Parser)]
#[command(
    name = "demo",
    about = "RBLOGS event log demo",
    long_about = "Exercises an RBLOGS event log: writing events, paging through them by\n\
                  space/type/time, verifying the hash chain, snapshotting and compacting,\n\
                  reporting storage usage, and exporting/importing `.rblogs` archives."
)]
struct Cli {
    /// Path to the sled database directory.
    #[arg(long, default_value = "./data/events.rblogs.db", global = true)]
    db: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Append a new event to a space's hash chain.
    Write {
        #[arg(long)]
        space: String,
        #[arg(long = "type", value_name = "EVENT_TYPE")]
        event_type: String,
        /// RFC 3339 timestamp; defaults to now.
        #[arg(long)]
        timestamp: Option<String>,
        /// JSON object payload.
        #[arg(long, default_value = "{}")]
        payload: String,
    },
    /// Page through one space's events.
    QuerySpace {
        #[arg(long)]
        space: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Page through every event of a given type.
    QueryType {
        #[arg(long = "type", value_name = "EVENT_TYPE")]
        event_type: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Page through every event in a timestamp range.
    QueryTime {
        #[arg(long)]
        from: String,
        #[arg(long)]
        to: String,
        #[command(flatten)]
        page: PageArgs,
    },
    /// Verify one space's (or, if omitted, every space's) hash chain.
    Verify {
        #[arg(long)]
        space: Option<String>,
    },
    /// Checkpoint a space's current reducer state.
    Snapshot {
        #[arg(long)]
        space: String,
    },
    /// Snapshot a space and report the replay events it makes redundant.
    Compact {
        #[arg(long)]
        space: String,
    },
    /// Report event/snapshot counts and estimated bytes used.
    Usage,
    /// Export a space's events before a cutoff date as a `.rblogs` archive.
    Export {
        #[arg(long)]
        space: String,
        #[arg(long)]
        before: String,
        #[arg(long, value_name = "FILE")]
        out: PathBuf,
    },
    /// Import a `.rblogs` archive file.
    Import {
        #[arg(long, value_name = "FILE")]
        file: PathBuf,
    },
}

#[derive(clap::Args)]
struct PageArgs {
    #[arg(long)]
    limit: Option<u32>,
    #[arg(long)]
    cursor: Option<String>,
    #[arg(long, value_enum)]
    order: Option<OrderArg>,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum OrderArg {
    Asc,
    Desc,
}

impl From<PageArgs> for QueryOptions {
    fn from(page: PageArgs) -> Self {
        QueryOptions {
            limit: page.limit,
            cursor: page.cursor,
            order: page.order.map(|o| match o {
                OrderArg::Asc => Order::Asc,
                OrderArg::Desc => Order::Desc,
            }),
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_target(false)
        .compact()
        .init();

    let cli = Cli::parse();
    print_banner();

    let result = run(cli).await;

    match result {
        Ok(()) => {
            println!("Done.");
        }
        Err(e) => {
            eprintln!("Demo error: {e}");
            std::process::exit(1);
        }
    }
}

async fn run(cli: Cli) -> RblogsResult<()> {
    let log = rblogs::EventLog::open(&cli.db, Config::default()).await?;

    match cli.command {
        Command::Write {
            space,
            event_type,
            timestamp,
            payload,
        } => {
            let event_type = parse_event_type(&event_type)?;
            let timestamp = timestamp.unwrap_or_else(|| chrono::Utc::now().to_rfc3339());
            let payload = parse_payload(&payload)?;
            let event = log
                .write_event(EventInput {
                    event_type,
                    space_id: space,
                    timestamp,
                    version: 1,
                    payload,
                })
                .await?;
            print_event(&event);
        }
        Command::QuerySpace { space, page } => {
            let result = log.query_by_space(&space, page.into()).await?;
            print_json(&result);
        }
        Command::QueryType { event_type, page } => {
            let event_type = parse_event_type(&event_type)?;
            let result = log.query_by_type(event_type, page.into()).await?;
            print_json(&result);
        }
        Command::QueryTime { from, to, page } => {
            let result = log.query_by_time(&from, &to, page.into()).await?;
            print_json(&result);
        }
        Command::Verify { space } => {
            let report = log.verify_integrity(space.as_deref()).await?;
            print_json(&report);
        }
        Command::Snapshot { space } => {
            let snapshot = log.create_snapshot(&space).await?;
            print_json(&snapshot);
        }
        Command::Compact { space } => {
            let report = log.compact(&space).await?;
            print_json(&report);
        }
        Command::Usage => {
            let report = log.get_storage_usage().await?;
            print_json(&report);
        }
        Command::Export { space, before, out } => {
            let bytes = log.export_archive(&space, &before).await?;
            let len = bytes.len();
            std::fs::write(&out, bytes).map_err(|e| rblogs::RblogsError::DatabaseError {
                operation: "export".to_string(),
                reason: format!("failed to write '{}': {e}", out.display()),
            })?;
            println!("Wrote {len} bytes to {}", out.display());
        }
        Command::Import { file } => {
            let bytes = std::fs::read(&file).map_err(|e| rblogs::RblogsError::DatabaseError {
                operation: "import".to_string(),
                reason: format!("failed to read '{}': {e}", file.display()),
            })?;
            let report = log.import_archive(&bytes).await?;
            print_json(&report);
        }
    }

    Ok(())
}

fn parse_event_type(raw: &str) -> RblogsResult<EventType> {
    EventType::ALL
        .into_iter()
        .find(|ty| ty.as_str() == raw)
        .ok_or_else(|| rblogs::RblogsError::InvalidEvent {
            field: "type".to_string(),
            reason: format!("unknown event type '{raw}'"),
        })
}

fn parse_payload(raw: &str) -> RblogsResult<Payload> {
    let value: serde_json::Value = serde_json::from_str(raw).map_err(|e| rblogs::RblogsError::InvalidEvent {
        field: "payload".to_string(),
        reason: format!("not valid JSON: {e}"),
    })?;
    match value {
        serde_json::Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(rblogs::RblogsError::InvalidEvent {
            field: "payload".to_string(),
            reason: "payload must be a JSON object".to_string(),
        }),
    }
}

fn print_event(event: &Event) {
    print_json(event);
}

fn print_json<T: serde::Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("failed to serialize output: {e}"),
    }
}

fn print_banner() {
    println!();
    println!("RBLOGS — Embedded Event Log");
    println!("============================");
    println!();
    println!("Append-only events, hash-chained per space, queryable by space,");
    println!("type, or time range, with snapshot-based state reconstruction");
    println!("and binary `.rblogs` archival.");
    println!();
}
