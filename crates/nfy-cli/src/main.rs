mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use nfy_config::UnusedKeyPolicy;
use nfy_event::{Severity, Type};

use crate::commands::send::{self, SendRequest};

#[derive(Parser)]
#[command(name = "nfy")]
#[command(about = "Notification source CLI", long_about = None)]
struct Cli {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit one event and reconcile the rule version until it is accepted
    Send {
        /// Layered config paths in merge order
        #[arg(long = "config", required = true)]
        config_paths: Vec<String>,

        /// Object name (e.g. "web-01!http")
        #[arg(long)]
        name: String,

        /// Event type token (e.g. state, acknowledgement-set)
        #[arg(long = "type")]
        kind: Type,

        /// Severity token (ok .. emerg); omitted when not given
        #[arg(long)]
        severity: Option<Severity>,

        #[arg(long, default_value = "")]
        url: String,

        /// Object tag as KEY=VALUE; repeatable
        #[arg(long = "tag")]
        tags: Vec<String>,

        #[arg(long, default_value = "")]
        username: String,

        #[arg(long, default_value = "")]
        message: String,

        /// Explicit mute state (true | false)
        #[arg(long)]
        mute: Option<bool>,

        #[arg(long, default_value = "")]
        mute_reason: String,

        /// Also record the delivered event in Postgres (NFY_DATABASE_URL)
        #[arg(long, default_value_t = false)]
        record: bool,
    },

    /// Compute layered config hash + print canonical JSON
    ConfigHash {
        /// Paths in merge order (base -> env -> host ...)
        #[arg(required = true)]
        paths: Vec<String>,

        /// Fail when the merged config has keys nothing reads
        #[arg(long, default_value_t = false)]
        fail_unused: bool,
    },

    /// Database commands
    Db {
        #[command(subcommand)]
        cmd: DbCmd,
    },
}

#[derive(Subcommand)]
enum DbCmd {
    Status,

    /// Apply SQL migrations
    Migrate,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    init_tracing();

    let cli = Cli::parse();

    match cli.cmd {
        Commands::Send {
            config_paths,
            name,
            kind,
            severity,
            url,
            tags,
            username,
            message,
            mute,
            mute_reason,
            record,
        } => {
            let req = SendRequest {
                name,
                kind,
                severity: severity.unwrap_or_default(),
                url,
                tags,
                username,
                message,
                mute,
                mute_reason,
            };
            send::run(&config_paths, req, record).await?;
        }

        Commands::ConfigHash { paths, fail_unused } => {
            let path_refs: Vec<&str> = paths.iter().map(|s| s.as_str()).collect();
            let loaded = nfy_config::load_layered_yaml(&path_refs)?;

            let policy = if fail_unused {
                UnusedKeyPolicy::Fail
            } else {
                UnusedKeyPolicy::Warn
            };
            let report = nfy_config::report_unused_keys(&loaded.config_json, policy)?;
            for ptr in &report.unused_leaf_pointers {
                tracing::warn!(pointer = %ptr, "unused config key");
            }

            println!("config_hash={}", loaded.config_hash);
            println!("{}", loaded.canonical_json);
        }

        Commands::Db { cmd } => {
            let pool = nfy_db::connect_from_env().await?;
            match cmd {
                DbCmd::Status => {
                    let s = nfy_db::status(&pool).await?;
                    println!(
                        "db_ok={} has_source_events_table={}",
                        s.ok, s.has_source_events_table
                    );
                }
                DbCmd::Migrate => {
                    nfy_db::migrate(&pool).await?;
                    println!("migrations_applied=true");
                }
            }
        }
    }

    Ok(())
}

fn init_tracing() {
    // Logs go to stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();
}
