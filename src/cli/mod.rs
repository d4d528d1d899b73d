use std::net::SocketAddr;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::catalog::Catalog;
use crate::models::CoercionPolicy;
use crate::server::{self, AppState};

mod args;
mod config;
mod format;
mod http_backend;

pub use args::{Cli, Commands, OutputFormat, QueryArgs, ServeArgs, StatsArgs};

use config::{
    apply_query_config_defaults, apply_serve_config_defaults, apply_stats_config_defaults,
    load_cli_config,
};
use http_backend::HttpChannelBackend;

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_LOG_FILTER: &str = "chanlist=info,tower_http=info";

/// Entry point for the CLI binary.
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let cli_config = load_cli_config()?;

    match cli.command {
        Some(Commands::Serve(mut serve_args)) => {
            if let Some(ref config) = cli_config {
                apply_serve_config_defaults(config, &mut serve_args);
            }

            let addr: SocketAddr = serve_args
                .addr
                .parse()
                .with_context(|| format!("invalid listen address `{}`", serve_args.addr))?;

            // The catalog must load before the listener is bound.
            let data = args::data_path(serve_args.data.as_ref());
            let catalog = Catalog::load(&data)?;

            let policy = if serve_args.strict {
                CoercionPolicy::Strict
            } else {
                CoercionPolicy::Lenient
            };

            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()?;

            runtime.block_on(server::run(addr, AppState::new(catalog, policy)))?;
            Ok(())
        }
        Some(Commands::Query(mut query_args)) => {
            if let Some(ref config) = cli_config {
                apply_query_config_defaults(config, &mut query_args);
            }

            let query = args::channel_query_from_args(&query_args)?;
            let page = if let Some(server_url) =
                effective_server_url(query_args.server.as_deref(), query_args.no_server)
            {
                let backend = HttpChannelBackend::new(server_url)?;
                backend.query(&query)?
            } else {
                let data = args::data_path(query_args.data.as_ref());
                Catalog::load(&data)?.query(&query)
            };

            match query_args.format {
                OutputFormat::Text => format::print_text(&page, &query),
                OutputFormat::Table => format::print_table(&page, &query),
                OutputFormat::Json => {
                    serde_json::to_writer(std::io::stdout(), &page)?;
                    println!();
                    Ok(())
                }
            }
        }
        Some(Commands::Stats(mut stats_args)) => {
            if let Some(ref config) = cli_config {
                apply_stats_config_defaults(config, &mut stats_args);
            }

            if let Some(server_url) =
                effective_server_url(stats_args.server.as_deref(), stats_args.no_server)
            {
                let health = HttpChannelBackend::new(server_url)?.health()?;
                return match stats_args.format {
                    OutputFormat::Json => {
                        serde_json::to_writer(std::io::stdout(), &health)?;
                        println!();
                        Ok(())
                    }
                    OutputFormat::Text | OutputFormat::Table => {
                        println!("status          : {}", health.status);
                        println!("channels        : {}", health.channels);
                        if let Some(loaded_at) = &health.loaded_at {
                            println!("loaded_at       : {loaded_at}");
                        }
                        Ok(())
                    }
                };
            }

            let data = args::data_path(stats_args.data.as_ref());
            let stats = Catalog::load(&data)?.stats();

            match stats_args.format {
                OutputFormat::Json => {
                    serde_json::to_writer(std::io::stdout(), &stats)?;
                    println!();
                    Ok(())
                }
                OutputFormat::Text | OutputFormat::Table => format::print_stats_text(&stats),
            }
        }
        None => {
            let mut cmd = Cli::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

/// Logs go to stderr so JSON output on stdout stays machine-readable.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init();
}

fn effective_server_url(server_flag: Option<&str>, no_server: bool) -> Option<String> {
    if no_server {
        None
    } else {
        server_flag.map(|s| s.to_string())
    }
}
