use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;

use super::config::DEFAULT_SERVE_ADDR;
use crate::catalog::DEFAULT_DATA_PATH;
use crate::models::{
    ChannelQuery, SortDirection, SortField, SortSpec, ViewsRange, DEFAULT_LIMIT, DEFAULT_PAGE,
    DEFAULT_VIEWS_FROM, DEFAULT_VIEWS_TO,
};

/// Top-level CLI entrypoint for `chanlist`.
#[derive(Parser, Debug)]
#[command(
    name = "chanlist",
    about = "Channel catalog query server and CLI",
    author = "chanlist developers",
    subcommand_required = false,
    arg_required_else_help = false
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP+JSON catalog server.
    Serve(ServeArgs),
    /// Query the catalog (locally or through a running server).
    Query(QueryArgs),
    /// Summarize the catalog file.
    Stats(StatsArgs),
}

/// Arguments specific to the `serve` subcommand.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind the HTTP server to.
    #[arg(long = "addr", default_value = DEFAULT_SERVE_ADDR)]
    pub addr: String,

    /// Path to the JSON catalog file (defaults to `index.json`).
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Reject request fields that cannot be coerced instead of falling
    /// back to their defaults.
    #[arg(long = "strict")]
    pub strict: bool,
}

/// Arguments specific to the `query` subcommand.
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// Path to the JSON catalog file for local queries.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Case-insensitive substring matched against channel names.
    #[arg(short = 's', long = "search")]
    pub search: Option<String>,

    /// 1-based page number.
    #[arg(long = "page")]
    pub page: Option<usize>,

    /// Page size.
    #[arg(long = "limit")]
    pub limit: Option<usize>,

    /// Inclusive lower bound on views.
    #[arg(long = "views-from", allow_hyphen_values = true)]
    pub views_from: Option<i64>,

    /// Inclusive upper bound on views.
    #[arg(long = "views-to", allow_hyphen_values = true)]
    pub views_to: Option<i64>,

    /// Allowed countries. Multiple values can be combined via commas or
    /// repeated flags, e.g. `--country US,FR` or `--country US --country FR`.
    #[arg(short = 'c', long = "country", value_delimiter = ',')]
    pub countries: Vec<String>,

    /// Field to sort by.
    #[arg(long = "sort", value_enum)]
    pub sort: Option<SortFieldArg>,

    /// Sort direction, used together with `--sort`.
    #[arg(long = "order", value_enum, default_value_t = SortOrderArg::Asc)]
    pub order: SortOrderArg,

    /// Output format (text, table, or json).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Optional server URL for delegating the query to a daemon.
    ///
    /// When set (either via this flag or the `CHANLIST_SERVER_URL`
    /// environment variable), the query is sent to the HTTP server
    /// instead of loading the catalog file. Use `--no-server` to force
    /// local execution.
    #[arg(long = "server", env = "CHANLIST_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and force a local query.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

/// Arguments specific to the `stats` subcommand.
#[derive(Args, Debug)]
pub struct StatsArgs {
    /// Path to the JSON catalog file.
    #[arg(long = "data")]
    pub data: Option<PathBuf>,

    /// Output format (text or json; table is treated as text).
    #[arg(long = "format", value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Ask a running server for its health summary instead of reading
    /// the catalog file.
    #[arg(long = "server", env = "CHANLIST_SERVER_URL")]
    pub server: Option<String>,

    /// Disable use of any configured server and read the file locally.
    #[arg(long = "no-server")]
    pub no_server: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortFieldArg {
    Id,
    Name,
    Views,
    Followers,
    Country,
}

impl SortFieldArg {
    pub fn to_model(self) -> SortField {
        match self {
            SortFieldArg::Id => SortField::Id,
            SortFieldArg::Name => SortField::Name,
            SortFieldArg::Views => SortField::Views,
            SortFieldArg::Followers => SortField::Followers,
            SortFieldArg::Country => SortField::Country,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrderArg {
    Asc,
    Desc,
}

impl SortOrderArg {
    pub fn to_model(self) -> SortDirection {
        match self {
            SortOrderArg::Asc => SortDirection::Asc,
            SortOrderArg::Desc => SortDirection::Desc,
        }
    }
}

/// CLI representation of output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Text,
    Table,
    Json,
}

/// Resolve the catalog path, falling back to `index.json`.
pub fn data_path(data: Option<&PathBuf>) -> PathBuf {
    data.cloned().unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_PATH))
}

/// Build a core `ChannelQuery` from CLI `QueryArgs`.
pub fn channel_query_from_args(args: &QueryArgs) -> Result<ChannelQuery> {
    let page = args.page.unwrap_or(DEFAULT_PAGE);
    if page == 0 {
        bail!("--page must be a positive integer");
    }

    let limit = args.limit.unwrap_or(DEFAULT_LIMIT);
    if limit == 0 {
        bail!("--limit must be a positive integer");
    }

    let views = ViewsRange {
        from: args.views_from.unwrap_or(DEFAULT_VIEWS_FROM),
        to: args.views_to.unwrap_or(DEFAULT_VIEWS_TO),
    };

    let sort = args.sort.map(|field| SortSpec {
        field: field.to_model(),
        direction: args.order.to_model(),
    });

    let countries: BTreeSet<String> = args
        .countries
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect();

    Ok(ChannelQuery {
        search: args.search.clone().unwrap_or_default(),
        page,
        limit,
        views: Some(views),
        countries: (!countries.is_empty()).then_some(countries),
        sort,
    })
}
