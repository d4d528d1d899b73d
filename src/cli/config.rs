use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::cli::args::OutputFormat;
use crate::cli::{QueryArgs, ServeArgs, StatsArgs};

/// Address `serve` binds to when neither flag nor config override it.
pub const DEFAULT_SERVE_ADDR: &str = "0.0.0.0:9999";

/// Top-level representation of `.chanlist/config.toml`.
#[derive(Debug, Default, Deserialize)]
pub struct CliConfig {
    #[serde(default)]
    pub serve: Option<ServeSection>,

    #[serde(default)]
    pub query: Option<QuerySection>,

    #[serde(default)]
    pub http: Option<HttpSection>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ServeSection {
    #[serde(default)]
    pub addr: Option<String>,
    #[serde(default)]
    pub data: Option<PathBuf>,
    #[serde(default)]
    pub strict: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct QuerySection {
    #[serde(default)]
    pub data: Option<PathBuf>,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default)]
    pub format: Option<OutputFormat>,
    #[serde(default)]
    pub server: Option<String>,
    #[serde(default)]
    pub no_server: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct HttpSection {
    #[serde(default)]
    pub server_url: Option<String>,
}

/// Discover and load a project-local `.chanlist/config.toml` (or
/// `.chanlist/chanlist.toml`) starting from the current working
/// directory and walking up parent directories.
pub fn load_cli_config() -> Result<Option<CliConfig>> {
    let cwd = std::env::current_dir().context("failed to read current directory")?;
    let Some(path) = find_project_config(&cwd) else {
        return Ok(None);
    };

    let contents = fs::read_to_string(&path)
        .with_context(|| format!("failed to read config file at {}", path.display()))?;
    let config: CliConfig = toml::from_str(&contents)
        .with_context(|| format!("failed to parse TOML config at {}", path.display()))?;

    tracing::debug!(path = %path.display(), "loaded project config");
    Ok(Some(config))
}

fn find_project_config(start: &Path) -> Option<PathBuf> {
    let mut dir = Some(start);

    while let Some(current) = dir {
        let chanlist_dir = current.join(".chanlist");
        let config_toml = chanlist_dir.join("config.toml");
        if config_toml.is_file() {
            return Some(config_toml);
        }

        let chanlist_toml = chanlist_dir.join("chanlist.toml");
        if chanlist_toml.is_file() {
            return Some(chanlist_toml);
        }

        dir = current.parent();
    }

    None
}

pub fn apply_serve_config_defaults(config: &CliConfig, args: &mut ServeArgs) {
    if let Some(serve) = &config.serve {
        if args.addr == DEFAULT_SERVE_ADDR {
            if let Some(addr) = &serve.addr {
                args.addr = addr.clone();
            }
        }

        if args.data.is_none() {
            if let Some(data) = &serve.data {
                args.data = Some(data.clone());
            }
        }

        if !args.strict {
            if let Some(true) = serve.strict {
                args.strict = true;
            }
        }
    }
}

pub fn apply_query_config_defaults(config: &CliConfig, args: &mut QueryArgs) {
    if let Some(query) = &config.query {
        if args.data.is_none() {
            if let Some(data) = &query.data {
                args.data = Some(data.clone());
            }
        }

        if args.limit.is_none() {
            if let Some(limit) = query.limit {
                args.limit = Some(limit);
            }
        }

        if matches!(args.format, OutputFormat::Text) {
            if let Some(format) = query.format {
                args.format = format;
            }
        }

        if args.server.is_none() {
            if let Some(server) = &query.server {
                args.server = Some(server.clone());
            }
        }

        if !args.no_server {
            if let Some(true) = query.no_server {
                args.no_server = true;
            }
        }
    }

    // Fall back to a global HTTP server URL when no query-level server
    // is configured.
    if args.server.is_none() {
        if let Some(url) = config.http.as_ref().and_then(|h| h.server_url.as_ref()) {
            args.server = Some(url.clone());
        }
    }
}

/// `stats` shares the catalog path and server configured for queries.
pub fn apply_stats_config_defaults(config: &CliConfig, args: &mut StatsArgs) {
    if let Some(query) = &config.query {
        if args.data.is_none() {
            if let Some(data) = &query.data {
                args.data = Some(data.clone());
            }
        }

        if args.server.is_none() {
            if let Some(server) = &query.server {
                args.server = Some(server.clone());
            }
        }

        if !args.no_server {
            if let Some(true) = query.no_server {
                args.no_server = true;
            }
        }
    }

    if args.server.is_none() {
        if let Some(url) = config.http.as_ref().and_then(|h| h.server_url.as_ref()) {
            args.server = Some(url.clone());
        }
    }
}
