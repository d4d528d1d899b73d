//! Loading and holding the channel dataset.
//!
//! A `Catalog` is built once at startup from a JSON array of channel
//! records and then shared read-only (usually behind an `Arc`) by every
//! request.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::models::{CatalogStats, Channel, ChannelPage, ChannelQuery};
use crate::search::engine;

/// Dataset file used when neither a flag nor the config names one.
pub const DEFAULT_DATA_PATH: &str = "index.json";

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("failed to read catalog file at {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse catalog file at {}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug)]
pub struct Catalog {
    channels: Vec<Channel>,
    source: Option<PathBuf>,
    loaded_at: OffsetDateTime,
}

impl Catalog {
    /// Read and parse the dataset file.
    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let contents = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let channels: Vec<Channel> =
            serde_json::from_str(&contents).map_err(|source| CatalogError::Parse {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::info!(
            path = %path.display(),
            channels = channels.len(),
            "loaded channel catalog"
        );

        let mut catalog = Self::from_channels(channels);
        catalog.source = Some(path.to_path_buf());
        Ok(catalog)
    }

    /// Build a catalog from records already in memory.
    pub fn from_channels(channels: Vec<Channel>) -> Self {
        let mut seen = HashSet::with_capacity(channels.len());
        for channel in &channels {
            if !seen.insert(channel.id) {
                tracing::warn!(id = channel.id, "duplicate channel id in catalog");
            }
        }

        Self {
            channels,
            source: None,
            loaded_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Load time as an RFC3339 timestamp.
    pub fn loaded_at(&self) -> Option<String> {
        self.loaded_at.format(&Rfc3339).ok()
    }

    pub fn query(&self, query: &ChannelQuery) -> ChannelPage {
        engine::run_query(&self.channels, query)
    }

    pub fn stats(&self) -> CatalogStats {
        let mut countries = BTreeMap::new();
        for channel in &self.channels {
            *countries.entry(channel.country.clone()).or_insert(0) += 1;
        }

        CatalogStats {
            channels: self.channels.len(),
            countries,
            views_min: self.channels.iter().map(|c| c.views).min(),
            views_max: self.channels.iter().map(|c| c.views).max(),
            followers_total: self
                .channels
                .iter()
                .fold(0u64, |acc, c| acc.saturating_add(c.followers)),
        }
    }
}
