//! Shared data models for channel records, queries, and results.
//!
//! These types form the JSON API surface used by the HTTP server and
//! the CLI's remote mode. Wire names follow the camelCase convention of
//! the `/api/channels` request body.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Page number used when the request does not supply a usable one.
pub const DEFAULT_PAGE: usize = 1;

/// Page size used when the request does not supply a usable one.
pub const DEFAULT_LIMIT: usize = 16;

/// Lower views bound used when `viewsFrom` is absent.
pub const DEFAULT_VIEWS_FROM: i64 = 0;

/// Upper views bound used when `viewsTo` is absent.
pub const DEFAULT_VIEWS_TO: i64 = 1_000_000;

/// A single catalog entry.
///
/// Attributes beyond the five known fields are kept in `extra` so they
/// are echoed back to clients unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: i64,
    pub name: String,
    pub views: u64,
    pub followers: u64,
    pub country: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Field a query can be ordered by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Id,
    Name,
    Views,
    Followers,
    Country,
}

impl SortField {
    /// Resolve a wire field name. Unknown names yield `None`.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "id" => Some(SortField::Id),
            "name" => Some(SortField::Name),
            "views" => Some(SortField::Views),
            "followers" => Some(SortField::Followers),
            "country" => Some(SortField::Country),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SortField::Id => "id",
            SortField::Name => "name",
            SortField::Views => "views",
            SortField::Followers => "followers",
            SortField::Country => "country",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Wire encoding: `1` for ascending, `-1` for descending.
    pub fn as_wire(self) -> i64 {
        match self {
            SortDirection::Asc => 1,
            SortDirection::Desc => -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: SortField,
    pub direction: SortDirection,
}

/// Inclusive bounds on a channel's view count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewsRange {
    pub from: i64,
    pub to: i64,
}

impl Default for ViewsRange {
    fn default() -> Self {
        Self {
            from: DEFAULT_VIEWS_FROM,
            to: DEFAULT_VIEWS_TO,
        }
    }
}

impl ViewsRange {
    pub fn contains(&self, views: u64) -> bool {
        let views = i128::from(views);
        i128::from(self.from) <= views && views <= i128::from(self.to)
    }
}

/// How request fields that cannot be coerced to their expected type
/// are handled.
///
/// `Lenient` substitutes the field's default (or disables the stage it
/// controls); `Strict` rejects the request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CoercionPolicy {
    #[default]
    Lenient,
    Strict,
}

/// Strongly typed query parameters for a single catalog request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelQuery {
    /// Case-insensitive substring matched against channel names. Empty
    /// disables the search stage.
    pub search: String,
    /// 1-based page number.
    pub page: usize,
    /// Page size.
    pub limit: usize,
    /// `None` disables the views-range stage.
    pub views: Option<ViewsRange>,
    /// Allowed country values. `None` disables the country stage; an
    /// empty set matches nothing.
    pub countries: Option<BTreeSet<String>>,
    pub sort: Option<SortSpec>,
}

impl Default for ChannelQuery {
    fn default() -> Self {
        Self {
            search: String::new(),
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
            views: Some(ViewsRange::default()),
            countries: None,
            sort: None,
        }
    }
}

impl ChannelQuery {
    /// Encode the query as a `POST /api/channels` request body.
    pub fn to_request_body(&self) -> Value {
        let mut body = json!({
            "search": self.search,
            "page": self.page,
            "limit": self.limit,
        });

        if let Some(countries) = &self.countries {
            body["channelCountry"] = json!(countries);
        }

        if let Some(range) = self.views {
            body["viewsFrom"] = json!(range.from);
            body["viewsTo"] = json!(range.to);
        }

        if let Some(sort) = self.sort {
            let mut spec = Map::new();
            spec.insert(sort.field.as_str().to_string(), json!(sort.direction.as_wire()));
            body["sort"] = Value::Object(spec);
        }

        body
    }
}

/// One page of query results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelPage {
    pub data: Vec<Channel>,
    /// Number of channels that passed the filters, before pagination.
    pub total: usize,
}

/// Summary of a loaded catalog, used by `chanlist stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogStats {
    pub channels: usize,
    pub countries: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views_min: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub views_max: Option<u64>,
    pub followers_total: u64,
}

/// Health-check response payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub channels: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loaded_at: Option<String>,
}
