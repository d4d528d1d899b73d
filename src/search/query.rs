//! Parsing of untrusted request bodies into `ChannelQuery`.
//!
//! Every field of the `/api/channels` body is optional. Absent fields
//! take their documented defaults. Present fields with an unexpected
//! type are handled according to the `CoercionPolicy`:
//! - `Lenient` falls back to the default, or disables the stage the
//!   field controls (`viewsFrom`/`viewsTo` switch off the range filter).
//! - `Strict` rejects the request with `QueryError::InvalidParameter`.
//!
//! A few loose encodings are accepted under both policies: numeric
//! strings for `page`/`limit`, integral floats, and a bare string for
//! `channelCountry`.

use std::collections::BTreeSet;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::{
    ChannelQuery, CoercionPolicy, SortDirection, SortField, SortSpec, ViewsRange, DEFAULT_LIMIT,
    DEFAULT_PAGE, DEFAULT_VIEWS_FROM, DEFAULT_VIEWS_TO,
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("request body must be a JSON object")]
    NotAnObject,
    #[error("invalid parameter `{field}`: {reason}")]
    InvalidParameter { field: &'static str, reason: String },
}

/// Parse a JSON request body into a typed query.
///
/// `Value::Null` (an empty body) is treated like `{}`.
pub fn parse_channel_query(
    body: &Value,
    policy: CoercionPolicy,
) -> Result<ChannelQuery, QueryError> {
    let empty = Map::new();
    let object = match body {
        Value::Object(object) => object,
        Value::Null => &empty,
        _ => match policy {
            CoercionPolicy::Lenient => &empty,
            CoercionPolicy::Strict => return Err(QueryError::NotAnObject),
        },
    };

    let reader = FieldReader { object, policy };

    let from = reader.views_bound("viewsFrom", DEFAULT_VIEWS_FROM, f64::ceil)?;
    let to = reader.views_bound("viewsTo", DEFAULT_VIEWS_TO, f64::floor)?;

    Ok(ChannelQuery {
        search: reader.search()?,
        page: reader.positive_integer("page", DEFAULT_PAGE)?,
        limit: reader.positive_integer("limit", DEFAULT_LIMIT)?,
        views: from.zip(to).map(|(from, to)| ViewsRange { from, to }),
        countries: reader.countries()?,
        sort: reader.sort()?,
    })
}

struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    policy: CoercionPolicy,
}

impl FieldReader<'_> {
    /// Return `fallback` under the lenient policy, an error otherwise.
    fn reject<T>(
        &self,
        field: &'static str,
        reason: impl Into<String>,
        fallback: T,
    ) -> Result<T, QueryError> {
        match self.policy {
            CoercionPolicy::Lenient => Ok(fallback),
            CoercionPolicy::Strict => Err(QueryError::InvalidParameter {
                field,
                reason: reason.into(),
            }),
        }
    }

    fn search(&self) -> Result<String, QueryError> {
        match self.object.get("search") {
            None => Ok(String::new()),
            Some(Value::String(s)) => Ok(s.clone()),
            Some(other) => self.reject(
                "search",
                format!("expected a string, got {}", type_name(other)),
                String::new(),
            ),
        }
    }

    fn positive_integer(&self, field: &'static str, default: usize) -> Result<usize, QueryError> {
        let Some(value) = self.object.get(field) else {
            return Ok(default);
        };

        let parsed = match value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0)
                    .map(|f| f as u64)
            }),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };

        match parsed {
            Some(n) if n > 0 => Ok(usize::try_from(n).unwrap_or(usize::MAX)),
            _ => self.reject(field, "expected a positive integer", default),
        }
    }

    /// Read one bound of the views range. `None` means the range filter
    /// is disabled for this request.
    fn views_bound(
        &self,
        field: &'static str,
        default: i64,
        round: fn(f64) -> f64,
    ) -> Result<Option<i64>, QueryError> {
        match self.object.get(field) {
            None => Ok(Some(default)),
            Some(Value::Number(n)) => {
                let bound = n
                    .as_i64()
                    .or_else(|| n.as_u64().map(|_| i64::MAX))
                    .unwrap_or_else(|| round(n.as_f64().unwrap_or_default()) as i64);
                Ok(Some(bound))
            }
            Some(other) => self.reject(
                field,
                format!("expected a number, got {}", type_name(other)),
                None,
            ),
        }
    }

    /// `None` leaves the country stage off. A non-empty list always
    /// yields `Some`, even when none of its entries are strings, so the
    /// filter stays active and matches nothing.
    fn countries(&self) -> Result<Option<BTreeSet<String>>, QueryError> {
        match self.object.get("channelCountry") {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(std::iter::once(s.clone()).collect())),
            Some(Value::Array(items)) if items.is_empty() => Ok(None),
            Some(Value::Array(items)) => {
                let mut countries = BTreeSet::new();
                for item in items {
                    match item {
                        Value::String(s) => {
                            countries.insert(s.clone());
                        }
                        other => {
                            self.reject(
                                "channelCountry",
                                format!("expected string entries, got {}", type_name(other)),
                                (),
                            )?;
                        }
                    }
                }
                Ok(Some(countries))
            }
            Some(other) => self.reject(
                "channelCountry",
                format!("expected an array of strings, got {}", type_name(other)),
                None,
            ),
        }
    }

    /// Only the first key of the `sort` object is honored. Unknown
    /// field names disable sorting under both policies.
    fn sort(&self) -> Result<Option<SortSpec>, QueryError> {
        let spec = match self.object.get("sort") {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(spec)) => spec,
            Some(other) => {
                return self.reject(
                    "sort",
                    format!("expected an object, got {}", type_name(other)),
                    None,
                )
            }
        };

        let Some((name, order)) = spec.iter().next() else {
            return Ok(None);
        };

        let direction = match order.as_f64() {
            Some(v) if v == -1.0 => SortDirection::Desc,
            Some(v) if v == 1.0 => SortDirection::Asc,
            _ => self.reject("sort", "direction must be 1 or -1", SortDirection::Asc)?,
        };

        Ok(SortField::parse(name).map(|field| SortSpec { field, direction }))
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Channel;
    use crate::search::engine::run_query;
    use serde_json::json;

    fn lenient(body: Value) -> ChannelQuery {
        parse_channel_query(&body, CoercionPolicy::Lenient).expect("lenient parse")
    }

    fn strict_err(body: Value) -> QueryError {
        parse_channel_query(&body, CoercionPolicy::Strict).expect_err("strict rejection")
    }

    #[test]
    fn empty_body_yields_defaults() {
        assert_eq!(lenient(json!({})), ChannelQuery::default());
        assert_eq!(lenient(Value::Null), ChannelQuery::default());
    }

    #[test]
    fn parses_full_request() {
        let query = lenient(json!({
            "search": "Alpha",
            "page": 3,
            "limit": 10,
            "viewsFrom": 100,
            "viewsTo": 5000,
            "channelCountry": ["US", "FR"],
            "sort": { "views": -1 }
        }));

        assert_eq!(query.search, "Alpha");
        assert_eq!(query.page, 3);
        assert_eq!(query.limit, 10);
        assert_eq!(query.views, Some(ViewsRange { from: 100, to: 5000 }));
        assert_eq!(
            query
                .countries
                .iter()
                .flatten()
                .map(String::as_str)
                .collect::<Vec<_>>(),
            vec!["FR", "US"]
        );
        assert_eq!(
            query.sort,
            Some(SortSpec {
                field: SortField::Views,
                direction: SortDirection::Desc,
            })
        );
    }

    #[test]
    fn non_numeric_views_bound_disables_range() {
        let query = lenient(json!({ "viewsFrom": "100" }));
        assert_eq!(query.views, None);

        let query = lenient(json!({ "viewsTo": null }));
        assert_eq!(query.views, None);
    }

    #[test]
    fn fractional_views_bounds_round_inwards() {
        let query = lenient(json!({ "viewsFrom": 9.5, "viewsTo": 20.5 }));
        assert_eq!(query.views, Some(ViewsRange { from: 10, to: 20 }));
    }

    #[test]
    fn page_and_limit_accept_numeric_strings_and_integral_floats() {
        let query = lenient(json!({ "page": "2", "limit": 4.0 }));
        assert_eq!(query.page, 2);
        assert_eq!(query.limit, 4);
    }

    #[test]
    fn non_positive_page_and_limit_fall_back_to_defaults() {
        let query = lenient(json!({ "page": 0, "limit": -3 }));
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);

        let query = lenient(json!({ "page": 1.5, "limit": "lots" }));
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);
    }

    #[test]
    fn oversized_limit_on_later_page_yields_empty_window() {
        let query = lenient(json!({ "page": 2, "limit": 18446744073709551615u64 }));
        assert_eq!(query.page, 2);
        assert_eq!(query.limit, usize::MAX);

        let channels: Vec<Channel> = (1..=5)
            .map(|i| {
                serde_json::from_value(json!({
                    "id": i, "name": format!("c{i}"), "views": i, "followers": i, "country": "US"
                }))
                .expect("channel")
            })
            .collect();
        let page = run_query(&channels, &query);
        assert!(page.data.is_empty());
        assert_eq!(page.total, 5);
    }

    #[test]
    fn wrong_search_type_falls_back_to_empty() {
        assert_eq!(lenient(json!({ "search": 42 })).search, "");
    }

    #[test]
    fn country_accepts_single_string_and_skips_non_strings() {
        let query = lenient(json!({ "channelCountry": "US" }));
        assert_eq!(query.countries, Some(BTreeSet::from(["US".to_string()])));

        let query = lenient(json!({ "channelCountry": ["US", 3, null] }));
        assert_eq!(query.countries, Some(BTreeSet::from(["US".to_string()])));

        let query = lenient(json!({ "channelCountry": { "US": true } }));
        assert_eq!(query.countries, None);

        let query = lenient(json!({ "channelCountry": [] }));
        assert_eq!(query.countries, None);
    }

    #[test]
    fn country_list_without_strings_keeps_filter_active() {
        let query = lenient(json!({ "channelCountry": [3] }));
        assert_eq!(query.countries, Some(BTreeSet::new()));

        let channels: Vec<Channel> = serde_json::from_value(json!([
            { "id": 1, "name": "a", "views": 1, "followers": 1, "country": "US" },
            { "id": 2, "name": "b", "views": 1, "followers": 1, "country": "FR" }
        ]))
        .expect("channels");
        assert_eq!(run_query(&channels, &query).total, 0);
    }

    #[test]
    fn sort_honors_first_key_only() {
        let query = lenient(json!({ "sort": { "views": -1, "name": 1 } }));
        assert_eq!(
            query.sort,
            Some(SortSpec {
                field: SortField::Views,
                direction: SortDirection::Desc,
            })
        );
    }

    #[test]
    fn sort_with_unknown_field_or_empty_object_is_skipped() {
        assert_eq!(lenient(json!({ "sort": { "rating": -1 } })).sort, None);
        assert_eq!(lenient(json!({ "sort": {} })).sort, None);
        assert_eq!(
            parse_channel_query(&json!({ "sort": { "rating": 1 } }), CoercionPolicy::Strict)
                .expect("unknown sort field is not an error")
                .sort,
            None
        );
    }

    #[test]
    fn lenient_sort_direction_defaults_to_ascending() {
        let query = lenient(json!({ "sort": { "followers": "desc" } }));
        assert_eq!(query.sort.map(|s| s.direction), Some(SortDirection::Asc));
    }

    #[test]
    fn lenient_accepts_non_object_body() {
        assert_eq!(lenient(json!([1, 2, 3])), ChannelQuery::default());
    }

    #[test]
    fn strict_rejects_uncoercible_fields() {
        assert_eq!(strict_err(json!("nope")), QueryError::NotAnObject);
        assert!(matches!(
            strict_err(json!({ "viewsFrom": "ten" })),
            QueryError::InvalidParameter { field: "viewsFrom", .. }
        ));
        assert!(matches!(
            strict_err(json!({ "limit": 0 })),
            QueryError::InvalidParameter { field: "limit", .. }
        ));
        assert!(matches!(
            strict_err(json!({ "channelCountry": ["US", 1] })),
            QueryError::InvalidParameter { field: "channelCountry", .. }
        ));
        assert!(matches!(
            strict_err(json!({ "sort": { "views": 2 } })),
            QueryError::InvalidParameter { field: "sort", .. }
        ));
    }

    #[test]
    fn strict_still_defaults_absent_fields() {
        let query =
            parse_channel_query(&json!({ "search": "x" }), CoercionPolicy::Strict).expect("query");
        assert_eq!(query.page, DEFAULT_PAGE);
        assert_eq!(query.limit, DEFAULT_LIMIT);
        assert_eq!(query.views, Some(ViewsRange::default()));
    }
}
