//! The channel query pipeline.
//!
//! `run_query` narrows the dataset in a fixed order (search, country,
//! views range), optionally sorts the survivors, counts them, and cuts
//! out the requested page. The dataset slice itself is never touched:
//! every stage works on a request-local vector of references.

use std::cmp::Ordering;

use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use crate::models::{Channel, ChannelPage, ChannelQuery, SortDirection, SortField, SortSpec};

/// Execute a query against the dataset.
pub fn run_query(channels: &[Channel], query: &ChannelQuery) -> ChannelPage {
    let mut matched: Vec<&Channel> = channels.iter().collect();

    if !query.search.is_empty() {
        let needle = query.search.to_lowercase();
        matched.retain(|channel| channel.name.to_lowercase().contains(&needle));
    }

    if let Some(countries) = &query.countries {
        matched.retain(|channel| countries.contains(&channel.country));
    }

    if let Some(range) = query.views {
        matched.retain(|channel| range.contains(channel.views));
    }

    if let Some(spec) = query.sort {
        // `sort_by` is stable, so ties keep dataset order.
        matched.sort_by(|a, b| compare_channels(a, b, spec));
    }

    let total = matched.len();
    let (start, end) = page_bounds(query.page, query.limit, total);

    ChannelPage {
        data: matched[start..end].iter().map(|c| (*c).clone()).collect(),
        total,
    }
}

/// Compute the `[start, end)` window for a 1-based page, clipped to
/// `len`.
fn page_bounds(page: usize, limit: usize, len: usize) -> (usize, usize) {
    let start = page.saturating_sub(1).saturating_mul(limit);
    let end = start.saturating_add(limit);
    (start.min(len), end.min(len))
}

fn compare_channels(a: &Channel, b: &Channel, spec: SortSpec) -> Ordering {
    let ordering = match spec.field {
        SortField::Id => a.id.cmp(&b.id),
        SortField::Views => a.views.cmp(&b.views),
        SortField::Followers => a.followers.cmp(&b.followers),
        SortField::Name => locale_cmp(&a.name, &b.name),
        SortField::Country => locale_cmp(&a.country, &b.country),
    };

    match spec.direction {
        SortDirection::Asc => ordering,
        SortDirection::Desc => ordering.reverse(),
    }
}

/// Collation-style string ordering.
///
/// Strings compare by their base letters first, ignoring case and
/// accents, so `Éclair` sorts between `Alpha` and `Zulu`. Remaining ties
/// are broken by accents (unaccented first) and then by case (lower
/// case first).
fn locale_cmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| folded(a).cmp(folded(b)))
        // Byte order puts upper case before lower case, so the last
        // tie-break compares in reverse.
        .then_with(|| b.cmp(a))
}

fn base_letters(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd()
        .filter(|c| !is_combining_mark(*c))
        .flat_map(char::to_lowercase)
}

fn folded(s: &str) -> impl Iterator<Item = char> + '_ {
    s.nfd().flat_map(char::to_lowercase)
}
