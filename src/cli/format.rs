use std::cmp;

use anyhow::Result;

use crate::models::{CatalogStats, ChannelPage, ChannelQuery};

/// Render a `ChannelPage` in human-readable text form.
///
/// Each channel is rendered as
/// `#id name [country] views=N followers=N`, followed by a footer with
/// the page position and the filtered total.
pub fn print_text(page: &ChannelPage, query: &ChannelQuery) -> Result<()> {
    for channel in &page.data {
        println!(
            "#{} {} [{}] views={} followers={}",
            channel.id, channel.name, channel.country, channel.views, channel.followers
        );
    }

    println!("{}", page_footer(page, query));
    Ok(())
}

/// Render a `ChannelPage` as a simple table.
///
/// Columns: ID, NAME, COUNTRY, VIEWS, FOLLOWERS.
pub fn print_table(page: &ChannelPage, query: &ChannelQuery) -> Result<()> {
    if page.data.is_empty() {
        println!("{}", page_footer(page, query));
        return Ok(());
    }

    const MAX_NAME_WIDTH: usize = 40;
    const MAX_COUNTRY_WIDTH: usize = 20;

    let id_header = "ID";
    let name_header = "NAME";
    let country_header = "COUNTRY";
    let views_header = "VIEWS";
    let followers_header = "FOLLOWERS";

    let rows = &page.data;
    let max_id_len = rows.iter().map(|c| c.id.to_string().len()).max().unwrap_or(0);
    let max_name_len = rows.iter().map(|c| c.name.chars().count()).max().unwrap_or(0);
    let max_country_len = rows
        .iter()
        .map(|c| c.country.chars().count())
        .max()
        .unwrap_or(0);
    let max_views_len = rows
        .iter()
        .map(|c| c.views.to_string().len())
        .max()
        .unwrap_or(0);
    let max_followers_len = rows
        .iter()
        .map(|c| c.followers.to_string().len())
        .max()
        .unwrap_or(0);

    let id_width = cmp::max(id_header.len(), max_id_len);
    let name_width = cmp::min(cmp::max(name_header.len(), max_name_len), MAX_NAME_WIDTH);
    let country_width = cmp::min(
        cmp::max(country_header.len(), max_country_len),
        MAX_COUNTRY_WIDTH,
    );
    let views_width = cmp::max(views_header.len(), max_views_len);
    let followers_width = cmp::max(followers_header.len(), max_followers_len);

    println!(
        "{:>id_width$} {:<name_width$} {:<country_width$} {:>views_width$} {:>followers_width$}",
        id_header, name_header, country_header, views_header, followers_header
    );

    for channel in rows {
        let name = truncate(&channel.name, name_width);
        let country = truncate(&channel.country, country_width);

        println!(
            "{:>id_width$} {:<name_width$} {:<country_width$} {:>views_width$} {:>followers_width$}",
            channel.id, name, country, channel.views, channel.followers
        );
    }

    println!("{}", page_footer(page, query));
    Ok(())
}

/// Render `CatalogStats` in human-readable text form.
pub fn print_stats_text(stats: &CatalogStats) -> Result<()> {
    println!("channels        : {}", stats.channels);
    if let (Some(min), Some(max)) = (stats.views_min, stats.views_max) {
        println!("views           : {min}..={max}");
    }
    println!("followers total : {}", stats.followers_total);

    if !stats.countries.is_empty() {
        println!("countries       :");
        let width = stats.countries.keys().map(|k| k.chars().count()).max().unwrap_or(0);
        for (country, count) in &stats.countries {
            println!("  {country:<width$} {count}");
        }
    }

    Ok(())
}

fn page_footer(page: &ChannelPage, query: &ChannelQuery) -> String {
    if page.data.is_empty() {
        return format!("page {} is empty ({} matching)", query.page, page.total);
    }

    let first = (query.page - 1).saturating_mul(query.limit) + 1;
    let last = first + page.data.len() - 1;
    format!(
        "showing {first}-{last} of {} (page {})",
        page.total, query.page
    )
}

fn truncate(s: &str, max_width: usize) -> String {
    let char_count = s.chars().count();
    if char_count <= max_width {
        s.to_string()
    } else if max_width <= 1 {
        "…".to_string()
    } else {
        s.chars()
            .take(max_width.saturating_sub(1))
            .collect::<String>()
            + "…"
    }
}
