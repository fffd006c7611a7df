// Seeds the influencers table from the bundled catalog.
//
// Catalog lines look like `Display Name (@handle)`. Category headings and
// blank lines carry no `(@` and are ignored.

use anyhow::{Context, Result};
use tracing::{info, warn};

use influencer_common::NewInfluencer;

use crate::traits::InfluencerStore;

/// Influencer list shipped with the pipeline, grouped by category.
pub const INFLUENCER_CATALOG: &str = include_str!("../data/influencers.txt");

/// Split `Name (@handle)` into `(name, handle)`, both trimmed.
///
/// Splits on the first `(@`; the handle runs up to the closing parenthesis.
pub fn parse_line(line: &str) -> Option<(&str, &str)> {
    let (name, rest) = line.split_once("(@")?;
    let handle = rest.split(')').next().unwrap_or(rest);
    Some((name.trim(), handle.trim()))
}

/// Parse every qualifying catalog line into a new influencer record.
pub fn parse_catalog(text: &str) -> Vec<NewInfluencer> {
    text.lines()
        .filter_map(|line| {
            let (name, handle) = parse_line(line)?;
            if name.is_empty() || handle.is_empty() {
                warn!(line, "Skipping catalog line with empty name or handle");
                return None;
            }
            Some(NewInfluencer::new(name, handle))
        })
        .collect()
}

/// Parse `catalog` and bulk-insert the result. Returns the number of rows written.
///
/// The insert is a single statement: on failure nothing is written and the
/// error is returned for the caller to report.
pub async fn seed(store: &dyn InfluencerStore, catalog: &str) -> Result<usize> {
    let influencers = parse_catalog(catalog);
    if influencers.is_empty() {
        info!("Catalog contains no influencers, nothing to insert");
        return Ok(0);
    }

    store
        .insert_influencers(&influencers)
        .await
        .with_context(|| format!("inserting {} influencers", influencers.len()))?;

    info!(count = influencers.len(), "Added influencers to the database");
    Ok(influencers.len())
}
