//! Bulk loading of reference country data.

use std::collections::HashSet;

use domains::{collections, encode, Country, DocumentStore, Query, Result};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub inserted: usize,
    pub skipped: usize,
}

/// Parses a JSON array of countries. Ids in the file are ignored.
pub fn parse_countries(json: &str) -> Result<Vec<Country>> {
    Ok(serde_json::from_str(json)?)
}

/// Adds every country whose canonical name is not already stored, so
/// running the same seed twice is harmless.
pub async fn seed_countries(documents: &dyn DocumentStore, countries: &[Country]) -> Result<SeedReport> {
    let existing = documents.query(collections::COUNTRIES, &Query::all()).await?;
    let mut known: HashSet<String> = existing
        .into_iter()
        .filter_map(|doc| doc.decode::<Country>().ok())
        .map(|country| country.canonical_name().to_string())
        .collect();

    let mut report = SeedReport::default();
    for country in countries {
        let name = country.canonical_name();
        if name.is_empty() || !known.insert(name.to_string()) {
            tracing::debug!(name, "seed: skipping country");
            report.skipped += 1;
            continue;
        }
        let id = documents.add(collections::COUNTRIES, encode(country)?).await?;
        tracing::info!(name, %id, "seed: country added");
        report.inserted += 1;
    }
    Ok(report)
}
