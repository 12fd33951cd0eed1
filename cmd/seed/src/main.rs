//! Loads a JSON array of countries into the configured document store.
//!
//! Usage: `seed <countries.json>`. Countries already present (by English
//! name) are left alone. Only a remote backend can be seeded.

use std::sync::Arc;

use anyhow::{anyhow, bail, Context};
use configs::{telemetry, BackendKind, Settings};
use domains::DocumentStore;
use storage_adapters::HttpDocumentStore;

/// The store to seed. The memory backend lives only as long as this
/// process, so seeding it is refused.
fn target_store(settings: &Settings) -> anyhow::Result<Arc<dyn DocumentStore>> {
    match settings.backend.kind {
        BackendKind::Http => {
            let url = settings
                .backend
                .documents_url
                .as_deref()
                .ok_or_else(|| anyhow!("backend.documents_url is not set"))?;
            Ok(Arc::new(HttpDocumentStore::new(
                url,
                settings.backend_api_key().map(str::to_owned),
            )?))
        }
        BackendKind::Memory => bail!(
            "backend.kind is \"memory\"; nothing would persist. Use `wayfarer --seed` for \
             an in-process catalogue or set WAYFARER__BACKEND__KIND=http"
        ),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    telemetry::init_tracing(&settings.app);

    let path = std::env::args()
        .nth(1)
        .ok_or_else(|| anyhow!("usage: seed <countries.json>"))?;
    let documents = target_store(&settings)?;

    let json = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("reading {path}"))?;
    let countries = services::parse_countries(&json).with_context(|| format!("parsing {path}"))?;

    let report = services::seed_countries(documents.as_ref(), &countries).await?;
    tracing::info!(inserted = report.inserted, skipped = report.skipped, "seed complete");
    println!("inserted {}, skipped {}", report.inserted, report.skipped);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn settings(pairs: &[(&str, &str)]) -> Settings {
        let env = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Settings::load_from(Path::new("does/not/exist.toml"), Some(env)).unwrap()
    }

    #[test]
    fn memory_backend_is_refused() {
        let err = target_store(&settings(&[])).err().unwrap();
        assert!(err.to_string().contains("memory"));
    }

    #[test]
    fn http_backend_is_accepted() {
        let settings = settings(&[
            ("WAYFARER__BACKEND__KIND", "http"),
            ("WAYFARER__BACKEND__DOCUMENTS_URL", "http://localhost:8080"),
        ]);
        assert!(target_store(&settings).is_ok());
    }
}
