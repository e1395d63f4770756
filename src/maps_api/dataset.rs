use anyhow::{Context, Result};

use crate::data::feature::FeatureCollection;

/// Download the state polygons and prepare them for painting.
pub async fn fetch_dataset(client: &reqwest::Client, url: &str) -> Result<FeatureCollection> {
    log::info!("Fetching dataset from {}", url);
    let bytes = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("GET {url}"))?
        .error_for_status()
        .with_context(|| format!("GET {url} returned error status"))?
        .bytes()
        .await
        .with_context(|| format!("reading body of {url}"))?;

    // Projection and triangulation run on rayon, away from the async workers
    tokio::task::spawn_blocking(move || FeatureCollection::from_geojson(&bytes))
        .await
        .context("dataset parse task panicked")?
        .with_context(|| format!("parsing dataset from {url}"))
}
