use std::time::Duration;

use anyhow::{Context, Result};

use crate::map::map_tile::{MapTile, TileKey};

const SUBDOMAINS: [char; 3] = ['a', 'b', 'c'];

/// Fetches raster tiles from an XYZ url template such as
/// `https://{a-c}.tile.openstreetmap.org/{z}/{x}/{y}.png`.
#[derive(Debug, Clone)]
pub struct TileRetriever {
    client: reqwest::Client,
    url_template: String,
}

impl TileRetriever {
    pub fn new(client: reqwest::Client, url_template: String) -> Self {
        Self { client, url_template }
    }

    /// Url for `key`, spreading requests over the `{a-c}` subdomains.
    pub fn tile_url(&self, (z, x, y): TileKey) -> String {
        let subdomain = SUBDOMAINS[((x + y) % SUBDOMAINS.len() as u32) as usize];
        self.url_template
            .replace("{a-c}", &subdomain.to_string())
            .replace("{z}", &z.to_string())
            .replace("{x}", &x.to_string())
            .replace("{y}", &y.to_string())
    }

    /// Asynchronously fetches a tile and decodes it into a MapTile.
    pub async fn fetch_tile(&self, key: TileKey) -> Result<MapTile> {
        let url = self.tile_url(key);
        log::debug!("Fetching tile {:?} from {}", key, url);

        let bytes = self.client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("GET {url}"))?
            .error_for_status()
            .with_context(|| format!("GET {url} returned error status"))?
            .bytes()
            .await
            .with_context(|| format!("reading body of {url}"))?;

        // Decoding is CPU bound, keep it off the async workers
        tokio::task::spawn_blocking(move || MapTile::decode(key, &bytes))
            .await
            .context("tile decode task panicked")?
    }
}

/// Shared HTTP client for tiles and the dataset.
pub fn http_client(user_agent: &str) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(user_agent)
        .timeout(Duration::from_secs(20))
        .build()
        .context("http client init failed")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_template_is_filled_in() {
        let retriever = TileRetriever::new(reqwest::Client::new(), "https://{a-c}.example.org/{z}/{x}/{y}.png".to_string());
        assert_eq!(retriever.tile_url((4, 3, 5)), "https://c.example.org/4/3/5.png");
        assert_eq!(retriever.tile_url((4, 3, 6)), "https://a.example.org/4/3/6.png");
    }

    #[test]
    fn templates_without_subdomains_are_untouched_there() {
        let retriever = TileRetriever::new(reqwest::Client::new(), "https://tiles.example.org/{z}/{x}/{y}.png?key=abc".to_string());
        assert_eq!(retriever.tile_url((0, 0, 0)), "https://tiles.example.org/0/0/0.png?key=abc");
    }
}
