use std::{sync::Arc, time::Duration};

use giphy::{GifLookup, GiphyConfig, DEFAULT_API_URL};
use serde::Deserialize;

/// Application settings, read from Rocket's figment (`Rocket.toml`,
/// `ROCKET_*` and `SMILEYS_*` environment variables).
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub giphy_api_key: Option<String>,
    #[serde(default = "default_giphy_api_url")]
    pub giphy_api_url: String,
    #[serde(default = "default_giphy_timeout_secs")]
    pub giphy_timeout_secs: u64,
}

fn default_giphy_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_giphy_timeout_secs() -> u64 {
    5
}

impl AppConfig {
    pub fn giphy(&self) -> GiphyConfig {
        GiphyConfig {
            api_url: self.giphy_api_url.clone(),
            api_key: self
                .giphy_api_key
                .clone()
                .filter(|key| !key.trim().is_empty()),
            timeout: Duration::from_secs(self.giphy_timeout_secs),
        }
    }
}

/// The GIF metadata source handlers use for enrichment.
#[derive(Clone)]
pub struct Gifs(pub Arc<dyn GifLookup>);

#[cfg(test)]
mod tests {
    use rocket::figment::{providers::Serialized, Figment};

    use super::AppConfig;

    #[test]
    fn defaults_apply_when_unset() {
        let config: AppConfig = Figment::new().extract().unwrap();
        assert_eq!(config.giphy_api_url, "https://api.giphy.com");
        assert!(config.giphy().api_key.is_none());
    }

    #[test]
    fn blank_api_key_counts_as_missing() {
        let config: AppConfig = Figment::from(Serialized::default("giphy_api_key", " "))
            .extract()
            .unwrap();
        assert!(config.giphy().api_key.is_none());
    }
}
