//! Looks up GIF metadata on Giphy.
//!
//! Entries only ever store a URL. When that URL points at Giphy we can ask
//! the Giphy API for a smaller preview rendition of the same image.

use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "https://api.giphy.com";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub url: String,
}

/// The parts of a Giphy GIF we keep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Gif {
    pub id: String,
    pub preview: Image,
}

#[derive(Debug, Error)]
pub enum GiphyError {
    #[error("no Giphy API key is configured")]
    MissingApiKey,
    #[error("request to Giphy failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Giphy answered with status {0}")]
    Status(StatusCode),
}

/// Something that can resolve a Giphy id to its metadata.
///
/// `Ok(None)` means the lookup succeeded but Giphy does not know the id.
#[rocket::async_trait]
pub trait GifLookup: Send + Sync {
    async fn gif(&self, id: &str) -> Result<Option<Gif>, GiphyError>;
}

static ID: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9]+$").expect("valid regex"));

fn valid_id(candidate: &str) -> Option<String> {
    ID.is_match(candidate).then(|| candidate.to_string())
}

/// Extracts the Giphy id from a URL, if the URL is one Giphy hands out.
///
/// ```
/// assert_eq!(
///     giphy::giphy_id("https://giphy.com/gifs/cat-happy-JIX9t2j0ZTN9S"),
///     Some("JIX9t2j0ZTN9S".to_string())
/// );
/// assert_eq!(giphy::giphy_id("https://example.com/cat.gif"), None);
/// ```
pub fn giphy_id(url: &str) -> Option<String> {
    let url = Url::parse(url.trim()).ok()?;
    if !matches!(url.scheme(), "http" | "https") {
        return None;
    }
    let host = url.host_str()?.to_ascii_lowercase();
    let segments: Vec<&str> = url
        .path_segments()?
        .filter(|segment| !segment.is_empty())
        .collect();

    match host.as_str() {
        // giphy.com/gifs/<slug>-<id>
        "giphy.com" | "www.giphy.com" => match segments.as_slice() {
            ["gifs" | "stickers" | "embed", last, ..] => {
                valid_id(last.rsplit('-').next()?)
            }
            _ => None,
        },
        // i.giphy.com/<id>.gif or i.giphy.com/media/<id>/giphy.gif
        "i.giphy.com" => match segments.as_slice() {
            ["media", rest @ ..] => media_id(rest),
            [file] => valid_id(file.split('.').next()?),
            _ => None,
        },
        // media<N>.giphy.com/media/<id>/<file>
        _ if is_media_host(&host) => match segments.as_slice() {
            ["media", rest @ ..] => media_id(rest),
            _ => None,
        },
        _ => None,
    }
}

fn is_media_host(host: &str) -> bool {
    host.strip_prefix("media")
        .and_then(|rest| rest.strip_suffix(".giphy.com"))
        .is_some_and(|n| n.chars().all(|c| c.is_ascii_digit()))
}

/// `rest` is the path after `/media/`: either `<id>/<file>` or
/// `v1.<token>/<id>/<file>`.
fn media_id(rest: &[&str]) -> Option<String> {
    match rest {
        [version, id, _file] if version.starts_with("v1.") => valid_id(id),
        [id, _file] => valid_id(id),
        _ => None,
    }
}

#[derive(Debug, Clone)]
pub struct GiphyConfig {
    pub api_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
}

impl Default for GiphyConfig {
    fn default() -> Self {
        GiphyConfig {
            api_url: DEFAULT_API_URL.to_string(),
            api_key: None,
            timeout: Duration::from_secs(5),
        }
    }
}

/// Talks to the Giphy HTTP API.
pub struct GiphyClient {
    client: reqwest::Client,
    config: GiphyConfig,
}

impl GiphyClient {
    pub fn new(config: GiphyConfig) -> Result<GiphyClient, GiphyError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(GiphyClient { client, config })
    }

    fn gif_url(&self, id: &str) -> String {
        format!("{}/v1/gifs/{}", self.config.api_url.trim_end_matches('/'), id)
    }
}

#[derive(Deserialize)]
struct GifResponse {
    data: GifData,
}

#[derive(Deserialize)]
struct GifData {
    id: String,
    images: Renditions,
}

#[derive(Deserialize)]
struct Renditions {
    preview_gif: Option<Rendition>,
    fixed_width_small: Option<Rendition>,
}

#[derive(Deserialize)]
struct Rendition {
    url: String,
}

impl GifResponse {
    fn into_gif(self) -> Option<Gif> {
        let Renditions {
            preview_gif,
            fixed_width_small,
        } = self.data.images;
        let preview = preview_gif.or(fixed_width_small)?;
        Some(Gif {
            id: self.data.id,
            preview: Image { url: preview.url },
        })
    }
}

#[rocket::async_trait]
impl GifLookup for GiphyClient {
    #[tracing::instrument(skip(self))]
    async fn gif(&self, id: &str) -> Result<Option<Gif>, GiphyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(GiphyError::MissingApiKey)?;

        let response = self
            .client
            .get(self.gif_url(id))
            .query(&[("api_key", api_key)])
            .send()
            .await?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if !status.is_success() => Err(GiphyError::Status(status)),
            _ => {
                let body = response.json::<GifResponse>().await?;
                Ok(body.into_gif())
            }
        }
    }
}
