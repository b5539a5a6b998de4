//! Blocking HTTP client for the upstream catalog API.
//!
//! Authenticates with the client-credentials flow and caches the access token
//! until shortly before it expires. Every request, token fetch included, goes
//! through a single retry loop; rate limiting (429) honours the server's
//! `Retry-After`.

use std::sync::{Mutex, PoisonError};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::Result;
use reqwest::blocking::{Client, RequestBuilder};
use reqwest::header::RETRY_AFTER;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use super::models::{
    ArtistsResponse, AudioFeatures, AudioFeaturesResponse, CategoriesResponse, Category, FullArtist,
    FullTrack, NewReleasesResponse, Paging, PlaylistItem, PlaylistsResponse, SimplifiedAlbum,
    SimplifiedPlaylist, SimplifiedTrack, TokenResponse, TracksResponse,
};
use super::{ApiError, CatalogApi, RetryPolicy};
use crate::config::ApiConfig;
use crate::metrics;
use crate::pipeline::{CollectionPage, Cursor};

/// Tokens are refreshed this long before the server says they expire.
const TOKEN_EXPIRY_MARGIN: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

struct AccessToken {
    value: String,
    expires_at: Instant,
}

pub struct SpotifyClient {
    client: Client,
    api_base_url: String,
    auth_url: String,
    credentials: Credentials,
    token: Mutex<Option<AccessToken>>,
    retry_policy: RetryPolicy,
    page_size: u32,
}

impl SpotifyClient {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_sec))
            .user_agent(concat!("catalog-harvest/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            auth_url: config.auth_url.clone(),
            credentials: config.credentials.clone(),
            token: Mutex::new(None),
            retry_policy: RetryPolicy::new(&config.retry),
            page_size: config.page_size,
        })
    }

    /// Return a valid access token, requesting a new one if the cached token
    /// is missing or about to expire. Makes at most one token request; the
    /// caller's retry loop decides whether to try again.
    fn access_token(&self) -> Result<String, ApiError> {
        let mut cached = self.token.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.expires_at {
                return Ok(token.value.clone());
            }
        }

        let request = self
            .client
            .post(&self.auth_url)
            .basic_auth(&self.credentials.client_id, Some(&self.credentials.client_secret))
            .form(&[("grant_type", "client_credentials")]);
        let response: TokenResponse = match self.send("token", &self.auth_url, request) {
            Err(ApiError::Status { status, body, .. }) if (400..500).contains(&status) => {
                return Err(ApiError::Auth(format!("token endpoint returned {}: {}", status, body)));
            }
            other => other?,
        };

        debug!("Obtained access token valid for {}s", response.expires_in);
        let lifetime = Duration::from_secs(response.expires_in).saturating_sub(TOKEN_EXPIRY_MARGIN);
        let value = response.access_token;
        *cached = Some(AccessToken {
            value: value.clone(),
            expires_at: Instant::now() + lifetime,
        });
        Ok(value)
    }

    fn invalidate_token(&self) {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Authenticated GET with retries. A 401 drops the cached token and the
    /// request is repeated once with a fresh one.
    fn get_json<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T, ApiError> {
        self.with_retry(endpoint, || {
            let result = self.authorized_get(endpoint, url);
            if let Err(ApiError::Status { status: 401, .. }) = &result {
                debug!("Access token rejected by {}, re-authenticating", endpoint);
                self.invalidate_token();
                return self.authorized_get(endpoint, url);
            }
            result
        })
    }

    fn authorized_get<T: DeserializeOwned>(&self, endpoint: &str, url: &str) -> Result<T, ApiError> {
        let token = self.access_token()?;
        self.send(endpoint, url, self.client.get(url).bearer_auth(token))
    }

    fn with_retry<T>(
        &self,
        endpoint: &str,
        mut attempt: impl FnMut() -> Result<T, ApiError>,
    ) -> Result<T, ApiError> {
        let mut retry_count = 0;
        loop {
            match attempt() {
                Ok(value) => return Ok(value),
                Err(e) if self.retry_policy.should_retry(&e, retry_count) => {
                    let delay = self.retry_policy.delay_for(&e, retry_count);
                    warn!(
                        "Request to {} failed (attempt {}/{}), retrying in {:?}: {}",
                        endpoint,
                        retry_count + 1,
                        self.retry_policy.max_retries + 1,
                        delay,
                        e
                    );
                    metrics::record_api_retry(endpoint);
                    thread::sleep(delay);
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Send one request and decode the JSON body, classifying failures.
    fn send<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        url: &str,
        request: RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = request.send().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        metrics::record_api_request(endpoint, status.as_u16());

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get(RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<u64>().ok())
                .map(Duration::from_secs);
            return Err(ApiError::RateLimited {
                url: url.to_string(),
                retry_after,
            });
        }

        let body = response.text().map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;

        if !status.is_success() {
            return Err(ApiError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| ApiError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// First-page URL, or the cursor the previous page handed out.
    fn page_url(&self, cursor: Option<&Cursor>, first_page: impl FnOnce() -> String) -> String {
        match cursor {
            Some(cursor) => cursor.as_str().to_string(),
            None => first_page(),
        }
    }

    fn with_country(mut url: String, param: &str, country: Option<&str>) -> String {
        if let Some(country) = country {
            url.push_str(&format!("&{}={}", param, urlencoding::encode(country)));
        }
        url
    }
}

impl CatalogApi for SpotifyClient {
    fn categories_page(
        &self,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Category>, ApiError> {
        let url = self.page_url(cursor, || {
            let url = format!("{}/browse/categories?offset=0&limit={}", self.api_base_url, self.page_size);
            Self::with_country(url, "country", country)
        });
        let response: CategoriesResponse = self.get_json("categories", &url)?;
        Ok(response.categories.into())
    }

    fn category_playlists_page(
        &self,
        category_id: &str,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Option<SimplifiedPlaylist>>, ApiError> {
        let url = self.page_url(cursor, || {
            let url = format!(
                "{}/browse/categories/{}/playlists?offset=0&limit={}",
                self.api_base_url,
                urlencoding::encode(category_id),
                self.page_size
            );
            Self::with_country(url, "country", country)
        });
        let response: PlaylistsResponse = self.get_json("category_playlists", &url)?;
        Ok(response.playlists.into())
    }

    fn playlist_items_page(
        &self,
        playlist_id: &str,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<PlaylistItem>, ApiError> {
        let url = self.page_url(cursor, || {
            format!(
                "{}/playlists/{}/tracks?offset=0&limit={}",
                self.api_base_url,
                urlencoding::encode(playlist_id),
                self.page_size
            )
        });
        let response: Paging<PlaylistItem> = self.get_json("playlist_items", &url)?;
        Ok(response.into())
    }

    fn new_releases_page(
        &self,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<SimplifiedAlbum>, ApiError> {
        let url = self.page_url(cursor, || {
            let url = format!("{}/browse/new-releases?offset=0&limit={}", self.api_base_url, self.page_size);
            Self::with_country(url, "country", country)
        });
        let response: NewReleasesResponse = self.get_json("new_releases", &url)?;
        Ok(response.albums.into())
    }

    fn album_tracks_page(
        &self,
        album_id: &str,
        market: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Option<SimplifiedTrack>>, ApiError> {
        let url = self.page_url(cursor, || {
            let url = format!(
                "{}/albums/{}/tracks?offset=0&limit={}",
                self.api_base_url,
                urlencoding::encode(album_id),
                self.page_size
            );
            Self::with_country(url, "market", market)
        });
        let response: Paging<Option<SimplifiedTrack>> = self.get_json("album_tracks", &url)?;
        Ok(response.into())
    }

    fn tracks(&self, ids: &[String], market: Option<&str>) -> Result<Vec<Option<FullTrack>>, ApiError> {
        let url = format!("{}/tracks?ids={}", self.api_base_url, ids.join(","));
        let url = Self::with_country(url, "market", market);
        let response: TracksResponse = self.get_json("tracks", &url)?;
        Ok(response.tracks)
    }

    fn artists(&self, ids: &[String]) -> Result<Vec<Option<FullArtist>>, ApiError> {
        let url = format!("{}/artists?ids={}", self.api_base_url, ids.join(","));
        let response: ArtistsResponse = self.get_json("artists", &url)?;
        Ok(response.artists)
    }

    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, ApiError> {
        let url = format!("{}/audio-features?ids={}", self.api_base_url, ids.join(","));
        let response: AudioFeaturesResponse = self.get_json("audio_features", &url)?;
        Ok(response.audio_features)
    }
}
