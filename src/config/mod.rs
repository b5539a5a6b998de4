mod file_config;

pub use file_config::{FileConfig, RetryConfig};

use anyhow::{anyhow, bail, Result};
use std::num::NonZeroUsize;
use std::path::PathBuf;

use crate::api::{
    Credentials, MAX_ARTISTS_PER_LOOKUP, MAX_AUDIO_FEATURES_PER_LOOKUP, MAX_PAGE_SIZE,
    MAX_TRACKS_PER_LOOKUP,
};

pub const DEFAULT_API_BASE_URL: &str = "https://api.spotify.com/v1";
pub const DEFAULT_AUTH_URL: &str = "https://accounts.spotify.com/api/token";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub api_base_url: String,
    pub auth_url: String,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
    pub request_timeout_sec: u64,
    pub page_size: u32,
    pub tracks_chunk_size: usize,
    pub artists_chunk_size: usize,
    pub features_chunk_size: usize,
    pub output_dir: PathBuf,
    pub id_lists_dir: PathBuf,
    pub db_path: PathBuf,
    pub metrics_file: Option<PathBuf>,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            auth_url: DEFAULT_AUTH_URL.to_string(),
            client_id: None,
            client_secret: None,
            request_timeout_sec: 30,
            page_size: MAX_PAGE_SIZE,
            tracks_chunk_size: MAX_TRACKS_PER_LOOKUP,
            artists_chunk_size: MAX_ARTISTS_PER_LOOKUP,
            features_chunk_size: MAX_AUDIO_FEATURES_PER_LOOKUP,
            output_dir: PathBuf::from("data"),
            id_lists_dir: PathBuf::from("config"),
            db_path: PathBuf::from("catalog.db"),
            metrics_file: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub batch_sizes: BatchSizes,
    pub output_dir: PathBuf,
    pub id_lists_dir: PathBuf,
    pub db_path: PathBuf,
    pub metrics_file: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub api_base_url: String,
    pub auth_url: String,
    pub credentials: Credentials,
    pub request_timeout_sec: u64,
    pub page_size: u32,
    pub retry: RetrySettings,
}

/// How many ids go into one lookup request, per lookup kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchSizes {
    pub tracks: NonZeroUsize,
    pub artists: NonZeroUsize,
    pub audio_features: NonZeroUsize,
}

impl Default for BatchSizes {
    fn default() -> Self {
        Self {
            tracks: NonZeroUsize::new(MAX_TRACKS_PER_LOOKUP).unwrap_or(NonZeroUsize::MIN),
            artists: NonZeroUsize::new(MAX_ARTISTS_PER_LOOKUP).unwrap_or(NonZeroUsize::MIN),
            audio_features: NonZeroUsize::new(MAX_AUDIO_FEATURES_PER_LOOKUP)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff_ms: 500,
            max_backoff_ms: 30_000,
            backoff_multiplier: 2.0,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let client_id = file
            .client_id
            .or_else(|| cli.client_id.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow!("client_id must be specified via --client-id, SPOTIFY_CLIENT_ID or in config file")
            })?;
        let client_secret = file
            .client_secret
            .or_else(|| cli.client_secret.clone())
            .filter(|s| !s.is_empty())
            .ok_or_else(|| {
                anyhow!("client_secret must be specified via --client-secret, SPOTIFY_CLIENT_SECRET or in config file")
            })?;

        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than 0");
        }

        let page_size = file.page_size.unwrap_or(cli.page_size);
        if page_size == 0 || page_size > MAX_PAGE_SIZE {
            bail!("page_size must be between 1 and {}, got {}", MAX_PAGE_SIZE, page_size);
        }

        let batch_sizes = BatchSizes {
            tracks: chunk_size(
                "tracks_chunk_size",
                file.tracks_chunk_size.unwrap_or(cli.tracks_chunk_size),
                MAX_TRACKS_PER_LOOKUP,
            )?,
            artists: chunk_size(
                "artists_chunk_size",
                file.artists_chunk_size.unwrap_or(cli.artists_chunk_size),
                MAX_ARTISTS_PER_LOOKUP,
            )?,
            audio_features: chunk_size(
                "features_chunk_size",
                file.features_chunk_size.unwrap_or(cli.features_chunk_size),
                MAX_AUDIO_FEATURES_PER_LOOKUP,
            )?,
        };

        // Retry settings - merge file config with defaults
        let retry_file = file.retry.unwrap_or_default();
        let defaults = RetrySettings::default();
        let retry = RetrySettings {
            max_retries: retry_file.max_retries.unwrap_or(defaults.max_retries),
            initial_backoff_ms: retry_file
                .initial_backoff_ms
                .unwrap_or(defaults.initial_backoff_ms),
            max_backoff_ms: retry_file.max_backoff_ms.unwrap_or(defaults.max_backoff_ms),
            backoff_multiplier: retry_file
                .backoff_multiplier
                .unwrap_or(defaults.backoff_multiplier),
        };
        if retry.backoff_multiplier < 1.0 {
            bail!(
                "retry.backoff_multiplier must be at least 1.0, got {}",
                retry.backoff_multiplier
            );
        }
        if retry.max_backoff_ms < retry.initial_backoff_ms {
            bail!("retry.max_backoff_ms must not be lower than retry.initial_backoff_ms");
        }

        let api = ApiConfig {
            api_base_url: file.api_base_url.unwrap_or_else(|| cli.api_base_url.clone()),
            auth_url: file.auth_url.unwrap_or_else(|| cli.auth_url.clone()),
            credentials: Credentials {
                client_id,
                client_secret,
            },
            request_timeout_sec,
            page_size,
            retry,
        };

        let output_dir = file
            .output_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.output_dir.clone());
        let id_lists_dir = file
            .id_lists_dir
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.id_lists_dir.clone());
        let db_path = file
            .db_path
            .map(PathBuf::from)
            .unwrap_or_else(|| cli.db_path.clone());
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }
        let metrics_file = file
            .metrics_file
            .map(PathBuf::from)
            .or_else(|| cli.metrics_file.clone());

        Ok(Self {
            api,
            batch_sizes,
            output_dir,
            id_lists_dir,
            db_path,
            metrics_file,
        })
    }

    pub fn categories_dir(&self) -> PathBuf {
        self.output_dir.join("categories")
    }

    pub fn playlists_dir(&self) -> PathBuf {
        self.output_dir.join("playlists")
    }

    pub fn charts_dir(&self) -> PathBuf {
        self.output_dir.join("charts")
    }

    pub fn albums_dir(&self) -> PathBuf {
        self.output_dir.join("releases").join("albums")
    }

    pub fn album_tracks_dir(&self) -> PathBuf {
        self.output_dir.join("releases").join("tracks")
    }

    pub fn tracks_dir(&self) -> PathBuf {
        self.output_dir.join("tracks")
    }

    pub fn artists_dir(&self) -> PathBuf {
        self.output_dir.join("artists")
    }
}

fn chunk_size(name: &str, value: usize, max: usize) -> Result<NonZeroUsize> {
    match NonZeroUsize::new(value) {
        Some(size) if value <= max => Ok(size),
        _ => bail!("{} must be between 1 and {}, got {}", name, max, value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli_with_credentials() -> CliConfig {
        CliConfig {
            client_id: Some("cli-id".to_string()),
            client_secret: Some("cli-secret".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let cli = CliConfig {
            api_base_url: "http://localhost:9000/v1".to_string(),
            page_size: 10,
            tracks_chunk_size: 20,
            output_dir: PathBuf::from("/tmp/out"),
            metrics_file: Some(PathBuf::from("/tmp/harvest.prom")),
            ..cli_with_credentials()
        };

        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.api.api_base_url, "http://localhost:9000/v1");
        assert_eq!(config.api.auth_url, DEFAULT_AUTH_URL);
        assert_eq!(config.api.credentials.client_id, "cli-id");
        assert_eq!(config.api.page_size, 10);
        assert_eq!(config.batch_sizes.tracks.get(), 20);
        assert_eq!(config.batch_sizes.artists.get(), 50);
        assert_eq!(config.batch_sizes.audio_features.get(), 100);
        assert_eq!(config.output_dir, PathBuf::from("/tmp/out"));
        assert_eq!(config.metrics_file, Some(PathBuf::from("/tmp/harvest.prom")));
        assert_eq!(config.api.retry, RetrySettings::default());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let cli = CliConfig {
            page_size: 10,
            request_timeout_sec: 5,
            ..cli_with_credentials()
        };
        let file_config = FileConfig {
            client_id: Some("toml-id".to_string()),
            page_size: Some(25),
            db_path: Some("/data/catalog.db".to_string()),
            retry: Some(RetryConfig {
                max_retries: Some(9),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&cli, Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.api.credentials.client_id, "toml-id");
        assert_eq!(config.api.page_size, 25);
        assert_eq!(config.db_path, PathBuf::from("/data/catalog.db"));
        assert_eq!(config.api.retry.max_retries, 9);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.api.credentials.client_secret, "cli-secret");
        assert_eq!(config.api.request_timeout_sec, 5);
        assert_eq!(config.api.retry.initial_backoff_ms, 500);
    }

    #[test]
    fn test_resolve_missing_credentials_error() {
        let result = AppConfig::resolve(&CliConfig::default(), None);
        assert!(result.unwrap_err().to_string().contains("client_id must be specified"));

        let cli = CliConfig {
            client_id: Some("id".to_string()),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("client_secret must be specified"));
    }

    #[test]
    fn test_resolve_rejects_out_of_range_page_size() {
        let cli = CliConfig {
            page_size: 51,
            ..cli_with_credentials()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("page_size"));
    }

    #[test]
    fn test_resolve_rejects_zero_chunk_size() {
        let file_config = FileConfig {
            artists_chunk_size: Some(0),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli_with_credentials(), Some(file_config));
        assert!(result.unwrap_err().to_string().contains("artists_chunk_size"));
    }

    #[test]
    fn test_resolve_rejects_chunk_size_above_api_limit() {
        let cli = CliConfig {
            features_chunk_size: 101,
            ..cli_with_credentials()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("features_chunk_size"));
    }

    #[test]
    fn test_resolve_rejects_shrinking_backoff() {
        let file_config = FileConfig {
            retry: Some(RetryConfig {
                backoff_multiplier: Some(0.5),
                ..Default::default()
            }),
            ..Default::default()
        };
        let result = AppConfig::resolve(&cli_with_credentials(), Some(file_config));
        assert!(result.unwrap_err().to_string().contains("backoff_multiplier"));
    }

    #[test]
    fn test_resolve_db_path_directory_error() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cli = CliConfig {
            db_path: temp_dir.path().to_path_buf(),
            ..cli_with_credentials()
        };
        let result = AppConfig::resolve(&cli, None);
        assert!(result.unwrap_err().to_string().contains("is a directory"));
    }

    #[test]
    fn test_output_dir_helpers() {
        let cli = CliConfig {
            output_dir: PathBuf::from("/out"),
            ..cli_with_credentials()
        };
        let config = AppConfig::resolve(&cli, None).unwrap();

        assert_eq!(config.albums_dir(), PathBuf::from("/out/releases/albums"));
        assert_eq!(config.album_tracks_dir(), PathBuf::from("/out/releases/tracks"));
        assert_eq!(config.artists_dir(), PathBuf::from("/out/artists"));
        assert_eq!(config.charts_dir(), PathBuf::from("/out/charts"));
    }
}
