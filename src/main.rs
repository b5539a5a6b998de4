use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use catalog_harvest::commands::{load_ids, Session, ID_LIST_KEY};
use catalog_harvest::config::{
    AppConfig, CliConfig, FileConfig, DEFAULT_API_BASE_URL, DEFAULT_AUTH_URL,
};
use catalog_harvest::metrics;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("GIT_HASH"), ")");

fn parse_path(s: &str) -> Result<PathBuf> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(msg).with_context(|| format!("Error resolving path: {}", s));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(version = VERSION, about)]
struct CliArgs {
    /// Path to a TOML config file. Its values override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Base URL of the catalog API.
    #[clap(long, default_value = DEFAULT_API_BASE_URL)]
    pub api_base_url: String,

    /// Token endpoint for the client-credentials flow.
    #[clap(long, default_value = DEFAULT_AUTH_URL)]
    pub auth_url: String,

    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    pub client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET", hide_env_values = true)]
    pub client_secret: Option<String>,

    /// Timeout in seconds for API requests.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// Items requested per collection page.
    #[clap(long, default_value_t = 50)]
    pub page_size: u32,

    #[clap(long, default_value_t = 50)]
    pub tracks_chunk_size: usize,

    #[clap(long, default_value_t = 50)]
    pub artists_chunk_size: usize,

    #[clap(long, default_value_t = 100)]
    pub features_chunk_size: usize,

    /// Directory CSV exports are written under.
    #[clap(long, default_value = "data", value_parser = parse_path)]
    pub output_dir: PathBuf,

    /// Directory holding YAML id lists.
    #[clap(long, default_value = "config", value_parser = parse_path)]
    pub id_lists_dir: PathBuf,

    /// Path to the SQLite catalog database file.
    #[clap(long, default_value = "catalog.db", value_parser = parse_path)]
    pub db_path: PathBuf,

    /// Write Prometheus metrics to this file when the command finishes.
    #[clap(long, value_parser = parse_path)]
    pub metrics_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Ids given inline or read from an id list file.
#[derive(Args, Debug)]
struct IdsArgs {
    /// Ids to process.
    pub ids: Vec<String>,

    /// Read ids from this YAML id list instead.
    #[clap(long, value_parser = parse_path, conflicts_with = "ids")]
    pub from_list: Option<PathBuf>,

    /// Key of the list inside the id list file.
    #[clap(long, default_value = ID_LIST_KEY)]
    pub key: String,
}

impl IdsArgs {
    fn resolve(&self) -> Result<Vec<String>> {
        match &self.from_list {
            Some(path) => load_ids(path, &self.key),
            None if self.ids.is_empty() => bail!("No ids given, pass ids or --from-list"),
            None => Ok(self.ids.clone()),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Exports browse categories.
    Categories {
        #[clap(long)]
        country: Option<String>,
    },
    /// Exports the playlists of the given categories.
    Playlists {
        #[clap(long = "category", required = true)]
        categories: Vec<String>,
        #[clap(long)]
        country: Option<String>,
    },
    /// Exports the global top chart.
    GlobalTop,
    /// Exports the top chart of one country.
    CountryTop { country: String },
    /// Exports new releases, optionally saving their ids as an id list.
    Releases {
        #[clap(long)]
        country: Option<String>,
        #[clap(long)]
        save_ids: bool,
    },
    /// Exports every track of the given albums with audio features.
    AlbumTracks {
        #[command(flatten)]
        ids: IdsArgs,
        #[clap(long)]
        country: Option<String>,
    },
    /// Exports track rows for the given track ids.
    TracksInfo {
        #[command(flatten)]
        ids: IdsArgs,
        #[clap(long)]
        country: Option<String>,
    },
    /// Exports artist rows for the given artist ids.
    ArtistsInfo {
        #[command(flatten)]
        ids: IdsArgs,
        #[clap(long)]
        country: Option<String>,
    },
    /// Fetches the given tracks and their artists and upserts both.
    Upsert {
        #[command(flatten)]
        ids: IdsArgs,
        #[clap(long)]
        country: Option<String>,
    },
    /// Runs the full harvest: releases, album tracks, tracks, artists, upsert.
    Run {
        #[clap(long)]
        country: Option<String>,
    },
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            api_base_url: self.api_base_url.clone(),
            auth_url: self.auth_url.clone(),
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            request_timeout_sec: self.request_timeout_sec,
            page_size: self.page_size,
            tracks_chunk_size: self.tracks_chunk_size,
            artists_chunk_size: self.artists_chunk_size,
            features_chunk_size: self.features_chunk_size,
            output_dir: self.output_dir.clone(),
            id_lists_dir: self.id_lists_dir.clone(),
            db_path: self.db_path.clone(),
            metrics_file: self.metrics_file.clone(),
        }
    }
}

fn execute(session: &Session, command: &Command) -> Result<()> {
    match command {
        Command::Categories { country } => {
            session.categories(country.as_deref())?;
        }
        Command::Playlists {
            categories,
            country,
        } => {
            session.playlists(categories, country.as_deref())?;
        }
        Command::GlobalTop => {
            session.top_chart(None)?;
        }
        Command::CountryTop { country } => {
            session.top_chart(Some(country.as_str()))?;
        }
        Command::Releases { country, save_ids } => {
            let (_, list) = session.releases(country.as_deref(), *save_ids)?;
            if let Some(list) = list {
                info!("Release ids saved to {:?}", list);
            }
        }
        Command::AlbumTracks { ids, country } => {
            session.album_tracks(&ids.resolve()?, country.as_deref())?;
        }
        Command::TracksInfo { ids, country } => {
            session.tracks_info(&ids.resolve()?, country.as_deref())?;
        }
        Command::ArtistsInfo { ids, country } => {
            session.artists_info(&ids.resolve()?, country.as_deref())?;
        }
        Command::Upsert { ids, country } => {
            let summary = session.upsert(&ids.resolve()?, country.as_deref())?;
            if !summary.is_complete() {
                warn!("Some rows were rejected by the database, see above");
            }
        }
        Command::Run { country } => {
            let summary = session.run(country.as_deref())?;
            if !summary.upsert.is_complete() {
                warn!("Some rows were rejected by the database, see above");
            }
        }
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading config from {:?}", path);
            Some(FileConfig::load(path)?)
        }
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    let metrics_file = config.metrics_file.clone();

    metrics::init_metrics();

    info!("catalog-harvest {}", VERSION);
    let session = Session::new(config)?;
    let result = execute(&session, &cli_args.command);

    if let Some(path) = metrics_file {
        if let Err(e) = metrics::write_textfile(&path) {
            warn!("Failed to write metrics to {:?}: {}", path, e);
        }
    }

    result
}
