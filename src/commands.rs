//! Command orchestration: fetch, export, hand id lists between stages and
//! upsert into the catalog database.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{info, warn};

use crate::api::SpotifyClient;
use crate::catalog::{export, output_name, Harvester};
use crate::config::AppConfig;
use crate::pipeline::config_store;
use crate::pipeline::{Table, UpsertReport};
use crate::store::CatalogDb;

/// Key under which id lists are stored.
pub const ID_LIST_KEY: &str = "id";

/// Name of the id list written by `releases` for `country`.
pub fn releases_list_name(country: Option<&str>) -> String {
    format!("releases_id_{}", output_name(country))
}

/// Outcome of writing artists and tracks to the database.
#[derive(Debug)]
pub struct UpsertSummary {
    pub artists: UpsertReport,
    pub tracks: UpsertReport,
}

impl UpsertSummary {
    pub fn is_complete(&self) -> bool {
        self.artists.is_complete() && self.tracks.is_complete()
    }

    fn log(&self) {
        for report in [&self.artists, &self.tracks] {
            if report.is_complete() {
                info!("{}: {} rows upserted", report.table, report.written);
            } else {
                warn!(
                    "{}: {} rows upserted, {} rejected",
                    report.table,
                    report.written,
                    report.failures.len()
                );
                for failure in &report.failures {
                    warn!("  {} (row {}): {}", failure.id, failure.row, failure.error);
                }
            }
        }
    }
}

/// Summary of a full `run`.
#[derive(Debug)]
pub struct RunSummary {
    pub releases: usize,
    pub album_tracks: usize,
    pub tracks: usize,
    pub artists: usize,
    pub upsert: UpsertSummary,
}

pub struct Session {
    config: AppConfig,
    client: SpotifyClient,
    db: CatalogDb,
}

impl Session {
    pub fn new(config: AppConfig) -> Result<Self> {
        let client = SpotifyClient::new(&config.api).context("Failed to build API client")?;
        let db = CatalogDb::new(&config.db_path);
        Ok(Self { config, client, db })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn harvester(&self) -> Harvester<'_, SpotifyClient> {
        Harvester::new(&self.client, self.config.batch_sizes)
    }

    fn export(&self, table: &Table, dir: &Path, country: Option<&str>) -> Result<PathBuf> {
        export(table, dir, output_name(country))
            .with_context(|| format!("Failed to export {}", table.name()))
    }

    pub fn categories(&self, country: Option<&str>) -> Result<PathBuf> {
        let table = self
            .harvester()
            .fetch_categories(country)
            .context("Failed to fetch categories")?;
        self.export(&table, &self.config.categories_dir(), country)
    }

    pub fn playlists(&self, category_ids: &[String], country: Option<&str>) -> Result<PathBuf> {
        let table = self
            .harvester()
            .fetch_playlists(category_ids, country)
            .context("Failed to fetch playlists")?;
        self.export(&table, &self.config.playlists_dir(), country)
    }

    /// Top chart for `country`, or the global one when `None`.
    pub fn top_chart(&self, country: Option<&str>) -> Result<PathBuf> {
        let table = self
            .harvester()
            .fetch_top_chart(country)
            .context("Failed to fetch top chart")?;
        self.export(&table, &self.config.charts_dir(), country)
    }

    /// Fetch new releases and export them. With `save_ids`, also store the
    /// album ids as an id list and return its path.
    pub fn releases(&self, country: Option<&str>, save_ids: bool) -> Result<(Table, Option<PathBuf>)> {
        let table = self
            .harvester()
            .fetch_releases(country)
            .context("Failed to fetch new releases")?;
        self.export(&table, &self.config.albums_dir(), country)?;

        let list = if save_ids {
            let path = config_store::save(
                &self.config.id_lists_dir,
                &releases_list_name(country),
                ID_LIST_KEY,
                &table.column_strings("id"),
            )?;
            Some(path)
        } else {
            None
        };
        Ok((table, list))
    }

    pub fn album_tracks(&self, album_ids: &[String], country: Option<&str>) -> Result<Table> {
        let table = self
            .harvester()
            .fetch_album_tracks(album_ids, country)
            .context("Failed to fetch album tracks")?;
        self.export(&table, &self.config.album_tracks_dir(), country)?;
        Ok(table)
    }

    pub fn tracks_info(&self, track_ids: &[String], country: Option<&str>) -> Result<Table> {
        let table = self
            .harvester()
            .fetch_tracks_info(track_ids, country)
            .context("Failed to fetch tracks info")?;
        self.export(&table, &self.config.tracks_dir(), country)?;
        Ok(table)
    }

    pub fn artists_info(&self, artist_ids: &[String], country: Option<&str>) -> Result<Table> {
        let table = self
            .harvester()
            .fetch_artists_info(artist_ids)
            .context("Failed to fetch artists info")?;
        self.export(&table, &self.config.artists_dir(), country)?;
        Ok(table)
    }

    /// Artists first, so tracks can reference them.
    pub fn upsert_tables(&self, artists: &Table, tracks: &Table) -> Result<UpsertSummary> {
        let artists = self
            .db
            .upsert_artists(artists)
            .with_context(|| format!("Failed to upsert artists into {:?}", self.db.path()))?;
        let tracks = self
            .db
            .upsert_tracks(tracks)
            .with_context(|| format!("Failed to upsert tracks into {:?}", self.db.path()))?;
        let summary = UpsertSummary { artists, tracks };
        summary.log();
        Ok(summary)
    }

    /// Fetch info for the given tracks and their artists and upsert both.
    pub fn upsert(&self, track_ids: &[String], country: Option<&str>) -> Result<UpsertSummary> {
        let tracks = self.tracks_info(track_ids, country)?;
        let artists = self.artists_info(&tracks.column_strings("artist_id"), country)?;
        self.upsert_tables(&artists, &tracks)
    }

    /// The fixed pipeline: releases, album tracks, tracks info, artists info,
    /// then upsert artists and tracks.
    pub fn run(&self, country: Option<&str>) -> Result<RunSummary> {
        info!("Starting harvest for {}", output_name(country));

        let (releases, list) = self.releases(country, true)?;
        let list = list.context("Release id list was not saved")?;
        let album_ids = config_store::load(&list, ID_LIST_KEY)?;

        let album_tracks = self.album_tracks(&album_ids, country)?;
        let tracks = self.tracks_info(&album_tracks.column_strings("id"), country)?;
        let artists = self.artists_info(&tracks.column_strings("artist_id"), country)?;
        let upsert = self.upsert_tables(&artists, &tracks)?;

        let summary = RunSummary {
            releases: releases.len(),
            album_tracks: album_tracks.len(),
            tracks: tracks.len(),
            artists: artists.len(),
            upsert,
        };
        info!(
            "Harvest for {} done: {} releases, {} album tracks, {} tracks, {} artists",
            output_name(country),
            summary.releases,
            summary.album_tracks,
            summary.tracks,
            summary.artists
        );
        Ok(summary)
    }
}

/// Read the id list stored under `key` in `path`.
pub fn load_ids(path: &Path, key: &str) -> Result<Vec<String>> {
    let ids = config_store::load(path, key)?;
    info!("Loaded {} ids from {:?}", ids.len(), path);
    Ok(ids)
}
