//! Catalog harvest operations.
//!
//! Each operation walks one or more upstream collections, dedupes by id,
//! enriches through batched lookups where needed and hands back a [`Table`].

pub mod rows;
pub mod schemas;

use std::path::{Path, PathBuf};

use tracing::info;

use crate::api::{ApiError, CatalogApi};
use crate::config::BatchSizes;
use crate::pipeline::{
    dedupe, dedupe_ids, enrich, to_flat_file, walk_all, Correlation, Record, Schema, SinkError,
    SortKey, Table, TableBuilder,
};
use schemas::{
    with_audio_features, ALBUM_TRACK_COLUMNS, ARTIST_COLUMNS, CATEGORY_COLUMNS, CHART_COLUMNS,
    PLAYLIST_COLUMNS, RELEASE_COLUMNS, TRACK_COLUMNS,
};

/// Category whose playlists are the platform's top charts.
pub const TOP_LISTS_CATEGORY: &str = "toplists";

/// File stem for outputs not tied to a country.
pub const GLOBAL: &str = "Global";

/// Today's UTC date as stored in the `update` column.
pub fn today() -> String {
    chrono::Utc::now().format("%Y-%m-%d").to_string()
}

/// Output file stem for `country`.
pub fn output_name(country: Option<&str>) -> &str {
    country.unwrap_or(GLOBAL)
}

/// Write `table` to `<dir>/<name>.csv` and return the path.
pub fn export(table: &Table, dir: &Path, name: &str) -> Result<PathBuf, SinkError> {
    let path = dir.join(format!("{}.csv", name));
    to_flat_file(table, &path)?;
    info!("Exported {} {} rows to {:?}", table.len(), table.name(), path);
    Ok(path)
}

fn schema(columns: &[&str]) -> Schema {
    Schema::new(columns.iter().copied())
}

pub struct Harvester<'a, A: CatalogApi + ?Sized> {
    api: &'a A,
    batch_sizes: BatchSizes,
    update: String,
}

impl<'a, A: CatalogApi + ?Sized> Harvester<'a, A> {
    pub fn new(api: &'a A, batch_sizes: BatchSizes) -> Self {
        Self {
            api,
            batch_sizes,
            update: today(),
        }
    }

    /// Pin the date written to `update` columns.
    pub fn with_update_date(mut self, date: impl Into<String>) -> Self {
        self.update = date.into();
        self
    }

    pub fn fetch_categories(&self, country: Option<&str>) -> Result<Table, ApiError> {
        let categories = walk_all(|cursor| self.api.categories_page(country, cursor))?;
        let categories = dedupe(categories, |c| Some(c.id.clone()));

        let table = TableBuilder::new("categories", schema(CATEGORY_COLUMNS)).build(
            categories.iter().map(|c| {
                Record::new()
                    .with("category_name", c.name.as_str())
                    .with("category_id", c.id.as_str())
            }),
        );
        info!("Fetched {} categories for {}", table.len(), output_name(country));
        Ok(table)
    }

    pub fn fetch_playlists(
        &self,
        category_ids: &[String],
        country: Option<&str>,
    ) -> Result<Table, ApiError> {
        let mut playlists = Vec::new();
        for category_id in category_ids {
            let page_items = walk_all(|cursor| {
                self.api
                    .category_playlists_page(category_id, country, cursor)
            })?;
            playlists.extend(page_items.into_iter().flatten());
        }
        let playlists = dedupe(playlists, |p| Some(p.id.clone()));

        let table = TableBuilder::new("playlists", schema(PLAYLIST_COLUMNS)).build(
            playlists.iter().map(|p| {
                Record::new()
                    .with("name", p.name.as_str())
                    .with("id", p.id.as_str())
            }),
        );
        info!(
            "Fetched {} playlists from {} categories",
            table.len(),
            category_ids.len()
        );
        Ok(table)
    }

    /// Tracks of the given playlists, most popular first.
    pub fn fetch_chart(&self, playlist_ids: &[String]) -> Result<Table, ApiError> {
        let mut tracks = Vec::new();
        for playlist_id in playlist_ids {
            let items = walk_all(|cursor| self.api.playlist_items_page(playlist_id, cursor))?;
            tracks.extend(items.into_iter().filter_map(|item| item.track));
        }
        let tracks = dedupe(tracks, |t| t.id.clone());

        let table = TableBuilder::new("chart", schema(CHART_COLUMNS))
            .sorted_by(vec![
                SortKey::descending("track_popularity"),
                SortKey::ascending("name"),
            ])
            .build(tracks.iter().map(rows::chart_entry));
        info!(
            "Built chart of {} tracks from {} playlists",
            table.len(),
            playlist_ids.len()
        );
        Ok(table)
    }

    /// Chart of the top-list playlists for `country`, or the global ones.
    pub fn fetch_top_chart(&self, country: Option<&str>) -> Result<Table, ApiError> {
        let playlists = self.fetch_playlists(&[TOP_LISTS_CATEGORY.to_string()], country)?;
        self.fetch_chart(&playlists.column_strings("id"))
    }

    pub fn fetch_global_top(&self) -> Result<Table, ApiError> {
        self.fetch_top_chart(None)
    }

    pub fn fetch_releases(&self, country: Option<&str>) -> Result<Table, ApiError> {
        let albums = walk_all(|cursor| self.api.new_releases_page(country, cursor))?;
        let albums = dedupe(albums, |a| a.id.clone());

        let table = TableBuilder::new("releases", schema(RELEASE_COLUMNS))
            .build(albums.iter().map(rows::release));
        info!("Fetched {} new releases for {}", table.len(), output_name(country));
        Ok(table)
    }

    /// Every track of the given albums with its audio features.
    pub fn fetch_album_tracks(
        &self,
        album_ids: &[String],
        market: Option<&str>,
    ) -> Result<Table, ApiError> {
        let album_ids = dedupe_ids(album_ids.iter().map(String::as_str));
        let mut tracks = Vec::new();
        for album_id in &album_ids {
            let items = walk_all(|cursor| self.api.album_tracks_page(album_id, market, cursor))?;
            tracks.extend(items.into_iter().flatten());
        }
        let tracks = dedupe(tracks, |t| t.id.clone());
        let track_ids: Vec<String> = tracks.iter().filter_map(|t| t.id.clone()).collect();

        let features = enrich(
            &track_ids,
            self.batch_sizes.audio_features,
            Correlation::ById,
            |chunk| self.api.audio_features(chunk),
        )?;

        let columns = with_audio_features(ALBUM_TRACK_COLUMNS);
        let table = TableBuilder::new("album_tracks", schema(&columns)).build(tracks.iter().map(
            |track| {
                let mut record = rows::album_track(track);
                let found = track.id.as_deref().and_then(|id| features.get(id));
                record.merge(rows::raw_features(found));
                record
            },
        ));
        info!(
            "Fetched {} tracks from {} albums ({} with audio features, {} lookups)",
            table.len(),
            album_ids.len(),
            features.hits(),
            features.lookup_calls()
        );
        Ok(table)
    }

    /// `track` table rows for `track_ids`: one row per distinct id, with
    /// track metadata and rounded audio features where the API has them.
    pub fn fetch_tracks_info(
        &self,
        track_ids: &[String],
        market: Option<&str>,
    ) -> Result<Table, ApiError> {
        let ids = dedupe_ids(track_ids.iter().map(String::as_str));

        let tracks = enrich(&ids, self.batch_sizes.tracks, Correlation::ById, |chunk| {
            self.api.tracks(chunk, market)
        })?;
        let features = enrich(
            &ids,
            self.batch_sizes.audio_features,
            Correlation::ById,
            |chunk| self.api.audio_features(chunk),
        )?;

        let table = TableBuilder::new("track", schema(&with_audio_features(TRACK_COLUMNS))).build(
            ids.iter()
                .map(|id| rows::track_info(id, tracks.get(id), features.get(id), &self.update)),
        );
        info!(
            "Fetched info for {} tracks ({} found, {} with audio features)",
            table.len(),
            tracks.hits(),
            features.hits()
        );
        Ok(table)
    }

    /// `artist` table rows for `artist_ids`, one per distinct id.
    pub fn fetch_artists_info(&self, artist_ids: &[String]) -> Result<Table, ApiError> {
        let ids = dedupe_ids(artist_ids.iter().map(String::as_str));

        let artists = enrich(&ids, self.batch_sizes.artists, Correlation::ById, |chunk| {
            self.api.artists(chunk)
        })?;

        let table = TableBuilder::new("artist", schema(ARTIST_COLUMNS)).build(
            ids.iter()
                .map(|id| rows::artist_info(id, artists.get(id), &self.update)),
        );
        info!(
            "Fetched info for {} artists ({} found)",
            table.len(),
            artists.hits()
        );
        Ok(table)
    }
}
