//! Access to the upstream music catalog.
//!
//! [`CatalogApi`] is the seam between the harvest operations and HTTP: paged
//! collections come back one [`CollectionPage`] at a time, batch lookups return
//! one slot per requested id (null where the API has no entity).

mod client;
mod error;
pub mod models;
mod retry_policy;

pub use client::{Credentials, SpotifyClient};
pub use error::ApiError;
pub use retry_policy::RetryPolicy;

use models::{AudioFeatures, Category, FullArtist, FullTrack, PlaylistItem, SimplifiedAlbum, SimplifiedPlaylist, SimplifiedTrack};

use crate::pipeline::{CollectionPage, Cursor};

/// Largest page the collection endpoints hand out.
pub const MAX_PAGE_SIZE: u32 = 50;
/// Most ids accepted by one `/tracks` lookup.
pub const MAX_TRACKS_PER_LOOKUP: usize = 50;
/// Most ids accepted by one `/artists` lookup.
pub const MAX_ARTISTS_PER_LOOKUP: usize = 50;
/// Most ids accepted by one `/audio-features` lookup.
pub const MAX_AUDIO_FEATURES_PER_LOOKUP: usize = 100;

/// Upstream catalog operations used by the harvest.
///
/// A `None` cursor requests the first page; otherwise the cursor from the
/// previous page is followed as-is.
pub trait CatalogApi {
    fn categories_page(
        &self,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Category>, ApiError>;

    fn category_playlists_page(
        &self,
        category_id: &str,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Option<SimplifiedPlaylist>>, ApiError>;

    fn playlist_items_page(
        &self,
        playlist_id: &str,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<PlaylistItem>, ApiError>;

    fn new_releases_page(
        &self,
        country: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<SimplifiedAlbum>, ApiError>;

    fn album_tracks_page(
        &self,
        album_id: &str,
        market: Option<&str>,
        cursor: Option<&Cursor>,
    ) -> Result<CollectionPage<Option<SimplifiedTrack>>, ApiError>;

    /// Full track objects for up to [`MAX_TRACKS_PER_LOOKUP`] ids.
    fn tracks(&self, ids: &[String], market: Option<&str>) -> Result<Vec<Option<FullTrack>>, ApiError>;

    /// Full artist objects for up to [`MAX_ARTISTS_PER_LOOKUP`] ids.
    fn artists(&self, ids: &[String]) -> Result<Vec<Option<FullArtist>>, ApiError>;

    /// Audio features for up to [`MAX_AUDIO_FEATURES_PER_LOOKUP`] ids.
    fn audio_features(&self, ids: &[String]) -> Result<Vec<Option<AudioFeatures>>, ApiError>;
}
