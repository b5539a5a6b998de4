//! Wire types for the upstream catalog API.
//!
//! Only the fields the harvest actually reads are modelled; everything else in
//! the JSON is ignored. Entity ids are optional because the API hands out
//! objects without one (local playlist tracks, unavailable albums).

use serde::Deserialize;

use crate::pipeline::{CollectionPage, Cursor, Identified};

/// Paging object wrapping every collection response.
#[derive(Clone, Debug, Deserialize)]
pub struct Paging<T> {
    pub items: Vec<T>,
    pub next: Option<String>,
}

impl<T> From<Paging<T>> for CollectionPage<T> {
    fn from(paging: Paging<T>) -> Self {
        CollectionPage::new(paging.items, paging.next.map(Cursor::new))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct CategoriesResponse {
    pub categories: Paging<Category>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Category {
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistsResponse {
    pub playlists: Paging<Option<SimplifiedPlaylist>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimplifiedPlaylist {
    pub id: String,
    pub name: String,
}

/// A playlist slot. `track` is null when the track was removed from the catalog.
#[derive(Clone, Debug, Deserialize)]
pub struct PlaylistItem {
    pub track: Option<FullTrack>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct NewReleasesResponse {
    pub albums: Paging<SimplifiedAlbum>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimplifiedAlbum {
    pub id: Option<String>,
    pub name: String,
    pub release_date: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimplifiedArtist {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct SimplifiedTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
}

impl SimplifiedTrack {
    /// The first credited artist, which the tables treat as the track's artist.
    pub fn main_artist(&self) -> Option<&SimplifiedArtist> {
        self.artists.first()
    }
}

/// Reference to the track that was requested when the API relinked it to a
/// playable substitute for the market.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkedFrom {
    pub id: Option<String>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FullTrack {
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<SimplifiedArtist>,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub linked_from: Option<LinkedFrom>,
    pub album: Option<SimplifiedAlbum>,
}

impl FullTrack {
    pub fn main_artist(&self) -> Option<&SimplifiedArtist> {
        self.artists.first()
    }
}

impl Identified for FullTrack {
    /// The requested id: a relinked track answers for the one in `linked_from`.
    fn id(&self) -> Option<&str> {
        self.linked_from
            .as_ref()
            .and_then(|linked| linked.id.as_deref())
            .or(self.id.as_deref())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct TracksResponse {
    pub tracks: Vec<Option<FullTrack>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Followers {
    pub total: Option<u64>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct FullArtist {
    pub id: Option<String>,
    pub name: String,
    pub popularity: Option<u32>,
    #[serde(default)]
    pub genres: Vec<String>,
    pub followers: Option<Followers>,
}

impl Identified for FullArtist {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct ArtistsResponse {
    pub artists: Vec<Option<FullArtist>>,
}

#[derive(Clone, Debug, Deserialize, PartialEq)]
pub struct AudioFeatures {
    pub id: Option<String>,
    pub danceability: f64,
    pub energy: f64,
    pub key: i32,
    pub loudness: f64,
    pub mode: i32,
    pub speechiness: f64,
    pub acousticness: f64,
    pub instrumentalness: f64,
    pub liveness: f64,
    pub valence: f64,
    pub tempo: f64,
    pub duration_ms: i64,
    pub time_signature: i32,
}

impl Identified for AudioFeatures {
    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AudioFeaturesResponse {
    pub audio_features: Vec<Option<AudioFeatures>>,
}

/// Client-credentials token response.
#[derive(Clone, Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_into_collection_page() {
        let paging: Paging<Category> = serde_json::from_str(
            r#"{
                "href": "https://api.spotify.com/v1/browse/categories?offset=0&limit=2",
                "items": [{"id": "toplists", "name": "Top Lists", "icons": []}],
                "limit": 2,
                "next": "https://api.spotify.com/v1/browse/categories?offset=2&limit=2",
                "offset": 0,
                "total": 3
            }"#,
        )
        .unwrap();

        let page: CollectionPage<Category> = paging.into();
        assert_eq!(page.items.len(), 1);
        assert_eq!(
            page.next.as_ref().map(Cursor::as_str),
            Some("https://api.spotify.com/v1/browse/categories?offset=2&limit=2")
        );
    }

    #[test]
    fn test_last_page_has_no_cursor() {
        let paging: Paging<Category> =
            serde_json::from_str(r#"{"items": [], "next": null}"#).unwrap();
        let page: CollectionPage<Category> = paging.into();
        assert!(page.next.is_none());
    }

    #[test]
    fn test_removed_playlist_track_is_null() {
        let items: Vec<PlaylistItem> = serde_json::from_str(
            r#"[
                {"added_at": "2024-01-01T00:00:00Z", "track": null},
                {"track": {"id": "t1", "name": "Song", "popularity": 80,
                           "artists": [{"id": "a1", "name": "Band"}, {"id": "a2", "name": "Guest"}]}}
            ]"#,
        )
        .unwrap();

        assert!(items[0].track.is_none());
        let track = items[1].track.as_ref().unwrap();
        assert_eq!(track.main_artist().and_then(|a| a.id.as_deref()), Some("a1"));
    }

    #[test]
    fn test_batch_lookup_with_null_entries() {
        let response: AudioFeaturesResponse = serde_json::from_str(
            r#"{"audio_features": [null, {
                "id": "t2", "danceability": 0.5, "energy": 0.8, "key": 5,
                "loudness": -6.2, "mode": 1, "speechiness": 0.04,
                "acousticness": 0.1, "instrumentalness": 0.000012,
                "liveness": 0.3, "valence": 0.6, "tempo": 120.0,
                "duration_ms": 210000, "time_signature": 4,
                "type": "audio_features", "uri": "spotify:track:t2"
            }]}"#,
        )
        .unwrap();

        assert!(response.audio_features[0].is_none());
        assert_eq!(
            response.audio_features[1].as_ref().and_then(|f| f.id()),
            Some("t2")
        );
    }

    #[test]
    fn test_relinked_track_answers_for_the_requested_id() {
        let response: TracksResponse = serde_json::from_str(
            r#"{"tracks": [
                {"id": "t1", "name": "Plain", "artists": [], "popularity": 10, "album": null},
                {"id": "t2-substitute", "name": "Relinked", "artists": [], "popularity": 20,
                 "is_playable": true,
                 "linked_from": {"id": "t2", "type": "track", "uri": "spotify:track:t2"},
                 "album": null}
            ]}"#,
        )
        .unwrap();

        let ids: Vec<_> = response.tracks.iter().flatten().map(|t| t.id()).collect();
        assert_eq!(ids, vec![Some("t1"), Some("t2")]);
    }

    #[test]
    fn test_artist_without_genres() {
        let artist: FullArtist = serde_json::from_str(
            r#"{"id": "a1", "name": "Band", "popularity": 40, "followers": {"href": null, "total": 1200}}"#,
        )
        .unwrap();
        assert!(artist.genres.is_empty());
        assert_eq!(artist.followers.and_then(|f| f.total), Some(1200));
    }
}
