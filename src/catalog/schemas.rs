//! Column layouts of every table the harvest produces.

pub const CATEGORY_COLUMNS: &[&str] = &["category_name", "category_id"];

pub const PLAYLIST_COLUMNS: &[&str] = &["name", "id"];

pub const CHART_COLUMNS: &[&str] = &["id", "name", "artist_id", "artist_name", "track_popularity"];

pub const RELEASE_COLUMNS: &[&str] = &["name", "id", "release_date"];

pub const AUDIO_FEATURE_COLUMNS: &[&str] = &[
    "danceability",
    "energy",
    "key",
    "loudness",
    "mode",
    "speechiness",
    "acousticness",
    "instrumentalness",
    "liveness",
    "valence",
    "tempo",
    "duration_ms",
    "time_signature",
];

pub const ALBUM_TRACK_COLUMNS: &[&str] = &["id", "name", "artist_id", "artist_name"];

/// Leading columns of the `track` table; audio features follow.
pub const TRACK_COLUMNS: &[&str] = &["id", "name", "artist_id", "popularity", "release_date", "update"];

pub const ARTIST_COLUMNS: &[&str] = &["id", "name", "popularity", "genre", "followers", "update"];

/// `columns` followed by the audio feature columns.
pub fn with_audio_features(columns: &[&'static str]) -> Vec<&'static str> {
    columns.iter().chain(AUDIO_FEATURE_COLUMNS).copied().collect()
}
