//! Turning API objects into table records.

use crate::api::models::{AudioFeatures, FullArtist, FullTrack, SimplifiedAlbum, SimplifiedTrack};
use crate::pipeline::Record;

/// Round `value` to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

pub fn release(album: &SimplifiedAlbum) -> Record {
    Record::new()
        .with("name", album.name.as_str())
        .with("id", album.id.clone())
        .with("release_date", album.release_date.clone())
}

pub fn chart_entry(track: &FullTrack) -> Record {
    let artist = track.main_artist();
    Record::new()
        .with("id", track.id.clone())
        .with("name", track.name.as_str())
        .with("artist_id", artist.and_then(|a| a.id.clone()))
        .with("artist_name", artist.map(|a| a.name.as_str()))
        .with("track_popularity", track.popularity)
}

pub fn album_track(track: &SimplifiedTrack) -> Record {
    let artist = track.main_artist();
    Record::new()
        .with("id", track.id.clone())
        .with("name", track.name.as_str())
        .with("artist_id", artist.and_then(|a| a.id.clone()))
        .with("artist_name", artist.map(|a| a.name.as_str()))
}

/// Audio features as the API reports them.
pub fn raw_features(features: Option<&AudioFeatures>) -> Record {
    let Some(f) = features else {
        return Record::new();
    };
    Record::new()
        .with("danceability", f.danceability)
        .with("energy", f.energy)
        .with("key", i64::from(f.key))
        .with("loudness", f.loudness)
        .with("mode", i64::from(f.mode))
        .with("speechiness", f.speechiness)
        .with("acousticness", f.acousticness)
        .with("instrumentalness", f.instrumentalness)
        .with("liveness", f.liveness)
        .with("valence", f.valence)
        .with("tempo", f.tempo)
        .with("duration_ms", f.duration_ms)
        .with("time_signature", i64::from(f.time_signature))
}

/// Audio features as stored in the `track` table: ratios rounded to 3
/// decimals (instrumentalness to 7, it lives near zero) and `mode` as a flag.
pub fn stored_features(features: Option<&AudioFeatures>) -> Record {
    let Some(f) = features else {
        return Record::new();
    };
    Record::new()
        .with("danceability", round_to(f.danceability, 3))
        .with("energy", round_to(f.energy, 3))
        .with("key", i64::from(f.key))
        .with("loudness", round_to(f.loudness, 3))
        .with("mode", f.mode != 0)
        .with("speechiness", round_to(f.speechiness, 3))
        .with("acousticness", round_to(f.acousticness, 3))
        .with("instrumentalness", round_to(f.instrumentalness, 7))
        .with("liveness", round_to(f.liveness, 3))
        .with("valence", round_to(f.valence, 3))
        .with("tempo", round_to(f.tempo, 3))
        .with("duration_ms", f.duration_ms)
        .with("time_signature", i64::from(f.time_signature))
}

/// A `track` row for `id`. Missing lookups leave their columns null.
pub fn track_info(
    id: &str,
    track: Option<&FullTrack>,
    features: Option<&AudioFeatures>,
    update: &str,
) -> Record {
    let mut record = Record::new().with("id", id).with("update", update);
    if let Some(track) = track {
        record.set("name", track.name.as_str());
        record.set("artist_id", track.main_artist().and_then(|a| a.id.clone()));
        record.set("popularity", track.popularity);
        record.set(
            "release_date",
            track.album.as_ref().and_then(|a| a.release_date.clone()),
        );
    }
    record.merge(stored_features(features));
    record
}

/// An `artist` row for `id`. Missing lookups leave their columns null.
pub fn artist_info(id: &str, artist: Option<&FullArtist>, update: &str) -> Record {
    let mut record = Record::new().with("id", id).with("update", update);
    if let Some(artist) = artist {
        let genre = (!artist.genres.is_empty()).then(|| artist.genres.join(", "));
        let followers = artist
            .followers
            .as_ref()
            .and_then(|f| f.total)
            .and_then(|total| i64::try_from(total).ok());
        record.set("name", artist.name.as_str());
        record.set("popularity", artist.popularity);
        record.set("genre", genre);
        record.set("followers", followers);
    }
    record
}
