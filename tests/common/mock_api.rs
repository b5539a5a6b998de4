//! An httpmock server standing in for the upstream catalog API.

use httpmock::prelude::*;
use httpmock::Mock;
use serde_json::{json, Value};
use std::path::Path;

use catalog_harvest::config::{AppConfig, CliConfig, FileConfig, RetryConfig};

use super::constants::*;

pub struct MockApi {
    pub server: MockServer,
}

impl MockApi {
    pub fn start() -> Self {
        Self {
            server: MockServer::start(),
        }
    }

    pub fn api_url(&self, path: &str) -> String {
        self.server.url(format!("{}{}", API_PREFIX, path))
    }

    /// Config pointing at the mock server, writing everything under `dir`.
    /// Retries are fast so failure tests stay quick.
    pub fn config(&self, dir: &Path) -> AppConfig {
        let cli = CliConfig {
            api_base_url: self.api_url(""),
            auth_url: self.server.url(TOKEN_PATH),
            client_id: Some(CLIENT_ID.to_string()),
            client_secret: Some(CLIENT_SECRET.to_string()),
            page_size: 2,
            output_dir: dir.join("data"),
            id_lists_dir: dir.join("config"),
            db_path: dir.join("catalog.db"),
            ..Default::default()
        };
        let file = FileConfig {
            retry: Some(RetryConfig {
                max_retries: Some(2),
                initial_backoff_ms: Some(1),
                max_backoff_ms: Some(5),
                backoff_multiplier: Some(2.0),
            }),
            ..Default::default()
        };
        AppConfig::resolve(&cli, Some(file)).unwrap()
    }

    pub fn mock_token(&self) -> Mock<'_> {
        self.server.mock(|when, then| {
            when.method(POST)
                .path(TOKEN_PATH)
                .header_exists("authorization")
                .body("grant_type=client_credentials");
            then.status(200).json_body(json!({
                "access_token": ACCESS_TOKEN,
                "token_type": "Bearer",
                "expires_in": 3600
            }));
        })
    }

    /// Serve `body` for an authenticated GET of `path` at `offset`.
    pub fn mock_page(&self, path: &str, offset: u32, body: Value) -> Mock<'_> {
        let full_path = format!("{}{}", API_PREFIX, path);
        self.server.mock(|when, then| {
            when.method(GET)
                .path(full_path)
                .query_param("offset", offset.to_string())
                .header("authorization", format!("Bearer {}", ACCESS_TOKEN));
            then.status(200).json_body(body);
        })
    }

    /// Serve `body` for a batched lookup of exactly `ids`.
    pub fn mock_lookup(&self, path: &str, ids: &[&str], body: Value) -> Mock<'_> {
        let full_path = format!("{}{}", API_PREFIX, path);
        self.server.mock(|when, then| {
            when.method(GET)
                .path(full_path)
                .query_param("ids", ids.join(","))
                .header("authorization", format!("Bearer {}", ACCESS_TOKEN));
            then.status(200).json_body(body);
        })
    }

    /// Paging object for `items`, linking to `next_offset` when given.
    pub fn paging(&self, path: &str, items: Value, next_offset: Option<u32>) -> Value {
        let next = next_offset.map(|offset| self.api_url(&format!("{}?offset={}&limit=2", path, offset)));
        json!({ "items": items, "next": next })
    }

    /// Two pages of new releases; album-2 appears on both.
    pub fn mock_new_releases(&self) -> (Mock<'_>, Mock<'_>) {
        let path = "/browse/new-releases";
        let first = self.mock_page(
            path,
            0,
            json!({ "albums": self.paging(path, json!([album(ALBUM_1_ID, "First"), album(ALBUM_2_ID, "Second")]), Some(2)) }),
        );
        let second = self.mock_page(
            path,
            2,
            json!({ "albums": self.paging(path, json!([album(ALBUM_2_ID, "Second"), album(ALBUM_3_ID, "Third")]), None) }),
        );
        (first, second)
    }

    pub fn mock_album_tracks(&self) -> Vec<Mock<'_>> {
        let tracks = [
            (ALBUM_1_ID, json!([simple_track(TRACK_1_ID, ARTIST_1_ID), simple_track(TRACK_2_ID, ARTIST_1_ID)])),
            (ALBUM_2_ID, json!([simple_track(TRACK_3_ID, ARTIST_2_ID)])),
            (ALBUM_3_ID, json!([simple_track(TRACK_1_ID, ARTIST_1_ID), null])),
        ];
        tracks
            .into_iter()
            .map(|(album_id, items)| {
                let path = format!("/albums/{}/tracks", album_id);
                let body = self.paging(&path, items, None);
                self.mock_page(&path, 0, body)
            })
            .collect()
    }

    /// Features for track-1 and track-3; track-2 has none.
    pub fn mock_audio_features(&self) -> Mock<'_> {
        self.mock_lookup(
            "/audio-features",
            &[TRACK_1_ID, TRACK_2_ID, TRACK_3_ID],
            json!({ "audio_features": [features(TRACK_1_ID), null, features(TRACK_3_ID)] }),
        )
    }

    pub fn mock_tracks(&self) -> Mock<'_> {
        self.mock_lookup(
            "/tracks",
            &[TRACK_1_ID, TRACK_2_ID, TRACK_3_ID],
            json!({ "tracks": [
                full_track(TRACK_1_ID, "Song One", 71, ARTIST_1_ID),
                full_track(TRACK_2_ID, "Song Two", 35, ARTIST_1_ID),
                full_track(TRACK_3_ID, "Song Three", 52, ARTIST_2_ID)
            ] }),
        )
    }

    /// artist-2 is unknown upstream.
    pub fn mock_artists(&self) -> Mock<'_> {
        self.mock_lookup(
            "/artists",
            &[ARTIST_1_ID, ARTIST_2_ID],
            json!({ "artists": [
                {
                    "id": ARTIST_1_ID,
                    "name": "The Band",
                    "popularity": 64,
                    "genres": ["russian rock", "indie"],
                    "followers": { "href": null, "total": 120000 }
                },
                null
            ] }),
        )
    }
}

pub fn album(id: &str, name: &str) -> Value {
    json!({
        "album_type": "album",
        "id": id,
        "name": name,
        "release_date": "2024-03-01",
        "release_date_precision": "day"
    })
}

pub fn simple_track(id: &str, artist_id: &str) -> Value {
    json!({
        "id": id,
        "name": format!("Track {}", id),
        "artists": [{ "id": artist_id, "name": format!("Artist {}", artist_id) }]
    })
}

pub fn full_track(id: &str, name: &str, popularity: u32, artist_id: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "popularity": popularity,
        "artists": [{ "id": artist_id, "name": format!("Artist {}", artist_id) }],
        "album": { "id": "album-x", "name": "Album", "release_date": "2024-03-01" }
    })
}

pub fn features(id: &str) -> Value {
    json!({
        "id": id,
        "danceability": 0.51234,
        "energy": 0.8,
        "key": 5,
        "loudness": -6.25,
        "mode": 1,
        "speechiness": 0.0412,
        "acousticness": 0.12,
        "instrumentalness": 0.0000123456,
        "liveness": 0.3,
        "valence": 0.6,
        "tempo": 121.5,
        "duration_ms": 210000,
        "time_signature": 4
    })
}
