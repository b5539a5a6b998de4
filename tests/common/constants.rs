//! Shared constants for end-to-end tests

pub const CLIENT_ID: &str = "test-client-id";
pub const CLIENT_SECRET: &str = "test-client-secret";
pub const ACCESS_TOKEN: &str = "test-access-token";

/// Path prefix the mock API is served under.
pub const API_PREFIX: &str = "/v1";
pub const TOKEN_PATH: &str = "/api/token";

pub const COUNTRY: &str = "RU";

pub const ALBUM_1_ID: &str = "album-1";
pub const ALBUM_2_ID: &str = "album-2";
pub const ALBUM_3_ID: &str = "album-3";

pub const TRACK_1_ID: &str = "track-1";
pub const TRACK_2_ID: &str = "track-2";
pub const TRACK_3_ID: &str = "track-3";

/// Known to the artist lookup.
pub const ARTIST_1_ID: &str = "artist-1";
/// Unknown to the artist lookup, so its row cannot be stored.
pub const ARTIST_2_ID: &str = "artist-2";
