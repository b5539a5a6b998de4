//! Harvests music catalog data (categories, charts, new releases, tracks and
//! artists) from a paginated web API into CSV files and a SQLite database.

pub mod api;
pub mod catalog;
pub mod commands;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod store;

pub use api::{ApiError, CatalogApi, SpotifyClient};
pub use commands::Session;
pub use config::{AppConfig, CliConfig, FileConfig};
