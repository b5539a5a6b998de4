//! Common test infrastructure
//!
//! Tests should only import from this module, not from internal submodules.
//!
//! # Example
//!
//! ```no_run
//! mod common;
//! use common::MockApi;
//!
//! #[test]
//! fn test_releases() {
//!     let api = MockApi::start();
//!     api.mock_token();
//!     api.mock_new_releases();
//!     // drive the client or a Session against api.config(dir)
//! }
//! ```

mod constants;
mod mock_api;

pub use constants::*;
#[allow(unused_imports)]
pub use mock_api::{album, features, full_track, simple_track, MockApi};
