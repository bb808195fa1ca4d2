//! HTTP surface of the institution link and transaction sync service.

pub mod api;
pub mod config;
pub mod error;
pub mod main_lib;

pub use main_lib::{build_state, build_state_with_client, init_tracing, AppState};
