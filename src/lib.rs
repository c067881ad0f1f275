//! Community polling backend: polls, one vote per user per poll, and token
//! rewards for taking part.
//!
//! Every collection lives in one document that is loaded, mutated and saved
//! whole. See [`db::connection::DocumentStore`] for the available backends.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod polls;
pub mod response;
pub mod retry;
pub mod rewards;
pub mod sse;
pub mod startup;
pub mod users;
pub mod utils;
