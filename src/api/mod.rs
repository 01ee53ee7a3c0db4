//! HTTP front end.
//!
//! A server-rendered page with a profit calculator tab and a description
//! generator tab, report downloads, and a JSON API for scripted use.

mod routes;
pub mod types;
pub mod ui;

pub use routes::{router, serve, AppState};
