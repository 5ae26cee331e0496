//! In-memory sprint board REST API for local runs and integration tests.

pub mod api;
pub mod db;
pub mod server;

pub use db::BoardDb;
pub use server::{ServerConfig, build_router, spawn, start_server};
