pub mod ai;
pub mod api;
pub mod config;
pub mod divide;
pub mod errors;
pub mod logging;
pub mod mock;
pub mod models;
pub mod store;
