//! REST gateway: the `Gateway` seam and its reqwest implementation.

mod client;
mod gateway;

pub use client::{ApiClient, LoginResponse};
pub use gateway::Gateway;
