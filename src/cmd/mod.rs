//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled              |
//! |------------|-------------------------------|
//! | `tasks`    | `Tasks`                       |
//! | `sprints`  | `Sprints`                     |
//! | `divide`   | `Divide`, `Suggest`           |
//! | `session`  | `Login`, `Logout`             |
//! | `config`   | `Config`                      |
//! | `mock`     | `MockServer`                  |

pub mod config;
pub mod divide;
pub mod mock;
pub mod session;
pub mod sprints;
pub mod tasks;

use std::sync::Arc;

use anyhow::{Context, Result};
use sprintboard::ai::GeminiDivisionService;
use sprintboard::api::{ApiClient, Gateway};
use sprintboard::config::BoardConfig;
use sprintboard::store::EntityStore;

pub use config::cmd_config;
pub use divide::{cmd_divide, cmd_suggest};
pub use mock::cmd_mock_server;
pub use session::{cmd_login, cmd_logout};
pub use sprints::cmd_sprints;
pub use tasks::cmd_tasks;

/// Connected services shared by the commands.
pub struct Connection {
    pub client: Arc<ApiClient>,
    pub store: Arc<EntityStore>,
    pub divider: Arc<GeminiDivisionService>,
}

pub fn connect(config: &BoardConfig) -> Result<Connection> {
    let client = Arc::new(
        ApiClient::new(config.api())
            .with_context(|| format!("Failed to create client for {}", config.api().base_url))?,
    );
    let gateway: Arc<dyn Gateway> = client.clone();
    Ok(Connection {
        client,
        store: Arc::new(EntityStore::new(gateway.clone())),
        divider: Arc::new(GeminiDivisionService::with_settings(
            gateway,
            config.division(),
        )),
    })
}
