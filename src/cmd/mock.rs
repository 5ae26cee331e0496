//! Mock REST server command: `sprintboard mock-server`.

use anyhow::Result;

pub async fn cmd_mock_server(host: &str, port: u16, seed: bool) -> Result<()> {
    sprintboard::mock::start_server(sprintboard::mock::ServerConfig {
        host: host.to_string(),
        port,
        seed,
    })
    .await
}
