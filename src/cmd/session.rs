//! Session commands: `sprintboard login` and `sprintboard logout`.
//!
//! The token is kept in the global config file so later commands pick it up.

use std::path::PathBuf;

use anyhow::{Context, Result};
use sprintboard::config::{BoardConfig, BoardToml};

fn global_config_path() -> Result<PathBuf> {
    BoardConfig::global_path().context("No config directory on this platform")
}

fn store_token(token: Option<String>) -> Result<PathBuf> {
    let path = global_config_path()?;
    let mut toml = if path.exists() {
        BoardToml::load(&path)?
    } else {
        BoardToml::default()
    };
    toml.api.token = token;
    toml.save(&path)?;
    Ok(path)
}

pub async fn cmd_login(config: &BoardConfig, email: &str, password: Option<String>) -> Result<()> {
    let password = match password {
        Some(p) => p,
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .context("Failed to read password")?,
    };

    let conn = super::connect(config)?;
    let response = conn
        .client
        .login(email, &password)
        .await
        .context("Login failed")?;
    let path = store_token(Some(response.token))?;

    match response.user {
        Some(user) => println!("Logged in as {}", user.name),
        None => println!("Logged in"),
    }
    println!("Token saved to {}", path.display());
    Ok(())
}

pub fn cmd_logout() -> Result<()> {
    let path = global_config_path()?;
    if !path.exists() {
        println!("Not logged in");
        return Ok(());
    }
    store_token(None)?;
    println!("Logged out");
    Ok(())
}
