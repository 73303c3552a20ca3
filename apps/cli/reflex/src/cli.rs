//! Command-line interface.
//!
//! # Usage
//!
//! ```bash
//! # Attach to a running page server
//! reflex http://localhost:3000/counter
//!
//! # Write a default config file
//! reflex init-config
//! ```

use crate::error::ReflexError;

use reflex_client::config::ClientConfig;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

const APP_DIR_NAME: &str = "reflex";
const LOG_DIR_NAME: &str = "logs";

/// Terminal client for server-rendered reflex pages
#[derive(Parser, Debug)]
#[command(name = "reflex")]
#[command(about = "Drive a server-rendered page from the terminal")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Address of the page to attach to (http, https, ws or wss)
    #[arg(env = "REFLEX_PAGE_URL")]
    pub page_url: Option<String>,

    /// Directory holding config.json
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Delay between reconnect attempts, overriding the config file
    #[arg(long)]
    pub retry_delay_ms: Option<u64>,

    /// Directory for reflex.log
    #[arg(long)]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Write a config file with default values
    InitConfig,
}

impl Cli {
    /// Config directory from the flag, else `<config dir>/reflex`.
    ///
    /// # Errors
    ///
    /// Returns [`ReflexError::Reflex`] if no flag is given and the platform has no config directory.
    pub fn config_dir(&self) -> Result<PathBuf, ReflexError> {
        match &self.config_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::config_dir()
                .map(|dir| dir.join(APP_DIR_NAME))
                .ok_or_else(|| ReflexError::reflex("Could not determine config directory")),
        }
    }

    /// Log directory from the flag, else `<local data dir>/reflex/logs`.
    ///
    /// # Errors
    ///
    /// Returns [`ReflexError::Reflex`] if no flag is given and the platform has no data directory.
    pub fn log_dir(&self) -> Result<PathBuf, ReflexError> {
        match &self.log_dir {
            Some(dir) => Ok(dir.clone()),
            None => dirs::data_local_dir()
                .map(|dir| dir.join(APP_DIR_NAME).join(LOG_DIR_NAME))
                .ok_or_else(|| ReflexError::reflex("Could not determine log directory")),
        }
    }

    /// Apply command-line overrides to the loaded config and validate the result.
    ///
    /// # Errors
    ///
    /// Returns [`ReflexError::Core`] if an override makes the config invalid.
    pub fn apply(&self, mut config: ClientConfig) -> Result<ClientConfig, ReflexError> {
        if let Some(page_url) = &self.page_url {
            config.page_url = Some(page_url.clone());
        }
        if let Some(retry_delay_ms) = self.retry_delay_ms {
            config.retry_delay_ms = retry_delay_ms;
        }

        config.validate()?;
        Ok(config)
    }
}

/// The page to attach to.
///
/// # Errors
///
/// Returns [`ReflexError::Reflex`] if neither the command line nor the config names one.
pub fn page_url(config: &ClientConfig) -> Result<&str, ReflexError> {
    config.page_url.as_deref().ok_or_else(|| {
        ReflexError::reflex("No page URL: pass one, set REFLEX_PAGE_URL or add page_url to the config")
    })
}
