pub mod code;
pub mod init;
pub mod progress;
pub mod records;
pub mod validate;

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;

use judgearc_client::config::load_config_from;
use judgearc_client::JudgearcConfig;

/// Where the catalog and judgment database come from.
#[derive(Args, Debug, Clone, Default)]
pub struct Sources {
    /// Config file path
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// SQLite database (overrides config)
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Catalog JSON (overrides config)
    #[arg(long)]
    pub catalog: Option<PathBuf>,
}

impl Sources {
    pub fn load(&self) -> Result<JudgearcConfig> {
        let mut config = load_config_from(self.config.as_deref())?;
        if let Some(database) = &self.database {
            config.database = database.clone();
        }
        if let Some(catalog) = &self.catalog {
            config.catalog = catalog.clone();
        }
        Ok(config)
    }
}
