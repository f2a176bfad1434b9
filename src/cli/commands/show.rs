use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::store::SqliteStore;
use crate::errors::{AppError, AppResult};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Show { id } = cmd {
        let log = SqliteStore::open(&cfg.database)?.gateway().get(*id)?;
        let json = serde_json::to_string_pretty(&log).map_err(|e| AppError::Other(e.to_string()))?;
        println!("{json}");
    }
    Ok(())
}
