use crate::cli::commands::emit_response;
use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::store::SqliteStore;
use crate::errors::AppResult;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Lab { email, action } = cmd {
        let store = SqliteStore::open(&cfg.database)?;
        emit_response(store.gateway().lab(email.trim(), *action))?;
    }
    Ok(())
}
