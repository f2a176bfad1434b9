use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::pool::open_connection;
use crate::db::store::SqliteStore;
use crate::errors::AppResult;
use crate::export::ExportLogic;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Export {
        format,
        file,
        state,
        force,
    } = cmd
    {
        let store = SqliteStore::open(&cfg.database)?;
        let conn = open_connection(store.path())?;
        ExportLogic::export(&conn, *format, file, state.as_deref(), *force)?;
    }
    Ok(())
}
