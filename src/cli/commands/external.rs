use crate::cli::commands::emit_response;
use crate::cli::parser::{Commands, ExternalCommand};
use crate::config::Config;
use crate::db::store::SqliteStore;
use crate::errors::AppResult;
use crate::models::action::RespondOutcome;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::External { action } = cmd {
        let gateway = SqliteStore::open(&cfg.database)?.gateway();

        let result = match action {
            ExternalCommand::Submit {
                email,
                hours,
                message,
            } => gateway.external_submit(email.trim(), *hours, message),
            ExternalCommand::Respond {
                id,
                action,
                category,
            } => gateway.external_respond(
                *id,
                &RespondOutcome::parse(action),
                category.as_deref(),
            ),
            ExternalCommand::Ref { id, reference } => gateway.attach_external_ref(*id, reference),
        };

        emit_response(result)?;
    }
    Ok(())
}
