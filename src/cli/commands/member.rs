use crate::cli::parser::{Commands, MemberCommand};
use crate::config::Config;
use crate::db::log::write_log;
use crate::db::members;
use crate::db::store::SqliteStore;
use crate::errors::{AppError, AppResult};
use crate::models::member::Member;
use crate::ui::messages::{success, warning};
use crate::utils::table::Table;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Member { action } = cmd else {
        return Ok(());
    };
    let store = SqliteStore::open(&cfg.database)?;

    match action {
        MemberCommand::Add { email, name } => {
            let member = Member::new(email, name);
            if member.email.is_empty() || member.full_name.is_empty() {
                return Err(AppError::Other(
                    "member e-mail and name must not be empty".into(),
                ));
            }

            store.with_connection(|conn| {
                members::upsert_member(conn, &member)?;
                write_log(conn, "member_add", &member.email, &member.full_name)?;
                Ok(())
            })?;
            success(format!("Member registered: {} <{}>", member.full_name, member.email));
        }

        MemberCommand::List { json } => {
            let list = store.with_connection(|conn| Ok(members::list_active_members(conn)?))?;

            if *json {
                let out = serde_json::to_string_pretty(&list)
                    .map_err(|e| AppError::Other(e.to_string()))?;
                println!("{out}");
            } else if list.is_empty() {
                warning("No active members.");
            } else {
                let mut table = Table::new(vec!["email", "name", "first name"]);
                for m in &list {
                    table.add_row(vec![
                        m.email.as_str().into(),
                        m.full_name.as_str().into(),
                        m.first_name.as_str().into(),
                    ]);
                }
                print!("{}", table.render(&cfg.separator_char));
            }
        }

        MemberCommand::Deactivate { email } => {
            let email = email.trim();
            let found = store.with_connection(|conn| {
                let found = members::set_active(conn, email, false)?;
                if found {
                    write_log(conn, "member_deactivate", email, "Member deactivated")?;
                }
                Ok(found)
            })?;

            if !found {
                return Err(AppError::Other(format!("member unknown: {email}")));
            }
            success(format!("Member deactivated: {email}"));
        }
    }

    Ok(())
}
