use crate::cli::parser::Commands;
use crate::config::Config;
use crate::db::store::SqliteStore;
use crate::errors::{AppError, AppResult};
use crate::models::hour_log::LogFamily;
use crate::models::response::PendingEntry;
use crate::ui::messages::info;
use crate::utils::colors::GREY;
use crate::utils::formatting::{hours2readable, mins2readable};
use crate::utils::table::{Cell, Table};
use chrono::{Local, Utc};

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Pending { external, json } = cmd {
        let family = if *external {
            LogFamily::External
        } else {
            LogFamily::Lab
        };
        let entries = SqliteStore::open(&cfg.database)?
            .gateway()
            .list_pending(family)?;

        if *json {
            let out =
                serde_json::to_string_pretty(&entries).map_err(|e| AppError::Other(e.to_string()))?;
            println!("{out}");
            return Ok(());
        }

        if entries.is_empty() {
            info(format!("No pending {} sessions.", family.as_str()));
            return Ok(());
        }

        print!("{}", render(&entries, family, &cfg.separator_char));
    }
    Ok(())
}

fn render(entries: &[PendingEntry], family: LogFamily, separator: &str) -> String {
    let now = Utc::now();

    let mut table = match family {
        LogFamily::Lab => Table::new(vec!["id", "email", "in since", "open for"]),
        LogFamily::External => {
            Table::new(vec!["id", "email", "submitted", "hours", "ref", "message"])
        }
    };

    for e in entries {
        let since = e.time_in.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string();
        let mut row: Vec<Cell> = vec![
            e.id.to_string().into(),
            e.member.as_str().into(),
            since.into(),
        ];

        match family {
            LogFamily::Lab => {
                let open = mins2readable((now - e.time_in).num_minutes(), false, false);
                row.push(open.into());
            }
            LogFamily::External => {
                row.push(hours2readable(e.duration).into());
                row.push(match &e.external_ref {
                    Some(r) => r.as_str().into(),
                    None => Cell::colored("--", GREY),
                });
                row.push(e.message.clone().unwrap_or_default().into());
            }
        }
        table.add_row(row);
    }

    table.render(separator)
}
