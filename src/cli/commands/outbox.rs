use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::outbox::{Deliverer, JsonlDeliverer, OutboxDispatcher, StdoutDeliverer};
use crate::db::log::write_log;
use crate::db::outbox::OutboxSink;
use crate::db::store::SqliteStore;
use crate::errors::AppResult;
use crate::ui::messages::{info, success, warning};
use crate::utils::colors::color_for_status;
use crate::utils::path::expand_tilde;
use crate::utils::table::{Cell, Table};
use chrono::{Local, Utc};

const LIST_LIMIT: u32 = 20;

pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    if let Commands::Outbox {
        deliver,
        list,
        file,
        stdout,
    } = cmd
    {
        let store = SqliteStore::open(&cfg.database)?;
        let outbox = OutboxSink::new(store.clone());

        if *deliver {
            let feed = expand_tilde(file.as_deref().unwrap_or(&cfg.notify_feed));
            let jsonl = JsonlDeliverer::new(&feed);
            let deliverer: &dyn Deliverer = if *stdout { &StdoutDeliverer } else { &jsonl };

            let mut dispatcher = OutboxDispatcher::new(&outbox, deliverer, cfg.retry_policy());
            let report = dispatcher.run_once(Utc::now())?;

            let summary = format!(
                "delivered {}, retried {}, abandoned {}, waiting {}",
                report.delivered, report.retried, report.abandoned, report.waiting
            );
            let target = if *stdout {
                "stdout".to_string()
            } else {
                feed.display().to_string()
            };
            store.with_connection(|conn| Ok(write_log(conn, "deliver", &target, &summary)?))?;

            // Stdout carries the feed itself in that mode.
            if !*stdout {
                if report.abandoned > 0 {
                    warning(format!("Outbox: {summary}"));
                } else {
                    success(format!("Outbox: {summary}"));
                }
                if let Some(next) = dispatcher.next_due() {
                    info(format!(
                        "Next retry due at {}",
                        next.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                    ));
                }
            }
        }

        if *list {
            let entries = outbox.recent(LIST_LIMIT)?;
            if entries.is_empty() {
                info("Outbox is empty.");
                return Ok(());
            }

            let mut table = Table::new(vec![
                "id", "status", "email", "event", "log", "attempts", "next attempt", "last error",
            ]);
            for e in &entries {
                let status = e.status.to_db_str();
                table.add_row(vec![
                    e.id.to_string().into(),
                    Cell::colored(status, color_for_status(status)),
                    e.change.member.as_str().into(),
                    (if e.change.logging_in { "in" } else { "out" }).into(),
                    e.change.log_id.to_string().into(),
                    e.attempts.to_string().into(),
                    e.next_attempt_at
                        .with_timezone(&Local)
                        .format("%Y-%m-%d %H:%M:%S")
                        .to_string()
                        .into(),
                    e.last_error.clone().unwrap_or_default().into(),
                ]);
            }
            print!("{}", table.render(&cfg.separator_char));
        }
    }
    Ok(())
}
