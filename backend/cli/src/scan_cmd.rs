//! One-shot scan of every known channel.

use anyhow::Result;

use idlewatch_channels::TelegramGateway;
use idlewatch_config::IdleWatchConfig;
use idlewatch_scheduler::ChannelOutcome;

use crate::app::{self, Stores};
use crate::terminal_output::{note_info, note_success, note_warn, render_table, Column};

pub async fn run(cfg: &IdleWatchConfig) -> Result<()> {
    let stores = Stores::open(cfg)?;
    let gateway = TelegramGateway::new(app::bot(cfg)?);
    let scanner = app::build_scanner(cfg, &stores, gateway);

    let outcomes = scanner.scan_all().await?;
    if outcomes.is_empty() {
        note_info("No channels have been seen yet.");
        return Ok(());
    }
    print!("{}", outcome_table(&outcomes));

    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        note_warn(&format!("{failed} channel(s) could not be scanned; they will be retried next cycle."));
    } else {
        note_success("Scan complete.");
    }

    let pruned = scanner
        .prune_scan_log(app::scan_log_retention(cfg))
        .await?;
    if pruned > 0 {
        note_info(&format!("Pruned {pruned} old scan log entries."));
    }
    Ok(())
}

fn outcome_table(outcomes: &[ChannelOutcome]) -> String {
    let columns = [
        Column::left("Channel"),
        Column::right("Examined"),
        Column::right("Warned"),
        Column::right("Skipped"),
        Column::right("Undelivered"),
        Column::left("Status"),
    ];
    let rows: Vec<Vec<String>> = outcomes
        .iter()
        .map(|o| match &o.result {
            Ok(r) => vec![
                o.channel_id.to_string(),
                r.examined.to_string(),
                r.warned.to_string(),
                (r.already_warned + r.skipped_admin + r.skipped_grace + r.skipped_active)
                    .to_string(),
                r.undelivered.to_string(),
                "ok".to_string(),
            ],
            Err(e) => vec![
                o.channel_id.to_string(),
                String::new(),
                String::new(),
                String::new(),
                String::new(),
                format!("failed: {e}"),
            ],
        })
        .collect();
    render_table(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal_output::strip_ansi;
    use idlewatch_core::{ChannelId, IdleWatchError};
    use idlewatch_scheduler::ScanReport;

    #[test]
    fn table_shows_failed_channels() {
        let outcomes = vec![
            ChannelOutcome {
                channel_id: ChannelId(-1),
                result: Ok(ScanReport {
                    examined: 4,
                    warned: 1,
                    skipped_active: 2,
                    skipped_admin: 1,
                    ..Default::default()
                }),
            },
            ChannelOutcome {
                channel_id: ChannelId(-2),
                result: Err(IdleWatchError::Storage("boom".into())),
            },
        ];
        let table = strip_ansi(&outcome_table(&outcomes));
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[2].starts_with("  -1"));
        assert!(lines[2].ends_with("ok"));
        assert!(lines[3].contains("failed: "));
        assert!(lines[3].contains("boom"));
    }
}
