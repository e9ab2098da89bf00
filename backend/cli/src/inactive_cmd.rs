//! Offline listing of a channel's inactive members, read straight from the database.

use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};

use idlewatch_config::IdleWatchConfig;
use idlewatch_core::{ChannelId, Clock, MembershipRecord, SystemClock};
use idlewatch_ledger::ConfigStore;
use idlewatch_scheduler::inactive_members;

use crate::app::Stores;
use crate::terminal_output::{note_info, note_success, render_table, Column};

pub async fn run(cfg: &IdleWatchConfig, channel_id: i64, json: bool) -> Result<()> {
    let stores = Stores::open(cfg)?;
    let channel_id = ChannelId(channel_id);
    let now = SystemClock.now();

    let members =
        inactive_members(stores.ledger.as_ref(), stores.configs.as_ref(), channel_id, now).await?;
    if json {
        println!("{}", serde_json::to_string_pretty(&members)?);
        return Ok(());
    }

    let effective = stores.configs.get(channel_id).await?;
    note_info(&format!(
        "Channel {channel_id}: threshold {} day(s), grace {} day(s)",
        effective.inactivity_threshold_days, effective.new_member_grace_days
    ));
    if members.is_empty() {
        note_success("No inactive members.");
        return Ok(());
    }
    print!("{}", member_table(&members, now));
    Ok(())
}

fn member_table(members: &[MembershipRecord], now: DateTime<Utc>) -> String {
    let columns = [
        Column::left("Member"),
        Column::right("Idle days"),
        Column::left("Last activity"),
        Column::left("Joined"),
        Column::left("Warned"),
    ];
    let rows: Vec<Vec<String>> = members
        .iter()
        .map(|m| {
            vec![
                m.member_id.to_string(),
                m.idle_days(now).to_string(),
                m.last_activity_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                m.joined_at.to_rfc3339_opts(SecondsFormat::Secs, true),
                if m.warned { "yes" } else { "no" }.to_string(),
            ]
        })
        .collect();
    render_table(&columns, &rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::terminal_output::strip_ansi;
    use chrono::{Duration, TimeZone};
    use idlewatch_core::MemberId;

    #[test]
    fn table_lists_idle_days_and_warned_flag() {
        let now = Utc.with_ymd_and_hms(2026, 5, 20, 12, 0, 0).unwrap();
        let mut record = MembershipRecord::new(ChannelId(-3), MemberId(77), now - Duration::days(30));
        record.warned = true;

        let table = strip_ansi(&member_table(&[record], now));
        let row = table.lines().nth(2).unwrap();
        assert!(row.starts_with("  77"));
        assert!(row.contains(" 30 "));
        assert!(row.contains("2026-04-20T12:00:00Z"));
        assert!(row.ends_with("yes"));
    }
}
