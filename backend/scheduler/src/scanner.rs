//! Inactivity scanner: decides who gets warned in a channel.
//!
//! A scan works on one `now` instant. It reads the channel thresholds, resolves the
//! admin set once (bounded by a timeout), then classifies every ledger row:
//!
//! 1. already warned → skip (cleared only by new activity)
//! 2. administrator → skip
//! 3. joined fewer than `grace` whole days ago → skip
//! 4. active within `threshold` whole days → skip
//! 5. otherwise warn: attempt the configured notifications, then persist `warned`.
//!
//! At most one scan per channel runs at a time; a second request while one is in
//! flight fails with `ScanInProgress` instead of notifying the same members twice.
//!
//! Admin lookup failures abort the channel for this cycle. Notification failures
//! never abort anything. If no notification got through the member is left
//! unwarned and comes up again next cycle; a failed `warned` write does the same.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use idlewatch_core::{
    AdminResolver, ChannelId, Clock, EffectiveConfig, IdleWatchError, LookupError, MemberId,
    MembershipRecord, NotificationDispatcher, NotifyMode,
};
use idlewatch_ledger::{ActivityLedger, ConfigStore};

use crate::notice::WarningTemplates;
use crate::scan_log::{ScanLog, ScanLogEntry, ScanStatus};

/// Classification of one membership record at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    AlreadyWarned,
    Admin,
    InGrace,
    Active,
    Warn,
}

/// Pure eligibility check. Day counts are whole days, truncated.
pub fn evaluate(
    record: &MembershipRecord,
    now: DateTime<Utc>,
    config: &EffectiveConfig,
    admins: &HashSet<MemberId>,
) -> Verdict {
    if record.warned {
        return Verdict::AlreadyWarned;
    }
    if admins.contains(&record.member_id) {
        return Verdict::Admin;
    }
    if record.membership_days(now) < i64::from(config.new_member_grace_days) {
        return Verdict::InGrace;
    }
    if record.idle_days(now) < i64::from(config.inactivity_threshold_days) {
        return Verdict::Active;
    }
    Verdict::Warn
}

#[derive(Debug, Clone)]
pub struct ScanSettings {
    pub admin_lookup_timeout: Duration,
    pub notify_mode: NotifyMode,
    pub templates: WarningTemplates,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            admin_lookup_timeout: Duration::from_secs(10),
            notify_mode: NotifyMode::default(),
            templates: WarningTemplates::default(),
        }
    }
}

/// What one channel scan did.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub channel_id: Option<ChannelId>,
    pub examined: u32,
    pub warned: u32,
    pub already_warned: u32,
    pub skipped_admin: u32,
    pub skipped_grace: u32,
    pub skipped_active: u32,
    /// Individual notification sends that failed.
    pub notify_failures: u32,
    /// Eligible members for whom no notification got through.
    pub undelivered: u32,
    /// `warned` writes that failed; those members stay eligible.
    pub store_failures: u32,
    /// Members whose record changed between read and write.
    pub superseded: u32,
    pub warned_members: Vec<MemberId>,
}

impl ScanReport {
    fn new(channel_id: ChannelId) -> Self {
        Self {
            channel_id: Some(channel_id),
            ..Default::default()
        }
    }

    fn count_skip(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::AlreadyWarned => self.already_warned += 1,
            Verdict::Admin => self.skipped_admin += 1,
            Verdict::InGrace => self.skipped_grace += 1,
            Verdict::Active => self.skipped_active += 1,
            Verdict::Warn => {}
        }
    }
}

/// Result of scanning one channel inside a full cycle.
#[derive(Debug)]
pub struct ChannelOutcome {
    pub channel_id: ChannelId,
    pub result: Result<ScanReport, IdleWatchError>,
}

pub struct InactivityScanner {
    ledger: Arc<dyn ActivityLedger>,
    configs: Arc<dyn ConfigStore>,
    admins: Arc<dyn AdminResolver>,
    notifier: Arc<dyn NotificationDispatcher>,
    clock: Arc<dyn Clock>,
    settings: ScanSettings,
    scan_log: Option<ScanLog>,
    in_flight: Arc<Mutex<HashSet<ChannelId>>>,
}

/// Marks a channel as being scanned until dropped.
struct ScanClaim {
    channel_id: ChannelId,
    in_flight: Arc<Mutex<HashSet<ChannelId>>>,
}

impl ScanClaim {
    fn acquire(in_flight: &Arc<Mutex<HashSet<ChannelId>>>, channel_id: ChannelId) -> Option<Self> {
        let claimed = in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel_id);
        claimed.then(|| Self {
            channel_id,
            in_flight: in_flight.clone(),
        })
    }
}

impl Drop for ScanClaim {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(&self.channel_id);
    }
}

impl InactivityScanner {
    pub fn new(
        ledger: Arc<dyn ActivityLedger>,
        configs: Arc<dyn ConfigStore>,
        admins: Arc<dyn AdminResolver>,
        notifier: Arc<dyn NotificationDispatcher>,
        clock: Arc<dyn Clock>,
        settings: ScanSettings,
    ) -> Self {
        Self {
            ledger,
            configs,
            admins,
            notifier,
            clock,
            settings,
            scan_log: None,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Persist every channel outcome to the given log.
    pub fn with_scan_log(mut self, scan_log: ScanLog) -> Self {
        self.scan_log = Some(scan_log);
        self
    }

    pub fn ledger(&self) -> &Arc<dyn ActivityLedger> {
        &self.ledger
    }

    pub fn configs(&self) -> &Arc<dyn ConfigStore> {
        &self.configs
    }

    pub fn scan_log(&self) -> Option<&ScanLog> {
        self.scan_log.as_ref()
    }

    /// Drop scan log entries older than `retention`. Returns the number removed.
    pub async fn prune_scan_log(&self, retention: Duration) -> anyhow::Result<usize> {
        let Some(log) = &self.scan_log else {
            return Ok(0);
        };
        let cutoff = self.clock.now() - chrono::Duration::from_std(retention)?;
        log.prune(cutoff).await
    }

    /// Scan every channel that has ledger rows, concurrently and independently.
    pub async fn scan_all(&self) -> Result<Vec<ChannelOutcome>, IdleWatchError> {
        let channels = self.ledger.list_channels().await?;
        info!(channels = channels.len(), "Starting scan cycle");
        let scans = channels.into_iter().map(|channel_id| async move {
            ChannelOutcome {
                channel_id,
                result: self.scan_channel(channel_id).await,
            }
        });
        Ok(join_all(scans).await)
    }

    /// Scan one channel and record the outcome in the scan log, if any.
    ///
    /// Fails with `ScanInProgress` while another scan of the same channel is running.
    pub async fn scan_channel(&self, channel_id: ChannelId) -> Result<ScanReport, IdleWatchError> {
        let Some(_claim) = ScanClaim::acquire(&self.in_flight, channel_id) else {
            info!(channel_id = %channel_id, "Scan already running for channel, skipping");
            return Err(IdleWatchError::ScanInProgress(channel_id));
        };
        let started_at = self.clock.now();
        let result = self.scan_channel_at(channel_id, started_at).await;

        if let Some(log) = &self.scan_log {
            let entry = match &result {
                Ok(report) => {
                    let mut e = ScanLogEntry::new(channel_id, started_at, ScanStatus::Ok);
                    e.warned = report.warned;
                    e
                }
                Err(err) => {
                    let status = if err.is_transient() {
                        ScanStatus::Aborted
                    } else {
                        ScanStatus::Failed
                    };
                    let mut e = ScanLogEntry::new(channel_id, started_at, status);
                    e.error = Some(err.to_string());
                    e
                }
            };
            if let Err(e) = log.record(&entry).await {
                warn!(channel_id = %channel_id, error = %e, "Failed to write scan log entry");
            }
        }

        result
    }

    async fn scan_channel_at(
        &self,
        channel_id: ChannelId,
        now: DateTime<Utc>,
    ) -> Result<ScanReport, IdleWatchError> {
        let config = self.configs.get(channel_id).await?;
        let admins = self.lookup_admins(channel_id).await?;
        let records = self.ledger.list_by_channel(channel_id).await?;

        let mut report = ScanReport::new(channel_id);
        for record in records {
            report.examined += 1;
            match evaluate(&record, now, &config, &admins) {
                Verdict::Warn => self.warn_member(&record, now, &config, &mut report).await,
                skipped => report.count_skip(skipped),
            }
        }

        info!(
            channel_id = %channel_id,
            examined = report.examined,
            warned = report.warned,
            already_warned = report.already_warned,
            skipped_admin = report.skipped_admin,
            skipped_grace = report.skipped_grace,
            skipped_active = report.skipped_active,
            notify_failures = report.notify_failures,
            store_failures = report.store_failures,
            "Channel scan complete"
        );
        Ok(report)
    }

    async fn lookup_admins(&self, channel_id: ChannelId) -> Result<HashSet<MemberId>, IdleWatchError> {
        let timeout = self.settings.admin_lookup_timeout;
        match tokio::time::timeout(timeout, self.admins.get_admins(channel_id)).await {
            Ok(Ok(admins)) => Ok(admins),
            Ok(Err(e)) => {
                warn!(channel_id = %channel_id, error = %e, "Admin lookup failed, skipping channel this cycle");
                Err(e.into())
            }
            Err(_) => {
                let e = LookupError {
                    channel_id,
                    message: format!("timed out after {}s", timeout.as_secs_f32()),
                };
                warn!(channel_id = %channel_id, error = %e, "Admin lookup timed out, skipping channel this cycle");
                Err(e.into())
            }
        }
    }

    async fn warn_member(
        &self,
        record: &MembershipRecord,
        now: DateTime<Utc>,
        config: &EffectiveConfig,
        report: &mut ScanReport,
    ) {
        let channel_id = record.channel_id;
        let member_id = record.member_id;
        let idle_days = record.idle_days(now);
        let threshold = config.inactivity_threshold_days;
        let mode = self.settings.notify_mode;
        let mut delivered = false;

        if mode.sends_private() {
            let text = self.settings.templates.render_private(idle_days, threshold);
            match self.notifier.send_private(member_id, &text).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    report.notify_failures += 1;
                    warn!(channel_id = %channel_id, member_id = %member_id, error = %e, "Private warning not delivered");
                }
            }
        }

        if mode.sends_channel() {
            let html = self.settings.templates.render_channel(member_id, idle_days, threshold);
            match self.notifier.send_to_channel(channel_id, &html).await {
                Ok(()) => delivered = true,
                Err(e) => {
                    report.notify_failures += 1;
                    warn!(channel_id = %channel_id, member_id = %member_id, error = %e, "Channel announcement not delivered");
                }
            }
        }

        if !delivered {
            report.undelivered += 1;
            return;
        }

        match self
            .ledger
            .mark_warned_if_idle_since(channel_id, member_id, record.last_activity_at)
            .await
        {
            Ok(true) => {
                report.warned += 1;
                report.warned_members.push(member_id);
                debug!(channel_id = %channel_id, member_id = %member_id, idle_days, "Member warned");
            }
            Ok(false) => {
                report.superseded += 1;
                debug!(channel_id = %channel_id, member_id = %member_id, "Record changed during scan, not marking warned");
            }
            Err(e) => {
                report.store_failures += 1;
                error!(channel_id = %channel_id, member_id = %member_id, error = %e, "Failed to persist warning; member stays eligible");
            }
        }
    }

    /// Members whose last activity is at least the channel threshold old,
    /// oldest first. Callers are responsible for authorization.
    pub async fn list_inactive(
        &self,
        channel_id: ChannelId,
    ) -> Result<Vec<MembershipRecord>, IdleWatchError> {
        inactive_members(
            self.ledger.as_ref(),
            self.configs.as_ref(),
            channel_id,
            self.clock.now(),
        )
        .await
    }
}

/// Inactive members of a channel at `now`, ordered by last activity then member id.
///
/// Admins and members in their grace period are included; this is a report, not a
/// warning decision.
pub async fn inactive_members(
    ledger: &dyn ActivityLedger,
    configs: &dyn ConfigStore,
    channel_id: ChannelId,
    now: DateTime<Utc>,
) -> Result<Vec<MembershipRecord>, IdleWatchError> {
    let config = configs.get(channel_id).await?;
    let threshold = i64::from(config.inactivity_threshold_days);
    let mut inactive: Vec<MembershipRecord> = ledger
        .list_by_channel(channel_id)
        .await?
        .into_iter()
        .filter(|r| r.idle_days(now) >= threshold)
        .collect();
    inactive.sort_by(|a, b| {
        a.last_activity_at
            .cmp(&b.last_activity_at)
            .then(a.member_id.cmp(&b.member_id))
    });
    Ok(inactive)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{RecordingDispatcher, StaticAdmins};
    use chrono::TimeZone;
    use idlewatch_core::FixedClock;
    use std::sync::atomic::{AtomicBool, Ordering};
    use idlewatch_ledger::{Database, InMemoryConfigStore, InMemoryLedger, SqliteLedger};

    const CHAT: ChannelId = ChannelId(-1001);
    const ALICE: MemberId = MemberId(1);
    const BOB: MemberId = MemberId(2);
    const ADMIN: MemberId = MemberId(99);

    fn day(n: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 4, 1, 9, 0, 0).unwrap() + chrono::Duration::days(n)
    }

    struct Harness {
        ledger: Arc<InMemoryLedger>,
        configs: Arc<InMemoryConfigStore>,
        admins: Arc<StaticAdmins>,
        notifier: Arc<RecordingDispatcher>,
        clock: Arc<FixedClock>,
        scanner: InactivityScanner,
    }

    fn harness_with(admins: StaticAdmins, settings: ScanSettings) -> Harness {
        let ledger = Arc::new(InMemoryLedger::new());
        let configs = Arc::new(InMemoryConfigStore::default());
        let admins = Arc::new(admins);
        let notifier = Arc::new(RecordingDispatcher::new());
        let clock = Arc::new(FixedClock::new(day(0)));
        let scanner = InactivityScanner::new(
            ledger.clone(),
            configs.clone(),
            admins.clone(),
            notifier.clone(),
            clock.clone(),
            settings,
        );
        Harness { ledger, configs, admins, notifier, clock, scanner }
    }

    fn harness() -> Harness {
        harness_with(StaticAdmins::new().with_admin(CHAT, ADMIN), ScanSettings::default())
    }

    #[test]
    fn test_evaluate_order() {
        let cfg = EffectiveConfig::default();
        let admins: HashSet<MemberId> = [ADMIN].into_iter().collect();
        let mut r = MembershipRecord::new(CHAT, ADMIN, day(0));
        assert_eq!(evaluate(&r, day(30), &cfg, &admins), Verdict::Admin);
        r.warned = true;
        assert_eq!(evaluate(&r, day(30), &cfg, &admins), Verdict::AlreadyWarned);

        let r = MembershipRecord::new(CHAT, ALICE, day(0));
        assert_eq!(evaluate(&r, day(2), &cfg, &admins), Verdict::InGrace);
        assert_eq!(evaluate(&r, day(3), &cfg, &admins), Verdict::Active);
        assert_eq!(evaluate(&r, day(14), &cfg, &admins), Verdict::Warn);
    }

    #[test]
    fn test_grace_excludes_regardless_of_activity() {
        let cfg = EffectiveConfig { inactivity_threshold_days: 1, new_member_grace_days: 5 };
        let admins = HashSet::new();
        let mut r = MembershipRecord::new(CHAT, ALICE, day(10));
        // Stale activity from a previous membership must not matter inside grace.
        r.last_activity_at = day(0);
        for d in 10..15 {
            assert_eq!(evaluate(&r, day(d), &cfg, &admins), Verdict::InGrace);
        }
        assert_eq!(evaluate(&r, day(15), &cfg, &admins), Verdict::Warn);
    }

    #[test]
    fn test_threshold_monotonicity() {
        let admins = HashSet::new();
        let records: Vec<MembershipRecord> = (0..30)
            .map(|i| {
                let mut r = MembershipRecord::new(CHAT, MemberId(i), day(0));
                r.last_activity_at = day(i);
                r
            })
            .collect();
        let eligible = |threshold: u32| -> HashSet<MemberId> {
            let cfg = EffectiveConfig { inactivity_threshold_days: threshold, new_member_grace_days: 3 };
            records
                .iter()
                .filter(|r| evaluate(r, day(30), &cfg, &admins) == Verdict::Warn)
                .map(|r| r.member_id)
                .collect()
        };
        for t in 1..40 {
            assert!(eligible(t + 1).is_subset(&eligible(t)), "threshold {t}");
        }
    }

    #[tokio::test]
    async fn test_scenario_a_join_without_activity() {
        let h = harness();
        h.ledger.record_join(CHAT, ALICE, day(0)).await.unwrap();

        h.clock.set(day(10));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned, 0);
        assert_eq!(report.skipped_active, 1);

        h.clock.set(day(15));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned, 1);
        assert_eq!(report.warned_members, vec![ALICE]);
        assert!(h.ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);
        assert_eq!(h.notifier.private_to(ALICE), 1);
        assert_eq!(h.notifier.channel_posts(CHAT), 1);
    }

    #[tokio::test]
    async fn test_scenario_b_activity_rearms() {
        let h = harness();
        h.ledger.record_join(CHAT, ALICE, day(0)).await.unwrap();
        h.clock.set(day(15));
        assert_eq!(h.scanner.scan_channel(CHAT).await.unwrap().warned, 1);

        h.ledger.record_activity(CHAT, ALICE, day(16)).await.unwrap();
        assert!(!h.ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);

        h.clock.set(day(20));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned, 0);
        assert_eq!(report.skipped_active, 1);
    }

    #[tokio::test]
    async fn test_scenario_c_channel_threshold_override() {
        let h = harness();
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.configs.set_inactivity_threshold(CHAT, 7).await.unwrap();
        h.clock.set(day(10));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned_members, vec![ALICE]);
    }

    #[tokio::test]
    async fn test_scenario_e_private_failure_still_announces_and_marks() {
        let h = harness();
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.notifier.fail_private(true);
        h.clock.set(day(20));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned, 1);
        assert_eq!(report.notify_failures, 1);
        assert_eq!(h.notifier.channel_posts(CHAT), 1);
        assert!(h.ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);
    }

    #[tokio::test]
    async fn test_total_notify_failure_keeps_member_eligible() {
        let h = harness();
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.ledger.record_activity(CHAT, BOB, day(0)).await.unwrap();
        h.notifier.fail_private(true);
        h.notifier.fail_channel(true);
        h.clock.set(day(20));

        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.examined, 2);
        assert_eq!(report.undelivered, 2);
        assert_eq!(report.warned, 0);
        assert!(!h.ledger.get(CHAT, BOB).await.unwrap().unwrap().warned);

        h.notifier.fail_private(false);
        h.notifier.fail_channel(false);
        assert_eq!(h.scanner.scan_channel(CHAT).await.unwrap().warned, 2);
    }

    #[tokio::test]
    async fn test_admin_never_warned() {
        let h = harness();
        h.ledger.record_activity(CHAT, ADMIN, day(0)).await.unwrap();
        h.clock.set(day(100));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.skipped_admin, 1);
        assert_eq!(report.warned, 0);
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_already_warned_is_not_renotified() {
        let h = harness();
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.clock.set(day(15));
        h.scanner.scan_channel(CHAT).await.unwrap();
        h.clock.set(day(16));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.already_warned, 1);
        assert_eq!(h.notifier.private_to(ALICE), 1);
    }

    #[tokio::test]
    async fn test_admin_lookup_failure_aborts_only_that_channel() {
        let h = harness();
        let other = ChannelId(-2002);
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.ledger.record_activity(other, BOB, day(0)).await.unwrap();
        h.admins.set_failing(CHAT, true);
        h.clock.set(day(20));

        let outcomes = h.scanner.scan_all().await.unwrap();
        assert_eq!(outcomes.len(), 2);
        for outcome in outcomes {
            if outcome.channel_id == CHAT {
                assert!(matches!(outcome.result, Err(IdleWatchError::Lookup(_))));
            } else {
                assert_eq!(outcome.result.unwrap().warned, 1);
            }
        }
        assert!(!h.ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);
        assert!(h.ledger.get(other, BOB).await.unwrap().unwrap().warned);
    }

    #[tokio::test]
    async fn test_admin_lookup_timeout_is_transient() {
        let settings = ScanSettings {
            admin_lookup_timeout: Duration::from_millis(20),
            ..ScanSettings::default()
        };
        let h = harness_with(StaticAdmins::new(), settings);
        h.admins.set_stall(CHAT, Duration::from_millis(500));
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.clock.set(day(20));
        let err = h.scanner.scan_channel(CHAT).await.unwrap_err();
        assert!(err.is_transient());
        assert!(h.notifier.sent().is_empty());
    }

    #[tokio::test]
    async fn test_channel_only_mode() {
        let settings = ScanSettings {
            notify_mode: NotifyMode::ChannelOnly,
            ..ScanSettings::default()
        };
        let h = harness_with(StaticAdmins::new(), settings);
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.clock.set(day(20));
        assert_eq!(h.scanner.scan_channel(CHAT).await.unwrap().warned, 1);
        assert_eq!(h.notifier.private_to(ALICE), 0);
        assert_eq!(h.notifier.channel_posts(CHAT), 1);
    }

    #[tokio::test]
    async fn test_list_inactive_is_ordered_and_thresholded() {
        let h = harness();
        h.ledger.record_activity(CHAT, BOB, day(2)).await.unwrap();
        h.ledger.record_activity(CHAT, ALICE, day(1)).await.unwrap();
        h.ledger.record_activity(CHAT, MemberId(3), day(10)).await.unwrap();
        h.clock.set(day(16));
        let ids: Vec<MemberId> = h
            .scanner
            .list_inactive(CHAT)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.member_id)
            .collect();
        assert_eq!(ids, vec![ALICE, BOB]);
    }

    /// Ledger whose warning writes fail while `fail_writes` is set.
    struct FlakyWarnLedger {
        inner: InMemoryLedger,
        fail_writes: AtomicBool,
    }

    #[async_trait::async_trait]
    impl ActivityLedger for FlakyWarnLedger {
        async fn record_activity(
            &self,
            channel_id: ChannelId,
            member_id: MemberId,
            at: DateTime<Utc>,
        ) -> Result<(), IdleWatchError> {
            self.inner.record_activity(channel_id, member_id, at).await
        }

        async fn record_join(
            &self,
            channel_id: ChannelId,
            member_id: MemberId,
            at: DateTime<Utc>,
        ) -> Result<bool, IdleWatchError> {
            self.inner.record_join(channel_id, member_id, at).await
        }

        async fn list_by_channel(
            &self,
            channel_id: ChannelId,
        ) -> Result<Vec<MembershipRecord>, IdleWatchError> {
            self.inner.list_by_channel(channel_id).await
        }

        async fn list_channels(&self) -> Result<Vec<ChannelId>, IdleWatchError> {
            self.inner.list_channels().await
        }

        async fn get(
            &self,
            channel_id: ChannelId,
            member_id: MemberId,
        ) -> Result<Option<MembershipRecord>, IdleWatchError> {
            self.inner.get(channel_id, member_id).await
        }

        async fn mark_warned(
            &self,
            channel_id: ChannelId,
            member_id: MemberId,
        ) -> Result<bool, IdleWatchError> {
            self.inner.mark_warned(channel_id, member_id).await
        }

        async fn mark_warned_if_idle_since(
            &self,
            channel_id: ChannelId,
            member_id: MemberId,
            observed_last_activity: DateTime<Utc>,
        ) -> Result<bool, IdleWatchError> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(IdleWatchError::Storage("disk full".into()));
            }
            self.inner
                .mark_warned_if_idle_since(channel_id, member_id, observed_last_activity)
                .await
        }
    }

    #[tokio::test]
    async fn test_failed_warning_write_renotifies_next_cycle() {
        let ledger = Arc::new(FlakyWarnLedger {
            inner: InMemoryLedger::new(),
            fail_writes: AtomicBool::new(true),
        });
        let notifier = Arc::new(RecordingDispatcher::new());
        let clock = Arc::new(FixedClock::new(day(0)));
        let scanner = InactivityScanner::new(
            ledger.clone(),
            Arc::new(InMemoryConfigStore::default()),
            Arc::new(StaticAdmins::new()),
            notifier.clone(),
            clock.clone(),
            ScanSettings::default(),
        );
        ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        clock.set(day(20));

        let report = scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.store_failures, 1);
        assert_eq!(report.warned, 0);
        assert_eq!(notifier.private_to(ALICE), 1);
        assert!(!ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);

        ledger.fail_writes.store(false, Ordering::SeqCst);
        clock.set(day(21));
        let report = scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.warned, 1);
        assert_eq!(report.store_failures, 0);
        assert_eq!(notifier.private_to(ALICE), 2);
        assert_eq!(notifier.channel_posts(CHAT), 2);
        assert!(ledger.get(CHAT, ALICE).await.unwrap().unwrap().warned);
    }

    #[tokio::test]
    async fn test_concurrent_scans_of_one_channel_warn_once() {
        let h = harness();
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.notifier.set_delay(Duration::from_millis(20));
        h.clock.set(day(20));

        let (a, b) = tokio::join!(h.scanner.scan_channel(CHAT), h.scanner.scan_channel(CHAT));
        let warned: u32 = [&a, &b]
            .iter()
            .filter_map(|r| r.as_ref().ok())
            .map(|r| r.warned)
            .sum();
        assert_eq!(warned, 1);
        assert!([&a, &b]
            .iter()
            .any(|r| matches!(r, Err(IdleWatchError::ScanInProgress(c)) if *c == CHAT)));
        assert_eq!(h.notifier.private_to(ALICE), 1);
        assert_eq!(h.notifier.channel_posts(CHAT), 1);

        // The claim is released once the scan finishes.
        h.clock.set(day(21));
        let report = h.scanner.scan_channel(CHAT).await.unwrap();
        assert_eq!(report.already_warned, 1);
    }

    #[tokio::test]
    async fn test_concurrent_scans_of_different_channels_both_run() {
        let h = harness();
        let other = ChannelId(-2002);
        h.ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        h.ledger.record_activity(other, BOB, day(0)).await.unwrap();
        h.notifier.set_delay(Duration::from_millis(20));
        h.clock.set(day(20));

        let (a, b) = tokio::join!(h.scanner.scan_channel(CHAT), h.scanner.scan_channel(other));
        assert_eq!(a.unwrap().warned, 1);
        assert_eq!(b.unwrap().warned, 1);
    }

    #[tokio::test]
    async fn test_scan_log_records_outcomes() {
        let db = Database::in_memory().unwrap();
        let ledger = Arc::new(SqliteLedger::new(db.clone()));
        let admins = Arc::new(StaticAdmins::new());
        let clock = Arc::new(FixedClock::new(day(0)));
        let scanner = InactivityScanner::new(
            ledger.clone(),
            Arc::new(InMemoryConfigStore::default()),
            admins.clone(),
            Arc::new(RecordingDispatcher::new()),
            clock.clone(),
            ScanSettings::default(),
        )
        .with_scan_log(ScanLog::new(db));

        ledger.record_activity(CHAT, ALICE, day(0)).await.unwrap();
        clock.set(day(15));
        scanner.scan_channel(CHAT).await.unwrap();
        let last = scanner.scan_log().unwrap().last(CHAT).await.unwrap().unwrap();
        assert_eq!(last.status, ScanStatus::Ok);
        assert_eq!(last.warned, 1);

        admins.set_failing(CHAT, true);
        clock.set(day(16));
        assert!(scanner.scan_channel(CHAT).await.is_err());
        let last = scanner.scan_log().unwrap().last(CHAT).await.unwrap().unwrap();
        assert_eq!(last.status, ScanStatus::Aborted);
    }
}
