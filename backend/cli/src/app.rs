//! Wiring shared by the binary's subcommands.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use teloxide::Bot;
use tracing::{error, info};

use idlewatch_channels::{ChannelAdapter, TelegramAdapter, TelegramGateway};
use idlewatch_commands::build_default_dispatcher;
use idlewatch_config::IdleWatchConfig;
use idlewatch_core::{AdminResolver, Component, EventBus, SystemClock};
use idlewatch_ledger::{Database, SqliteConfigStore, SqliteLedger};
use idlewatch_scheduler::{
    InactivityScanner, ScanLog, ScanSettings, Scheduler, SchedulerConfig, WarningTemplates,
};

/// The SQLite-backed stores, all sharing one connection.
pub struct Stores {
    pub ledger: Arc<SqliteLedger>,
    pub configs: Arc<SqliteConfigStore>,
    pub scan_log: ScanLog,
}

impl Stores {
    pub fn open(cfg: &IdleWatchConfig) -> Result<Self> {
        let db = Database::open(cfg.db_path())?;
        let defaults = cfg.effective_defaults()?;
        Ok(Self {
            ledger: Arc::new(SqliteLedger::new(db.clone())),
            configs: Arc::new(SqliteConfigStore::new(db.clone(), defaults)),
            scan_log: ScanLog::new(db),
        })
    }
}

pub fn scan_settings(cfg: &IdleWatchConfig) -> ScanSettings {
    let mut templates = WarningTemplates::default();
    if let Some(n) = &cfg.notifications {
        if let Some(private) = &n.private_template {
            templates.private = private.clone();
        }
        if let Some(channel) = &n.channel_template {
            templates.channel = channel.clone();
        }
    }
    ScanSettings {
        admin_lookup_timeout: cfg.admin_lookup_timeout(),
        notify_mode: cfg.notify_mode(),
        templates,
    }
}

pub fn scan_log_retention(cfg: &IdleWatchConfig) -> Duration {
    Duration::from_secs(u64::from(cfg.log_retention_days()) * 86_400)
}

pub fn bot(cfg: &IdleWatchConfig) -> Result<Bot> {
    let token = cfg.token().context("telegram.token is not set")?;
    Ok(Bot::new(token))
}

/// Scanner backed by the Telegram gateway for admin lookup and delivery.
pub fn build_scanner(
    cfg: &IdleWatchConfig,
    stores: &Stores,
    gateway: TelegramGateway,
) -> Arc<InactivityScanner> {
    let scanner = InactivityScanner::new(
        stores.ledger.clone(),
        stores.configs.clone(),
        Arc::new(gateway.clone()),
        Arc::new(gateway),
        Arc::new(SystemClock),
        scan_settings(cfg),
    )
    .with_scan_log(stores.scan_log.clone());
    Arc::new(scanner)
}

/// Run the bot until the Telegram adapter stops (Ctrl-C).
pub async fn run(cfg: &IdleWatchConfig) -> Result<()> {
    let bot = bot(cfg)?;
    let stores = Stores::open(cfg)?;
    let gateway = TelegramGateway::new(bot.clone());
    let scanner = build_scanner(cfg, &stores, gateway.clone());

    let admins: Arc<dyn AdminResolver> = Arc::new(gateway);
    let commands = Arc::new(build_default_dispatcher(scanner.clone(), admins));

    let mut bus = EventBus::new();
    let events_rx = bus
        .take_events_rx()
        .context("event receiver already taken")?;

    let scheduler = Scheduler::new(
        stores.ledger.clone(),
        scanner,
        SchedulerConfig {
            interval: cfg.scan_interval(),
            initial_delay: cfg.initial_delay(),
            scan_log_retention: Some(scan_log_retention(cfg)),
        },
    );
    let scheduler_task = tokio::spawn(async move {
        if let Err(e) = Component::start(&scheduler, events_rx).await {
            error!(error = %e, "Scheduler task failed");
        }
    });

    let adapter = TelegramAdapter::new(bot, commands);
    info!(
        adapter = adapter.name(),
        db = %cfg.db_path().display(),
        "All components started"
    );
    let result = adapter.start(bus.events_tx.clone()).await;

    // Closing the bus lets the scheduler finish its running cycle and exit.
    drop(bus);
    if let Err(e) = scheduler_task.await {
        error!(error = %e, "Scheduler task panicked");
    }
    info!("idlewatch stopped");
    result
}
