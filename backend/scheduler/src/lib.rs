pub mod notice;
pub mod scan_log;
pub mod scanner;
pub mod scheduler;
pub mod testing;

pub use notice::WarningTemplates;
pub use scan_log::{ScanLog, ScanLogEntry, ScanStatus};
pub use scanner::{
    evaluate, inactive_members, ChannelOutcome, InactivityScanner, ScanReport, ScanSettings,
    Verdict,
};
pub use scheduler::{Scheduler, SchedulerConfig};
