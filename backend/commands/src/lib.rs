pub mod detection;
pub mod dispatch;
pub mod handlers;
pub mod registry;
pub mod types;

use std::sync::Arc;

use idlewatch_core::AdminResolver;
use idlewatch_scheduler::InactivityScanner;

pub use detection::detect_command;
pub use dispatch::{CommandContext, CommandDispatcher, CommandHandler, CommandResponse};
pub use handlers::{
    ConfigField, HelpHandler, ListInactiveHandler, ScanNowHandler, SetDaysHandler,
    ShowConfigHandler,
};
pub use registry::{builtin_commands, CommandRegistry};
pub use types::{ArgType, CommandArg, CommandCategory, CommandDef, CommandInvocation};

/// Build a dispatcher pre-wired with all built-in handlers.
pub fn build_default_dispatcher(
    scanner: Arc<InactivityScanner>,
    admins: Arc<dyn AdminResolver>,
) -> CommandDispatcher {
    let registry = Arc::new(CommandRegistry::new());
    let configs = scanner.configs().clone();
    let mut dispatcher = CommandDispatcher::new(registry.clone(), admins);

    dispatcher.register("help", Arc::new(HelpHandler { registry }));
    dispatcher.register(
        "inactive",
        Arc::new(ListInactiveHandler {
            scanner: scanner.clone(),
        }),
    );
    dispatcher.register(
        "setinactivity",
        Arc::new(SetDaysHandler {
            configs: configs.clone(),
            field: ConfigField::InactivityThreshold,
        }),
    );
    dispatcher.register(
        "setgrace",
        Arc::new(SetDaysHandler {
            configs: configs.clone(),
            field: ConfigField::NewMemberGrace,
        }),
    );
    dispatcher.register(
        "inactivityconfig",
        Arc::new(ShowConfigHandler {
            configs,
            scan_log: scanner.scan_log().cloned(),
        }),
    );
    dispatcher.register("scannow", Arc::new(ScanNowHandler { scanner }));

    dispatcher
}
