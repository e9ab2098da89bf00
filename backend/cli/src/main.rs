mod app;
mod check_config_cmd;
mod inactive_cmd;
mod scan_cmd;
mod terminal_output;

use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};

use idlewatch_config::{apply_all_defaults, config_file_path, load_config, prepare};

#[derive(Parser)]
#[command(name = "idlewatch")]
#[command(about = "idlewatch: warns group chat members who have gone quiet")]
#[command(version)]
struct Cli {
    /// Config file (defaults to $IDLEWATCH_CONFIG, then ~/.idlewatch/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the bot: record activity, answer commands and scan on a schedule
    Run,
    /// Scan every known channel once and exit
    Scan,
    /// List a channel's inactive members from the local database
    Inactive {
        /// Telegram chat id of the group
        #[arg(allow_negative_numbers = true)]
        channel_id: i64,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show the resolved config (secrets masked) and validate it
    CheckConfig,
}

impl Commands {
    fn needs_token(&self) -> bool {
        matches!(self, Commands::Run | Commands::Scan)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let path = config_file_path(cli.config.as_deref());

    if let Commands::CheckConfig = cli.command {
        if !check_config_cmd::run(&path).await? {
            bail!("config at {} is not valid", path.display());
        }
        return Ok(());
    }

    let loaded = apply_all_defaults(load_config(&path).await?);
    logging::init_logger(loaded.log_dir(), loaded.log_level());
    let config = prepare(loaded, &path, cli.command.needs_token())?;

    match cli.command {
        Commands::Run => app::run(&config).await,
        Commands::Scan => scan_cmd::run(&config).await,
        Commands::Inactive { channel_id, json } => {
            inactive_cmd::run(&config, channel_id, json).await
        }
        Commands::CheckConfig => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_negative_channel_id() {
        let cli = Cli::try_parse_from(["idlewatch", "inactive", "-1001234567890"]).unwrap();
        match cli.command {
            Commands::Inactive { channel_id, json } => {
                assert_eq!(channel_id, -1_001_234_567_890);
                assert!(!json);
            }
            _ => panic!("expected inactive"),
        }
    }

    #[test]
    fn config_flag_is_global() {
        let cli = Cli::try_parse_from(["idlewatch", "scan", "--config", "/tmp/x.yaml"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/x.yaml")));
        assert!(cli.command.needs_token());
    }

    #[test]
    fn offline_commands_do_not_need_a_token() {
        let cli = Cli::try_parse_from(["idlewatch", "inactive", "5", "--json"]).unwrap();
        assert!(!cli.command.needs_token());
    }
}
