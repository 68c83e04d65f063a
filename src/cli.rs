use anyhow::{bail, Result};
use std::path::PathBuf;

use crate::config::{AppConfig, ENV_VARS};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Parsed command line. Flag values are collected into an [`AppConfig`] so
/// they can be layered over the file and environment.
#[derive(Debug, Default, PartialEq)]
pub struct CliArgs {
    pub overrides: AppConfig,
    pub config_path: Option<PathBuf>,
    pub log_level: Option<String>,
    pub help: bool,
    pub version: bool,
}

/// Parse `trello-sync` arguments (without the program name).
pub fn parse_args(args: &[String]) -> Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut i = 0;

    while i < args.len() {
        let flag = args[i].as_str();
        match flag {
            "-h" | "--help" => cli.help = true,
            "-V" | "--version" => cli.version = true,
            "--dry-run" => cli.overrides.dry_run = Some(true),
            "--trello-app-key"
            | "--trello-token"
            | "--trello-board-id"
            | "--google-service-account"
            | "--google-spreadsheet-id"
            | "--google-spreadsheet-service"
            | "--done-list"
            | "--store"
            | "--logs"
            | "--config"
            | "--log-level" => {
                i += 1;
                let Some(value) = args.get(i).cloned() else {
                    bail!("Missing value for {flag}");
                };
                let o = &mut cli.overrides;
                match flag {
                    "--trello-app-key" => o.trello_app_key = Some(value),
                    "--trello-token" => o.trello_token = Some(value),
                    "--trello-board-id" => o.trello_board_id = Some(value),
                    "--google-service-account" => o.google_service_account = Some(value.into()),
                    "--google-spreadsheet-id" => o.google_spreadsheet_id = Some(value),
                    "--google-spreadsheet-service" => o.google_spreadsheet_service = Some(value),
                    "--done-list" => o.done_list = Some(value),
                    "--store" => o.store = Some(value.into()),
                    "--logs" => o.logs = Some(value.into()),
                    "--config" => cli.config_path = Some(value.into()),
                    _ => cli.log_level = Some(value),
                }
            }
            other => bail!("Unknown argument: {other}\n\nRun `trello-sync --help` for usage."),
        }
        i += 1;
    }

    Ok(cli)
}

pub fn print_help() {
    print!("{}", help_text());
}

fn help_text() -> String {
    let env_vars = ENV_VARS.join(", ");
    format!(
        "trello-sync {VERSION} — sync a Trello board to a Google Spreadsheet

USAGE:
  trello-sync [OPTIONS]

OPTIONS:
  --trello-app-key <key>              Trello application key
  --trello-token <token>              Trello API token
  --trello-board-id <id>              Board to sync
  --google-service-account <path>     Service-account JSON file
  --google-spreadsheet-id <id>        Target spreadsheet
  --google-spreadsheet-service <url>  Location of the spreadsheet service
  --done-list <name>                  Column whose cards get archived [default: Done]
  --store <path>                      Write the final run state to this file
  --logs <dir>                        Write per-stage logs to this directory
  --config <path>                     Config file [default: ~/.trello-sync/config.toml]
  --log-level <level>                 Log filter when RUST_LOG is unset [default: info]
  --dry-run                           Print the calls without making them
  -h, --help                          Show this help
  -V, --version                       Show the version

Every option can also be set in the config file using its camelCase name
(e.g. trelloBoardId). Environment variables: {env_vars}.
"
    )
}
