use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::engine::EngineOptions;
use crate::pipeline::producers::TrelloCredentials;
use crate::pipeline::PipelineSettings;

pub const DEFAULT_DONE_LIST: &str = "Done";

/// Environment variables read by [`AppConfig::from_env`].
pub const ENV_VARS: &[&str] = &[
    "TRELLO_APP_KEY",
    "TRELLO_TOKEN",
    "TRELLO_BOARD_ID",
    "GOOGLE_SERVICE_ACCOUNT",
    "GOOGLE_SPREADSHEET_ID",
    "GOOGLE_SPREADSHEET_SERVICE",
    "TRELLO_SYNC_DONE_LIST",
];

/// Sync settings. Each layer (file, environment, flags) produces one of
/// these and later layers win through [`AppConfig::merge`].
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    pub trello_app_key: Option<String>,
    pub trello_token: Option<String>,
    pub trello_board_id: Option<String>,
    pub google_service_account: Option<PathBuf>,
    pub google_spreadsheet_id: Option<String>,
    /// Location of the spreadsheet service.
    pub google_spreadsheet_service: Option<String>,
    pub done_list: Option<String>,
    /// Where to write the final run state.
    pub store: Option<PathBuf>,
    /// Directory for per-stage logs.
    pub logs: Option<PathBuf>,
    pub dry_run: Option<bool>,
}

impl AppConfig {
    /// Values set in `other` replace ours.
    pub fn merge(self, other: AppConfig) -> AppConfig {
        AppConfig {
            trello_app_key: other.trello_app_key.or(self.trello_app_key),
            trello_token: other.trello_token.or(self.trello_token),
            trello_board_id: other.trello_board_id.or(self.trello_board_id),
            google_service_account: other.google_service_account.or(self.google_service_account),
            google_spreadsheet_id: other.google_spreadsheet_id.or(self.google_spreadsheet_id),
            google_spreadsheet_service: other
                .google_spreadsheet_service
                .or(self.google_spreadsheet_service),
            done_list: other.done_list.or(self.done_list),
            store: other.store.or(self.store),
            logs: other.logs.or(self.logs),
            dry_run: other.dry_run.or(self.dry_run),
        }
    }

    /// Reads the variables listed in [`ENV_VARS`]. Empty values count as unset.
    pub fn from_env(lookup: impl Fn(&str) -> Option<String>) -> AppConfig {
        let var = |name: &str| lookup(name).filter(|v| !v.is_empty());
        AppConfig {
            trello_app_key: var("TRELLO_APP_KEY"),
            trello_token: var("TRELLO_TOKEN"),
            trello_board_id: var("TRELLO_BOARD_ID"),
            google_service_account: var("GOOGLE_SERVICE_ACCOUNT").map(PathBuf::from),
            google_spreadsheet_id: var("GOOGLE_SPREADSHEET_ID"),
            google_spreadsheet_service: var("GOOGLE_SPREADSHEET_SERVICE"),
            done_list: var("TRELLO_SYNC_DONE_LIST"),
            ..AppConfig::default()
        }
    }

    pub fn is_dry_run(&self) -> bool {
        self.dry_run.unwrap_or(false)
    }

    pub fn missing_keys(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.trello_app_key.is_none() {
            missing.push("trelloAppKey");
        }
        if self.trello_token.is_none() {
            missing.push("trelloToken");
        }
        if self.trello_board_id.is_none() {
            missing.push("trelloBoardId");
        }
        if self.google_service_account.is_none() {
            missing.push("googleServiceAccount");
        }
        if self.google_spreadsheet_id.is_none() {
            missing.push("googleSpreadsheetId");
        }
        if self.google_spreadsheet_service.is_none() && !self.is_dry_run() {
            missing.push("googleSpreadsheetService");
        }
        missing
    }

    pub fn pipeline_settings(&self) -> Result<PipelineSettings> {
        let missing = self.missing_keys();
        if !missing.is_empty() {
            bail!("Missing required configuration: {}", missing.join(", "));
        }
        // missing_keys() guarantees the required values are present
        Ok(PipelineSettings {
            trello: TrelloCredentials {
                app_key: self.trello_app_key.clone().unwrap_or_default(),
                token: self.trello_token.clone().unwrap_or_default(),
                board_id: self.trello_board_id.clone().unwrap_or_default(),
            },
            service_account_path: self.google_service_account.clone().unwrap_or_default(),
            spreadsheet_id: self.google_spreadsheet_id.clone().unwrap_or_default(),
            done_list: self
                .done_list
                .clone()
                .unwrap_or_else(|| DEFAULT_DONE_LIST.to_string()),
        })
    }

    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            dry_run: self.is_dry_run(),
            state_file: self.store.clone(),
            logs_dir: self.logs.clone(),
        }
    }
}

fn config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".trello-sync")
        .join("config.toml")
}

/// Load the config file. The default location may be absent; an explicit
/// path must exist.
pub fn load_config(explicit: Option<&Path>) -> Result<AppConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = config_path();
            if !path.exists() {
                return Ok(AppConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: AppConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn complete() -> AppConfig {
        AppConfig {
            trello_app_key: Some("app".into()),
            trello_token: Some("token".into()),
            trello_board_id: Some("board".into()),
            google_service_account: Some(PathBuf::from("/etc/sa.json")),
            google_spreadsheet_id: Some("sheet".into()),
            google_spreadsheet_service: Some("http://localhost:8080".into()),
            ..AppConfig::default()
        }
    }

    #[test]
    fn parses_camel_case_toml() {
        let config: AppConfig = toml::from_str(
            r#"
            trelloAppKey = "app"
            trelloToken = "token"
            trelloBoardId = "board"
            googleServiceAccount = "/etc/sa.json"
            googleSpreadsheetId = "sheet"
            doneList = "Finished"
            dryRun = true
            "#,
        )
        .unwrap();
        assert_eq!(config.trello_board_id.as_deref(), Some("board"));
        assert_eq!(config.done_list.as_deref(), Some("Finished"));
        assert!(config.is_dry_run());
    }

    #[test]
    fn later_layer_wins() {
        let file = AppConfig {
            trello_token: Some("from-file".into()),
            done_list: Some("Finished".into()),
            ..AppConfig::default()
        };
        let flags = AppConfig {
            trello_token: Some("from-flag".into()),
            ..AppConfig::default()
        };
        let merged = file.merge(flags);
        assert_eq!(merged.trello_token.as_deref(), Some("from-flag"));
        assert_eq!(merged.done_list.as_deref(), Some("Finished"));
    }

    #[test]
    fn env_layer_reads_known_variables() {
        let vars: HashMap<&str, &str> = [
            ("TRELLO_APP_KEY", "app"),
            ("TRELLO_TOKEN", ""),
            ("GOOGLE_SERVICE_ACCOUNT", "/tmp/sa.json"),
        ]
        .into_iter()
        .collect();
        let config = AppConfig::from_env(|name| vars.get(name).map(|v| v.to_string()));
        assert_eq!(config.trello_app_key.as_deref(), Some("app"));
        assert_eq!(config.trello_token, None);
        assert_eq!(
            config.google_service_account,
            Some(PathBuf::from("/tmp/sa.json"))
        );
    }

    #[test]
    fn missing_keys_are_all_reported() {
        let err = AppConfig::default().pipeline_settings().unwrap_err();
        let msg = err.to_string();
        for key in [
            "trelloAppKey",
            "trelloToken",
            "trelloBoardId",
            "googleServiceAccount",
            "googleSpreadsheetId",
            "googleSpreadsheetService",
        ] {
            assert!(msg.contains(key), "{key} not in: {msg}");
        }
    }

    #[test]
    fn dry_run_does_not_need_spreadsheet_service() {
        let config = AppConfig {
            google_spreadsheet_service: None,
            dry_run: Some(true),
            ..complete()
        };
        assert!(config.missing_keys().is_empty());
    }

    #[test]
    fn done_list_defaults_to_done() {
        let settings = complete().pipeline_settings().unwrap();
        assert_eq!(settings.done_list, DEFAULT_DONE_LIST);
        assert_eq!(settings.trello.board_id, "board");
        assert_eq!(settings.service_account_path, PathBuf::from("/etc/sa.json"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = load_config(Some(&dir.path().join("nope.toml")));
        assert!(result.is_err());
    }

    #[test]
    fn explicit_file_is_loaded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "trelloBoardId = \"b1\"\nstore = \"/tmp/state.json\"\n").unwrap();
        let config = load_config(Some(&path)).unwrap();
        assert_eq!(config.trello_board_id.as_deref(), Some("b1"));
        assert_eq!(config.engine_options().state_file, Some(PathBuf::from("/tmp/state.json")));
    }

    #[test]
    fn every_listed_env_var_is_read() {
        for name in ENV_VARS {
            let config = AppConfig::from_env(|var| (var == *name).then(|| "x".to_string()));
            assert_ne!(config, AppConfig::default(), "{name} is not read");
        }
    }
}
