use std::path::Path;

use chrono::{DateTime, Local};
use serde_json::Value;

use super::stage::{Argument, InputProducer, TaskSpec};
use super::state::RunState;
use super::{ARCHIVE_ENDPOINT, SPREADSHEET_SERVICE, TRELLO_SERVICE, UPSERT_ENDPOINT};
use crate::error::{CredentialLoadError, SyncError};
use crate::model::card::{decode_cards, Card};
use crate::model::row::project_rows;
use crate::model::service_account::ServiceAccount;

/// Static board credentials shared by the fetch and archive stages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrelloCredentials {
    pub app_key: String,
    pub token: String,
    pub board_id: String,
}

impl TrelloCredentials {
    pub fn arguments(&self) -> Vec<Argument> {
        vec![
            Argument::new("App", self.app_key.as_str()),
            Argument::new("Token", self.token.as_str()),
            Argument::new("Board", self.board_id.as_str()),
        ]
    }
}

/// Decode the cards recorded by `stage`.
pub fn fetched_cards(state: &RunState, stage: &str) -> Result<Vec<Card>, SyncError> {
    let output = state
        .output_of(stage)
        .ok_or_else(|| SyncError::InputUnavailable {
            stage: stage.to_string(),
        })?;
    Ok(decode_cards(output)?)
}

type Clock = Box<dyn Fn() -> DateTime<Local> + Send + Sync>;

/// Turns fetched cards into a spreadsheet upsert.
pub struct UpsertProducer {
    source_stage: String,
    credential: Result<ServiceAccount, CredentialLoadError>,
    spreadsheet_id: String,
    clock: Clock,
}

impl UpsertProducer {
    /// Loads the service account right away. A failed load is kept and
    /// returned from every `produce` call; the file is not read again.
    pub fn new(source_stage: &str, service_account_path: &Path, spreadsheet_id: &str) -> Self {
        let credential = ServiceAccount::load(service_account_path);
        if let Err(err) = &credential {
            tracing::error!(error = %err, "service account unavailable, spreadsheet upsert disabled");
        }
        Self {
            source_stage: source_stage.to_string(),
            credential,
            spreadsheet_id: spreadsheet_id.to_string(),
            clock: Box::new(Local::now),
        }
    }

    #[cfg(test)]
    pub fn with_clock(mut self, clock: impl Fn() -> DateTime<Local> + Send + Sync + 'static) -> Self {
        self.clock = Box::new(clock);
        self
    }
}

impl InputProducer for UpsertProducer {
    fn produce(&self, state: &RunState) -> Result<TaskSpec, SyncError> {
        let account = self.credential.as_ref().map_err(|e| e.clone())?;
        let cards = fetched_cards(state, &self.source_stage)?;
        let rows = project_rows(&cards, (self.clock)());
        tracing::debug!(rows = rows.len(), "projected cards into rows");

        Ok(TaskSpec {
            service: SPREADSHEET_SERVICE.to_string(),
            endpoint: UPSERT_ENDPOINT.to_string(),
            arguments: vec![
                Argument::new("Rows", rows.into_iter().map(Value::from).collect::<Vec<_>>()),
                Argument::new("ServiceAccount", account.to_value()),
                Argument::new("SpreadsheetID", self.spreadsheet_id.as_str()),
            ],
        })
    }
}

/// Selects cards sitting in the done column for archiving.
pub struct ArchiveProducer {
    source_stage: String,
    trello: TrelloCredentials,
    done_list: String,
}

impl ArchiveProducer {
    pub fn new(source_stage: &str, trello: TrelloCredentials, done_list: &str) -> Self {
        Self {
            source_stage: source_stage.to_string(),
            trello,
            done_list: done_list.to_string(),
        }
    }
}

impl InputProducer for ArchiveProducer {
    fn produce(&self, state: &RunState) -> Result<TaskSpec, SyncError> {
        let card_ids: Vec<String> = fetched_cards(state, &self.source_stage)?
            .into_iter()
            .filter(|card| card.list_name == self.done_list)
            .map(|card| card.id)
            .collect();
        tracing::debug!(cards = card_ids.len(), list = %self.done_list, "selected cards to archive");

        let mut arguments = self.trello.arguments();
        arguments.push(Argument::new("CardIDs", card_ids));
        Ok(TaskSpec {
            service: TRELLO_SERVICE.to_string(),
            endpoint: ARCHIVE_ENDPOINT.to_string(),
            arguments,
        })
    }
}
