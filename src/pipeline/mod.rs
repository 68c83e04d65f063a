pub mod producers;
pub mod stage;
pub mod state;
pub mod trigger;

use std::path::PathBuf;

use crate::error::SyncError;
use producers::{ArchiveProducer, TrelloCredentials, UpsertProducer};
use stage::{Stage, StageInput, TaskSpec};
use state::{Event, RunState};
use trigger::Trigger;

pub const PIPELINE_NAME: &str = "sync-trello";

pub const FETCH_STAGE: &str = "Fetch Cards From Trello";
pub const UPSERT_STAGE: &str = "Update Google Spreadsheet";
pub const ARCHIVE_STAGE: &str = "Archive sync cards";

pub const TRELLO_SERVICE: &str = "TrelloSVC";
pub const SPREADSHEET_SERVICE: &str = "GoogleSVC";

pub const FETCH_ENDPOINT: &str = "GetCards";
pub const UPSERT_ENDPOINT: &str = "Upsert";
pub const ARCHIVE_ENDPOINT: &str = "ArchiveCard";

/// Everything the three stages need, passed in explicitly.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub trello: TrelloCredentials,
    pub service_account_path: PathBuf,
    pub spreadsheet_id: String,
    pub done_list: String,
}

pub struct Pipeline {
    pub name: String,
    pub stages: Vec<Stage>,
}

/// Outcome of checking one stage against an event.
#[derive(Debug)]
pub enum Evaluation<'a> {
    Run { stage: &'a str, task: TaskSpec },
    Skipped { stage: &'a str, error: SyncError },
}

impl Pipeline {
    /// Stages whose trigger holds for `event`, with their prepared tasks.
    ///
    /// Stages that already have a record in `state` are not offered again.
    /// A producer error skips that stage for this evaluation only.
    pub fn evaluate(&self, event: &Event, state: &RunState) -> Vec<Evaluation<'_>> {
        self.stages
            .iter()
            .filter(|stage| !state.has_record(&stage.name))
            .filter(|stage| stage.trigger.is_satisfied(event, state))
            .map(|stage| match stage.task(state) {
                Ok(task) => Evaluation::Run {
                    stage: &stage.name,
                    task,
                },
                Err(error) => Evaluation::Skipped {
                    stage: &stage.name,
                    error,
                },
            })
            .collect()
    }
}

/// Fetch, then upsert, then archive.
pub fn build(settings: &PipelineSettings) -> Pipeline {
    let fetch = Stage::new(
        FETCH_STAGE,
        Trigger::EngineStarted,
        StageInput::Static(TaskSpec {
            service: TRELLO_SERVICE.to_string(),
            endpoint: FETCH_ENDPOINT.to_string(),
            arguments: settings.trello.arguments(),
        }),
    );

    let upsert = Stage::new(
        UPSERT_STAGE,
        Trigger::StageSucceeded(FETCH_STAGE.to_string()),
        StageInput::Derived(Box::new(UpsertProducer::new(
            FETCH_STAGE,
            &settings.service_account_path,
            &settings.spreadsheet_id,
        ))),
    );

    let archive = Stage::new(
        ARCHIVE_STAGE,
        Trigger::StageSucceeded(UPSERT_STAGE.to_string()),
        StageInput::Derived(Box::new(ArchiveProducer::new(
            FETCH_STAGE,
            settings.trello.clone(),
            &settings.done_list,
        ))),
    );

    Pipeline {
        name: PIPELINE_NAME.to_string(),
        stages: vec![fetch, upsert, archive],
    }
}
