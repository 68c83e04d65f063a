use std::fmt;

use super::state::{Event, RunState};

/// Condition that makes a stage eligible to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    EngineStarted,
    StageSucceeded(String),
}

impl Trigger {
    pub fn is_satisfied(&self, event: &Event, state: &RunState) -> bool {
        match self {
            Trigger::EngineStarted => engine_started(event),
            Trigger::StageSucceeded(stage) => stage_succeeded(stage, state),
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::EngineStarted => f.write_str("Engine started"),
            Trigger::StageSucceeded(stage) => write!(f, "{stage} finished successfully"),
        }
    }
}

pub fn engine_started(event: &Event) -> bool {
    matches!(event, Event::EngineStarted)
}

/// "Eventually succeeded": any successful record counts, not just the latest.
pub fn stage_succeeded(stage: &str, state: &RunState) -> bool {
    state.succeeded(stage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::state::StageStatus;

    #[test]
    fn engine_started_only_matches_start_event() {
        let state = RunState::new();
        let trigger = Trigger::EngineStarted;
        assert!(trigger.is_satisfied(&Event::EngineStarted, &state));
        assert!(!trigger.is_satisfied(&Event::EngineFinished, &state));
        assert!(!trigger.is_satisfied(
            &Event::StageFinished {
                stage: "Fetch".into()
            },
            &state
        ));
    }

    #[test]
    fn stage_succeeded_ignores_the_event() {
        let mut state = RunState::new();
        state.begin("Fetch").unwrap();
        state
            .finish("Fetch", StageStatus::Success, Some("[]".into()), None)
            .unwrap();

        let trigger = Trigger::StageSucceeded("Fetch".into());
        assert!(trigger.is_satisfied(&Event::EngineStarted, &state));
        assert!(trigger.is_satisfied(&Event::EngineFinished, &state));
    }

    #[test]
    fn stage_succeeded_is_false_for_unknown_or_failed_stage() {
        let mut state = RunState::new();
        state.begin("X").unwrap();
        state
            .finish("X", StageStatus::Failure, None, Some("boom".into()))
            .unwrap();

        assert!(!stage_succeeded("X", &state));
        assert!(!stage_succeeded("Y", &state));
    }

    #[test]
    fn display_names_the_condition() {
        assert_eq!(
            Trigger::StageSucceeded("Update Google Spreadsheet".into()).to_string(),
            "Update Google Spreadsheet finished successfully"
        );
    }
}
