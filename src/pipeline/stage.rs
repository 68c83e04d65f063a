use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::state::RunState;
use super::trigger::Trigger;
use crate::error::SyncError;

/// One named key/value input handed to a service endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub key: String,
    pub value: Value,
}

impl Argument {
    pub fn new(key: &str, value: impl Into<Value>) -> Self {
        Self {
            key: key.to_string(),
            value: value.into(),
        }
    }

    /// String view of the value. Arrays of strings are comma-joined.
    pub fn as_text(&self) -> Option<String> {
        match &self.value {
            Value::String(s) => Some(s.clone()),
            Value::Array(items) => items
                .iter()
                .map(|v| v.as_str().map(String::from))
                .collect::<Option<Vec<_>>>()
                .map(|parts| parts.join(",")),
            _ => None,
        }
    }
}

/// What to call once a stage fires: a service, one of its endpoints, and
/// ordered arguments.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskSpec {
    pub service: String,
    pub endpoint: String,
    pub arguments: Vec<Argument>,
}

impl TaskSpec {
    pub fn argument(&self, key: &str) -> Option<&Argument> {
        self.arguments.iter().find(|a| a.key == key)
    }
}

/// Builds a stage's task from the current run state.
pub trait InputProducer: Send + Sync {
    fn produce(&self, state: &RunState) -> Result<TaskSpec, SyncError>;
}

pub enum StageInput {
    Static(TaskSpec),
    Derived(Box<dyn InputProducer>),
}

pub struct Stage {
    pub name: String,
    pub trigger: Trigger,
    pub input: StageInput,
}

impl Stage {
    pub fn new(name: &str, trigger: Trigger, input: StageInput) -> Self {
        Self {
            name: name.to_string(),
            trigger,
            input,
        }
    }

    pub fn task(&self, state: &RunState) -> Result<TaskSpec, SyncError> {
        match &self.input {
            StageInput::Static(spec) => Ok(spec.clone()),
            StageInput::Derived(producer) => producer.produce(state),
        }
    }
}
