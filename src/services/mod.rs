pub mod http;
pub mod trello;

use anyhow::{Context, Result};
use async_trait::async_trait;

use crate::config::AppConfig;
use crate::pipeline::stage::Argument;
use crate::pipeline::SPREADSHEET_SERVICE;

/// An external system a stage's task is dispatched to.
#[async_trait]
pub trait Service: Send + Sync {
    fn name(&self) -> &str;
    /// Call `endpoint` with the task arguments and return its raw output.
    async fn call(&self, endpoint: &str, arguments: &[Argument]) -> Result<String>;
}

/// Text value of a required argument.
pub fn required_arg(arguments: &[Argument], key: &str) -> Result<String> {
    arguments
        .iter()
        .find(|a| a.key == key)
        .and_then(Argument::as_text)
        .with_context(|| format!("missing argument {key}"))
}

pub fn find_service<'a>(services: &'a [Box<dyn Service>], name: &str) -> Option<&'a dyn Service> {
    services.iter().find(|s| s.name() == name).map(|s| s.as_ref())
}


pub fn create_services(config: &AppConfig) -> Vec<Box<dyn Service>> {
    let mut services: Vec<Box<dyn Service>> = vec![Box::new(trello::TrelloService::new())];

    if let Some(location) = &config.google_spreadsheet_service {
        services.push(Box::new(http::HttpService::new(
            SPREADSHEET_SERVICE,
            location.clone(),
        )));
    }

    services
}
