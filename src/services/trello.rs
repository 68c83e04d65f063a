use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashMap;

use super::{required_arg, Service};
use crate::pipeline::stage::Argument;
use crate::pipeline::{ARCHIVE_ENDPOINT, FETCH_ENDPOINT, TRELLO_SERVICE};

const BASE: &str = "https://api.trello.com/1";

const CARD_FIELDS: &str = "id,idShort,name,desc,url,shortUrl,idList,labels,dateLastActivity";

pub struct TrelloService {
    client: reqwest::Client,
}

impl TrelloService {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

#[derive(Deserialize)]
struct TrelloList {
    id: String,
    name: String,
}

struct Auth {
    key: String,
    token: String,
}

impl Auth {
    fn from_arguments(arguments: &[Argument]) -> Result<Self> {
        Ok(Self {
            key: required_arg(arguments, "App")?,
            token: required_arg(arguments, "Token")?,
        })
    }

    fn params(&self) -> [(&str, &str); 2] {
        [("key", &self.key), ("token", &self.token)]
    }
}

/// Add `listName` to every card object, resolved through its `idList`.
fn annotate_list_names(cards: &mut [Value], lists: Vec<TrelloList>) {
    let list_map: HashMap<String, String> = lists.into_iter().map(|l| (l.id, l.name)).collect();
    for card in cards.iter_mut() {
        if let Some(object) = card.as_object_mut() {
            let list_name = object
                .get("idList")
                .and_then(Value::as_str)
                .and_then(|id| list_map.get(id))
                .cloned()
                .unwrap_or_default();
            object.insert("listName".into(), list_name.into());
        }
    }
}

fn split_card_ids(joined: &str) -> Vec<&str> {
    joined
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .collect()
}

impl TrelloService {
    async fn get_cards(&self, arguments: &[Argument]) -> Result<String> {
        let auth = Auth::from_arguments(arguments)?;
        let board = required_arg(arguments, "Board")?;

        let cards_fut = self
            .client
            .get(format!("{BASE}/boards/{board}/cards"))
            .query(&auth.params())
            .query(&[("fields", CARD_FIELDS)])
            .send();

        let lists_fut = self
            .client
            .get(format!("{BASE}/boards/{board}/lists"))
            .query(&auth.params())
            .query(&[("fields", "id,name")])
            .send();

        let (cards_resp, lists_resp) =
            tokio::try_join!(cards_fut, lists_fut).context("Trello board request failed")?;
        let mut cards: Vec<Value> = cards_resp
            .error_for_status()
            .context("Trello refused the cards request")?
            .json()
            .await
            .context("Failed to parse Trello cards")?;
        let lists: Vec<TrelloList> = lists_resp
            .error_for_status()
            .context("Trello refused the lists request")?
            .json()
            .await
            .context("Failed to parse Trello lists")?;

        annotate_list_names(&mut cards, lists);
        tracing::info!(board = %board, cards = cards.len(), "fetched cards");
        Ok(serde_json::to_string(&cards)?)
    }

    async fn archive_cards(&self, arguments: &[Argument]) -> Result<String> {
        let auth = Auth::from_arguments(arguments)?;
        let joined = required_arg(arguments, "CardIDs")?;
        let ids = split_card_ids(&joined);

        let requests = ids.iter().map(|id| {
            let request = self
                .client
                .put(format!("{BASE}/cards/{id}"))
                .query(&auth.params())
                .query(&[("closed", "true")])
                .send();
            async move {
                request
                    .await
                    .and_then(|resp| resp.error_for_status())
                    .with_context(|| format!("Failed to archive Trello card {id}"))
            }
        });
        futures::future::try_join_all(requests).await?;

        tracing::info!(cards = ids.len(), "archived cards");
        Ok(serde_json::to_string(&ids)?)
    }
}

#[async_trait]
impl Service for TrelloService {
    fn name(&self) -> &str {
        TRELLO_SERVICE
    }

    async fn call(&self, endpoint: &str, arguments: &[Argument]) -> Result<String> {
        match endpoint {
            FETCH_ENDPOINT => self.get_cards(arguments).await,
            ARCHIVE_ENDPOINT => self.archive_cards(arguments).await,
            other => bail!("{TRELLO_SERVICE} has no endpoint {other}"),
        }
    }
}
