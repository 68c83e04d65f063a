use chrono::{DateTime, Duration, Local};
use serde::{Deserialize, Serialize};

use super::card::Card;

/// Timestamp layout expected by the spreadsheet (day-month-year).
pub const TIMESTAMP_FORMAT: &str = "%d-%m-%Y %H:%M:%S";

/// One spreadsheet line derived from a card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Row {
    #[serde(rename = "ID")]
    pub id: String,
    /// synced at, last activity, name, url, labels, list name
    #[serde(rename = "Data")]
    pub cells: Vec<String>,
}

impl Row {
    pub fn from_card(card: &Card, synced_at: &str) -> Self {
        let last_activity = card
            .last_activity_at
            .map(|ts| ts.format(TIMESTAMP_FORMAT).to_string())
            .unwrap_or_default();

        Row {
            id: card.short_id.to_string(),
            cells: vec![
                synced_at.to_string(),
                last_activity,
                card.name.clone(),
                card.url.clone(),
                card.labels.join(" "),
                card.list_name.clone(),
            ],
        }
    }
}

impl From<Row> for serde_json::Value {
    fn from(row: Row) -> Self {
        serde_json::json!({ "ID": row.id, "Data": row.cells })
    }
}

/// Project cards into spreadsheet rows, keeping their order.
///
/// The synced-at cell is `now` minus one day in the process' local time zone;
/// the last-activity cell keeps the offset the board reported.
pub fn project_rows(cards: &[Card], now: DateTime<Local>) -> Vec<Row> {
    let synced_at = (now - Duration::days(1))
        .format(TIMESTAMP_FORMAT)
        .to_string();
    cards
        .iter()
        .map(|card| Row::from_card(card, &synced_at))
        .collect()
}
