use chrono::{DateTime, FixedOffset};
use serde::{de, Deserialize, Deserializer};

use crate::error::DecodeError;

/// A board card as seen by the sync pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Card {
    /// Opaque board id, used for API calls (e.g. archiving).
    pub id: String,
    /// Human-facing number shown on the board.
    pub short_id: i64,
    pub name: String,
    pub description: String,
    pub url: String,
    /// Column the card currently sits in. Empty when unknown.
    pub list_name: String,
    pub labels: Vec<String>,
    pub last_activity_at: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCard {
    id: String,
    #[serde(default, deserialize_with = "whole_number")]
    id_short: i64,
    name: Option<String>,
    desc: Option<String>,
    url: Option<String>,
    short_url: Option<String>,
    list_name: Option<String>,
    #[serde(rename = "List")]
    list_object: Option<RawList>,
    list: Option<RawList>,
    labels: Option<Vec<RawLabel>>,
    date_last_activity: Option<DateTime<FixedOffset>>,
}

#[derive(Deserialize)]
struct RawList {
    name: Option<String>,
}

#[derive(Deserialize)]
struct RawLabel {
    name: Option<String>,
}

// The board API sometimes hands numbers back as floats; short ids are
// always whole so truncating is lossless in practice.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let Some(value) = Option::<f64>::deserialize(deserializer)? else {
        return Ok(0);
    };
    let truncated = value.trunc();
    // i64::MAX as f64 rounds up to 2^63, so the upper bound is exclusive.
    if !truncated.is_finite() || truncated < i64::MIN as f64 || truncated >= i64::MAX as f64 {
        return Err(de::Error::custom(format!(
            "short id {value} is not a representable whole number"
        )));
    }
    Ok(truncated as i64)
}

impl From<RawCard> for Card {
    fn from(raw: RawCard) -> Self {
        let list_name = raw
            .list_name
            .or_else(|| raw.list_object.and_then(|l| l.name))
            .or_else(|| raw.list.and_then(|l| l.name))
            .unwrap_or_default();
        let labels = raw
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.name.unwrap_or_default())
            .collect();

        Card {
            id: raw.id,
            short_id: raw.id_short,
            name: raw.name.unwrap_or_default(),
            description: raw.desc.unwrap_or_default(),
            url: raw.short_url.or(raw.url).unwrap_or_default(),
            list_name,
            labels,
            last_activity_at: raw.date_last_activity,
        }
    }
}

/// Decode the card collection returned by the fetch stage.
///
/// Unknown fields are ignored and the input order is kept.
pub fn decode_cards(payload: &str) -> Result<Vec<Card>, DecodeError> {
    let raw: Vec<RawCard> = serde_json::from_str(payload)?;
    raw.into_iter()
        .enumerate()
        .map(|(index, card)| {
            if card.id.is_empty() {
                Err(DecodeError::EmptyId { index })
            } else {
                Ok(Card::from(card))
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_cards_in_input_order() {
        let payload = r#"[
            {"id": "a1", "idShort": 1, "name": "First"},
            {"id": "b2", "idShort": 2, "name": "Second"},
            {"id": "c3", "idShort": 3, "name": "Third"}
        ]"#;
        let cards = decode_cards(payload).unwrap();
        let ids: Vec<&str> = cards.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, ["a1", "b2", "c3"]);
    }

    #[test]
    fn unknown_fields_do_not_change_the_result() {
        let plain = r#"[{"id": "c1", "idShort": 5, "name": "Ship it", "listName": "Done"}]"#;
        let extended = r#"[{"id": "c1", "idShort": 5, "name": "Ship it", "listName": "Done",
            "badges": {"votes": 3}, "closed": false, "idLabels": ["x"], "pos": 16384.5}]"#;
        assert_eq!(decode_cards(plain).unwrap(), decode_cards(extended).unwrap());
    }

    #[test]
    fn float_short_ids_are_truncated() {
        let payload = r#"[{"id": "a", "idShort": 7.0}, {"id": "b", "idShort": 12.9}]"#;
        let cards = decode_cards(payload).unwrap();
        assert_eq!(cards[0].short_id, 7);
        assert_eq!(cards[1].short_id, 12);
    }

    #[test]
    fn list_name_falls_back_to_nested_list() {
        let payload = r#"[
            {"id": "a", "List": {"id": "l1", "name": "Finished"}},
            {"id": "b", "listName": "Done", "list": {"name": "Ignored"}},
            {"id": "c"}
        ]"#;
        let cards = decode_cards(payload).unwrap();
        assert_eq!(cards[0].list_name, "Finished");
        assert_eq!(cards[1].list_name, "Done");
        assert_eq!(cards[2].list_name, "");
    }

    #[test]
    fn both_nested_list_spellings_are_tolerated() {
        let payload = r#"[
            {"id": "a", "listName": "Done", "List": {"name": "X"}, "list": {"name": "Y"}},
            {"id": "b", "List": {"name": "X"}, "list": {"name": "Y"}},
            {"id": "c", "list": {"name": "Y"}}
        ]"#;
        let cards = decode_cards(payload).unwrap();
        assert_eq!(cards[0].list_name, "Done");
        assert_eq!(cards[1].list_name, "X");
        assert_eq!(cards[2].list_name, "Y");
    }

    #[test]
    fn out_of_range_short_id_is_a_decode_error() {
        for payload in [
            r#"[{"id": "a", "idShort": 1e30}]"#,
            r#"[{"id": "a", "idShort": -1e30}]"#,
        ] {
            match decode_cards(payload) {
                Err(DecodeError::Json(err)) => {
                    assert!(err.to_string().contains("short id"), "got: {err}")
                }
                other => panic!("expected Json error, got {other:?}"),
            }
        }
    }

    #[test]
    fn negative_fractions_truncate_toward_zero() {
        let cards = decode_cards(r#"[{"id": "a", "idShort": -3.7}]"#).unwrap();
        assert_eq!(cards[0].short_id, -3);
    }

    #[test]
    fn short_url_is_preferred() {
        let payload = r#"[
            {"id": "a", "url": "https://trello.com/c/abc/1-long", "shortUrl": "https://trello.com/c/abc"},
            {"id": "b", "url": "https://trello.com/c/def/2-long"}
        ]"#;
        let cards = decode_cards(payload).unwrap();
        assert_eq!(cards[0].url, "https://trello.com/c/abc");
        assert_eq!(cards[1].url, "https://trello.com/c/def/2-long");
    }

    #[test]
    fn labels_keep_their_order() {
        let payload = r#"[{"id": "a", "labels": [
            {"id": "1", "name": "B", "color": "red"},
            {"id": "2", "name": "A", "color": "blue"}
        ]}]"#;
        let cards = decode_cards(payload).unwrap();
        assert_eq!(cards[0].labels, ["B", "A"]);
    }

    #[test]
    fn parses_last_activity_timestamp() {
        let payload = r#"[{"id": "a", "dateLastActivity": "2024-03-01T10:20:30.000Z"}]"#;
        let cards = decode_cards(payload).unwrap();
        let ts = cards[0].last_activity_at.unwrap();
        assert_eq!(ts.to_rfc3339(), "2024-03-01T10:20:30+00:00");
    }

    #[test]
    fn malformed_payload_is_a_decode_error() {
        assert!(matches!(
            decode_cards("not json"),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(
            decode_cards(r#"{"id": "a"}"#),
            Err(DecodeError::Json(_))
        ));
    }

    #[test]
    fn empty_id_is_rejected() {
        let payload = r#"[{"id": "a"}, {"id": ""}]"#;
        match decode_cards(payload) {
            Err(DecodeError::EmptyId { index }) => assert_eq!(index, 1),
            other => panic!("expected EmptyId, got {other:?}"),
        }
    }

    #[test]
    fn empty_collection_decodes_to_nothing() {
        assert!(decode_cards("[]").unwrap().is_empty());
    }
}
