//! Response parsing: recovers the outermost JSON object from LLM prose,
//! validates it against the groups schema, and maps it into candidate
//! groups (spec §4.F).

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;
use uuid::Uuid;

use crate::store::models::Item;
use crate::util::json::extract_outer_object;

use super::schema::validate_groups_response;

#[derive(Debug, Deserialize)]
struct RawResponse {
    groups: Vec<RawGroup>,
}

#[derive(Debug, Deserialize)]
struct RawGroup {
    items: Vec<RawItem>,
    connection: String,
    #[serde(rename = "connectionType")]
    connection_type: String,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct RawItem {
    title: String,
    year: Option<i32>,
}

/// One raw candidate out of an LLM call, before verification.
#[derive(Debug, Clone)]
pub struct GeneratedGroup {
    pub id: Uuid,
    pub items: Vec<Item>,
    pub connection: String,
    pub connection_type: String,
    pub explanation: String,
}

/// The contract violation this module raises when the response can't be
/// recovered at all (spec §4.F "raises `MalformedResponse`").
#[derive(Debug, thiserror::Error)]
#[error("malformed LLM response: {0}")]
pub struct MalformedResponse(pub String);

pub fn parse_groups_response(text: &str) -> Result<Vec<GeneratedGroup>> {
    let value = extract_outer_object(text).map_err(|e| MalformedResponse(e.to_string()))?;

    if let Err(errors) = validate_groups_response(&value) {
        return Err(MalformedResponse(errors.join("; ")).into());
    }

    let raw: RawResponse = serde_json::from_value(value)
        .context("failed to deserialize validated groups response")
        .map_err(|e| anyhow!(MalformedResponse(e.to_string())))?;

    Ok(raw
        .groups
        .into_iter()
        .map(|g| GeneratedGroup {
            id: Uuid::new_v4(),
            items: g
                .items
                .into_iter()
                .map(|i| Item {
                    title: i.title,
                    year: i.year,
                })
                .collect(),
            connection: g.connection,
            connection_type: g.connection_type,
            explanation: g.explanation,
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_groups_wrapped_in_prose() {
        let text = r#"Sure, here are the groups:
        {
          "groups": [
            {
              "items": [{"title": "A", "year": 2000}, {"title": "B"}, {"title": "C"}, {"title": "D"}],
              "connection": "things that are A B C D",
              "connectionType": "thematic",
              "explanation": "because"
            }
          ]
        }
        Let me know if you need more!"#;
        let groups = parse_groups_response(text).expect("parses");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].items.len(), 4);
    }

    #[test]
    fn rejects_text_with_no_braces() {
        let err = parse_groups_response("I cannot help with that.").unwrap_err();
        assert!(err.downcast_ref::<MalformedResponse>().is_some());
    }

    #[test]
    fn rejects_a_group_missing_an_item() {
        let text = r#"{"groups": [{"items": [{"title": "A"}], "connection": "x", "connectionType": "thematic"}]}"#;
        assert!(parse_groups_response(text).is_err());
    }
}
