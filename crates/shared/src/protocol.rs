use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{AssignmentId, Paper, PaperId, PaperStatus, SessionId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaperListQuery {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaperStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperSummary {
    pub id: PaperId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaperStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaperPage {
    #[serde(default)]
    pub items: Vec<PaperSummary>,
    #[serde(default)]
    pub total: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PublishReceipt {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PaperStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paper_id: Option<PaperId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DuplicateResponse {
    pub paper_id: PaperId,
}

/// Result of a Markdown import. The server's shape varies between releases,
/// so the payload is kept verbatim and the caller decides what to adopt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImportResult(pub Value);

impl ImportResult {
    /// The converted paper, when the server included one.
    pub fn paper(&self) -> Option<Paper> {
        let candidate = match self.0.get("paper") {
            Some(paper) => paper,
            None if self.0.get("sections").is_some() => &self.0,
            None => return None,
        };
        serde_json::from_value(candidate.clone()).ok()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleAssignment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<AssignmentId>,
    pub paper_id: PaperId,
    pub schedule_session_id: SessionId,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub examinee_group_filter: Option<String>,
}

/// Strips the optional `{"data": ...}` wrapper some endpoints add.
pub fn unwrap_data(value: Value) -> Value {
    match value {
        Value::Object(mut map) if map.contains_key("data") => {
            map.remove("data").unwrap_or(Value::Null)
        }
        other => other,
    }
}

/// Decodes a body that is either `{"<key>": T}` or a bare `T`, with or
/// without the `data` wrapper.
pub fn decode_keyed<T: DeserializeOwned>(value: Value, key: &str) -> serde_json::Result<T> {
    match unwrap_data(value) {
        Value::Object(mut map) if map.contains_key(key) => {
            serde_json::from_value(map.remove(key).unwrap_or(Value::Null))
        }
        other => serde_json::from_value(other),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn decodes_paper_from_every_envelope_shape() {
        let bare = json!({"id": "p-1", "title": "Bare", "sections": []});
        let keyed = json!({"paper": {"id": "p-2", "title": "Keyed", "sections": []}});
        let wrapped = json!({"data": {"paper": {"id": "p-3", "title": "Wrapped", "sections": []}}});

        let titles: Vec<String> = [bare, keyed, wrapped]
            .into_iter()
            .map(|value| decode_keyed::<Paper>(value, "paper").expect("paper").title)
            .collect();
        assert_eq!(titles, vec!["Bare", "Keyed", "Wrapped"]);
    }

    #[test]
    fn list_query_omits_unset_filters() {
        let query = PaperListQuery {
            search: Some("grammar".into()),
            page: Some(2),
            ..PaperListQuery::default()
        };
        let value = serde_json::to_value(&query).expect("json");
        assert_eq!(value, json!({"search": "grammar", "page": 2}));
    }

    #[test]
    fn import_result_exposes_converted_paper_when_present() {
        let result = ImportResult(json!({"paper": {"title": "Imported", "sections": []}, "warnings": []}));
        assert_eq!(result.paper().expect("paper").title, "Imported");
        let opaque = ImportResult(json!({"job": 42}));
        assert!(opaque.paper().is_none());
    }
}
