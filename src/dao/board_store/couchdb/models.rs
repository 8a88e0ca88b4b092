use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One document per collection; `_id` is the collection name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollectionDocument {
    /// Collection name.
    #[serde(rename = "_id")]
    pub id: String,
    /// Current revision; absent on first write.
    #[serde(rename = "_rev", skip_serializing_if = "Option::is_none")]
    pub rev: Option<String>,
    /// Raw collection value.
    #[serde(default)]
    pub value: Option<Value>,
}

/// Revision lookup response.
#[derive(Debug, Deserialize)]
pub struct RevisionOnly {
    /// Current revision.
    #[serde(rename = "_rev")]
    pub rev: String,
}

/// Body of a `_changes` request filtered on one document.
#[derive(Debug, Serialize)]
pub struct DocIdsFilter<'a> {
    /// The watched document id.
    pub doc_ids: [&'a str; 1],
}

/// One `_changes` round.
#[derive(Debug, Deserialize)]
pub struct ChangesResponse {
    /// Changed documents.
    #[serde(default)]
    pub results: Vec<ChangeRow>,
    /// Sequence to resume from.
    pub last_seq: Value,
}

/// One change entry.
#[derive(Debug, Deserialize)]
pub struct ChangeRow {
    /// Set when the document was deleted.
    #[serde(default)]
    pub deleted: bool,
    /// Document body, requested with `include_docs`.
    #[serde(default)]
    pub doc: Option<CollectionDocument>,
}

impl ChangeRow {
    /// Stored value carried by the change; deletions read as absent.
    pub fn into_value(self) -> Option<Value> {
        if self.deleted {
            return None;
        }
        self.doc.and_then(|doc| doc.value)
    }
}

/// CouchDB 1.x reports numeric sequences, later versions opaque strings.
pub fn seq_param(seq: &Value) -> String {
    match seq {
        Value::String(seq) => seq.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn change_rows_expose_the_wrapped_value() {
        let response: ChangesResponse = serde_json::from_value(json!({
            "results": [
                {"id": "players", "seq": "3-a", "doc": {"_id": "players", "_rev": "2-x", "value": [{"id": 1}]}},
                {"id": "players", "seq": "4-b", "deleted": true},
            ],
            "last_seq": "4-b",
        }))
        .unwrap();

        assert_eq!(seq_param(&response.last_seq), "4-b");
        let values: Vec<_> = response.results.into_iter().map(ChangeRow::into_value).collect();
        assert_eq!(values, vec![Some(json!([{"id": 1}])), None]);
        assert_eq!(seq_param(&json!(12)), "12");
    }
}
