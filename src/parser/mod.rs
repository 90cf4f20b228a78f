//! Response parser: recovers per-paper records from the model's semi-structured text.
//!
//! Parsing never fails. Ambiguity is resolved locally: an unparseable score becomes 0, a
//! missing or unparseable field resolves to the placeholder, and blocks that cannot be read at
//! all are skipped. Papers with no block in the response are absent from the output; nothing
//! is synthesized for them.

pub mod extract;
pub mod score;
pub mod types;


pub use score::{coerce_score, coerce_score_text};
pub use types::{BatchResult, FieldValue, ParsedField, ScoreRecord};

use std::collections::HashMap;

use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::constants::UNPARSEABLE_SCORE;
use crate::prompt::{FieldSet, SCORE_KEY, TITLE_KEY, normalize_key};

/// Extracts [`ScoreRecord`]s for a configured [`FieldSet`].
#[derive(Debug, Clone, Default)]
pub struct ResponseParser {
    fields: FieldSet,
}

impl ResponseParser {
    pub fn new(fields: FieldSet) -> Self {
        Self { fields }
    }

    pub fn fields(&self) -> &FieldSet {
        &self.fields
    }

    /// Records in the order the model emitted them.
    #[instrument(skip_all, fields(expected = batch.titles.len()))]
    pub fn parse(&self, batch: &BatchResult) -> Vec<ScoreRecord> {
        let records = self.parse_text(&batch.text);
        if records.len() < batch.titles.len() {
            debug!(
                parsed = records.len(),
                expected = batch.titles.len(),
                "Partial response, some papers have no block"
            );
        }
        records
    }

    pub fn parse_text(&self, text: &str) -> Vec<ScoreRecord> {
        let mut objects: Vec<Map<String, Value>> = extract::json_blocks(text)
            .into_iter()
            .filter_map(extract::parse_object)
            .collect();

        if objects.is_empty() {
            let known: Vec<String> = self.fields.names().map(normalize_key).collect();
            objects = extract::labeled_blocks(text, &known);
            if !objects.is_empty() {
                debug!(blocks = objects.len(), "Parsed labeled-text response");
            }
        }

        objects
            .iter()
            .filter_map(|object| self.record(object))
            .collect()
    }

    fn record(&self, object: &Map<String, Value>) -> Option<ScoreRecord> {
        let by_key: HashMap<String, &Value> =
            object.iter().map(|(k, v)| (normalize_key(k), v)).collect();

        let title_value = by_key.get(&normalize_key(TITLE_KEY)).copied();
        let score_value = by_key.get(&normalize_key(SCORE_KEY)).copied();

        let fields: Vec<ParsedField> = self
            .fields
            .iter()
            .map(|spec| ParsedField {
                name: spec.name.clone(),
                value: field_value(by_key.get(&normalize_key(&spec.name)).copied()),
            })
            .collect();

        if title_value.is_none()
            && score_value.is_none()
            && !fields.iter().any(|f| f.value.is_present())
        {
            debug!(keys = object.len(), "Ignoring block without recognized keys");
            return None;
        }

        let title = match field_value(title_value) {
            FieldValue::Present(title) => Some(title),
            _ => None,
        };

        Some(ScoreRecord {
            title,
            relevancy_score: score_value.map(coerce_score).unwrap_or(UNPARSEABLE_SCORE),
            fields,
        })
    }
}

fn field_value(value: Option<&Value>) -> FieldValue {
    match value {
        None | Some(Value::Null) => FieldValue::Missing,
        Some(Value::String(s)) => present(s.trim()),
        Some(Value::Number(n)) => FieldValue::Present(n.to_string()),
        Some(Value::Bool(b)) => FieldValue::Present(b.to_string()),
        Some(Value::Array(items)) => {
            let mut parts = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::String(s) if !s.trim().is_empty() => parts.push(s.trim().to_string()),
                    Value::Number(n) => parts.push(n.to_string()),
                    Value::Bool(b) => parts.push(b.to_string()),
                    Value::String(_) | Value::Null => {}
                    Value::Array(_) | Value::Object(_) => return FieldValue::Unparseable,
                }
            }
            present(&parts.join("; "))
        }
        Some(Value::Object(_)) => FieldValue::Unparseable,
    }
}

fn present(text: &str) -> FieldValue {
    if text.is_empty() {
        FieldValue::Missing
    } else {
        FieldValue::Present(text.to_string())
    }
}
