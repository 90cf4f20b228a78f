use crate::constants::FIELD_PLACEHOLDER;
use crate::paper::AnalysisField;

/// Raw model output for one batch plus the titles that batch covered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchResult {
    pub text: String,
    pub titles: Vec<String>,
}

impl BatchResult {
    pub fn new(text: impl Into<String>, titles: Vec<String>) -> Self {
        Self {
            text: text.into(),
            titles,
        }
    }
}

/// Outcome of extracting one field from a recognized paper block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Present(String),
    /// Key absent, null or blank.
    Missing,
    /// Key present but its value has no textual form (e.g. a nested object).
    Unparseable,
}

impl FieldValue {
    /// The value, or [`FIELD_PLACEHOLDER`] when missing or unparseable.
    pub fn resolve(&self) -> &str {
        match self {
            FieldValue::Present(value) => value,
            FieldValue::Missing | FieldValue::Unparseable => FIELD_PLACEHOLDER,
        }
    }

    pub fn is_present(&self) -> bool {
        matches!(self, FieldValue::Present(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedField {
    pub name: String,
    pub value: FieldValue,
}

/// One per-paper record recovered from model output, before title verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord {
    /// Trimmed title as emitted by the model; `None` if the block carried no title.
    pub title: Option<String>,
    /// Coerced to 0..=10; 0 when absent or unparseable.
    pub relevancy_score: u8,
    /// One entry per configured field, in field-set order.
    pub fields: Vec<ParsedField>,
}

impl ScoreRecord {
    pub fn field(&self, name: &str) -> &FieldValue {
        self.fields
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
            .unwrap_or(&FieldValue::Missing)
    }

    /// Resolves every field to text, substituting the placeholder where needed.
    pub fn into_analysis(self) -> Vec<AnalysisField> {
        self.fields
            .into_iter()
            .map(|f| {
                let value = f.value.resolve().to_string();
                AnalysisField::new(f.name, value)
            })
            .collect()
    }
}
