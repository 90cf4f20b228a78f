use serde::{Deserialize, Serialize};

use crate::constants::FIELD_PLACEHOLDER;

use super::subjects::parse_subject_field;

/// A field that upstream sources emit either as free text or as an ordered list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextOrList {
    Text(String),
    List(Vec<String>),
}

impl Default for TextOrList {
    fn default() -> Self {
        TextOrList::Text(String::new())
    }
}

impl TextOrList {
    /// Renders the value as a single line (list items joined with `", "`).
    pub fn display(&self) -> String {
        match self {
            TextOrList::Text(text) => text.trim().to_string(),
            TextOrList::List(items) => items
                .iter()
                .map(|s| s.trim())
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            TextOrList::Text(text) => text.trim().is_empty(),
            TextOrList::List(items) => items.iter().all(|s| s.trim().is_empty()),
        }
    }
}

impl From<&str> for TextOrList {
    fn from(value: &str) -> Self {
        TextOrList::Text(value.to_string())
    }
}

impl From<Vec<String>> for TextOrList {
    fn from(value: Vec<String>) -> Self {
        TextOrList::List(value)
    }
}

/// Input paper metadata. `title` is the key used to match model output back to inputs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paper {
    pub title: String,

    #[serde(default)]
    pub authors: TextOrList,

    #[serde(default)]
    pub subjects: TextOrList,

    #[serde(default, rename = "abstract")]
    pub abstract_text: String,

    #[serde(default)]
    pub main_page: Option<String>,

    #[serde(default)]
    pub pdf: Option<String>,
}

impl Paper {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            authors: TextOrList::default(),
            subjects: TextOrList::default(),
            abstract_text: String::new(),
            main_page: None,
            pdf: None,
        }
    }

    pub fn with_authors(mut self, authors: impl Into<TextOrList>) -> Self {
        self.authors = authors.into();
        self
    }

    pub fn with_subjects(mut self, subjects: impl Into<TextOrList>) -> Self {
        self.subjects = subjects.into();
        self
    }

    pub fn with_abstract(mut self, abstract_text: impl Into<String>) -> Self {
        self.abstract_text = abstract_text.into();
        self
    }

    pub fn with_links(mut self, main_page: impl Into<String>, pdf: impl Into<String>) -> Self {
        self.main_page = Some(main_page.into());
        self.pdf = Some(pdf.into());
        self
    }

    /// Subject category names with archive codes stripped.
    ///
    /// `"Machine Learning (cs.LG); Robotics (cs.RO)"` yields `["Machine Learning", "Robotics"]`.
    pub fn subject_categories(&self) -> Vec<String> {
        match &self.subjects {
            TextOrList::Text(text) => parse_subject_field(text),
            TextOrList::List(items) => items
                .iter()
                .flat_map(|item| parse_subject_field(item))
                .collect(),
        }
    }
}

/// The user's free-text statement of interest, fixed for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InterestQuery(String);

impl InterestQuery {
    /// Returns `None` for blank input.
    pub fn parse(text: &str) -> Option<Self> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for InterestQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One named free-text field of the model's analysis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisField {
    pub name: String,
    pub value: String,
}

impl AnalysisField {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Returns `true` when the value is the missing-field placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.value == FIELD_PLACEHOLDER
    }
}

/// A [`Paper`] enriched with the model's relevancy score and analysis fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScoredPaper {
    #[serde(flatten)]
    pub paper: Paper,

    /// 0..=10; 0 means the model's score was absent or unparseable.
    pub relevancy_score: u8,

    /// Fields in field-set order; every configured field is present.
    pub analysis: Vec<AnalysisField>,
}

impl ScoredPaper {
    pub fn title(&self) -> &str {
        &self.paper.title
    }

    /// Value of an analysis field, or the placeholder if the field set does not contain it.
    pub fn field(&self, name: &str) -> &str {
        self.analysis
            .iter()
            .find(|f| f.name == name)
            .map(|f| f.value.as_str())
            .unwrap_or(FIELD_PLACEHOLDER)
    }
}
