//! The analysis field set requested from the model for every paper.

/// JSON key carrying the paper title in model output.
pub const TITLE_KEY: &str = "Title";

/// JSON key carrying the relevancy score in model output.
pub const SCORE_KEY: &str = "Relevancy score";

const DEFAULT_FIELDS: &[(&str, &str)] = &[
    ("Reasons for match", "1-2 sentence short reasonings"),
    ("Goal", "What kind of pain points the paper is trying to solve?"),
    ("Data", "Summary of the data source used in the paper"),
    ("Methodology", "Summary of methodologies used in the paper"),
    ("Experiments & Results", "Summary of any experiments & its results"),
    ("Git", "Link to the code repo (if available)"),
    (
        "Discussion & Next steps",
        "Further discussion and next steps of the research",
    ),
];

/// A named free-text field and the instruction rendered for it in the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: String,
    pub instruction: String,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            instruction: instruction.into(),
        }
    }
}

/// Ordered set of analysis fields. Order is preserved in prompts and in [`crate::ScoredPaper`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSet {
    fields: Vec<FieldSpec>,
}

impl Default for FieldSet {
    fn default() -> Self {
        Self {
            fields: DEFAULT_FIELDS
                .iter()
                .map(|(name, instruction)| FieldSpec::new(*name, *instruction))
                .collect(),
        }
    }
}

impl FieldSet {
    /// Builds a field set; entries colliding with the title or score keys are dropped.
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        let fields = fields
            .into_iter()
            .filter(|f| {
                let key = normalize_key(&f.name);
                key != normalize_key(TITLE_KEY) && key != normalize_key(SCORE_KEY)
            })
            .collect();
        Self { fields }
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldSpec> {
        self.fields.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

/// Case- and punctuation-insensitive form of a field key.
///
/// `"Relevancy score"`, `"relevancy_score"` and `"RelevancyScore"` all normalize to
/// `"relevancyscore"`; `"Experiments & Results"` becomes `"experimentsresults"`.
pub fn normalize_key(key: &str) -> String {
    key.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect()
}
