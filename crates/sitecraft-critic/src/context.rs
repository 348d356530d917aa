use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What the page is about, passed through to the judge and refiner.
///
/// The refinement loop never inspects these fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefinementContext {
    /// Subject name (usually the repository name)
    pub subject_name: String,
    /// One-paragraph description of the subject
    pub subject_description: String,
    /// Style system / design tokens the page should follow
    pub style: String,
    /// Free-form reference metadata (stars, language, homepage, ...)
    pub metadata: BTreeMap<String, String>,
}

impl RefinementContext {
    pub fn new(subject_name: impl Into<String>, subject_description: impl Into<String>) -> Self {
        Self {
            subject_name: subject_name.into(),
            subject_description: subject_description.into(),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = style.into();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}
