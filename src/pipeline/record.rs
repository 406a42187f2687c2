use crate::driver::WorkItem;
use serde::{Deserialize, Serialize};

/// Length every stored embedding vector is normalized to
pub const VECTOR_DIMENSIONS: usize = 768;

/// Categorized entities extracted from a paper
///
/// Every category is always present; a missing category is an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntitySet {
    pub organisms: Vec<String>,
    pub experimental_conditions: Vec<String>,
    pub biological_processes: Vec<String>,
    pub space_environments: Vec<String>,
}

impl EntitySet {
    pub fn is_empty(&self) -> bool {
        self.organisms.is_empty()
            && self.experimental_conditions.is_empty()
            && self.biological_processes.is_empty()
            && self.space_environments.is_empty()
    }
}

/// Structured record extracted for one paper
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaperRecord {
    pub title: String,
    pub authors: Vec<String>,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub publication_date: String,
    pub doi: String,
    pub pdf_url: String,
    pub keywords: Vec<String>,
    pub full_text: String,
    pub methods: String,
    pub results: String,
    pub discussion: String,
    pub conclusions: String,
    pub citation_count: u32,
    pub view_count: u32,
    pub entities: EntitySet,
}

impl PaperRecord {
    /// Record used when structured extraction produced nothing usable
    pub fn minimal(item: &WorkItem, content: &str) -> Self {
        Self {
            title: item.label.clone(),
            full_text: content.to_string(),
            ..Self::default()
        }
    }

    /// Sections to embed, in order, skipping blank ones
    ///
    /// Title, abstract and full text are always considered; the body
    /// sections only when extraction found them.
    pub fn embedding_sections(&self) -> Vec<(&'static str, &str)> {
        [
            ("title", self.title.as_str()),
            ("abstract", self.abstract_text.as_str()),
            ("fullText", self.full_text.as_str()),
            ("methods", self.methods.as_str()),
            ("results", self.results.as_str()),
            ("discussion", self.discussion.as_str()),
            ("conclusions", self.conclusions.as_str()),
        ]
        .into_iter()
        .filter(|(_, text)| !text.trim().is_empty())
        .collect()
    }
}

/// Pads with zeros or truncates `vector` to [`VECTOR_DIMENSIONS`]
pub fn normalize_vector(mut vector: Vec<f32>) -> Vec<f32> {
    if vector.len() != VECTOR_DIMENSIONS {
        tracing::warn!(
            "Embedding dimension mismatch: got {}, expected {}",
            vector.len(),
            VECTOR_DIMENSIONS
        );
        vector.resize(VECTOR_DIMENSIONS, 0.0);
    }
    vector
}
