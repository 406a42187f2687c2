use crate::{IngestError, Result};
use serde::Deserialize;
use std::path::Path;

/// One unit of work, addressed by its stable position in the work list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    /// Index in the work list; the resumability key
    pub position: usize,

    /// Human-readable label, usually the paper title
    pub label: String,

    /// Where the item's content is fetched from
    pub reference: String,
}

#[derive(Debug, Deserialize)]
struct WorkListEntry {
    #[serde(alias = "Title")]
    title: String,

    #[serde(alias = "Link", alias = "url")]
    link: String,
}

/// Loads the work list from a JSON file
///
/// The file holds an array of `{"title", "link"}` objects; each entry's
/// array index becomes its position.
pub fn load_work_list(path: &Path) -> Result<Vec<WorkItem>> {
    let content = std::fs::read_to_string(path)?;
    parse_work_list(&content)
}

/// Parses a work list from a JSON string
pub fn parse_work_list(content: &str) -> Result<Vec<WorkItem>> {
    let entries: Vec<WorkListEntry> =
        serde_json::from_str(content).map_err(|e| IngestError::WorkList(e.to_string()))?;

    Ok(entries
        .into_iter()
        .enumerate()
        .map(|(position, entry)| WorkItem {
            position,
            label: entry.title,
            reference: entry.link,
        })
        .collect())
}
