use serde::{Deserialize, Serialize};

use crate::selection::{Dimension, SelectionStore, DIMENSIONS};

/// One browsable document. Owned by the backend; the filter core only reads
/// the four dimension fields.
///
/// The dimension fields default to empty when absent so that a document
/// missing a field can never match an active filter on it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub scheme: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub semester: String,
    #[serde(default)]
    pub subject: String,
    #[serde(rename = "uploadDate", default)]
    pub upload_date: String,
    #[serde(rename = "fileType", default)]
    pub file_type: String,
    #[serde(rename = "downloadUrl", default)]
    pub download_url: String,
}

impl Document {
    /// The field this dimension filters on.
    pub fn field(&self, dimension: Dimension) -> &str {
        match dimension {
            Dimension::Scheme => &self.scheme,
            Dimension::Branch => &self.branch,
            Dimension::Semester => &self.semester,
            Dimension::Subject => &self.subject,
        }
    }
}

/// Filter behavior knobs. Matching is case-sensitive unless asked otherwise;
/// case folding is never applied per-field behind the caller's back.
#[derive(Debug, Clone, Copy, Default)]
pub struct FilterOptions {
    pub case_insensitive: bool,
}

/// Whether `doc` satisfies every active dimension of the store.
pub fn matches(store: &SelectionStore, doc: &Document, options: FilterOptions) -> bool {
    DIMENSIONS.iter().all(|&d| {
        let selection = store.get(d);
        if selection.is_all() {
            return true;
        }
        let field = doc.field(d);
        if options.case_insensitive {
            field.eq_ignore_ascii_case(&selection.value)
        } else {
            field == selection.value
        }
    })
}

/// The subset of `docs` matching the current selection, in original order.
///
/// Stable (never reorders) and idempotent: filtering an already-filtered
/// collection with the same selection returns it unchanged. With an
/// unconstrained store this is the identity.
pub fn filter_documents<'a>(
    store: &SelectionStore,
    docs: &'a [Document],
    options: FilterOptions,
) -> Vec<&'a Document> {
    docs.iter().filter(|d| matches(store, d, options)).collect()
}
