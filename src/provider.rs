use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::filter::Document;
use crate::selection::Dimension;

/// One selectable choice for a dimension: the text shown in the dropdown,
/// the value stored on selection, and the backend id it resolves to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionChoice {
    pub display_text: String,
    pub value: String,
    pub id: Option<String>,
}

impl OptionChoice {
    pub fn new(display_text: &str, value: &str, id: &str) -> Self {
        OptionChoice {
            display_text: display_text.to_string(),
            value: value.to_string(),
            id: Some(id.to_string()),
        }
    }

    /// The synthetic leading "All ..." choice every repopulated option set
    /// starts with.
    pub fn all(dimension: Dimension) -> Self {
        OptionChoice {
            display_text: format!("All {}", dimension.label_plural()),
            value: crate::selection::ALL.to_string(),
            id: None,
        }
    }
}

/// Resolved upstream ids a fetch is parameterized by. Also serves as the
/// identity of an in-flight fetch: a completion is applied only if the
/// selection context it was issued for is still current.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct UpstreamIds {
    pub scheme: Option<String>,
    pub branch: Option<String>,
    pub semester: Option<String>,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("backend unavailable: {0}")]
    Unavailable(String),

    #[error("missing upstream ids for {0} options")]
    MissingUpstream(Dimension),
}

/// Source of the valid choices for a dimension given upstream selections.
///
/// Results fully replace a dimension's option set; there is no incremental
/// merge. Implementations may fail with a network error, which the caller
/// converts into an empty, disabled option set.
#[async_trait]
pub trait OptionProvider: Send + Sync {
    async fn fetch_options(
        &self,
        dimension: Dimension,
        upstream: &UpstreamIds,
    ) -> Result<Vec<OptionChoice>, ProviderError>;

    async fn fetch_documents(&self) -> Result<Vec<Document>, ProviderError>;
}

/// Semesters are a fixed 1..=8 set rather than backend data.
pub fn semester_choices() -> Vec<OptionChoice> {
    (1..=8)
        .map(|i| {
            let n = i.to_string();
            OptionChoice {
                display_text: format!("Semester {n}"),
                value: n.clone(),
                id: Some(n),
            }
        })
        .collect()
}

// Wire shapes of the consumed REST interface. Field names are pinned to the
// backend contract; Rust-side names stay snake_case.

#[derive(Debug, Deserialize)]
struct SchemeResponse {
    #[serde(rename = "strArr")]
    str_arr: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BranchEntry {
    #[serde(rename = "branchID")]
    pub branch_id: String,
    #[serde(rename = "branchName")]
    pub branch_name: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    #[serde(rename = "BranchArr")]
    branch_arr: Vec<BranchEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectEntry {
    #[serde(rename = "subjectID")]
    pub subject_id: String,
    #[serde(rename = "subjectName")]
    pub subject_name: String,
}

#[derive(Debug, Deserialize)]
struct SubjectResponse {
    #[serde(rename = "SubjectArr")]
    subject_arr: Vec<SubjectEntry>,
}

#[derive(Debug, Deserialize)]
struct DocumentsResponse {
    documents: Vec<Document>,
}

impl BranchEntry {
    pub fn choice(&self) -> OptionChoice {
        OptionChoice::new(&self.branch_name, &self.branch_name, &self.branch_id)
    }
}

impl SubjectEntry {
    pub fn choice(&self) -> OptionChoice {
        OptionChoice::new(&self.subject_name, &self.subject_name, &self.subject_id)
    }
}

/// Option Provider talking to a remote portal backend over HTTPS.
pub struct RemoteProvider {
    client: reqwest::Client,
    base_url: String,
}

impl RemoteProvider {
    pub fn new(base_url: &str) -> Self {
        RemoteProvider {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

#[async_trait]
impl OptionProvider for RemoteProvider {
    async fn fetch_options(
        &self,
        dimension: Dimension,
        upstream: &UpstreamIds,
    ) -> Result<Vec<OptionChoice>, ProviderError> {
        match dimension {
            Dimension::Scheme => {
                let resp: SchemeResponse = self
                    .client
                    .get(self.url("/api/explore/getscheme"))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(resp
                    .str_arr
                    .iter()
                    .map(|s| OptionChoice::new(s, s, s))
                    .collect())
            }
            Dimension::Branch => {
                let resp: BranchResponse = self
                    .client
                    .get(self.url("/api/explore/getbranch"))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(resp.branch_arr.iter().map(BranchEntry::choice).collect())
            }
            Dimension::Semester => Ok(semester_choices()),
            Dimension::Subject => {
                let branch_id = upstream
                    .branch
                    .as_deref()
                    .ok_or(ProviderError::MissingUpstream(Dimension::Subject))?;
                let sem = upstream
                    .semester
                    .as_deref()
                    .ok_or(ProviderError::MissingUpstream(Dimension::Subject))?;
                let resp: SubjectResponse = self
                    .client
                    .get(self.url("/api/explore/getsub"))
                    .query(&[("branch_id", branch_id), ("sem", sem)])
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                Ok(resp.subject_arr.iter().map(SubjectEntry::choice).collect())
            }
        }
    }

    async fn fetch_documents(&self) -> Result<Vec<Document>, ProviderError> {
        let resp: DocumentsResponse = self
            .client
            .get(self.url("/api/documents/all"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(resp.documents)
    }
}
