use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use thiserror::Error;

use crate::filter::Document;
use crate::provider::{
    semester_choices, BranchEntry, OptionChoice, OptionProvider, ProviderError, SubjectEntry,
    UpstreamIds,
};
use crate::selection::Dimension;

pub const DATABASE_DIR: &str = "database";
const CATALOG_FILE: &str = "catalog.json";

/// A subject offered by one branch in one semester.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubjectRecord {
    pub branch_id: String,
    pub semester: String,
    #[serde(flatten)]
    pub entry: SubjectEntry,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse catalog data: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("unknown branch id {0}")]
    UnknownBranch(String),

    #[error("unknown subject id {0}")]
    UnknownSubject(String),
}

/// The portal's explorable data set: schemes, branches, the subject matrix
/// and the uploaded documents. Persisted as pretty JSON under `database/`,
/// the same way user records are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    pub schemes: Vec<String>,
    pub branches: Vec<BranchEntry>,
    pub subjects: Vec<SubjectRecord>,
    pub documents: Vec<Document>,
}

impl Catalog {
    /// Load the catalog from `dir`, seeding the file first if it does not
    /// exist yet.
    pub fn init(dir: &Path) -> Result<Catalog, CatalogError> {
        fs::create_dir_all(dir)?;
        let path = dir.join(CATALOG_FILE);
        if !path.exists() {
            let seeded = Catalog::seed();
            seeded.save_to(&path)?;
            return Ok(seeded);
        }
        Catalog::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Catalog, CatalogError> {
        let data = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), CatalogError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn save(&self, dir: &Path) -> Result<(), CatalogError> {
        self.save_to(&dir.join(CATALOG_FILE))
    }

    pub fn scheme_choices(&self) -> Vec<OptionChoice> {
        self.schemes
            .iter()
            .map(|s| OptionChoice::new(s, s, s))
            .collect()
    }

    pub fn branch_choices(&self) -> Vec<OptionChoice> {
        self.branches.iter().map(BranchEntry::choice).collect()
    }

    pub fn subjects_for(&self, branch_id: &str, semester: &str) -> Vec<SubjectEntry> {
        self.subjects
            .iter()
            .filter(|s| s.branch_id == branch_id && s.semester == semester)
            .map(|s| s.entry.clone())
            .collect()
    }

    pub fn branch_name(&self, branch_id: &str) -> Result<&str, CatalogError> {
        self.branches
            .iter()
            .find(|b| b.branch_id == branch_id)
            .map(|b| b.branch_name.as_str())
            .ok_or_else(|| CatalogError::UnknownBranch(branch_id.to_string()))
    }

    pub fn subject_name(&self, subject_id: &str) -> Result<&str, CatalogError> {
        self.subjects
            .iter()
            .find(|s| s.entry.subject_id == subject_id)
            .map(|s| s.entry.subject_name.as_str())
            .ok_or_else(|| CatalogError::UnknownSubject(subject_id.to_string()))
    }

    pub fn document(&self, id: u64) -> Option<&Document> {
        self.documents.iter().find(|d| d.id == id)
    }

    pub fn next_document_id(&self) -> u64 {
        self.documents.iter().map(|d| d.id).max().unwrap_or(0) + 1
    }

    pub fn add_document(&mut self, document: Document) {
        self.documents.push(document);
    }

    /// Starter data set so a fresh install browses something.
    pub fn seed() -> Catalog {
        let branch = |id: &str, name: &str| BranchEntry {
            branch_id: id.to_string(),
            branch_name: name.to_string(),
        };
        let subject = |branch_id: &str, sem: &str, id: &str, name: &str| SubjectRecord {
            branch_id: branch_id.to_string(),
            semester: sem.to_string(),
            entry: SubjectEntry {
                subject_id: id.to_string(),
                subject_name: name.to_string(),
            },
        };
        let doc = |id: u64,
                   title: &str,
                   scheme: &str,
                   branch: &str,
                   sem: &str,
                   subject: &str,
                   date: &str,
                   file_type: &str| Document {
            id,
            title: title.to_string(),
            scheme: scheme.to_string(),
            branch: branch.to_string(),
            semester: sem.to_string(),
            subject: subject.to_string(),
            upload_date: date.to_string(),
            file_type: file_type.to_string(),
            download_url: format!("/api/documents/{id}/file"),
        };

        const CSE: &str = "Computer Science Engineering";
        const ECE: &str = "Electronics & Communication";

        Catalog {
            schemes: vec!["2020".into(), "2022".into(), "2024".into()],
            branches: vec![
                branch("BR01", CSE),
                branch("BR02", ECE),
                branch("BR03", "Mechanical Engineering"),
            ],
            subjects: vec![
                subject("BR01", "1", "SUB101", "Programming"),
                subject("BR01", "3", "SUB301", "Mathematics"),
                subject("BR01", "3", "SUB302", "Digital Logic"),
                subject("BR01", "4", "SUB401", "Data Structures"),
                subject("BR01", "4", "SUB402", "Operating Systems"),
                subject("BR01", "5", "SUB501", "Database Management"),
                subject("BR01", "7", "SUB701", "Software Engineering"),
                subject("BR02", "2", "SUB201", "Physics"),
                subject("BR02", "6", "SUB601", "Computer Networks"),
            ],
            documents: vec![
                doc(1, "Mathematics Assignment 1", "2022", CSE, "3", "Mathematics", "2024-09-10", "PDF"),
                doc(2, "Physics Lab Manual", "2022", ECE, "2", "Physics", "2024-09-09", "PDF"),
                doc(3, "Programming Notes", "2020", CSE, "1", "Programming", "2024-09-08", "DOC"),
                doc(4, "Data Structures Tutorial", "2022", CSE, "4", "Data Structures", "2024-09-07", "PDF"),
                doc(5, "Database Management Systems", "2020", CSE, "5", "Database Management", "2024-09-06", "PDF"),
                doc(6, "Network Security Fundamentals", "2022", ECE, "6", "Computer Networks", "2024-09-05", "PDF"),
                doc(7, "Software Engineering Principles", "2024", CSE, "7", "Software Engineering", "2024-09-04", "PDF"),
                doc(8, "Operating Systems Concepts", "2020", CSE, "8", "Operating Systems", "2024-09-03", "PDF"),
            ],
        }
    }
}

/// In-process Option Provider backed by a shared catalog. Used by the
/// server-side filter endpoint, the browse CLI and the test binaries.
#[derive(Clone)]
pub struct CatalogProvider {
    catalog: Arc<RwLock<Catalog>>,
}

impl CatalogProvider {
    pub fn new(catalog: Arc<RwLock<Catalog>>) -> Self {
        CatalogProvider { catalog }
    }

    pub fn from_catalog(catalog: Catalog) -> Self {
        CatalogProvider {
            catalog: Arc::new(RwLock::new(catalog)),
        }
    }
}

#[async_trait]
impl OptionProvider for CatalogProvider {
    async fn fetch_options(
        &self,
        dimension: Dimension,
        upstream: &UpstreamIds,
    ) -> Result<Vec<OptionChoice>, ProviderError> {
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        match dimension {
            Dimension::Scheme => Ok(catalog.scheme_choices()),
            Dimension::Branch => Ok(catalog.branch_choices()),
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
                Ok(catalog
                    .subjects_for(branch_id, sem)
                    .iter()
                    .map(SubjectEntry::choice)
                    .collect())
            }
        }
    }

    async fn fetch_documents(&self) -> Result<Vec<Document>, ProviderError> {
        let catalog = self.catalog.read().unwrap_or_else(|e| e.into_inner());
        Ok(catalog.documents.clone())
    }
}

/// Directory uploaded files are stored in (gzip-compressed).
pub fn uploads_dir(data_dir: &Path) -> PathBuf {
    data_dir.join("uploads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_seeds_then_reloads() {
        let dir = tempfile::tempdir().unwrap();
        let seeded = Catalog::init(dir.path()).unwrap();
        assert!(!seeded.schemes.is_empty());
        assert!(dir.path().join(CATALOG_FILE).exists());

        let reloaded = Catalog::init(dir.path()).unwrap();
        assert_eq!(reloaded.schemes, seeded.schemes);
        assert_eq!(reloaded.documents.len(), seeded.documents.len());
    }

    #[test]
    fn save_persists_added_documents() {
        let dir = tempfile::tempdir().unwrap();
        let mut catalog = Catalog::init(dir.path()).unwrap();

        let id = catalog.next_document_id();
        catalog.add_document(Document {
            id,
            title: "Compiler Notes".to_string(),
            scheme: "2022".to_string(),
            branch: "Computer Science Engineering".to_string(),
            semester: "6".to_string(),
            subject: "Compilers".to_string(),
            upload_date: "2024-09-11".to_string(),
            file_type: "PDF".to_string(),
            download_url: format!("/api/documents/{id}/file"),
        });
        catalog.save(dir.path()).unwrap();

        let reloaded = Catalog::init(dir.path()).unwrap();
        assert!(reloaded.document(id).is_some());
        assert_eq!(reloaded.next_document_id(), id + 1);
    }

    #[test]
    fn subject_matrix_lookup() {
        let catalog = Catalog::seed();
        let subjects = catalog.subjects_for("BR01", "3");
        assert_eq!(subjects.len(), 2);
        assert!(catalog.subjects_for("BR03", "1").is_empty());
        assert!(catalog.branch_name("BRXX").is_err());
    }
}
