use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, Query, State},
    http::{header, StatusCode},
    response::{Html, IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use axum_extra::extract::cookie::CookieJar;
use chrono::Utc;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use log::info;
use serde::Deserialize;
use serde_json::json;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;

use crate::auth;
use crate::catalog::{uploads_dir, Catalog, DATABASE_DIR};
use crate::error::AppError;
use crate::filter::{filter_documents, Document, FilterOptions};
use crate::selection::{SelectionStore, DIMENSIONS};

/// 50 MB upload cap, matching the upload form's client-side limit.
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

pub struct AppState {
    pub catalog: RwLock<Catalog>,
    pub data_dir: PathBuf,
}

/// Build the portal router and serve it.
pub async fn run(port: u16) -> Result<(), Box<dyn std::error::Error>> {
    auth::init_database()?;
    let data_dir = PathBuf::from(DATABASE_DIR);
    let catalog = Catalog::init(&data_dir)?;
    std::fs::create_dir_all(uploads_dir(&data_dir))?;

    let state = Arc::new(AppState {
        catalog: RwLock::new(catalog),
        data_dir,
    });

    let app = router(state);

    let listener = TcpListener::bind(("0.0.0.0", port)).await?;
    info!("listening on http://0.0.0.0:{port}");
    axum::serve(listener, app).await?;
    Ok(())
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        // Pages
        .route("/", get(serve_main_page))
        .route("/login", get(serve_login_page))
        .route("/signup", get(serve_signup_page))
        .route("/upload", get(serve_upload_page))
        .route("/title", get(serve_title_page))
        // Explore (Option Provider backend)
        .route("/api/explore/getscheme", get(get_schemes))
        .route("/api/explore/getbranch", get(get_branches))
        .route("/api/explore/getsub", get(get_subjects))
        // Documents
        .route("/api/documents/all", get(get_all_documents))
        .route("/api/documents/filter", get(get_filtered_documents))
        .route("/api/documents/:id", get(get_document))
        .route("/api/documents/:id/file", get(download_document))
        // Upload
        .route("/api/upload", post(handle_upload))
        // Session lifecycle
        .route("/api/user/login", put(auth::handle_login))
        .route("/api/user/signup", post(auth::handle_signup))
        .route(
            "/api/user/logout",
            post(auth::handle_logout).put(auth::handle_logout),
        )
        .route("/api/user/validate", put(auth::handle_validate))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn serve_main_page() -> Html<&'static str> {
    Html(include_str!("./static/main.html"))
}

async fn serve_login_page() -> Html<&'static str> {
    Html(include_str!("./static/login.html"))
}

async fn serve_signup_page() -> Html<&'static str> {
    Html(include_str!("./static/signup.html"))
}

async fn serve_upload_page() -> Html<&'static str> {
    Html(include_str!("./static/upload.html"))
}

async fn serve_title_page() -> Html<&'static str> {
    Html(include_str!("./static/title.html"))
}

async fn get_schemes(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    Json(json!({ "strArr": catalog.schemes }))
}

async fn get_branches(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    Json(json!({ "BranchArr": catalog.branches }))
}

#[derive(Debug, Deserialize)]
struct SubjectQuery {
    branch_id: String,
    sem: String,
}

async fn get_subjects(
    Query(params): Query<SubjectQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    let subjects = catalog.subjects_for(&params.branch_id, &params.sem);
    Json(json!({ "SubjectArr": subjects }))
}

async fn get_all_documents(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    Json(json!({ "documents": catalog.documents }))
}

#[derive(Debug, Deserialize)]
struct FilterQuery {
    scheme: Option<String>,
    branch: Option<String>,
    semester: Option<String>,
    subject: Option<String>,
}

/// Server-side rendition of the filter predicate: builds a selection store
/// from the query string (dimensions in chain order) and applies it.
async fn get_filtered_documents(
    Query(params): Query<FilterQuery>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut store = SelectionStore::new();
    for &dim in DIMENSIONS.iter() {
        let value = match dim.key() {
            "scheme" => params.scheme.as_deref(),
            "branch" => params.branch.as_deref(),
            "semester" => params.semester.as_deref(),
            _ => params.subject.as_deref(),
        };
        if let Some(value) = value {
            store
                .set(dim, value, None)
                .map_err(|e| AppError::BadRequest(e.to_string()))?;
        }
    }

    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    let visible = filter_documents(&store, &catalog.documents, FilterOptions::default());
    Ok(Json(json!({ "documents": visible })))
}

async fn get_document(
    AxumPath(id): AxumPath<u64>,
    State(state): State<Arc<AppState>>,
) -> Result<Json<Document>, AppError> {
    let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
    catalog
        .document(id)
        .cloned()
        .map(Json)
        .ok_or(AppError::NotFound)
}

async fn download_document(
    AxumPath(id): AxumPath<u64>,
    State(state): State<Arc<AppState>>,
) -> Result<Response, AppError> {
    let (title, path) = {
        let catalog = state.catalog.read().unwrap_or_else(|e| e.into_inner());
        let doc = catalog.document(id).ok_or(AppError::NotFound)?;
        (
            doc.title.clone(),
            uploads_dir(&state.data_dir).join(format!("{id}.pdf.gz")),
        )
    };

    if !path.exists() {
        return Err(AppError::NotFound);
    }
    let compressed = std::fs::read(&path)?;
    let mut decoder = GzDecoder::new(compressed.as_slice());
    let mut bytes = Vec::new();
    decoder.read_to_end(&mut bytes)?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("inline; filename=\"{}.pdf\"", disposition_filename(&title)),
            ),
        ],
        bytes,
    )
        .into_response())
}

/// Titles go into the Content-Disposition header, which only admits a
/// restricted ASCII subset inside the quoted filename. Anything else
/// becomes `_` so the header stays parseable.
fn disposition_filename(title: &str) -> String {
    let name: String = title
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, ' ' | '-' | '_' | '.' | '(' | ')') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.trim().is_empty() {
        "document".to_string()
    } else {
        name
    }
}

#[derive(Debug, Default)]
struct UploadForm {
    schema_id: String,
    branch_id: String,
    subject_id: String,
    sem: String,
    title: String,
    file_type: String,
    file: Vec<u8>,
}

/// `POST /api/upload`: multipart document submission. Requires a valid
/// session; browsing does not, but contributing does.
async fn handle_upload(
    jar: CookieJar,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let email = auth::session_email(&jar).ok_or(AppError::Unauthorized)?;

    let mut form = UploadForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "file" => {
                form.file = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?
                    .to_vec();
            }
            _ => {
                let value = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(e.to_string()))?;
                match name.as_str() {
                    "schema_id" => form.schema_id = value,
                    "branch_id" => form.branch_id = value,
                    "subject_id" => form.subject_id = value,
                    "sem" => form.sem = value,
                    "title" => form.title = value,
                    "file_type" => form.file_type = value,
                    // user_id travels in the form for the original contract
                    // but the session cookie is authoritative.
                    _ => {}
                }
            }
        }
    }

    validate_upload(&form)?;
    let document = admit_upload(&state, &form)?;

    info!(
        "{email} uploaded document {} ({})",
        document.id, document.title
    );
    Ok(Json(json!({ "status": "ok", "document": document })))
}

/// Allocate the document id, store the file and append the catalog record
/// under a single write lock. The id must not leave the critical section
/// before the record exists, or two concurrent uploads can both claim it
/// and overwrite each other's files.
fn admit_upload(state: &AppState, form: &UploadForm) -> Result<Document, AppError> {
    let mut catalog = state.catalog.write().unwrap_or_else(|e| e.into_inner());
    let id = catalog.next_document_id();
    let document = Document {
        id,
        title: form.title.clone(),
        scheme: form.schema_id.clone(),
        branch: catalog.branch_name(&form.branch_id)?.to_string(),
        semester: form.sem.clone(),
        subject: catalog.subject_name(&form.subject_id)?.to_string(),
        upload_date: Utc::now().format("%Y-%m-%d").to_string(),
        file_type: form.file_type.to_uppercase(),
        download_url: format!("/api/documents/{id}/file"),
    };

    store_upload(&state.data_dir, id, &form.file)?;
    catalog.add_document(document.clone());
    catalog.save(&state.data_dir)?;
    Ok(document)
}

fn validate_upload(form: &UploadForm) -> Result<(), AppError> {
    if form.title.trim().is_empty() {
        return Err(AppError::BadRequest("title is required".into()));
    }
    if form.schema_id.is_empty()
        || form.branch_id.is_empty()
        || form.subject_id.is_empty()
        || form.sem.is_empty()
    {
        return Err(AppError::BadRequest(
            "schema, branch, semester and subject are required".into(),
        ));
    }
    if !form.file_type.eq_ignore_ascii_case("pdf") {
        return Err(AppError::BadRequest("only PDF uploads are accepted".into()));
    }
    if form.file.is_empty() {
        return Err(AppError::BadRequest("no file data received".into()));
    }
    if form.file.len() > MAX_UPLOAD_BYTES {
        return Err(AppError::BadRequest(
            "file size must be less than 50MB".into(),
        ));
    }
    Ok(())
}

/// Uploads are stored gzip-compressed under `database/uploads/`.
fn store_upload(data_dir: &Path, id: u64, bytes: &[u8]) -> Result<(), AppError> {
    let path = uploads_dir(data_dir).join(format!("{id}.pdf.gz"));
    let file = std::fs::File::create(path)?;
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder.write_all(bytes)?;
    encoder.finish()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn portal_state(dir: &Path) -> Arc<AppState> {
        let catalog = Catalog::init(dir).unwrap();
        std::fs::create_dir_all(uploads_dir(dir)).unwrap();
        Arc::new(AppState {
            catalog: RwLock::new(catalog),
            data_dir: dir.to_path_buf(),
        })
    }

    fn pdf_form(title: &str) -> UploadForm {
        UploadForm {
            schema_id: "2022".to_string(),
            branch_id: "BR01".to_string(),
            subject_id: "SUB301".to_string(),
            sem: "3".to_string(),
            title: title.to_string(),
            file_type: "pdf".to_string(),
            file: b"%PDF-1.4".to_vec(),
        }
    }

    #[test]
    fn concurrent_uploads_get_distinct_ids() {
        let dir = tempfile::tempdir().unwrap();
        let state = portal_state(dir.path());
        let before = state.catalog.read().unwrap().documents.len();

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let state = Arc::clone(&state);
                thread::spawn(move || {
                    admit_upload(&state, &pdf_form(&format!("Upload {i}")))
                        .unwrap()
                        .id
                })
            })
            .collect();
        let mut ids: Vec<u64> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), 16, "every upload must get its own id");

        let catalog = state.catalog.read().unwrap();
        assert_eq!(catalog.documents.len(), before + 16);
        for id in ids {
            assert!(catalog.document(id).is_some());
            assert!(uploads_dir(dir.path())
                .join(format!("{id}.pdf.gz"))
                .exists());
        }
    }

    #[test]
    fn disposition_filename_stays_header_safe() {
        let name = disposition_filename("Notes \"v2\" / Übung");
        assert!(name.is_ascii());
        assert!(!name.contains('"'));
        assert!(!name.contains('\n') && !name.contains('\r'));

        assert_eq!(disposition_filename("Maths (Sem 3).final"), "Maths (Sem 3).final");
        assert_eq!(disposition_filename("   "), "document");
    }
}
