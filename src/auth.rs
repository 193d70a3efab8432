use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar};
use lazy_static::lazy_static;
use log::info;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{create_dir_all, File};
use std::io::Write;
use std::path::Path;
use std::sync::RwLock;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use time::Duration as CookieDuration;
use uuid::Uuid;

const USERS_FILE: &str = "database/users.json";
const DATABASE_DIR: &str = "database";
const SESSION_HOURS: u64 = 24;

/// Session cookie names shared with the pages.
pub const SESSION_COOKIE: &str = "stucon_session";
pub const USER_COOKIE: &str = "user_id";

/// A registered portal user, keyed by email.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub email: String,
    pub username: String,
    /// Argon2 hash; the plaintext password is never stored.
    pub password_hash: String,
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    pub email: String,
    pub expires_at: SystemTime,
}

lazy_static! {
    /// All active sessions, token -> session.
    static ref SESSIONS: RwLock<HashMap<String, Session>> = RwLock::new(HashMap::new());
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("email, username and password cannot be empty")]
    EmptyField,

    #[error("invalid email address")]
    InvalidEmail,

    #[error("email address is already registered")]
    EmailTaken,

    #[error("failed to access user database: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse user database: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("password hashing failed")]
    Hash,
}

/// Create the database directory and users file if they don't exist. Call
/// before any other user operation.
pub fn init_database() -> std::io::Result<()> {
    if !Path::new(DATABASE_DIR).exists() {
        create_dir_all(DATABASE_DIR)?;
    }
    let users_path = Path::new(USERS_FILE);
    if !users_path.exists() {
        let mut file = File::create(users_path)?;
        file.write_all(b"{}")?;
    }
    Ok(())
}

/// All registered users, keyed by email.
pub fn get_users() -> Result<HashMap<String, User>, AuthError> {
    let contents = std::fs::read_to_string(USERS_FILE)?;
    Ok(serde_json::from_str(&contents)?)
}

pub fn save_users(users: &HashMap<String, User>) -> Result<(), AuthError> {
    let json = serde_json::to_string_pretty(users)?;
    std::fs::write(USERS_FILE, json)?;
    Ok(())
}

/// Register a new account. The password is hashed before storage.
///
/// # Errors
/// Rejects empty fields, malformed email addresses and already-registered
/// emails.
pub fn register_user(email: &str, username: &str, password: &str) -> Result<(), AuthError> {
    if email.is_empty() || username.is_empty() || password.is_empty() {
        return Err(AuthError::EmptyField);
    }
    if !EMAIL_RE.is_match(email) {
        return Err(AuthError::InvalidEmail);
    }

    let mut users = get_users()?;
    if users.contains_key(email) {
        return Err(AuthError::EmailTaken);
    }

    let password_hash = hash_password(password)?;
    users.insert(
        email.to_string(),
        User {
            email: email.to_string(),
            username: username.to_string(),
            password_hash,
        },
    );
    save_users(&users)?;
    info!("registered user {email}");
    Ok(())
}

/// Check an email/password pair against the user database.
pub fn verify_user(email: &str, password: &str) -> Result<bool, AuthError> {
    let users = get_users()?;
    match users.get(email) {
        Some(user) => verify_password(password, &user.password_hash),
        None => Ok(false),
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|_| AuthError::Hash)
}

fn verify_password(password: &str, hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(hash).map_err(|_| AuthError::Hash)?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Create and store a session for an authenticated user, returning the
/// session token.
pub fn create_session(email: &str) -> String {
    let token = Uuid::new_v4().to_string();
    let session = Session {
        email: email.to_string(),
        expires_at: SystemTime::now() + Duration::from_secs(SESSION_HOURS * 60 * 60),
    };
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.insert(token.clone(), session);
    token
}

/// The email behind a session token, if the session is valid and unexpired.
pub fn validate_session(token: &str) -> Option<String> {
    let sessions = SESSIONS.read().unwrap_or_else(|e| e.into_inner());
    sessions.get(token).and_then(|s| {
        if s.expires_at > SystemTime::now() {
            Some(s.email.clone())
        } else {
            None
        }
    })
}

pub fn destroy_session(token: &str) {
    let mut sessions = SESSIONS.write().unwrap_or_else(|e| e.into_inner());
    sessions.remove(token);
}

// Wire types for the session endpoints. One consistent contract: the pages
// always read `valid`, `error` and `session_token`.

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,
}

impl AuthResponse {
    fn ok(session_token: Option<String>) -> Self {
        AuthResponse {
            valid: true,
            error: None,
            session_token,
        }
    }

    fn rejected(error: &str) -> Self {
        AuthResponse {
            valid: false,
            error: Some(error.to_string()),
            session_token: None,
        }
    }
}

fn session_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_path("/");
    cookie.set_max_age(CookieDuration::hours(SESSION_HOURS as i64));
    cookie
}

/// `PUT /api/user/login`: verify credentials, mint a session, set the
/// session cookies. Bad credentials answer `{valid: false, error}` rather
/// than an HTTP error; the login page branches on `valid`.
pub async fn handle_login(
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> (CookieJar, Json<AuthResponse>) {
    match verify_user(&req.email, &req.password) {
        Ok(true) => {
            let token = create_session(&req.email);
            let jar = jar
                .add(session_cookie(SESSION_COOKIE, token.clone()))
                .add(session_cookie(USER_COOKIE, req.email.clone()));
            info!("login ok for {}", req.email);
            (jar, Json(AuthResponse::ok(Some(token))))
        }
        Ok(false) => (jar, Json(AuthResponse::rejected("Invalid credentials"))),
        Err(e) => (jar, Json(AuthResponse::rejected(&e.to_string()))),
    }
}

/// `POST /api/user/signup`: create the account; the page redirects to the
/// login form on `valid: true`.
pub async fn handle_signup(Json(req): Json<SignupRequest>) -> Json<AuthResponse> {
    match register_user(&req.email, &req.username, &req.password) {
        Ok(()) => Json(AuthResponse::ok(None)),
        Err(e) => Json(AuthResponse::rejected(&e.to_string())),
    }
}

/// `PUT|POST /api/user/logout`: drop the server-side session and blank the
/// cookies.
pub async fn handle_logout(jar: CookieJar) -> (CookieJar, Json<AuthResponse>) {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        destroy_session(cookie.value());
    }
    let jar = jar
        .add(session_cookie(SESSION_COOKIE, String::new()))
        .add(session_cookie(USER_COOKIE, String::new()));
    (jar, Json(AuthResponse::ok(None)))
}

/// `PUT /api/user/validate`: does the request carry a live session?
pub async fn handle_validate(jar: CookieJar) -> Json<AuthResponse> {
    match session_email(&jar) {
        Some(_) => Json(AuthResponse::ok(None)),
        None => Json(AuthResponse::rejected("No valid session")),
    }
}

/// The authenticated email on a request, if any. Used as the upload gate;
/// browsing never requires it.
pub fn session_email(jar: &CookieJar) -> Option<String> {
    let cookie = jar.get(SESSION_COOKIE)?;
    if cookie.value().is_empty() {
        return None;
    }
    validate_session(cookie.value())
}
