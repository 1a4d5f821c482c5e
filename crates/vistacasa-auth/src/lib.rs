// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use base64::Engine;
use base64::engine::general_purpose::{STANDARD_NO_PAD, URL_SAFE_NO_PAD};
use rusqlite::{Connection, OptionalExtension, params};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use vistacasa_app::Session;

pub const APP_NAME: &str = "vistacasa";

/// Identity of last resort: any token that cannot be decoded resolves to
/// this user so startup never aborts on a bad credential.
pub const DEMO_USER_ID: &str = "demo-user";

const ACCESS_TOKEN_MARKER: &str = "access_token=";

/// Persists the one bearer token the app holds. Write-through: a saved
/// token survives restarts until logout deletes it.
pub struct TokenStore {
    conn: Connection,
}

impl TokenStore {
    pub fn open(path: &Path) -> Result<Self> {
        let printable = path.to_string_lossy().to_string();
        validate_db_path(&printable)?;
        let conn = Connection::open(path)
            .with_context(|| format!("open token store at {}", path.display()))?;
        Ok(Self { conn })
    }

    pub fn open_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("open in-memory token store")?;
        Ok(Self { conn })
    }

    pub fn bootstrap(&self) -> Result<()> {
        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS session_token (
                  slot INTEGER PRIMARY KEY CHECK (slot = 0),
                  token TEXT NOT NULL,
                  saved_at TEXT NOT NULL
                );
                ",
            )
            .context("create token store schema")?;
        Ok(())
    }

    pub fn save_token(&self, token: &str) -> Result<()> {
        if token.trim().is_empty() {
            bail!("refusing to persist an empty token");
        }
        let now = now_rfc3339()?;
        self.conn
            .execute(
                "
                INSERT INTO session_token (slot, token, saved_at)
                VALUES (0, ?, ?)
                ON CONFLICT(slot) DO UPDATE SET
                  token = excluded.token,
                  saved_at = excluded.saved_at
                ",
                params![token, now],
            )
            .context("persist token")?;
        Ok(())
    }

    pub fn stored_token(&self) -> Result<Option<String>> {
        self.conn
            .query_row("SELECT token FROM session_token WHERE slot = 0", [], |row| {
                row.get::<_, String>(0)
            })
            .optional()
            .context("read stored token")
    }

    pub fn token_saved_at(&self) -> Result<Option<OffsetDateTime>> {
        let raw = self
            .conn
            .query_row(
                "SELECT saved_at FROM session_token WHERE slot = 0",
                [],
                |row| row.get::<_, String>(0),
            )
            .optional()
            .context("read token timestamp")?;
        raw.map(|value| {
            OffsetDateTime::parse(&value, &Rfc3339)
                .with_context(|| format!("token timestamp {value:?} is not RFC 3339"))
        })
        .transpose()
    }

    pub fn clear_token(&self) -> Result<()> {
        self.conn
            .execute("DELETE FROM session_token WHERE slot = 0", [])
            .context("clear stored token")?;
        Ok(())
    }
}

/// Claims carried in a bearer token's payload segment. Only the fields
/// the app reads; everything else in the payload is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Claims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

impl Claims {
    /// Stable identifier: `sub`, falling back to `username`.
    pub fn subject(&self) -> Option<&str> {
        self.sub
            .as_deref()
            .or(self.username.as_deref())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        self.exp
            .and_then(|seconds| OffsetDateTime::from_unix_timestamp(seconds).ok())
    }
}

/// Decodes the payload segment of a bearer token. The stored value may
/// still carry redirect-fragment boilerplate
/// (`#access_token=…&token_type=Bearer…`), which is stripped first.
pub fn decode_claims(raw: &str) -> Result<Claims> {
    let token = strip_fragment_boilerplate(raw);
    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != 3 {
        bail!(
            "token has {} segment(s); expected header.payload.signature",
            segments.len()
        );
    }

    let payload = URL_SAFE_NO_PAD
        .decode(segments[1])
        .or_else(|_| STANDARD_NO_PAD.decode(segments[1]))
        .context("decode token payload as base64")?;
    serde_json::from_slice(&payload).context("parse token payload as JSON")
}

/// Never fails: any decode problem yields the sentinel identity.
pub fn resolve_user_id(raw: &str) -> String {
    decode_claims(raw)
        .ok()
        .and_then(|claims| claims.subject().map(str::to_owned))
        .unwrap_or_else(|| DEMO_USER_ID.to_owned())
}

fn strip_fragment_boilerplate(raw: &str) -> &str {
    let raw = raw.trim().trim_start_matches('#');
    let Some(start) = raw.find(ACCESS_TOKEN_MARKER) else {
        return raw;
    };
    let value = &raw[start + ACCESS_TOKEN_MARKER.len()..];
    match value.find('&') {
        Some(end) => &value[..end],
        None => value,
    }
}

/// Session bootstrap outcome. `LoginRequired` means the caller must send
/// the user to the external login entry point and stop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Bootstrap {
    Authenticated(Session),
    LoginRequired,
}

/// Establishes the session once at startup. Precedence: a login-callback
/// value carrying an access token wins and is persisted; otherwise a
/// previously stored token; otherwise login is required.
pub fn bootstrap_session(store: &TokenStore, callback: Option<&str>) -> Result<Bootstrap> {
    if let Some(callback) = callback
        && let Some(fragment) = callback_fragment(callback)
    {
        store.save_token(&fragment)?;
        return Ok(Bootstrap::Authenticated(Session::new(resolve_user_id(
            &fragment,
        ))));
    }

    match store.stored_token()? {
        Some(token) => Ok(Bootstrap::Authenticated(Session::new(resolve_user_id(
            &token,
        )))),
        None => Ok(Bootstrap::LoginRequired),
    }
}

/// The raw fragment of a callback value, kept verbatim as the token when
/// it carries the access-token marker.
fn callback_fragment(callback: &str) -> Option<String> {
    let fragment = match callback.rsplit_once('#') {
        Some((_, fragment)) => fragment,
        None => callback,
    };
    fragment
        .contains(ACCESS_TOKEN_MARKER)
        .then(|| fragment.to_owned())
}

pub fn default_db_path() -> Result<PathBuf> {
    if let Some(override_path) = env::var_os("VISTACASA_DB_PATH") {
        return Ok(PathBuf::from(override_path));
    }

    let data_root = dirs::data_local_dir().ok_or_else(|| {
        anyhow!("cannot resolve data directory; set VISTACASA_DB_PATH to a writable database path")
    })?;

    let app_dir = data_root.join(APP_NAME);
    fs::create_dir_all(&app_dir)
        .with_context(|| format!("create data directory {}", app_dir.display()))?;
    Ok(app_dir.join("vistacasa.db"))
}

pub fn validate_db_path(path: &str) -> Result<()> {
    if path.is_empty() {
        bail!("database path must not be empty");
    }
    if path == ":memory:" {
        return Ok(());
    }

    if let Some(index) = path.find("://")
        && index > 0
    {
        let scheme = &path[..index];
        if scheme.chars().all(char::is_alphabetic) {
            bail!(
                "database path {path:?} looks like a URI ({scheme}://); pass a filesystem path instead"
            );
        }
    }

    if path.starts_with("file:") {
        bail!("database path {path:?} uses file: URI syntax; pass a plain filesystem path");
    }

    Ok(())
}

fn now_rfc3339() -> Result<String> {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .context("format current time")
}
