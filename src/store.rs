use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use rusqlite::{Connection, OptionalExtension};
use serde::Serialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("write conflict: {0}")]
    WriteConflict(String),

    #[error("plan not found")]
    NotFound,

    #[error("upload failed: {0}")]
    UploadFailed(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Unavailable(_) => "store_unavailable",
            StoreError::WriteConflict(_) => "write_conflict",
            StoreError::NotFound => "not_found",
            StoreError::UploadFailed(_) => "upload_failed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Image,
    Document,
}

impl FileKind {
    /// Derived from the declared MIME type, never user-chosen.
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") {
            FileKind::Image
        } else {
            FileKind::Document
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            FileKind::Image => "image",
            FileKind::Document => "document",
        }
    }

    fn from_db(s: &str) -> Self {
        match s {
            "image" => FileKind::Image,
            _ => FileKind::Document,
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct WeeklyPlan {
    pub id: String,
    pub subject: String,
    pub grade: String,
    pub week_number: i64,
    pub file_name: String,
    pub file_kind: FileKind,
    pub file_url: String,
    pub checksum: Option<String>,
    pub upload_date: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Input for `upsert`; identifier and row timestamps are assigned by
/// the store.
pub struct NewPlan {
    pub subject: String,
    pub grade: String,
    pub week_number: i64,
    pub file_name: String,
    pub file_kind: FileKind,
    pub file_url: String,
    pub checksum: Option<String>,
    pub upload_date: String,
}

#[derive(Debug)]
pub struct StoredBlob {
    pub stored_name: String,
    pub location: String,
    pub kind: FileKind,
    pub checksum: String,
}

pub struct PlanStore {
    conn: Connection,
    plans_dir: PathBuf,
}

impl PlanStore {
    pub fn new(conn: Connection, workspace: &Path) -> Result<Self, StoreError> {
        let plans_dir = workspace.join("plans");
        std::fs::create_dir_all(&plans_dir)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(Self { conn, plans_dir })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Every plan record, most recently created first. Used once at
    /// workspace open to seed the in-memory board.
    pub fn fetch_all(&self) -> Result<Vec<WeeklyPlan>, StoreError> {
        let mut stmt = self
            .conn
            .prepare(
                "SELECT id, subject, grade, week_number, file_name, file_kind,
                        file_url, checksum, upload_date, created_at, updated_at
                 FROM weekly_plans
                 ORDER BY created_at DESC",
            )
            .map_err(unavailable)?;
        stmt.query_map([], row_to_plan)
            .and_then(|it| it.collect::<Result<Vec<_>, _>>())
            .map_err(unavailable)
    }

    /// Insert-or-replace on the (subject, grade, week_number) natural
    /// key. A replaced row keeps its id; `updated_at` is refreshed.
    pub fn upsert(&self, plan: &NewPlan) -> Result<WeeklyPlan, StoreError> {
        self.conn
            .execute(
                "INSERT INTO weekly_plans(
                     id, subject, grade, week_number, file_name, file_kind,
                     file_url, checksum, upload_date, created_at, updated_at)
                 VALUES(?, ?, ?, ?, ?, ?, ?, ?, ?,
                        strftime('%Y-%m-%dT%H:%M:%SZ','now'),
                        strftime('%Y-%m-%dT%H:%M:%SZ','now'))
                 ON CONFLICT(subject, grade, week_number) DO UPDATE SET
                   file_name = excluded.file_name,
                   file_kind = excluded.file_kind,
                   file_url = excluded.file_url,
                   checksum = excluded.checksum,
                   upload_date = excluded.upload_date,
                   updated_at = excluded.updated_at",
                (
                    Uuid::new_v4().to_string(),
                    &plan.subject,
                    &plan.grade,
                    plan.week_number,
                    &plan.file_name,
                    plan.file_kind.as_str(),
                    &plan.file_url,
                    plan.checksum.as_deref(),
                    &plan.upload_date,
                ),
            )
            .map_err(write_error)?;

        self.conn
            .query_row(
                "SELECT id, subject, grade, week_number, file_name, file_kind,
                        file_url, checksum, upload_date, created_at, updated_at
                 FROM weekly_plans
                 WHERE subject = ? AND grade = ? AND week_number = ?",
                (&plan.subject, &plan.grade, plan.week_number),
                row_to_plan,
            )
            .map_err(unavailable)
    }

    /// Remove a record by id. The backing blob is removed best-effort
    /// first; a blob failure is logged and the record deletion still
    /// proceeds.
    pub fn delete(&self, id: &str) -> Result<(), StoreError> {
        let file_url: Option<String> = self
            .conn
            .query_row(
                "SELECT file_url FROM weekly_plans WHERE id = ?",
                [id],
                |r| r.get(0),
            )
            .optional()
            .map_err(unavailable)?;
        let Some(file_url) = file_url else {
            return Err(StoreError::NotFound);
        };

        self.delete_blob_at(&file_url);

        self.conn
            .execute("DELETE FROM weekly_plans WHERE id = ?", [id])
            .map_err(unavailable)?;
        Ok(())
    }

    /// Write the file bytes under a generated, charset-safe name and
    /// return where they landed. The original file name never touches
    /// the filesystem.
    pub fn upload_blob(
        &self,
        source: &Path,
        file_name: &str,
        mime_type: &str,
        subject: &str,
        grade: &str,
        week_number: i64,
    ) -> Result<StoredBlob, StoreError> {
        if !mime_allowed(mime_type) {
            return Err(StoreError::UploadFailed(format!(
                "unsupported file type: {}",
                mime_type
            )));
        }

        let data = std::fs::read(source)
            .map_err(|e| StoreError::UploadFailed(format!("read {}: {}", source.display(), e)))?;

        let mut hasher = Sha256::new();
        hasher.update(&data);
        let checksum = format!("{:x}", hasher.finalize());

        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis())
            .unwrap_or(0);
        let stored_name = format!(
            "plan-{}-{}-week{}-{}.{}",
            sanitize_component(subject),
            sanitize_component(grade),
            week_number,
            millis,
            extension_for(file_name, mime_type)
        );
        let dest = self.plans_dir.join(&stored_name);

        write_atomic(&dest, &data)
            .map_err(|e| StoreError::UploadFailed(format!("write {}: {}", dest.display(), e)))?;

        tracing::debug!(name = %stored_name, bytes = data.len(), "stored plan blob");

        Ok(StoredBlob {
            stored_name,
            location: dest.to_string_lossy().to_string(),
            kind: FileKind::from_mime(mime_type),
            checksum,
        })
    }

    /// Best-effort blob removal by stored location. Only the file-name
    /// component is trusted; it is resolved against the plans dir.
    pub fn delete_blob_at(&self, location: &str) {
        let Some(name) = Path::new(location).file_name() else {
            return;
        };
        let path = self.plans_dir.join(name);
        if !path.exists() {
            return;
        }
        if let Err(e) = std::fs::remove_file(&path) {
            tracing::warn!(path = %path.display(), error = %e, "could not delete plan blob");
        }
    }
}

fn row_to_plan(r: &rusqlite::Row<'_>) -> rusqlite::Result<WeeklyPlan> {
    let kind: String = r.get(5)?;
    Ok(WeeklyPlan {
        id: r.get(0)?,
        subject: r.get(1)?,
        grade: r.get(2)?,
        week_number: r.get(3)?,
        file_name: r.get(4)?,
        file_kind: FileKind::from_db(&kind),
        file_url: r.get(6)?,
        checksum: r.get(7)?,
        upload_date: r.get(8)?,
        created_at: r.get(9)?,
        updated_at: r.get(10)?,
    })
}

fn unavailable(e: rusqlite::Error) -> StoreError {
    StoreError::Unavailable(e.to_string())
}

fn write_error(e: rusqlite::Error) -> StoreError {
    match &e {
        rusqlite::Error::SqliteFailure(f, _)
            if f.code == rusqlite::ErrorCode::ConstraintViolation =>
        {
            StoreError::WriteConflict(e.to_string())
        }
        _ => StoreError::Unavailable(e.to_string()),
    }
}

fn mime_allowed(mime: &str) -> bool {
    mime.starts_with("image/") || mime == "application/pdf"
}

/// Percent-encode anything outside the unreserved set, then drop the
/// percent signs. Keeps generated names ASCII-only regardless of the
/// subject/grade charset.
fn sanitize_component(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => out.push_str(&format!("{:02X}", b)),
        }
    }
    out
}

fn extension_for(file_name: &str, mime_type: &str) -> String {
    if let Some(ext) = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
    {
        return ext.to_ascii_lowercase();
    }
    // No usable extension on the original name; fall back to the MIME
    // subtype ("application/pdf" -> "pdf", "image/png" -> "png").
    mime_type
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .unwrap_or("bin")
        .to_ascii_lowercase()
}

fn write_atomic(dest: &Path, data: &[u8]) -> std::io::Result<()> {
    let temp = dest.with_extension("tmp");
    let mut file = std::fs::File::create(&temp)?;
    file.write_all(data)?;
    file.sync_all()?;
    std::fs::rename(temp, dest)
}
