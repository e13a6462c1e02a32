//! SQLite-backed job store implementation.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection};

use crate::job::types::new_job_id;
use crate::job::{Job, JobError, JobFilter, JobStatus, JobStore};
use crate::options::PackageOptions;

/// SQLite-backed job store.
///
/// The connection mutex doubles as the store's write lock: queue claims and
/// status transitions are serialized through it, so a job can never be
/// claimed or mutated by two workers at once.
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
}

impl SqliteJobStore {
    /// Create a new SQLite job store, creating the database file and tables
    /// if needed.
    pub fn new(path: &Path) -> Result<Self, JobError> {
        let conn = Connection::open(path).map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite job store (useful for testing).
    pub fn in_memory() -> Result<Self, JobError> {
        let conn = Connection::open_in_memory().map_err(|e| JobError::Database(e.to_string()))?;
        Self::initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn initialize_schema(conn: &Connection) -> Result<(), JobError> {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS jobs (
                id TEXT PRIMARY KEY,
                status TEXT NOT NULL,
                created_at TEXT NOT NULL,
                last_modified_at TEXT NOT NULL,
                logs TEXT NOT NULL,
                errors TEXT NOT NULL,
                retry_count INTEGER NOT NULL DEFAULT 0,
                options TEXT NOT NULL,
                artifacts TEXT NOT NULL,
                archive_path TEXT
            );

            CREATE INDEX IF NOT EXISTS idx_jobs_status ON jobs(status);
            CREATE INDEX IF NOT EXISTS idx_jobs_created_at ON jobs(created_at);
            "#,
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }

    fn row_to_job(row: &rusqlite::Row) -> rusqlite::Result<Job> {
        let id: String = row.get(0)?;
        let status_str: String = row.get(1)?;
        let created_at_str: String = row.get(2)?;
        let last_modified_at_str: String = row.get(3)?;
        let logs_json: String = row.get(4)?;
        let errors_json: String = row.get(5)?;
        let retry_count: u32 = row.get(6)?;
        let options_json: String = row.get(7)?;
        let artifacts_json: String = row.get(8)?;
        let archive_path: Option<String> = row.get(9)?;

        let status: JobStatus =
            serde_json::from_str(&format!("\"{}\"", status_str)).unwrap_or(JobStatus::Queued);

        let created_at = DateTime::parse_from_rfc3339(&created_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let last_modified_at = DateTime::parse_from_rfc3339(&last_modified_at_str)
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|_| Utc::now());

        let logs: Vec<String> = serde_json::from_str(&logs_json).unwrap_or_default();
        let errors: Vec<String> = serde_json::from_str(&errors_json).unwrap_or_default();
        let artifacts: Vec<String> = serde_json::from_str(&artifacts_json).unwrap_or_default();

        let options: PackageOptions = serde_json::from_str(&options_json).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                7,
                rusqlite::types::Type::Text,
                Box::new(e),
            )
        })?;

        Ok(Job {
            id,
            status,
            created_at,
            last_modified_at,
            logs,
            errors,
            retry_count,
            options,
            artifacts,
            archive_path,
        })
    }

    fn get_locked(conn: &Connection, id: &str) -> Result<Option<Job>, JobError> {
        let result = conn.query_row(
            "SELECT id, status, created_at, last_modified_at, logs, errors, retry_count, options, artifacts, archive_path FROM jobs WHERE id = ?",
            params![id],
            Self::row_to_job,
        );

        match result {
            Ok(job) => Ok(Some(job)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(JobError::Database(e.to_string())),
        }
    }

    /// Load an active (non-terminal) job, or fail with the appropriate error.
    fn get_active(conn: &Connection, id: &str, operation: &str) -> Result<Job, JobError> {
        let job =
            Self::get_locked(conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))?;
        if job.status.is_terminal() {
            return Err(JobError::InvalidState {
                job_id: id.to_string(),
                current_status: job.status.as_str().to_string(),
                operation: operation.to_string(),
            });
        }
        Ok(job)
    }

    fn persist(conn: &Connection, job: &Job) -> Result<(), JobError> {
        let logs_json =
            serde_json::to_string(&job.logs).map_err(|e| JobError::Database(e.to_string()))?;
        let errors_json =
            serde_json::to_string(&job.errors).map_err(|e| JobError::Database(e.to_string()))?;
        let artifacts_json = serde_json::to_string(&job.artifacts)
            .map_err(|e| JobError::Database(e.to_string()))?;

        conn.execute(
            "UPDATE jobs SET status = ?, last_modified_at = ?, logs = ?, errors = ?, retry_count = ?, artifacts = ?, archive_path = ? WHERE id = ?",
            params![
                job.status.as_str(),
                job.last_modified_at.to_rfc3339(),
                logs_json,
                errors_json,
                job.retry_count,
                artifacts_json,
                job.archive_path,
                job.id,
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(())
    }
}

impl JobStore for SqliteJobStore {
    fn create(&self, options: PackageOptions, initial: JobStatus) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let id = new_job_id(&options.host);
        let now = Utc::now();

        let options_json =
            serde_json::to_string(&options).map_err(|e| JobError::Database(e.to_string()))?;

        conn.execute(
            "INSERT INTO jobs (id, status, created_at, last_modified_at, logs, errors, retry_count, options, artifacts, archive_path) VALUES (?, ?, ?, ?, '[]', '[]', 0, ?, '[]', NULL)",
            params![
                id,
                initial.as_str(),
                now.to_rfc3339(),
                now.to_rfc3339(),
                options_json,
            ],
        )
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(Job {
            id,
            status: initial,
            created_at: now,
            last_modified_at: now,
            logs: vec![],
            errors: vec![],
            retry_count: 0,
            options,
            artifacts: vec![],
            archive_path: None,
        })
    }

    fn get(&self, id: &str) -> Result<Option<Job>, JobError> {
        let conn = self.conn.lock().unwrap();
        Self::get_locked(&conn, id)
    }

    fn list(&self, filter: &JobFilter) -> Result<Vec<Job>, JobError> {
        let conn = self.conn.lock().unwrap();

        let (where_clause, status_param) = match filter.status {
            Some(status) => ("WHERE status = ?".to_string(), Some(status.as_str())),
            None => (String::new(), None),
        };

        let sql = format!(
            "SELECT id, status, created_at, last_modified_at, logs, errors, retry_count, options, artifacts, archive_path FROM jobs {} ORDER BY created_at ASC LIMIT ? OFFSET ?",
            where_clause
        );

        let mut stmt = conn
            .prepare(&sql)
            .map_err(|e| JobError::Database(e.to_string()))?;

        let rows = match status_param {
            Some(status) => stmt.query_map(params![status, filter.limit, filter.offset], Self::row_to_job),
            None => stmt.query_map(params![filter.limit, filter.offset], Self::row_to_job),
        }
        .map_err(|e| JobError::Database(e.to_string()))?;

        let mut jobs = Vec::new();
        for row in rows {
            jobs.push(row.map_err(|e| JobError::Database(e.to_string()))?);
        }
        Ok(jobs)
    }

    fn count(&self, filter: &JobFilter) -> Result<i64, JobError> {
        let conn = self.conn.lock().unwrap();

        let count = match filter.status {
            Some(status) => conn.query_row(
                "SELECT COUNT(*) FROM jobs WHERE status = ?",
                params![status.as_str()],
                |row| row.get::<_, i64>(0),
            ),
            None => conn.query_row("SELECT COUNT(*) FROM jobs", [], |row| row.get::<_, i64>(0)),
        }
        .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(count)
    }

    fn claim_next_queued(&self) -> Result<Option<Job>, JobError> {
        // Select-then-update is atomic here because all writers share the
        // connection mutex.
        let conn = self.conn.lock().unwrap();

        let candidate = conn.query_row(
            "SELECT id, status, created_at, last_modified_at, logs, errors, retry_count, options, artifacts, archive_path FROM jobs WHERE status = 'queued' ORDER BY created_at ASC LIMIT 1",
            [],
            Self::row_to_job,
        );

        let mut job = match candidate {
            Ok(job) => job,
            Err(rusqlite::Error::QueryReturnedNoRows) => return Ok(None),
            Err(e) => return Err(JobError::Database(e.to_string())),
        };

        job.status = JobStatus::InProgress;
        job.last_modified_at = Utc::now();
        Self::persist(&conn, &job)?;

        Ok(Some(job))
    }

    fn append_log(&self, id: &str, line: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut job = Self::get_active(&conn, id, "append log to")?;
        job.logs.push(line.to_string());
        job.last_modified_at = Utc::now();
        Self::persist(&conn, &job)?;

        Ok(job)
    }

    fn increment_retry(&self, id: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut job = Self::get_active(&conn, id, "increment retry count of")?;
        job.retry_count += 1;
        job.last_modified_at = Utc::now();
        Self::persist(&conn, &job)?;

        Ok(job)
    }

    fn complete(
        &self,
        id: &str,
        artifacts: Vec<String>,
        archive_path: Option<String>,
        final_log: &str,
    ) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut job = Self::get_active(&conn, id, "complete")?;
        job.status = JobStatus::Completed;
        job.artifacts = artifacts;
        job.archive_path = archive_path;
        job.logs.push(final_log.to_string());
        job.last_modified_at = Utc::now();
        Self::persist(&conn, &job)?;

        Ok(job)
    }

    fn fail(&self, id: &str, errors: Vec<String>, final_log: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let mut job = Self::get_active(&conn, id, "fail")?;
        job.status = JobStatus::Failed;
        job.errors = errors;
        job.logs.push(final_log.to_string());
        job.last_modified_at = Utc::now();
        Self::persist(&conn, &job)?;

        Ok(job)
    }

    fn delete(&self, id: &str) -> Result<Job, JobError> {
        let conn = self.conn.lock().unwrap();

        let job =
            Self::get_locked(&conn, id)?.ok_or_else(|| JobError::NotFound(id.to_string()))?;

        conn.execute("DELETE FROM jobs WHERE id = ?", params![id])
            .map_err(|e| JobError::Database(e.to_string()))?;

        Ok(job)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::{DisplayMode, FallbackType, Orientation, SigningMode};

    fn test_options(host: &str) -> PackageOptions {
        PackageOptions {
            app_version: "1.0.0.0".to_string(),
            app_version_code: 1,
            background_color: "#ffffff".to_string(),
            display: DisplayMode::Standalone,
            enable_notifications: false,
            enable_site_settings_shortcut: true,
            fallback_type: FallbackType::CustomTabs,
            host: host.to_string(),
            icon_url: format!("https://{}/icon.png", host),
            include_source_code: false,
            launcher_name: "Test".to_string(),
            maskable_icon_url: None,
            monochrome_icon_url: None,
            name: "Test App".to_string(),
            navigation_color: "#ffffff".to_string(),
            navigation_color_dark: None,
            navigation_divider_color: None,
            orientation: Orientation::Default,
            package_id: "com.test.app".to_string(),
            pwa_url: format!("https://{}", host),
            signing: None,
            signing_mode: SigningMode::None,
            splash_screen_fade_out_duration_ms: 300,
            start_url: "/".to_string(),
            theme_color: "#ffffff".to_string(),
            theme_color_dark: None,
            web_manifest_url: format!("https://{}/manifest.json", host),
            min_sdk_version: 23,
        }
    }

    #[test]
    fn test_create_and_get() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::Queued)
            .unwrap();

        assert!(job.id.starts_with("pkg-foo.com-"));
        assert_eq!(job.status, JobStatus::Queued);
        assert!(job.logs.is_empty());

        let fetched = store.get(&job.id).unwrap().unwrap();
        assert_eq!(fetched, job);
    }

    #[test]
    fn test_get_missing_returns_none() {
        let store = SqliteJobStore::in_memory().unwrap();
        assert!(store.get("pkg-nope").unwrap().is_none());
    }

    #[test]
    fn test_claim_next_queued_oldest_first() {
        let store = SqliteJobStore::in_memory().unwrap();
        let first = store
            .create(test_options("first.com"), JobStatus::Queued)
            .unwrap();
        let _second = store
            .create(test_options("second.com"), JobStatus::Queued)
            .unwrap();

        let claimed = store.claim_next_queued().unwrap().unwrap();
        assert_eq!(claimed.id, first.id);
        assert_eq!(claimed.status, JobStatus::InProgress);

        // The claimed job is no longer visible as queued.
        let queued = store
            .count(&JobFilter::new().with_status(JobStatus::Queued))
            .unwrap();
        assert_eq!(queued, 1);
    }

    #[test]
    fn test_claim_empty_queue_returns_none() {
        let store = SqliteJobStore::in_memory().unwrap();
        assert!(store.claim_next_queued().unwrap().is_none());
    }

    #[test]
    fn test_each_job_claimed_once() {
        let store = SqliteJobStore::in_memory().unwrap();
        store
            .create(test_options("foo.com"), JobStatus::Queued)
            .unwrap();

        assert!(store.claim_next_queued().unwrap().is_some());
        assert!(store.claim_next_queued().unwrap().is_none());
    }

    #[test]
    fn test_append_log_bumps_last_modified() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::InProgress)
            .unwrap();

        let updated = store.append_log(&job.id, "invoking builder").unwrap();
        assert_eq!(updated.logs, vec!["invoking builder".to_string()]);
        assert!(updated.last_modified_at >= job.last_modified_at);
    }

    #[test]
    fn test_complete_records_artifacts_and_final_log() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::InProgress)
            .unwrap();

        let done = store
            .complete(
                &job.id,
                vec!["/tmp/app.apk".to_string()],
                Some("/tmp/app.zip".to_string()),
                "package created successfully",
            )
            .unwrap();

        assert_eq!(done.status, JobStatus::Completed);
        assert_eq!(done.artifacts, vec!["/tmp/app.apk".to_string()]);
        assert_eq!(done.archive_path.as_deref(), Some("/tmp/app.zip"));
        assert_eq!(
            done.logs.last().map(String::as_str),
            Some("package created successfully")
        );
    }

    #[test]
    fn test_fail_records_errors() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::InProgress)
            .unwrap();

        let failed = store
            .fail(
                &job.id,
                vec!["toolchain exited with code 1".to_string()],
                "build failed: toolchain exited with code 1",
            )
            .unwrap();

        assert_eq!(failed.status, JobStatus::Failed);
        assert_eq!(failed.errors.len(), 1);
        assert!(!failed.logs.is_empty());
    }

    #[test]
    fn test_no_writes_after_terminal() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::InProgress)
            .unwrap();
        store.fail(&job.id, vec!["boom".to_string()], "failed").unwrap();

        assert!(matches!(
            store.append_log(&job.id, "late line"),
            Err(JobError::InvalidState { .. })
        ));
        assert!(matches!(
            store.complete(&job.id, vec![], None, "late complete"),
            Err(JobError::InvalidState { .. })
        ));
        assert!(matches!(
            store.fail(&job.id, vec![], "late fail"),
            Err(JobError::InvalidState { .. })
        ));
        assert!(matches!(
            store.increment_retry(&job.id),
            Err(JobError::InvalidState { .. })
        ));
    }

    #[test]
    fn test_increment_retry() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::InProgress)
            .unwrap();

        let updated = store.increment_retry(&job.id).unwrap();
        assert_eq!(updated.retry_count, 1);
    }

    #[test]
    fn test_list_filters_by_status() {
        let store = SqliteJobStore::in_memory().unwrap();
        store
            .create(test_options("a.com"), JobStatus::Queued)
            .unwrap();
        let running = store
            .create(test_options("b.com"), JobStatus::InProgress)
            .unwrap();

        let in_progress = store
            .list(&JobFilter::new().with_status(JobStatus::InProgress))
            .unwrap();
        assert_eq!(in_progress.len(), 1);
        assert_eq!(in_progress[0].id, running.id);

        let all = store.list(&JobFilter::new()).unwrap();
        assert_eq!(all.len(), 2);
    }

    #[test]
    fn test_delete() {
        let store = SqliteJobStore::in_memory().unwrap();
        let job = store
            .create(test_options("foo.com"), JobStatus::Queued)
            .unwrap();

        let deleted = store.delete(&job.id).unwrap();
        assert_eq!(deleted.id, job.id);
        assert!(store.get(&job.id).unwrap().is_none());

        assert!(matches!(
            store.delete(&job.id),
            Err(JobError::NotFound(_))
        ));
    }

    #[test]
    fn test_options_round_trip_through_store() {
        let store = SqliteJobStore::in_memory().unwrap();
        let mut options = test_options("foo.com");
        options.maskable_icon_url = Some("https://foo.com/maskable.png".to_string());
        options.signing_mode = SigningMode::None;

        let job = store.create(options.clone(), JobStatus::Queued).unwrap();
        let fetched = store.get(&job.id).unwrap().unwrap();
        assert_eq!(fetched.options, options);
    }
}
