use async_trait::async_trait;
use bytes::Bytes;
use joblib::status::{JobStatus, Outcome};
use joblib::store::{output_text, JobStore, Result, StoreError};
use joblib::types::{JobId, JobRecord, JobSummary, NewJob};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

const SCHEMA: [&str; 2] = [
    r#"CREATE TABLE IF NOT EXISTS jobs (
        id        INTEGER PRIMARY KEY AUTOINCREMENT,
        command   TEXT    NOT NULL,
        workdir   TEXT,
        input     BLOB    NOT NULL,
        stdout    TEXT    NOT NULL DEFAULT '',
        stderr    TEXT    NOT NULL DEFAULT '',
        exit_code INTEGER NOT NULL DEFAULT -2,
        status    TEXT    NOT NULL DEFAULT 'RUNNING'
    )"#,
    r#"CREATE TABLE IF NOT EXISTS job_env (
        job_id   INTEGER NOT NULL REFERENCES jobs(id),
        position INTEGER NOT NULL,
        key      TEXT    NOT NULL,
        value    TEXT    NOT NULL,
        PRIMARY KEY (job_id, position)
    )"#,
];

/// Job records in a SQLite database.
#[derive(Debug, Clone)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (or create) the database at `url` and make sure the schema exists.
    pub async fn open(url: &str) -> sqlx::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)?
            .create_if_missing(true)
            .busy_timeout(Duration::from_secs(30));
        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    /// A private in-memory database, for tests.
    pub async fn in_memory() -> sqlx::Result<Self> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")?;
        // every connection to :memory: is its own database, so keep exactly one
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        Self::with_pool(pool).await
    }

    async fn with_pool(pool: SqlitePool) -> sqlx::Result<Self> {
        for statement in SCHEMA {
            sqlx::query(statement).execute(&pool).await?;
        }
        Ok(Self { pool })
    }

    /// Tell a missing job apart from one that already reached a terminal status.
    async fn rejected(&self, id: JobId) -> StoreError {
        let found: sqlx::Result<Option<(String,)>> =
            sqlx::query_as("SELECT status FROM jobs WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await;
        match found {
            Ok(Some(_)) => StoreError::AlreadyFinished(id),
            Ok(None) => StoreError::NotFound(id),
            Err(err) => backend(err),
        }
    }
}

fn backend(err: sqlx::Error) -> StoreError {
    StoreError::Backend(err.to_string())
}

#[async_trait]
impl JobStore for SqliteStore {
    async fn create_job(&self, job: &NewJob) -> Result<JobId> {
        let mut tx = self.pool.begin().await.map_err(backend)?;

        let workdir = job
            .workdir
            .as_ref()
            .map(|dir| dir.to_string_lossy().into_owned());
        let id = sqlx::query("INSERT INTO jobs (command, workdir, input) VALUES (?, ?, ?)")
            .bind(&job.command)
            .bind(workdir)
            .bind(job.input.as_ref())
            .execute(&mut *tx)
            .await
            .map_err(backend)?
            .last_insert_rowid();

        for (position, (key, value)) in job.env.iter().enumerate() {
            sqlx::query("INSERT INTO job_env (job_id, position, key, value) VALUES (?, ?, ?, ?)")
                .bind(id)
                .bind(position as i64)
                .bind(key)
                .bind(value)
                .execute(&mut *tx)
                .await
                .map_err(backend)?;
        }

        tx.commit().await.map_err(backend)?;
        Ok(id)
    }

    async fn write_interim(&self, id: JobId, stdout: Bytes, stderr: Bytes) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE jobs SET stdout = ?, stderr = ? WHERE id = ? AND status = 'RUNNING'",
        )
        .bind(output_text(&stdout).as_ref())
        .bind(output_text(&stderr).as_ref())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if updated.rows_affected() == 0 {
            return Err(self.rejected(id).await);
        }
        Ok(())
    }

    async fn write_final(
        &self,
        id: JobId,
        stdout: Bytes,
        stderr: Bytes,
        outcome: Outcome,
    ) -> Result<()> {
        let updated = sqlx::query(
            "UPDATE jobs SET stdout = ?, stderr = ?, exit_code = ?, status = ? \
             WHERE id = ? AND status = 'RUNNING'",
        )
        .bind(output_text(&stdout).as_ref())
        .bind(output_text(&stderr).as_ref())
        .bind(outcome.exit_code)
        .bind(outcome.status.as_str())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(backend)?;

        if updated.rows_affected() == 0 {
            return Err(self.rejected(id).await);
        }
        Ok(())
    }

    async fn read_summaries(&self) -> Result<Vec<JobSummary>> {
        let rows: Vec<(i64, String)> = sqlx::query_as("SELECT id, command FROM jobs ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(backend)?;
        Ok(rows
            .into_iter()
            .map(|(id, command)| JobSummary { id, command })
            .collect())
    }

    async fn read_detail(&self, id: JobId) -> Result<JobRecord> {
        let row: Option<(String, Option<String>, Vec<u8>, String, String, i64, String)> =
            sqlx::query_as(
                "SELECT command, workdir, input, stdout, stderr, exit_code, status \
                 FROM jobs WHERE id = ?",
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(backend)?;
        let (command, workdir, input, stdout, stderr, exit_code, status) =
            row.ok_or(StoreError::NotFound(id))?;

        let env: Vec<(String, String)> =
            sqlx::query_as("SELECT key, value FROM job_env WHERE job_id = ? ORDER BY position")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .map_err(backend)?;

        let status =
            JobStatus::from_str(&status).map_err(|err| StoreError::Backend(err.to_string()))?;
        let exit_code =
            i32::try_from(exit_code).map_err(|err| StoreError::Backend(err.to_string()))?;
        Ok(JobRecord {
            id,
            command,
            workdir: workdir.map(PathBuf::from),
            env,
            input: Bytes::from(input),
            stdout,
            stderr,
            status,
            exit_code,
        })
    }
}
