//! PostgreSQL application store.
//!
//! A real apply and a dry-run execute the same upsert inside a transaction;
//! the apply commits it and the dry-run rolls it back. Data and constraint
//! errors raised by Postgres (SQLSTATE classes 22 and 23) are reported as
//! manifest rejections, so they surface identically in both modes.

use async_trait::async_trait;
use sqlx::{Connection, PgPool, Row};
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ApplicationError, ApplicationRef, ApplicationRequest, ApplicationResponse, ApplicationService,
    ApplyMode, ManifestError,
};

const SCHEMA_SQL: &str = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/sql/schema.sql"));

#[derive(Debug, Clone)]
pub struct PgApplicationService {
    pool: PgPool,
}

impl PgApplicationService {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates the `oam_applications` table when missing.
    ///
    /// # Errors
    /// Returns an error if the schema statements fail.
    pub async fn migrate(&self) -> Result<(), ApplicationError> {
        sqlx::raw_sql(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn apply(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
        mode: ApplyMode,
    ) -> Result<(), ApplicationError> {
        request.validate().map_err(|err| mode.reject(err))?;
        let spec = serde_json::to_string(request)?;

        let mut tx = self.pool.begin().await?;
        let row = sqlx::query(
            r"
            INSERT INTO oam_applications (namespace, name, uid, spec)
            VALUES ($1, $2, $3, $4::jsonb)
            ON CONFLICT (namespace, name) DO UPDATE
            SET spec = EXCLUDED.spec,
                generation = oam_applications.generation + 1,
                updated_at = NOW()
            RETURNING generation
            ",
        )
        .bind(app.namespace())
        .bind(app.name())
        .bind(Uuid::new_v4())
        .bind(spec)
        .fetch_one(&mut *tx)
        .await
        .map_err(|err| storage_error(err, mode))?;
        let generation: i64 = row.get("generation");

        match mode {
            ApplyMode::Commit => {
                tx.commit().await?;
                info!(application = %app, generation, "application applied");
            }
            ApplyMode::DryRun => {
                tx.rollback().await?;
                debug!(application = %app, generation, "dry-run validated");
            }
        }

        Ok(())
    }
}

/// Maps a failed upsert onto the apply mode.
///
/// Data exceptions (class 22) and integrity violations (class 23) mean the
/// manifest itself cannot be stored; anything else stays a database error.
fn storage_error(err: sqlx::Error, mode: ApplyMode) -> ApplicationError {
    if let sqlx::Error::Database(db) = &err {
        if is_rejection(db.code().as_deref()) {
            return mode.reject(ManifestError::Rejected(db.message().to_string()));
        }
    }
    ApplicationError::Database(err)
}

fn is_rejection(sqlstate: Option<&str>) -> bool {
    sqlstate.is_some_and(|code| code.starts_with("22") || code.starts_with("23"))
}

#[async_trait]
impl ApplicationService for PgApplicationService {
    fn kind(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, app: &ApplicationRef) -> Result<ApplicationResponse, ApplicationError> {
        let row = sqlx::query(
            r"
            SELECT uid, generation, spec::text AS spec
            FROM oam_applications
            WHERE namespace = $1 AND name = $2
            ",
        )
        .bind(app.namespace())
        .bind(app.name())
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Err(ApplicationError::NotFound(app.clone()));
        };

        let uid: Uuid = row.get("uid");
        let generation: i64 = row.get("generation");
        let spec: String = row.get("spec");
        let spec: ApplicationRequest = serde_json::from_str(&spec)?;

        Ok(ApplicationResponse::new(app, uid, generation, spec))
    }

    async fn create_or_update(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
    ) -> Result<(), ApplicationError> {
        self.apply(app, request, ApplyMode::Commit).await
    }

    async fn dry_run(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
    ) -> Result<(), ApplicationError> {
        self.apply(app, request, ApplyMode::DryRun).await
    }

    async fn delete(&self, app: &ApplicationRef) -> Result<(), ApplicationError> {
        let result = sqlx::query("DELETE FROM oam_applications WHERE namespace = $1 AND name = $2")
            .bind(app.namespace())
            .bind(app.name())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(ApplicationError::NotFound(app.clone()));
        }

        info!(application = %app, "application deleted");
        Ok(())
    }

    async fn ping(&self) -> Result<(), ApplicationError> {
        let mut conn = self.pool.acquire().await?;
        conn.ping().await?;
        Ok(())
    }
}
