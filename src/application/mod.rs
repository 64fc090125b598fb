//! Application lifecycle backends.
//!
//! The HTTP layer only needs four operations keyed by `(namespace, name)`:
//! get, create-or-update, dry-run and delete. They live behind the
//! [`ApplicationService`] trait so the dispatcher can be built with any backend.
//!
//! Both bundled backends run the same manifest validation for a real apply and
//! for a dry-run; only the commit step differs (see [`ApplyMode`]).

use async_trait::async_trait;
use serde::Serialize;
use std::fmt;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

pub mod manifest;
mod memory;
mod postgres;

pub use manifest::{ApplicationRequest, ManifestError};
pub use memory::MemoryApplicationService;
pub use postgres::PgApplicationService;

pub const API_VERSION: &str = "core.oam.dev/v1beta1";
pub const KIND: &str = "Application";
const PHASE_RUNNING: &str = "running";

/// Identity of an application inside a namespace.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ApplicationRef {
    namespace: String,
    name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RefError {
    #[error("namespace is required")]
    EmptyNamespace,
    #[error("application name is required")]
    EmptyName,
}

impl ApplicationRef {
    /// Builds a reference from raw path segments.
    ///
    /// # Errors
    /// Returns [`RefError`] when either segment is empty.
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Result<Self, RefError> {
        let namespace = namespace.into();
        let name = name.into();
        if namespace.is_empty() {
            return Err(RefError::EmptyNamespace);
        }
        if name.is_empty() {
            return Err(RefError::EmptyName);
        }
        Ok(Self { namespace, name })
    }

    #[must_use]
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for ApplicationRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Snapshot of a stored application, returned by `GET`.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationResponse {
    pub api_version: String,
    pub kind: String,
    pub metadata: ApplicationMeta,
    pub spec: ApplicationRequest,
    pub status: ApplicationStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ApplicationMeta {
    pub namespace: String,
    pub name: String,
    pub uid: String,
    pub generation: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ApplicationStatus {
    pub phase: String,
}

impl ApplicationResponse {
    pub(crate) fn new(app: &ApplicationRef, uid: Uuid, generation: i64, spec: ApplicationRequest) -> Self {
        Self {
            api_version: API_VERSION.to_string(),
            kind: KIND.to_string(),
            metadata: ApplicationMeta {
                namespace: app.namespace().to_string(),
                name: app.name().to_string(),
                uid: uid.to_string(),
                generation,
            },
            spec,
            status: ApplicationStatus {
                phase: PHASE_RUNNING.to_string(),
            },
        }
    }
}

/// Failures reported by a backend. The variant already encodes the failure
/// kind, so callers surface it without reinterpreting.
#[derive(Debug, Error)]
pub enum ApplicationError {
    #[error("application {0} does not exist")]
    NotFound(ApplicationRef),
    #[error("application apply failed: {0}")]
    ApplyFailed(ManifestError),
    #[error("application dry-run failed: {0}")]
    DryRunFailed(ManifestError),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("stored application is corrupt: {0}")]
    Corrupt(#[from] serde_json::Error),
}

/// Whether an apply persists its result or only validates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyMode {
    Commit,
    DryRun,
}

impl ApplyMode {
    /// Wraps a manifest rejection in the error kind matching this mode.
    #[must_use]
    pub fn reject(self, err: ManifestError) -> ApplicationError {
        match self {
            Self::Commit => ApplicationError::ApplyFailed(err),
            Self::DryRun => ApplicationError::DryRunFailed(err),
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Commit => "commit",
            Self::DryRun => "dry-run",
        }
    }
}

/// The application-lifecycle backend consumed by the HTTP layer.
#[async_trait]
pub trait ApplicationService: Send + Sync {
    /// Short backend name reported by `/health`.
    fn kind(&self) -> &'static str;

    async fn get(&self, app: &ApplicationRef) -> Result<ApplicationResponse, ApplicationError>;

    async fn create_or_update(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
    ) -> Result<(), ApplicationError>;

    /// Runs the create-or-update validation path without persisting anything.
    async fn dry_run(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
    ) -> Result<(), ApplicationError>;

    async fn delete(&self, app: &ApplicationRef) -> Result<(), ApplicationError>;

    async fn ping(&self) -> Result<(), ApplicationError>;
}
