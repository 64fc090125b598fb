//! Request descriptor resolution.
//!
//! Turns raw path segments, the `dryRun` query value, the request body and the
//! `Authorization` header into typed inputs for the dispatcher. Nothing here
//! touches the backend.

use axum::{
    Json,
    extract::{
        Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderMap, header::AUTHORIZATION},
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    api::error::{ApiError, ErrorCode},
    application::{ApplicationRef, ApplicationRequest},
};

pub const DRY_RUN_ALL: &str = "All";
pub const INVALID_DRY_RUN_MESSAGE: &str = "Invalid dryRun parameter. Must be 'All'";

/// Validated dry-run directive. Absence means a normal apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DryRun {
    /// All dry-run stages are processed; nothing is persisted.
    All,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DryRunQuery {
    /// When present, modifications are not persisted. An invalid or
    /// unrecognized directive results in an error and no further processing.
    /// Valid values: `All` (all dry-run stages are processed).
    #[serde(rename = "dryRun")]
    pub dry_run: Option<String>,
}

/// Everything create-or-update needs, resolved once per request.
#[derive(Debug)]
pub struct LifecycleRequest {
    pub app: ApplicationRef,
    pub payload: ApplicationRequest,
    pub dry_run: Option<DryRun>,
}

/// Resolves the `{namespace}/{appname}` path into an [`ApplicationRef`].
///
/// # Errors
/// `InvalidRequest` when the path cannot be decoded or a segment is empty.
pub fn resolve_ref(
    path: Result<Path<(String, String)>, PathRejection>,
) -> Result<ApplicationRef, ApiError> {
    let Path((namespace, name)) =
        path.map_err(|err| ApiError::new(ErrorCode::InvalidRequest, err.body_text()))?;
    ApplicationRef::new(namespace, name)
        .map_err(|err| ApiError::new(ErrorCode::InvalidRequest, err.to_string()))
}

/// Validates the raw `dryRun` value. Empty counts as absent.
///
/// # Errors
/// `InvalidDryRun` for any value other than `All`.
pub fn resolve_dry_run(raw: Option<&str>) -> Result<Option<DryRun>, ApiError> {
    match raw {
        None | Some("") => Ok(None),
        Some(DRY_RUN_ALL) => Ok(Some(DryRun::All)),
        Some(_) => Err(ApiError::new(
            ErrorCode::InvalidDryRun,
            INVALID_DRY_RUN_MESSAGE,
        )),
    }
}

/// Resolves path, body and directive for create-or-update, in that order.
///
/// # Errors
/// The first resolution failure, always before any backend interaction.
pub fn resolve_lifecycle(
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<DryRunQuery>, QueryRejection>,
    payload: Result<Json<ApplicationRequest>, JsonRejection>,
) -> Result<LifecycleRequest, ApiError> {
    let app = resolve_ref(path)?;
    let Json(payload) =
        payload.map_err(|err| ApiError::new(ErrorCode::InvalidRequest, err.body_text()))?;
    let Query(query) =
        query.map_err(|err| ApiError::new(ErrorCode::InvalidRequest, err.body_text()))?;
    let dry_run = resolve_dry_run(query.dry_run.as_deref())?;

    Ok(LifecycleRequest {
        app,
        payload,
        dry_run,
    })
}

/// Extracts the bearer token from `Authorization`, if any.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}
