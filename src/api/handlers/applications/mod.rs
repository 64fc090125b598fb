//! OAM application endpoints scoped to a namespace.
//!
//! Handlers only wire extractors to the pipeline: `descriptor` resolves the
//! request, `dispatcher` gates it and calls the backend, and
//! [`respond`](crate::api::error::respond) translates the outcome.

use axum::{
    Json,
    extract::{
        Extension, Path, Query,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::HeaderMap,
    response::Response,
};
use std::sync::Arc;

use crate::{
    api::error::{EmptyResponse, ErrorBody, respond},
    application::{ApplicationRequest, ApplicationResponse},
};

pub mod descriptor;
mod dispatcher;

pub use descriptor::{DryRun, DryRunQuery, LifecycleRequest};
pub use dispatcher::ApplicationDispatcher;

use descriptor::{bearer_token, resolve_lifecycle, resolve_ref};

#[utoipa::path(
    get,
    path = "/v1/namespaces/{namespace}/applications/{appname}",
    params(
        ("namespace" = String, Path, description = "identifier of the namespace"),
        ("appname" = String, Path, description = "identifier of the oam application")
    ),
    responses(
        (status = 200, description = "OK", body = ApplicationResponse),
        (status = 400, description = "Invalid namespace or application name.", body = ErrorBody),
        (status = 401, description = "Missing or unknown bearer token.", body = ErrorBody),
        (status = 403, description = "Caller lacks application:detail.", body = ErrorBody),
        (status = 404, description = "Application does not exist.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "oam_application"
)]
/// Gets the specified OAM application in the specified namespace.
pub async fn get_application(
    path: Result<Path<(String, String)>, PathRejection>,
    headers: HeaderMap,
    Extension(dispatcher): Extension<Arc<ApplicationDispatcher>>,
) -> Response {
    let outcome = match resolve_ref(path) {
        Ok(app) => dispatcher.get_application(bearer_token(&headers), app).await,
        Err(err) => Err(err),
    };

    respond(outcome)
}

#[utoipa::path(
    post,
    path = "/v1/namespaces/{namespace}/applications/{appname}",
    request_body = ApplicationRequest,
    params(
        ("namespace" = String, Path, description = "identifier of the namespace"),
        ("appname" = String, Path, description = "identifier of the oam application"),
        DryRunQuery
    ),
    responses(
        (status = 200, description = "Applied, or validated when dryRun=All.", body = EmptyResponse),
        (status = 400, description = "Invalid input, invalid dryRun, or the manifest failed to apply or dry-run.", body = ErrorBody),
        (status = 401, description = "Missing or unknown bearer token.", body = ErrorBody),
        (status = 403, description = "Caller lacks application:deploy.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "oam_application"
)]
/// Creates or updates an OAM application in the specified namespace.
/// With `dryRun=All` the manifest is validated the same way but nothing is persisted.
pub async fn create_or_update_application(
    path: Result<Path<(String, String)>, PathRejection>,
    query: Result<Query<DryRunQuery>, QueryRejection>,
    headers: HeaderMap,
    Extension(dispatcher): Extension<Arc<ApplicationDispatcher>>,
    payload: Result<Json<ApplicationRequest>, JsonRejection>,
) -> Response {
    let outcome = match resolve_lifecycle(path, query, payload) {
        Ok(request) => {
            dispatcher
                .create_or_update_application(bearer_token(&headers), request)
                .await
        }
        Err(err) => Err(err),
    };

    respond(outcome)
}

#[utoipa::path(
    delete,
    path = "/v1/namespaces/{namespace}/applications/{appname}",
    operation_id = "deleteOAMApplication",
    params(
        ("namespace" = String, Path, description = "identifier of the namespace"),
        ("appname" = String, Path, description = "identifier of the oam application")
    ),
    responses(
        (status = 200, description = "Deleted.", body = EmptyResponse),
        (status = 401, description = "Missing or unknown bearer token.", body = ErrorBody),
        (status = 403, description = "Caller lacks application:delete.", body = ErrorBody),
        (status = 404, description = "Application does not exist.", body = ErrorBody),
    ),
    security(("bearer" = [])),
    tag = "oam_application"
)]
/// Deletes an OAM application in the specified namespace.
pub async fn delete_application(
    path: Result<Path<(String, String)>, PathRejection>,
    headers: HeaderMap,
    Extension(dispatcher): Extension<Arc<ApplicationDispatcher>>,
) -> Response {
    let outcome = match resolve_ref(path) {
        Ok(app) => dispatcher.delete_application(bearer_token(&headers), app).await,
        Err(err) => Err(err),
    };

    respond(outcome)
}
