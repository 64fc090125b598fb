//! Lifecycle dispatcher.
//!
//! Receives already-resolved requests, runs the route's gate and invokes
//! exactly one backend operation. A request rejected by the gate never reaches
//! the backend; dry-run and apply are mutually exclusive branches.

use std::sync::Arc;
use tracing::{error, instrument};

use super::descriptor::{DryRun, LifecycleRequest};
use crate::{
    api::error::{ApiError, EmptyResponse, ErrorDetailPolicy},
    application::{ApplicationError, ApplicationRef, ApplicationResponse, ApplicationService},
    rbac::{APPLICATION_DELETE, APPLICATION_DEPLOY, APPLICATION_DETAIL, Gate},
};

pub struct ApplicationDispatcher {
    service: Arc<dyn ApplicationService>,
    gate: Gate,
    detail: ErrorDetailPolicy,
}

impl ApplicationDispatcher {
    #[must_use]
    pub fn new(service: Arc<dyn ApplicationService>, gate: Gate, detail: ErrorDetailPolicy) -> Self {
        Self {
            service,
            gate,
            detail,
        }
    }

    /// Fetches an application snapshot (`application:detail`).
    ///
    /// # Errors
    /// Gate rejections, `ApplicationNotExist`, or backend failures.
    #[instrument(skip(self, token), fields(application = %app))]
    pub async fn get_application(
        &self,
        token: Option<&str>,
        app: ApplicationRef,
    ) -> Result<ApplicationResponse, ApiError> {
        self.gate.check(token, APPLICATION_DETAIL)?;

        self.service
            .get(&app)
            .await
            .map_err(|err| self.failure("get", &err))
    }

    /// Applies or dry-runs a manifest (`application:deploy` for both).
    ///
    /// # Errors
    /// Gate rejections, `ApplicationApplyFailed`, `ApplicationDryRunFailed`,
    /// or backend failures.
    #[instrument(
        skip(self, token, request),
        fields(application = %request.app, dry_run = request.dry_run.is_some())
    )]
    pub async fn create_or_update_application(
        &self,
        token: Option<&str>,
        request: LifecycleRequest,
    ) -> Result<EmptyResponse, ApiError> {
        self.gate.check(token, APPLICATION_DEPLOY)?;

        let LifecycleRequest {
            app,
            payload,
            dry_run,
        } = request;

        match dry_run {
            Some(DryRun::All) => self
                .service
                .dry_run(&app, &payload)
                .await
                .map_err(|err| self.failure("dryrun", &err))?,
            None => self
                .service
                .create_or_update(&app, &payload)
                .await
                .map_err(|err| self.failure("create", &err))?,
        }

        Ok(EmptyResponse {})
    }

    /// Deletes an application (`application:delete`).
    ///
    /// # Errors
    /// Gate rejections, `ApplicationNotExist`, or backend failures.
    #[instrument(skip(self, token), fields(application = %app))]
    pub async fn delete_application(
        &self,
        token: Option<&str>,
        app: ApplicationRef,
    ) -> Result<EmptyResponse, ApiError> {
        self.gate.check(token, APPLICATION_DELETE)?;

        self.service
            .delete(&app)
            .await
            .map_err(|err| self.failure("delete", &err))?;

        Ok(EmptyResponse {})
    }

    fn failure(&self, operation: &str, err: &ApplicationError) -> ApiError {
        error!("{operation} application failure: {err}");
        ApiError::from_application(err, self.detail)
    }
}

impl std::fmt::Debug for ApplicationDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApplicationDispatcher")
            .field("backend", &self.service.kind())
            .field("detail", &self.detail)
            .finish_non_exhaustive()
    }
}
