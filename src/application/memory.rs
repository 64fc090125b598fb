//! In-process application store used when no database is configured.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info};
use uuid::Uuid;

use super::{
    ApplicationError, ApplicationRef, ApplicationRequest, ApplicationResponse, ApplicationService,
    ApplyMode,
};

#[derive(Debug, Clone)]
struct StoredApplication {
    uid: Uuid,
    generation: i64,
    spec: ApplicationRequest,
}

#[derive(Debug, Default)]
pub struct MemoryApplicationService {
    apps: RwLock<HashMap<ApplicationRef, StoredApplication>>,
}

impl MemoryApplicationService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the manifest and, in commit mode, writes it.
    /// The write lock is only taken for commits so dry-runs never block readers.
    async fn apply(
        &self,
        app: &ApplicationRef,
        request: &ApplicationRequest,
        mode: ApplyMode,
    ) -> Result<(), ApplicationError> {
        request.validate().map_err(|err| mode.reject(err))?;

        match mode {
            ApplyMode::DryRun => {
                let generation = self
                    .apps
                    .read()
                    .await
                    .get(app)
                    .map_or(1, |stored| stored.generation + 1);
                debug!(application = %app, generation, "dry-run validated");
            }
            ApplyMode::Commit => {
                let mut apps = self.apps.write().await;
                let stored = apps
                    .entry(app.clone())
                    .and_modify(|stored| {
                        stored.generation += 1;
                        stored.spec = request.clone();
                    })
                    .or_insert_with(|| StoredApplication {
                        uid: Uuid::new_v4(),
                        generation: 1,
                        spec: request.clone(),
                    });
                info!(application = %app, generation = stored.generation, "application applied");
            }
        }

        Ok(())
    }
}

#[async_trait]
impl ApplicationService for MemoryApplicationService {
    fn kind(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, app: &ApplicationRef) -> Result<ApplicationResponse, ApplicationError> {
        self.apps
            .read()
            .await
            .get(app)
            .map(|stored| {
                ApplicationResponse::new(app, stored.uid, stored.generation, stored.spec.clone())
            })
            .ok_or_else(|| ApplicationError::NotFound(app.clone()))
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
        match self.apps.write().await.remove(app) {
            Some(_) => {
                info!(application = %app, "application deleted");
                Ok(())
            }
            None => Err(ApplicationError::NotFound(app.clone())),
        }
    }

    async fn ping(&self) -> Result<(), ApplicationError> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    fn app_ref() -> ApplicationRef {
        ApplicationRef::new("default", "web").unwrap()
    }

    fn manifest(image: &str) -> ApplicationRequest {
        serde_json::from_value(json!({
            "components": [{ "name": "web", "type": "webservice", "properties": { "image": image } }]
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn create_then_update_bumps_generation() {
        let service = MemoryApplicationService::new();
        let app = app_ref();

        service.create_or_update(&app, &manifest("nginx:1")).await.unwrap();
        let first = service.get(&app).await.unwrap();
        assert_eq!(first.metadata.generation, 1);

        service.create_or_update(&app, &manifest("nginx:2")).await.unwrap();
        let second = service.get(&app).await.unwrap();
        assert_eq!(second.metadata.generation, 2);
        assert_eq!(second.metadata.uid, first.metadata.uid);
        assert_eq!(second.spec, manifest("nginx:2"));
    }

    #[tokio::test]
    async fn dry_run_never_writes() {
        let service = MemoryApplicationService::new();
        let app = app_ref();

        service.dry_run(&app, &manifest("nginx:1")).await.unwrap();
        assert!(matches!(
            service.get(&app).await,
            Err(ApplicationError::NotFound(_))
        ));

        service.create_or_update(&app, &manifest("nginx:1")).await.unwrap();
        let before = service.get(&app).await.unwrap();
        service.dry_run(&app, &manifest("nginx:2")).await.unwrap();
        let after = service.get(&app).await.unwrap();
        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn invalid_manifest_fails_per_mode() {
        let service = MemoryApplicationService::new();
        let app = app_ref();
        let invalid: ApplicationRequest =
            serde_json::from_value(json!({ "components": [] })).unwrap();

        let dry_run = service.dry_run(&app, &invalid).await.unwrap_err();
        let commit = service.create_or_update(&app, &invalid).await.unwrap_err();

        match (dry_run, commit) {
            (ApplicationError::DryRunFailed(a), ApplicationError::ApplyFailed(b)) => {
                assert_eq!(a, b);
            }
            other => panic!("unexpected errors: {other:?}"),
        }
        assert!(service.get(&app).await.is_err());
    }

    #[tokio::test]
    async fn delete_missing_application_is_not_found() {
        let service = MemoryApplicationService::new();
        let app = app_ref();
        assert!(matches!(
            service.delete(&app).await,
            Err(ApplicationError::NotFound(_))
        ));

        service.create_or_update(&app, &manifest("nginx:1")).await.unwrap();
        service.delete(&app).await.unwrap();
        assert!(service.get(&app).await.is_err());
    }
}
