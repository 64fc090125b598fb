use crate::{
    api::{self, ErrorDetailPolicy},
    application::{ApplicationService, MemoryApplicationService, PgApplicationService},
    rbac::PolicyAuthorizer,
};
use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: Option<String>,
    pub policy_path: PathBuf,
    pub error_detail: ErrorDetailPolicy,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the policy cannot be loaded, the database is
/// unreachable or its schema cannot be applied, or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let authorizer = PolicyAuthorizer::from_file(&args.policy_path).with_context(|| {
        format!(
            "Failed to load access policy from {}",
            args.policy_path.display()
        )
    })?;
    info!("Loaded access policy with {} subjects", authorizer.subject_count());

    let service: Arc<dyn ApplicationService> = match args.dsn.as_deref() {
        Some(dsn) => {
            let pool = PgPoolOptions::new()
                .min_connections(1)
                .max_connections(5)
                .max_lifetime(Duration::from_secs(60 * 2))
                .test_before_acquire(true)
                .connect(dsn)
                .await
                .context("Failed to connect to database")?;

            let service = PgApplicationService::new(pool);
            service
                .migrate()
                .await
                .context("Failed to apply database schema")?;
            Arc::new(service)
        }
        None => {
            warn!("No DSN configured, applications are kept in memory");
            Arc::new(MemoryApplicationService::new())
        }
    };

    api::new(args.port, service, Arc::new(authorizer), args.error_detail).await
}

fn log_startup_args(args: &Args) {
    let backend = args
        .dsn
        .as_deref()
        .map_or_else(|| "memory".to_string(), redact_dsn);

    info!(
        port = args.port,
        backend = %backend,
        policy = %args.policy_path.display(),
        error_detail = %args.error_detail,
        "Starting oam-apiserver"
    );
}

/// Strips the password from a DSN so it can be logged.
fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut url) => {
            if url.password().is_some() {
                let _ = url.set_password(Some("****"));
            }
            url.to_string()
        }
        Err(_) => "<unparseable dsn>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redact_dsn_hides_password() {
        assert_eq!(
            redact_dsn("postgres://oam:secret@db:5432/oam"),
            "postgres://oam:****@db:5432/oam"
        );
        assert_eq!(
            redact_dsn("postgres://oam@db:5432/oam"),
            "postgres://oam@db:5432/oam"
        );
        assert_eq!(redact_dsn("not a url"), "<unparseable dsn>");
    }

    #[tokio::test]
    async fn missing_policy_fails_before_binding() {
        let result = execute(Args {
            port: 0,
            dsn: None,
            policy_path: PathBuf::from("/nonexistent/policy.json"),
            error_detail: ErrorDetailPolicy::Redact,
        })
        .await;

        assert!(result.is_err());
        if let Err(err) = result {
            assert!(err.to_string().contains("Failed to load access policy"));
        }
    }
}
