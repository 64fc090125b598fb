//! Authorization gate for application routes.
//!
//! Each route binds a single [`CheckPerm`] pair. Before a route reaches its
//! backend, [`Gate::check`] evaluates the preconditions in order and stops at
//! the first failure:
//!
//! 1. the bearer token must resolve to a [`Subject`];
//! 2. the subject must be allowed the route's `(resource, action)`.

use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

mod policy;

pub use policy::{PermissionRule, PolicyAuthorizer, PolicyError, PolicyFile, SubjectEntry};

pub const RESOURCE_APPLICATION: &str = "application";
pub const ACTION_DETAIL: &str = "detail";
pub const ACTION_DEPLOY: &str = "deploy";
pub const ACTION_DELETE: &str = "delete";

/// Authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subject {
    pub name: String,
}

/// The permission engine consumed by the gate.
pub trait Authorizer: Send + Sync {
    /// Resolves a bearer token to the subject it belongs to.
    fn authenticate(&self, token: &str) -> Option<Subject>;

    fn allowed(&self, subject: &Subject, resource: &str, action: &str) -> bool;
}

/// `(resource, action)` pair a route requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckPerm {
    pub resource: &'static str,
    pub action: &'static str,
}

impl CheckPerm {
    #[must_use]
    pub const fn new(resource: &'static str, action: &'static str) -> Self {
        Self { resource, action }
    }
}

pub const APPLICATION_DETAIL: CheckPerm = CheckPerm::new(RESOURCE_APPLICATION, ACTION_DETAIL);
pub const APPLICATION_DEPLOY: CheckPerm = CheckPerm::new(RESOURCE_APPLICATION, ACTION_DEPLOY);
pub const APPLICATION_DELETE: CheckPerm = CheckPerm::new(RESOURCE_APPLICATION, ACTION_DELETE);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GateError {
    #[error("authentication required")]
    Unauthenticated,
    #[error("{subject} is not allowed to {action} {resource}")]
    Forbidden {
        subject: String,
        resource: &'static str,
        action: &'static str,
    },
}

#[derive(Clone)]
pub struct Gate {
    authorizer: Arc<dyn Authorizer>,
}

impl Gate {
    #[must_use]
    pub fn new(authorizer: Arc<dyn Authorizer>) -> Self {
        Self { authorizer }
    }

    /// Authenticates the caller, then checks `perm`.
    ///
    /// # Errors
    /// [`GateError::Unauthenticated`] when no token is given or it is unknown,
    /// [`GateError::Forbidden`] when the subject lacks the permission.
    pub fn check(&self, token: Option<&str>, perm: CheckPerm) -> Result<Subject, GateError> {
        let subject = token
            .and_then(|token| self.authorizer.authenticate(token))
            .ok_or(GateError::Unauthenticated)?;

        if !self
            .authorizer
            .allowed(&subject, perm.resource, perm.action)
        {
            debug!(
                subject = %subject.name,
                resource = perm.resource,
                action = perm.action,
                "permission denied"
            );
            return Err(GateError::Forbidden {
                subject: subject.name,
                resource: perm.resource,
                action: perm.action,
            });
        }

        Ok(subject)
    }
}

impl std::fmt::Debug for Gate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gate").finish_non_exhaustive()
    }
}
