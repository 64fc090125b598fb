//! # oam-apiserver (Application Lifecycle API)
//!
//! `oam-apiserver` exposes HTTP endpoints for reading, applying and deleting
//! declarative OAM applications inside a namespace.
//!
//! ## Request pipeline
//!
//! Every application route runs the same ordered pipeline:
//!
//! 1. **Resolve** the namespace, application name and optional `dryRun`
//!    directive (plus the manifest body for writes). Malformed input is
//!    rejected here and never reaches the backend.
//! 2. **Authenticate** the bearer token and **authorize** the route's
//!    `(resource, action)` pair (`application:detail`, `application:deploy`,
//!    `application:delete`).
//! 3. **Dispatch** exactly one backend operation: get, create-or-update,
//!    dry-run or delete.
//! 4. **Translate** the outcome into a JSON payload or a `{code, message}` error.
//!
//! ## Dry-run
//!
//! `POST ...?dryRun=All` runs the same manifest validation a real apply would,
//! but never persists. Dry-run shares the `deploy` permission with apply so a
//! caller that cannot deploy cannot exercise deploy-time validation either.
//!
//! ## Backends
//!
//! Applications live behind the [`application::ApplicationService`] trait. An
//! in-process store is used by default; passing `--dsn` persists them in
//! PostgreSQL instead.

pub mod api;
pub mod application;
pub mod cli;
pub mod rbac;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
