//! Maps validated CLI matches to the action the binary executes.

use crate::{
    api::ErrorDetailPolicy,
    cli::{
        actions::{Action, server::Args},
        commands::{ARG_DSN, ARG_ERROR_DETAIL, ARG_POLICY, ARG_PORT},
    },
};
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);

    // An empty DSN (e.g. `OAM_APISERVER_DSN=`) selects the in-memory backend.
    let dsn = matches
        .get_one::<String>(ARG_DSN)
        .filter(|dsn| !dsn.trim().is_empty())
        .cloned();

    let policy_path = matches
        .get_one::<PathBuf>(ARG_POLICY)
        .cloned()
        .context("missing required argument: --policy")?;

    let error_detail = matches
        .get_one::<ErrorDetailPolicy>(ARG_ERROR_DETAIL)
        .copied()
        .unwrap_or_default();

    Ok(Action::Server(Args {
        port,
        dsn,
        policy_path,
        error_detail,
    }))
}
