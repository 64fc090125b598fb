//! File-backed [`Authorizer`] built from a JSON policy.
//!
//! ```json
//! { "subjects": [
//!     { "name": "alice", "token": "s3cr3t",
//!       "permissions": [ { "resource": "application", "actions": ["detail", "deploy"] } ] }
//! ] }
//! ```
//!
//! `"*"` matches any resource or action.

use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{collections::HashSet, fs, path::Path};
use subtle::ConstantTimeEq;
use thiserror::Error;

use super::{Authorizer, Subject};

const WILDCARD: &str = "*";

#[derive(Debug, Deserialize)]
pub struct PolicyFile {
    pub subjects: Vec<SubjectEntry>,
}

#[derive(Debug, Deserialize)]
pub struct SubjectEntry {
    pub name: String,
    pub token: SecretString,
    #[serde(default)]
    pub permissions: Vec<PermissionRule>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionRule {
    pub resource: String,
    pub actions: Vec<String>,
}

impl PermissionRule {
    fn matches(&self, resource: &str, action: &str) -> bool {
        (self.resource == WILDCARD || self.resource == resource)
            && self
                .actions
                .iter()
                .any(|allowed| allowed == WILDCARD || allowed == action)
    }
}

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("failed to read policy file: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid policy JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("subject #{0} has an empty name")]
    EmptyName(usize),
    #[error("duplicate subject \"{0}\"")]
    DuplicateSubject(String),
    #[error("subject \"{0}\" has an empty token")]
    EmptyToken(String),
    #[error("subject \"{0}\" shares its token with another subject")]
    DuplicateToken(String),
    #[error("subject \"{0}\" has a permission without resource or actions")]
    EmptyPermission(String),
}

#[derive(Debug)]
pub struct PolicyAuthorizer {
    subjects: Vec<SubjectEntry>,
}

impl PolicyAuthorizer {
    /// Reads and validates a policy file.
    ///
    /// # Errors
    /// Returns [`PolicyError`] if the file cannot be read or is invalid.
    pub fn from_file(path: &Path) -> Result<Self, PolicyError> {
        let json = fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    /// Parses and validates a policy document.
    ///
    /// # Errors
    /// Returns [`PolicyError`] if the JSON is malformed, a subject name or
    /// token is empty or repeated, or a permission is empty.
    pub fn from_json(json: &str) -> Result<Self, PolicyError> {
        let file: PolicyFile = serde_json::from_str(json)?;
        Self::new(file)
    }

    /// Validates an already-parsed policy.
    ///
    /// # Errors
    /// See [`PolicyAuthorizer::from_json`].
    pub fn new(file: PolicyFile) -> Result<Self, PolicyError> {
        let mut names = HashSet::new();
        let mut tokens = HashSet::new();

        for (index, subject) in file.subjects.iter().enumerate() {
            if subject.name.trim().is_empty() {
                return Err(PolicyError::EmptyName(index));
            }
            if !names.insert(subject.name.as_str()) {
                return Err(PolicyError::DuplicateSubject(subject.name.clone()));
            }
            let token = subject.token.expose_secret();
            if token.is_empty() {
                return Err(PolicyError::EmptyToken(subject.name.clone()));
            }
            if !tokens.insert(token) {
                return Err(PolicyError::DuplicateToken(subject.name.clone()));
            }
            if subject
                .permissions
                .iter()
                .any(|rule| rule.resource.is_empty() || rule.actions.is_empty())
            {
                return Err(PolicyError::EmptyPermission(subject.name.clone()));
            }
        }

        Ok(Self {
            subjects: file.subjects,
        })
    }

    #[must_use]
    pub fn subject_count(&self) -> usize {
        self.subjects.len()
    }
}

impl Authorizer for PolicyAuthorizer {
    fn authenticate(&self, token: &str) -> Option<Subject> {
        // Compare against every entry so timing does not reveal the match position.
        let mut found = None;
        for subject in &self.subjects {
            let candidate = subject.token.expose_secret().as_bytes();
            if bool::from(candidate.ct_eq(token.as_bytes())) && found.is_none() {
                found = Some(Subject {
                    name: subject.name.clone(),
                });
            }
        }
        found
    }

    fn allowed(&self, subject: &Subject, resource: &str, action: &str) -> bool {
        self.subjects
            .iter()
            .find(|entry| entry.name == subject.name)
            .is_some_and(|entry| {
                entry
                    .permissions
                    .iter()
                    .any(|rule| rule.matches(resource, action))
            })
    }
}
