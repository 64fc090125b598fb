//! Desired-state manifest accepted by create-or-update and dry-run.
//!
//! The HTTP layer treats the manifest as opaque beyond being well-formed JSON.
//! Backends call [`ApplicationRequest::validate`] before persisting (or before
//! rolling back, for dry-run) so both paths reject the same manifests.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashSet;
use thiserror::Error;
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ApplicationRequest {
    pub components: Vec<Component>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub policies: Vec<Policy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow: Option<Workflow>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Component {
    pub name: String,
    #[serde(rename = "type")]
    pub component_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub traits: Vec<ComponentTrait>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ComponentTrait {
    #[serde(rename = "type")]
    pub trait_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Policy {
    pub name: String,
    #[serde(rename = "type")]
    pub policy_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Workflow {
    #[serde(default)]
    pub steps: Vec<WorkflowStep>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct WorkflowStep {
    pub name: String,
    #[serde(rename = "type")]
    pub step_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub properties: Option<Value>,
}

/// Reasons a manifest cannot be applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ManifestError {
    #[error("application must declare at least one component")]
    NoComponents,
    #[error("{kind} #{index} has an empty name")]
    EmptyName { kind: &'static str, index: usize },
    #[error("duplicate {kind} name \"{name}\"")]
    DuplicateName { kind: &'static str, name: String },
    #[error("{kind} \"{name}\" has an empty type")]
    EmptyType { kind: &'static str, name: String },
    #[error("component \"{component}\" declares trait \"{trait_type}\" more than once")]
    DuplicateTrait {
        component: String,
        trait_type: String,
    },
    #[error("properties of {kind} \"{name}\" must be an object")]
    PropertiesNotObject { kind: &'static str, name: String },
    #[error("{kind} \"{name}\" contains a NUL character")]
    NulCharacter { kind: &'static str, name: String },
    /// The storage backend refused the manifest data (bad value or constraint).
    #[error("manifest rejected by storage: {0}")]
    Rejected(String),
}

impl ApplicationRequest {
    /// Checks the structural rules every backend enforces before an apply.
    ///
    /// # Errors
    /// Returns the first [`ManifestError`] found, components first, then
    /// policies, then workflow steps.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.components.is_empty() {
            return Err(ManifestError::NoComponents);
        }

        check_names(
            "component",
            self.components.iter().map(|c| c.name.as_str()),
        )?;
        for component in &self.components {
            check_entry(
                "component",
                &component.name,
                &component.component_type,
                component.properties.as_ref(),
            )?;
            check_traits(component)?;
        }

        check_names("policy", self.policies.iter().map(|p| p.name.as_str()))?;
        for policy in &self.policies {
            check_entry(
                "policy",
                &policy.name,
                &policy.policy_type,
                policy.properties.as_ref(),
            )?;
        }

        if let Some(workflow) = &self.workflow {
            check_names(
                "workflow step",
                workflow.steps.iter().map(|s| s.name.as_str()),
            )?;
            for step in &workflow.steps {
                check_entry(
                    "workflow step",
                    &step.name,
                    &step.step_type,
                    step.properties.as_ref(),
                )?;
            }
        }

        Ok(())
    }
}

fn check_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for (index, name) in names.enumerate() {
        if name.trim().is_empty() {
            return Err(ManifestError::EmptyName { kind, index });
        }
        if name.contains('\0') {
            return Err(ManifestError::NulCharacter {
                kind,
                name: name.to_string(),
            });
        }
        if !seen.insert(name) {
            return Err(ManifestError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}

fn check_entry(
    kind: &'static str,
    name: &str,
    entry_type: &str,
    properties: Option<&Value>,
) -> Result<(), ManifestError> {
    if entry_type.trim().is_empty() {
        return Err(ManifestError::EmptyType {
            kind,
            name: name.to_string(),
        });
    }
    if entry_type.contains('\0') {
        return Err(ManifestError::NulCharacter {
            kind,
            name: name.to_string(),
        });
    }
    check_properties(kind, name, properties)
}

fn check_traits(component: &Component) -> Result<(), ManifestError> {
    let mut seen = HashSet::new();
    for (index, item) in component.traits.iter().enumerate() {
        if item.trait_type.trim().is_empty() {
            return Err(ManifestError::EmptyType {
                kind: "trait",
                name: format!("{}[{index}]", component.name),
            });
        }
        if !seen.insert(item.trait_type.as_str()) {
            return Err(ManifestError::DuplicateTrait {
                component: component.name.clone(),
                trait_type: item.trait_type.clone(),
            });
        }
        if item.trait_type.contains('\0') {
            return Err(ManifestError::NulCharacter {
                kind: "trait",
                name: format!("{}[{index}]", component.name),
            });
        }
        check_properties("trait", &item.trait_type, item.properties.as_ref())?;
    }
    Ok(())
}

fn check_properties(
    kind: &'static str,
    name: &str,
    properties: Option<&Value>,
) -> Result<(), ManifestError> {
    match properties {
        None => Ok(()),
        Some(value @ Value::Object(_)) => {
            if contains_nul(value) {
                Err(ManifestError::NulCharacter {
                    kind,
                    name: name.to_string(),
                })
            } else {
                Ok(())
            }
        }
        Some(_) => Err(ManifestError::PropertiesNotObject {
            kind,
            name: name.to_string(),
        }),
    }
}

// jsonb cannot hold U+0000 in keys or strings.
fn contains_nul(value: &Value) -> bool {
    match value {
        Value::String(text) => text.contains('\0'),
        Value::Array(items) => items.iter().any(contains_nul),
        Value::Object(map) => map
            .iter()
            .any(|(key, item)| key.contains('\0') || contains_nul(item)),
        Value::Null | Value::Bool(_) | Value::Number(_) => false,
    }
}
