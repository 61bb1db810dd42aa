//! Resource identity extraction.
//!
//! The metrics store keys its entries by [`ResourceIdentity`], derived from
//! the observed object through the [`Identify`] trait. Cluster objects are
//! identified by their metadata UID, which is stable across every update
//! the object goes through until it is deleted.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{IdentityError, IdentityResult};

/// Stable key for an observed resource.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceIdentity(String);

impl ResourceIdentity {
    pub fn new(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ResourceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive a [`ResourceIdentity`] from an observed object.
///
/// Equivalent objects must yield equal identities. Implementations report
/// malformed or unsupported objects as an [`IdentityError`].
pub trait Identify {
    fn identity(&self) -> IdentityResult<ResourceIdentity>;
}

/// Object metadata, as carried by every cluster object.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ObjectMeta {
    #[serde(default)]
    pub uid: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub namespace: Option<String>,
    #[serde(default)]
    pub labels: BTreeMap<String, String>,
}

/// A typed cluster object: its kind plus metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceObject {
    pub kind: String,
    #[serde(default)]
    pub metadata: Option<ObjectMeta>,
}

impl ResourceObject {
    /// Build an object with the given kind, name and UID.
    pub fn new(kind: impl Into<String>, name: impl Into<String>, uid: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            metadata: Some(ObjectMeta {
                uid: Some(uid.into()),
                name: Some(name.into()),
                ..ObjectMeta::default()
            }),
        }
    }

    /// `namespace/name`, or just `name` for cluster-scoped objects.
    pub fn display_name(&self) -> String {
        let Some(meta) = &self.metadata else {
            return "<unnamed>".to_string();
        };
        display_name(meta.namespace.as_deref(), meta.name.as_deref())
    }
}

impl Identify for ResourceObject {
    fn identity(&self) -> IdentityResult<ResourceIdentity> {
        let meta = self
            .metadata
            .as_ref()
            .ok_or_else(|| IdentityError::MissingMetadata {
                kind: self.kind.clone(),
            })?;
        identity_from_uid(&self.kind, &self.display_name(), meta.uid.as_deref())
    }
}

/// Untyped objects, as decoded straight from the API server's JSON.
impl Identify for serde_json::Value {
    fn identity(&self) -> IdentityResult<ResourceIdentity> {
        let kind = self
            .get("kind")
            .and_then(|k| k.as_str())
            .unwrap_or("unknown")
            .to_string();
        let meta = self
            .get("metadata")
            .filter(|m| m.is_object())
            .ok_or_else(|| IdentityError::MissingMetadata { kind: kind.clone() })?;
        let field = |key: &str| meta.get(key).and_then(|v| v.as_str());
        let name = display_name(field("namespace"), field("name"));
        identity_from_uid(&kind, &name, field("uid"))
    }
}

fn identity_from_uid(kind: &str, name: &str, uid: Option<&str>) -> IdentityResult<ResourceIdentity> {
    match uid {
        None => Err(IdentityError::MissingUid {
            kind: kind.to_string(),
            name: name.to_string(),
        }),
        Some(uid) if uid.trim().is_empty() => Err(IdentityError::EmptyUid {
            kind: kind.to_string(),
            name: name.to_string(),
        }),
        Some(uid) => Ok(ResourceIdentity::new(uid)),
    }
}

fn display_name(namespace: Option<&str>, name: Option<&str>) -> String {
    let name = name.unwrap_or("<unnamed>");
    match namespace {
        Some(ns) if !ns.is_empty() => format!("{ns}/{name}"),
        _ => name.to_string(),
    }
}
