//! Registry manifest model.
//!
//! Only the fields needed to find an artifact's creation date are parsed;
//! everything else in the document is ignored.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer};

use crate::error::PurgeError;

/// OCI image index (multi-platform).
pub const MEDIA_TYPE_OCI_INDEX: &str = "application/vnd.oci.image.index.v1+json";
/// OCI image manifest.
pub const MEDIA_TYPE_OCI_MANIFEST: &str = "application/vnd.oci.image.manifest.v1+json";
/// Docker schema 2 manifest.
pub const MEDIA_TYPE_DOCKER_MANIFEST: &str = "application/vnd.docker.distribution.manifest.v2+json";
/// Docker schema 2 manifest list (multi-platform).
pub const MEDIA_TYPE_DOCKER_LIST: &str = "application/vnd.docker.distribution.manifest.list.v2+json";
/// Docker schema 1 signed manifest.
pub const MEDIA_TYPE_DOCKER_V1_SIGNED: &str =
    "application/vnd.docker.distribution.manifest.v1+prettyjws";
/// Docker schema 1 manifest.
pub const MEDIA_TYPE_DOCKER_V1: &str = "application/vnd.docker.distribution.manifest.v1+json";

/// Media types sent in the `Accept` header of every manifest request.
pub const ACCEPTED_MANIFEST_TYPES: [&str; 6] = [
    MEDIA_TYPE_OCI_INDEX,
    MEDIA_TYPE_OCI_MANIFEST,
    MEDIA_TYPE_DOCKER_MANIFEST,
    MEDIA_TYPE_DOCKER_LIST,
    MEDIA_TYPE_DOCKER_V1_SIGNED,
    MEDIA_TYPE_DOCKER_V1,
];

/// Annotation keys consulted, in order, as the last date fallback.
pub const CREATED_ANNOTATIONS: [&str; 2] = ["org.opencontainers.image.created", "created"];

/// Parsed manifest document (image manifest, manifest list or image index).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub schema_version: Option<u32>,

    #[serde(default)]
    pub media_type: Option<String>,

    /// Image config descriptor (schema 2 / OCI manifests)
    #[serde(default)]
    pub config: Option<Descriptor>,

    /// Sub-manifests (manifest lists / image indexes)
    #[serde(default, deserialize_with = "null_as_default")]
    pub manifests: Vec<IndexEntry>,

    /// Legacy schema 1 history
    #[serde(default, deserialize_with = "null_as_default")]
    pub history: Vec<serde_json::Value>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub annotations: HashMap<String, String>,
}

impl Manifest {
    /// True for manifest lists and image indexes.
    ///
    /// An index that omits `mediaType` but carries `manifests[]` counts too.
    pub fn is_list(&self) -> bool {
        match self.media_type.as_deref() {
            Some(MEDIA_TYPE_OCI_INDEX) | Some(MEDIA_TYPE_DOCKER_LIST) => true,
            Some(_) => false,
            None => !self.manifests.is_empty() && self.config.is_none(),
        }
    }

    /// Digest of the image config blob, if any.
    pub fn config_digest(&self) -> Option<&str> {
        self.config
            .as_ref()
            .map(|c| c.digest.as_str())
            .filter(|d| !d.is_empty())
    }

    /// `created` from the first history entry's `v1Compatibility` string.
    pub fn v1_compatibility_created(&self) -> Option<String> {
        let entry = self.history.first()?;
        let raw = entry.get("v1Compatibility")?.as_str()?;
        let parsed: serde_json::Value = serde_json::from_str(raw).ok()?;
        created_field(&parsed)
    }

    /// `created` from the first history entry read directly.
    ///
    /// Older documents store the entry either as a JSON string or as an
    /// object.
    pub fn history_created(&self) -> Option<String> {
        let entry = self.history.first()?;
        match entry {
            serde_json::Value::String(raw) => {
                let parsed: serde_json::Value = serde_json::from_str(raw).ok()?;
                created_field(&parsed)
            }
            other => created_field(other),
        }
    }

    /// Creation annotation, checking the OCI key before the bare `created` key.
    pub fn annotation_created(&self) -> Option<String> {
        CREATED_ANNOTATIONS
            .iter()
            .filter_map(|key| self.annotations.get(*key))
            .find(|value| !value.trim().is_empty())
            .cloned()
    }
}

/// Content descriptor.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub digest: String,
    #[serde(default)]
    pub size: Option<i64>,
}

/// Entry of a manifest list / image index.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    #[serde(default)]
    pub media_type: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub digest: String,
    #[serde(default)]
    pub platform: Option<Platform>,
}

/// Platform of an index entry.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
pub struct Platform {
    #[serde(default, deserialize_with = "null_as_default")]
    pub architecture: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub os: String,
    #[serde(default)]
    pub variant: Option<String>,
}

/// Treat an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read `created` (or Docker's `Created`) from a JSON object.
pub fn created_field(value: &serde_json::Value) -> Option<String> {
    ["created", "Created"]
        .iter()
        .filter_map(|key| value.get(*key))
        .filter_map(|v| v.as_str())
        .find(|s| !s.trim().is_empty())
        .map(str::to_string)
}

/// Requested platform, e.g. `linux/arm64/v8`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformSpec {
    pub os: String,
    pub architecture: String,
    pub variant: Option<String>,
}

impl PlatformSpec {
    /// True when `platform` matches os and architecture, and variant if requested.
    pub fn matches(&self, platform: &Platform) -> bool {
        platform.os == self.os
            && platform.architecture == self.architecture
            && self
                .variant
                .as_ref()
                .map_or(true, |v| platform.variant.as_deref() == Some(v.as_str()))
    }
}

impl FromStr for PlatformSpec {
    type Err = PurgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.trim().split('/').collect();
        match parts.as_slice() {
            [os, arch] if !os.is_empty() && !arch.is_empty() => Ok(Self {
                os: os.to_string(),
                architecture: arch.to_string(),
                variant: None,
            }),
            [os, arch, variant] if !os.is_empty() && !arch.is_empty() && !variant.is_empty() => {
                Ok(Self {
                    os: os.to_string(),
                    architecture: arch.to_string(),
                    variant: Some(variant.to_string()),
                })
            }
            _ => Err(PurgeError::Config(format!(
                "invalid platform '{}': expected os/arch[/variant]",
                s
            ))),
        }
    }
}

impl fmt::Display for PlatformSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.os, self.architecture)?;
        if let Some(ref variant) = self.variant {
            write!(f, "/{}", variant)?;
        }
        Ok(())
    }
}

/// Which sub-manifest of a list / index supplies the creation date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ManifestListStrategy {
    /// The first entry in `manifests[]`.
    #[default]
    First,
    /// The latest date over all entries; the index expires only when every
    /// platform image has.
    Newest,
    /// The entry matching a platform.
    Platform(PlatformSpec),
}

impl FromStr for ManifestListStrategy {
    type Err = PurgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        match s.to_ascii_lowercase().as_str() {
            "first" => Ok(Self::First),
            "newest" => Ok(Self::Newest),
            _ => match s.split_once(':') {
                Some((kind, platform)) if kind.eq_ignore_ascii_case("platform") => {
                    Ok(Self::Platform(platform.parse()?))
                }
                _ => Err(PurgeError::Config(format!(
                    "invalid manifest list strategy '{}': expected first, newest or platform:<os>/<arch>",
                    s
                ))),
            },
        }
    }
}

impl fmt::Display for ManifestListStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::First => write!(f, "first"),
            Self::Newest => write!(f, "newest"),
            Self::Platform(p) => write!(f, "platform:{}", p),
        }
    }
}
