//! Artifact creation-date resolution.
//!
//! Registries disagree on where the creation time lives, so resolution
//! walks a fixed fallback chain and the first hit wins:
//!
//! 1. manifest list / image index → pick sub-manifest(s) per strategy
//! 2. `created` / `Created` in the image config blob
//! 3. `created` in `history[0].v1Compatibility` (schema 1)
//! 4. `created` in `history[0]` itself (older schema)
//! 5. `org.opencontainers.image.created` or `created` annotation
//!
//! A value that is found but does not parse is an error, never a default.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use oci_purge_core::error::{PurgeError, Result};
use oci_purge_core::manifest::{created_field, IndexEntry, Manifest, ManifestListStrategy};
use oci_purge_core::retention::parse_timestamp;

use super::registry::Registry;

/// Where a creation date was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateSource {
    ConfigBlob,
    V1Compatibility,
    History,
    Annotation,
}

impl fmt::Display for DateSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DateSource::ConfigBlob => "config-blob",
            DateSource::V1Compatibility => "v1-compatibility",
            DateSource::History => "history",
            DateSource::Annotation => "annotation",
        };
        f.write_str(name)
    }
}

/// A resolved creation instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDate {
    pub created: DateTime<Utc>,
    pub source: DateSource,
    /// Reference (tag or sub-manifest digest) the date was read from
    pub reference: String,
}

/// Resolves artifact creation dates through a [`Registry`].
pub struct DateResolver {
    registry: Arc<dyn Registry>,
    strategy: ManifestListStrategy,
}

impl DateResolver {
    pub fn new(registry: Arc<dyn Registry>, strategy: ManifestListStrategy) -> Self {
        Self { registry, strategy }
    }

    pub fn strategy(&self) -> &ManifestListStrategy {
        &self.strategy
    }

    /// Determine when `repository:tag` was created.
    pub async fn resolve_creation_date(&self, repository: &str, tag: &str) -> Result<ResolvedDate> {
        let manifest = self.registry.get_manifest(repository, tag).await?;
        if !manifest.is_list() {
            return self.resolve_image(repository, tag, &manifest).await;
        }

        let entries = self.select_entries(repository, tag, &manifest)?;
        let mut newest: Option<ResolvedDate> = None;

        // Every selected entry must resolve; one unknown date leaves the index undated.
        for entry in entries {
            let resolved = match self.resolve_entry(repository, entry).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::debug!(
                        repository = %repository,
                        tag = %tag,
                        digest = %entry.digest,
                        error = %e,
                        "Sub-manifest date not resolved"
                    );
                    return Err(e);
                }
            };
            let is_newer = newest
                .as_ref()
                .map_or(true, |current| resolved.created > current.created);
            if is_newer {
                newest = Some(resolved);
            }
        }

        newest.ok_or_else(|| not_found(repository, tag))
    }

    /// Pick the index entries the strategy asks for.
    fn select_entries<'m>(
        &self,
        repository: &str,
        tag: &str,
        manifest: &'m Manifest,
    ) -> Result<Vec<&'m IndexEntry>> {
        let usable = manifest.manifests.iter().filter(|e| !e.digest.is_empty());

        let selected: Vec<&IndexEntry> = match &self.strategy {
            ManifestListStrategy::First => usable.take(1).collect(),
            ManifestListStrategy::Newest => usable.collect(),
            ManifestListStrategy::Platform(spec) => usable
                .filter(|e| e.platform.as_ref().map_or(false, |p| spec.matches(p)))
                .take(1)
                .collect(),
        };

        if selected.is_empty() {
            return Err(PurgeError::ManifestList(format!(
                "{}:{} has no entry for strategy '{}'",
                repository, tag, self.strategy
            )));
        }
        Ok(selected)
    }

    async fn resolve_entry(&self, repository: &str, entry: &IndexEntry) -> Result<ResolvedDate> {
        let sub_manifest = self.registry.get_manifest(repository, &entry.digest).await?;
        self.resolve_image(repository, &entry.digest, &sub_manifest)
            .await
    }

    /// Fallbacks 2-5 against a single manifest.
    async fn resolve_image(
        &self,
        repository: &str,
        reference: &str,
        manifest: &Manifest,
    ) -> Result<ResolvedDate> {
        if let Some(digest) = manifest.config_digest() {
            match self.registry.get_config_blob(repository, digest).await {
                Ok(config) => {
                    if let Some(created) = created_field(&config) {
                        return finish(&created, DateSource::ConfigBlob, reference);
                    }
                }
                Err(e) => {
                    tracing::debug!(
                        repository = %repository,
                        digest = %digest,
                        error = %e,
                        "Config blob unavailable, trying manifest fallbacks"
                    );
                }
            }
        }

        if let Some(created) = manifest.v1_compatibility_created() {
            return finish(&created, DateSource::V1Compatibility, reference);
        }
        if let Some(created) = manifest.history_created() {
            return finish(&created, DateSource::History, reference);
        }
        if let Some(created) = manifest.annotation_created() {
            return finish(&created, DateSource::Annotation, reference);
        }

        Err(not_found(repository, reference))
    }
}

fn finish(created: &str, source: DateSource, reference: &str) -> Result<ResolvedDate> {
    Ok(ResolvedDate {
        created: parse_timestamp(created)?,
        source,
        reference: reference.to_string(),
    })
}

fn not_found(repository: &str, reference: &str) -> PurgeError {
    PurgeError::DateNotFound {
        repository: repository.to_string(),
        reference: reference.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRegistry;
    use oci_purge_core::manifest::PlatformSpec;
    use serde_json::json;

    fn resolver(registry: FakeRegistry, strategy: ManifestListStrategy) -> DateResolver {
        DateResolver::new(Arc::new(registry), strategy)
    }

    fn ts(value: &str) -> DateTime<Utc> {
        parse_timestamp(value).unwrap()
    }

    fn image_manifest(config_digest: &str) -> serde_json::Value {
        json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.manifest.v1+json",
            "config": {"mediaType": "application/vnd.oci.image.config.v1+json", "digest": config_digest, "size": 10},
            "layers": []
        })
    }

    fn index(entries: &[(&str, &str, &str)]) -> serde_json::Value {
        let manifests: Vec<_> = entries
            .iter()
            .map(|(digest, os, arch)| {
                json!({
                    "mediaType": "application/vnd.oci.image.manifest.v1+json",
                    "digest": digest,
                    "size": 100,
                    "platform": {"os": os, "architecture": arch}
                })
            })
            .collect();
        json!({
            "schemaVersion": 2,
            "mediaType": "application/vnd.oci.image.index.v1+json",
            "manifests": manifests
        })
    }

    #[tokio::test]
    async fn test_config_blob_created() {
        let registry = FakeRegistry::new()
            .with_manifest("app", "v1", image_manifest("sha256:cfg"))
            .with_blob("app", "sha256:cfg", json!({"created": "2023-03-01T10:00:00Z"}));

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap();
        assert_eq!(resolved.created, ts("2023-03-01T10:00:00Z"));
        assert_eq!(resolved.source, DateSource::ConfigBlob);
        assert_eq!(resolved.reference, "v1");
    }

    #[tokio::test]
    async fn test_config_blob_docker_capitalised_created() {
        let registry = FakeRegistry::new()
            .with_manifest("app", "v1", image_manifest("sha256:cfg"))
            .with_blob("app", "sha256:cfg", json!({"Created": "2023-03-02T10:00:00Z"}));

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap();
        assert_eq!(resolved.created, ts("2023-03-02T10:00:00Z"));
    }

    #[tokio::test]
    async fn test_annotation_fallback_when_config_lacks_created() {
        let mut manifest = image_manifest("sha256:cfg");
        manifest["annotations"] = json!({"org.opencontainers.image.created": "2023-01-01T00:00:00Z"});
        let registry = FakeRegistry::new()
            .with_manifest("app", "v1", manifest)
            .with_blob("app", "sha256:cfg", json!({"architecture": "amd64"}));

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap();
        assert_eq!(resolved.created, ts("2023-01-01T00:00:00Z"));
        assert_eq!(resolved.source, DateSource::Annotation);
    }

    #[tokio::test]
    async fn test_missing_config_blob_falls_through() {
        let mut manifest = image_manifest("sha256:gone");
        manifest["annotations"] = json!({"created": "2022-06-06T00:00:00Z"});
        let registry = FakeRegistry::new().with_manifest("app", "v1", manifest);

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap();
        assert_eq!(resolved.source, DateSource::Annotation);
    }

    #[tokio::test]
    async fn test_schema1_v1_compatibility() {
        let manifest = json!({
            "schemaVersion": 1,
            "name": "app",
            "tag": "old",
            "history": [
                {"v1Compatibility": "{\"created\":\"2019-05-05T05:05:05.123Z\"}"}
            ]
        });
        let registry = FakeRegistry::new().with_manifest("app", "old", manifest);

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "old")
            .await
            .unwrap();
        assert_eq!(resolved.source, DateSource::V1Compatibility);
        assert_eq!(resolved.created, ts("2019-05-05T05:05:05.123Z"));
    }

    #[tokio::test]
    async fn test_history_entry_itself() {
        let manifest = json!({"history": ["{\"created\":\"2018-08-08T00:00:00Z\"}"]});
        let registry = FakeRegistry::new().with_manifest("app", "older", manifest);

        let resolved = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "older")
            .await
            .unwrap();
        assert_eq!(resolved.source, DateSource::History);
    }

    #[tokio::test]
    async fn test_nothing_found_is_date_not_found() {
        let registry = FakeRegistry::new().with_manifest("app", "v1", json!({"schemaVersion": 2}));

        let err = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::DateNotFound { .. }));
    }

    #[tokio::test]
    async fn test_unparseable_date_is_distinct_failure() {
        let registry = FakeRegistry::new()
            .with_manifest("app", "v1", image_manifest("sha256:cfg"))
            .with_blob("app", "sha256:cfg", json!({"created": "last tuesday"}));

        let err = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "v1")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::InvalidTimestamp { .. }));
        assert!(err.is_date_resolution_failure());
    }

    #[tokio::test]
    async fn test_missing_manifest_propagates_transport_error() {
        let err = resolver(FakeRegistry::new(), ManifestListStrategy::First)
            .resolve_creation_date("app", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::NotFound { .. }));
    }

    fn multi_arch_registry() -> FakeRegistry {
        FakeRegistry::new()
            .with_manifest(
                "app",
                "multi",
                index(&[
                    ("sha256:amd", "linux", "amd64"),
                    ("sha256:arm", "linux", "arm64"),
                ]),
            )
            .with_manifest("app", "sha256:amd", image_manifest("sha256:cfg-amd"))
            .with_manifest("app", "sha256:arm", image_manifest("sha256:cfg-arm"))
            .with_blob("app", "sha256:cfg-amd", json!({"created": "2023-01-01T00:00:00Z"}))
            .with_blob("app", "sha256:cfg-arm", json!({"created": "2023-02-01T00:00:00Z"}))
    }

    #[tokio::test]
    async fn test_index_first_strategy() {
        let resolved = resolver(multi_arch_registry(), ManifestListStrategy::First)
            .resolve_creation_date("app", "multi")
            .await
            .unwrap();
        assert_eq!(resolved.created, ts("2023-01-01T00:00:00Z"));
        assert_eq!(resolved.reference, "sha256:amd");
    }

    #[tokio::test]
    async fn test_index_newest_strategy() {
        let resolved = resolver(multi_arch_registry(), ManifestListStrategy::Newest)
            .resolve_creation_date("app", "multi")
            .await
            .unwrap();
        assert_eq!(resolved.created, ts("2023-02-01T00:00:00Z"));
        assert_eq!(resolved.reference, "sha256:arm");
    }

    #[tokio::test]
    async fn test_index_platform_strategy() {
        let spec: PlatformSpec = "linux/arm64".parse().unwrap();
        let resolved = resolver(multi_arch_registry(), ManifestListStrategy::Platform(spec))
            .resolve_creation_date("app", "multi")
            .await
            .unwrap();
        assert_eq!(resolved.reference, "sha256:arm");

        let spec: PlatformSpec = "windows/amd64".parse().unwrap();
        let err = resolver(multi_arch_registry(), ManifestListStrategy::Platform(spec))
            .resolve_creation_date("app", "multi")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::ManifestList(_)));
    }

    #[tokio::test]
    async fn test_newest_fails_when_any_entry_is_unresolvable() {
        let registry = FakeRegistry::new()
            .with_manifest(
                "app",
                "multi",
                index(&[
                    ("sha256:broken", "linux", "amd64"),
                    ("sha256:arm", "linux", "arm64"),
                ]),
            )
            .with_manifest("app", "sha256:arm", image_manifest("sha256:cfg-arm"))
            .with_blob("app", "sha256:cfg-arm", json!({"created": "2023-02-01T00:00:00Z"}));

        let err = resolver(registry, ManifestListStrategy::Newest)
            .resolve_creation_date("app", "multi")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_newest_rejects_index_with_invalid_platform_date() {
        let registry = FakeRegistry::new()
            .with_manifest(
                "app",
                "multi",
                index(&[
                    ("sha256:amd", "linux", "amd64"),
                    ("sha256:arm", "linux", "arm64"),
                ]),
            )
            .with_manifest("app", "sha256:amd", image_manifest("sha256:cfg-amd"))
            .with_blob("app", "sha256:cfg-amd", json!({"created": "2020-01-01T00:00:00Z"}))
            .with_manifest("app", "sha256:arm", image_manifest("sha256:cfg-arm"))
            .with_blob("app", "sha256:cfg-arm", json!({"created": "not-a-date"}));

        let err = resolver(registry, ManifestListStrategy::Newest)
            .resolve_creation_date("app", "multi")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::InvalidTimestamp { .. }));
    }

    #[tokio::test]
    async fn test_empty_index_is_manifest_list_error() {
        let registry = FakeRegistry::new().with_manifest(
            "app",
            "empty",
            json!({"mediaType": "application/vnd.oci.image.index.v1+json", "manifests": []}),
        );
        let err = resolver(registry, ManifestListStrategy::First)
            .resolve_creation_date("app", "empty")
            .await
            .unwrap_err();
        assert!(matches!(err, PurgeError::ManifestList(_)));
    }
}
