//! In-memory registry used by unit tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;
use oci_purge_core::error::{PurgeError, Result};
use oci_purge_core::manifest::Manifest;

use crate::oci::Registry;

#[derive(Default)]
pub(crate) struct FakeRegistry {
    repositories: Vec<String>,
    tags: HashMap<String, Vec<String>>,
    manifests: HashMap<(String, String), serde_json::Value>,
    blobs: HashMap<(String, String), serde_json::Value>,
    digests: HashMap<(String, String), String>,
    catalog_fails: bool,
    failing_tag_lists: HashSet<String>,
    failing_deletes: HashSet<String>,
    deleted: Mutex<Vec<(String, String)>>,
}

impl FakeRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_repository(mut self, name: &str, tags: &[&str]) -> Self {
        self.repositories.push(name.to_string());
        self.tags
            .insert(name.to_string(), tags.iter().map(|t| t.to_string()).collect());
        self
    }

    pub(crate) fn with_manifest(
        mut self,
        repository: &str,
        reference: &str,
        manifest: serde_json::Value,
    ) -> Self {
        self.manifests
            .insert((repository.to_string(), reference.to_string()), manifest);
        self
    }

    pub(crate) fn with_blob(mut self, repository: &str, digest: &str, blob: serde_json::Value) -> Self {
        self.blobs
            .insert((repository.to_string(), digest.to_string()), blob);
        self
    }

    pub(crate) fn with_digest(mut self, repository: &str, tag: &str, digest: &str) -> Self {
        self.digests
            .insert((repository.to_string(), tag.to_string()), digest.to_string());
        self
    }

    /// Image tag with a config blob carrying `created` and a resolvable digest.
    pub(crate) fn with_image(self, repository: &str, tag: &str, created: &str) -> Self {
        let config_digest = format!("sha256:cfg-{}-{}", repository.replace('/', "-"), tag);
        let digest = format!("sha256:{}-{}", repository.replace('/', "-"), tag);
        self.with_manifest(
            repository,
            tag,
            serde_json::json!({
                "schemaVersion": 2,
                "mediaType": "application/vnd.docker.distribution.manifest.v2+json",
                "config": {"digest": config_digest}
            }),
        )
        .with_blob(
            repository,
            &config_digest,
            serde_json::json!({"created": created}),
        )
        .with_digest(repository, tag, &digest)
    }

    pub(crate) fn failing_catalog(mut self) -> Self {
        self.catalog_fails = true;
        self
    }

    pub(crate) fn failing_tag_list(mut self, repository: &str) -> Self {
        self.failing_tag_lists.insert(repository.to_string());
        self
    }

    pub(crate) fn failing_delete(mut self, digest: &str) -> Self {
        self.failing_deletes.insert(digest.to_string());
        self
    }

    /// `(repository, digest)` pairs that received a DELETE.
    pub(crate) fn deleted(&self) -> Vec<(String, String)> {
        let mut deleted = self.deleted.lock().unwrap().clone();
        deleted.sort();
        deleted
    }
}

fn not_found(path: String) -> PurgeError {
    PurgeError::NotFound {
        url: format!("fake://registry/v2/{}", path),
    }
}

#[async_trait]
impl Registry for FakeRegistry {
    async fn list_repositories(&self) -> Result<Vec<String>> {
        if self.catalog_fails {
            return Err(PurgeError::HttpStatus {
                url: "fake://registry/v2/_catalog".to_string(),
                status: 503,
            });
        }
        Ok(self.repositories.clone())
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        if self.failing_tag_lists.contains(repository) {
            return Err(PurgeError::Network {
                url: format!("fake://registry/v2/{}/tags/list", repository),
                message: "connection reset".to_string(),
            });
        }
        self.tags
            .get(repository)
            .cloned()
            .ok_or_else(|| not_found(format!("{}/tags/list", repository)))
    }

    async fn get_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        let value = self
            .manifests
            .get(&(repository.to_string(), reference.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("{}/manifests/{}", repository, reference)))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn get_config_blob(&self, repository: &str, digest: &str) -> Result<serde_json::Value> {
        self.blobs
            .get(&(repository.to_string(), digest.to_string()))
            .cloned()
            .ok_or_else(|| not_found(format!("{}/blobs/{}", repository, digest)))
    }

    async fn get_manifest_digest(&self, repository: &str, tag: &str) -> Result<String> {
        let key = (repository.to_string(), tag.to_string());
        if !self.manifests.contains_key(&key) {
            return Err(not_found(format!("{}/manifests/{}", repository, tag)));
        }
        self.digests
            .get(&key)
            .cloned()
            .ok_or_else(|| PurgeError::DigestMissing {
                repository: repository.to_string(),
                reference: tag.to_string(),
            })
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()> {
        if self.failing_deletes.contains(digest) {
            return Err(PurgeError::HttpStatus {
                url: format!("fake://registry/v2/{}/manifests/{}", repository, digest),
                status: 405,
            });
        }
        self.deleted
            .lock()
            .unwrap()
            .push((repository.to_string(), digest.to_string()));
        Ok(())
    }
}
