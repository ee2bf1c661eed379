//! Registry HTTP API client.
//!
//! Speaks the Docker Registry v2 / OCI distribution API directly over
//! `reqwest`: catalog, tag list, manifests, config blobs and manifest
//! deletion. Redirects are followed so registries that serve blobs from
//! object storage work.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use oci_purge_core::error::{PurgeError, Result};
use oci_purge_core::manifest::{Manifest, ACCEPTED_MANIFEST_TYPES};
use oci_purge_core::PurgeConfig;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION};
use reqwest::{Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Response header carrying the manifest digest.
pub const DOCKER_CONTENT_DIGEST: &str = "docker-content-digest";

/// Maximum redirect hops for a single request.
const MAX_REDIRECTS: usize = 10;

/// Read-and-delete view of a registry, as needed by a cleanup run.
#[async_trait]
pub trait Registry: Send + Sync {
    /// All repository names in the catalog (single, unpaginated request).
    async fn list_repositories(&self) -> Result<Vec<String>>;

    /// All tag names of a repository (single, unpaginated request).
    async fn list_tags(&self, repository: &str) -> Result<Vec<String>>;

    /// Manifest for a tag or digest.
    async fn get_manifest(&self, repository: &str, reference: &str) -> Result<Manifest>;

    /// Image config blob, parsed as JSON.
    async fn get_config_blob(&self, repository: &str, digest: &str) -> Result<serde_json::Value>;

    /// Current digest of a tag, from the `Docker-Content-Digest` header.
    async fn get_manifest_digest(&self, repository: &str, tag: &str) -> Result<String>;

    /// Delete a manifest by digest.
    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()>;
}

/// Authentication credentials for a container registry.
#[derive(Clone)]
pub struct RegistryAuth {
    username: String,
    password: String,
}

impl RegistryAuth {
    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }

    /// `Authorization` header value: `Basic base64(username:password)`.
    pub fn header_value(&self) -> String {
        let credentials = format!("{}:{}", self.username, self.password);
        format!("Basic {}", BASE64.encode(credentials))
    }
}

impl std::fmt::Debug for RegistryAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    #[serde(default)]
    repositories: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct TagListResponse {
    #[serde(default)]
    tags: Option<Vec<String>>,
}

/// Authenticated HTTP client bound to one registry.
pub struct RegistryClient {
    http: reqwest::Client,
    base_url: String,
    auth: RegistryAuth,
    accept: String,
    dry_run: bool,
}

impl RegistryClient {
    /// Create a client for the registry described by `config`.
    pub fn new(config: &PurgeConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(concat!("oci-purge/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PurgeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http,
            base_url: config.registry_url.clone(),
            auth: RegistryAuth::basic(config.username.clone(), config.password()),
            accept: ACCEPTED_MANIFEST_TYPES.join(", "),
            dry_run: config.dry_run,
        })
    }

    /// Base URL requests are made against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v2/{}", self.base_url, path)
    }

    /// Send a request with auth and `Accept` headers, mapping non-2xx
    /// statuses to errors.
    pub async fn authenticated_call(&self, method: Method, url: &str) -> Result<Response> {
        tracing::trace!(method = %method, url = %url, "Registry request");

        let response = self
            .http
            .request(method, url)
            .header(AUTHORIZATION, self.auth.header_value())
            .header(ACCEPT, &self.accept)
            .send()
            .await
            .map_err(|e| PurgeError::Network {
                url: url.to_string(),
                message: e.to_string(),
            })?;

        check_status(url, response.status())?;
        Ok(response)
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.authenticated_call(Method::GET, url).await?;
        let body = response.bytes().await.map_err(|e| PurgeError::Network {
            url: url.to_string(),
            message: format!("Failed to read response body: {}", e),
        })?;
        serde_json::from_slice(&body).map_err(|e| {
            PurgeError::Serialization(format!("Invalid JSON from {}: {}", url, e))
        })
    }
}

#[async_trait]
impl Registry for RegistryClient {
    async fn list_repositories(&self) -> Result<Vec<String>> {
        let url = self.url("_catalog");
        let catalog: CatalogResponse = self.get_json(&url).await?;
        let repositories = catalog.repositories.unwrap_or_default();
        tracing::debug!(count = repositories.len(), "Listed catalog");
        Ok(repositories)
    }

    async fn list_tags(&self, repository: &str) -> Result<Vec<String>> {
        let url = self.url(&format!("{}/tags/list", repository));
        let list: TagListResponse = self.get_json(&url).await?;
        Ok(list.tags.unwrap_or_default())
    }

    async fn get_manifest(&self, repository: &str, reference: &str) -> Result<Manifest> {
        let url = self.url(&format!("{}/manifests/{}", repository, reference));
        self.get_json(&url).await
    }

    async fn get_config_blob(&self, repository: &str, digest: &str) -> Result<serde_json::Value> {
        let url = self.url(&format!("{}/blobs/{}", repository, digest));
        self.get_json(&url).await
    }

    async fn get_manifest_digest(&self, repository: &str, tag: &str) -> Result<String> {
        let url = self.url(&format!("{}/manifests/{}", repository, tag));

        // Some registries omit the digest header on HEAD or reject HEAD
        // outright; GET always carries it.
        match self.authenticated_call(Method::HEAD, &url).await {
            Ok(response) => {
                if let Some(digest) = digest_header(response.headers()) {
                    return Ok(digest);
                }
            }
            Err(PurgeError::HttpStatus { status, .. }) => {
                tracing::debug!(url = %url, status, "HEAD rejected, retrying with GET");
            }
            Err(e) => return Err(e),
        }

        let response = self.authenticated_call(Method::GET, &url).await?;
        digest_header(response.headers()).ok_or_else(|| PurgeError::DigestMissing {
            repository: repository.to_string(),
            reference: tag.to_string(),
        })
    }

    async fn delete_manifest(&self, repository: &str, digest: &str) -> Result<()> {
        if self.dry_run {
            tracing::info!(
                repository = %repository,
                digest = %digest,
                dry_run = true,
                "Would delete manifest"
            );
            return Ok(());
        }

        let url = self.url(&format!("{}/manifests/{}", repository, digest));
        self.authenticated_call(Method::DELETE, &url).await?;
        tracing::debug!(repository = %repository, digest = %digest, "Manifest deleted");
        Ok(())
    }
}

/// Map an HTTP status to the transport error taxonomy.
fn check_status(url: &str, status: StatusCode) -> Result<()> {
    if status.is_success() {
        return Ok(());
    }
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(PurgeError::Unauthorized {
            url: url.to_string(),
        }),
        StatusCode::NOT_FOUND => Err(PurgeError::NotFound {
            url: url.to_string(),
        }),
        other => Err(PurgeError::HttpStatus {
            url: url.to_string(),
            status: other.as_u16(),
        }),
    }
}

/// Extract `Docker-Content-Digest` (header names are case-insensitive).
fn digest_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(DOCKER_CONTENT_DIGEST)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
