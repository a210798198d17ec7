// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 ACM S.L.

//! Raw file primitives against one repository and branch.
//!
//! [`ContentHost`] is the seam between the store client and the hosting
//! backend: [`GithubHost`] talks to the GitHub contents API, [`MemoryHost`]
//! keeps everything in a process-local map for tests and offline runs. Both
//! enforce the same contract: reads return an opaque version token, writes to
//! existing paths require the current token.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use base64ct::{Base64, Encoding};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tracing::debug;

use super::error::{StoreError, StoreResult};
use crate::config;

const USER_AGENT: &str = concat!("licdata-server/", env!("CARGO_PKG_VERSION"));
const HTTP_TIMEOUT: Duration = Duration::from_secs(15);

/// Opaque version token returned on every read and demanded on every write.
///
/// For the GitHub backend this is the file's blob SHA. It is held only for
/// the duration of one logical operation, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionToken(String);

impl VersionToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for VersionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Read/create/update/delete-file primitives for one repository+branch.
///
/// Every mutation produces a commit on the backing branch; the commit log is
/// the implicit audit trail.
pub trait ContentHost: Send + Sync {
    /// Read a file. Fails with [`StoreError::NotFound`] when absent.
    fn get_raw(
        &self,
        path: &str,
    ) -> impl std::future::Future<Output = StoreResult<(Vec<u8>, VersionToken)>> + Send;

    /// Create a file. Fails with [`StoreError::AlreadyExists`] when the path
    /// is already populated.
    fn create_raw(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> impl std::future::Future<Output = StoreResult<VersionToken>> + Send;

    /// Overwrite a file under its current version token. Fails with
    /// [`StoreError::VersionConflict`] when the stored version moved on.
    fn update_raw(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: &VersionToken,
    ) -> impl std::future::Future<Output = StoreResult<VersionToken>> + Send;

    /// Remove a file under its current version token.
    fn delete_raw(
        &self,
        path: &str,
        message: &str,
        expected: &VersionToken,
    ) -> impl std::future::Future<Output = StoreResult<()>> + Send;
}

// ============================================================================
// GitHub backend
// ============================================================================

/// GitHub contents API backend.
///
/// Holds the repository identity, branch, and auth token resolved once at
/// worker start; effectively read-only afterwards.
#[derive(Debug, Clone)]
pub struct GithubHost {
    api_base_url: String,
    repository: String,
    branch: String,
    token: String,
    http: Client,
}

impl GithubHost {
    pub fn new(
        api_base_url: impl Into<String>,
        repository: impl Into<String>,
        branch: impl Into<String>,
        token: impl Into<String>,
    ) -> StoreResult<Self> {
        let http = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            api_base_url: api_base_url.into(),
            repository: repository.into(),
            branch: branch.into(),
            token: token.into(),
            http,
        })
    }

    /// Build a host from the process environment.
    ///
    /// Requires `GITHUB_TOKEN` and `GITHUB_REPO` (`owner/name`);
    /// `GITHUB_BRANCH` defaults to `main` and `GITHUB_API_URL` overrides the
    /// public endpoint.
    pub fn from_env() -> StoreResult<Self> {
        let api_base_url = env_or_default(config::GITHUB_API_URL_ENV, config::DEFAULT_API_URL);
        let repository = env_required(config::GITHUB_REPO_ENV)?;
        let branch = env_or_default(config::GITHUB_BRANCH_ENV, config::DEFAULT_BRANCH);
        let token = env_required(config::GITHUB_TOKEN_ENV)?;
        Self::new(api_base_url, repository, branch, token)
    }

    pub fn branch(&self) -> &str {
        &self.branch
    }

    fn contents_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/contents/{}",
            self.api_base_url.trim_end_matches('/'),
            self.repository,
            path
        )
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.contents_url(path))
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Accept", "application/vnd.github+json")
    }

    /// PUT against the contents endpoint; `sha` distinguishes update from
    /// create on the wire.
    async fn put(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&VersionToken>,
    ) -> StoreResult<reqwest::Response> {
        let mut body = json!({
            "message": message,
            "content": Base64::encode_string(content),
            "branch": self.branch,
        });
        if let Some(sha) = sha {
            body["sha"] = Value::String(sha.as_str().to_string());
        }

        self.request(reqwest::Method::PUT, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("PUT {path} failed: {e}")))
    }
}

impl ContentHost for GithubHost {
    async fn get_raw(&self, path: &str) -> StoreResult<(Vec<u8>, VersionToken)> {
        let response = self
            .request(reqwest::Method::GET, path)
            .query(&[("ref", self.branch.as_str())])
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("GET {path} failed: {e}")))?;

        if response.status() == StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(path.to_string()));
        }
        let response = require_success(response, "GET", path).await?;

        let file: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("GET {path} invalid JSON: {e}")))?;

        let sha = extract_sha(&file, path)?;
        let encoded = file
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| StoreError::Transport(format!("GET {path}: no content field")))?;
        // GitHub wraps base64 content at 60 columns.
        let compact: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let content = Base64::decode_vec(&compact)
            .map_err(|e| StoreError::Transport(format!("GET {path}: invalid base64: {e}")))?;

        Ok((content, VersionToken::new(sha)))
    }

    async fn create_raw(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
    ) -> StoreResult<VersionToken> {
        let response = self.put(path, content, message, None).await?;

        // A PUT without a sha against an existing path is the duplicate case.
        if response.status() == StatusCode::UNPROCESSABLE_ENTITY {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        let response = require_success(response, "PUT", path).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("PUT {path} invalid JSON: {e}")))?;
        Ok(VersionToken::new(extract_content_sha(&body, path)?))
    }

    async fn update_raw(
        &self,
        path: &str,
        content: &[u8],
        message: &str,
        expected: &VersionToken,
    ) -> StoreResult<VersionToken> {
        let response = self.put(path, content, message, Some(expected)).await?;

        match response.status() {
            StatusCode::CONFLICT => {
                return Err(StoreError::VersionConflict {
                    path: path.to_string(),
                    expected: expected.as_str().to_string(),
                })
            }
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(path.to_string())),
            _ => {}
        }
        let response = require_success(response, "PUT", path).await?;

        let body: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("PUT {path} invalid JSON: {e}")))?;
        Ok(VersionToken::new(extract_content_sha(&body, path)?))
    }

    async fn delete_raw(
        &self,
        path: &str,
        message: &str,
        expected: &VersionToken,
    ) -> StoreResult<()> {
        let body = json!({
            "message": message,
            "sha": expected.as_str(),
            "branch": self.branch,
        });

        let response = self
            .request(reqwest::Method::DELETE, path)
            .json(&body)
            .send()
            .await
            .map_err(|e| StoreError::Transport(format!("DELETE {path} failed: {e}")))?;

        match response.status() {
            StatusCode::NOT_FOUND => return Err(StoreError::NotFound(path.to_string())),
            StatusCode::CONFLICT => {
                return Err(StoreError::VersionConflict {
                    path: path.to_string(),
                    expected: expected.as_str().to_string(),
                })
            }
            _ => {}
        }
        require_success(response, "DELETE", path).await?;
        Ok(())
    }
}

async fn require_success(
    response: reqwest::Response,
    method: &str,
    path: &str,
) -> StoreResult<reqwest::Response> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    debug!(%status, method, path, body, "store request rejected");
    Err(StoreError::Transport(format!(
        "{method} {path} returned {status}"
    )))
}

fn extract_sha(file: &Value, path: &str) -> StoreResult<String> {
    file.get("sha")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Transport(format!("{path}: response has no sha")))
}

fn extract_content_sha(body: &Value, path: &str) -> StoreResult<String> {
    body.pointer("/content/sha")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| StoreError::Transport(format!("{path}: write response has no content sha")))
}

fn env_required(name: &str) -> StoreResult<String> {
    env_optional(name)
        .ok_or_else(|| StoreError::Transport(format!("{name} environment variable not set")))
}

fn env_optional(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_or_default(name: &str, default: &str) -> String {
    env_optional(name).unwrap_or_else(|| default.to_string())
}

// ============================================================================
// In-memory backend
// ============================================================================

/// Process-local backend with the same concurrency contract as the remote
/// one, used throughout the test suites. Version tokens are a per-path
/// write counter, checked on every update and delete.
#[derive(Default)]
pub struct MemoryHost {
    files: Mutex<HashMap<String, (Vec<u8>, u64)>>,
}

impl MemoryHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// Paths currently present, for test assertions.
    pub fn paths(&self) -> Vec<String> {
        let files = self.files.lock().expect("memory host lock poisoned");
        let mut paths: Vec<String> = files.keys().cloned().collect();
        paths.sort();
        paths
    }

    pub fn contains(&self, path: &str) -> bool {
        self.files
            .lock()
            .expect("memory host lock poisoned")
            .contains_key(path)
    }

    fn token(counter: u64) -> VersionToken {
        VersionToken::new(format!("mem-{counter}"))
    }
}

impl ContentHost for MemoryHost {
    async fn get_raw(&self, path: &str) -> StoreResult<(Vec<u8>, VersionToken)> {
        let files = self.files.lock().expect("memory host lock poisoned");
        match files.get(path) {
            Some((content, counter)) => Ok((content.clone(), Self::token(*counter))),
            None => Err(StoreError::NotFound(path.to_string())),
        }
    }

    async fn create_raw(
        &self,
        path: &str,
        content: &[u8],
        _message: &str,
    ) -> StoreResult<VersionToken> {
        let mut files = self.files.lock().expect("memory host lock poisoned");
        if files.contains_key(path) {
            return Err(StoreError::AlreadyExists(path.to_string()));
        }
        files.insert(path.to_string(), (content.to_vec(), 0));
        Ok(Self::token(0))
    }

    async fn update_raw(
        &self,
        path: &str,
        content: &[u8],
        _message: &str,
        expected: &VersionToken,
    ) -> StoreResult<VersionToken> {
        let mut files = self.files.lock().expect("memory host lock poisoned");
        let Some((stored, counter)) = files.get_mut(path) else {
            return Err(StoreError::NotFound(path.to_string()));
        };
        if &Self::token(*counter) != expected {
            return Err(StoreError::VersionConflict {
                path: path.to_string(),
                expected: expected.as_str().to_string(),
            });
        }
        *stored = content.to_vec();
        *counter += 1;
        Ok(Self::token(*counter))
    }

    async fn delete_raw(
        &self,
        path: &str,
        _message: &str,
        expected: &VersionToken,
    ) -> StoreResult<()> {
        let mut files = self.files.lock().expect("memory host lock poisoned");
        match files.get(path) {
            None => return Err(StoreError::NotFound(path.to_string())),
            Some((_, counter)) if &Self::token(*counter) != expected => {
                return Err(StoreError::VersionConflict {
                    path: path.to_string(),
                    expected: expected.as_str().to_string(),
                });
            }
            Some(_) => {}
        }
        files.remove(path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn memory_host_round_trips_content() {
        let host = MemoryHost::new();
        let token = host
            .create_raw("clients/data.json", b"[]", "init")
            .await
            .unwrap();

        let (content, read_token) = host.get_raw("clients/data.json").await.unwrap();
        assert_eq!(content, b"[]");
        assert_eq!(read_token, token);
    }

    #[tokio::test]
    async fn memory_host_rejects_duplicate_create() {
        let host = MemoryHost::new();
        host.create_raw("a.json", b"1", "init").await.unwrap();

        let result = host.create_raw("a.json", b"2", "again").await;
        assert!(matches!(result, Err(StoreError::AlreadyExists(_))));
    }

    #[tokio::test]
    async fn memory_host_update_rotates_the_token() {
        let host = MemoryHost::new();
        let first = host.create_raw("a.json", b"1", "init").await.unwrap();
        let second = host.update_raw("a.json", b"2", "bump", &first).await.unwrap();
        assert_ne!(first, second);

        let (content, token) = host.get_raw("a.json").await.unwrap();
        assert_eq!(content, b"2");
        assert_eq!(token, second);
    }

    #[tokio::test]
    async fn memory_host_detects_stale_tokens() {
        let host = MemoryHost::new();
        let stale = host.create_raw("a.json", b"1", "init").await.unwrap();
        host.update_raw("a.json", b"2", "bump", &stale).await.unwrap();

        // Second writer still holds the original token.
        let result = host.update_raw("a.json", b"3", "late", &stale).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));

        let result = host.delete_raw("a.json", "late delete", &stale).await;
        assert!(matches!(result, Err(StoreError::VersionConflict { .. })));
    }

    #[tokio::test]
    async fn memory_host_delete_removes_the_path() {
        let host = MemoryHost::new();
        let token = host.create_raw("a.json", b"1", "init").await.unwrap();
        host.delete_raw("a.json", "drop", &token).await.unwrap();

        assert!(matches!(
            host.get_raw("a.json").await,
            Err(StoreError::NotFound(_))
        ));
        assert!(matches!(
            host.delete_raw("a.json", "again", &token).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn github_contents_url_is_well_formed() {
        let host = GithubHost::new(
            "https://api.github.com/",
            "acme/licenses",
            "main",
            "token",
        )
        .unwrap();
        assert_eq!(
            host.contents_url("clients/data.json"),
            "https://api.github.com/repos/acme/licenses/contents/clients/data.json"
        );
        assert_eq!(host.branch(), "main");
    }
}
