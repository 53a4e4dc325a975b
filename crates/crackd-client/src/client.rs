//! HTTP client for a single crackd node.

use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crackd_core::protocol::{
    Ack, ActionRequest, ApiReply, CrackedBody, CreateSessionRequest, NodeInfoBody,
    SessionDetailsBody, UploadRequest,
};
use crackd_core::{CrackType, CrackedHash, CrackdError, Result, SessionAction};

use crate::lock::{ResourceLockManager, HASHFILE_LOCK};

/// Client for the node control API. Sends Basic Auth on every request and
/// never retries; `action` is idempotent when the target state is already
/// reached, so callers own the retry policy.
pub struct NodeClient {
    base_url: String,
    username: String,
    password: String,
    http: reqwest::Client,
}

impl NodeClient {
    /// Client for `https://{host}:{port}`. TLS is expected to be terminated
    /// by whatever sits in front of the node.
    pub fn new(
        host: &str,
        port: u16,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        Self::from_base_url(format!("https://{}:{}", host, port), username, password)
    }

    /// Client for an explicit base URL, scheme included.
    pub fn from_base_url(
        base_url: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|err| CrackdError::transport(err.to_string()))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            username: username.into(),
            password: password.into(),
            http,
        })
    }

    /// Accepts self-signed certificates on nodes fronted by ad-hoc TLS.
    pub fn accept_invalid_certs(mut self) -> Result<Self> {
        self.http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|err| CrackdError::transport(err.to_string()))?;
        Ok(self)
    }

    pub async fn node_info(&self) -> Result<NodeInfoBody> {
        self.get("/hashcatInfo").await
    }

    pub async fn session_info(&self, name: &str) -> Result<SessionDetailsBody> {
        self.get(&format!("/sessionInfo/{}", name)).await
    }

    pub async fn cracked(&self, name: &str) -> Result<Vec<CrackedHash>> {
        let body: CrackedBody = self.get(&format!("/cracked/{}", name)).await?;
        Ok(body.cracked)
    }

    /// Creates a dictionary session from a local hash file. The file is
    /// read under the hash-file lock and the lock is dropped before the
    /// network round-trip.
    pub async fn create_dictionary_session(
        &self,
        locks: &ResourceLockManager,
        name: &str,
        hash_file: &Path,
        hash_mode_id: u32,
        wordlist: &str,
        rule: &str,
        username_included: bool,
    ) -> Result<()> {
        let hashes = read_hash_file(locks, hash_file).await?;
        self.create_session(CreateSessionRequest {
            name: name.to_string(),
            crack_type: CrackType::Dictionary,
            hashes,
            hash_mode_id,
            wordlist: Some(wordlist.to_string()),
            rule: Some(rule.to_string()),
            mask: None,
            username_included,
        })
        .await
    }

    /// Creates a mask session from a local hash file, same locking contract
    /// as [`Self::create_dictionary_session`].
    pub async fn create_mask_session(
        &self,
        locks: &ResourceLockManager,
        name: &str,
        hash_file: &Path,
        hash_mode_id: u32,
        mask: &str,
        username_included: bool,
    ) -> Result<()> {
        let hashes = read_hash_file(locks, hash_file).await?;
        self.create_session(CreateSessionRequest {
            name: name.to_string(),
            crack_type: CrackType::Mask,
            hashes,
            hash_mode_id,
            wordlist: None,
            rule: None,
            mask: Some(mask.to_string()),
            username_included,
        })
        .await
    }

    pub async fn action(&self, session: &str, action: SessionAction) -> Result<()> {
        let request = ActionRequest {
            session: session.to_string(),
            action: action.to_string(),
        };
        let Ack {} = self.post("/action", &request).await?;
        Ok(())
    }

    pub async fn remove_session(&self, name: &str) -> Result<()> {
        let Ack {} = self.get(&format!("/removeSession/{}", name)).await?;
        Ok(())
    }

    pub async fn upload_rule(&self, name: &str, content: &[u8]) -> Result<()> {
        self.upload("/uploadRule", name, content).await
    }

    pub async fn upload_mask(&self, name: &str, content: &[u8]) -> Result<()> {
        self.upload("/uploadMask", name, content).await
    }

    pub async fn upload_wordlist(&self, name: &str, content: &[u8]) -> Result<()> {
        self.upload("/uploadWordlist", name, content).await
    }

    async fn create_session(&self, request: CreateSessionRequest) -> Result<()> {
        debug!(session = %request.name, crack_type = ?request.crack_type, "creating session");
        let Ack {} = self.post("/createSession", &request).await?;
        Ok(())
    }

    async fn upload(&self, path: &str, name: &str, content: &[u8]) -> Result<()> {
        let request = UploadRequest {
            name: name.to_string(),
            content: BASE64_STANDARD.encode(content),
        };
        let Ack {} = self.post(path, &request).await?;
        Ok(())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self
            .http
            .get(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .send()
            .await
            .map_err(|err| CrackdError::transport(err.to_string()))?;
        parse_reply(response).await
    }

    async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let response = self
            .http
            .post(format!("{}{}", self.base_url, path))
            .basic_auth(&self.username, Some(&self.password))
            .json(body)
            .send()
            .await
            .map_err(|err| CrackdError::transport(err.to_string()))?;
        parse_reply(response).await
    }
}

/// Reads the hash-list text under the hash-file lock; the guard is gone by
/// the time this returns.
async fn read_hash_file(locks: &ResourceLockManager, hash_file: &Path) -> Result<String> {
    let key = hash_file.display().to_string();
    let guard = locks.acquire(&key, HASHFILE_LOCK).await?;
    let hashes = tokio::fs::read_to_string(hash_file).await?;
    drop(guard);
    Ok(hashes)
}

/// Unwraps the node's response envelope. Business failures arrive as HTTP
/// 200 with `"response":"error"`; anything non-2xx is a transport failure
/// (the node only answers non-200 on authentication).
async fn parse_reply<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
    let status = response.status();
    if !status.is_success() {
        return Err(CrackdError::transport(format!(
            "node answered {}",
            status
        )));
    }
    let bytes = response
        .bytes()
        .await
        .map_err(|err| CrackdError::transport(err.to_string()))?;
    ApiReply::from_json(&bytes)?.into_result()
}
