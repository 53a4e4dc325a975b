//! JSON wire contract between the controller and the node API.
//!
//! Every response body is an envelope: `{"response": "ok", ...}` on
//! success or `{"response": "error", "message": ...}` on failure. Business
//! failures never use HTTP status codes; only transport and authentication
//! failures surface below this envelope.

use serde::{de::DeserializeOwned, Deserialize, Serialize};

use crate::error::{CrackdError, Result};
use crate::session::{CrackType, CrackedHash, HashMode, SessionStatus};
use crate::stats::CrackedStats;

/// The uniform response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "response", rename_all = "lowercase")]
pub enum ApiReply<T> {
    Ok {
        #[serde(flatten)]
        body: T,
    },
    Error {
        message: String,
    },
}

impl<T> ApiReply<T> {
    pub fn ok(body: T) -> Self {
        Self::Ok { body }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Unwraps the envelope, mapping an error reply to [`CrackdError::Remote`].
    pub fn into_result(self) -> Result<T> {
        match self {
            Self::Ok { body } => Ok(body),
            Self::Error { message } => Err(CrackdError::Remote(message)),
        }
    }
}

impl<T: DeserializeOwned> ApiReply<T> {
    /// Parses a raw response body into the envelope.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(data)?)
    }
}

/// Body of a bare `{"response": "ok"}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ack {}

/// One row of the node-info session summary list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub name: String,
    pub status: SessionStatus,
    pub crack_type: CrackType,
    /// `current_cracked * 100 / total_hashes`.
    pub cracked: f64,
    /// Engine-reported keyspace progress in percent.
    pub progress: f64,
}

/// Body of `GET /hashcatInfo`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeInfoBody {
    pub version: String,
    pub hash_types: Vec<HashMode>,
    pub rules: Vec<String>,
    pub masks: Vec<String>,
    pub wordlists: Vec<String>,
    pub sessions: Vec<SessionSummary>,
}

/// Body of `GET /sessionInfo/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionDetailsBody {
    pub name: String,
    pub crack_type: CrackType,
    pub status: SessionStatus,
    /// RFC 3339 timestamp of the first `start`, if any.
    pub time_started: Option<String>,
    /// Estimated completion time; only meaningful for mask attacks with a
    /// known keyspace, omitted for dictionary sessions.
    pub eta: Option<String>,
    pub speed: String,
    /// Engine-reported recovered count.
    pub recovered: u64,
    pub progress: f64,
    /// Full cracked-results set retrieved so far.
    pub results: Vec<CrackedHash>,
    #[serde(flatten)]
    pub stats: CrackedStats,
}

/// Body of `GET /cracked/{name}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CrackedBody {
    pub cracked: Vec<CrackedHash>,
}

/// Request body of `POST /createSession`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateSessionRequest {
    pub name: String,
    pub crack_type: CrackType,
    /// Raw hash-list text; one `hash` or `username:hash` per line.
    pub hashes: String,
    pub hash_mode_id: u32,
    #[serde(default)]
    pub wordlist: Option<String>,
    #[serde(default)]
    pub rule: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    pub username_included: bool,
}

/// Request body of `POST /action`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub session: String,
    /// Action name; parsed with [`crate::session::SessionAction::parse`].
    pub action: String,
}

/// Request body of the three upload endpoints.
///
/// `content` is base64-encoded; the legacy per-kind field names are
/// accepted on input for wire compatibility with older controllers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadRequest {
    pub name: String,
    #[serde(alias = "rules", alias = "masks", alias = "wordlists")]
    pub content: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_envelope_flattens_body() {
        let reply = ApiReply::ok(CrackedBody { cracked: vec![] });
        let json = serde_json::to_value(&reply).unwrap();
        assert_eq!(json["response"], "ok");
        assert!(json["cracked"].as_array().unwrap().is_empty());
    }

    #[test]
    fn error_envelope_round_trip() {
        let raw = br#"{"response":"error","message":"no such session"}"#;
        let reply: ApiReply<Ack> = ApiReply::from_json(raw).unwrap();
        let err = reply.into_result().unwrap_err();
        assert!(matches!(err, CrackdError::Remote(m) if m == "no such session"));
    }

    #[test]
    fn bare_ack_is_just_the_response_field() {
        let json = serde_json::to_string(&ApiReply::ok(Ack::default())).unwrap();
        assert_eq!(json, r#"{"response":"ok"}"#);
    }

    #[test]
    fn upload_request_accepts_legacy_field_names() {
        let legacy: UploadRequest =
            serde_json::from_str(r#"{"name":"best64.rule","rules":"YmFzZTY0"}"#).unwrap();
        assert_eq!(legacy.content, "YmFzZTY0");
        let current: UploadRequest =
            serde_json::from_str(r#"{"name":"best64.rule","content":"YmFzZTY0"}"#).unwrap();
        assert_eq!(legacy, current);
    }

    #[test]
    fn create_request_optional_fields_default_to_none() {
        let req: CreateSessionRequest = serde_json::from_str(
            r#"{"name":"s1","crack_type":"mask","hashes":"abc","hash_mode_id":0,
                "mask":"digits.hcmask","username_included":false}"#,
        )
        .unwrap();
        assert_eq!(req.crack_type, CrackType::Mask);
        assert!(req.wordlist.is_none());
        assert!(req.rule.is_none());
        assert_eq!(req.mask.as_deref(), Some("digits.hcmask"));
    }
}
