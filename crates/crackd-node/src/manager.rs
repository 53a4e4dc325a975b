//! Session Manager: wires the registry, the engine, and the resource
//! stores behind the operations the control API exposes.

use std::path::Path;
use std::sync::Arc;

use rand::Rng;
use tracing::{info, warn};

use crackd_core::protocol::{
    CrackedBody, CreateSessionRequest, NodeInfoBody, SessionDetailsBody,
};
use crackd_core::{CrackType, CrackdError, Result, SessionAction};
use crackd_engine::{AttackSpec, CrackEngine};

use crate::registry::SessionRegistry;
use crate::session::Session;
use crate::store::{validate_name, FsResourceStore, ResourceStore};

/// Length of the random hashfile-name suffix.
const HASHFILE_SUFFIX_LEN: usize = 12;

/// Which uploadable resource kind an API call addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    Rule,
    Mask,
    Wordlist,
}

/// One blob store per resource kind.
pub struct ResourceStores {
    pub rules: Arc<dyn ResourceStore>,
    pub masks: Arc<dyn ResourceStore>,
    pub wordlists: Arc<dyn ResourceStore>,
    pub hashfiles: Arc<dyn ResourceStore>,
}

impl ResourceStores {
    /// Opens the four stores under `data_dir`.
    pub async fn open(data_dir: &Path) -> Result<Self> {
        Ok(Self {
            rules: Arc::new(FsResourceStore::open(data_dir.join("rules"), "rule").await?),
            masks: Arc::new(FsResourceStore::open(data_dir.join("masks"), "mask").await?),
            wordlists: Arc::new(
                FsResourceStore::open(data_dir.join("wordlists"), "wordlist").await?,
            ),
            hashfiles: Arc::new(
                FsResourceStore::open(data_dir.join("hashfiles"), "hashfile").await?,
            ),
        })
    }

    fn for_kind(&self, kind: ResourceKind) -> &dyn ResourceStore {
        match kind {
            ResourceKind::Rule => self.rules.as_ref(),
            ResourceKind::Mask => self.masks.as_ref(),
            ResourceKind::Wordlist => self.wordlists.as_ref(),
        }
    }
}

pub struct SessionManager {
    registry: SessionRegistry,
    engine: Arc<dyn CrackEngine>,
    stores: ResourceStores,
}

impl SessionManager {
    pub fn new(engine: Arc<dyn CrackEngine>, stores: ResourceStores) -> Self {
        Self {
            registry: SessionRegistry::new(),
            engine,
            stores,
        }
    }

    /// Validates a create request, persists the raw hash text to a
    /// freshly-named hashfile resource, and registers the session.
    ///
    /// The hashfile name carries a random suffix
    /// (`<session>_<suffix>.list`) so concurrently created sessions
    /// sharing a base name cannot collide on the file.
    pub async fn create_session(&self, request: CreateSessionRequest) -> Result<()> {
        validate_name(&request.name)?;
        if request.hashes.trim().is_empty() {
            return Err(CrackdError::validation("hash list is empty"));
        }

        let attack = self.resolve_attack(&request).await?;

        let hashfile_name = format!("{}_{}.list", request.name, random_suffix());
        self.stores
            .hashfiles
            .put(&hashfile_name, request.hashes.as_bytes())
            .await?;
        let hash_file = self.stores.hashfiles.path_of(&hashfile_name)?;

        let session = Session::new(
            request.name.clone(),
            request.crack_type,
            request.hash_mode_id,
            hash_file.clone(),
            attack,
            request.username_included,
            &request.hashes,
        )?;

        if let Err(err) = self.registry.insert(session).await {
            // The persisted hash text belongs to the losing request.
            let _ = tokio::fs::remove_file(&hash_file).await;
            return Err(err);
        }
        info!(session = %request.name, crack_type = %request.crack_type, "session created");
        Ok(())
    }

    async fn resolve_attack(&self, request: &CreateSessionRequest) -> Result<AttackSpec> {
        match request.crack_type {
            CrackType::Dictionary => {
                let wordlist = request.wordlist.as_deref().ok_or_else(|| {
                    CrackdError::validation("dictionary sessions require a wordlist")
                })?;
                let rule = request
                    .rule
                    .as_deref()
                    .ok_or_else(|| CrackdError::validation("dictionary sessions require a rule"))?;
                if !self.stores.wordlists.exists(wordlist).await {
                    return Err(CrackdError::not_found("wordlist", wordlist));
                }
                if !self.stores.rules.exists(rule).await {
                    return Err(CrackdError::not_found("rule", rule));
                }
                Ok(AttackSpec::Dictionary {
                    wordlist: self.stores.wordlists.path_of(wordlist)?,
                    rule: self.stores.rules.path_of(rule)?,
                })
            }
            CrackType::Mask => {
                let mask = request
                    .mask
                    .as_deref()
                    .ok_or_else(|| CrackdError::validation("mask sessions require a mask"))?;
                if !self.stores.masks.exists(mask).await {
                    return Err(CrackdError::not_found("mask", mask));
                }
                Ok(AttackSpec::Mask {
                    mask: self.stores.masks.path_of(mask)?,
                })
            }
        }
    }

    /// Tears a session down: terminates any running engine process and
    /// deletes the persisted hash file.
    pub async fn remove_session(&self, name: &str) -> Result<()> {
        let entry = self.registry.remove(name).await?;
        let mut session = entry.lock().await;
        if let Err(err) = session.shutdown().await {
            warn!(session = name, error = %err, "engine teardown failed during removal");
        }
        if let Err(err) = tokio::fs::remove_file(session.hash_file()).await {
            warn!(session = name, error = %err, "could not delete hash file");
        }
        info!(session = name, "session removed");
        Ok(())
    }

    /// Dispatches one lifecycle action to a named session.
    pub async fn apply_action(&self, name: &str, action: SessionAction) -> Result<()> {
        let entry = self.registry.get(name).await?;
        let mut session = entry.lock().await;
        session.apply(action, self.engine.as_ref()).await
    }

    /// The node-info aggregate: engine version and catalogue, resource
    /// names, and a summary row per session.
    pub async fn node_info(&self) -> Result<NodeInfoBody> {
        Ok(NodeInfoBody {
            version: self.engine.version().await?,
            hash_types: self.engine.hash_modes().await?,
            rules: self.stores.rules.list().await?,
            masks: self.stores.masks.list().await?,
            wordlists: self.stores.wordlists.list().await?,
            sessions: self.registry.summaries().await,
        })
    }

    pub async fn session_details(&self, name: &str) -> Result<SessionDetailsBody> {
        let entry = self.registry.get(name).await?;
        let session = entry.lock().await;
        Ok(session.details())
    }

    pub async fn cracked(&self, name: &str) -> Result<CrackedBody> {
        let entry = self.registry.get(name).await?;
        let session = entry.lock().await;
        Ok(CrackedBody {
            cracked: session.cracked(),
        })
    }

    /// Persists an uploaded resource, overwriting any previous content
    /// under the same name.
    pub async fn upload(&self, kind: ResourceKind, name: &str, bytes: &[u8]) -> Result<()> {
        self.stores.for_kind(kind).put(name, bytes).await?;
        info!(?kind, name, size = bytes.len(), "resource uploaded");
        Ok(())
    }
}

fn random_suffix() -> String {
    const CHARSET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    let mut rng = rand::thread_rng();
    (0..HASHFILE_SUFFIX_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crackd_core::SessionStatus;
    use crackd_engine::{ScriptedEngine, ScriptedJob};
    use tempfile::TempDir;

    async fn manager_with(dir: &TempDir, engine: ScriptedEngine) -> SessionManager {
        let stores = ResourceStores::open(dir.path()).await.unwrap();
        SessionManager::new(Arc::new(engine), stores)
    }

    fn mask_request(name: &str) -> CreateSessionRequest {
        CreateSessionRequest {
            name: name.to_string(),
            crack_type: CrackType::Mask,
            hashes: "aaa\nbbb\n".to_string(),
            hash_mode_id: 0,
            wordlist: None,
            rule: None,
            mask: Some("digits.hcmask".to_string()),
            username_included: false,
        }
    }

    #[tokio::test]
    async fn create_requires_referenced_resources_to_exist() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, ScriptedEngine::new("v6.2.6", vec![])).await;

        let err = manager.create_session(mask_request("s1")).await.unwrap_err();
        assert!(err.is_not_found());

        manager
            .upload(ResourceKind::Mask, "digits.hcmask", b"?d?d?d?d\n")
            .await
            .unwrap();
        manager.create_session(mask_request("s1")).await.unwrap();

        let details = manager.session_details("s1").await.unwrap();
        assert_eq!(details.status, SessionStatus::Created);
    }

    #[tokio::test]
    async fn upload_then_reference_round_trip_for_dictionary() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, ScriptedEngine::new("v6.2.6", vec![])).await;

        manager
            .upload(ResourceKind::Wordlist, "rockyou", b"password\n")
            .await
            .unwrap();
        let missing_rule = CreateSessionRequest {
            crack_type: CrackType::Dictionary,
            wordlist: Some("rockyou".to_string()),
            rule: Some("r1".to_string()),
            mask: None,
            ..mask_request("d1")
        };
        let err = manager
            .create_session(missing_rule.clone())
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        manager
            .upload(ResourceKind::Rule, "r1", b":\n")
            .await
            .unwrap();
        manager.create_session(missing_rule).await.unwrap();
    }

    #[tokio::test]
    async fn duplicate_create_conflicts_and_leaves_one_hashfile() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, ScriptedEngine::new("v6.2.6", vec![])).await;
        manager
            .upload(ResourceKind::Mask, "digits.hcmask", b"?d\n")
            .await
            .unwrap();

        manager.create_session(mask_request("dup")).await.unwrap();
        let err = manager.create_session(mask_request("dup")).await.unwrap_err();
        assert!(err.is_conflict());

        let hashfiles = manager.stores.hashfiles.list().await.unwrap();
        assert_eq!(hashfiles.len(), 1);
        assert!(hashfiles[0].starts_with("dup_"));
        assert!(hashfiles[0].ends_with(".list"));
    }

    #[tokio::test]
    async fn create_rejects_empty_hash_lists_and_missing_parameters() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, ScriptedEngine::new("v6.2.6", vec![])).await;
        manager
            .upload(ResourceKind::Mask, "digits.hcmask", b"?d\n")
            .await
            .unwrap();

        let empty = CreateSessionRequest {
            hashes: "  \n".to_string(),
            ..mask_request("e1")
        };
        assert!(manager.create_session(empty).await.unwrap_err().is_validation());

        let no_mask = CreateSessionRequest {
            mask: None,
            ..mask_request("e2")
        };
        assert!(manager
            .create_session(no_mask)
            .await
            .unwrap_err()
            .is_validation());

        let bad_name = mask_request("../evil");
        assert!(manager
            .create_session(bad_name)
            .await
            .unwrap_err()
            .is_validation());
    }

    #[tokio::test]
    async fn remove_deletes_the_hash_file_and_frees_the_name() {
        let dir = TempDir::new().unwrap();
        let engine = ScriptedEngine::new("v6.2.6", vec![]).with_job(ScriptedJob {
            total_ticks: 100,
            potfile_lines: vec![],
        });
        let manager = manager_with(&dir, engine).await;
        manager
            .upload(ResourceKind::Mask, "digits.hcmask", b"?d\n")
            .await
            .unwrap();

        manager.create_session(mask_request("gone")).await.unwrap();
        manager
            .apply_action("gone", SessionAction::Start)
            .await
            .unwrap();
        manager.remove_session("gone").await.unwrap();

        assert!(manager.stores.hashfiles.list().await.unwrap().is_empty());
        assert!(manager
            .session_details("gone")
            .await
            .unwrap_err()
            .is_not_found());
        manager.create_session(mask_request("gone")).await.unwrap();
    }

    #[tokio::test]
    async fn node_info_aggregates_catalogue_and_sessions() {
        let dir = TempDir::new().unwrap();
        let engine = ScriptedEngine::new(
            "v6.2.6",
            vec![crackd_core::HashMode {
                id: 0,
                name: "MD5".to_string(),
            }],
        );
        let manager = manager_with(&dir, engine).await;
        manager
            .upload(ResourceKind::Mask, "digits.hcmask", b"?d\n")
            .await
            .unwrap();
        manager
            .upload(ResourceKind::Rule, "best64.rule", b":\n")
            .await
            .unwrap();
        manager.create_session(mask_request("s1")).await.unwrap();

        let info = manager.node_info().await.unwrap();
        assert_eq!(info.version, "v6.2.6");
        assert_eq!(info.hash_types.len(), 1);
        assert_eq!(info.rules, vec!["best64.rule".to_string()]);
        assert_eq!(info.masks, vec!["digits.hcmask".to_string()]);
        assert!(info.wordlists.is_empty());
        assert_eq!(info.sessions.len(), 1);
        assert_eq!(info.sessions[0].name, "s1");
        assert_eq!(info.sessions[0].cracked, 0.0);
    }

    #[tokio::test]
    async fn unknown_session_actions_are_not_found() {
        let dir = TempDir::new().unwrap();
        let manager = manager_with(&dir, ScriptedEngine::new("v6.2.6", vec![])).await;
        let err = manager
            .apply_action("ghost", SessionAction::Start)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
