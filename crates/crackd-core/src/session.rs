//! Session lifecycle types and the transition table.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

use crate::error::{CrackdError, Result};

/// Attack strategy of a session.
///
/// Dictionary sessions require a wordlist and a rule file; mask sessions
/// require a mask file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum CrackType {
    Dictionary,
    Mask,
}

/// Lifecycle state of a session.
///
/// `created → running ⇄ paused → quit`, with `running → finished` when the
/// engine signals natural completion (detected by `update`, never by an
/// explicit action).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionStatus {
    Created,
    Running,
    Paused,
    Quit,
    Finished,
}

/// Action dispatched against a session through the control API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SessionAction {
    Start,
    Update,
    Pause,
    Resume,
    Quit,
}

impl SessionAction {
    /// Parses an action string from the wire.
    ///
    /// Unrecognized action names are a validation error, never a silent
    /// no-op.
    pub fn parse(value: &str) -> Result<Self> {
        value
            .parse()
            .map_err(|_| CrackdError::validation(format!("unknown action '{}'", value)))
    }
}

/// Result of checking an action against the current session status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The action is valid and moves the session to a new status.
    Advance(SessionStatus),
    /// The target state is already reached (or the action never changes
    /// state); the request succeeds without a transition.
    Unchanged,
    /// The action is not valid from the current status.
    Invalid,
}

impl SessionStatus {
    /// Evaluates the lifecycle transition table.
    ///
    /// Retried calls are idempotent: an action whose target state is
    /// already reached yields [`TransitionOutcome::Unchanged`] rather than
    /// an error. `update` is valid from every state and never advances the
    /// status by itself.
    pub fn apply(self, action: SessionAction) -> TransitionOutcome {
        use SessionAction as A;
        use SessionStatus as S;
        use TransitionOutcome as T;

        match (self, action) {
            (_, A::Update) => T::Unchanged,

            (S::Created, A::Start) => T::Advance(S::Running),
            (S::Running, A::Start) => T::Unchanged,

            (S::Running, A::Pause) => T::Advance(S::Paused),
            (S::Paused, A::Pause) => T::Unchanged,

            (S::Paused, A::Resume) => T::Advance(S::Running),
            (S::Running, A::Resume) => T::Unchanged,

            (S::Running | S::Paused, A::Quit) => T::Advance(S::Quit),
            (S::Quit, A::Quit) => T::Unchanged,

            _ => T::Invalid,
        }
    }
}

/// One cracked result: the recovered plaintext with its hash and, when the
/// hash list carried usernames, the owning account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrackedHash {
    pub username: Option<String>,
    pub password: String,
    pub hash: String,
}

/// One entry of the engine's supported hash-mode catalogue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashMode {
    pub id: u32,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionAction as A;
    use SessionStatus as S;
    use TransitionOutcome as T;

    #[test]
    fn start_only_from_created() {
        assert_eq!(S::Created.apply(A::Start), T::Advance(S::Running));
        assert_eq!(S::Running.apply(A::Start), T::Unchanged);
        assert_eq!(S::Paused.apply(A::Start), T::Invalid);
        assert_eq!(S::Quit.apply(A::Start), T::Invalid);
        assert_eq!(S::Finished.apply(A::Start), T::Invalid);
    }

    #[test]
    fn pause_resume_cycle() {
        assert_eq!(S::Running.apply(A::Pause), T::Advance(S::Paused));
        assert_eq!(S::Paused.apply(A::Pause), T::Unchanged);
        assert_eq!(S::Paused.apply(A::Resume), T::Advance(S::Running));
        assert_eq!(S::Running.apply(A::Resume), T::Unchanged);
        assert_eq!(S::Created.apply(A::Pause), T::Invalid);
        assert_eq!(S::Finished.apply(A::Resume), T::Invalid);
    }

    #[test]
    fn quit_is_terminal() {
        assert_eq!(S::Running.apply(A::Quit), T::Advance(S::Quit));
        assert_eq!(S::Paused.apply(A::Quit), T::Advance(S::Quit));
        assert_eq!(S::Quit.apply(A::Quit), T::Unchanged);
        assert_eq!(S::Quit.apply(A::Start), T::Invalid);
        assert_eq!(S::Quit.apply(A::Pause), T::Invalid);
        assert_eq!(S::Quit.apply(A::Resume), T::Invalid);
        assert_eq!(S::Created.apply(A::Quit), T::Invalid);
    }

    #[test]
    fn update_is_always_allowed() {
        for status in [S::Created, S::Running, S::Paused, S::Quit, S::Finished] {
            assert_eq!(status.apply(A::Update), T::Unchanged);
        }
    }

    #[test]
    fn action_parse_rejects_unknown_names() {
        assert_eq!(SessionAction::parse("start").unwrap(), A::Start);
        assert_eq!(SessionAction::parse("quit").unwrap(), A::Quit);
        let err = SessionAction::parse("detonate").unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn status_wire_strings_are_lowercase() {
        assert_eq!(S::Created.to_string(), "created");
        assert_eq!(
            serde_json::to_string(&S::Finished).unwrap(),
            "\"finished\""
        );
        assert_eq!(CrackType::Dictionary.to_string(), "dictionary");
    }
}
