//! Core domain model for the crackd control plane.
//!
//! This crate holds everything shared between the node service and the
//! controller client: the session lifecycle state machine, the error type,
//! derived cracked-password statistics, and the JSON wire contract.

pub mod error;
pub mod protocol;
pub mod session;
pub mod stats;

pub use error::{CrackdError, Result};
pub use session::{
    CrackType, CrackedHash, HashMode, SessionAction, SessionStatus, TransitionOutcome,
};
