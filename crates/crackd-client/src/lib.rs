//! Controller-side client for crackd nodes.
//!
//! [`NodeClient`] speaks the node control API; [`ResourceLockManager`]
//! serializes controller-side access to shared hash files so that two jobs
//! never read a hash file while another is rewriting it.

pub mod client;
pub mod lock;

pub use client::NodeClient;
pub use lock::{LockGuard, ResourceLockManager, HASHFILE_LOCK};
