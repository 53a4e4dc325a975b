//! Worker-node side of the crackd control plane.
//!
//! One `crackd-node` instance runs per worker: it owns the session
//! registry and lifecycle state machine, mediates all access to the
//! cracking engine, stores named rule/mask/wordlist/hash resources, and
//! exposes everything through an authenticated JSON/HTTP API.

pub mod api;
pub mod auth;
pub mod config;
pub mod manager;
pub mod registry;
pub mod session;
pub mod store;

pub use auth::AuthConfig;
pub use config::NodeConfig;
pub use manager::{ResourceStores, SessionManager};
pub use registry::SessionRegistry;
pub use session::Session;
pub use store::{FsResourceStore, ResourceStore};
