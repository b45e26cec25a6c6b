//! Session engine: token signing, the revocation store and the lifecycle
//! operations built on top of them.

pub mod error;
pub mod guard;
pub mod manager;
pub mod memory;
pub mod redis;
pub mod signer;
pub mod store;

pub use error::SessionError;
pub use guard::{AuthGuard, Authenticated, GuardRejection, extract_bearer};
pub use manager::{
    MAX_TOKEN_TTL_SECONDS, REFRESH_SENTINEL, SessionConfig, SessionManager, TokenPair,
};
pub use memory::MemorySessionStore;
pub use redis::RedisSessionStore;
pub use signer::{AccessClaims, SignerError, TokenSigner};
pub use store::{SessionStore, StoreError};
