//! # Passage (credential issuing & session lifecycle)
//!
//! `passage` authenticates a user's password, issues short-lived signed access
//! tokens together with opaque long-lived refresh tokens, supports password
//! recovery through one-time links, and revokes sessions on logout.
//!
//! ## Tokens
//!
//! - **Access token:** an HS256 JWT carrying only `iat` and `exp`. It is never
//!   stored; validity is decided by signature and expiry at verification time,
//!   so it cannot be revoked before it expires.
//! - **Refresh token:** a random UUID stored in the session store with a
//!   `"true"` sentinel value and a 30 day TTL. Existence in the store is validity.
//! - **Recovery token:** a random UUID stored with the target user id as value
//!   and a 1 hour TTL. It is consumed atomically when the password reset runs.
//!
//! ## Collaborators
//!
//! The session store (Redis), the credential store (Postgres), password hashing
//! (Argon2) and out-of-band mail delivery sit behind traits so the session
//! engine can be exercised entirely in memory.

pub mod api;
pub mod cli;
pub mod credentials;
pub mod mail;
pub mod session;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};
