//! Route handlers for the session and recovery endpoints.

pub mod health;
pub mod recovery;
pub mod root;
pub mod session;
