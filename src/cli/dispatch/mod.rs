use crate::cli::{
    actions::{Action, server::Args},
    commands::{ARG_PORT, session, store},
};
use anyhow::{Context, Result};
use secrecy::SecretString;

/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>(store::ARG_DSN)
        .cloned()
        .context("missing required argument: --dsn")?;
    let redis_url = matches
        .get_one::<String>(store::ARG_REDIS_URL)
        .cloned()
        .context("missing required argument: --redis-url")?;
    let signing_secret = matches
        .get_one::<String>(session::ARG_SIGNING_SECRET)
        .cloned()
        .map(SecretString::from)
        .context("missing required argument: --signing-secret")?;

    let ttl = |id: &str| matches.get_one::<u64>(id).copied();

    Ok(Action::Server(Args {
        port,
        dsn,
        redis_url,
        signing_secret,
        access_token_ttl_seconds: ttl(session::ARG_ACCESS_TOKEN_TTL).unwrap_or(3600),
        refresh_token_ttl_seconds: ttl(session::ARG_REFRESH_TOKEN_TTL).unwrap_or(2_592_000),
        recovery_token_ttl_seconds: ttl(session::ARG_RECOVERY_TOKEN_TTL).unwrap_or(3600),
        rotate_refresh_tokens: matches.get_flag(session::ARG_ROTATE_REFRESH_TOKENS),
        frontend_base_url: matches
            .get_one::<String>(session::ARG_FRONTEND_BASE_URL)
            .cloned()
            .unwrap_or_else(|| "http://localhost:3000".to_string()),
    }))
}
