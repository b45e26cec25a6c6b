use crate::{
    api::{self, AppState},
    cli::telemetry,
    credentials::{Argon2Hasher, PgCredentialStore},
    mail::LogMailer,
    session::{RedisSessionStore, SessionConfig, SessionManager, TokenSigner},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::{sync::Arc, time::Duration};
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub redis_url: String,
    pub signing_secret: SecretString,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub recovery_token_ttl_seconds: u64,
    pub rotate_refresh_tokens: bool,
    pub frontend_base_url: String,
}

impl Args {
    #[must_use]
    pub fn session_config(&self) -> SessionConfig {
        SessionConfig::new()
            .with_access_token_ttl(Duration::from_secs(self.access_token_ttl_seconds))
            .with_refresh_token_ttl(Duration::from_secs(self.refresh_token_ttl_seconds))
            .with_recovery_token_ttl(Duration::from_secs(self.recovery_token_ttl_seconds))
            .with_rotate_refresh_tokens(self.rotate_refresh_tokens)
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if a store cannot be reached, the configuration is
/// invalid, or the server fails.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    let signer = TokenSigner::new(&args.signing_secret).context("Invalid signing secret")?;

    let session_store = RedisSessionStore::connect(&args.redis_url)
        .await
        .context("Failed to connect to session store")?;

    let credentials = PgCredentialStore::connect(&args.dsn)
        .await
        .context("Failed to connect to database")?;

    let sessions = SessionManager::new(signer, Arc::new(session_store), args.session_config())
        .context("Invalid session configuration")?;

    let state = Arc::new(AppState {
        sessions: Arc::new(sessions),
        credentials: Arc::new(credentials),
        hasher: Arc::new(Argon2Hasher::new()),
        mailer: Arc::new(LogMailer),
        frontend_base_url: args.frontend_base_url,
    });

    let result = api::new(args.port, state).await;

    telemetry::shutdown_tracer();

    result
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_url(&args.dsn)),
        ("redis_url", redact_url(&args.redis_url)),
        ("access_token_ttl", format!("{}s", args.access_token_ttl_seconds)),
        ("refresh_token_ttl", format!("{}s", args.refresh_token_ttl_seconds)),
        ("recovery_token_ttl", format!("{}s", args.recovery_token_ttl_seconds)),
        ("rotate_refresh_tokens", args.rotate_refresh_tokens.to_string()),
        ("frontend_base_url", args.frontend_base_url.clone()),
    ];

    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!("{}\n\nStartup configuration:", banner());
    for (key, value) in &entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn redact_url(url: &str) -> String {
    match Url::parse(url) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-url".to_string(),
    }
}

fn banner() -> String {
    let short_hash = short_commit(crate::GIT_COMMIT_HASH);
    format!(
        "P A S S A G E - {} - {}",
        env!("CARGO_PKG_VERSION"),
        short_hash
    )
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> Args {
        Args {
            port: 8080,
            dsn: "postgres://passage:hunter2@db:5432/passage".to_string(),
            redis_url: "redis://:pw@cache:6379".to_string(),
            signing_secret: SecretString::from("s3cret".to_string()),
            access_token_ttl_seconds: 60,
            refresh_token_ttl_seconds: 120,
            recovery_token_ttl_seconds: 30,
            rotate_refresh_tokens: true,
            frontend_base_url: "http://localhost:3000".to_string(),
        }
    }

    #[test]
    fn redact_url_hides_passwords() {
        let redacted = redact_url(&args().dsn);
        assert!(!redacted.contains("hunter2"));
        assert!(redacted.contains("REDACTED"));
        assert!(!redact_url(&args().redis_url).contains(":pw@"));
        assert_eq!(redact_url("not a url"), "invalid-url");
    }

    #[test]
    fn session_config_follows_args() {
        let config = args().session_config();
        assert_eq!(config.access_token_ttl(), Duration::from_secs(60));
        assert_eq!(config.refresh_token_ttl(), Duration::from_secs(120));
        assert_eq!(config.recovery_token_ttl(), Duration::from_secs(30));
        assert!(config.rotate_refresh_tokens());
    }

    #[test]
    fn debug_output_hides_secret() {
        assert!(!format!("{:?}", args()).contains("s3cret"));
    }

    #[test]
    fn short_commit_truncates() {
        assert_eq!(short_commit("0123456789"), "0123456");
        assert_eq!(short_commit("abc"), "abc");
    }
}
