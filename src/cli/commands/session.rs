use crate::session::MAX_TOKEN_TTL_SECONDS;
use clap::{Arg, ArgAction, Command};

pub const ARG_SIGNING_SECRET: &str = "signing-secret";
pub const ARG_ACCESS_TOKEN_TTL: &str = "access-token-ttl-seconds";
pub const ARG_REFRESH_TOKEN_TTL: &str = "refresh-token-ttl-seconds";
pub const ARG_RECOVERY_TOKEN_TTL: &str = "recovery-token-ttl-seconds";
pub const ARG_ROTATE_REFRESH_TOKENS: &str = "rotate-refresh-tokens";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SIGNING_SECRET)
                .long("signing-secret")
                .help("HMAC secret used to sign access tokens")
                .env("PASSAGE_SIGNING_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_ACCESS_TOKEN_TTL)
                .long("access-token-ttl-seconds")
                .help("Access token lifetime in seconds")
                .env("PASSAGE_ACCESS_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_REFRESH_TOKEN_TTL)
                .long("refresh-token-ttl-seconds")
                .help("Refresh token lifetime in seconds")
                .env("PASSAGE_REFRESH_TOKEN_TTL_SECONDS")
                .default_value("2592000")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_RECOVERY_TOKEN_TTL)
                .long("recovery-token-ttl-seconds")
                .help("Recovery link lifetime in seconds")
                .env("PASSAGE_RECOVERY_TOKEN_TTL_SECONDS")
                .default_value("3600")
                .value_parser(clap::value_parser!(u64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
        .arg(
            Arg::new(ARG_ROTATE_REFRESH_TOKENS)
                .long("rotate-refresh-tokens")
                .help("Consume the presented refresh token on every refresh")
                .env("PASSAGE_ROTATE_REFRESH_TOKENS")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long("frontend-base-url")
                .help("Base URL used for recovery links and the CORS origin")
                .env("PASSAGE_FRONTEND_BASE_URL")
                .default_value("http://localhost:3000"),
        )
}
