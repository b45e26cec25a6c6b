use clap::{Arg, Command};

pub const ARG_DSN: &str = "dsn";
pub const ARG_REDIS_URL: &str = "redis-url";

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_DSN)
                .short('d')
                .long("dsn")
                .help("Database connection string for the credential store")
                .env("PASSAGE_DSN")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_REDIS_URL)
                .long("redis-url")
                .help("Redis URL for the session store")
                .env("PASSAGE_REDIS_URL")
                .hide_env_values(true)
                .default_value("redis://127.0.0.1:6379"),
        )
}
