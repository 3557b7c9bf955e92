//! Application configuration management

use std::env;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Server port
    pub port: u16,

    /// Database URL (PostgreSQL)
    pub database_url: String,

    /// TMDB API key for metadata lookups
    pub tmdb_api_key: String,

    /// Telegram bot token; also the secret path segment of the webhook
    pub telegram_bot_token: String,

    /// The one channel whose posts are ingested
    pub allowed_channel_id: i64,

    /// Public base URL used when composing watch/download/record links
    pub public_base_url: String,

    /// Number of ingest workers draining the upload queue
    pub ingest_workers: usize,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A missing required variable is logged but does not abort startup;
    /// the affected subsystem fails at its first use instead. Observed
    /// production deployments rely on the service coming up regardless.
    pub fn from_env() -> Self {
        Self {
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),

            database_url: required_var("DATABASE_URL"),

            tmdb_api_key: required_var("TMDB_API_KEY"),

            telegram_bot_token: required_var("TELEGRAM_BOT_TOKEN"),

            allowed_channel_id: {
                let raw = required_var("ALLOWED_CHANNEL_ID");
                raw.parse().unwrap_or_else(|_| {
                    if !raw.is_empty() {
                        tracing::error!(value = %raw, "ALLOWED_CHANNEL_ID is not a valid chat id - channel posts will be ignored");
                    }
                    0
                })
            },

            public_base_url: required_var("PUBLIC_BASE_URL")
                .trim_end_matches('/')
                .to_string(),

            ingest_workers: env::var("INGEST_WORKERS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .unwrap_or(4),
        }
    }
}

/// Read a required variable, logging (not failing) when it is absent.
fn required_var(name: &str) -> String {
    env::var(name).unwrap_or_else(|_| {
        tracing::error!(var = name, "Required configuration variable is missing");
        String::new()
    })
}
