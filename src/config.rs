use anyhow::{Context, Result};

/// Service configuration assembled from environment variables. `load()` is
/// called once at startup, after `bootstrap::init_env()` has read `.env`.
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub telegram: TelegramConfig,
    pub sms: SmsConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct RedisConfig {
    pub url: String,
}

/// Telegram is an outbound notification channel only. A missing token
/// disables the channel instead of failing startup.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    pub bot_token: Option<String>,
    pub api_url: String,
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub sender: String,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub api_url: Option<String>,
    pub api_token: Option<String>,
    pub from: String,
}

pub fn load() -> Result<Config> {
    let port = env_or("PORT", "3000")
        .parse::<u16>()
        .context("PORT must be a valid port number")?;

    Ok(Config {
        server: ServerConfig { port },
        database: DatabaseConfig {
            url: std::env::var("DATABASE_URL").context("DATABASE_URL is not set")?,
        },
        redis: RedisConfig {
            url: env_or("REDIS_URL", "redis://localhost:6379"),
        },
        telegram: TelegramConfig {
            bot_token: env_opt("BOT_TOKEN"),
            api_url: env_or("TELEGRAM_API_URL", "https://api.telegram.org"),
        },
        sms: SmsConfig {
            api_url: env_opt("SMS_API_URL"),
            api_token: env_opt("SMS_API_TOKEN"),
            sender: env_or("SMS_SENDER", "AquaPure"),
        },
        email: EmailConfig {
            api_url: env_opt("EMAIL_API_URL"),
            api_token: env_opt("EMAIL_API_TOKEN"),
            from: env_or("EMAIL_FROM", "info@aquapure.uz"),
        },
    })
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loads_from_env_with_defaults() {
        unsafe {
            std::env::remove_var("DATABASE_URL");
        }
        assert!(load().is_err());

        unsafe {
            std::env::set_var("DATABASE_URL", "postgres://localhost/aquapure");
            std::env::set_var("BOT_TOKEN", "123:abc");
            std::env::remove_var("PORT");
            std::env::remove_var("REDIS_URL");
            std::env::remove_var("SMS_API_URL");
        }
        let config = load().unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.database.url, "postgres://localhost/aquapure");
        assert_eq!(config.redis.url, "redis://localhost:6379");
        assert_eq!(config.telegram.bot_token.as_deref(), Some("123:abc"));
        assert!(config.sms.api_url.is_none());
        assert_eq!(config.email.from, "info@aquapure.uz");
    }
}
