use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://data.db";
pub const DEFAULT_VISION_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
pub const DEFAULT_TEXT_MODEL: &str = "openai/gpt-oss-120b";
pub const DEFAULT_LOCK_FILE: &str = "/tmp/vibecaption_bot.lock";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("missing environment variable: {0}")]
    MissingEnv(&'static str),
    #[error("invalid HOSTING value (expected true|false): {0}")]
    InvalidHosting(String),
    #[error("invalid WEBHOOK_URL: {0}")]
    InvalidWebhookUrl(String),
    #[error("invalid number in {name}: {value}")]
    InvalidNumber { name: &'static str, value: String },
}

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub token: String,
    pub groq_api_key: String,
    pub hosting: bool,
    pub webhook_url: Option<url::Url>,
    pub port: u16,
    pub database_url: String,
    pub daily_limit: u32,
    pub cooldown: Duration,
    pub vision_model: String,
    pub text_model: String,
    pub model_timeout: Duration,
    pub lock_file: PathBuf,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .ok_or(ConfigError::MissingEnv(name))
}

fn or_default(name: &'static str, default: &str) -> String {
    env::var(name)
        .ok()
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

fn number<T: FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(name) {
        Ok(s) if !s.trim().is_empty() => s.trim().parse::<T>().map_err(|_| ConfigError::InvalidNumber {
            name,
            value: s,
        }),
        _ => Ok(default),
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        if cfg!(not(test)) {
            let _ = dotenv();
        }

        let token = required("TELOXIDE_TOKEN")?;
        let groq_api_key = required("GROQ_API_KEY")?;

        let hosting_raw = env::var("HOSTING").map_err(|_| ConfigError::MissingEnv("HOSTING"))?;
        let hosting = match hosting_raw.to_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            other => return Err(ConfigError::InvalidHosting(other.to_string())),
        };

        let webhook_url = match env::var("WEBHOOK_URL") {
            Ok(s) if !s.trim().is_empty() => {
                let parsed =
                    url::Url::parse(&s).map_err(|_| ConfigError::InvalidWebhookUrl(s.clone()))?;
                Some(parsed)
            }
            _ => None,
        };
        if hosting && webhook_url.is_none() {
            return Err(ConfigError::MissingEnv("WEBHOOK_URL"));
        }

        Ok(AppConfig {
            token,
            groq_api_key,
            hosting,
            webhook_url,
            port: number("PORT", 8080u16)?,
            database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
            daily_limit: number("DAILY_LIMIT", 20u32)?,
            cooldown: Duration::from_secs(number("COOLDOWN_SECS", 3u64)?),
            vision_model: or_default("VISION_MODEL", DEFAULT_VISION_MODEL),
            text_model: or_default("TEXT_MODEL", DEFAULT_TEXT_MODEL),
            model_timeout: Duration::from_secs(number("MODEL_TIMEOUT_SECS", 45u64)?),
            lock_file: PathBuf::from(or_default("LOCK_FILE", DEFAULT_LOCK_FILE)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const ALL: &[&str] = &[
        "TELOXIDE_TOKEN",
        "GROQ_API_KEY",
        "HOSTING",
        "WEBHOOK_URL",
        "PORT",
        "DATABASE_URL",
        "DAILY_LIMIT",
        "COOLDOWN_SECS",
        "VISION_MODEL",
        "TEXT_MODEL",
        "MODEL_TIMEOUT_SECS",
        "LOCK_FILE",
    ];

    fn clear_env() {
        for name in ALL {
            unsafe {
                env::remove_var(name);
            }
        }
    }

    #[test]
    #[serial]
    fn from_env_parses_all() {
        clear_env();
        unsafe {
            env::set_var("TELOXIDE_TOKEN", "tok");
            env::set_var("GROQ_API_KEY", "gsk");
            env::set_var("HOSTING", "true");
            env::set_var("WEBHOOK_URL", "https://example.com/hook");
            env::set_var("PORT", "1234");
            env::set_var("DAILY_LIMIT", "5");
            env::set_var("COOLDOWN_SECS", "10");
            env::set_var("LOCK_FILE", "/tmp/other.lock");
        }

        let cfg = AppConfig::from_env().unwrap();
        assert_eq!(cfg.token, "tok");
        assert_eq!(cfg.groq_api_key, "gsk");
        assert!(cfg.hosting);
        assert_eq!(cfg.port, 1234);
        assert_eq!(
            cfg.webhook_url.unwrap().as_str(),
            "https://example.com/hook"
        );
        assert_eq!(cfg.daily_limit, 5);
        assert_eq!(cfg.cooldown, Duration::from_secs(10));
        assert_eq!(cfg.lock_file, PathBuf::from("/tmp/other.lock"));

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_applies_defaults() {
        clear_env();
        unsafe {
            env::set_var("TELOXIDE_TOKEN", "tok");
            env::set_var("GROQ_API_KEY", "gsk");
            env::set_var("HOSTING", "no");
        }

        let cfg = AppConfig::from_env().unwrap();
        assert!(!cfg.hosting);
        assert_eq!(cfg.port, 8080);
        assert_eq!(cfg.database_url, DEFAULT_DATABASE_URL);
        assert_eq!(cfg.daily_limit, 20);
        assert_eq!(cfg.cooldown, Duration::from_secs(3));
        assert_eq!(cfg.vision_model, DEFAULT_VISION_MODEL);
        assert_eq!(cfg.text_model, DEFAULT_TEXT_MODEL);
        assert_eq!(cfg.model_timeout, Duration::from_secs(45));

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_missing_token() {
        clear_env();
        unsafe {
            env::set_var("HOSTING", "false");
        }

        let res = AppConfig::from_env();
        match res {
            Err(ConfigError::MissingEnv("TELOXIDE_TOKEN")) => {}
            other => panic!("expected MissingEnv TELOXIDE_TOKEN, got {:?}", other),
        }

        clear_env();
    }

    #[test]
    #[serial]
    fn from_env_rejects_bad_numbers_and_missing_webhook() {
        clear_env();
        unsafe {
            env::set_var("TELOXIDE_TOKEN", "tok");
            env::set_var("GROQ_API_KEY", "gsk");
            env::set_var("HOSTING", "false");
            env::set_var("DAILY_LIMIT", "lots");
        }
        match AppConfig::from_env() {
            Err(ConfigError::InvalidNumber { name: "DAILY_LIMIT", .. }) => {}
            other => panic!("expected InvalidNumber, got {:?}", other),
        }

        unsafe {
            env::remove_var("DAILY_LIMIT");
            env::set_var("HOSTING", "true");
        }
        match AppConfig::from_env() {
            Err(ConfigError::MissingEnv("WEBHOOK_URL")) => {}
            other => panic!("expected MissingEnv WEBHOOK_URL, got {:?}", other),
        }

        clear_env();
    }
}
