//! Process configuration, read once from the environment at startup.
//!
//! Recognized variables:
//! - `JWT_SECRET`   token signing key; required, no default
//! - `JWT_EXPIRE`   token TTL, e.g. `7d`, `24h`, `15m`, `30s` or bare seconds (default `7d`)
//! - `PORT`         listen port (default 5000)
//! - `DB_URI`       persistence backend connection string; the bundled
//!                  in-memory store accepts and ignores it
//! - `EMAIL_HOST` / `EMAIL_PORT` / `EMAIL_USER` / `EMAIL_PASSWORD` / `EMAIL_FROM`
//!                  outbound SMTP; when host or from is unset the email sink
//!                  is a no-op
//! - `NODE_ENV`     `development` enables diagnostic detail in 500 bodies

use anyhow::{bail, Context, Result};
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub db_uri: Option<String>,
    pub jwt_secret: String,
    pub token_ttl: Duration,
    pub email: Option<EmailConfig>,
    pub dev_mode: bool,
}

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub host: String,
    pub port: u16,
    pub user: Option<String>,
    pub password: Option<String>,
    pub from: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set; refusing to start with an unsigned token vault")?;
        if jwt_secret.trim().is_empty() {
            bail!("JWT_SECRET is empty");
        }

        let token_ttl = match std::env::var("JWT_EXPIRE") {
            Ok(raw) => parse_ttl(&raw).with_context(|| format!("unparseable JWT_EXPIRE: {raw:?}"))?,
            Err(_) => Duration::from_secs(7 * 24 * 3600),
        };

        let port = match std::env::var("PORT") {
            Ok(raw) => raw.parse::<u16>().with_context(|| format!("unparseable PORT: {raw:?}"))?,
            Err(_) => 5000,
        };

        let email = match (std::env::var("EMAIL_HOST").ok(), std::env::var("EMAIL_FROM").ok()) {
            (Some(host), Some(from)) if !host.trim().is_empty() => Some(EmailConfig {
                host,
                port: std::env::var("EMAIL_PORT").ok().and_then(|p| p.parse().ok()).unwrap_or(587),
                user: std::env::var("EMAIL_USER").ok(),
                password: std::env::var("EMAIL_PASSWORD").ok(),
                from,
            }),
            _ => None,
        };

        let dev_mode = std::env::var("NODE_ENV").map(|v| v == "development").unwrap_or(false);

        Ok(Self {
            port,
            db_uri: std::env::var("DB_URI").ok(),
            jwt_secret,
            token_ttl,
            email,
            dev_mode,
        })
    }
}

/// Parse TTL strings of the shape `7d`, `24h`, `15m`, `30s` or bare seconds.
pub fn parse_ttl(raw: &str) -> Option<Duration> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    let (digits, unit) = match s.char_indices().last() {
        Some((idx, c)) if c.is_ascii_alphabetic() => (&s[..idx], Some(c.to_ascii_lowercase())),
        _ => (s, None),
    };
    let n: u64 = digits.trim().parse().ok()?;
    let secs = match unit {
        None | Some('s') => n,
        Some('m') => n * 60,
        Some('h') => n * 3600,
        Some('d') => n * 86400,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ttl_units() {
        assert_eq!(parse_ttl("30s"), Some(Duration::from_secs(30)));
        assert_eq!(parse_ttl("15m"), Some(Duration::from_secs(900)));
        assert_eq!(parse_ttl("24h"), Some(Duration::from_secs(86400)));
        assert_eq!(parse_ttl("7d"), Some(Duration::from_secs(7 * 86400)));
        assert_eq!(parse_ttl("3600"), Some(Duration::from_secs(3600)));
    }

    #[test]
    fn ttl_rejects_nonsense() {
        assert_eq!(parse_ttl(""), None);
        assert_eq!(parse_ttl("soon"), None);
        assert_eq!(parse_ttl("7w"), None);
        assert_eq!(parse_ttl("-1d"), None);
    }
}
