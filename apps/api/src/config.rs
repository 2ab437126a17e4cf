use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context, Result};

pub const MAX_DELIVERY_WORKERS: usize = 16;

/// SMTP relay settings. Only present when credentials are configured.
#[derive(Debug, Clone)]
pub struct MailSettings {
    pub server: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub sender_name: String,
}

/// Application configuration loaded from environment variables.
/// Everything has a default; mail credentials are optional (demo mode without them).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub rust_log: String,
    pub pdf_timeout: Duration,
    pub pdf_kill_grace: Duration,
    pub pdf_min_bytes: u64,
    pub pdf_renderer_bin: String,
    pub reports_dir: PathBuf,
    pub delivery_workers: usize,
    pub delivery_queue_capacity: usize,
    pub request_timeout: Duration,
    pub mail: Option<MailSettings>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup, then validates it.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str, default: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default.to_string())
        };

        let mail = match (lookup("MAIL_USERNAME"), lookup("MAIL_PASSWORD")) {
            (Some(username), Some(password))
                if !username.trim().is_empty() && !password.is_empty() =>
            {
                Some(MailSettings {
                    server: var("MAIL_SERVER", "smtp.zoho.com"),
                    port: parse(&var("MAIL_PORT", "465"), "MAIL_PORT")?,
                    username: username.trim().to_string(),
                    password,
                    sender_name: var("MAIL_SENDER_NAME", "Faça Bem"),
                })
            }
            _ => None,
        };

        let config = Config {
            port: parse(&var("PORT", "9000"), "PORT")?,
            rust_log: var("RUST_LOG", "info"),
            pdf_timeout: Duration::from_secs(parse(
                &var("PDF_TIMEOUT_SECS", "20"),
                "PDF_TIMEOUT_SECS",
            )?),
            pdf_kill_grace: Duration::from_secs(parse(
                &var("PDF_KILL_GRACE_SECS", "2"),
                "PDF_KILL_GRACE_SECS",
            )?),
            pdf_min_bytes: parse(&var("PDF_MIN_BYTES", "1000"), "PDF_MIN_BYTES")?,
            pdf_renderer_bin: var("PDF_RENDERER_BIN", "wkhtmltopdf"),
            reports_dir: PathBuf::from(var("REPORTS_DIR", "./reports")),
            delivery_workers: parse(&var("DELIVERY_WORKERS", "4"), "DELIVERY_WORKERS")?,
            delivery_queue_capacity: parse(
                &var("DELIVERY_QUEUE_CAPACITY", "64"),
                "DELIVERY_QUEUE_CAPACITY",
            )?,
            request_timeout: Duration::from_secs(parse(
                &var("HTTP_REQUEST_TIMEOUT_SECS", "30"),
                "HTTP_REQUEST_TIMEOUT_SECS",
            )?),
            mail,
        };
        config.validate()?;
        Ok(config)
    }

    /// A killed conversion must finish before any upstream request timeout fires.
    pub fn validate(&self) -> Result<()> {
        if self.pdf_timeout.is_zero() {
            bail!("PDF_TIMEOUT_SECS must be greater than zero");
        }
        if self.pdf_timeout + self.pdf_kill_grace >= self.request_timeout {
            bail!(
                "PDF_TIMEOUT_SECS + PDF_KILL_GRACE_SECS ({}s) must be less than HTTP_REQUEST_TIMEOUT_SECS ({}s)",
                (self.pdf_timeout + self.pdf_kill_grace).as_secs(),
                self.request_timeout.as_secs()
            );
        }
        if !(1..=MAX_DELIVERY_WORKERS).contains(&self.delivery_workers) {
            bail!(
                "DELIVERY_WORKERS must be between 1 and {MAX_DELIVERY_WORKERS}, got {}",
                self.delivery_workers
            );
        }
        if self.delivery_queue_capacity == 0 {
            bail!("DELIVERY_QUEUE_CAPACITY must be greater than zero");
        }
        Ok(())
    }
}

fn parse<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T>
where
    T::Err: std::error::Error + Send + Sync + 'static,
{
    raw.trim()
        .parse::<T>()
        .with_context(|| format!("{key} has an invalid value '{raw}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn from_pairs(pairs: &[(&str, &str)]) -> Result<Config> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = from_pairs(&[]).unwrap();
        assert_eq!(config.port, 9000);
        assert_eq!(config.pdf_timeout, Duration::from_secs(20));
        assert_eq!(config.pdf_kill_grace, Duration::from_secs(2));
        assert_eq!(config.pdf_min_bytes, 1000);
        assert_eq!(config.delivery_workers, 4);
        assert_eq!(config.delivery_queue_capacity, 64);
        assert_eq!(config.reports_dir, PathBuf::from("./reports"));
        assert!(config.mail.is_none());
    }

    #[test]
    fn test_mail_settings_require_both_credentials() {
        let config = from_pairs(&[("MAIL_USERNAME", "bot@example.com")]).unwrap();
        assert!(config.mail.is_none());

        let config = from_pairs(&[
            ("MAIL_USERNAME", "bot@example.com"),
            ("MAIL_PASSWORD", "secret"),
        ])
        .unwrap();
        let mail = config.mail.unwrap();
        assert_eq!(mail.server, "smtp.zoho.com");
        assert_eq!(mail.port, 465);
        assert_eq!(mail.sender_name, "Faça Bem");
    }

    #[test]
    fn test_timeout_budget_must_fit_request_timeout() {
        let err = from_pairs(&[("PDF_TIMEOUT_SECS", "28"), ("PDF_KILL_GRACE_SECS", "2")])
            .unwrap_err();
        assert!(err.to_string().contains("HTTP_REQUEST_TIMEOUT_SECS"));

        assert!(from_pairs(&[("PDF_TIMEOUT_SECS", "27"), ("PDF_KILL_GRACE_SECS", "2")]).is_ok());
    }

    #[test]
    fn test_worker_count_is_bounded() {
        assert!(from_pairs(&[("DELIVERY_WORKERS", "0")]).is_err());
        assert!(from_pairs(&[("DELIVERY_WORKERS", "17")]).is_err());
        assert!(from_pairs(&[("DELIVERY_WORKERS", "16")]).is_ok());
    }

    #[test]
    fn test_invalid_number_names_the_variable() {
        let err = from_pairs(&[("PORT", "nine")]).unwrap_err();
        assert!(err.to_string().contains("PORT"));
    }
}
