use anyhow::{Context, Result};
use std::env;

/// Runtime configuration, read from the environment (and `.env` via dotenvy).
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub host: String,
    pub port: u16,
    pub public_url: String,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: Option<String>,
    pub smtp_password: Option<String>,
    pub approver_email: Option<String>,
    /// Session signing key. `None` means a random key per process.
    pub session_secret: Option<String>,
    pub session_max_age_secs: i64,
    pub registration_ttl_hours: i64,
    pub bcrypt_cost: u32,
    pub hospital_name: String,
    pub hospital_address: String,
    pub hospital_phone: String,
    pub report_city: String,
    pub static_dir: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://ward_status.db".into(),
            host: "0.0.0.0".into(),
            port: 5000,
            public_url: "http://localhost:5000".into(),
            smtp_host: "smtp.gmail.com".into(),
            smtp_port: 587,
            smtp_username: None,
            smtp_password: None,
            approver_email: None,
            session_secret: None,
            session_max_age_secs: 12 * 3600,
            registration_ttl_hours: 24,
            bcrypt_cost: bcrypt::DEFAULT_COST,
            hospital_name: "Rumah Sakit Sehat Selalu".into(),
            hospital_address: "Jl. Kesehatan No. 88, Jakarta".into(),
            hospital_phone: "+622112345678".into(),
            report_city: "Jakarta".into(),
            static_dir: "static".into(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let port = parse_var("PORT", defaults.port)?;
        let smtp_username = optional_var("SMTP_USERNAME");
        let approver_email = optional_var("APPROVER_EMAIL").or_else(|| smtp_username.clone());

        Ok(Config {
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            host: env::var("HOST").unwrap_or(defaults.host),
            port,
            public_url: optional_var("PUBLIC_URL")
                .unwrap_or_else(|| format!("http://localhost:{port}")),
            smtp_host: env::var("SMTP_HOST").unwrap_or(defaults.smtp_host),
            smtp_port: parse_var("SMTP_PORT", defaults.smtp_port)?,
            smtp_username,
            // app passwords are often pasted with spaces
            smtp_password: optional_var("SMTP_PASSWORD")
                .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect()),
            approver_email,
            session_secret: optional_var("SESSION_SECRET"),
            session_max_age_secs: parse_var("SESSION_MAX_AGE_SECS", defaults.session_max_age_secs)?,
            registration_ttl_hours: parse_var(
                "REGISTRATION_TTL_HOURS",
                defaults.registration_ttl_hours,
            )?,
            bcrypt_cost: parse_var("BCRYPT_COST", defaults.bcrypt_cost)?,
            hospital_name: env::var("HOSPITAL_NAME").unwrap_or(defaults.hospital_name),
            hospital_address: env::var("HOSPITAL_ADDRESS").unwrap_or(defaults.hospital_address),
            hospital_phone: env::var("HOSPITAL_PHONE").unwrap_or(defaults.hospital_phone),
            report_city: env::var("REPORT_CITY").unwrap_or(defaults.report_city),
            static_dir: env::var("STATIC_DIR").unwrap_or(defaults.static_dir),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn registration_ttl(&self) -> chrono::Duration {
        chrono::Duration::hours(self.registration_ttl_hours)
    }

    /// Absolute approval link for a pending registration token.
    pub fn confirmation_url(&self, token: &str) -> String {
        format!("{}/confirm/{}", self.public_url.trim_end_matches('/'), token)
    }
}

fn optional_var(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_var<T>(key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match optional_var(key) {
        Some(raw) => raw
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw}")),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confirmation_url_joins_without_double_slash() {
        let cfg = Config {
            public_url: "https://ward.example.org/".into(),
            ..Config::default()
        };
        assert_eq!(
            cfg.confirmation_url("abc"),
            "https://ward.example.org/confirm/abc"
        );
    }

    #[test]
    fn default_ttl_is_one_day() {
        assert_eq!(Config::default().registration_ttl(), chrono::Duration::hours(24));
    }
}
